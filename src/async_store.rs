//! Async facade over [`JsonStore`] for tokio hosts.
//!
//! Disk-touching operations run on tokio's blocking pool via
//! `spawn_blocking`, so a save never stalls the executor. Reads are served
//! from memory and stay synchronous.
//!
//! Dropping one of the returned futures does not cancel the blocking task:
//! a save that has started runs to completion, and the backing file is only
//! ever replaced by a complete rename.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::key::normalize_key;
use crate::store::JsonStore;
use crate::DefaultBackend;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

/// Cloneable async handle to a [`JsonStore`].
///
/// Clones share one store, so mutations from every clone are serialized by
/// the same lock.
pub struct AsyncJsonStore<M = DefaultBackend> {
    inner: Arc<JsonStore<M>>,
}

impl<M> Clone for AsyncJsonStore<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M> From<JsonStore<M>> for AsyncJsonStore<M> {
    fn from(store: JsonStore<M>) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }
}

impl<M: Backend + Default + 'static> AsyncJsonStore<M> {
    /// Open the store at `path` with default settings, reading the file on
    /// the blocking pool. Use [`JsonStore::builder`] and `into()` for custom
    /// settings.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        run_blocking(move || JsonStore::<M>::open(path)).await.map(Self::from)
    }
}

impl<M: Backend + 'static> AsyncJsonStore<M> {
    /// The shared synchronous store.
    pub fn sync_store(&self) -> &JsonStore<M> {
        &self.inner
    }

    // ---- reads ----

    /// See [`JsonStore::get`].
    #[must_use]
    pub fn get(&self, key: impl Display) -> Option<Value> {
        self.inner.get(key)
    }

    /// See [`JsonStore::get_or`].
    #[must_use]
    pub fn get_or(&self, key: impl Display, default: impl Into<Value>) -> Value {
        self.inner.get_or(key, default)
    }

    /// See [`JsonStore::get_as`].
    pub fn get_as<T: DeserializeOwned>(&self, key: impl Display) -> Result<Option<T>> {
        self.inner.get_as(key)
    }

    /// See [`JsonStore::contains`].
    #[must_use]
    pub fn contains(&self, key: impl Display) -> bool {
        self.inner.contains(key)
    }

    /// See [`JsonStore::len`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// See [`JsonStore::is_empty`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// See [`JsonStore::all`].
    #[must_use]
    pub fn all(&self) -> Map<String, Value> {
        self.inner.all()
    }

    /// See [`JsonStore::keys`].
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    /// See [`JsonStore::path`].
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    // ---- writes ----

    /// Store `value` under `key`; resolves once the file is replaced.
    pub async fn put(&self, key: impl Display, value: impl Into<Value>) -> Result<Option<Value>> {
        let key = normalize_key(key);
        let value = value.into();
        let store = Arc::clone(&self.inner);
        run_blocking(move || store.put(key, value)).await
    }

    /// Serialize `value` on the calling task, then [`put`](Self::put) it.
    pub async fn put_as<T: Serialize + ?Sized>(
        &self,
        key: impl Display,
        value: &T,
    ) -> Result<Option<Value>> {
        let value = serde_json::to_value(value).map_err(|e| Error::Encode(e.to_string()))?;
        self.put(key, value).await
    }

    /// Remove `key`; fails with [`Error::KeyNotFound`] if absent.
    pub async fn delete(&self, key: impl Display) -> Result<Value> {
        let key = normalize_key(key);
        let store = Arc::clone(&self.inner);
        run_blocking(move || store.delete(key)).await
    }

    /// See [`JsonStore::extend`].
    pub async fn extend<I, K, V>(&self, iter: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Display,
        V: Into<Value>,
    {
        let entries: Vec<(String, Value)> = iter
            .into_iter()
            .map(|(k, v)| (normalize_key(k), v.into()))
            .collect();
        let store = Arc::clone(&self.inner);
        run_blocking(move || store.extend(entries)).await
    }

    /// See [`JsonStore::update`]. The closure runs on the blocking pool.
    pub async fn update<F>(&self, key: impl Display, f: F) -> Result<bool>
    where
        F: FnOnce(&mut Value) + Send + 'static,
    {
        let key = normalize_key(key);
        let store = Arc::clone(&self.inner);
        run_blocking(move || store.update(key, f)).await
    }

    /// See [`JsonStore::get_or_insert`].
    pub async fn get_or_insert(&self, key: impl Display, default: impl Into<Value>) -> Result<Value> {
        let key = normalize_key(key);
        let default = default.into();
        let store = Arc::clone(&self.inner);
        run_blocking(move || store.get_or_insert(key, default)).await
    }

    /// See [`JsonStore::clear`].
    pub async fn clear(&self) -> Result<()> {
        let store = Arc::clone(&self.inner);
        run_blocking(move || store.clear()).await
    }

    // ---- persistence ----

    /// See [`JsonStore::load`].
    pub async fn load(&self) -> Result<()> {
        let store = Arc::clone(&self.inner);
        run_blocking(move || store.load()).await
    }

    /// See [`JsonStore::save`].
    pub async fn save(&self) -> Result<()> {
        let store = Arc::clone(&self.inner);
        run_blocking(move || store.save()).await
    }
}

impl<M> std::fmt::Debug for AsyncJsonStore<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncJsonStore")
            .field("inner", &*self.inner)
            .finish()
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Task(e.to_string()))?
}
