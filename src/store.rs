//! Core store type and builder.

use crate::backend::Backend;
use crate::codec::{Codec, JsonCodec};
use crate::error::{Error, Result};
use crate::key::normalize_key;
use crate::persist::{atomic_write, read_map};
use crate::policy::CommitPolicy;
use crate::DefaultBackend;
use parking_lot::{Mutex, MutexGuard};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Display;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Durable JSON key-value store.
///
/// Keys are normalized to strings, values are [`serde_json::Value`]. Every
/// mutation writes the full map to disk (temp file + rename) before it
/// returns, so `Ok` means durable.
///
/// Mutations, [`load`](Self::load) and [`save`](Self::save) are serialized
/// by one lock and never overlap. Reads go straight to the backend `M` and
/// never wait on disk. A single-key read racing a mutation sees either the
/// old or the new value; a key present both before and after a
/// [`load`](Self::load) never reads as missing while it runs.
///
/// Whole-map reads ([`len`](Self::len), [`all`](Self::all),
/// [`keys`](Self::keys)) racing a multi-key change (`load`, `extend`,
/// `clear`) may observe it partly applied on the sharded default backend.
/// `parking_lot::RwLock<HashMap<..>>` swaps `load` under one write lock.
pub struct JsonStore<M = DefaultBackend> {
    map: M,
    path: PathBuf,
    codec: Box<dyn Codec>,
    policy: CommitPolicy,
    lock: Mutex<()>,
}

/// One staged edit, applied to the snapshot and then to the backend.
enum Change {
    Put(String, Value),
    Remove(String),
    Clear,
}

impl Change {
    fn apply_to(&self, map: &mut Map<String, Value>) {
        match self {
            Change::Put(k, v) => {
                map.insert(k.clone(), v.clone());
            }
            Change::Remove(k) => {
                map.remove(k);
            }
            Change::Clear => map.clear(),
        }
    }
}

impl<M: Backend + Default> JsonStore<M> {
    /// Open the store at `path` with default settings. A missing file gives
    /// an empty store; nothing is written until the first mutation or save.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder(path).build()
    }

    /// Start configuring a new store. Call
    /// [`.build()`](JsonStoreBuilder::build) when ready.
    pub fn builder(path: impl AsRef<Path>) -> JsonStoreBuilder<M> {
        JsonStoreBuilder::new(path)
    }
}

impl<M: Backend> JsonStore<M> {
    // ---- reads ----

    /// Value stored under `key`, or `None`.
    #[must_use]
    pub fn get(&self, key: impl Display) -> Option<Value> {
        self.map.get(&normalize_key(key))
    }

    /// Value stored under `key`, or `default` when absent.
    #[must_use]
    pub fn get_or(&self, key: impl Display, default: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Value under `key` converted to `T`. `Ok(None)` when absent,
    /// [`Error::Decode`] when the stored value has the wrong shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: impl Display) -> Result<Option<T>> {
        let key = normalize_key(key);
        match self.map.get(&key) {
            Some(v) => serde_json::from_value(v)
                .map(Some)
                .map_err(|e| Error::Decode(format!("value at {key:?}: {e}"))),
            None => Ok(None),
        }
    }

    /// `true` if `key` is present.
    #[must_use]
    pub fn contains(&self, key: impl Display) -> bool {
        self.map.contains_key(&normalize_key(key))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// `true` when the store has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Snapshot of every entry.
    #[must_use]
    pub fn all(&self) -> Map<String, Value> {
        self.map.snapshot()
    }

    /// Snapshot of all keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys = self.map.keys();
        keys.sort();
        keys
    }

    /// Path to the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Commit policy this store was built with.
    #[must_use]
    pub fn policy(&self) -> CommitPolicy {
        self.policy
    }

    // ---- writes ----

    /// Store `value` under `key` and persist. Returns the previous value.
    pub fn put(&self, key: impl Display, value: impl Into<Value>) -> Result<Option<Value>> {
        let key = normalize_key(key);
        let guard = self.lock.lock();
        let prev = self.map.get(&key);
        trace!(key = %key, "put");
        self.commit(&guard, vec![Change::Put(key, value.into())])?;
        Ok(prev)
    }

    /// Serialize `value` into JSON and [`put`](Self::put) it.
    pub fn put_as<T: Serialize + ?Sized>(&self, key: impl Display, value: &T) -> Result<Option<Value>> {
        let value = serde_json::to_value(value).map_err(|e| Error::Encode(e.to_string()))?;
        self.put(key, value)
    }

    /// Remove `key` and persist. Returns the removed value, or
    /// [`Error::KeyNotFound`] if the key was absent.
    pub fn delete(&self, key: impl Display) -> Result<Value> {
        let key = normalize_key(key);
        let guard = self.lock.lock();
        let prev = self
            .map
            .get(&key)
            .ok_or_else(|| Error::KeyNotFound(key.clone()))?;
        trace!(key = %key, "delete");
        self.commit(&guard, vec![Change::Remove(key)])?;
        Ok(prev)
    }

    /// Put many entries with a single save at the end.
    pub fn extend<I, K, V>(&self, iter: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Display,
        V: Into<Value>,
    {
        let changes: Vec<Change> = iter
            .into_iter()
            .map(|(k, v)| Change::Put(normalize_key(k), v.into()))
            .collect();
        if changes.is_empty() {
            return Ok(());
        }
        let guard = self.lock.lock();
        self.commit(&guard, changes)
    }

    /// Mutate the value at `key` in place and persist. Returns `false` (and
    /// writes nothing) if the key doesn't exist.
    ///
    /// Runs under the store lock, so it does not race other mutations.
    pub fn update<F>(&self, key: impl Display, f: F) -> Result<bool>
    where
        F: FnOnce(&mut Value),
    {
        let key = normalize_key(key);
        let guard = self.lock.lock();
        match self.map.get(&key) {
            Some(mut v) => {
                f(&mut v);
                self.commit(&guard, vec![Change::Put(key, v)])?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Return the value at `key`, or store `default` there and return it.
    pub fn get_or_insert(&self, key: impl Display, default: impl Into<Value>) -> Result<Value> {
        let key = normalize_key(key);
        let guard = self.lock.lock();
        if let Some(v) = self.map.get(&key) {
            return Ok(v);
        }
        let value = default.into();
        self.commit(&guard, vec![Change::Put(key, value.clone())])?;
        Ok(value)
    }

    /// Drop every entry and persist the empty map.
    pub fn clear(&self) -> Result<()> {
        let guard = self.lock.lock();
        self.commit(&guard, vec![Change::Clear])
    }

    // ---- persistence ----

    /// Re-read the backing file and replace the in-memory contents with it.
    /// On any error the in-memory map is left as it was.
    pub fn load(&self) -> Result<()> {
        let _guard = self.lock.lock();
        let entries = read_map(&self.path, self.codec.as_ref())?;
        debug!(path = %self.path.display(), entries = entries.len(), "loaded store");
        self.map.replace_all(entries);
        Ok(())
    }

    /// Write the full in-memory map to disk.
    pub fn save(&self) -> Result<()> {
        let _guard = self.lock.lock();
        self.write_snapshot(&self.map.snapshot())
    }

    // ---- internal ----

    // The guard is only a witness that the caller holds the store lock.
    fn commit(&self, _guard: &MutexGuard<'_, ()>, changes: Vec<Change>) -> Result<()> {
        let mut next = self.map.snapshot();
        for change in &changes {
            change.apply_to(&mut next);
        }
        match self.policy {
            CommitPolicy::AfterSave => {
                self.write_snapshot(&next)?;
                self.apply(changes);
            }
            CommitPolicy::BeforeSave => {
                self.apply(changes);
                self.write_snapshot(&next)?;
            }
        }
        Ok(())
    }

    fn apply(&self, changes: Vec<Change>) {
        for change in changes {
            match change {
                Change::Put(k, v) => {
                    self.map.insert(k, v);
                }
                Change::Remove(k) => {
                    self.map.remove(&k);
                }
                Change::Clear => self.map.clear(),
            }
        }
    }

    fn write_snapshot(&self, snapshot: &Map<String, Value>) -> Result<()> {
        let bytes = self.codec.encode(snapshot)?;
        atomic_write(&self.path, &bytes)?;
        debug!(
            path = %self.path.display(),
            entries = snapshot.len(),
            bytes = bytes.len(),
            "saved store"
        );
        Ok(())
    }
}

impl<M> std::fmt::Debug for JsonStore<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonStore")
            .field("path", &self.path)
            .field("codec", &self.codec)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and opens a [`JsonStore`].
///
/// ```rust,no_run
/// use json_vault::{CommitPolicy, JsonCodec, JsonStore};
///
/// let store: JsonStore = JsonStore::builder("prefs.json")
///     .codec(JsonCodec::new().indent(4))
///     .policy(CommitPolicy::BeforeSave)
///     .build()
///     .unwrap();
/// ```
pub struct JsonStoreBuilder<M = DefaultBackend> {
    path: PathBuf,
    codec: Box<dyn Codec>,
    policy: CommitPolicy,
    _marker: PhantomData<M>,
}

impl<M: Backend + Default> JsonStoreBuilder<M> {
    fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            codec: Box::new(JsonCodec::default()),
            policy: CommitPolicy::default(),
            _marker: PhantomData,
        }
    }

    /// Encoding used for the backing file (default: [`JsonCodec::new`]).
    pub fn codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    /// Commit policy (default: [`CommitPolicy::AfterSave`]).
    pub fn policy(mut self, policy: CommitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Load the backing file, if any, and return the store. A file that
    /// exists but does not decode fails with [`Error::Decode`].
    pub fn build(self) -> Result<JsonStore<M>> {
        let entries = read_map(&self.path, self.codec.as_ref())?;
        debug!(path = %self.path.display(), entries = entries.len(), "opened store");
        let map = M::default();
        map.replace_all(entries);
        Ok(JsonStore {
            map,
            path: self.path,
            codec: self.codec,
            policy: self.policy,
            lock: Mutex::new(()),
        })
    }
}

impl<M> std::fmt::Debug for JsonStoreBuilder<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonStoreBuilder")
            .field("path", &self.path)
            .field("codec", &self.codec)
            .field("policy", &self.policy)
            .finish()
    }
}
