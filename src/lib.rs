//! Durable JSON key-value store.
//!
//! An in-memory `String -> serde_json::Value` map kept in sync with one file.
//! Every mutation writes the whole map to a temp file and renames it over
//! the target before returning, so the file is never seen half-written.
//!
//! ```rust,no_run
//! use json_vault::JsonStore;
//!
//! let store: JsonStore = JsonStore::open("settings.json").unwrap();
//! store.put(5, "five").unwrap();
//! assert_eq!(store.get("5"), Some("five".into()));
//! store.delete("5").unwrap();
//! ```
//!
//! Async hosts should use [`AsyncJsonStore`], which runs the disk work on
//! tokio's blocking pool.
//!
//! **Single-process only.** Two processes opening the same file will clobber
//! each other.

#![deny(missing_docs)]
#![warn(clippy::all)]

#[cfg(feature = "tokio")]
pub mod async_store;
pub mod backend;
pub mod codec;
pub mod error;
pub mod key;
pub mod persist;
pub mod policy;
pub mod store;

#[cfg(feature = "tokio")]
pub use async_store::AsyncJsonStore;
pub use backend::Backend;
pub use codec::{Codec, EncodeHook, JsonCodec, ObjectHook};
pub use error::{Error, Result};
pub use policy::CommitPolicy;
pub use serde_json::{Map, Value};
pub use store::{JsonStore, JsonStoreBuilder};

/// Default backend: a sharded `DashMap`.
pub type DefaultBackend = dashmap::DashMap<String, Value>;
