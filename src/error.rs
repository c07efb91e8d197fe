//! Unified error type for all store operations.

/// Things that can go wrong when using the store.
///
/// Messages are kept as strings so the error is `Clone` and can be handed
/// back across a blocking-task boundary.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// File system problem (open, read, write, sync, rename).
    #[error("i/o error: {0}")]
    Io(String),
    /// The backing file, or a stored value, is not valid for the codec or
    /// the requested type.
    #[error("decode error: {0}")]
    Decode(String),
    /// A map or value could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),
    /// `delete` was called for a key that is not in the store.
    #[error("key not found: {0:?}")]
    KeyNotFound(String),
    /// A blocking task running store I/O panicked or was shut down.
    #[error("background task failed: {0}")]
    Task(String),
}

impl Error {
    pub(crate) fn io_at(path: &std::path::Path, err: std::io::Error) -> Self {
        Error::Io(format!("{}: {err}", path.display()))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

// Everything but an I/O failure coming out of serde_json on our read paths
// means the input was bad. Encode paths map their errors explicitly.
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Error::Io(err.to_string())
        } else {
            Error::Decode(err.to_string())
        }
    }
}

/// Result alias using our [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
