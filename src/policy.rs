//! When a mutation reaches memory relative to its save.

/// Ordering of the in-memory update and the disk write inside one mutation.
///
/// Either way the mutation holds the store lock for the whole sequence and
/// the file only ever holds a complete snapshot.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommitPolicy {
    /// Persist a snapshot that includes the change, then apply it to memory.
    /// A failed save leaves memory and disk both at the previous state.
    #[default]
    AfterSave,
    /// Apply to memory first, then persist. A failed save leaves memory
    /// ahead of disk until the next successful save; roll back or retry if
    /// that matters.
    BeforeSave,
}
