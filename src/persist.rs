//! Disk I/O helpers: read the backing file and replace it atomically.
//!
//! A write goes to a freshly named temp file in the target's directory, is
//! flushed and fsynced, and is then renamed over the target. Readers of the
//! target only ever see the old file or the new one. On FAT32 or network
//! shares rename is not guaranteed atomic; keep backups there.

use crate::codec::Codec;
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Reads and decodes the file at `path`. A missing file is an empty map;
/// a present file that does not decode is an error, never an empty map.
pub fn read_map(path: &Path, codec: &dyn Codec) -> Result<Map<String, Value>> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(Error::io_at(path, e)),
    };
    codec.decode(&bytes).map_err(|err| match err {
        Error::Decode(msg) => Error::Decode(format!("{}: {msg}", path.display())),
        other => other,
    })
}

/// Bytes written to a temp file next to the target, not yet published.
///
/// Dropping it without [`commit`](Self::commit) removes the temp file and
/// leaves the target untouched.
#[derive(Debug)]
pub struct StagedWrite {
    temp: tempfile::TempPath,
    target: PathBuf,
}

impl StagedWrite {
    /// Write `bytes` to a new temp file in `target`'s directory, then flush,
    /// fsync and close it.
    pub fn stage(target: &Path, bytes: &[u8]) -> Result<Self> {
        let dir = parent_dir(target);
        let prefix = format!(
            ".{}.",
            target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "store".to_string())
        );
        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| Error::io_at(dir, e))?;
        let synced = (|| -> std::io::Result<()> {
            file.write_all(bytes)?;
            file.flush()?;
            file.as_file().sync_all()
        })();
        if let Err(e) = synced {
            return Err(Error::io_at(file.path(), e));
        }
        Ok(Self {
            temp: file.into_temp_path(),
            target: target.to_path_buf(),
        })
    }

    /// Where the bytes currently sit.
    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    /// Rename the temp file over the target.
    pub fn commit(self) -> Result<()> {
        let target = self.target;
        self.temp
            .persist(&target)
            .map_err(|e| Error::io_at(&target, e.error))?;
        sync_dir(parent_dir(&target));
        Ok(())
    }
}

/// Stage `bytes` and publish them over `path` in one go.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    StagedWrite::stage(path, bytes)?.commit()
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

// The rename is already visible at this point; a failed directory sync only
// weakens durability across power loss, so it is reported but not returned.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = std::fs::File::open(dir).and_then(|d| d.sync_all()) {
        tracing::warn!(dir = %dir.display(), error = %e, "directory fsync after rename failed");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
