//! AtomicFileWriter - temp-file-then-rename writes
//!
//! The temp file lives in the target's directory so the final `rename`
//! stays on one filesystem and is atomic for any observer of the target.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use contracts::{BlobWriter, WriteError};
use tracing::{debug, instrument, warn};

/// Prefix of in-progress temp files
pub const TEMP_PREFIX: &str = ".tmp-";

/// Writer that publishes files with all-or-nothing visibility
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    name: String,
}

impl AtomicFileWriter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for AtomicFileWriter {
    fn default() -> Self {
        Self::new("atomic_file")
    }
}

impl BlobWriter for AtomicFileWriter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "atomic_file_write",
        skip(self, target, contents),
        fields(writer = %self.name, target = %target.display(), bytes = contents.len())
    )]
    async fn write(&self, target: &Path, contents: Bytes) -> Result<(), WriteError> {
        let path = target.to_path_buf();
        let blocking_path = path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&blocking_path, &contents))
            .await
            .map_err(|e| WriteError::new(path.clone(), io::Error::other(e)))?
            .map_err(|e| WriteError::new(path, e))
    }
}

/// Synchronously write `contents` to `target` via a sibling temp file.
///
/// 1. create the parent directory chain (concurrent creators are fine)
/// 2. write a uniquely named temp file in that directory
/// 3. rename it over `target`
///
/// On failure after the temp file exists it is removed best-effort.
pub fn write_atomic(target: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = target.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "target path has no parent directory",
        )
    })?;
    fs::create_dir_all(dir)?;

    let tmp = temp_path(dir);
    if let Err(e) = write_new(&tmp, contents).and_then(|()| fs::rename(&tmp, target)) {
        if let Err(cleanup) = fs::remove_file(&tmp) {
            if cleanup.kind() != io::ErrorKind::NotFound {
                warn!(tmp = %tmp.display(), error = %cleanup, "Temp file cleanup failed");
            }
        }
        return Err(e);
    }

    debug!(target = %target.display(), bytes = contents.len(), "File published");
    Ok(())
}

fn write_new(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    file.write_all(contents)
}

/// `.tmp-<pid>-<unix millis>-<random>` inside `dir`
fn temp_path(dir: &Path) -> PathBuf {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    dir.join(format!(
        "{TEMP_PREFIX}{}-{millis}-{:016x}",
        std::process::id(),
        rand::random::<u64>()
    ))
}
