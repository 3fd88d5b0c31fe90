//! BlobWriter trait - Execution Unit storage interface

use std::path::Path;

use bytes::Bytes;

use crate::WriteError;

/// Storage primitive used by the Execution Unit for every save root.
///
/// Implementations must give all-or-nothing visibility: an observer of
/// `target` sees either nothing (or the previous file) or the complete
/// `contents`, never a partial write.
#[trait_variant::make(BlobWriter: Send)]
pub trait LocalBlobWriter {
    /// Writer name (used for logging)
    fn name(&self) -> &str;

    /// Persist `contents` at `target`, creating parent directories as needed.
    ///
    /// # Errors
    /// Returns the failing path with the underlying IO error.
    async fn write(&self, target: &Path, contents: Bytes) -> Result<(), WriteError>;
}
