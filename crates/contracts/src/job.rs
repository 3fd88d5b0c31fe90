//! Job - unit of work handed from admission to the dispatcher
//!
//! A job carries the still-encoded payload plus the sanitized path
//! components. Decoding happens inside the execution unit.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Dispatcher-assigned job identifier, monotonic per dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Validated job descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// MIME type of the payload (e.g., "image/png")
    pub mime: String,

    /// Base64 payload as submitted
    pub payload: String,

    /// Sanitized file name including extension
    pub name: String,

    /// Sanitized folder identifier
    pub folder_id: String,

    /// `YYYY-MM-DD`, fixed at admission
    pub date_partition: String,
}

impl Job {
    /// Path relative to a save root: `folder_id/date_partition/name`
    pub fn relative_path(&self) -> PathBuf {
        [
            self.folder_id.as_str(),
            self.date_partition.as_str(),
            self.name.as_str(),
        ]
        .iter()
        .collect()
    }

    /// Final destination under `root`
    pub fn target_path(&self, root: &Path) -> PathBuf {
        root.join(self.relative_path())
    }
}

/// Outcome of writing one job to one save root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootWrite {
    pub root: PathBuf,
    pub target: PathBuf,
    /// `None` on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RootWrite {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of a job whose execution unit ran to completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: JobId,
    pub name: String,
    pub folder_id: String,
    /// Decoded payload size
    pub bytes: usize,
    /// One entry per save root, in configured order
    pub writes: Vec<RootWrite>,
}

impl JobReport {
    /// Number of roots that hold the file
    pub fn written_roots(&self) -> usize {
        self.writes.iter().filter(|w| w.is_ok()).count()
    }

    /// Number of roots whose write failed
    pub fn failed_roots(&self) -> usize {
        self.writes.len() - self.written_roots()
    }
}
