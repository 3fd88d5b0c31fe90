//! Layered error definitions
//!
//! Categorized by source: config / job / write

use std::path::PathBuf;

use thiserror::Error;

use crate::JobId;

/// Configuration and general contract errors
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Terminal failure of a single job, delivered through its completion handle
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    /// Payload was not valid base64; no writes were attempted
    #[error("job {job_id}: payload decode failed: {message}")]
    Decode { job_id: JobId, message: String },

    /// Execution unit crashed before reporting
    #[error("job {job_id}: execution unit fault: {message}")]
    UnitFault { job_id: JobId, message: String },

    /// `require_any` policy: every configured root failed
    #[error("job {job_id}: no save root written ({attempted} attempted)")]
    NoRootWritten { job_id: JobId, attempted: usize },

    /// Dispatcher stopped before the job was settled
    #[error("dispatcher closed before job was settled")]
    DispatcherClosed,
}

impl JobError {
    /// Create decode error
    pub fn decode(job_id: JobId, message: impl Into<String>) -> Self {
        Self::Decode {
            job_id,
            message: message.into(),
        }
    }

    /// Create unit fault error
    pub fn unit_fault(job_id: JobId, message: impl Into<String>) -> Self {
        Self::UnitFault {
            job_id,
            message: message.into(),
        }
    }

    /// Short label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "decode",
            Self::UnitFault { .. } => "unit_fault",
            Self::NoRootWritten { .. } => "no_root_written",
            Self::DispatcherClosed => "dispatcher_closed",
        }
    }
}

/// Failure to persist a job to one save root
#[derive(Debug, Error)]
#[error("write to '{}' failed: {source}", .path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl WriteError {
    pub fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}
