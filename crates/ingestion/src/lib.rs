//! # Ingestion
//!
//! Upload admission module.
//!
//! Responsibilities:
//! - Validate `data:image/*;base64,` URLs
//! - Sanitize file names and folder identifiers
//! - Derive the file extension from the MIME type
//! - Fix the date partition once, at admission
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{Intake, UploadRequest};
//!
//! let intake = Intake::new(config.intake.clone());
//! let job = intake.admit(&request)?;
//! let handle = dispatcher.submit(job);
//! ```

mod data_url;
mod error;
mod intake;
mod sanitize;

// Re-exports
pub use contracts::Job;
pub use data_url::{parse_data_url, DataUrl};
pub use error::{IngestionError, Result};
pub use intake::{Intake, UploadRequest, DATE_PARTITION_FORMAT};
pub use sanitize::{extension_for, sanitize_identifier};
