//! # Contracts
//!
//! Frozen interface contracts shared by every imgstore crate: the job
//! descriptor handed to the dispatcher, the report it settles with, the
//! storage seam, the service configuration and the error taxonomy.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Path model
//! Every job is persisted to `root/folder_id/date_partition/name` for each
//! configured save root, with the date partition fixed at admission.

mod blueprint;
mod error;
mod job;
mod writer;

pub use blueprint::*;
pub use error::*;
pub use job::*;
pub use writer::*;
