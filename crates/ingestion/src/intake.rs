//! Intake - turns upload requests into dispatcher jobs

use chrono::{Local, NaiveDate};
use contracts::{IntakeConfig, Job};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data_url::parse_data_url;
use crate::error::{IngestionError, Result};
use crate::sanitize::{extension_for, sanitize_identifier};

/// Date partition format (`YYYY-MM-DD`)
pub const DATE_PARTITION_FORMAT: &str = "%Y-%m-%d";

/// Upload request as submitted by a client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub folder_id: Option<String>,
}

/// Admission front of the dispatcher
#[derive(Debug, Clone, Default)]
pub struct Intake {
    config: IntakeConfig,
}

impl Intake {
    pub fn new(config: IntakeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    /// Admit a request, fixing the date partition from the local clock.
    pub fn admit(&self, request: &UploadRequest) -> Result<Job> {
        self.admit_on(request, Local::now().date_naive())
    }

    /// Admit a request with an explicit date partition.
    ///
    /// The date is computed once here so every save root receives the same
    /// partition even if the job runs across midnight.
    pub fn admit_on(&self, request: &UploadRequest, date: NaiveDate) -> Result<Job> {
        let url = required(&request.url, "url")?;
        let name = required(&request.name, "name")?;
        let folder_id = required(&request.folder_id, "folderId")?;

        let parsed = parse_data_url(url)?;

        let max = self.config.max_identifier_len;
        let name = sanitize_identifier(name, max)
            .ok_or(IngestionError::InvalidIdentifier { field: "name" })?;
        let folder_id = sanitize_identifier(folder_id, max)
            .ok_or(IngestionError::InvalidIdentifier { field: "folderId" })?;

        let extension = extension_for(parsed.mime, &self.config.default_extension);

        let job = Job {
            mime: parsed.mime.to_string(),
            payload: parsed.data.to_string(),
            name: format!("{name}{extension}"),
            folder_id,
            date_partition: date.format(DATE_PARTITION_FORMAT).to_string(),
        };

        debug!(
            name = %job.name,
            folder_id = %job.folder_id,
            date = %job.date_partition,
            encoded_len = job.payload.len(),
            "Request admitted"
        );

        Ok(job)
    }
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(IngestionError::MissingField { field }),
    }
}
