//! Pipeline orchestrator - reads upload requests and feeds the dispatcher.
//!
//! Every input line is one JSON upload request. Each line gets an admission
//! response on the output; with `wait` enabled every settled job also gets an
//! outcome line after the dispatcher drains.

use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{Job, JobId, ServiceConfig};
use dispatcher::{create_dispatcher, JobResult};
use ingestion::{Intake, UploadRequest};
use observability::record_admission_rejected;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::PipelineStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Effective service configuration
    pub service: ServiceConfig,

    /// Await every job and report its outcome
    pub wait: bool,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Per-line response written to the output
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Response {
    Accepted {
        line: u64,
        job_id: u64,
    },
    BadRequest {
        line: u64,
        reason: &'static str,
    },
    Completed {
        job_id: u64,
        bytes: usize,
        written: usize,
        failed: usize,
    },
    Failed {
        job_id: u64,
        kind: &'static str,
        error: String,
    },
}

impl Response {
    fn outcome(job_id: JobId, result: &JobResult) -> Self {
        match result {
            Ok(report) => Self::Completed {
                job_id: job_id.0,
                bytes: report.bytes,
                written: report.written_roots(),
                failed: report.failed_roots(),
            },
            Err(e) => Self::Failed {
                job_id: job_id.0,
                kind: e.kind(),
                error: e.to_string(),
            },
        }
    }
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until the input ends or `shutdown` resolves, then drain every
    /// admitted job.
    pub async fn run<R, W, F>(self, input: R, mut output: W, shutdown: F) -> Result<PipelineStats>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let service = &self.config.service;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let intake = Intake::new(service.intake.clone());
        let dispatcher =
            create_dispatcher(&service.store).context("Failed to start dispatcher")?;

        info!(
            concurrency = dispatcher.concurrency(),
            save_roots = service.store.save_roots.len(),
            wait = self.config.wait,
            "Pipeline started"
        );

        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(JobId, JobResult, Duration)>();
        let mut stats = PipelineStats::default();
        let mut lines = input.lines();
        tokio::pin!(shutdown);

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line.context("Failed to read upload request")?,
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, no longer reading input");
                    stats.interrupted = true;
                    break;
                }
            };
            let Some(line) = line else {
                break;
            };

            stats.lines_read += 1;
            let line_no = stats.lines_read;
            if line.trim().is_empty() {
                continue;
            }

            let response = match admit_line(&intake, &line) {
                Ok(job) => {
                    let handle = dispatcher.submit(job);
                    let job_id = handle.job_id();
                    stats.accepted += 1;

                    if self.config.wait {
                        let tx = done_tx.clone();
                        let submitted_at = Instant::now();
                        tokio::spawn(async move {
                            let result = handle.await;
                            let _ = tx.send((job_id, result, submitted_at.elapsed()));
                        });
                    }

                    Response::Accepted {
                        line: line_no,
                        job_id: job_id.0,
                    }
                }
                Err(reason) => {
                    debug!(line = line_no, reason, "Upload request rejected");
                    record_admission_rejected(reason);
                    stats.rejected += 1;
                    Response::BadRequest {
                        line: line_no,
                        reason,
                    }
                }
            };

            write_response(&mut output, &response).await?;
        }
        drop(done_tx);

        info!(
            accepted = stats.accepted,
            rejected = stats.rejected,
            "Input finished, draining dispatcher"
        );
        stats.dispatcher = dispatcher.shutdown().await;

        while let Some((job_id, result, elapsed)) = done_rx.recv().await {
            stats.jobs.update(&result, elapsed);
            write_response(&mut output, &Response::outcome(job_id, &result)).await?;
        }

        output.flush().await.context("Failed to flush output")?;
        stats.duration = start_time.elapsed();
        Ok(stats)
    }
}

/// Parse and admit a single request line; the error is a stable reason tag
fn admit_line(intake: &Intake, line: &str) -> std::result::Result<Job, &'static str> {
    let request: UploadRequest = serde_json::from_str(line).map_err(|_| "invalid json")?;
    intake.admit(&request).map_err(|e| e.reason())
}

async fn write_response<W: AsyncWrite + Unpin>(output: &mut W, response: &Response) -> Result<()> {
    let mut json = serde_json::to_string(response).context("Failed to serialize response")?;
    json.push('\n');
    output
        .write_all(json.as_bytes())
        .await
        .context("Failed to write response")
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::StoreConfig;
    use std::future::pending;
    use std::path::Path;

    fn config(roots: Vec<std::path::PathBuf>, wait: bool) -> PipelineConfig {
        PipelineConfig {
            service: ServiceConfig {
                store: StoreConfig {
                    concurrency: 2,
                    save_roots: roots,
                    ..StoreConfig::default()
                },
                ..ServiceConfig::default()
            },
            wait,
            metrics_port: None,
        }
    }

    fn responses(output: &[u8]) -> Vec<serde_json::Value> {
        std::str::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn stored_files(root: &Path) -> usize {
        std::fs::read_dir(root)
            .map(|dates| {
                dates
                    .flatten()
                    .flat_map(|date| std::fs::read_dir(date.path()).into_iter().flatten())
                    .flatten()
                    .flat_map(|folder| std::fs::read_dir(folder.path()).into_iter().flatten())
                    .count()
            })
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_accepts_and_rejects_per_line() {
        let root = tempfile::tempdir().unwrap();
        let input = concat!(
            r#"{"url":"data:image/png;base64,AQID","name":"a","folderId":"f1"}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"url":"data:image/png;base64,AQID","folderId":"f1"}"#,
            "\n",
            r#"{"url":"data:image/jpeg;base64,BAUG","name":"b","folderId":"f2"}"#,
            "\n",
        );

        let mut output = Vec::new();
        let stats = Pipeline::new(config(vec![root.path().to_path_buf()], false))
            .run(input.as_bytes(), &mut output, pending())
            .await
            .unwrap();

        assert_eq!(stats.lines_read, 5);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.rejected, 2);
        assert!(!stats.interrupted);
        assert_eq!(stats.dispatcher.succeeded, 2);

        let lines = responses(&output);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["status"], "accepted");
        assert_eq!(lines[0]["line"], 1);
        assert_eq!(lines[1]["status"], "bad_request");
        assert_eq!(lines[1]["reason"], "invalid json");
        assert_eq!(lines[2]["status"], "bad_request");
        assert_eq!(lines[2]["line"], 4);
        assert_eq!(lines[3]["status"], "accepted");

        // Fire-and-forget jobs are still finished before run returns.
        assert_eq!(stored_files(root.path()), 2);
    }

    #[tokio::test]
    async fn test_wait_reports_outcomes() {
        let root = tempfile::tempdir().unwrap();
        let input = concat!(
            r#"{"url":"data:image/png;base64,AQID","name":"ok","folderId":"f"}"#,
            "\n",
            r#"{"url":"data:image/png;base64,***","name":"bad","folderId":"f"}"#,
            "\n",
        );

        let mut output = Vec::new();
        let stats = Pipeline::new(config(vec![root.path().to_path_buf()], true))
            .run(input.as_bytes(), &mut output, pending())
            .await
            .unwrap();

        assert_eq!(stats.jobs.total_jobs, 2);
        assert_eq!(stats.jobs.succeeded, 1);
        assert_eq!(stats.jobs.failed, 1);
        assert_eq!(stats.jobs.bytes_decoded, 3);

        let lines = responses(&output);
        let completed: Vec<_> = lines.iter().filter(|l| l["status"] == "completed").collect();
        let failed: Vec<_> = lines.iter().filter(|l| l["status"] == "failed").collect();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0]["bytes"], 3);
        assert_eq!(completed[0]["written"], 1);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0]["kind"], "decode");
    }

    #[tokio::test]
    async fn test_shutdown_stops_reading() {
        let (_writer, reader) = tokio::io::duplex(64);
        let mut output = Vec::new();

        let stats = Pipeline::new(config(Vec::new(), false))
            .run(tokio::io::BufReader::new(reader), &mut output, async {})
            .await
            .unwrap();

        assert!(stats.interrupted);
        assert_eq!(stats.lines_read, 0);
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_zero_concurrency_fails_to_start() {
        let mut cfg = config(Vec::new(), false);
        cfg.service.store.concurrency = 0;

        let result = Pipeline::new(cfg)
            .run(&b""[..], Vec::new(), pending())
            .await;
        assert!(result.is_err());
    }
}
