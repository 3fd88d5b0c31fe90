//! Execution unit - decode one job and replicate it to every save root

use std::path::PathBuf;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use bytes::Bytes;
use contracts::{BlobWriter, Job, JobError, JobId, JobReport, RootWrite, SuccessPolicy};
use observability::record_root_write;
use tracing::{debug, error, instrument};

/// Standard alphabet, padding optional
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Stateless job executor shared by all workers
#[derive(Debug)]
pub struct ExecutionUnit<W> {
    writer: W,
    roots: Vec<PathBuf>,
    policy: SuccessPolicy,
}

impl<W: BlobWriter> ExecutionUnit<W> {
    pub fn new(writer: W, roots: Vec<PathBuf>, policy: SuccessPolicy) -> Self {
        Self {
            writer,
            roots,
            policy,
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Run one job to completion.
    ///
    /// Fails only on a decode error (before any write) or, under
    /// [`SuccessPolicy::RequireAny`], when no root was written. Individual
    /// root failures are recorded in the report and never stop the loop.
    #[instrument(
        name = "execution_unit_run",
        skip(self, job),
        fields(job_id = %job_id, name = %job.name, folder_id = %job.folder_id)
    )]
    pub async fn run(&self, job_id: JobId, mut job: Job) -> Result<JobReport, JobError> {
        let contents = decode_payload(job_id, std::mem::take(&mut job.payload)).await?;
        let bytes = contents.len();

        let mut writes = Vec::with_capacity(self.roots.len());
        for root in &self.roots {
            let target = job.target_path(root);
            let error = match self.writer.write(&target, contents.clone()).await {
                Ok(()) => {
                    record_root_write(true);
                    debug!(writer = self.writer.name(), target = %target.display(), "write ok");
                    None
                }
                Err(e) => {
                    record_root_write(false);
                    error!(writer = self.writer.name(), error = %e, "write failed");
                    Some(e.to_string())
                }
            };
            writes.push(RootWrite {
                root: root.clone(),
                target,
                error,
            });
        }

        let report = JobReport {
            job_id,
            name: job.name,
            folder_id: job.folder_id,
            bytes,
            writes,
        };

        if self.policy == SuccessPolicy::RequireAny
            && !report.writes.is_empty()
            && report.written_roots() == 0
        {
            return Err(JobError::NoRootWritten {
                job_id,
                attempted: report.writes.len(),
            });
        }

        Ok(report)
    }
}

/// Decode the base64 payload on the blocking pool
async fn decode_payload(job_id: JobId, payload: String) -> Result<Bytes, JobError> {
    tokio::task::spawn_blocking(move || PAYLOAD_ENGINE.decode(payload.as_bytes()))
        .await
        .map_err(|e| JobError::unit_fault(job_id, e.to_string()))?
        .map(Bytes::from)
        .map_err(|e| JobError::decode(job_id, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::AtomicFileWriter;
    use contracts::WriteError;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    /// Counts calls and always fails
    #[derive(Default)]
    struct FailingWriter {
        calls: Arc<AtomicUsize>,
    }

    impl BlobWriter for FailingWriter {
        fn name(&self) -> &str {
            "failing"
        }

        async fn write(&self, target: &Path, _contents: Bytes) -> Result<(), WriteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(WriteError::new(
                target,
                std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            ))
        }
    }

    fn job(payload: &str) -> Job {
        Job {
            mime: "image/png".into(),
            payload: payload.into(),
            name: "img.png".into(),
            folder_id: "f1".into(),
            date_partition: "2024-01-01".into(),
        }
    }

    #[tokio::test]
    async fn test_writes_every_root() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        let unit = ExecutionUnit::new(
            AtomicFileWriter::default(),
            vec![a.path().to_path_buf(), b.path().to_path_buf()],
            SuccessPolicy::BestEffort,
        );

        let report = unit.run(JobId(1), job("AQID")).await.unwrap();

        assert_eq!(report.bytes, 3);
        assert_eq!(report.written_roots(), 2);
        for root in [a.path(), b.path()] {
            let data = fs::read(root.join("f1/2024-01-01/img.png")).unwrap();
            assert_eq!(data, vec![0x01, 0x02, 0x03]);
        }
    }

    #[tokio::test]
    async fn test_unpadded_payload_decodes() {
        let dir = tempdir().unwrap();
        let unit = ExecutionUnit::new(
            AtomicFileWriter::default(),
            vec![dir.path().to_path_buf()],
            SuccessPolicy::BestEffort,
        );
        // "AQI" is [0x01, 0x02] without its trailing '='
        let report = unit.run(JobId(1), job("AQI")).await.unwrap();
        assert_eq!(report.bytes, 2);
    }

    #[tokio::test]
    async fn test_decode_failure_skips_writes() {
        let writer = FailingWriter::default();
        let calls = Arc::clone(&writer.calls);
        let unit = ExecutionUnit::new(writer, vec!["/a".into()], SuccessPolicy::BestEffort);

        let err = unit.run(JobId(9), job("not base64!")).await.unwrap_err();

        assert!(matches!(err, JobError::Decode { job_id: JobId(9), .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_canonical_payload_rejected() {
        // "AQJ" 末尾多余 bit 非零；"AQ ID" 含空白，两者都不放宽
        for payload in ["AQJ", "AQJ=", "AQ ID"] {
            let writer = FailingWriter::default();
            let calls = Arc::clone(&writer.calls);
            let unit = ExecutionUnit::new(writer, vec!["/a".into()], SuccessPolicy::BestEffort);

            let err = unit.run(JobId(3), job(payload)).await.unwrap_err();

            assert!(matches!(err, JobError::Decode { .. }), "{payload}: {err:?}");
            assert_eq!(calls.load(Ordering::SeqCst), 0, "{payload}");
        }
    }

    #[tokio::test]
    async fn test_best_effort_reports_success_when_all_roots_fail() {
        let writer = FailingWriter::default();
        let calls = Arc::clone(&writer.calls);
        let unit = ExecutionUnit::new(
            writer,
            vec!["/a".into(), "/b".into()],
            SuccessPolicy::BestEffort,
        );

        let report = unit.run(JobId(2), job("AQID")).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.failed_roots(), 2);
        assert!(report.writes[0].error.as_deref().unwrap().contains("disk full"));
    }

    #[tokio::test]
    async fn test_require_any_fails_when_all_roots_fail() {
        let unit = ExecutionUnit::new(
            FailingWriter::default(),
            vec!["/a".into(), "/b".into()],
            SuccessPolicy::RequireAny,
        );

        let err = unit.run(JobId(3), job("AQID")).await.unwrap_err();
        assert_eq!(
            err,
            JobError::NoRootWritten {
                job_id: JobId(3),
                attempted: 2
            }
        );
    }

    #[tokio::test]
    async fn test_require_any_with_no_roots_succeeds() {
        let unit = ExecutionUnit::new(FailingWriter::default(), vec![], SuccessPolicy::RequireAny);
        let report = unit.run(JobId(4), job("AQID")).await.unwrap();
        assert!(report.writes.is_empty());
        assert_eq!(report.bytes, 3);
    }

    #[tokio::test]
    async fn test_failing_root_does_not_block_next_root() {
        let scratch = tempdir().unwrap();
        let blocker = scratch.path().join("blocker");
        fs::write(&blocker, b"file").unwrap();
        let good = tempdir().unwrap();

        let unit = ExecutionUnit::new(
            AtomicFileWriter::default(),
            vec![blocker.clone(), good.path().to_path_buf()],
            SuccessPolicy::BestEffort,
        );

        let report = unit.run(JobId(5), job("AQID")).await.unwrap();

        assert!(!report.writes[0].is_ok());
        assert!(report.writes[1].is_ok());
        assert_eq!(
            fs::read(good.path().join("f1/2024-01-01/img.png")).unwrap(),
            vec![0x01, 0x02, 0x03]
        );
    }
}
