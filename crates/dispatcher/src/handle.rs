//! CompletionHandle - caller side of a submitted job

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use contracts::{JobError, JobId, JobReport};
use tokio::sync::oneshot;

/// Settled outcome of one job
pub type JobResult = Result<JobReport, JobError>;

/// Resolves once the job's execution unit reports.
///
/// Dropping the handle is allowed: the dispatcher still runs the job and
/// logs a failure nobody observed.
#[derive(Debug)]
#[must_use = "drop the handle explicitly for fire-and-forget submission"]
pub struct CompletionHandle {
    job_id: JobId,
    rx: oneshot::Receiver<JobResult>,
}

impl CompletionHandle {
    pub(crate) fn new(job_id: JobId, rx: oneshot::Receiver<JobResult>) -> Self {
        Self { job_id, rx }
    }

    /// Identifier assigned at submission
    pub fn job_id(&self) -> JobId {
        self.job_id
    }
}

impl Future for CompletionHandle {
    type Output = JobResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|settled| settled.unwrap_or(Err(JobError::DispatcherClosed)))
    }
}
