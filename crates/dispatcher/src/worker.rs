//! Worker pool - long-lived tasks that each run one job at a time

use std::sync::Arc;

use contracts::{BlobWriter, Job, JobError, JobId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use crate::handle::JobResult;
use crate::unit::ExecutionUnit;

/// Job handed from the dispatcher to a free worker
#[derive(Debug)]
pub(crate) struct Assignment {
    pub job_id: JobId,
    pub job: Job,
}

/// Worker report back to the dispatcher
#[derive(Debug)]
pub(crate) struct Completion {
    pub job_id: JobId,
    pub result: JobResult,
}

/// Spawn `count` workers sharing one task queue
pub(crate) fn spawn_workers<W>(
    count: usize,
    unit: Arc<ExecutionUnit<W>>,
    tasks: async_channel::Receiver<Assignment>,
    completions: mpsc::UnboundedSender<Completion>,
) -> Vec<JoinHandle<()>>
where
    W: BlobWriter + Send + Sync + 'static,
{
    (0..count)
        .map(|index| {
            let unit = Arc::clone(&unit);
            let tasks = tasks.clone();
            let completions = completions.clone();
            tokio::spawn(unit_worker(index, unit, tasks, completions))
        })
        .collect()
}

/// Pulls assignments until the task queue is closed.
///
/// Each job runs in its own task so a panicking unit is reported as
/// [`JobError::UnitFault`] and the worker keeps its slot.
#[instrument(name = "unit_worker_loop", skip(unit, tasks, completions))]
async fn unit_worker<W>(
    index: usize,
    unit: Arc<ExecutionUnit<W>>,
    tasks: async_channel::Receiver<Assignment>,
    completions: mpsc::UnboundedSender<Completion>,
) where
    W: BlobWriter + Send + Sync + 'static,
{
    debug!(worker = index, "Worker started");

    while let Ok(Assignment { job_id, job }) = tasks.recv().await {
        let unit = Arc::clone(&unit);
        let result = match tokio::spawn(async move { unit.run(job_id, job).await }).await {
            Ok(result) => result,
            Err(e) => {
                error!(worker = index, job_id = %job_id, error = %e, "Execution unit crashed");
                Err(JobError::unit_fault(job_id, e.to_string()))
            }
        };

        if completions.send(Completion { job_id, result }).is_err() {
            error!(worker = index, job_id = %job_id, "Dispatcher gone, dropping result");
            break;
        }
    }

    debug!(worker = index, "Worker stopped");
}
