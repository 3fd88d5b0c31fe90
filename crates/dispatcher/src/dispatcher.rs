//! Dispatcher - admission queue plus concurrency limiter
//!
//! The queue and the active set are owned by a single actor task, so
//! enqueue, dispatch and settle-then-redrain never interleave. Workers run
//! genuinely in parallel, at most `concurrency` at a time.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use contracts::{BlobWriter, Job, JobError, JobId, StoreConfig, SuccessPolicy};
use observability::{
    record_active_units, record_job_completed, record_job_submitted, record_queue_depth,
    record_queue_wait,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::error::DispatcherError;
use crate::handle::{CompletionHandle, JobResult};
use crate::metrics::{DispatcherMetrics, MetricsSnapshot};
use crate::unit::ExecutionUnit;
use crate::worker::{spawn_workers, Assignment, Completion};
use crate::writer::AtomicFileWriter;

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum concurrently running execution units
    pub concurrency: usize,
    /// Ordered destination roots
    pub save_roots: Vec<PathBuf>,
    /// Success policy applied by every execution unit
    pub success_policy: SuccessPolicy,
}

impl From<&StoreConfig> for DispatcherConfig {
    fn from(store: &StoreConfig) -> Self {
        Self {
            concurrency: store.concurrency,
            save_roots: store.save_roots.clone(),
            success_policy: store.success_policy,
        }
    }
}

/// Job waiting in the admission queue
struct Pending {
    job_id: JobId,
    job: Job,
    reply: oneshot::Sender<JobResult>,
    submitted_at: Instant,
}

/// Job currently held by a worker
struct InFlight {
    reply: oneshot::Sender<JobResult>,
    started_at: Instant,
}

/// Handle to a running dispatcher.
///
/// Construct once and share by reference with the admission boundary.
pub struct Dispatcher {
    submissions: mpsc::UnboundedSender<Pending>,
    next_id: AtomicU64,
    concurrency: usize,
    metrics: Arc<DispatcherMetrics>,
    actor: JoinHandle<()>,
}

impl Dispatcher {
    /// Start the dispatcher actor and its worker pool.
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(
        name = "dispatcher_spawn",
        skip(config, writer),
        fields(concurrency = config.concurrency, roots = config.save_roots.len())
    )]
    pub fn spawn<W>(config: DispatcherConfig, writer: W) -> Result<Self, DispatcherError>
    where
        W: BlobWriter + Send + Sync + 'static,
    {
        if config.concurrency == 0 {
            return Err(DispatcherError::invalid_config(
                "concurrency must be >= 1",
            ));
        }

        let metrics = Arc::new(DispatcherMetrics::new());
        let (submissions, submission_rx) = mpsc::unbounded_channel();
        let (completion_tx, completions) = mpsc::unbounded_channel();
        // Never more than `concurrency` assignments are outstanding.
        let (tasks, task_rx) = async_channel::bounded(config.concurrency);

        let unit = Arc::new(ExecutionUnit::new(
            writer,
            config.save_roots,
            config.success_policy,
        ));
        let workers = spawn_workers(config.concurrency, unit, task_rx, completion_tx);

        let actor = DispatcherActor {
            limit: config.concurrency,
            queue: VecDeque::new(),
            active: HashMap::new(),
            submissions: submission_rx,
            completions,
            tasks,
            metrics: Arc::clone(&metrics),
        };

        info!(concurrency = config.concurrency, "Dispatcher started");

        Ok(Self {
            submissions,
            next_id: AtomicU64::new(1),
            concurrency: config.concurrency,
            metrics,
            actor: tokio::spawn(actor.run(workers)),
        })
    }

    /// Append a job to the queue tail and return immediately.
    ///
    /// Never blocks. If the dispatcher has already stopped, the returned
    /// handle resolves to [`JobError::DispatcherClosed`].
    pub fn submit(&self, job: Job) -> CompletionHandle {
        let job_id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (reply, rx) = oneshot::channel();

        let pending = Pending {
            job_id,
            job,
            reply,
            submitted_at: Instant::now(),
        };

        // 先计数再入队，快照里 settled 永远不会超过 submitted
        self.metrics.inc_submitted();
        if self.submissions.send(pending).is_err() {
            self.metrics.dec_submitted();
            warn!(job_id = %job_id, "Dispatcher stopped, job rejected");
        } else {
            record_job_submitted();
        }

        CompletionHandle::new(job_id, rx)
    }

    /// Concurrency limit this dispatcher was started with
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Get current metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Stop accepting jobs, finish every queued and running job, stop workers.
    ///
    /// Returns the final metrics.
    #[instrument(name = "dispatcher_shutdown", skip(self))]
    pub async fn shutdown(self) -> MetricsSnapshot {
        drop(self.submissions);
        if let Err(e) = self.actor.await {
            error!(error = ?e, "Dispatcher actor panicked");
        }

        let snapshot = self.metrics.snapshot();
        info!(
            succeeded = snapshot.succeeded,
            failed = snapshot.failed,
            "Dispatcher shutdown complete"
        );
        snapshot
    }
}

/// Convenience function: dispatcher writing through [`AtomicFileWriter`]
pub fn create_dispatcher(store: &StoreConfig) -> Result<Dispatcher, DispatcherError> {
    Dispatcher::spawn(DispatcherConfig::from(store), AtomicFileWriter::default())
}

/// Sole owner of the queue and the active set
struct DispatcherActor {
    limit: usize,
    queue: VecDeque<Pending>,
    active: HashMap<JobId, InFlight>,
    submissions: mpsc::UnboundedReceiver<Pending>,
    completions: mpsc::UnboundedReceiver<Completion>,
    tasks: async_channel::Sender<Assignment>,
    metrics: Arc<DispatcherMetrics>,
}

impl DispatcherActor {
    #[instrument(name = "dispatcher_run", skip(self, workers))]
    async fn run(mut self, workers: Vec<JoinHandle<()>>) {
        let mut accepting = true;

        loop {
            tokio::select! {
                submission = self.submissions.recv(), if accepting => match submission {
                    Some(pending) => {
                        self.enqueue(pending);
                        self.drain();
                    }
                    None => {
                        accepting = false;
                        debug!(
                            queued = self.queue.len(),
                            active = self.active.len(),
                            "Submissions closed, draining"
                        );
                    }
                },
                Some(completion) = self.completions.recv() => {
                    self.settle(completion);
                    self.drain();
                }
                else => break,
            }

            if !accepting && self.queue.is_empty() && self.active.is_empty() {
                break;
            }
        }

        self.tasks.close();
        for worker in workers {
            if let Err(e) = worker.await {
                error!(error = ?e, "Worker task panicked");
            }
        }

        // Anything left here could not be run; dropping the replies
        // resolves their handles as closed.
        if !self.queue.is_empty() || !self.active.is_empty() {
            warn!(
                queued = self.queue.len(),
                active = self.active.len(),
                "Dispatcher stopped with unsettled jobs"
            );
        }
    }

    fn enqueue(&mut self, pending: Pending) {
        debug!(job_id = %pending.job_id, queued = self.queue.len(), "Job enqueued");
        self.queue.push_back(pending);
        self.publish_gauges();
    }

    /// Fill free slots from the queue head, in submission order
    fn drain(&mut self) {
        while self.active.len() < self.limit {
            let Some(pending) = self.queue.pop_front() else {
                break;
            };
            self.dispatch(pending);
        }
        self.publish_gauges();
    }

    fn dispatch(&mut self, pending: Pending) {
        let Pending {
            job_id,
            job,
            reply,
            submitted_at,
        } = pending;

        record_queue_wait(submitted_at.elapsed());

        match self.tasks.try_send(Assignment { job_id, job }) {
            Ok(()) => {
                self.active.insert(
                    job_id,
                    InFlight {
                        reply,
                        started_at: Instant::now(),
                    },
                );
                self.metrics.inc_dispatched();
                debug!(job_id = %job_id, active = self.active.len(), "Job dispatched");
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Worker pool unavailable");
                let result = Err(JobError::unit_fault(job_id, "worker pool unavailable"));
                self.resolve(job_id, reply, result);
            }
        }
    }

    fn settle(&mut self, completion: Completion) {
        let Completion { job_id, result } = completion;
        let Some(in_flight) = self.active.remove(&job_id) else {
            warn!(job_id = %job_id, "Completion for unknown job");
            return;
        };

        record_job_completed(&result, in_flight.started_at.elapsed());
        match &result {
            Ok(report) => info!(
                job_id = %job_id,
                name = %report.name,
                folder_id = %report.folder_id,
                bytes = report.bytes,
                written = report.written_roots(),
                failed = report.failed_roots(),
                "Job completed"
            ),
            Err(e) => warn!(job_id = %job_id, error = %e, "Job failed"),
        }

        self.resolve(job_id, in_flight.reply, result);
    }

    /// Deliver a result to its handle, logging failures nobody is waiting for
    fn resolve(&self, job_id: JobId, reply: oneshot::Sender<JobResult>, result: JobResult) {
        match &result {
            Ok(_) => self.metrics.inc_succeeded(),
            Err(_) => self.metrics.inc_failed(),
        }

        if let Err(Err(e)) = reply.send(result) {
            error!(job_id = %job_id, error = %e, "Unobserved job failure");
        }
    }

    fn publish_gauges(&self) {
        self.metrics.set_queue_len(self.queue.len());
        self.metrics.set_active(self.active.len());
        record_queue_depth(self.queue.len());
        record_active_units(self.active.len());
    }
}
