//! Pipeline statistics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::JobMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Input lines read (blank lines included)
    pub lines_read: u64,

    /// Requests admitted and submitted
    pub accepted: u64,

    /// Requests rejected at admission
    pub rejected: u64,

    /// Input reading stopped by a shutdown signal
    pub interrupted: bool,

    /// Total duration of the run, drain included
    pub duration: Duration,

    /// Final dispatcher counters
    pub dispatcher: MetricsSnapshot,

    /// Per-job outcomes (only populated with `--wait`)
    pub jobs: JobMetricsAggregator,
}

impl PipelineStats {
    /// Settled jobs per second
    pub fn jobs_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.dispatcher.settled() as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Rejection rate as percentage of non-blank requests
    pub fn reject_rate(&self) -> f64 {
        let total = self.accepted + self.rejected;
        if total > 0 {
            (self.rejected as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary to stderr (stdout carries responses)
    pub fn print_summary(&self) {
        eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
        eprintln!("║                      Run Statistics                          ║");
        eprintln!("╚══════════════════════════════════════════════════════════════╝\n");

        eprintln!("📥 Intake");
        eprintln!("   ├─ Lines read: {}", self.lines_read);
        eprintln!("   ├─ Accepted: {}", self.accepted);
        eprintln!(
            "   ├─ Rejected: {} ({:.2}%)",
            self.rejected,
            self.reject_rate()
        );
        eprintln!("   └─ Interrupted: {}", self.interrupted);

        let d = &self.dispatcher;
        eprintln!("\n⚙️  Dispatcher");
        eprintln!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        eprintln!("   ├─ Submitted: {}", d.submitted);
        eprintln!("   ├─ Succeeded: {}", d.succeeded);
        eprintln!("   ├─ Failed: {}", d.failed);
        eprintln!("   ├─ Peak active units: {}", d.peak_active);
        eprintln!("   └─ Jobs/s: {:.2}", self.jobs_per_sec());

        if self.jobs.total_jobs > 0 {
            eprintln!("\n📈 {}", self.jobs.summary());
        }

        eprintln!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_on_empty_run() {
        let stats = PipelineStats::default();
        assert_eq!(stats.jobs_per_sec(), 0.0);
        assert_eq!(stats.reject_rate(), 0.0);
    }

    #[test]
    fn test_reject_rate() {
        let stats = PipelineStats {
            accepted: 3,
            rejected: 1,
            ..Default::default()
        };
        assert!((stats.reject_rate() - 25.0).abs() < 1e-9);
    }
}
