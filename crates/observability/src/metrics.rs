//! 任务指标收集模块
//!
//! 通过 `metrics` facade 上报 dispatcher / execution unit 指标，
//! 并提供运行期聚合统计（供 CLI 汇总输出）。

use std::collections::BTreeMap;
use std::time::Duration;

use contracts::{JobError, JobReport};
use metrics::{counter, gauge, histogram};

/// 记录一次提交
pub fn record_job_submitted() {
    counter!("imgstore_jobs_submitted_total").increment(1);
}

/// 记录准入拒绝
pub fn record_admission_rejected(reason: &'static str) {
    counter!("imgstore_admission_rejected_total", "reason" => reason).increment(1);
}

/// 排队中的任务数
pub fn record_queue_depth(depth: usize) {
    gauge!("imgstore_queue_depth").set(depth as f64);
}

/// 运行中的 execution unit 数
pub fn record_active_units(active: usize) {
    gauge!("imgstore_active_units").set(active as f64);
}

/// 排队等待时长
pub fn record_queue_wait(wait: Duration) {
    histogram!("imgstore_queue_wait_ms").record(wait.as_secs_f64() * 1000.0);
}

/// 单个根目录写入结果
pub fn record_root_write(ok: bool) {
    let status = if ok { "ok" } else { "error" };
    counter!("imgstore_root_writes_total", "status" => status).increment(1);
}

/// 任务完成（成功或失败）
///
/// # Example
///
/// ```ignore
/// let result = handle.await;
/// observability::metrics::record_job_completed(&result, started.elapsed());
/// ```
pub fn record_job_completed(result: &Result<JobReport, JobError>, elapsed: Duration) {
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    match result {
        Ok(report) => {
            counter!("imgstore_jobs_completed_total", "status" => "ok").increment(1);
            counter!("imgstore_bytes_decoded_total").increment(report.bytes as u64);
            histogram!("imgstore_job_duration_ms", "status" => "ok").record(elapsed_ms);
            if report.failed_roots() > 0 {
                counter!("imgstore_jobs_partial_total").increment(1);
            }
        }
        Err(e) => {
            counter!("imgstore_jobs_completed_total", "status" => "error").increment(1);
            counter!("imgstore_job_failures_total", "kind" => e.kind()).increment(1);
            histogram!("imgstore_job_duration_ms", "status" => "error").record(elapsed_ms);
        }
    }
}

/// 运行期任务统计聚合器
#[derive(Debug, Clone, Default)]
pub struct JobMetricsAggregator {
    pub total_jobs: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// 成功但至少一个根目录写入失败
    pub partial: u64,
    pub bytes_decoded: u64,
    pub failures_by_kind: BTreeMap<&'static str, u64>,
    duration_ms: RunningStats,
}

impl JobMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 累计一个已结算的任务
    pub fn update(&mut self, result: &Result<JobReport, JobError>, elapsed: Duration) {
        self.total_jobs += 1;
        self.duration_ms.push(elapsed.as_secs_f64() * 1000.0);

        match result {
            Ok(report) => {
                self.succeeded += 1;
                self.bytes_decoded += report.bytes as u64;
                if report.failed_roots() > 0 {
                    self.partial += 1;
                }
            }
            Err(e) => {
                self.failed += 1;
                *self.failures_by_kind.entry(e.kind()).or_insert(0) += 1;
            }
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let failure_rate = if self.total_jobs > 0 {
            (self.failed as f64 / self.total_jobs as f64) * 100.0
        } else {
            0.0
        };

        MetricsSummary {
            total_jobs: self.total_jobs,
            succeeded: self.succeeded,
            failed: self.failed,
            partial: self.partial,
            bytes_decoded: self.bytes_decoded,
            failure_rate,
            duration_ms: StatsSummary::from(&self.duration_ms),
            failures_by_kind: self.failures_by_kind.clone(),
        }
    }
}

/// 汇总结果
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_jobs: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub partial: u64,
    pub bytes_decoded: u64,
    pub failure_rate: f64,
    pub duration_ms: StatsSummary,
    pub failures_by_kind: BTreeMap<&'static str, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Job Metrics Summary:")?;
        writeln!(f, "  Total jobs: {}", self.total_jobs)?;
        writeln!(f, "  Succeeded: {}", self.succeeded)?;
        writeln!(f, "  Failed: {} ({:.2}%)", self.failed, self.failure_rate)?;
        writeln!(f, "  Partial (some roots failed): {}", self.partial)?;
        writeln!(f, "  Bytes decoded: {}", self.bytes_decoded)?;
        writeln!(f, "  Duration (ms): {}", self.duration_ms)?;

        if !self.failures_by_kind.is_empty() {
            writeln!(f, "  Failures by kind:")?;
            for (kind, count) in &self.failures_by_kind {
                writeln!(f, "    {}: {}", kind, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}
