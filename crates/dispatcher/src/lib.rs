//! # Dispatcher
//!
//! 任务分发模块。
//!
//! 负责：
//! - 接收 `Job`（FIFO 队列，无界）
//! - 限制并发 execution unit 数量
//! - 解码 payload 并原子写入所有保存根目录
//! - 通过 `CompletionHandle` 回报结果，隔离单个任务的失败

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod unit;
mod worker;
pub mod writer;

pub use contracts::{BlobWriter, Job, JobError, JobId, JobReport};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::{CompletionHandle, JobResult};
pub use metrics::{DispatcherMetrics, MetricsSnapshot};
pub use unit::ExecutionUnit;
pub use writer::{write_atomic, AtomicFileWriter};
