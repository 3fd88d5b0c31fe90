//! ServiceConfig - Config Loader 输出
//!
//! 描述完整的服务配置：并发上限、保存根目录、成功判定策略、准入参数。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的服务配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 写入侧配置
    #[serde(default)]
    pub store: StoreConfig,

    /// 准入侧配置
    #[serde(default)]
    pub intake: IntakeConfig,
}

/// Dispatcher and writer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of execution units running at once (must be > 0)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Ordered destination roots; every job is replicated to each one
    #[serde(default = "default_save_roots")]
    pub save_roots: Vec<PathBuf>,

    /// How per-root outcomes fold into the job result
    #[serde(default)]
    pub success_policy: SuccessPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            save_roots: default_save_roots(),
            success_policy: SuccessPolicy::default(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

fn default_save_roots() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/mnt/Ext9/makesd"),
        PathBuf::from("/mnt/gd_ilacts_crypt/makesd"),
    ]
}

/// 成功判定策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessPolicy {
    /// Report success once every root was attempted, whatever the outcome
    #[default]
    BestEffort,
    /// Fail the job when roots are configured and none was written
    RequireAny,
}

/// Admission settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// Sanitized name / folder id are truncated to this many characters
    #[serde(default = "default_max_identifier_len")]
    pub max_identifier_len: usize,

    /// Extension used for image MIME types without a known mapping
    #[serde(default = "default_extension")]
    pub default_extension: String,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_identifier_len: default_max_identifier_len(),
            default_extension: default_extension(),
        }
    }
}

fn default_max_identifier_len() -> usize {
    200
}

fn default_extension() -> String {
    ".png".to_string()
}
