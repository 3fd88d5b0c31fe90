//! Ingestion 错误类型

use thiserror::Error;

/// 准入错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestionError {
    /// 必填字段缺失
    #[error("missing field: {field}")]
    MissingField {
        /// 字段名
        field: &'static str,
    },

    /// data URL 格式不合法
    #[error("invalid data url: {reason}")]
    InvalidDataUrl {
        /// 原因
        reason: &'static str,
    },

    /// name / folderId 清洗后为空
    #[error("invalid identifier for {field}")]
    InvalidIdentifier {
        /// 字段名
        field: &'static str,
    },
}

impl IngestionError {
    /// Short label for metrics and client responses
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => "missing fields",
            Self::InvalidDataUrl { .. } => "invalid data url",
            Self::InvalidIdentifier { .. } => "invalid name or folderId",
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
