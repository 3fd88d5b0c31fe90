//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Configuration rejected at spawn time
    #[error("invalid dispatcher config: {message}")]
    InvalidConfig { message: String },
}

impl DispatcherError {
    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_display() {
        let err = DispatcherError::invalid_config("concurrency must be >= 1");
        assert_eq!(
            err.to_string(),
            "invalid dispatcher config: concurrency must be >= 1"
        );
    }
}
