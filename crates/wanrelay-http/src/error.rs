//! Delivery error types
//!
//! Messages are redacted before an error is constructed, so any
//! `DeliveryError` is safe to log.

use std::time::Duration;
use thiserror::Error;

/// Terminal failure of one delivery
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The request could not be built (method, URL or header)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection or protocol failure
    #[error("request failed: {0}")]
    Transport(String),

    /// No complete response within the per-attempt deadline
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The destination answered with a non-2xx status
    #[error("unexpected response status {0}")]
    Status(String),

    /// The response body could not be read
    #[error("failed to read response body: {0}")]
    Read(String),
}

impl DeliveryError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DeliveryError::Transport(_) | DeliveryError::Timeout(_) | DeliveryError::Status(_)
        )
    }
}
