//! Error type shared by the core and the destination crates
//!
//! Delivery problems never surface here: destinations log and count them in
//! a [`crate::BatchReport`]. What remains are setup mistakes, stopped
//! queues and failures reported by router or DNS provider integrations.

use thiserror::Error;

/// Result alias used across the relay crates
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Unusable configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// The receiving end of a queue has gone away
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// The router could not be queried
    #[error("Router error: {0}")]
    Router(String),

    /// A single DNS API call failed
    #[error("DNS provider error: {0}")]
    DnsProvider(String),

    /// A record update gave up after all retries
    #[error("Provider error ({provider}): {message}")]
    Provider { provider: String, message: String },
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::Dispatch(msg.into())
    }

    pub fn router(msg: impl Into<String>) -> Self {
        Self::Router(msg.into())
    }

    pub fn dns_provider(msg: impl Into<String>) -> Self {
        Self::DnsProvider(msg.into())
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}
