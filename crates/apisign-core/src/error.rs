//! Error types for the apisign core.

use std::time::Duration;

/// Core error type for configuration and setup failures.
#[derive(Debug, thiserror::Error)]
pub enum ApiSignError {
    /// Invalid application key (empty or containing reserved characters).
    #[error("invalid app key: {0:?}")]
    InvalidAppKey(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience result type for apisign setup operations.
pub type ApiSignResult<T> = Result<T, ApiSignError>;

/// Failure of the nonce store itself, as opposed to a replayed nonce.
#[derive(Debug, thiserror::Error)]
pub enum NonceStoreError {
    /// Replay protection is enabled but no nonce store was configured.
    #[error("no nonce store configured")]
    NotConfigured,

    /// The store did not answer within the configured timeout.
    #[error("nonce store timed out after {0:?}")]
    Timeout(Duration),

    /// The backend reported an error (connection refused, protocol error, ...).
    #[error("nonce store backend error: {0}")]
    Backend(String),
}
