//! Engine and service error types.
//!
//! `ServiceError` represents failures from external collaborators (item
//! store, generative service, embedder). Defined in `examforge-core` so the
//! fallback generator can downcast and classify errors for retry decisions
//! without string matching.

use thiserror::Error;

/// Errors from an external collaborator service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The service returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The service answered but the payload could not be decoded.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ServiceError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(self, ServiceError::AuthenticationFailed(_))
    }
}

/// Fatal assembly errors.
///
/// Constraint shortages, validation failures, and service outages are all
/// recovered locally and surfaced through the report; the only class that
/// aborts a run outright is a bad configuration.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
