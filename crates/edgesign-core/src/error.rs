//! Error types for the request signer.

use edgesign_auth::AuthError;

/// Failures that abort an invocation. The edge platform applies its own
/// fallback (error page or failover origin) when one of these escapes.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// The event carried no request record.
    #[error("event contains no request records")]
    NoRecords,

    /// The request has no custom origin, or it has no domain name.
    #[error("request has no custom origin domain name")]
    MissingCustomOrigin,

    /// Credential resolution or signing failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Convenience result type for signer operations.
pub type SignerResult<T> = Result<T, SignerError>;

/// Failures of the debug dispatch. Reported to the observer, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The signed method is not a valid HTTP method.
    #[error("invalid method: {0}")]
    InvalidMethod(String),

    /// A signed header could not be attached to the outgoing call.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The call itself failed (connect, TLS, timeout, body read).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
