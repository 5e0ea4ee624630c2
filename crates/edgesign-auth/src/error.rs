//! Error types for SigV4 signing.

/// Errors that can occur while resolving credentials or signing a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No credentials could be resolved.
    #[error("credentials not loaded: {0}")]
    CredentialsNotLoaded(String),

    /// A header name or value is not valid HTTP and cannot be signed.
    #[error("invalid header: {name}")]
    InvalidHeader {
        /// The offending header name.
        name: String,
    },

    /// The region needs SigV4a (multi-region access points), which is not supported.
    #[error("unsupported signing region: {0}")]
    UnsupportedRegion(String),
}
