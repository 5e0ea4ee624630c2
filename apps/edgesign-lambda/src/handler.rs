//! Invocation handler: raw event bytes in, response bytes out.

use edgesign_core::{EdgeEvent, RequestSigner, SignerError};

/// Why an invocation failed. The variant decides the reported `errorType`.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    /// The payload is not an edge event.
    #[error("invalid edge event: {0}")]
    Decode(#[source] serde_json::Error),

    /// Signing failed.
    #[error(transparent)]
    Signer(#[from] SignerError),

    /// The signed request could not be serialized.
    #[error("failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),
}

impl InvocationError {
    /// Value for the runtime's `errorType` field.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Decode(_) => "InvalidEvent",
            Self::Signer(SignerError::Auth(_)) => "SigningError",
            Self::Signer(_) => "InvalidRequest",
            Self::Encode(_) => "EncodeError",
        }
    }
}

/// Decode the event, run the signer, encode the returned request.
pub async fn handle_invocation(
    signer: &RequestSigner,
    payload: &[u8],
) -> Result<Vec<u8>, InvocationError> {
    let event: EdgeEvent = serde_json::from_slice(payload).map_err(InvocationError::Decode)?;
    let request = signer.handle_event(event).await?;
    serde_json::to_vec(&request).map_err(InvocationError::Encode)
}
