//! Debug dispatch of signed requests.
//!
//! A [`TelemetrySink`] replays the signed request against the origin purely
//! so the outcome shows up in the logs. Its result never reaches the caller
//! of [`RequestSigner::process`](crate::RequestSigner::process).

use async_trait::async_trait;
use edgesign_auth::HttpRequest;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::TelemetryError;

/// Longest response body prefix kept for logging, in bytes.
pub const MAX_LOGGED_BODY: usize = 1024;

/// What the origin answered to a debug dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugResponse {
    /// HTTP status code.
    pub status: u16,
    /// Canonical reason phrase for the status, if known.
    pub reason: Option<String>,
    /// Response body, truncated to [`MAX_LOGGED_BODY`].
    pub body: String,
}

impl DebugResponse {
    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A failed debug dispatch: either a non-2xx answer or no answer at all.
#[derive(Debug)]
pub enum DebugFailure {
    /// The origin answered with a non-2xx status.
    Status(DebugResponse),
    /// The call could not be made or completed.
    Error(TelemetryError),
}

/// Sends a signed request somewhere for observability.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Issue `signed` against `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError`] when the call cannot be built or completed.
    async fn dispatch(
        &self,
        endpoint: &str,
        signed: &HttpRequest,
    ) -> Result<DebugResponse, TelemetryError>;
}

/// [`TelemetrySink`] backed by a `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTelemetrySink {
    client: reqwest::Client,
}

impl ReqwestTelemetrySink {
    /// Create a sink with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TelemetrySink for ReqwestTelemetrySink {
    async fn dispatch(
        &self,
        endpoint: &str,
        signed: &HttpRequest,
    ) -> Result<DebugResponse, TelemetryError> {
        let method = reqwest::Method::from_bytes(signed.method.as_bytes())
            .map_err(|_| TelemetryError::InvalidMethod(signed.method.clone()))?;

        let mut headers = HeaderMap::new();
        for (name, value) in signed.headers() {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| TelemetryError::InvalidHeader(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| TelemetryError::InvalidHeader(name.clone()))?;
            headers.append(header_name, header_value);
        }

        let response = self
            .client
            .request(method, endpoint)
            .headers(headers)
            .send()
            .await?;

        let status = response.status();
        let body = read_body_prefix(response).await?;

        Ok(DebugResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().map(ToOwned::to_owned),
            body,
        })
    }
}

/// Read at most [`MAX_LOGGED_BODY`] bytes of the body; the rest is never pulled.
async fn read_body_prefix(mut response: reqwest::Response) -> Result<String, TelemetryError> {
    let mut prefix = Vec::new();
    while prefix.len() < MAX_LOGGED_BODY {
        let Some(chunk) = response.chunk().await? else {
            break;
        };
        prefix.extend_from_slice(&chunk);
    }
    prefix.truncate(MAX_LOGGED_BODY);
    Ok(truncate_body(String::from_utf8_lossy(&prefix).into_owned()))
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_LOGGED_BODY {
        let mut end = MAX_LOGGED_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    #[test]
    fn test_should_truncate_long_bodies_on_char_boundary() {
        let body = "\u{e9}".repeat(MAX_LOGGED_BODY);
        let truncated = truncate_body(body);
        assert!(truncated.len() <= MAX_LOGGED_BODY);
        assert!(truncated.chars().all(|c| c == '\u{e9}'));
        assert_eq!(truncate_body("short".to_owned()), "short");
    }

    #[test]
    fn test_should_classify_success_statuses() {
        let ok = DebugResponse {
            status: 200,
            reason: Some("OK".to_owned()),
            body: String::new(),
        };
        let forbidden = DebugResponse {
            status: 403,
            ..ok.clone()
        };
        assert!(ok.is_success());
        assert!(!forbidden.is_success());
    }

    #[tokio::test]
    async fn test_should_reject_invalid_method_without_network() {
        let sink = ReqwestTelemetrySink::new();
        let request = HttpRequest::new("NOT A METHOD", "bucket.s3.amazonaws.com", "/");

        let result = sink
            .dispatch("https://bucket.s3.amazonaws.com/", &request)
            .await;
        assert!(matches!(result, Err(TelemetryError::InvalidMethod(_))));
    }

    #[tokio::test]
    async fn test_should_keep_only_body_prefix_of_large_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0_u8; 4096];
            let _ = socket.read(&mut request).await.unwrap();
            let body = "x".repeat(256 * 1024);
            let head = format!(
                "HTTP/1.1 403 Forbidden\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.ok();
            socket.write_all(body.as_bytes()).await.ok();
        });

        let sink = ReqwestTelemetrySink::new();
        let request = HttpRequest::new("GET", "127.0.0.1", "/big.bin");
        let response = sink
            .dispatch(&format!("http://{addr}/big.bin"), &request)
            .await
            .unwrap();

        assert_eq!(response.status, 403);
        assert_eq!(response.body.len(), MAX_LOGGED_BODY);
        assert!(response.body.chars().all(|c| c == 'x'));
        server.abort();
    }

    #[tokio::test]
    async fn test_should_report_transport_error_for_unreachable_origin() {
        let sink = ReqwestTelemetrySink::new();
        let request = HttpRequest::new("GET", "127.0.0.1", "/img.png");

        let result = sink.dispatch("http://127.0.0.1:1/img.png", &request).await;
        assert!(matches!(result, Err(TelemetryError::Transport(_))));
    }
}
