//! Minimal client for the Lambda Runtime API.
//!
//! The bootstrap long-polls `invocation/next`, then posts either the response
//! or an error report for that request id.

use anyhow::{Context, Result};
use serde::Serialize;

/// Runtime API version segment.
const RUNTIME_API_VERSION: &str = "2018-06-01";

/// Header carrying the invocation's request id.
const REQUEST_ID_HEADER: &str = "lambda-runtime-aws-request-id";

/// Header classifying a function error.
const ERROR_TYPE_HEADER: &str = "lambda-runtime-function-error-type";

/// One pending invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Request id assigned by the runtime.
    pub request_id: String,
    /// Raw event payload.
    pub payload: Vec<u8>,
}

/// Error body the Runtime API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    /// Human readable message.
    pub error_message: String,
    /// Short classification.
    pub error_type: String,
}

impl ErrorReport {
    /// Build a report.
    pub fn new(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_message: error_message.into(),
            error_type: error_type.into(),
        }
    }
}

/// Runtime API client bound to one endpoint.
#[derive(Debug, Clone)]
pub struct RuntimeClient {
    client: reqwest::Client,
    base_url: String,
}

impl RuntimeClient {
    /// Create a client for `api` (`host:port`, as in `AWS_LAMBDA_RUNTIME_API`).
    #[must_use]
    pub fn new(api: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("http://{api}/{RUNTIME_API_VERSION}/runtime"),
        }
    }

    /// Create a client from `AWS_LAMBDA_RUNTIME_API`.
    pub fn from_env() -> Result<Self> {
        let api = std::env::var("AWS_LAMBDA_RUNTIME_API")
            .context("AWS_LAMBDA_RUNTIME_API is not set; not running inside Lambda?")?;
        Ok(Self::new(&api))
    }

    /// Block until the next invocation arrives.
    pub async fn next_invocation(&self) -> Result<Invocation> {
        let url = format!("{}/invocation/next", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .context("runtime API rejected next-invocation request")?;

        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .context("next invocation has no request id")?
            .to_owned();
        let payload = response
            .bytes()
            .await
            .context("failed to read invocation payload")?
            .to_vec();

        Ok(Invocation {
            request_id,
            payload,
        })
    }

    /// Report a successful result.
    pub async fn send_response(&self, request_id: &str, body: Vec<u8>) -> Result<()> {
        let url = self.response_url(request_id);
        self.client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?
            .error_for_status()
            .context("runtime API rejected invocation response")?;
        Ok(())
    }

    /// Report a failed invocation.
    pub async fn send_error(&self, request_id: &str, report: &ErrorReport) -> Result<()> {
        let url = self.error_url(request_id);
        self.post_error(&url, report).await
    }

    /// Report a failure before the first invocation.
    pub async fn send_init_error(&self, report: &ErrorReport) -> Result<()> {
        let url = format!("{}/init/error", self.base_url);
        self.post_error(&url, report).await
    }

    async fn post_error(&self, url: &str, report: &ErrorReport) -> Result<()> {
        let body = serde_json::to_vec(report).context("failed to encode error report")?;
        self.client
            .post(url)
            .header(ERROR_TYPE_HEADER, report.error_type.as_str())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?
            .error_for_status()
            .context("runtime API rejected error report")?;
        Ok(())
    }

    fn response_url(&self, request_id: &str) -> String {
        format!("{}/invocation/{request_id}/response", self.base_url)
    }

    fn error_url(&self, request_id: &str) -> String {
        format!("{}/invocation/{request_id}/error", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_build_runtime_urls() {
        let client = RuntimeClient::new("127.0.0.1:9001");
        assert_eq!(
            client.response_url("abc-123"),
            "http://127.0.0.1:9001/2018-06-01/runtime/invocation/abc-123/response"
        );
        assert_eq!(
            client.error_url("abc-123"),
            "http://127.0.0.1:9001/2018-06-01/runtime/invocation/abc-123/error"
        );
    }

    #[test]
    fn test_should_serialize_error_report_in_runtime_format() {
        let report = ErrorReport::new("SignerError", "request has no custom origin domain name");
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({
                "errorMessage": "request has no custom origin domain name",
                "errorType": "SignerError"
            })
        );
    }
}
