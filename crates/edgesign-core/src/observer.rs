//! Observation hooks for the signing pipeline.
//!
//! [`RequestSigner`](crate::RequestSigner) reports each step to a
//! [`RequestObserver`] instead of logging inline, which keeps the
//! transformation itself free of side effects.

use edgesign_auth::sigv4::{AUTHORIZATION_HEADER, SECURITY_TOKEN_HEADER};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::model::{EdgeEvent, EdgeHeaders, EdgeRequest};
use crate::telemetry::{DebugFailure, DebugResponse};

const REDACTED: &str = "** redacted **";

/// Receives one callback per pipeline step. Every method defaults to a no-op.
pub trait RequestObserver: Send + Sync {
    /// The raw invocation event arrived.
    fn on_event(&self, _event: &EdgeEvent) {}

    /// The request about to be processed.
    fn on_request(&self, _request: &EdgeRequest) {}

    /// Custom headers of the first configured origin.
    fn on_custom_headers(&self, _headers: &EdgeHeaders) {}

    /// The request carries the failover marker and passes through unsigned.
    fn on_failover(&self, _request: &EdgeRequest) {}

    /// The origin endpoint the request is signed for.
    fn on_endpoint(&self, _endpoint: &str) {}

    /// Headers that survived the allow-list.
    fn on_read_only_headers(&self, _headers: &[(String, String)]) {}

    /// The request after header substitution and query removal.
    fn on_signed(&self, _request: &EdgeRequest) {}

    /// The debug dispatch got a 2xx answer.
    fn on_debug_response(&self, _response: &DebugResponse) {}

    /// The debug dispatch failed or got a non-2xx answer.
    fn on_debug_failure(&self, _failure: &DebugFailure) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RequestObserver for NoopObserver {}

/// Observer that emits structured `tracing` events.
///
/// Signature and session-token header values are redacted.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RequestObserver for TracingObserver {
    fn on_event(&self, event: &EdgeEvent) {
        debug!(event = %to_json(event), "Received edge event");
    }

    fn on_request(&self, request: &EdgeRequest) {
        debug!(
            method = %request.method,
            uri = %request.uri,
            request = %to_json(request),
            "Processing request"
        );
    }

    fn on_custom_headers(&self, headers: &EdgeHeaders) {
        debug!(custom_headers = %to_json(headers), "Origin custom headers");
    }

    fn on_failover(&self, request: &EdgeRequest) {
        info!(uri = %request.uri, "Failover request, passing through unsigned");
    }

    fn on_endpoint(&self, endpoint: &str) {
        info!(endpoint, "Signing request for origin");
    }

    fn on_read_only_headers(&self, headers: &[(String, String)]) {
        debug!(read_only_headers = ?headers, "Selected read-only headers");
    }

    fn on_signed(&self, request: &EdgeRequest) {
        info!(request = %to_json(&redacted(request)), "Signed request");
    }

    fn on_debug_response(&self, response: &DebugResponse) {
        info!(
            status = response.status,
            reason = response.reason.as_deref().unwrap_or_default(),
            body = %response.body,
            "Debug dispatch response"
        );
    }

    fn on_debug_failure(&self, failure: &DebugFailure) {
        match failure {
            DebugFailure::Status(response) => warn!(
                status = response.status,
                body = %response.body,
                "Debug dispatch returned error status"
            ),
            DebugFailure::Error(error) => warn!(%error, "Debug dispatch failed"),
        }
    }
}

fn redacted(request: &EdgeRequest) -> EdgeRequest {
    let mut copy = request.clone();
    for name in [AUTHORIZATION_HEADER, SECURITY_TOKEN_HEADER] {
        if let Some(entries) = copy.headers.get_mut(name) {
            for entry in entries {
                REDACTED.clone_into(&mut entry.value);
            }
        }
    }
    copy
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::Map;

    use super::*;
    use crate::layout::KeyLayout;
    use crate::model::HeaderEntry;

    #[test]
    fn test_should_redact_signature_and_token() {
        let request = EdgeRequest {
            method: "GET".to_owned(),
            uri: "/img.png".to_owned(),
            querystring: None,
            headers: EdgeHeaders::from([
                (
                    "authorization".to_owned(),
                    vec![HeaderEntry::new("authorization", "AWS4-HMAC-SHA256 ...")],
                ),
                (
                    "x-amz-security-token".to_owned(),
                    vec![HeaderEntry::new("x-amz-security-token", "tok")],
                ),
                (
                    "if-none-match".to_owned(),
                    vec![HeaderEntry::new("If-None-Match", "abc")],
                ),
            ]),
            origin: BTreeMap::new(),
            extra: Map::new(),
            layout: KeyLayout::default(),
        };

        let copy = redacted(&request);

        assert_eq!(copy.headers["authorization"][0].value, REDACTED);
        assert_eq!(copy.headers["x-amz-security-token"][0].value, REDACTED);
        assert_eq!(copy.headers["if-none-match"][0].value, "abc");
        assert_eq!(request.headers["x-amz-security-token"][0].value, "tok");
    }
}
