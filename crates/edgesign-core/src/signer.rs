//! The request signer: one edge request in, one re-signed request out.
//!
//! Pipeline for [`RequestSigner::process`]:
//!
//! 1. Pass through untouched if the first origin carries the failover marker.
//! 2. Derive the origin endpoint from the custom origin's domain and the URI.
//! 3. Keep only the read-only headers.
//! 4. Add `host`, `x-amz-content-sha256` and `x-amz-date`.
//! 5. Sign with credentials from the injected provider.
//! 6. Replace the request's headers with the signed set.
//! 7. Drop the query string.
//! 8. Optionally replay the signed request through a [`TelemetrySink`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use edgesign_auth::sigv4::{AMZ_DATE_HEADER, CONTENT_SHA256_HEADER};
use edgesign_auth::{CredentialProvider, HttpRequest, SigV4Signer, UNSIGNED_PAYLOAD, format_amz_date};

use crate::config::SignerConfig;
use crate::error::{SignerError, SignerResult};
use crate::headers::{select_read_only, to_edge_headers};
use crate::model::{EdgeEvent, EdgeHeaders, EdgeRequest};
use crate::observer::{RequestObserver, TracingObserver};
use crate::telemetry::{DebugFailure, TelemetrySink};

/// Re-signs edge requests for a storage origin.
pub struct RequestSigner {
    config: SignerConfig,
    signer: SigV4Signer,
    credentials: Arc<dyn CredentialProvider>,
    observer: Arc<dyn RequestObserver>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("config", &self.config)
            .field("signer", &self.signer)
            .field("telemetry", &self.telemetry.is_some())
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Create a signer that logs through [`TracingObserver`] and does no debug dispatch.
    #[must_use]
    pub fn new(config: SignerConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        let signer = SigV4Signer::new(config.region.clone(), config.service.clone());
        Self {
            config,
            signer,
            credentials,
            observer: Arc::new(TracingObserver),
            telemetry: None,
        }
    }

    /// Replace the observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Attach a sink that replays every signed request.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Process the first request record of an invocation event.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::NoRecords`] for an empty event, otherwise see
    /// [`process`](Self::process).
    pub async fn handle_event(&self, event: EdgeEvent) -> SignerResult<EdgeRequest> {
        self.observer.on_event(&event);
        let record = event
            .records
            .into_iter()
            .next()
            .ok_or(SignerError::NoRecords)?;
        self.process(record.cf.request).await
    }

    /// Re-sign `request` as of now.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::MissingCustomOrigin`] when there is no custom
    /// origin domain, or [`SignerError::Auth`] when credentials cannot be
    /// resolved or a header cannot be signed.
    pub async fn process(&self, request: EdgeRequest) -> SignerResult<EdgeRequest> {
        self.process_at(request, Utc::now()).await
    }

    /// Re-sign `request` as of `now`.
    ///
    /// # Errors
    ///
    /// See [`process`](Self::process).
    pub async fn process_at(
        &self,
        mut request: EdgeRequest,
        now: DateTime<Utc>,
    ) -> SignerResult<EdgeRequest> {
        self.observer.on_request(&request);

        let empty = EdgeHeaders::new();
        let first_origin = request.first_origin();
        self.observer.on_custom_headers(
            first_origin
                .and_then(|origin| origin.custom_headers.as_ref())
                .unwrap_or(&empty),
        );

        if first_origin.is_some_and(|origin| origin.has_custom_header(&self.config.failover_header))
        {
            self.observer.on_failover(&request);
            return Ok(request);
        }

        let domain = request
            .custom_origin()
            .and_then(|origin| origin.domain_name.clone())
            .filter(|domain| !domain.is_empty())
            .ok_or(SignerError::MissingCustomOrigin)?;

        let endpoint = origin_endpoint(&self.config.scheme, &domain, &request.uri);
        self.observer.on_endpoint(&endpoint);

        let read_only = select_read_only(&request.headers);
        self.observer.on_read_only_headers(&read_only);

        let unsigned = build_signable_request(&request.method, &domain, &request.uri, read_only, now);
        let credentials = self.credentials.provide_credentials().await?;
        let signed = self.signer.sign(unsigned, &credentials, now)?;

        request.headers = to_edge_headers(&signed);
        request.querystring = None;
        self.observer.on_signed(&request);

        if let Some(sink) = &self.telemetry {
            self.dispatch_debug(sink.as_ref(), &endpoint, &signed).await;
        }

        Ok(request)
    }

    async fn dispatch_debug(&self, sink: &dyn TelemetrySink, endpoint: &str, signed: &HttpRequest) {
        match sink.dispatch(endpoint, signed).await {
            Ok(response) if response.is_success() => self.observer.on_debug_response(&response),
            Ok(response) => self
                .observer
                .on_debug_failure(&DebugFailure::Status(response)),
            Err(error) => self.observer.on_debug_failure(&DebugFailure::Error(error)),
        }
    }
}

/// `<scheme>://<domain><uri>`. The query string is never part of it.
#[must_use]
pub fn origin_endpoint(scheme: &str, domain: &str, uri: &str) -> String {
    format!("{scheme}://{domain}{uri}")
}

/// Build the unsigned request: the read-only headers plus `host`,
/// `x-amz-content-sha256: UNSIGNED-PAYLOAD` and `x-amz-date`.
#[must_use]
pub fn build_signable_request(
    method: &str,
    hostname: &str,
    path: &str,
    read_only: Vec<(String, String)>,
    now: DateTime<Utc>,
) -> HttpRequest {
    let mut request = HttpRequest::new(method, hostname, path);
    for (name, value) in read_only {
        request.set_header(name, value);
    }
    request.set_header("host", hostname);
    request.set_header(CONTENT_SHA256_HEADER, UNSIGNED_PAYLOAD);
    request.set_header(AMZ_DATE_HEADER, format_amz_date(now));
    request
}
