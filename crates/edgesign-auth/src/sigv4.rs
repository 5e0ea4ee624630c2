//! AWS Signature Version 4 signing.
//!
//! [`SigV4Signer::sign`] takes an unsigned [`HttpRequest`] and returns it with
//! the signature headers added:
//!
//! 1. Stale generated headers (`authorization`, `date`, `x-amz-date`,
//!    `x-amz-security-token`) are dropped and `x-amz-date` is set from the
//!    signing instant.
//! 2. The canonical request is built over every signable header.
//! 3. The string to sign is hashed with a key derived from the secret key and
//!    credential scope.
//! 4. The resulting `authorization` header is appended.
//!
//! The payload is never hashed: the request's `x-amz-content-sha256` value is
//! used as-is, defaulting to [`UNSIGNED_PAYLOAD`].

use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::canonical::{build_canonical_request, build_signed_headers_string};
use crate::credentials::Credentials;
use crate::error::AuthError;

/// The signing algorithm identifier.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Payload hash placeholder for requests whose body is not signed.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Header carrying the signing timestamp.
pub const AMZ_DATE_HEADER: &str = "x-amz-date";

/// Header carrying the payload hash.
pub const CONTENT_SHA256_HEADER: &str = "x-amz-content-sha256";

/// Header carrying the STS session token.
pub const SECURITY_TOKEN_HEADER: &str = "x-amz-security-token";

/// Header carrying the computed signature.
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Headers the signer owns; any inbound copy is replaced.
const GENERATED_HEADERS: [&str; 4] = [
    AUTHORIZATION_HEADER,
    "date",
    AMZ_DATE_HEADER,
    SECURITY_TOKEN_HEADER,
];

/// Headers that are forwarded but never part of `SignedHeaders`, since
/// intermediaries may rewrite them.
const UNSIGNABLE_HEADERS: [&str; 15] = [
    "authorization",
    "cache-control",
    "connection",
    "expect",
    "from",
    "keep-alive",
    "max-forwards",
    "pragma",
    "referer",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "user-agent",
    "x-amzn-trace-id",
];

/// Region wildcard used by multi-region access points (SigV4a only).
const MULTI_REGION_WILDCARD: &str = "*";

type HmacSha256 = Hmac<Sha256>;

/// A minimal HTTP request description: what gets signed and what gets sent.
///
/// Headers keep their insertion order and casing; lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: String,
    /// Target host name, without scheme or port.
    pub hostname: String,
    /// Request path, as received (no query string).
    pub path: String,
    headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Create a request with no headers.
    pub fn new(
        method: impl Into<String>,
        hostname: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            hostname: hostname.into(),
            path: path.into(),
            headers: Vec::new(),
        }
    }

    /// Builder-style [`set_header`](Self::set_header).
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Set a header, replacing any existing header with the same name in place.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(slot) => *slot = (name, value),
            None => self.headers.push((name, value)),
        }
    }

    /// Remove every header with the given name, returning the first removed value.
    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        let mut removed = None;
        self.headers.retain(|(existing, value)| {
            if existing.eq_ignore_ascii_case(name) {
                removed.get_or_insert_with(|| value.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Look up a header value by name, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// All headers in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

/// Signs requests for one region and service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigV4Signer {
    region: String,
    service: String,
}

impl SigV4Signer {
    /// Create a signer scoped to `region` and `service`.
    pub fn new(region: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            service: service.into(),
        }
    }

    /// Sign `request` at `time` with `credentials`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnsupportedRegion`] for the multi-region wildcard
    /// and [`AuthError::InvalidHeader`] if any header is not valid HTTP.
    pub fn sign(
        &self,
        mut request: HttpRequest,
        credentials: &Credentials,
        time: DateTime<Utc>,
    ) -> Result<HttpRequest, AuthError> {
        if self.region == MULTI_REGION_WILDCARD {
            return Err(AuthError::UnsupportedRegion(self.region.clone()));
        }

        for name in GENERATED_HEADERS {
            request.remove_header(name);
        }

        let amz_date = format_amz_date(time);
        request.set_header(AMZ_DATE_HEADER, amz_date.clone());
        if let Some(token) = credentials.session_token() {
            request.set_header(SECURITY_TOKEN_HEADER, token);
        }

        validate_headers(&request)?;

        let authorization = {
            let payload_hash = request
                .header(CONTENT_SHA256_HEADER)
                .unwrap_or(UNSIGNED_PAYLOAD);

            let header_pairs: Vec<(&str, &str)> = request
                .headers()
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str()))
                .collect();

            let lowercase_names: Vec<String> = request
                .headers()
                .iter()
                .map(|(name, _)| name.to_ascii_lowercase())
                .filter(|name| !UNSIGNABLE_HEADERS.contains(&name.as_str()))
                .collect();
            let signed_headers: Vec<&str> = lowercase_names.iter().map(String::as_str).collect();

            let canonical_request = build_canonical_request(
                &request.method,
                &request.path,
                &header_pairs,
                &signed_headers,
                payload_hash,
            );
            debug!(canonical_request, "Built canonical request");

            let date = &amz_date[..8];
            let credential_scope = format!("{date}/{}/{}/aws4_request", self.region, self.service);
            let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
            let string_to_sign = build_string_to_sign(&amz_date, &credential_scope, &canonical_hash);
            debug!(string_to_sign, "Built string to sign");

            let signing_key = derive_signing_key(
                credentials.secret_access_key(),
                date,
                &self.region,
                &self.service,
            );
            let signature = compute_signature(&signing_key, &string_to_sign);

            format!(
                "{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={}, Signature={signature}",
                credentials.access_key_id(),
                build_signed_headers_string(&signed_headers),
            )
        };

        debug!(
            access_key_id = %credentials.access_key_id(),
            region = %self.region,
            service = %self.service,
            host = %request.hostname,
            "Signed request"
        );

        request.set_header(AUTHORIZATION_HEADER, authorization);
        Ok(request)
    }
}

/// Format a UTC instant as the compact ISO-8601 basic timestamp SigV4 uses.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use edgesign_auth::sigv4::format_amz_date;
///
/// let t = Utc.with_ymd_and_hms(2013, 5, 24, 0, 0, 0).unwrap();
/// assert_eq!(format_amz_date(t), "20130524T000000Z");
/// ```
#[must_use]
pub fn format_amz_date(time: DateTime<Utc>) -> String {
    time.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Build the SigV4 string to sign.
///
/// ```text
/// AWS4-HMAC-SHA256\n
/// <ISO8601 timestamp>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, b"aws4_request")
}

/// Hex-encoded HMAC-SHA256 of `data` under `signing_key`.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

fn validate_headers(request: &HttpRequest) -> Result<(), AuthError> {
    for (name, value) in request.headers() {
        let valid = http::HeaderName::from_bytes(name.as_bytes()).is_ok()
            && http::HeaderValue::from_str(value).is_ok();
        if !valid {
            return Err(AuthError::InvalidHeader { name: name.clone() });
        }
    }
    Ok(())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
