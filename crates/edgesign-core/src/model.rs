//! CloudFront edge event types.
//!
//! These mirror the JSON the edge platform hands to a request trigger:
//!
//! ```json
//! {"Records": [{"cf": {"config": {...}, "request": {
//!     "method": "GET", "uri": "/img.png", "querystring": "",
//!     "headers": {"host": [{"key": "Host", "value": "d111.cloudfront.net"}]},
//!     "origin": {"custom": {"domainName": "bucket.s3.amazonaws.com", "customHeaders": {}}}
//! }}}]}
//! ```
//!
//! Fields the signer does not interpret are kept in `extra` maps, and the
//! received key order is kept in a [`KeyLayout`], so that a request passed
//! through untouched serializes back to the same document.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::layout::KeyLayout;

/// Edge headers: lowercase header name to its ordered entries.
pub type EdgeHeaders = BTreeMap<String, Vec<HeaderEntry>>;

/// Origin type key for custom (HTTP) origins.
pub const CUSTOM_ORIGIN: &str = "custom";

/// The invocation event delivered by the edge platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeEvent {
    /// Event records; request triggers carry exactly one.
    #[serde(rename = "Records")]
    pub records: Vec<EdgeRecord>,
}

/// One event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// The CloudFront payload.
    pub cf: CloudFrontRecord,
}

/// The `cf` payload of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudFrontRecord {
    /// Distribution metadata (`distributionId`, `eventType`, ...), kept opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    /// The intercepted request.
    pub request: EdgeRequest,
}

/// A single header entry. `key` keeps the original casing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    /// Header name with its original casing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Header value.
    pub value: String,
}

impl HeaderEntry {
    /// Create an entry with an explicit casing.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: value.into(),
        }
    }
}

/// An inbound request as seen by the edge platform.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRequest {
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub uri: String,
    /// Raw query string without the leading `?`.
    pub querystring: Option<String>,
    /// Request headers.
    pub headers: EdgeHeaders,
    /// Configured origins keyed by origin type (`custom`, `s3`).
    pub origin: BTreeMap<String, OriginConfig>,
    /// Everything else (`clientIp`, `body`, ...).
    pub extra: Map<String, Value>,
    /// Key order the request arrived with; replayed on serialization.
    pub layout: KeyLayout,
}

/// Wire form of [`EdgeRequest`].
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestFields {
    method: String,
    uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    querystring: Option<String>,
    #[serde(default)]
    headers: EdgeHeaders,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    origin: BTreeMap<String, OriginConfig>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Serialize for EdgeRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = RequestFields {
            method: self.method.clone(),
            uri: self.uri.clone(),
            querystring: self.querystring.clone(),
            headers: self.headers.clone(),
            origin: self.origin.clone(),
            extra: self.extra.clone(),
        };
        let value = serde_json::to_value(fields).map_err(S::Error::custom)?;
        self.layout.arrange(value).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EdgeRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = Value::deserialize(deserializer)?;
        let layout = KeyLayout::capture(&document);
        let fields = RequestFields::deserialize(document).map_err(D::Error::custom)?;
        Ok(Self {
            method: fields.method,
            uri: fields.uri,
            querystring: fields.querystring,
            headers: fields.headers,
            origin: fields.origin,
            extra: fields.extra,
            layout,
        })
    }
}

impl EdgeRequest {
    /// The first configured origin, in origin-type order.
    #[must_use]
    pub fn first_origin(&self) -> Option<&OriginConfig> {
        self.origin.values().next()
    }

    /// The custom origin, if one is configured.
    #[must_use]
    pub fn custom_origin(&self) -> Option<&OriginConfig> {
        self.origin.get(CUSTOM_ORIGIN)
    }
}

/// One origin's configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginConfig {
    /// Origin host name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
    /// Headers the distribution adds when talking to this origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_headers: Option<EdgeHeaders>,
    /// Everything else (`port`, `protocol`, `path`, `sslProtocols`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OriginConfig {
    /// Whether a custom header with this name is configured, ignoring case.
    #[must_use]
    pub fn has_custom_header(&self, name: &str) -> bool {
        self.custom_headers
            .as_ref()
            .is_some_and(|headers| headers.keys().any(|key| key.eq_ignore_ascii_case(name)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_event() -> Value {
        json!({
            "Records": [{
                "cf": {
                    "config": {"distributionId": "EDFDVBD6EXAMPLE", "eventType": "origin-request"},
                    "request": {
                        "clientIp": "203.0.113.178",
                        "method": "GET",
                        "uri": "/img.png",
                        "querystring": "size=large",
                        "headers": {
                            "if-none-match": [{"key": "If-None-Match", "value": "abc"}],
                            "user-agent": [{"key": "User-Agent", "value": "curl/8.0"}]
                        },
                        "origin": {
                            "custom": {
                                "customHeaders": {},
                                "domainName": "bucket.s3.amazonaws.com",
                                "keepaliveTimeout": 5,
                                "path": "",
                                "port": 443,
                                "protocol": "https",
                                "readTimeout": 30,
                                "sslProtocols": ["TLSv1.2"]
                            }
                        }
                    }
                }
            }]
        })
    }

    #[test]
    fn test_should_deserialize_origin_request_event() {
        let event: EdgeEvent = serde_json::from_value(sample_event()).unwrap();
        let request = &event.records[0].cf.request;

        assert_eq!(request.method, "GET");
        assert_eq!(request.uri, "/img.png");
        assert_eq!(request.querystring.as_deref(), Some("size=large"));
        assert_eq!(
            request.headers["if-none-match"][0],
            HeaderEntry::new("If-None-Match", "abc")
        );
        assert_eq!(
            request.custom_origin().unwrap().domain_name.as_deref(),
            Some("bucket.s3.amazonaws.com")
        );
        assert_eq!(request.extra["clientIp"], json!("203.0.113.178"));
    }

    #[test]
    fn test_should_round_trip_unknown_fields() {
        let original = sample_event();
        let event: EdgeEvent = serde_json::from_value(original.clone()).unwrap();
        assert_eq!(serde_json::to_value(&event).unwrap(), original);
    }

    #[test]
    fn test_should_write_back_received_key_order() {
        let received = r#"{"uri":"/a.png","method":"GET","headers":{"via":[{"value":"2.0 cf","key":"Via"}],"accept":[{"key":"Accept","value":"*/*"}]},"origin":{"custom":{"port":443,"domainName":"bucket.s3.amazonaws.com"}},"clientIp":"203.0.113.178"}"#;

        let request: EdgeRequest = serde_json::from_str(received).unwrap();

        assert_eq!(serde_json::to_string(&request).unwrap(), received);
    }

    #[test]
    fn test_should_omit_absent_querystring() {
        let request = EdgeRequest {
            method: "GET".to_owned(),
            uri: "/".to_owned(),
            querystring: None,
            headers: EdgeHeaders::new(),
            origin: BTreeMap::new(),
            extra: Map::new(),
            layout: KeyLayout::default(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("querystring").is_none());
    }

    #[test]
    fn test_should_match_custom_header_ignoring_case() {
        let origin = OriginConfig {
            custom_headers: Some(EdgeHeaders::from([(
                "origintypefailover".to_owned(),
                vec![HeaderEntry::new("originTypeFailover", "true")],
            )])),
            ..OriginConfig::default()
        };
        assert!(origin.has_custom_header("originTypeFailover"));
        assert!(!OriginConfig::default().has_custom_header("originTypeFailover"));
    }
}
