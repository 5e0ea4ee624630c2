//! Signer configuration.
//!
//! Lambda@Edge functions cannot read environment variables, so the defaults
//! are the production values. [`SignerConfig::from_env`] exists for regional
//! deployments and local runs.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Request signer configuration.
///
/// # Examples
///
/// ```
/// use edgesign_core::config::SignerConfig;
///
/// let config = SignerConfig::default();
/// assert_eq!(config.region, "us-east-2");
/// assert_eq!(config.service, "s3");
/// assert!(!config.debug_dispatch);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct SignerConfig {
    /// Signing region of the storage origin.
    #[builder(default = String::from("us-east-2"), setter(into))]
    pub region: String,

    /// Signing service name.
    #[builder(default = String::from("s3"), setter(into))]
    pub service: String,

    /// Scheme used to build the origin endpoint.
    #[builder(default = String::from("https"), setter(into))]
    pub scheme: String,

    /// Origin custom header marking a request that already failed over.
    #[builder(default = String::from("originTypeFailover"), setter(into))]
    pub failover_header: String,

    /// Whether to replay each signed request against the origin for logging.
    #[builder(default = false)]
    pub debug_dispatch: bool,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"), setter(into))]
    pub log_level: String,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SignerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `ORIGIN_REGION` | `us-east-2` |
    /// | `ORIGIN_SERVICE` | `s3` |
    /// | `ORIGIN_SCHEME` | `https` |
    /// | `FAILOVER_HEADER` | `originTypeFailover` |
    /// | `DEBUG_DISPATCH` | `false` |
    /// | `LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("ORIGIN_REGION") {
            config.region = v;
        }
        if let Some(v) = lookup("ORIGIN_SERVICE") {
            config.service = v;
        }
        if let Some(v) = lookup("ORIGIN_SCHEME") {
            config.scheme = v;
        }
        if let Some(v) = lookup("FAILOVER_HEADER") {
            config.failover_header = v;
        }
        if let Some(v) = lookup("DEBUG_DISPATCH") {
            config.debug_dispatch = parse_bool(&v);
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_use_production_defaults() {
        let config = SignerConfig::default();
        assert_eq!(config.region, "us-east-2");
        assert_eq!(config.service, "s3");
        assert_eq!(config.scheme, "https");
        assert_eq!(config.failover_header, "originTypeFailover");
        assert_eq!(config.log_level, "info");
        assert!(!config.debug_dispatch);
    }

    #[test]
    fn test_should_override_from_lookup() {
        let config = SignerConfig::from_lookup(|name| match name {
            "ORIGIN_REGION" => Some("eu-west-1".to_owned()),
            "DEBUG_DISPATCH" => Some("TRUE".to_owned()),
            _ => None,
        });
        assert_eq!(config.region, "eu-west-1");
        assert!(config.debug_dispatch);
        assert_eq!(config.service, "s3");
    }

    #[test]
    fn test_should_parse_bool_values() {
        assert!(parse_bool("1"));
        assert!(parse_bool(" yes "));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("off"));
    }
}
