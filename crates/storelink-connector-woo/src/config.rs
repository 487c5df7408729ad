//! WooCommerce connector configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use storelink_connector::error::{ConnectorError, ConnectorResult};

use crate::rate_limit::RateLimitConfig;

/// How requests authenticate against the WooCommerce REST API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WooAuthMode {
    /// HTTP Basic auth over HTTPS (the recommended mode).
    #[default]
    BasicHttps,
    /// Consumer key/secret as query string parameters. Fallback for hosts
    /// that strip the Authorization header.
    QuerystringFallback,
}

impl fmt::Display for WooAuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BasicHttps => write!(f, "basic_https"),
            Self::QuerystringFallback => write!(f, "querystring_fallback"),
        }
    }
}

impl std::str::FromStr for WooAuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic_https" => Ok(Self::BasicHttps),
            "querystring_fallback" => Ok(Self::QuerystringFallback),
            // Stores created before OAuth1 support was dropped still carry
            // this mode; they authenticate like basic_https.
            "oauth1" => Ok(Self::BasicHttps),
            other => Err(format!("Unknown auth mode: {other}")),
        }
    }
}

/// Configuration for a WooCommerce connector instance.
#[derive(Clone, Serialize, Deserialize)]
pub struct WooConfig {
    /// Store base URL, normalized (scheme present, no trailing slash, no
    /// query or fragment).
    pub base_url: String,

    /// Authentication mode.
    #[serde(default)]
    pub auth_mode: WooAuthMode,

    /// REST API consumer key.
    pub consumer_key: String,

    /// REST API consumer secret.
    pub consumer_secret: String,

    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Read timeout in seconds.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Outbound rate limiting.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_read_timeout_secs() -> u64 {
    30
}

impl WooConfig {
    /// Build a config from raw store settings, normalizing the base URL.
    pub fn new(
        base_url: &str,
        auth_mode: WooAuthMode,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
    ) -> ConnectorResult<Self> {
        Ok(Self {
            base_url: normalize_store_url(base_url)?,
            auth_mode,
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            rate_limit: RateLimitConfig::default(),
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConnectorResult<()> {
        if self.consumer_key.trim().is_empty() || self.consumer_secret.trim().is_empty() {
            return Err(ConnectorError::InvalidConfiguration {
                message: "consumer key and secret are required".to_string(),
            });
        }
        normalize_store_url(&self.base_url)?;
        Ok(())
    }

    /// A copy safe to log: credentials replaced with a placeholder.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            consumer_key: "***".to_string(),
            consumer_secret: "***".to_string(),
            ..self.clone()
        }
    }
}

impl fmt::Debug for WooConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WooConfig")
            .field("base_url", &self.base_url)
            .field("auth_mode", &self.auth_mode)
            .field("consumer_key", &"***")
            .field("consumer_secret", &"***")
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .finish()
    }
}

/// Normalize a caller-supplied store URL.
///
/// Defaults the scheme to https, strips query, fragment and trailing
/// slashes. Rejects anything that does not parse as an http(s) URL.
pub fn normalize_store_url(input: &str) -> ConnectorResult<String> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err(ConnectorError::InvalidConfiguration {
            message: "store URL is required".to_string(),
        });
    }

    let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    let mut url = Url::parse(&with_scheme).map_err(|e| ConnectorError::InvalidConfiguration {
        message: format!("invalid store URL: {e}"),
    })?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConnectorError::InvalidConfiguration {
            message: format!("unsupported URL scheme: {}", url.scheme()),
        });
    }

    url.set_fragment(None);
    url.set_query(None);
    let trimmed = url.path().trim_end_matches('/').to_string();
    url.set_path(&trimmed);

    Ok(url.to_string().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_adds_https() {
        assert_eq!(
            normalize_store_url("shop.example.com").unwrap(),
            "https://shop.example.com"
        );
    }

    #[test]
    fn test_normalize_strips_trailing_slash_and_query() {
        assert_eq!(
            normalize_store_url("https://shop.example.com/store/?utm=1#top").unwrap(),
            "https://shop.example.com/store"
        );
    }

    #[test]
    fn test_normalize_keeps_http() {
        assert_eq!(
            normalize_store_url("http://localhost:8080").unwrap(),
            "http://localhost:8080"
        );
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(normalize_store_url("  ").is_err());
    }

    #[test]
    fn test_auth_mode_parse() {
        assert_eq!(
            "basic_https".parse::<WooAuthMode>().unwrap(),
            WooAuthMode::BasicHttps
        );
        assert_eq!(
            "querystring_fallback".parse::<WooAuthMode>().unwrap(),
            WooAuthMode::QuerystringFallback
        );
        // Legacy mode maps to basic auth.
        assert_eq!(
            "oauth1".parse::<WooAuthMode>().unwrap(),
            WooAuthMode::BasicHttps
        );
        assert!("digest".parse::<WooAuthMode>().is_err());
    }

    #[test]
    fn test_validate_requires_credentials() {
        let config = WooConfig::new("shop.example.com", WooAuthMode::BasicHttps, "", "").unwrap();
        assert!(config.validate().is_err());

        let config =
            WooConfig::new("shop.example.com", WooAuthMode::BasicHttps, "ck_x", "cs_y").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let config =
            WooConfig::new("shop.example.com", WooAuthMode::BasicHttps, "ck_secret", "cs_secret")
                .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("ck_secret"));
        assert!(!debug.contains("cs_secret"));
    }
}
