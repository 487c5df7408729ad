//! WooCommerce REST connector implementation.

use async_trait::async_trait;
use base64::Engine;
use reqwest::{header, Client, Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use storelink_connector::error::{ConnectorError, ConnectorResult};
use storelink_connector::traits::{Connector, ProductSearch, ProductWrite};
use storelink_connector::types::{NewRemoteProduct, RemoteProduct, RemoteProductPatch};

use crate::config::{WooAuthMode, WooConfig};
use crate::rate_limit::{parse_retry_after, RateLimiter};
use crate::wire::{self, WooErrorBody, WooProductBody};

/// Connector for a single WooCommerce store.
pub struct WooConnector {
    config: WooConfig,
    display_name: String,
    client: Arc<Client>,
    rate_limiter: Arc<RateLimiter>,
}

impl std::fmt::Debug for WooConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WooConnector")
            .field("config", &self.config.redacted())
            .field("display_name", &self.display_name)
            .finish()
    }
}

impl WooConnector {
    /// Create a new connector with the given configuration.
    pub fn new(config: WooConfig) -> ConnectorResult<Self> {
        config.validate()?;

        let display_name = format!("WooCommerce: {}", config.base_url);
        let client = Self::build_client(&config)?;
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

        Ok(Self {
            config,
            display_name,
            client: Arc::new(client),
            rate_limiter,
        })
    }

    /// Build the reqwest client with the configured timeouts.
    fn build_client(config: &WooConfig) -> ConnectorResult<Client> {
        Client::builder()
            .timeout(Duration::from_secs(config.read_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent("storelink/woocommerce-connector")
            .build()
            .map_err(|e| ConnectorError::InvalidConfiguration {
                message: format!("failed to build HTTP client: {e}"),
            })
    }

    /// Build the full `wp-json/wc/v3` URL for a path, applying the
    /// configured auth mode.
    fn api_url(&self, path: &str, query: &[(&str, String)]) -> ConnectorResult<(Url, Option<String>)> {
        let base = format!(
            "{}/wp-json/wc/v3/{}",
            self.config.base_url,
            path.trim_start_matches('/')
        );
        let mut url = Url::parse(&base).map_err(|e| ConnectorError::InvalidConfiguration {
            message: format!("invalid request URL: {e}"),
        })?;

        for (key, value) in query {
            url.query_pairs_mut().append_pair(key, value);
        }

        let ck = self.config.consumer_key.trim();
        let cs = self.config.consumer_secret.trim();
        let auth_header = match self.config.auth_mode {
            WooAuthMode::BasicHttps => {
                let credentials = format!("{ck}:{cs}");
                let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
                Some(format!("Basic {encoded}"))
            }
            WooAuthMode::QuerystringFallback => {
                url.query_pairs_mut()
                    .append_pair("consumer_key", ck)
                    .append_pair("consumer_secret", cs);
                None
            }
        };

        Ok((url, auth_header))
    }

    /// Execute one request and return the parsed body.
    #[instrument(skip(self, body), fields(store = %self.config.base_url))]
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> ConnectorResult<Value> {
        let (url, auth_header) = self.api_url(path, query)?;
        let _guard = self.rate_limiter.acquire().await;

        let mut builder = self
            .client
            .request(method.clone(), url)
            .header(header::ACCEPT, "application/json");
        if let Some(auth) = auth_header {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.config.read_timeout_secs))?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let payload: Value = response.json().await.unwrap_or(Value::Null);

        if status.is_success() {
            debug!(%status, %method, path, "storefront request ok");
            return Ok(payload);
        }

        let error = classify_status(status, retry_after.as_deref(), &payload);
        warn!(
            %status,
            %method,
            path,
            code = error.error_code(),
            "storefront request failed"
        );
        Err(error)
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> ConnectorResult<Value> {
        self.request(Method::GET, path, query, None).await
    }

    fn parse_products(&self, payload: Value, parent_hint: Option<i64>) -> ConnectorResult<Vec<RemoteProduct>> {
        let bodies: Vec<WooProductBody> =
            serde_json::from_value(payload).map_err(|e| ConnectorError::serialization(format!(
                "unexpected product list body: {e}"
            )))?;
        Ok(bodies
            .into_iter()
            .map(|b| b.into_remote(parent_hint))
            .collect())
    }

    fn parse_product(&self, payload: Value, parent_hint: Option<i64>) -> ConnectorResult<RemoteProduct> {
        let body: WooProductBody =
            serde_json::from_value(payload).map_err(|e| ConnectorError::serialization(format!(
                "unexpected product body: {e}"
            )))?;
        Ok(body.into_remote(parent_hint))
    }
}

/// Map a reqwest transport failure into the connector taxonomy.
fn map_transport_error(err: reqwest::Error, timeout_secs: u64) -> ConnectorError {
    if err.is_timeout() {
        return ConnectorError::ConnectionTimeout { timeout_secs };
    }
    if err.is_connect() {
        return ConnectorError::connection_failed_with_source("could not reach storefront", err);
    }
    ConnectorError::network_with_source("request failed", err)
}

/// Classify a non-success HTTP status into the connector taxonomy.
///
/// 408/429/5xx are transient; everything else in 4xx is a permanent
/// semantic rejection carrying the storefront's own `code`/`message`.
fn classify_status(status: StatusCode, retry_after: Option<&str>, payload: &Value) -> ConnectorError {
    let woo_error: WooErrorBody =
        serde_json::from_value(payload.clone()).unwrap_or(WooErrorBody {
            code: None,
            message: None,
        });

    match status {
        StatusCode::UNAUTHORIZED => ConnectorError::AuthenticationFailed,
        StatusCode::FORBIDDEN => ConnectorError::AuthorizationFailed {
            operation: woo_error
                .message
                .unwrap_or_else(|| "storefront request".to_string()),
        },
        StatusCode::NOT_FOUND => ConnectorError::ObjectNotFound {
            identifier: woo_error.code.unwrap_or_else(|| "unknown".to_string()),
        },
        StatusCode::REQUEST_TIMEOUT => ConnectorError::ConnectionTimeout { timeout_secs: 0 },
        StatusCode::TOO_MANY_REQUESTS => ConnectorError::RateLimited {
            retry_after_secs: retry_after
                .and_then(parse_retry_after)
                .map(|d| d.as_secs()),
        },
        s if s.is_server_error() => ConnectorError::ServerError {
            status: s.as_u16(),
            body: woo_error.message,
        },
        s => ConnectorError::Rejected {
            status: s.as_u16(),
            code: woo_error
                .code
                .unwrap_or_else(|| "woocommerce_rest_error".to_string()),
            message: woo_error.message.unwrap_or_default(),
        },
    }
}

#[async_trait]
impl Connector for WooConnector {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Probe the store with a one-product page request.
    async fn test_connection(&self) -> ConnectorResult<()> {
        self.get(
            "products",
            &[("per_page", "1".to_string()), ("page", "1".to_string())],
        )
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl ProductSearch for WooConnector {
    async fn search_by_sku(&self, sku: &str) -> ConnectorResult<Vec<RemoteProduct>> {
        let trimmed = sku.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        let payload = self
            .get("products", &[("sku", trimmed.to_string())])
            .await?;
        self.parse_products(payload, None)
    }

    async fn search_products(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> ConnectorResult<Vec<RemoteProduct>> {
        let payload = self
            .get(
                "products",
                &[
                    ("search", query.to_string()),
                    ("page", page.max(1).to_string()),
                    ("per_page", per_page.clamp(1, 100).to_string()),
                ],
            )
            .await?;
        self.parse_products(payload, None)
    }

    async fn get_product(&self, product_id: i64) -> ConnectorResult<Option<RemoteProduct>> {
        match self.get(&format!("products/{product_id}"), &[]).await {
            Ok(payload) => Ok(Some(self.parse_product(payload, None)?)),
            Err(ConnectorError::ObjectNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_variation(
        &self,
        product_id: i64,
        variation_id: i64,
    ) -> ConnectorResult<Option<RemoteProduct>> {
        match self
            .get(
                &format!("products/{product_id}/variations/{variation_id}"),
                &[],
            )
            .await
        {
            Ok(payload) => Ok(Some(self.parse_product(payload, Some(product_id))?)),
            Err(ConnectorError::ObjectNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ProductWrite for WooConnector {
    async fn create_product(&self, product: NewRemoteProduct) -> ConnectorResult<RemoteProduct> {
        let body = wire::create_body(&product);
        let payload = self
            .request(Method::POST, "products", &[], Some(body))
            .await?;
        self.parse_product(payload, None)
    }

    async fn update_product(
        &self,
        product_id: i64,
        patch: RemoteProductPatch,
    ) -> ConnectorResult<RemoteProduct> {
        let body = wire::patch_body(&patch);
        let payload = self
            .request(Method::PUT, &format!("products/{product_id}"), &[], Some(body))
            .await?;
        self.parse_product(payload, None)
    }

    async fn update_variation(
        &self,
        product_id: i64,
        variation_id: i64,
        patch: RemoteProductPatch,
    ) -> ConnectorResult<RemoteProduct> {
        let body = wire::patch_body(&patch);
        let payload = self
            .request(
                Method::PUT,
                &format!("products/{product_id}/variations/{variation_id}"),
                &[],
                Some(body),
            )
            .await?;
        self.parse_product(payload, Some(product_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> WooConfig {
        WooConfig::new(
            "shop.example.com",
            WooAuthMode::BasicHttps,
            "ck_test",
            "cs_test",
        )
        .unwrap()
    }

    #[test]
    fn test_api_url_basic_auth_sets_header() {
        let connector = WooConnector::new(config()).unwrap();
        let (url, auth) = connector
            .api_url("products", &[("per_page", "1".to_string())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://shop.example.com/wp-json/wc/v3/products?per_page=1"
        );
        assert!(auth.unwrap().starts_with("Basic "));
    }

    #[test]
    fn test_api_url_querystring_fallback_embeds_credentials() {
        let mut cfg = config();
        cfg.auth_mode = WooAuthMode::QuerystringFallback;
        let connector = WooConnector::new(cfg).unwrap();
        let (url, auth) = connector.api_url("products/7", &[]).unwrap();
        assert!(auth.is_none());
        assert!(url.query().unwrap().contains("consumer_key=ck_test"));
        assert!(url.query().unwrap().contains("consumer_secret=cs_test"));
    }

    #[test]
    fn test_classify_429_is_rate_limited() {
        let err = classify_status(StatusCode::TOO_MANY_REQUESTS, Some("30"), &Value::Null);
        assert!(err.is_transient());
        match err {
            ConnectorError::RateLimited { retry_after_secs } => {
                assert_eq!(retry_after_secs, Some(30));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_5xx_is_transient() {
        let err = classify_status(StatusCode::BAD_GATEWAY, None, &Value::Null);
        assert!(err.is_transient());
        assert_eq!(err.error_code(), "SERVER_ERROR");
    }

    #[test]
    fn test_classify_404_is_object_not_found() {
        let payload = json!({"code": "woocommerce_rest_product_invalid_id", "message": "Invalid ID."});
        let err = classify_status(StatusCode::NOT_FOUND, None, &payload);
        assert!(err.is_permanent());
        match err {
            ConnectorError::ObjectNotFound { identifier } => {
                assert_eq!(identifier, "woocommerce_rest_product_invalid_id");
            }
            other => panic!("expected ObjectNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_400_preserves_woo_code() {
        let payload = json!({"code": "product_invalid_sku", "message": "Invalid or duplicated SKU."});
        let err = classify_status(StatusCode::BAD_REQUEST, None, &payload);
        assert!(err.is_permanent());
        match err {
            ConnectorError::Rejected { status, code, message } => {
                assert_eq!(status, 400);
                assert_eq!(code, "product_invalid_sku");
                assert_eq!(message, "Invalid or duplicated SKU.");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_401_is_auth_failed() {
        let err = classify_status(StatusCode::UNAUTHORIZED, None, &Value::Null);
        assert_eq!(err.error_code(), "AUTH_FAILED");
        assert!(err.is_permanent());
    }

    #[test]
    fn test_debug_does_not_leak_credentials() {
        let connector = WooConnector::new(config()).unwrap();
        let debug = format!("{connector:?}");
        assert!(!debug.contains("ck_test"));
        assert!(!debug.contains("cs_test"));
    }
}
