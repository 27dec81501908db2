//! # Catalog Module
//!
//! Client for the catalog of record. The event processor uses it to fetch the
//! current state of a product after a change notification instead of trusting
//! the event payload.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::core::error::{SearchError, SearchResult};
use crate::core::types::ProductDocument;

/// Catalog client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Base URL of the catalog service
    pub url: String,

    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Bearer token sent with every request, when set
    pub token: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8081".to_string(),
            timeout: Duration::from_secs(5),
            token: None,
        }
    }
}

/// Read access to the catalog of record
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Current state of a product; [`SearchError::NotFound`] when it does not exist
    async fn get_product_by_id(&self, id: &str) -> SearchResult<ProductDocument>;
}

/// HTTP catalog client
pub struct HttpCatalogClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpCatalogClient {
    pub fn new(config: &CatalogConfig) -> SearchResult<Self> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| SearchError::config(format!("Invalid catalog URL '{}': {}", config.url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(SearchError::config(format!(
                "Invalid catalog URL '{}'",
                config.url
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SearchError::config(format!("Failed to create catalog HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn product_url(&self, id: &str) -> SearchResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SearchError::internal("catalog URL cannot be a base"))?
            .pop_if_empty()
            .push("products")
            .push(id);
        Ok(url)
    }
}

/// Decode either the `{"data": ...}` envelope or a bare product
fn decode_product(body: Value) -> SearchResult<ProductDocument> {
    let product = match body {
        Value::Object(mut map) if map.contains_key("data") => match map.remove("data") {
            Some(Value::Null) | None => {
                return Err(SearchError::catalog("catalog response carried no product"))
            }
            Some(data) => data,
        },
        other => other,
    };

    serde_json::from_value(product)
        .map_err(|e| SearchError::catalog(format!("Failed to decode catalog product: {}", e)))
}

#[async_trait]
impl ProductCatalog for HttpCatalogClient {
    async fn get_product_by_id(&self, id: &str) -> SearchResult<ProductDocument> {
        let id = id.trim();
        if id.is_empty() {
            return Err(SearchError::validation("product id is required"));
        }

        let mut request = self.client.get(self.product_url(id)?);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SearchError::catalog(format!("Catalog request failed: {}", e)))?;

        match response.status() {
            StatusCode::OK => {
                let body: Value = response.json().await.map_err(|e| {
                    SearchError::catalog(format!("Failed to decode catalog response: {}", e))
                })?;
                let product = decode_product(body)?;
                debug!(product_id = %id, "Fetched product from catalog");
                Ok(product)
            }
            StatusCode::NOT_FOUND => Err(SearchError::not_found("product", id)),
            status => Err(SearchError::catalog(format!(
                "Catalog returned unexpected status {}",
                status.as_u16()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_envelope() {
        let product = decode_product(json!({
            "data": {"id": "1", "name": "Floral Bloom", "precio": 10.5},
            "error": null
        }))
        .unwrap();
        assert_eq!(product.id, "1");
        assert_eq!(product.price, 10.5);
    }

    #[test]
    fn test_decode_bare_product() {
        let product = decode_product(json!({"id": "2", "name": "Citrus"})).unwrap();
        assert_eq!(product.name, "Citrus");
    }

    #[test]
    fn test_decode_empty_envelope_is_error() {
        let err = decode_product(json!({"data": null, "error": "boom"})).unwrap_err();
        assert!(matches!(err, SearchError::Catalog { .. }));
    }

    #[test]
    fn test_product_url_escapes_id() {
        let client = HttpCatalogClient::new(&CatalogConfig {
            url: "http://catalog:8081/api/".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            client.product_url("a/b").unwrap().as_str(),
            "http://catalog:8081/api/products/a%2Fb"
        );
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let result = HttpCatalogClient::new(&CatalogConfig {
            url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(SearchError::Configuration { .. })));
    }
}
