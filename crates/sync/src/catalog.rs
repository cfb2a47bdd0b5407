//! Read-only catalog lookups for rendering cart and wishlist entries.
//!
//! Lookups are cached with `moka`, including misses, so re-rendering a
//! badge or a wishlist page does not refetch every product.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use shopkeep_core::{ItemId, Product};

use crate::config::SyncConfig;
use crate::remote::http::endpoint;

const CACHE_CAPACITY: u64 = 1000;

/// Errors that can occur when looking up catalog products.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Catalog returned an unexpected status.
    #[error("Catalog returned HTTP {0}")]
    Status(u16),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Base URL cannot carry API paths.
    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(String),
}

/// Product lookup by id.
pub trait Catalog: Send + Sync {
    /// Fetch a product, `None` if the catalog does not know it.
    fn product(
        &self,
        id: &ItemId,
    ) -> impl Future<Output = Result<Option<Product>, CatalogError>> + Send;
}

/// HTTP catalog client (`GET /api/products/{id}`).
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<ItemId, Option<Product>>,
}

impl CatalogClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the HTTP client cannot be built or the
    /// catalog URL cannot carry paths.
    pub fn new(config: &SyncConfig) -> Result<Self, CatalogError> {
        Self::with_base_url(
            config.catalog_url.clone(),
            config.request_timeout,
            config.catalog_cache_ttl,
        )
    }

    /// Create a client against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the HTTP client cannot be built or
    /// `base_url` cannot carry paths.
    pub fn with_base_url(
        base_url: Url,
        timeout: Duration,
        cache_ttl: Duration,
    ) -> Result<Self, CatalogError> {
        if base_url.cannot_be_a_base() {
            return Err(CatalogError::InvalidUrl(base_url.to_string()));
        }

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client: reqwest::Client::builder().timeout(timeout).build()?,
                base_url,
                cache,
            }),
        })
    }

    async fn fetch(&self, id: &ItemId) -> Result<Option<Product>, CatalogError> {
        let url = endpoint(&self.inner.base_url, &["api", "products", id.as_str()])
            .ok_or_else(|| CatalogError::InvalidUrl(self.inner.base_url.to_string()))?;

        let response = self.inner.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(Some(serde_json::from_str(&body)?))
    }
}

impl Catalog for CatalogClient {
    #[instrument(skip(self))]
    async fn product(&self, id: &ItemId) -> Result<Option<Product>, CatalogError> {
        if let Some(cached) = self.inner.cache.get(id).await {
            debug!("Cache hit for product");
            return Ok(cached);
        }

        let product = self.fetch(id).await?;
        self.inner.cache.insert(id.clone(), product.clone()).await;
        Ok(product)
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_error_display() {
        assert_eq!(CatalogError::Status(500).to_string(), "Catalog returned HTTP 500");
    }

    #[test]
    fn test_rejects_non_base_url() {
        let url = Url::parse("data:text/plain,hello").unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            CatalogClient::with_base_url(url, Duration::from_secs(1), Duration::from_secs(1)),
            Err(CatalogError::InvalidUrl(_))
        ));
    }
}
