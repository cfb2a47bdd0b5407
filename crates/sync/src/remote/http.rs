//! HTTP implementation of the account cart/wishlist API.
//!
//! Uses `reqwest` with a bearer credential per call. Response bodies are read
//! as text first so failures can be logged with a body excerpt.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use shopkeep_core::{CartLine, ItemId, LineKey, Wishlist};

use super::{RemoteError, RemoteStore};
use crate::config::SyncConfig;
use crate::session::Credential;

const BODY_EXCERPT_CHARS: usize = 200;

/// Response envelope shared by every cart/wishlist endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    items: T,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateLineBody<'a> {
    item_id: &'a ItemId,
    variant: &'a shopkeep_core::Variant,
    quantity: i64,
}

#[derive(Debug, Serialize)]
struct MergeBody<'a> {
    items: &'a [CartLine],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WishlistItemBody<'a> {
    item_id: &'a ItemId,
}

// =============================================================================
// HttpRemote
// =============================================================================

/// Client for the account cart/wishlist API.
#[derive(Clone)]
pub struct HttpRemote {
    inner: Arc<HttpRemoteInner>,
}

struct HttpRemoteInner {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpRemote {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the HTTP client cannot be built or the API
    /// URL cannot carry paths.
    pub fn new(config: &SyncConfig) -> Result<Self, RemoteError> {
        Self::with_base_url(config.api_url.clone(), config.request_timeout)
    }

    /// Create a client against `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the HTTP client cannot be built or
    /// `base_url` cannot carry paths.
    pub fn with_base_url(base_url: Url, timeout: Duration) -> Result<Self, RemoteError> {
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::InvalidUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            inner: Arc::new(HttpRemoteInner { client, base_url }),
        })
    }

    /// Base URL requests are issued against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        endpoint(&self.inner.base_url, segments)
            .ok_or_else(|| RemoteError::InvalidUrl(self.inner.base_url.to_string()))
    }

    /// Execute one API call and unwrap the envelope.
    async fn execute<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        credential: &Credential,
        body: Option<&B>,
    ) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned + Default,
    {
        let url = self.endpoint(segments)?;

        let mut request = self
            .inner
            .client
            .request(method, url)
            .bearer_auth(credential.expose());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteError::Unauthorized);
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            tracing::error!(
                status = %status,
                body = %excerpt(&response_text),
                "Account API returned server error"
            );
            return Err(RemoteError::Server {
                status: status.as_u16(),
                message: excerpt(&response_text),
            });
        }

        let envelope: Envelope<T> = match serde_json::from_str(&response_text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(RemoteError::Rejected {
                    status: status.as_u16(),
                    message: excerpt(&response_text),
                });
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %excerpt(&response_text),
                    "Failed to parse account API response"
                );
                return Err(RemoteError::Parse(e));
            }
        };

        if !status.is_success() || !envelope.success {
            debug!(status = %status, message = ?envelope.message, "Account API refused request");
            return Err(RemoteError::Rejected {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            });
        }

        Ok(envelope.items)
    }
}

impl std::fmt::Debug for HttpRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRemote")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl RemoteStore for HttpRemote {
    #[instrument(skip(self, credential))]
    async fn cart(&self, credential: &Credential) -> Result<Vec<CartLine>, RemoteError> {
        self.execute(Method::GET, &["api", "cart"], credential, None::<&()>)
            .await
    }

    #[instrument(skip(self, credential))]
    async fn add_to_cart(
        &self,
        credential: &Credential,
        line: &CartLine,
    ) -> Result<Vec<CartLine>, RemoteError> {
        self.execute(Method::POST, &["api", "cart", "add"], credential, Some(line))
            .await
    }

    #[instrument(skip(self, credential))]
    async fn update_cart(
        &self,
        credential: &Credential,
        key: &LineKey,
        quantity: i64,
    ) -> Result<Vec<CartLine>, RemoteError> {
        let body = UpdateLineBody {
            item_id: &key.item_id,
            variant: &key.variant,
            quantity,
        };
        self.execute(
            Method::PUT,
            &["api", "cart", "update"],
            credential,
            Some(&body),
        )
        .await
    }

    #[instrument(skip(self, credential))]
    async fn remove_from_cart(
        &self,
        credential: &Credential,
        key: &LineKey,
    ) -> Result<Vec<CartLine>, RemoteError> {
        self.execute(
            Method::POST,
            &["api", "cart", "remove"],
            credential,
            Some(key),
        )
        .await
    }

    #[instrument(skip(self, credential, lines), fields(lines = lines.len()))]
    async fn merge_cart(
        &self,
        credential: &Credential,
        lines: &[CartLine],
    ) -> Result<Vec<CartLine>, RemoteError> {
        let body = MergeBody { items: lines };
        self.execute(
            Method::POST,
            &["api", "cart", "merge"],
            credential,
            Some(&body),
        )
        .await
    }

    #[instrument(skip(self, credential))]
    async fn wishlist(&self, credential: &Credential) -> Result<Wishlist, RemoteError> {
        self.execute(Method::GET, &["api", "wishlist"], credential, None::<&()>)
            .await
    }

    #[instrument(skip(self, credential))]
    async fn add_to_wishlist(
        &self,
        credential: &Credential,
        item: &ItemId,
    ) -> Result<Wishlist, RemoteError> {
        let body = WishlistItemBody { item_id: item };
        self.execute(
            Method::POST,
            &["api", "wishlist", "add"],
            credential,
            Some(&body),
        )
        .await
    }

    #[instrument(skip(self, credential))]
    async fn remove_from_wishlist(
        &self,
        credential: &Credential,
        item: &ItemId,
    ) -> Result<Wishlist, RemoteError> {
        let body = WishlistItemBody { item_id: item };
        self.execute(
            Method::POST,
            &["api", "wishlist", "remove"],
            credential,
            Some(&body),
        )
        .await
    }
}

/// Append path segments to `base`, percent-encoding each one.
///
/// Returns `None` if `base` cannot carry a path (e.g. `mailto:` URLs).
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Option<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(segments);
    Some(url)
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}
