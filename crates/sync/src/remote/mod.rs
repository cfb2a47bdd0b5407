//! Account-scoped cart and wishlist API.
//!
//! # Contract
//!
//! Every call either returns the resource's full item list after the
//! operation or a [`RemoteError`]. Success is signalled by the `success`
//! field of the response envelope, not only by the HTTP status.
//!
//! [`HttpRemote`] is the production implementation; tests substitute an
//! in-memory [`RemoteStore`].

pub(crate) mod http;

pub use http::HttpRemote;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use shopkeep_core::{CartLine, ItemId, LineKey, Wishlist};

use crate::session::Credential;

/// Errors that can occur when calling the account API.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Network or transport failure.
    #[error("Account API unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),

    /// Call did not complete within the configured timeout.
    #[error("Account API timed out after {0:?}")]
    Timeout(Duration),

    /// Server-side failure (5xx) or rate limiting.
    #[error("Account API server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// The credential was not accepted.
    #[error("Account API rejected the credential")]
    Unauthorized,

    /// The request was understood and refused (`success: false` or 4xx).
    #[error("Account API rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// Response body was not a valid envelope.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Base URL cannot carry API paths.
    #[error("Invalid account API URL: {0}")]
    InvalidUrl(String),
}

impl RemoteError {
    /// Whether retrying the same request later could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::Timeout(_) | Self::Server { .. }
        )
    }
}

/// The account service's cart and wishlist operations.
pub trait RemoteStore: Send + Sync {
    /// Current cart lines.
    fn cart(
        &self,
        credential: &Credential,
    ) -> impl Future<Output = Result<Vec<CartLine>, RemoteError>> + Send;

    /// Add a line; the server increments an existing line with the same key.
    fn add_to_cart(
        &self,
        credential: &Credential,
        line: &CartLine,
    ) -> impl Future<Output = Result<Vec<CartLine>, RemoteError>> + Send;

    /// Set a line's quantity; zero or less removes it.
    fn update_cart(
        &self,
        credential: &Credential,
        key: &LineKey,
        quantity: i64,
    ) -> impl Future<Output = Result<Vec<CartLine>, RemoteError>> + Send;

    fn remove_from_cart(
        &self,
        credential: &Credential,
        key: &LineKey,
    ) -> impl Future<Output = Result<Vec<CartLine>, RemoteError>> + Send;

    /// Bulk-merge guest lines into the account cart; the server dedups.
    fn merge_cart(
        &self,
        credential: &Credential,
        lines: &[CartLine],
    ) -> impl Future<Output = Result<Vec<CartLine>, RemoteError>> + Send;

    fn wishlist(
        &self,
        credential: &Credential,
    ) -> impl Future<Output = Result<Wishlist, RemoteError>> + Send;

    /// Add `item`; adding an existing member leaves it in place.
    fn add_to_wishlist(
        &self,
        credential: &Credential,
        item: &ItemId,
    ) -> impl Future<Output = Result<Wishlist, RemoteError>> + Send;

    fn remove_from_wishlist(
        &self,
        credential: &Credential,
        item: &ItemId,
    ) -> impl Future<Output = Result<Wishlist, RemoteError>> + Send;
}
