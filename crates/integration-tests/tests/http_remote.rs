//! Integration tests for the HTTP account client.
//!
//! These tests run `HttpRemote` against the in-process mock API and check
//! both the happy paths and how each failure shape is classified.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use shopkeep_core::{CartLine, ItemId, LineKey, Wishlist};
use shopkeep_integration_tests::{Failure, MockAccountApi, VALID_TOKEN};
use shopkeep_sync::{Credential, HttpRemote, RemoteError, RemoteStore};

async fn setup() -> (MockAccountApi, HttpRemote, Credential) {
    let api = MockAccountApi::spawn().await.unwrap();
    let remote = HttpRemote::with_base_url(api.url(), Duration::from_secs(5)).unwrap();
    (api, remote, Credential::new(VALID_TOKEN))
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_cart_add_update_remove() {
    let (api, remote, cred) = setup().await;

    let lines = remote
        .add_to_cart(&cred, &CartLine::new("p1", "M", 2))
        .await
        .unwrap();
    assert_eq!(lines, vec![CartLine::new("p1", "M", 2)]);

    let lines = remote
        .add_to_cart(&cred, &CartLine::new("p1", "M", 1))
        .await
        .unwrap();
    assert_eq!(lines, vec![CartLine::new("p1", "M", 3)]);

    let lines = remote
        .update_cart(&cred, &LineKey::new("p1", "M"), 5)
        .await
        .unwrap();
    assert_eq!(lines[0].quantity, 5);

    let lines = remote
        .remove_from_cart(&cred, &LineKey::new("p1", "M"))
        .await
        .unwrap();
    assert!(lines.is_empty());
    assert!(api.cart().is_empty());
}

#[tokio::test]
async fn test_cart_update_to_zero_removes_line() {
    let (api, remote, cred) = setup().await;
    api.set_cart(vec![CartLine::new("p1", "", 1), CartLine::new("p2", "", 1)]);

    let lines = remote
        .update_cart(&cred, &LineKey::new("p1", ""), 0)
        .await
        .unwrap();

    assert_eq!(lines, vec![CartLine::new("p2", "", 1)]);
}

#[tokio::test]
async fn test_cart_merge_dedups_on_server() {
    let (api, remote, cred) = setup().await;
    api.set_cart(vec![CartLine::new("p1", "M", 1)]);

    let lines = remote
        .merge_cart(
            &cred,
            &[CartLine::new("p1", "M", 2), CartLine::new("p9", "", 1)],
        )
        .await
        .unwrap();

    assert_eq!(
        lines,
        vec![CartLine::new("p1", "M", 3), CartLine::new("p9", "", 1)]
    );
    assert_eq!(api.count("POST /api/cart/merge"), 1);
}

// =============================================================================
// Wishlist
// =============================================================================

#[tokio::test]
async fn test_wishlist_add_and_remove() {
    let (api, remote, cred) = setup().await;

    remote
        .add_to_wishlist(&cred, &ItemId::new("p1"))
        .await
        .unwrap();
    let wishlist = remote
        .add_to_wishlist(&cred, &ItemId::new("p2"))
        .await
        .unwrap();
    assert_eq!(wishlist.len(), 2);

    let wishlist = remote
        .remove_from_wishlist(&cred, &ItemId::new("p1"))
        .await
        .unwrap();
    let expected: Wishlist = [ItemId::new("p2")].into_iter().collect();
    assert_eq!(wishlist, expected);
    assert_eq!(api.wishlist(), expected);
}

#[tokio::test]
async fn test_wishlist_add_is_idempotent() {
    let (api, remote, cred) = setup().await;
    api.set_wishlist([ItemId::new("p1")].into_iter().collect());

    let wishlist = remote
        .add_to_wishlist(&cred, &ItemId::new("p1"))
        .await
        .unwrap();

    assert_eq!(wishlist.len(), 1);
}

// =============================================================================
// Failure classification
// =============================================================================

#[tokio::test]
async fn test_bad_credential_is_unauthorized() {
    let (_api, remote, _cred) = setup().await;

    let result = remote.cart(&Credential::new("wrong")).await;

    assert!(matches!(result, Err(RemoteError::Unauthorized)));
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let (api, remote, cred) = setup().await;
    api.set_failure(Failure::Unavailable);

    let err = remote.wishlist(&cred).await.unwrap_err();

    assert!(matches!(err, RemoteError::Server { status: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unsuccessful_envelope_is_rejected() {
    let (api, remote, cred) = setup().await;
    api.set_failure(Failure::RejectAll);

    let err = remote
        .add_to_cart(&cred, &CartLine::new("p1", "", 1))
        .await
        .unwrap_err();

    match err {
        RemoteError::Rejected { status, message } => {
            assert_eq!(status, 200);
            assert_eq!(message, "request refused");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_server_hits_client_timeout() {
    let api = MockAccountApi::spawn().await.unwrap();
    let remote = HttpRemote::with_base_url(api.url(), Duration::from_millis(100)).unwrap();
    api.set_failure(Failure::Stall(Duration::from_secs(2)));

    let err = remote
        .cart(&Credential::new(VALID_TOKEN))
        .await
        .unwrap_err();

    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_mock_requires_bearer_token() {
    let api = MockAccountApi::spawn().await.unwrap();

    let response = reqwest::get(api.url().join("api/cart").unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}
