//! Integration tests for falling back to device state when the account API
//! misbehaves, and for recovering once it answers again.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use shopkeep_core::{CartLine, ItemId, LineKey, Resource, SyncStatus};
use shopkeep_integration_tests::{Failure, MockAccountApi, VALID_TOKEN};
use shopkeep_sync::reconciler::{CartOp, WishlistOp};
use shopkeep_sync::{
    Credential, HttpRemote, LocalStateStore, Reconciler, ReconcilerOptions, RemoteError, Session,
    Synced,
};

fn signed_in(api: &MockAccountApi, options: ReconcilerOptions) -> Reconciler<HttpRemote> {
    let remote = HttpRemote::with_base_url(api.url(), Duration::from_secs(5)).unwrap();
    Reconciler::new(
        Session::authenticated(Credential::new(VALID_TOKEN)),
        remote,
        LocalStateStore::in_memory(),
        options,
    )
}

#[tokio::test]
async fn test_outage_degrades_to_local_and_flags_divergence() {
    let api = MockAccountApi::spawn().await.unwrap();
    let rec = signed_in(&api, ReconcilerOptions::default());
    api.set_failure(Failure::Unavailable);

    let result = rec
        .mutate_cart(CartOp::Add(CartLine::new("p1", "M", 1)))
        .await;

    assert!(result.is_degraded());
    assert!(matches!(
        result.cause(),
        Some(RemoteError::Server { status: 503, .. })
    ));
    assert_eq!(result.value(), &vec![CartLine::new("p1", "M", 1)]);
    assert_eq!(rec.local().cart().get(), vec![CartLine::new("p1", "M", 1)]);
    assert!(rec.sync_status(Resource::Cart).is_diverged());
    assert!(api.cart().is_empty());
}

#[tokio::test]
async fn test_recovery_clears_divergence() {
    let api = MockAccountApi::spawn().await.unwrap();
    let rec = signed_in(&api, ReconcilerOptions::default());

    api.set_failure(Failure::Unavailable);
    let degraded = rec
        .mutate_wishlist(WishlistOp::Toggle(ItemId::new("p1")))
        .await;
    assert!(degraded.is_degraded());
    assert!(rec.sync_status(Resource::Wishlist).is_diverged());

    api.set_failure(Failure::None);
    let recovered = rec
        .mutate_wishlist(WishlistOp::Toggle(ItemId::new("p2")))
        .await;

    assert!(matches!(recovered, Synced::Remote(_)));
    assert_eq!(rec.sync_status(Resource::Wishlist), SyncStatus::InSync);
    assert!(api.wishlist().contains(&ItemId::new("p2")));
}

#[tokio::test]
async fn test_rejection_is_surfaced_not_swallowed() {
    let api = MockAccountApi::spawn().await.unwrap();
    let rec = signed_in(&api, ReconcilerOptions::default());
    api.set_failure(Failure::RejectAll);

    let result = rec
        .mutate_cart(CartOp::Update {
            key: LineKey::new("p1", ""),
            quantity: 3,
        })
        .await;

    assert!(matches!(
        result.cause(),
        Some(RemoteError::Rejected { status: 200, .. })
    ));
}

#[tokio::test]
async fn test_read_falls_back_to_device_copy() {
    let api = MockAccountApi::spawn().await.unwrap();
    let rec = signed_in(&api, ReconcilerOptions::default());
    rec.local().cart().set(&[CartLine::new("p9", "", 2)]);
    api.set_failure(Failure::Unavailable);

    let result = rec.read_cart().await;

    assert!(result.is_degraded());
    assert_eq!(result.into_value(), vec![CartLine::new("p9", "", 2)]);
}

#[tokio::test]
async fn test_slow_account_call_times_out() {
    let api = MockAccountApi::spawn().await.unwrap();
    let options = ReconcilerOptions {
        remote_timeout: Duration::from_millis(100),
        ..ReconcilerOptions::default()
    };
    let rec = signed_in(&api, options);
    api.set_failure(Failure::Stall(Duration::from_secs(2)));

    let result = rec.read_wishlist().await;

    assert!(matches!(result.cause(), Some(RemoteError::Timeout(_))));
    assert!(rec.sync_status(Resource::Wishlist).is_diverged());
}
