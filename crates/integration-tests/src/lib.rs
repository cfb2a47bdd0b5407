//! Integration tests for Shopkeep.
//!
//! The tests in `tests/` drive the real [`shopkeep_sync::HttpRemote`] and
//! [`shopkeep_sync::CatalogClient`] against [`MockAccountApi`], an in-process
//! axum server bound to an ephemeral port.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopkeep-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use url::Url;

use shopkeep_core::cart::{add_line, remove_line, set_quantity};
use shopkeep_core::{CartLine, ItemId, LineKey, Product, Variant, Wishlist};

/// Token the mock accepts as `Authorization: Bearer <token>`.
pub const VALID_TOKEN: &str = "test-token";

/// Injected misbehavior of the account endpoints. Catalog routes never fail.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Failure {
    #[default]
    None,
    /// Respond 503 to every call.
    Unavailable,
    /// Respond 200 with `success: false` to every call.
    RejectAll,
    /// Reject wishlist adds of one item with `success: false`.
    RejectWishlistItem(ItemId),
    /// Sleep before answering.
    Stall(Duration),
}

#[derive(Default)]
struct MockState {
    cart: Mutex<Vec<CartLine>>,
    wishlist: Mutex<Wishlist>,
    products: Mutex<HashMap<ItemId, Product>>,
    failure: Mutex<Failure>,
    calls: Mutex<Vec<String>>,
}

impl MockState {
    fn record(&self, call: &str) {
        lock(&self.calls).push(call.to_owned());
    }

    /// Auth, call log and failure injection shared by account routes.
    async fn admit(&self, headers: &HeaderMap, call: &str) -> Result<(), Response> {
        self.record(call);

        let authorized = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            == Some(VALID_TOKEN);
        if !authorized {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "message": "unauthorized" })),
            )
                .into_response());
        }

        let failure = lock(&self.failure).clone();
        match failure {
            Failure::Unavailable => {
                Err((StatusCode::SERVICE_UNAVAILABLE, "down for maintenance").into_response())
            }
            Failure::RejectAll => Err(rejected("request refused")),
            Failure::Stall(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            Failure::None | Failure::RejectWishlistItem(_) => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn rejected(message: &str) -> Response {
    Json(json!({ "success": false, "message": message })).into_response()
}

fn cart_ok(lines: &[CartLine]) -> Response {
    Json(json!({ "success": true, "items": lines })).into_response()
}

fn wishlist_ok(wishlist: &Wishlist) -> Response {
    Json(json!({ "success": true, "items": wishlist })).into_response()
}

/// In-process account API and catalog.
pub struct MockAccountApi {
    state: Arc<MockState>,
    addr: SocketAddr,
    server: JoinHandle<()>,
}

impl MockAccountApi {
    /// Bind to an ephemeral localhost port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the listener cannot be bound.
    pub async fn spawn() -> std::io::Result<Self> {
        let state = Arc::new(MockState::default());
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let app = router(Arc::clone(&state));
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            state,
            addr,
            server,
        })
    }

    /// Base URL of the server, with a trailing slash.
    ///
    /// # Panics
    ///
    /// Never in practice; a socket address always forms a valid URL.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).expect("socket address is a valid URL")
    }

    #[must_use]
    pub fn cart(&self) -> Vec<CartLine> {
        lock(&self.state.cart).clone()
    }

    pub fn set_cart(&self, lines: Vec<CartLine>) {
        *lock(&self.state.cart) = lines;
    }

    #[must_use]
    pub fn wishlist(&self) -> Wishlist {
        lock(&self.state.wishlist).clone()
    }

    pub fn set_wishlist(&self, wishlist: Wishlist) {
        *lock(&self.state.wishlist) = wishlist;
    }

    pub fn insert_product(&self, product: Product) {
        lock(&self.state.products).insert(product.id.clone(), product);
    }

    pub fn set_failure(&self, failure: Failure) {
        *lock(&self.state.failure) = failure;
    }

    /// Every call received so far, as `"METHOD /path"`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        lock(&self.state.calls).clone()
    }

    /// Number of calls received for `call`.
    #[must_use]
    pub fn count(&self, call: &str) -> usize {
        lock(&self.state.calls).iter().filter(|c| *c == call).count()
    }
}

impl Drop for MockAccountApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/api/cart", get(get_cart))
        .route("/api/cart/add", post(add_to_cart))
        .route("/api/cart/update", put(update_cart))
        .route("/api/cart/remove", post(remove_from_cart))
        .route("/api/cart/merge", post(merge_cart))
        .route("/api/wishlist", get(get_wishlist))
        .route("/api/wishlist/add", post(add_to_wishlist))
        .route("/api/wishlist/remove", post(remove_from_wishlist))
        .route("/api/products/{id}", get(get_product))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBody {
    item_id: ItemId,
    variant: Variant,
    quantity: i64,
}

#[derive(Deserialize)]
struct MergeBody {
    items: Vec<CartLine>,
}

async fn get_cart(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(response) = state.admit(&headers, "GET /api/cart").await {
        return response;
    }
    cart_ok(&lock(&state.cart))
}

async fn add_to_cart(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(line): Json<CartLine>,
) -> Response {
    if let Err(response) = state.admit(&headers, "POST /api/cart/add").await {
        return response;
    }
    if line.quantity == 0 {
        return rejected("quantity must be positive");
    }
    let mut cart = lock(&state.cart);
    add_line(&mut cart, line);
    cart_ok(&cart)
}

async fn update_cart(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<UpdateBody>,
) -> Response {
    if let Err(response) = state.admit(&headers, "PUT /api/cart/update").await {
        return response;
    }
    let mut cart = lock(&state.cart);
    let key = LineKey::new(body.item_id, body.variant);
    set_quantity(&mut cart, &key, body.quantity);
    cart_ok(&cart)
}

async fn remove_from_cart(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(key): Json<LineKey>,
) -> Response {
    if let Err(response) = state.admit(&headers, "POST /api/cart/remove").await {
        return response;
    }
    let mut cart = lock(&state.cart);
    remove_line(&mut cart, &key);
    cart_ok(&cart)
}

async fn merge_cart(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<MergeBody>,
) -> Response {
    if let Err(response) = state.admit(&headers, "POST /api/cart/merge").await {
        return response;
    }
    let mut cart = lock(&state.cart);
    for line in body.items {
        add_line(&mut cart, line);
    }
    cart_ok(&cart)
}

// =============================================================================
// Wishlist
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WishlistBody {
    item_id: ItemId,
}

async fn get_wishlist(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(response) = state.admit(&headers, "GET /api/wishlist").await {
        return response;
    }
    wishlist_ok(&lock(&state.wishlist))
}

async fn add_to_wishlist(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<WishlistBody>,
) -> Response {
    if let Err(response) = state.admit(&headers, "POST /api/wishlist/add").await {
        return response;
    }
    if *lock(&state.failure) == Failure::RejectWishlistItem(body.item_id.clone()) {
        return rejected("item unavailable");
    }
    let mut wishlist = lock(&state.wishlist);
    wishlist.insert(body.item_id);
    wishlist_ok(&wishlist)
}

async fn remove_from_wishlist(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<WishlistBody>,
) -> Response {
    if let Err(response) = state.admit(&headers, "POST /api/wishlist/remove").await {
        return response;
    }
    let mut wishlist = lock(&state.wishlist);
    wishlist.remove(&body.item_id);
    wishlist_ok(&wishlist)
}

// =============================================================================
// Catalog
// =============================================================================

async fn get_product(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    state.record(&format!("GET /api/products/{id}"));
    match lock(&state.products).get(&ItemId::new(id)) {
        Some(product) => Json(product).into_response(),
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}
