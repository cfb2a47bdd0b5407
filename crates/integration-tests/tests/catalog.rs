//! Integration tests for catalog lookups and cart/wishlist rendering.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use rust_decimal::Decimal;

use shopkeep_core::{CartLine, CurrencyCode, ItemId, Price, Product, ProductVariant, Variant};
use shopkeep_integration_tests::MockAccountApi;
use shopkeep_sync::view::{resolve_cart, resolve_wishlist};
use shopkeep_sync::{Catalog, CatalogClient};

fn scarf() -> Product {
    Product {
        id: ItemId::new("p1"),
        name: "Wool Scarf".to_string(),
        price: Price::new(Decimal::new(2500, 2), CurrencyCode::USD),
        image: None,
        variants: vec![ProductVariant {
            name: Variant::new("Long"),
            price: Some(Price::new(Decimal::new(3000, 2), CurrencyCode::USD)),
            in_stock: true,
        }],
    }
}

async fn setup() -> (MockAccountApi, CatalogClient) {
    let api = MockAccountApi::spawn().await.unwrap();
    api.insert_product(scarf());
    let catalog =
        CatalogClient::with_base_url(api.url(), Duration::from_secs(5), Duration::from_secs(60))
            .unwrap();
    (api, catalog)
}

#[tokio::test]
async fn test_known_product_is_returned() {
    let (_api, catalog) = setup().await;

    let product = catalog.product(&ItemId::new("p1")).await.unwrap();

    assert_eq!(product, Some(scarf()));
}

#[tokio::test]
async fn test_unknown_product_is_none() {
    let (_api, catalog) = setup().await;

    let product = catalog.product(&ItemId::new("nope")).await.unwrap();

    assert!(product.is_none());
}

#[tokio::test]
async fn test_lookups_are_cached() {
    let (api, catalog) = setup().await;

    for _ in 0..3 {
        catalog.product(&ItemId::new("p1")).await.unwrap();
        catalog.product(&ItemId::new("nope")).await.unwrap();
    }

    assert_eq!(api.count("GET /api/products/p1"), 1);
    assert_eq!(api.count("GET /api/products/nope"), 1);
}

#[tokio::test]
async fn test_cart_view_uses_variant_price() {
    let (_api, catalog) = setup().await;
    let lines = vec![CartLine::new("p1", "Long", 2), CartLine::new("gone", "", 1)];

    let view = resolve_cart(&catalog, &lines).await;

    assert_eq!(view.items[0].title, "Wool Scarf");
    assert_eq!(view.items[0].line_price.as_deref(), Some("$60.00"));
    assert_eq!(view.items[1].title, "gone");
    assert_eq!(view.subtotal, "$60.00");
    assert_eq!(view.item_count, 3);
}

#[tokio::test]
async fn test_wishlist_view_skips_delisted_items() {
    let (_api, catalog) = setup().await;
    let wishlist = ["gone", "p1"].into_iter().map(ItemId::new).collect();

    let items = resolve_wishlist(&catalog, &wishlist).await;

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].price.as_deref(), Some("$25.00"));
}
