//! Derived display state: cart badge, wishlist icons and resolved line items.
//!
//! Nothing here owns data. Every view is recomputed from the current cart or
//! wishlist after each mutation and on initial load.

use rust_decimal::Decimal;
use tracing::warn;

use shopkeep_core::cart::total_quantity;
use shopkeep_core::{CartLine, CurrencyCode, ItemId, Price, Variant, Wishlist};

use crate::catalog::Catalog;

/// Cart count badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartBadge {
    pub count: u32,
}

impl CartBadge {
    #[must_use]
    pub fn from_lines(lines: &[CartLine]) -> Self {
        Self {
            count: total_quantity(lines),
        }
    }

    /// Badge label; `None` hides the badge.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        match self.count {
            0 => None,
            1..=99 => Some(self.count.to_string()),
            _ => Some("99+".to_string()),
        }
    }
}

/// Heart-icon state for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WishlistIcon {
    pub item_id: ItemId,
    pub filled: bool,
}

/// Icon state for each of `items` given the current wishlist.
pub fn wishlist_icons<'a>(
    wishlist: &Wishlist,
    items: impl IntoIterator<Item = &'a ItemId>,
) -> Vec<WishlistIcon> {
    items
        .into_iter()
        .map(|item| WishlistIcon {
            item_id: item.clone(),
            filled: wishlist.contains(item),
        })
        .collect()
}

/// Cart line display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItemView {
    pub item_id: ItemId,
    pub variant: Variant,
    pub title: String,
    pub quantity: u32,
    /// `None` when the catalog could not price the item.
    pub price: Option<String>,
    pub line_price: Option<String>,
    pub image_url: Option<String>,
}

/// Cart display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            subtotal: Price::new(Decimal::ZERO, CurrencyCode::default()).display(),
            item_count: 0,
        }
    }
}

/// Resolve cart lines against the catalog.
///
/// Unknown or unreachable products still produce a line titled with the
/// item id; they contribute nothing to the subtotal.
pub async fn resolve_cart<C: Catalog>(catalog: &C, lines: &[CartLine]) -> CartView {
    if lines.is_empty() {
        return CartView::empty();
    }

    let mut items = Vec::with_capacity(lines.len());
    let mut subtotal: Option<Price> = None;

    for line in lines {
        let product = match catalog.product(&line.item_id).await {
            Ok(product) => product,
            Err(e) => {
                warn!(item_id = %line.item_id, error = %e, "Failed to resolve cart line");
                None
            }
        };

        let unit = product.as_ref().map(|p| p.unit_price(&line.variant));
        let total = unit.and_then(|u| {
            let total = u.times(line.quantity);
            if total.is_none() {
                warn!(item_id = %line.item_id, quantity = line.quantity, "Line price overflowed");
            }
            total
        });
        if let Some(total) = total {
            subtotal = match subtotal {
                None => Some(total),
                Some(acc) => match acc.checked_add(&total) {
                    Some(sum) => Some(sum),
                    None => {
                        warn!(
                            item_id = %line.item_id,
                            currency = ?total.currency_code,
                            subtotal_currency = ?acc.currency_code,
                            "Line left out of subtotal"
                        );
                        Some(acc)
                    }
                },
            };
        }

        items.push(CartItemView {
            item_id: line.item_id.clone(),
            variant: line.variant.clone(),
            title: product
                .as_ref()
                .map_or_else(|| line.item_id.to_string(), |p| p.name.clone()),
            quantity: line.quantity,
            price: unit.map(|u| u.display()),
            line_price: total.map(|t| t.display()),
            image_url: product.and_then(|p| p.image).map(|img| img.url),
        });
    }

    CartView {
        items,
        subtotal: subtotal
            .unwrap_or_else(|| Price::new(Decimal::ZERO, CurrencyCode::default()))
            .display(),
        item_count: total_quantity(lines),
    }
}

/// Wishlist entry display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WishlistItemView {
    pub item_id: ItemId,
    pub title: String,
    pub price: Option<String>,
    pub image_url: Option<String>,
}

/// Resolve wishlist entries against the catalog, skipping delisted items.
pub async fn resolve_wishlist<C: Catalog>(catalog: &C, wishlist: &Wishlist) -> Vec<WishlistItemView> {
    let mut items = Vec::with_capacity(wishlist.len());
    for item_id in wishlist {
        match catalog.product(item_id).await {
            Ok(Some(product)) => items.push(WishlistItemView {
                item_id: item_id.clone(),
                title: product.name,
                price: Some(product.price.display()),
                image_url: product.image.map(|img| img.url),
            }),
            Ok(None) => {}
            Err(e) => {
                warn!(item_id = %item_id, error = %e, "Failed to resolve wishlist item");
                items.push(WishlistItemView {
                    item_id: item_id.clone(),
                    title: item_id.to_string(),
                    price: None,
                    image_url: None,
                });
            }
        }
    }
    items
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::HashMap;

    use shopkeep_core::{Product, ProductImage, ProductVariant};

    use super::*;
    use crate::catalog::CatalogError;

    struct FakeCatalog {
        products: HashMap<ItemId, Product>,
        broken: Option<ItemId>,
    }

    impl Catalog for FakeCatalog {
        async fn product(&self, id: &ItemId) -> Result<Option<Product>, CatalogError> {
            if self.broken.as_ref() == Some(id) {
                return Err(CatalogError::Status(500));
            }
            Ok(self.products.get(id).cloned())
        }
    }

    fn catalog() -> FakeCatalog {
        let shirt = Product {
            id: ItemId::new("p1"),
            name: "Linen Shirt".to_string(),
            price: Price::new(Decimal::new(4000, 2), CurrencyCode::USD),
            image: Some(ProductImage {
                url: "https://cdn.example.com/p1.jpg".to_string(),
                alt_text: None,
            }),
            variants: vec![ProductVariant {
                name: Variant::new("XL"),
                price: Some(Price::new(Decimal::new(4500, 2), CurrencyCode::USD)),
                in_stock: true,
            }],
        };
        let mug = Product {
            id: ItemId::new("p2"),
            name: "Mug".to_string(),
            price: Price::new(Decimal::new(1250, 2), CurrencyCode::USD),
            image: None,
            variants: vec![],
        };
        FakeCatalog {
            products: [(shirt.id.clone(), shirt), (mug.id.clone(), mug)]
                .into_iter()
                .collect(),
            broken: None,
        }
    }

    #[test]
    fn test_badge_counts_quantities() {
        let lines = vec![CartLine::new("p1", "M", 2), CartLine::new("p2", "", 3)];
        let badge = CartBadge::from_lines(&lines);
        assert_eq!(badge.count, 5);
        assert_eq!(badge.label().as_deref(), Some("5"));
    }

    #[test]
    fn test_badge_hidden_when_empty_and_capped() {
        assert_eq!(CartBadge::from_lines(&[]).label(), None);
        assert_eq!(
            CartBadge { count: 150 }.label().as_deref(),
            Some("99+")
        );
    }

    #[test]
    fn test_wishlist_icons() {
        let wishlist: Wishlist = [ItemId::new("p1")].into_iter().collect();
        let shown = [ItemId::new("p1"), ItemId::new("p2")];

        let icons = wishlist_icons(&wishlist, &shown);

        assert!(icons[0].filled);
        assert!(!icons[1].filled);
    }

    #[tokio::test]
    async fn test_resolve_cart_prices_lines() {
        let lines = vec![CartLine::new("p1", "XL", 2), CartLine::new("p2", "", 1)];

        let view = resolve_cart(&catalog(), &lines).await;

        assert_eq!(view.item_count, 3);
        assert_eq!(view.items[0].title, "Linen Shirt");
        assert_eq!(view.items[0].price.as_deref(), Some("$45.00"));
        assert_eq!(view.items[0].line_price.as_deref(), Some("$90.00"));
        assert_eq!(
            view.items[0].image_url.as_deref(),
            Some("https://cdn.example.com/p1.jpg")
        );
        assert_eq!(view.subtotal, "$102.50");
    }

    #[tokio::test]
    async fn test_resolve_cart_tolerates_unknown_and_failing_items() {
        let mut catalog = catalog();
        catalog.broken = Some(ItemId::new("p2"));
        let lines = vec![
            CartLine::new("gone", "M", 1),
            CartLine::new("p2", "", 1),
            CartLine::new("p1", "M", 1),
        ];

        let view = resolve_cart(&catalog, &lines).await;

        assert_eq!(view.items.len(), 3);
        assert_eq!(view.items[0].title, "gone");
        assert!(view.items[1].price.is_none());
        assert_eq!(view.subtotal, "$40.00");
    }

    #[tokio::test]
    async fn test_resolve_empty_cart() {
        assert_eq!(resolve_cart(&catalog(), &[]).await, CartView::empty());
        assert_eq!(CartView::empty().subtotal, "$0.00");
    }

    #[tokio::test]
    async fn test_resolve_cart_survives_price_overflow() {
        let mut catalog = catalog();
        let huge = Product {
            id: ItemId::new("p9"),
            name: "Heirloom".to_string(),
            price: Price::new(Decimal::MAX, CurrencyCode::USD),
            image: None,
            variants: vec![],
        };
        catalog.products.insert(huge.id.clone(), huge);
        let lines = vec![CartLine::new("p9", "M", 2), CartLine::new("p2", "", 1)];

        let view = resolve_cart(&catalog, &lines).await;

        assert_eq!(view.items[0].title, "Heirloom");
        assert!(view.items[0].line_price.is_none());
        assert_eq!(view.subtotal, "$12.50");
    }

    #[tokio::test]
    async fn test_subtotal_skips_lines_in_another_currency() {
        let mut catalog = catalog();
        let scarf = Product {
            id: ItemId::new("p3"),
            name: "Scarf".to_string(),
            price: Price::new(Decimal::new(2000, 2), CurrencyCode::EUR),
            image: None,
            variants: vec![],
        };
        catalog.products.insert(scarf.id.clone(), scarf);
        let lines = vec![CartLine::new("p2", "", 2), CartLine::new("p3", "", 1)];

        let view = resolve_cart(&catalog, &lines).await;

        assert_eq!(view.items[1].line_price.as_deref(), Some("€20.00"));
        assert_eq!(view.subtotal, "$25.00");
    }

    #[tokio::test]
    async fn test_resolve_wishlist_skips_delisted() {
        let wishlist: Wishlist = ["p1", "gone", "p2"].into_iter().map(ItemId::new).collect();

        let items = resolve_wishlist(&catalog(), &wishlist).await;

        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Linen Shirt", "Mug"]);
    }
}
