//! Catalog product data used to render cart and wishlist entries.

use serde::{Deserialize, Serialize};

use super::id::{ItemId, Variant};
use super::price::Price;

/// A catalog product as returned by the catalog service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ItemId,
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub image: Option<ProductImage>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Look up a variant by label.
    #[must_use]
    pub fn variant(&self, variant: &Variant) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| &v.name == variant)
    }

    /// Unit price for `variant`, falling back to the product price when the
    /// variant has no override or is unknown.
    #[must_use]
    pub fn unit_price(&self, variant: &Variant) -> Price {
        self.variant(variant)
            .and_then(|v| v.price)
            .unwrap_or(self.price)
    }
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub name: Variant,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

const fn default_in_stock() -> bool {
    true
}

/// Product image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub url: String,
    #[serde(default)]
    pub alt_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::types::price::CurrencyCode;

    fn product() -> Product {
        Product {
            id: ItemId::new("p1"),
            name: "Linen Shirt".to_string(),
            price: Price::new(Decimal::new(4000, 2), CurrencyCode::USD),
            image: None,
            variants: vec![
                ProductVariant {
                    name: Variant::new("M"),
                    price: None,
                    in_stock: true,
                },
                ProductVariant {
                    name: Variant::new("XL"),
                    price: Some(Price::new(Decimal::new(4500, 2), CurrencyCode::USD)),
                    in_stock: false,
                },
            ],
        }
    }

    #[test]
    fn test_unit_price_variant_override() {
        let p = product();
        assert_eq!(p.unit_price(&Variant::new("XL")).display(), "$45.00");
        assert_eq!(p.unit_price(&Variant::new("M")).display(), "$40.00");
        assert_eq!(p.unit_price(&Variant::new("unknown")).display(), "$40.00");
    }

    #[test]
    fn test_deserialize_minimal_product() {
        let json = r#"{"id":"p2","name":"Mug","price":{"amount":"12.50"}}"#;
        let p: Product = serde_json::from_str(json).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(p.id, ItemId::new("p2"));
        assert!(p.variants.is_empty());
        assert_eq!(p.price.currency_code, CurrencyCode::USD);
    }
}
