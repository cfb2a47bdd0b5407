//! Core types for Shopkeep.
//!
//! This module provides type-safe wrappers for cart and wishlist concepts.

pub mod cart;
pub mod id;
pub mod price;
pub mod product;
pub mod status;
pub mod wishlist;

pub use cart::{CartLine, LineKey};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use product::{Product, ProductImage, ProductVariant};
pub use status::*;
pub use wishlist::Wishlist;
