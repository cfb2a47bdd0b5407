//! Shopkeep Core - Shared types library.
//!
//! This crate provides common types used across all Shopkeep components:
//! - `sync` - Local state store, account API client and session reconciler
//! - `cli` - Command-line front end for guest and signed-in carts
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no I/O,
//! no storage, no HTTP clients. The cart and wishlist rules live here so the
//! local store and the reconciler apply exactly the same semantics.
//!
//! # Modules
//!
//! - [`types`] - Item keys, cart lines, wishlists, catalog products, prices and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
