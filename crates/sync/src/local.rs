//! Local state store for guest carts and wishlists.
//!
//! Every operation is total: unreadable or malformed stored values are
//! treated as empty and write failures are logged, never returned. The local
//! store is authoritative only while the session is a guest session; once
//! signed in it is only used as a fallback when the account API fails.
//!
//! Besides the guest resources the store keeps entries that failed to merge
//! on login (`pending_*`), which survive logout so the next login retries
//! them, and the last known [`SyncStatus`] of each resource.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use shopkeep_core::cart::{self, CartLine, LineKey};
use shopkeep_core::{ItemId, Resource, SyncStatus, Wishlist};

use crate::storage::{FileStore, KeyValueStore, MemoryStore};

/// Storage key for guest cart lines.
pub const CART_KEY: &str = "shopkeep.cart";
/// Storage key for guest wishlist ids.
pub const WISHLIST_KEY: &str = "shopkeep.wishlist";
/// Storage key for cart lines awaiting a merge retry.
pub const PENDING_CART_KEY: &str = "shopkeep.pending.cart";
/// Storage key for wishlist ids awaiting a merge retry.
pub const PENDING_WISHLIST_KEY: &str = "shopkeep.pending.wishlist";
/// Storage key for the cart's last known sync status.
pub const CART_SYNC_KEY: &str = "shopkeep.sync.cart";
/// Storage key for the wishlist's last known sync status.
pub const WISHLIST_SYNC_KEY: &str = "shopkeep.sync.wishlist";

/// Guest cart and wishlist over a key-value store.
#[derive(Clone)]
pub struct LocalStateStore {
    store: Arc<dyn KeyValueStore>,
}

impl LocalStateStore {
    /// Wrap an existing storage backend.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Store backed by process memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Store backed by JSON files under `dir`.
    #[must_use]
    pub fn file(dir: &Path) -> Self {
        Self::new(Arc::new(FileStore::new(dir)))
    }

    /// Underlying storage backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    #[must_use]
    pub const fn cart(&self) -> LocalCart<'_> {
        LocalCart {
            store: self,
            key: CART_KEY,
        }
    }

    #[must_use]
    pub const fn wishlist(&self) -> LocalWishlist<'_> {
        LocalWishlist {
            store: self,
            key: WISHLIST_KEY,
        }
    }

    /// Cart lines whose login merge failed and will be retried.
    #[must_use]
    pub const fn pending_cart(&self) -> LocalCart<'_> {
        LocalCart {
            store: self,
            key: PENDING_CART_KEY,
        }
    }

    /// Wishlist ids whose login merge failed and will be retried.
    #[must_use]
    pub const fn pending_wishlist(&self) -> LocalWishlist<'_> {
        LocalWishlist {
            store: self,
            key: PENDING_WISHLIST_KEY,
        }
    }

    /// Last recorded sync status of `resource`.
    #[must_use]
    pub fn sync_status(&self, resource: Resource) -> SyncStatus {
        self.load(sync_key(resource))
    }

    pub fn set_sync_status(&self, resource: Resource, status: &SyncStatus) {
        match status {
            SyncStatus::InSync => self.erase(sync_key(resource)),
            SyncStatus::Diverged { .. } => self.save(sync_key(resource), status),
        }
    }

    fn load<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                warn!(key, error = %e, "Failed to read local state, treating as empty");
                return T::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(key, error = %e, "Malformed local state, treating as empty");
            T::default()
        })
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode local state");
                return;
            }
        };

        if let Err(e) = self.store.set(key, &raw) {
            warn!(key, error = %e, "Failed to write local state");
        }
    }

    fn erase(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            warn!(key, error = %e, "Failed to clear local state");
        }
    }
}

const fn sync_key(resource: Resource) -> &'static str {
    match resource {
        Resource::Cart => CART_SYNC_KEY,
        Resource::Wishlist => WISHLIST_SYNC_KEY,
    }
}

impl std::fmt::Debug for LocalStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStateStore").finish_non_exhaustive()
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Cart lines stored under one key of a [`LocalStateStore`].
#[derive(Debug, Clone, Copy)]
pub struct LocalCart<'a> {
    store: &'a LocalStateStore,
    key: &'static str,
}

impl LocalCart<'_> {
    /// Current lines, in insertion order.
    #[must_use]
    pub fn get(&self) -> Vec<CartLine> {
        cart::normalize(self.store.load(self.key))
    }

    /// Replace all lines.
    pub fn set(&self, lines: &[CartLine]) {
        self.store.save(self.key, &lines);
    }

    /// Add a line, incrementing the quantity of a matching key.
    pub fn add(&self, line: CartLine) -> Vec<CartLine> {
        self.modify(|lines| cart::add_line(lines, line))
    }

    /// Set the quantity of a line; zero or less removes it.
    pub fn update(&self, key: &LineKey, quantity: i64) -> Vec<CartLine> {
        self.modify(|lines| cart::set_quantity(lines, key, quantity))
    }

    /// Remove the line matching `key`, if present.
    pub fn remove(&self, key: &LineKey) -> Vec<CartLine> {
        self.modify(|lines| cart::remove_line(lines, key))
    }

    pub fn clear(&self) {
        self.store.erase(self.key);
    }

    fn modify(&self, f: impl FnOnce(&mut Vec<CartLine>) -> bool) -> Vec<CartLine> {
        let mut lines = self.get();
        if f(&mut lines) {
            self.set(&lines);
        }
        lines
    }
}

// =============================================================================
// Wishlist
// =============================================================================

/// Wishlist ids stored under one key of a [`LocalStateStore`].
#[derive(Debug, Clone, Copy)]
pub struct LocalWishlist<'a> {
    store: &'a LocalStateStore,
    key: &'static str,
}

impl LocalWishlist<'_> {
    #[must_use]
    pub fn get(&self) -> Wishlist {
        self.store.load(self.key)
    }

    pub fn set(&self, wishlist: &Wishlist) {
        self.store.save(self.key, wishlist);
    }

    /// Add-or-remove: adding an existing member removes it.
    pub fn toggle(&self, item: ItemId) -> Wishlist {
        self.modify(|w| {
            w.toggle(item);
            true
        })
    }

    /// Add `item` if absent, leaving existing membership untouched.
    pub fn insert(&self, item: ItemId) -> Wishlist {
        self.modify(|w| w.insert(item))
    }

    pub fn remove(&self, item: &ItemId) -> Wishlist {
        self.modify(|w| w.remove(item))
    }

    #[must_use]
    pub fn contains(&self, item: &ItemId) -> bool {
        self.get().contains(item)
    }

    pub fn clear(&self) {
        self.store.erase(self.key);
    }

    fn modify(&self, f: impl FnOnce(&mut Wishlist) -> bool) -> Wishlist {
        let mut wishlist = self.get();
        if f(&mut wishlist) {
            self.set(&wishlist);
        }
        wishlist
    }
}
