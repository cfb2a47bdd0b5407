//! Wishlist membership set.

use serde::{Deserialize, Serialize};

use super::id::ItemId;

/// A set of wishlisted item ids.
///
/// Stored as an ordered list (first-added first) so the persisted form is a
/// plain JSON array; membership is unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ItemId>", into = "Vec<ItemId>")]
pub struct Wishlist(Vec<ItemId>);

impl Wishlist {
    /// Create an empty wishlist.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Whether `item` is a member.
    #[must_use]
    pub fn contains(&self, item: &ItemId) -> bool {
        self.0.contains(item)
    }

    /// Toggle membership of `item`.
    ///
    /// Adds it when absent and removes it when present. Returns `true` if the
    /// item is a member afterwards.
    pub fn toggle(&mut self, item: ItemId) -> bool {
        if self.remove(&item) {
            false
        } else {
            self.0.push(item);
            true
        }
    }

    /// Add `item` if absent. Returns `true` if it was inserted.
    pub fn insert(&mut self, item: ItemId) -> bool {
        if self.contains(&item) {
            return false;
        }
        self.0.push(item);
        true
    }

    /// Remove `item` if present. Returns `true` if it was removed.
    pub fn remove(&mut self, item: &ItemId) -> bool {
        let before = self.0.len();
        self.0.retain(|i| i != item);
        self.0.len() != before
    }

    /// Members not present in `other`, in this wishlist's order.
    #[must_use]
    pub fn missing_from(&self, other: &Self) -> Vec<ItemId> {
        self.0
            .iter()
            .filter(|item| !other.contains(item))
            .cloned()
            .collect()
    }

    /// Iterate over members.
    pub fn iter(&self) -> std::slice::Iter<'_, ItemId> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the wishlist and return its members.
    #[must_use]
    pub fn into_inner(self) -> Vec<ItemId> {
        self.0
    }
}

impl FromIterator<ItemId> for Wishlist {
    /// Duplicates are dropped, keeping first-seen order.
    fn from_iter<I: IntoIterator<Item = ItemId>>(iter: I) -> Self {
        let mut wishlist = Self::new();
        for item in iter {
            wishlist.insert(item);
        }
        wishlist
    }
}

impl From<Vec<ItemId>> for Wishlist {
    fn from(items: Vec<ItemId>) -> Self {
        items.into_iter().collect()
    }
}

impl From<Wishlist> for Vec<ItemId> {
    fn from(wishlist: Wishlist) -> Self {
        wishlist.0
    }
}

impl<'a> IntoIterator for &'a Wishlist {
    type Item = &'a ItemId;
    type IntoIter = std::slice::Iter<'a, ItemId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wishlist(ids: &[&str]) -> Wishlist {
        ids.iter().map(|id| ItemId::new(*id)).collect()
    }

    #[test]
    fn test_toggle_twice_restores_membership() {
        let original = wishlist(&["p1", "p2"]);

        for id in ["p1", "p3"] {
            let mut w = original.clone();
            w.toggle(ItemId::new(id));
            w.toggle(ItemId::new(id));
            assert_eq!(
                w.iter().collect::<std::collections::BTreeSet<_>>(),
                original.iter().collect::<std::collections::BTreeSet<_>>()
            );
        }
    }

    #[test]
    fn test_toggle_reports_membership() {
        let mut w = Wishlist::new();
        assert!(w.toggle(ItemId::new("p1")));
        assert!(!w.toggle(ItemId::new("p1")));
        assert!(w.is_empty());
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut w = Wishlist::new();
        assert!(w.insert(ItemId::new("p1")));
        assert!(!w.insert(ItemId::new("p1")));
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut w = wishlist(&["p1"]);
        assert!(!w.remove(&ItemId::new("p2")));
        assert_eq!(w, wishlist(&["p1"]));
    }

    #[test]
    fn test_missing_from() {
        let local = wishlist(&["p1", "p2"]);
        let remote = wishlist(&["p2", "p3"]);
        assert_eq!(local.missing_from(&remote), vec![ItemId::new("p1")]);
    }

    #[test]
    fn test_from_iter_dedups() {
        let w = wishlist(&["p1", "p2", "p1"]);
        assert_eq!(w.into_inner(), vec![ItemId::new("p1"), ItemId::new("p2")]);
    }

    #[test]
    fn test_serializes_as_array() {
        let json = serde_json::to_string(&wishlist(&["p1", "p2"])).unwrap_or_default();
        assert_eq!(json, r#"["p1","p2"]"#);
    }

    #[test]
    fn test_deserialize_drops_duplicates() {
        let w: Wishlist =
            serde_json::from_str(r#"["p1","p2","p1"]"#).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(w.len(), 2);
        assert_eq!(w, wishlist(&["p1", "p2"]));
    }
}
