//! Cart lines and the rules for combining them.
//!
//! A cart is an ordered list of [`CartLine`]s with at most one line per
//! [`LineKey`]. The helpers in this module are the only place that mutates a
//! line list, so guest carts and fallback writes behave identically.

use serde::{Deserialize, Serialize};

use super::id::{ItemId, Variant};

/// Uniqueness key of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineKey {
    pub item_id: ItemId,
    pub variant: Variant,
}

impl LineKey {
    /// Create a new line key.
    #[must_use]
    pub fn new(item_id: impl Into<ItemId>, variant: impl Into<Variant>) -> Self {
        Self {
            item_id: item_id.into(),
            variant: variant.into(),
        }
    }
}

impl std::fmt::Display for LineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.item_id, self.variant)
    }
}

/// A single cart line.
///
/// `quantity` is always greater than zero for lines held in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub item_id: ItemId,
    pub variant: Variant,
    pub quantity: u32,
}

impl CartLine {
    /// Create a new cart line.
    #[must_use]
    pub fn new(item_id: impl Into<ItemId>, variant: impl Into<Variant>, quantity: u32) -> Self {
        Self {
            item_id: item_id.into(),
            variant: variant.into(),
            quantity,
        }
    }

    /// The key this line is deduplicated on.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            item_id: self.item_id.clone(),
            variant: self.variant.clone(),
        }
    }

    /// Whether this line matches `key`.
    #[must_use]
    pub fn matches(&self, key: &LineKey) -> bool {
        self.item_id == key.item_id && self.variant == key.variant
    }
}

/// Add `line` to `lines`.
///
/// Increments the quantity of an existing line with the same key, otherwise
/// appends. Lines with a zero quantity are ignored. Returns `true` if the
/// list changed.
pub fn add_line(lines: &mut Vec<CartLine>, line: CartLine) -> bool {
    if line.quantity == 0 {
        return false;
    }

    let key = line.key();
    if let Some(existing) = lines.iter_mut().find(|l| l.matches(&key)) {
        existing.quantity = existing.quantity.saturating_add(line.quantity);
    } else {
        lines.push(line);
    }
    true
}

/// Set the quantity of the line matching `key`.
///
/// A quantity of zero or less removes the line. Setting the quantity of a
/// missing line is a no-op. Returns `true` if the list changed.
pub fn set_quantity(lines: &mut Vec<CartLine>, key: &LineKey, quantity: i64) -> bool {
    if quantity <= 0 {
        return remove_line(lines, key);
    }

    let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
    match lines.iter_mut().find(|l| l.matches(key)) {
        Some(line) if line.quantity != quantity => {
            line.quantity = quantity;
            true
        }
        _ => false,
    }
}

/// Remove the line matching `key`, if present. Returns `true` if removed.
pub fn remove_line(lines: &mut Vec<CartLine>, key: &LineKey) -> bool {
    let before = lines.len();
    lines.retain(|l| !l.matches(key));
    lines.len() != before
}

/// Collapse duplicate keys and drop zero-quantity lines, keeping first-seen order.
///
/// Used when loading persisted state that may have been written by an older
/// or foreign writer.
#[must_use]
pub fn normalize(lines: Vec<CartLine>) -> Vec<CartLine> {
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        add_line(&mut out, line);
    }
    out
}

/// Sum of quantities across all lines.
#[must_use]
pub fn total_quantity(lines: &[CartLine]) -> u32 {
    lines
        .iter()
        .fold(0u32, |acc, l| acc.saturating_add(l.quantity))
}
