//! Status enums for reconciled resources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reconciled shopper resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Cart,
    Wishlist,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cart => write!(f, "cart"),
            Self::Wishlist => write!(f, "wishlist"),
        }
    }
}

impl std::str::FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cart" => Ok(Self::Cart),
            "wishlist" => Ok(Self::Wishlist),
            _ => Err(format!("invalid resource: {s}")),
        }
    }
}

/// Which copy of a resource is authoritative.
///
/// `Guest` -> `Merging` -> `Authenticated` on login; logout returns to
/// `Guest` with an empty local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
    /// Local state store is authoritative.
    #[default]
    Guest,
    /// One-shot merge of guest state into the account is running.
    Merging,
    /// Remote account store is authoritative.
    Authenticated,
}

impl std::fmt::Display for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Guest => write!(f, "guest"),
            Self::Merging => write!(f, "merging"),
            Self::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Whether local and remote copies may have diverged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SyncStatus {
    /// Last remote call succeeded (or the session is a guest session).
    #[default]
    InSync,
    /// A remote call failed and the operation was applied locally instead.
    Diverged {
        /// When the first unrecovered failure happened.
        since: DateTime<Utc>,
        /// Most recent failure message.
        cause: String,
    },
}

impl SyncStatus {
    #[must_use]
    pub const fn is_diverged(&self) -> bool {
        matches!(self, Self::Diverged { .. })
    }
}
