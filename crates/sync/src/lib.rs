//! Shopkeep Sync - guest and account cart/wishlist reconciliation.
//!
//! # Architecture
//!
//! - [`local`] holds guest state in a pluggable [`storage::KeyValueStore`]
//! - [`remote`] is the account-scoped cart/wishlist API (`HttpRemote` over `reqwest`)
//! - [`reconciler::Reconciler`] routes every read and mutation to one of the two,
//!   degrades to local state when the account API fails, and merges guest state
//!   into the account exactly once per login
//! - [`catalog`] resolves display data for items (cached with `moka`)
//! - [`view`] derives badge counts and wishlist icon state from current data
//!
//! # Example
//!
//! ```rust,ignore
//! use shopkeep_sync::{HttpRemote, LocalStateStore, Reconciler, Session, SyncConfig};
//! use shopkeep_sync::reconciler::CartOp;
//!
//! let config = SyncConfig::from_env()?;
//! let remote = HttpRemote::new(&config)?;
//! let local = LocalStateStore::file(&config.state_dir);
//! let reconciler = Reconciler::new(Session::guest(), remote, local, config.reconciler_options());
//!
//! reconciler.mutate_cart(CartOp::Add(CartLine::new("p1", "M", 2))).await;
//! let report = reconciler.login(Credential::new(token)).await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod local;
pub mod reconciler;
pub mod remote;
pub mod session;
pub mod storage;
pub mod view;

pub use catalog::{Catalog, CatalogClient, CatalogError};
pub use config::{ConfigError, SyncConfig};
pub use local::LocalStateStore;
pub use reconciler::{MergePolicy, MergeReport, Reconciler, ReconcilerOptions, Synced};
pub use remote::{HttpRemote, RemoteError, RemoteStore};
pub use session::{Credential, Session};
