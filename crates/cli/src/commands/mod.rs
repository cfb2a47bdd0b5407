//! Command implementations and the state they share.

pub mod account;
pub mod cart;
pub mod wishlist;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use shopkeep_sync::storage::{KeyValueStore, StorageError};
use shopkeep_sync::{
    CatalogClient, Credential, HttpRemote, LocalStateStore, Reconciler, Session, SyncConfig,
};

/// Storage key of the persisted session token.
pub const SESSION_KEY: &str = "shopkeep.session";

#[derive(Serialize, Deserialize)]
struct StoredSession {
    token: String,
}

/// Everything a command needs, built once per invocation.
pub struct Context {
    pub reconciler: Reconciler<HttpRemote>,
    pub catalog: CatalogClient,
}

impl Context {
    /// Build clients from configuration and restore the saved session.
    ///
    /// # Errors
    ///
    /// Returns an error if either HTTP client cannot be built.
    pub fn load(config: SyncConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let local = LocalStateStore::file(&config.state_dir);
        let session = restore_session(local.backend().as_ref());

        let remote = HttpRemote::new(&config)?;
        let catalog = CatalogClient::new(&config)?;
        let reconciler = Reconciler::new(session, remote, local, config.reconciler_options());

        Ok(Self {
            reconciler,
            catalog,
        })
    }

    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        self.reconciler.local().backend()
    }
}

/// Load the saved session; a missing or unreadable one is a guest session.
pub fn restore_session(store: &dyn KeyValueStore) -> Session {
    let raw = match store.get(SESSION_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Session::guest(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read saved session");
            return Session::guest();
        }
    };

    match serde_json::from_str::<StoredSession>(&raw) {
        Ok(stored) => Session::authenticated(Credential::new(stored.token)),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed saved session");
            Session::guest()
        }
    }
}

/// Persist `credential` so later invocations start authenticated.
///
/// # Errors
///
/// Returns `StorageError` if the session cannot be written.
pub fn save_session(store: &dyn KeyValueStore, credential: &Credential) -> Result<(), StorageError> {
    let stored = StoredSession {
        token: credential.expose().to_owned(),
    };
    // Serializing a single string field cannot fail.
    let json = serde_json::to_string(&stored).unwrap_or_default();
    store.set(SESSION_KEY, &json)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use shopkeep_core::{CartLine, Resource};
    use shopkeep_sync::MergePolicy;
    use shopkeep_sync::reconciler::CartOp;
    use shopkeep_sync::storage::MemoryStore;
    use url::Url;

    use super::*;

    /// Points at a closed local port so every account call fails fast.
    fn unreachable_config(state_dir: &Path) -> SyncConfig {
        let url = Url::parse("http://127.0.0.1:9/").unwrap_or_else(|e| panic!("{e}"));
        SyncConfig {
            api_url: url.clone(),
            catalog_url: url,
            state_dir: state_dir.to_path_buf(),
            request_timeout: Duration::from_secs(2),
            catalog_cache_ttl: Duration::from_secs(60),
            merge_policy: MergePolicy::ClearAlways,
            sentry_dsn: None,
        }
    }

    #[tokio::test]
    async fn test_divergence_is_visible_to_a_later_invocation() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let store = LocalStateStore::file(dir.path());
        save_session(store.backend().as_ref(), &Credential::new("tok"))
            .unwrap_or_else(|e| panic!("{e}"));

        let first = Context::load(unreachable_config(dir.path())).unwrap_or_else(|e| panic!("{e}"));
        let result = first
            .reconciler
            .mutate_cart(CartOp::Add(CartLine::new("p1", "", 1)))
            .await;
        assert!(result.is_degraded());
        drop(first);

        let second = Context::load(unreachable_config(dir.path())).unwrap_or_else(|e| panic!("{e}"));

        assert!(second.reconciler.sync_status(Resource::Cart).is_diverged());
        assert!(!second.reconciler.sync_status(Resource::Wishlist).is_diverged());
    }

    #[test]
    fn test_session_round_trips_through_storage() {
        let store = MemoryStore::new();
        assert!(!restore_session(&store).is_authenticated());

        save_session(&store, &Credential::new("tok-123")).unwrap_or_else(|e| panic!("{e}"));

        let session = restore_session(&store);
        assert!(session.is_authenticated());
        assert_eq!(
            session.credential().map(|c| c.expose().to_owned()).as_deref(),
            Some("tok-123")
        );
    }

    #[test]
    fn test_malformed_session_is_guest() {
        let store = MemoryStore::new();
        store
            .set(SESSION_KEY, "not json")
            .unwrap_or_else(|e| panic!("{e}"));

        assert!(!restore_session(&store).is_authenticated());
    }
}
