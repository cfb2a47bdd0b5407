//! Shopper session: guest or signed in with a bearer credential.
//!
//! The session is an explicit, cloneable handle passed to the reconciler at
//! construction. Clones share state and can observe it, but only
//! [`Reconciler::login`](crate::Reconciler::login) and
//! [`Reconciler::logout`](crate::Reconciler::logout) change it, so every
//! guest -> authenticated edge goes through the login merge.
//!
//! ```compile_fail
//! use shopkeep_sync::{Credential, Session};
//!
//! let session = Session::guest();
//! session.login(Credential::new("token"));
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};

/// Opaque bearer credential issued by the account service.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Expose the raw token, for the `Authorization` header only.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl From<SecretString> for Credential {
    fn from(secret: SecretString) -> Self {
        Self(secret)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Result of [`Session::login`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginTransition {
    /// The session went from guest to authenticated; guest state must be merged.
    SignedIn,
    /// The session was already authenticated; the credential was refreshed.
    Refreshed,
}

#[derive(Debug, Default)]
struct SessionState {
    credential: Option<Credential>,
    /// Number of guest -> authenticated transitions so far.
    logins: u64,
}

/// Shared session handle.
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<SessionState>>,
}

impl Session {
    /// A fresh guest session.
    #[must_use]
    pub fn guest() -> Self {
        Self::default()
    }

    /// A session restored as already authenticated.
    ///
    /// No login transition is recorded, so no merge will run for it.
    #[must_use]
    pub fn authenticated(credential: Credential) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionState {
                credential: Some(credential),
                logins: 0,
            })),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read(|s| s.credential.is_some())
    }

    /// Current credential, `None` for guests.
    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        self.read(|s| s.credential.clone())
    }

    /// Number of guest -> authenticated transitions this session has seen.
    #[must_use]
    pub fn login_count(&self) -> u64 {
        self.read(|s| s.logins)
    }

    /// Install `credential`.
    pub(crate) fn login(&self, credential: Credential) -> LoginTransition {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let was_guest = state.credential.is_none();
        state.credential = Some(credential);
        if was_guest {
            state.logins += 1;
            LoginTransition::SignedIn
        } else {
            LoginTransition::Refreshed
        }
    }

    /// Drop the credential. Returns `true` if the session was authenticated.
    pub(crate) fn logout(&self) -> bool {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        state.credential.take().is_some()
    }

    fn read<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
        let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }
}
