//! Session reconciler: routes cart and wishlist operations to the account
//! API or the local state store, and merges guest state on login.
//!
//! # Authority
//!
//! Exactly one copy of each resource is authoritative at any time, decided by
//! whether the [`Session`] holds a credential:
//!
//! - guest: the [`LocalStateStore`] is authoritative, no remote calls happen
//! - signed in: the account API is authoritative; when a call fails the same
//!   operation is applied locally and the result is tagged
//!   [`Synced::Degraded`], and the resource's [`SyncStatus`] becomes
//!   `Diverged` until the next successful remote call
//!
//! # Serialization
//!
//! Each resource has its own async mutex. Reads, mutations and the login
//! merge for a resource all hold it, so rapid repeated operations apply in
//! order and nothing observes a half-finished merge. Cart and wishlist never
//! wait on each other.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{Instrument, info, info_span, instrument, warn};
use uuid::Uuid;

use shopkeep_core::{
    Authority, CartLine, ItemId, LineKey, Resource, SyncStatus, Wishlist, cart,
};

use crate::local::LocalStateStore;
use crate::remote::{RemoteError, RemoteStore};
use crate::session::{Credential, LoginTransition, Session};

const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Options
// =============================================================================

/// What to do with guest state that failed to merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Clear the local resource after every merge attempt, even a failed one.
    #[default]
    ClearAlways,
    /// Keep the entries whose merge failed as pending; they survive logout
    /// and are sent again by the next login merge.
    RetainFailed,
}

impl std::str::FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clear_always" => Ok(Self::ClearAlways),
            "retain_failed" => Ok(Self::RetainFailed),
            _ => Err(format!("invalid merge policy: {s}")),
        }
    }
}

impl std::fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClearAlways => write!(f, "clear_always"),
            Self::RetainFailed => write!(f, "retain_failed"),
        }
    }
}

/// Reconciler settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerOptions {
    /// Upper bound on a single remote call.
    pub remote_timeout: Duration,
    pub merge_policy: MergePolicy,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            merge_policy: MergePolicy::default(),
        }
    }
}

// =============================================================================
// Operations and results
// =============================================================================

/// A cart mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOp {
    /// Add a line, incrementing a matching line's quantity.
    Add(CartLine),
    /// Set a line's quantity; zero or less removes it.
    Update { key: LineKey, quantity: i64 },
    /// Remove a line if present.
    Remove(LineKey),
}

/// A wishlist mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WishlistOp {
    /// Add when absent, remove when present.
    Toggle(ItemId),
    /// Add when absent.
    Add(ItemId),
    /// Remove when present.
    Remove(ItemId),
}

/// Outcome of a reconciled read or mutation.
///
/// Read and mutate never fail outright: a remote failure is reported as
/// `Degraded` carrying the local value and the cause.
#[derive(Debug)]
pub enum Synced<T> {
    /// Served by the account API.
    Remote(T),
    /// Served by the local store because the session is a guest session.
    Local(T),
    /// The account API failed; served by the local store instead.
    Degraded { value: T, cause: RemoteError },
}

impl<T> Synced<T> {
    #[must_use]
    pub const fn value(&self) -> &T {
        match self {
            Self::Remote(value) | Self::Local(value) | Self::Degraded { value, .. } => value,
        }
    }

    #[must_use]
    pub fn into_value(self) -> T {
        match self {
            Self::Remote(value) | Self::Local(value) | Self::Degraded { value, .. } => value,
        }
    }

    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// The remote failure, if this result was degraded.
    #[must_use]
    pub const fn cause(&self) -> Option<&RemoteError> {
        match self {
            Self::Degraded { cause, .. } => Some(cause),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Synced<U> {
        match self {
            Self::Remote(value) => Synced::Remote(f(value)),
            Self::Local(value) => Synced::Local(f(value)),
            Self::Degraded { value, cause } => Synced::Degraded {
                value: f(value),
                cause,
            },
        }
    }
}

/// What a merge attempt covered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeSubject {
    /// One wishlist item, sent with its own add call.
    WishlistItem(ItemId),
    /// The whole guest cart, sent in one bulk call.
    CartLines(Vec<CartLine>),
}

/// Result of merging one subject.
#[derive(Debug)]
pub struct MergeOutcome {
    pub subject: MergeSubject,
    pub error: Option<RemoteError>,
}

impl MergeOutcome {
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-resource report of a login merge.
#[derive(Debug)]
pub struct MergeReport {
    /// Correlates the merge's log lines.
    pub merge_id: Uuid,
    pub resource: Resource,
    /// Failure fetching the account copy before merging, if any.
    ///
    /// When the wishlist cannot be fetched every guest item is sent.
    pub fetch_error: Option<RemoteError>,
    pub outcomes: Vec<MergeOutcome>,
    /// Whether nothing was kept for a retry.
    pub local_cleared: bool,
}

impl MergeReport {
    fn new(merge_id: Uuid, resource: Resource) -> Self {
        Self {
            merge_id,
            resource,
            fetch_error: None,
            outcomes: Vec::new(),
            local_cleared: false,
        }
    }

    /// Whether every merge call succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(MergeOutcome::succeeded)
    }

    /// Outcomes whose call failed.
    pub fn failures(&self) -> impl Iterator<Item = &MergeOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }
}

/// Reports for both resources produced by [`Reconciler::login`].
#[derive(Debug)]
pub struct LoginReport {
    pub cart: MergeReport,
    pub wishlist: MergeReport,
}

// =============================================================================
// Reconciler
// =============================================================================

#[derive(Debug)]
struct ResourceState {
    queue: AsyncMutex<()>,
    authority: Mutex<Authority>,
    status: Mutex<SyncStatus>,
}

impl ResourceState {
    fn new(authority: Authority, status: SyncStatus) -> Self {
        Self {
            queue: AsyncMutex::new(()),
            authority: Mutex::new(authority),
            status: Mutex::new(status),
        }
    }

    fn authority(&self) -> Authority {
        *self.authority.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_authority(&self, authority: Authority) {
        *self.authority.lock().unwrap_or_else(PoisonError::into_inner) = authority;
    }

    fn status(&self) -> SyncStatus {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns `true` if the status changed.
    fn mark_in_sync(&self) -> bool {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        let changed = status.is_diverged();
        *status = SyncStatus::InSync;
        changed
    }

    /// Returns the new status. `since` keeps the start of the divergence.
    fn mark_diverged(&self, cause: &RemoteError) -> SyncStatus {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        let since = match &*status {
            SyncStatus::Diverged { since, .. } => *since,
            SyncStatus::InSync => Utc::now(),
        };
        *status = SyncStatus::Diverged {
            since,
            cause: cause.to_string(),
        };
        status.clone()
    }
}

/// Routes cart and wishlist operations between local and remote state.
pub struct Reconciler<R> {
    session: Session,
    remote: R,
    local: LocalStateStore,
    options: ReconcilerOptions,
    cart: ResourceState,
    wishlist: ResourceState,
}

impl<R: RemoteStore> Reconciler<R> {
    /// Create a reconciler for `session`.
    ///
    /// A session that is already authenticated starts with the account API
    /// authoritative and no merge pending. Each resource's sync status is
    /// restored from `local`.
    #[must_use]
    pub fn new(
        session: Session,
        remote: R,
        local: LocalStateStore,
        options: ReconcilerOptions,
    ) -> Self {
        let authority = if session.is_authenticated() {
            Authority::Authenticated
        } else {
            Authority::Guest
        };
        let cart = ResourceState::new(authority, local.sync_status(Resource::Cart));
        let wishlist = ResourceState::new(authority, local.sync_status(Resource::Wishlist));

        Self {
            session,
            remote,
            local,
            options,
            cart,
            wishlist,
        }
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub const fn local(&self) -> &LocalStateStore {
        &self.local
    }

    #[must_use]
    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Which copy of `resource` is authoritative.
    #[must_use]
    pub fn authority(&self, resource: Resource) -> Authority {
        self.state(resource).authority()
    }

    /// Whether `resource` may have diverged from the account copy.
    #[must_use]
    pub fn sync_status(&self, resource: Resource) -> SyncStatus {
        self.state(resource).status()
    }

    const fn state(&self, resource: Resource) -> &ResourceState {
        match resource {
            Resource::Cart => &self.cart,
            Resource::Wishlist => &self.wishlist,
        }
    }

    fn record_in_sync(&self, resource: Resource) {
        if self.state(resource).mark_in_sync() {
            self.local.set_sync_status(resource, &SyncStatus::InSync);
        }
    }

    fn record_diverged(&self, resource: Resource, cause: &RemoteError) {
        let status = self.state(resource).mark_diverged(cause);
        self.local.set_sync_status(resource, &status);
    }

    /// Run a remote call bounded by the configured timeout.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, RemoteError>>,
    ) -> Result<T, RemoteError> {
        let limit = self.options.remote_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(RemoteError::Timeout(limit)))
    }

    /// Record a remote outcome on `resource` and fall back to `local` on failure.
    fn settle<T>(
        &self,
        resource: Resource,
        result: Result<T, RemoteError>,
        local: impl FnOnce() -> T,
    ) -> Synced<T> {
        match result {
            Ok(value) => {
                self.record_in_sync(resource);
                Synced::Remote(value)
            }
            Err(cause) => {
                warn!(
                    %resource,
                    error = %cause,
                    retryable = cause.is_retryable(),
                    "Account API call failed, falling back to local state"
                );
                self.record_diverged(resource, &cause);
                Synced::Degraded {
                    value: local(),
                    cause,
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    /// Current cart lines.
    #[instrument(skip(self))]
    pub async fn read_cart(&self) -> Synced<Vec<CartLine>> {
        let _queue = self.cart.queue.lock().await;
        let Some(credential) = self.session.credential() else {
            return Synced::Local(self.local.cart().get());
        };

        let result = self.bounded(self.remote.cart(&credential)).await;
        self.settle(Resource::Cart, result, || self.local.cart().get())
    }

    /// Apply a cart mutation.
    #[instrument(skip(self))]
    pub async fn mutate_cart(&self, op: CartOp) -> Synced<Vec<CartLine>> {
        let _queue = self.cart.queue.lock().await;
        let Some(credential) = self.session.credential() else {
            return Synced::Local(self.apply_local_cart(&op));
        };

        let result = match &op {
            CartOp::Add(line) => self.bounded(self.remote.add_to_cart(&credential, line)).await,
            CartOp::Update { key, quantity } => {
                self.bounded(self.remote.update_cart(&credential, key, *quantity))
                    .await
            }
            CartOp::Remove(key) => {
                self.bounded(self.remote.remove_from_cart(&credential, key))
                    .await
            }
        };
        self.settle(Resource::Cart, result, || self.apply_local_cart(&op))
    }

    fn apply_local_cart(&self, op: &CartOp) -> Vec<CartLine> {
        let cart = self.local.cart();
        match op {
            CartOp::Add(line) => cart.add(line.clone()),
            CartOp::Update { key, quantity } => cart.update(key, *quantity),
            CartOp::Remove(key) => cart.remove(key),
        }
    }

    // -------------------------------------------------------------------------
    // Wishlist
    // -------------------------------------------------------------------------

    /// Current wishlist.
    #[instrument(skip(self))]
    pub async fn read_wishlist(&self) -> Synced<Wishlist> {
        let _queue = self.wishlist.queue.lock().await;
        let Some(credential) = self.session.credential() else {
            return Synced::Local(self.local.wishlist().get());
        };

        let result = self.bounded(self.remote.wishlist(&credential)).await;
        self.settle(Resource::Wishlist, result, || self.local.wishlist().get())
    }

    /// Apply a wishlist mutation.
    #[instrument(skip(self))]
    pub async fn mutate_wishlist(&self, op: WishlistOp) -> Synced<Wishlist> {
        let _queue = self.wishlist.queue.lock().await;
        let Some(credential) = self.session.credential() else {
            return Synced::Local(self.apply_local_wishlist(&op));
        };

        let result = match &op {
            WishlistOp::Toggle(item) => self.remote_toggle(&credential, item).await,
            WishlistOp::Add(item) => {
                self.bounded(self.remote.add_to_wishlist(&credential, item))
                    .await
            }
            WishlistOp::Remove(item) => {
                self.bounded(self.remote.remove_from_wishlist(&credential, item))
                    .await
            }
        };
        self.settle(Resource::Wishlist, result, || {
            self.apply_local_wishlist(&op)
        })
    }

    /// Toggle against the account copy: read membership, then add or remove.
    async fn remote_toggle(
        &self,
        credential: &Credential,
        item: &ItemId,
    ) -> Result<Wishlist, RemoteError> {
        let current = self.bounded(self.remote.wishlist(credential)).await?;
        if current.contains(item) {
            self.bounded(self.remote.remove_from_wishlist(credential, item))
                .await
        } else {
            self.bounded(self.remote.add_to_wishlist(credential, item))
                .await
        }
    }

    fn apply_local_wishlist(&self, op: &WishlistOp) -> Wishlist {
        let wishlist = self.local.wishlist();
        match op {
            WishlistOp::Toggle(item) => wishlist.toggle(item.clone()),
            WishlistOp::Add(item) => wishlist.insert(item.clone()),
            WishlistOp::Remove(item) => wishlist.remove(item),
        }
    }

    // -------------------------------------------------------------------------
    // Login / logout
    // -------------------------------------------------------------------------

    /// Sign in with `credential`.
    ///
    /// On the guest -> authenticated edge, guest state is merged into the
    /// account once and reports are returned. Re-authenticating an already
    /// signed-in session only refreshes the credential and returns `None`.
    #[instrument(skip(self, credential))]
    pub async fn login(&self, credential: Credential) -> Option<LoginReport> {
        // Hold both queues across the transition so no operation routes to
        // the account before its guest state has been merged.
        let _cart_queue = self.cart.queue.lock().await;
        let _wishlist_queue = self.wishlist.queue.lock().await;

        if self.session.login(credential.clone()) == LoginTransition::Refreshed {
            info!("Credential refreshed, no merge needed");
            return None;
        }

        let merge_id = Uuid::new_v4();
        let span = info_span!("merge_on_login", %merge_id);
        async {
            self.cart.set_authority(Authority::Merging);
            self.wishlist.set_authority(Authority::Merging);

            let cart = self.merge_cart(merge_id, &credential).await;
            self.cart.set_authority(Authority::Authenticated);

            let wishlist = self.merge_wishlist(merge_id, &credential).await;
            self.wishlist.set_authority(Authority::Authenticated);

            info!(
                cart_complete = cart.is_complete(),
                wishlist_complete = wishlist.is_complete(),
                "Guest state merged"
            );
            Some(LoginReport { cart, wishlist })
        }
        .instrument(span)
        .await
    }

    /// Send the whole guest cart, plus lines left pending by an earlier
    /// merge, in one bulk call.
    async fn merge_cart(&self, merge_id: Uuid, credential: &Credential) -> MergeReport {
        let mut report = MergeReport::new(merge_id, Resource::Cart);
        let local = self.local.cart();
        let pending = self.local.pending_cart();
        let mut lines = local.get();
        for line in pending.get() {
            cart::add_line(&mut lines, line);
        }

        if lines.is_empty() {
            report.local_cleared = true;
            return report;
        }

        let result = self.bounded(self.remote.merge_cart(credential, &lines)).await;
        let failed = result.is_err();
        match &result {
            Ok(_) => self.record_in_sync(Resource::Cart),
            Err(e) => {
                warn!(error = %e, lines = lines.len(), "Cart merge failed");
                self.record_diverged(Resource::Cart, e);
            }
        }
        local.clear();
        if failed && self.options.merge_policy == MergePolicy::RetainFailed {
            pending.set(&lines);
            report.local_cleared = false;
        } else {
            pending.clear();
            report.local_cleared = true;
        }
        report.outcomes.push(MergeOutcome {
            subject: MergeSubject::CartLines(lines),
            error: result.err(),
        });
        report
    }

    /// Add each guest or pending wishlist item missing from the account, one
    /// at a time.
    async fn merge_wishlist(&self, merge_id: Uuid, credential: &Credential) -> MergeReport {
        let mut report = MergeReport::new(merge_id, Resource::Wishlist);
        let local = self.local.wishlist();
        let pending = self.local.pending_wishlist();
        let guest: Wishlist = local
            .get()
            .into_inner()
            .into_iter()
            .chain(pending.get().into_inner())
            .collect();

        if guest.is_empty() {
            report.local_cleared = true;
            return report;
        }

        let missing = match self.bounded(self.remote.wishlist(credential)).await {
            Ok(account) => guest.missing_from(&account),
            Err(e) => {
                warn!(error = %e, "Could not fetch account wishlist, sending every guest item");
                report.fetch_error = Some(e);
                guest.iter().cloned().collect()
            }
        };

        let mut failed = Wishlist::new();
        for item in missing {
            let result = self
                .bounded(self.remote.add_to_wishlist(credential, &item))
                .await;
            if let Err(e) = &result {
                warn!(item_id = %item, error = %e, "Wishlist item merge failed");
                self.record_diverged(Resource::Wishlist, e);
                failed.insert(item.clone());
            }
            report.outcomes.push(MergeOutcome {
                subject: MergeSubject::WishlistItem(item),
                error: result.err(),
            });
        }

        if failed.is_empty() && report.fetch_error.is_none() {
            self.record_in_sync(Resource::Wishlist);
        }

        local.clear();
        if self.options.merge_policy == MergePolicy::RetainFailed && !failed.is_empty() {
            pending.set(&failed);
            report.local_cleared = false;
        } else {
            pending.clear();
            report.local_cleared = true;
        }
        report
    }

    /// Sign out and start a fresh, empty guest session. Entries left pending
    /// by a merge are kept for the next login.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let _cart_queue = self.cart.queue.lock().await;
        let _wishlist_queue = self.wishlist.queue.lock().await;

        let was_authenticated = self.session.logout();
        self.local.cart().clear();
        self.local.wishlist().clear();

        for resource in [Resource::Cart, Resource::Wishlist] {
            self.state(resource).set_authority(Authority::Guest);
            self.record_in_sync(resource);
        }

        info!(was_authenticated, "Signed out, guest state reset");
    }
}

impl<R> std::fmt::Debug for Reconciler<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("session", &self.session)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
