//! `shopkeep login`, `logout` and `status`.

use tracing::{info, warn};

use shopkeep_core::{Resource, SyncStatus};
use shopkeep_sync::reconciler::{MergeReport, MergeSubject};
use shopkeep_sync::storage::StorageError;
use shopkeep_sync::Credential;

use super::{Context, SESSION_KEY, save_session};

/// Sign in and merge this device's guest state into the account.
///
/// # Errors
///
/// Returns `StorageError` if the session cannot be saved.
pub async fn login(ctx: &Context, token: String) -> Result<(), StorageError> {
    let credential = Credential::new(token);

    match ctx.reconciler.login(credential.clone()).await {
        Some(report) => {
            log_merge(&report.cart);
            log_merge(&report.wishlist);
        }
        None => info!("Already signed in, credential refreshed"),
    }

    save_session(ctx.backend().as_ref(), &credential)?;
    info!("Signed in");
    Ok(())
}

/// Sign out and clear this device's guest state.
///
/// # Errors
///
/// Returns `StorageError` if the saved session cannot be removed.
pub async fn logout(ctx: &Context) -> Result<(), StorageError> {
    ctx.reconciler.logout().await;
    ctx.backend().remove(SESSION_KEY)?;
    info!("Signed out");
    Ok(())
}

pub fn status(ctx: &Context) {
    let signed_in = ctx.reconciler.session().is_authenticated();
    info!("Session: {}", if signed_in { "signed in" } else { "guest" });

    for resource in [Resource::Cart, Resource::Wishlist] {
        let authority = ctx.reconciler.authority(resource);
        match ctx.reconciler.sync_status(resource) {
            SyncStatus::InSync => info!("{resource}: {authority}, in sync"),
            SyncStatus::Diverged { since, cause } => {
                warn!("{resource}: {authority}, diverged since {since}: {cause}");
            }
        }
    }
}

fn log_merge(report: &MergeReport) {
    if let Some(e) = &report.fetch_error {
        warn!(resource = %report.resource, "Could not read account copy before merging: {e}");
    }

    let sent = report.outcomes.len();
    let failed = report.failures().count();
    info!(
        resource = %report.resource,
        merge_id = %report.merge_id,
        "Merged {} of {} guest entries",
        sent - failed,
        sent
    );

    for outcome in report.failures() {
        let what = match &outcome.subject {
            MergeSubject::WishlistItem(item) => item.to_string(),
            MergeSubject::CartLines(lines) => format!("{} cart lines", lines.len()),
        };
        if let Some(e) = &outcome.error {
            warn!("  Failed to merge {what}: {e}");
        }
    }

    if !report.local_cleared {
        info!(resource = %report.resource, "Unmerged entries kept on this device for the next login");
    }
}
