//! `shopkeep wishlist` commands.

use tracing::{info, warn};

use shopkeep_core::{ItemId, Wishlist};
use shopkeep_sync::Synced;
use shopkeep_sync::reconciler::WishlistOp;
use shopkeep_sync::view::{resolve_wishlist, wishlist_icons};

use super::Context;

pub async fn show(ctx: &Context) {
    let wishlist = ctx.reconciler.read_wishlist().await;
    render(ctx, wishlist).await;
}

pub async fn toggle(ctx: &Context, item_id: String) {
    let item = ItemId::new(item_id);
    let wishlist = ctx
        .reconciler
        .mutate_wishlist(WishlistOp::Toggle(item.clone()))
        .await;

    for icon in wishlist_icons(wishlist.value(), [&item]) {
        if icon.filled {
            info!("Saved {} to wishlist", icon.item_id);
        } else {
            info!("Removed {} from wishlist", icon.item_id);
        }
    }
    render(ctx, wishlist).await;
}

pub async fn remove(ctx: &Context, item_id: String) {
    let wishlist = ctx
        .reconciler
        .mutate_wishlist(WishlistOp::Remove(ItemId::new(item_id)))
        .await;
    render(ctx, wishlist).await;
}

async fn render(ctx: &Context, wishlist: Synced<Wishlist>) {
    if let Some(cause) = wishlist.cause() {
        warn!("Account unreachable, showing this device's wishlist: {cause}");
    }

    let wishlist = wishlist.into_value();
    let items = resolve_wishlist(&ctx.catalog, &wishlist).await;

    if items.is_empty() {
        info!("Wishlist is empty");
        return;
    }

    for item in items {
        info!(
            "  {} [{}] {}",
            item.title,
            item.item_id,
            item.price.as_deref().unwrap_or("-")
        );
    }
}
