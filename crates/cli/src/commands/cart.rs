//! `shopkeep cart` commands.

use tracing::{info, warn};

use shopkeep_core::{CartLine, LineKey};
use shopkeep_sync::Synced;
use shopkeep_sync::reconciler::CartOp;
use shopkeep_sync::view::{CartBadge, resolve_cart};

use super::Context;

pub async fn show(ctx: &Context) {
    let lines = ctx.reconciler.read_cart().await;
    render(ctx, lines).await;
}

pub async fn add(ctx: &Context, item_id: String, variant: String, quantity: u32) {
    let line = CartLine::new(item_id, variant, quantity);
    let lines = ctx.reconciler.mutate_cart(CartOp::Add(line)).await;
    render(ctx, lines).await;
}

pub async fn update(ctx: &Context, item_id: String, variant: String, quantity: i64) {
    let key = LineKey::new(item_id, variant);
    let lines = ctx
        .reconciler
        .mutate_cart(CartOp::Update { key, quantity })
        .await;
    render(ctx, lines).await;
}

pub async fn remove(ctx: &Context, item_id: String, variant: String) {
    let key = LineKey::new(item_id, variant);
    let lines = ctx.reconciler.mutate_cart(CartOp::Remove(key)).await;
    render(ctx, lines).await;
}

async fn render(ctx: &Context, lines: Synced<Vec<CartLine>>) {
    if let Some(cause) = lines.cause() {
        warn!("Account unreachable, showing this device's cart: {cause}");
    }

    let lines = lines.into_value();
    let view = resolve_cart(&ctx.catalog, &lines).await;

    if view.items.is_empty() {
        info!("Cart is empty");
        return;
    }

    for item in &view.items {
        let variant = if item.variant.as_str().is_empty() {
            String::new()
        } else {
            format!(" ({})", item.variant)
        };
        info!(
            "  {} x {}{} {}",
            item.quantity,
            item.title,
            variant,
            item.line_price.as_deref().unwrap_or("-")
        );
    }
    info!("Subtotal: {}", view.subtotal);
    if let Some(label) = CartBadge::from_lines(&lines).label() {
        info!("Badge: {label}");
    }
}
