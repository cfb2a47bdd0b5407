//! Shopkeep CLI - guest and account carts and wishlists from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Add two of item p1 in size M (guest cart until you log in)
//! shopkeep cart add p1 --variant M --quantity 2
//!
//! # Toggle an item on the wishlist
//! shopkeep wishlist toggle p7
//!
//! # Log in; guest cart and wishlist are merged into the account once
//! SHOPKEEP_TOKEN=... shopkeep login
//!
//! # Show authority and sync status per resource
//! shopkeep status
//! ```
//!
//! # Commands
//!
//! - `cart show|add|update|remove` - Cart lines
//! - `wishlist show|toggle|remove` - Wishlist membership
//! - `login` / `logout` - Session transitions
//! - `status` - Authority and divergence per resource

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopkeep_sync::SyncConfig;

mod commands;

#[derive(Parser)]
#[command(name = "shopkeep")]
#[command(author, version, about = "Shopkeep cart and wishlist tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage cart lines
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage wishlist membership
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Sign in and merge guest state into the account
    Login {
        /// Bearer token issued by the account service
        #[arg(long, env = "SHOPKEEP_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Sign out and start a fresh guest session
    Logout,
    /// Show authority and sync status
    Status,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show resolved cart lines
    Show,
    /// Add a line (increments an existing line)
    Add {
        item_id: String,
        #[arg(short, long, default_value = "")]
        variant: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (0 or less removes it)
    Update {
        item_id: String,
        #[arg(short, long, default_value = "")]
        variant: String,
        #[arg(short, long, allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        item_id: String,
        #[arg(short, long, default_value = "")]
        variant: String,
    },
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Show resolved wishlist entries
    Show,
    /// Add the item if absent, remove it if present
    Toggle { item_id: String },
    /// Remove the item
    Remove { item_id: String },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &SyncConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match SyncConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopkeep=info,shopkeep_sync=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: SyncConfig) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = commands::Context::load(config)?;

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx).await,
            CartAction::Add {
                item_id,
                variant,
                quantity,
            } => commands::cart::add(&ctx, item_id, variant, quantity).await,
            CartAction::Update {
                item_id,
                variant,
                quantity,
            } => commands::cart::update(&ctx, item_id, variant, quantity).await,
            CartAction::Remove { item_id, variant } => {
                commands::cart::remove(&ctx, item_id, variant).await;
            }
        },
        Commands::Wishlist { action } => match action {
            WishlistAction::Show => commands::wishlist::show(&ctx).await,
            WishlistAction::Toggle { item_id } => commands::wishlist::toggle(&ctx, item_id).await,
            WishlistAction::Remove { item_id } => commands::wishlist::remove(&ctx, item_id).await,
        },
        Commands::Login { token } => commands::account::login(&ctx, token).await?,
        Commands::Logout => commands::account::logout(&ctx).await?,
        Commands::Status => commands::account::status(&ctx),
    }
    Ok(())
}
