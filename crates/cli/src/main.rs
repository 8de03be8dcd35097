//! SaveRush CLI - Terminal storefront.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart for the current session
//! saverush cart show
//!
//! # Add products (details are looked up from the catalog)
//! saverush cart add p-milk p-eggs
//!
//! # Sign in with a phone-auth ID token; a guest cart is moved to your account
//! saverush login --id-token "$ID_TOKEN"
//!
//! # Apply a coupon and check out
//! saverush coupon apply c-save40
//! saverush checkout --address addr-1 --payment pm-1
//! ```
//!
//! # Commands
//!
//! - `cart` - Show and change the cart
//! - `coupon` - Apply or remove a coupon (signed-in users)
//! - `login` / `logout` / `whoami` - Session management
//! - `checkout` - Place an order (signed-in users)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use saverush_storefront::config::StorefrontConfig;
use saverush_storefront::error::{AppError, set_sentry_user};
use saverush_storefront::state::AppState;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "saverush")]
#[command(author, version, about = "SaveRush terminal storefront")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Apply or remove a coupon
    Coupon {
        #[command(subcommand)]
        action: CouponAction,
    },
    /// Sign in with a phone-auth ID token
    Login {
        /// ID token from phone verification
        #[arg(long, env = "SAVERUSH_ID_TOKEN", hide_env_values = true)]
        id_token: String,
    },
    /// Sign out and start a fresh guest cart
    Logout,
    /// Show the current session
    Whoami,
    /// Place an order for the current cart
    Checkout {
        /// Delivery address ID
        #[arg(long)]
        address: String,

        /// Saved payment method ID
        #[arg(long)]
        payment: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add one unit of each product
    Add {
        /// Product IDs
        #[arg(required = true)]
        ids: Vec<String>,

        /// Product name (skips the catalog lookup, single product only)
        #[arg(long, requires = "price")]
        name: Option<String>,

        /// Unit price (skips the catalog lookup, single product only)
        #[arg(long, requires = "name")]
        price: Option<Decimal>,

        /// Product image URL
        #[arg(long, default_value = "")]
        image: String,
    },
    /// Set the quantity of a line (0 removes it)
    Update {
        /// Product ID
        id: String,

        /// New quantity, clamped to 99
        quantity: u32,
    },
    /// Remove a line
    Remove {
        /// Product ID
        id: String,
    },
    /// Remove every line
    Clear,
}

#[derive(Subcommand)]
enum CouponAction {
    /// Apply a coupon
    Apply {
        /// Coupon ID
        id: String,
    },
    /// Remove the applied coupon
    Remove,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
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
#[allow(clippy::print_stderr)]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    // Must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "saverush=info,saverush_storefront=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        e.capture();
        output::failure(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), AppError> {
    let state = AppState::new(config)?;
    let auth = state.auth_service();
    let mut cart = state.cart_manager(Arc::new(output::ConsoleNotifier));

    let session = auth.restore()?;
    if let Some(user) = session.user() {
        set_sentry_user(&user.id, user.phone.as_ref().map(|p| p.as_str()));
    }
    cart.sync_session(session).await?;

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => output::cart(&cart),
            CartAction::Add {
                ids,
                name,
                price,
                image,
            } => {
                let details = name.zip(price).map(|(name, price)| (name, price, image));
                commands::cart::add(&state, &mut cart, ids, details).await?;
            }
            CartAction::Update { id, quantity } => {
                commands::cart::update(&mut cart, &id, quantity).await?;
            }
            CartAction::Remove { id } => commands::cart::remove(&mut cart, &id).await?,
            CartAction::Clear => commands::cart::clear(&mut cart).await?,
        },
        Commands::Coupon { action } => match action {
            CouponAction::Apply { id } => commands::coupon::apply(&mut cart, &id).await?,
            CouponAction::Remove => commands::coupon::remove(&mut cart).await?,
        },
        Commands::Login { id_token } => {
            commands::session::login(&auth, &mut cart, id_token).await?;
        }
        Commands::Logout => commands::session::logout(&auth, &mut cart).await?,
        Commands::Whoami => output::session(&cart),
        Commands::Checkout { address, payment } => {
            commands::checkout::run(&mut cart, address, payment).await?;
        }
    }
    Ok(())
}
