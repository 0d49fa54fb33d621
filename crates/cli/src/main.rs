//! Vitrine CLI - terminal front-end for the storefront.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! vitrine products
//!
//! # Work with the cart
//! vitrine cart add 7
//! vitrine cart qty 7 3
//! vitrine cart show
//!
//! # Accounts
//! vitrine auth sign-up -e ana@example.com -p hunter22 -u ana
//! vitrine auth sign-in -e ana@example.com -p hunter22
//! vitrine auth whoami
//!
//! # Product management (admins)
//! vitrine admin create --title Phone --price 199.99 --description x
//! ```
//!
//! Every invocation restores the saved session and loads the catalog before
//! running its command. State lives in `VITRINE_DATA_DIR` (default
//! `.vitrine`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::io::Write;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitrine_storefront::AppState;
use vitrine_storefront::config::StorefrontConfig;

mod commands;

#[derive(Parser)]
#[command(name = "vitrine")]
#[command(author, version, about = "Vitrine storefront in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the catalog
    Products,
    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Sign up, sign in or out
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Manage products (admins only)
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Show or switch the color theme
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show entries and total
    Show,
    /// Add one unit of a product
    Add {
        /// Product id
        id: String,
    },
    /// Remove a product
    Remove {
        /// Product id
        id: String,
    },
    /// Set a product's quantity
    Qty {
        /// Product id
        id: String,
        /// New quantity (at least 1)
        #[arg(allow_negative_numbers = true)]
        quantity: i32,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum AuthAction {
    /// Create an account
    SignUp {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        #[arg(short, long)]
        username: String,
    },
    /// Sign in with email and password
    SignIn {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Sign out
    SignOut,
    /// Show who is signed in
    Whoami,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Show the product management panel
    Panel,
    /// Create a product
    Create {
        #[command(flatten)]
        fields: commands::admin::ProductFields,
    },
    /// Update a product
    Update {
        /// Product id
        id: String,
        #[command(flatten)]
        patch: commands::admin::ProductPatch,
    },
    /// Delete a product
    Delete {
        /// Product id
        id: String,
    },
}

#[derive(Subcommand)]
enum ThemeAction {
    /// Print the current theme
    Show,
    /// Switch between light and dark
    Toggle,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::debug!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vitrine_storefront=info,vitrine_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(cli, &config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut state = AppState::from_config(config)?;
    state.initialize().await;

    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Products => commands::catalog::list(&state, &mut out)?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&state, &mut out)?,
            CartAction::Add { id } => commands::cart::add(&mut state, &id, &mut out).await?,
            CartAction::Remove { id } => commands::cart::remove(&mut state, &id, &mut out).await?,
            CartAction::Qty { id, quantity } => {
                commands::cart::set_quantity(&mut state, &id, quantity, &mut out).await?;
            }
            CartAction::Clear => commands::cart::clear(&mut state, &mut out).await?,
        },
        Commands::Auth { action } => match action {
            AuthAction::SignUp {
                email,
                password,
                username,
            } => {
                commands::auth::sign_up(&mut state, &email, password, &username, &mut out).await?;
            }
            AuthAction::SignIn { email, password } => {
                commands::auth::sign_in(&mut state, &email, password, &mut out).await?;
            }
            AuthAction::SignOut => commands::auth::sign_out(&mut state, &mut out).await?,
            AuthAction::Whoami => commands::auth::whoami(&state, &mut out)?,
        },
        Commands::Admin { action } => match action {
            AdminAction::Panel => commands::admin::panel(&mut state, &mut out)?,
            AdminAction::Create { fields } => {
                commands::admin::create(&mut state, fields, &mut out).await?;
            }
            AdminAction::Update { id, patch } => {
                commands::admin::update(&mut state, &id, patch, &mut out).await?;
            }
            AdminAction::Delete { id } => commands::admin::delete(&mut state, &id, &mut out).await?,
        },
        Commands::Theme { action } => match action {
            ThemeAction::Show => writeln!(out, "{}", state.theme())?,
            ThemeAction::Toggle => {
                let theme = state.toggle_theme();
                writeln!(out, "Theme set to {theme}")?;
            }
        },
    }

    out.flush()?;
    Ok(())
}
