//! Shopfront CLI - drive the session and cart stores from a terminal.
//!
//! State is kept in a JSON file (`SHOPFRONT_STATE_FILE`) so successive
//! invocations share one session and cart, the way reloads of a browser tab
//! share `localStorage`.
//!
//! # Usage
//!
//! ```bash
//! # Sign in against the auth API
//! sf-cli session login -e ada@shop.com
//!
//! # Add two of product 12 at 8.50
//! sf-cli cart add 12 --name Mug --price 8.50 --quantity 2
//!
//! # Would the router let us into the admin editor?
//! sf-cli gate check /products/new
//!
//! # Sign out
//! sf-cli session logout
//! ```
//!
//! # Commands
//!
//! - `session` - Login, register, inspect, or end the session
//! - `cart` - Show and edit the cart
//! - `gate` - Ask the route gate about a path

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod api;
mod commands;
mod config;
mod error;

use config::CliConfig;
use error::CliError;

#[derive(Parser)]
#[command(name = "sf-cli")]
#[command(author, version, about = "Shopfront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the signed-in session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Show and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Check route authorization
    Gate {
        #[command(subcommand)]
        action: GateAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Sign in with email and password
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password (read from `SHOPFRONT_PASSWORD` if omitted)
        #[arg(short, long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Username
        #[arg(short, long)]
        username: String,

        /// Account password (read from `SHOPFRONT_PASSWORD` if omitted)
        #[arg(short, long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,

        /// First name
        #[arg(long)]
        first_name: Option<String>,

        /// Last name
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Store a token issued elsewhere
    Token {
        /// Raw bearer token
        token: String,
    },
    /// Show the current identity
    Show,
    /// Sign out
    Logout,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and totals
    Show,
    /// Add a product, merging with an existing line
    Add {
        /// Product ID
        product_id: i64,

        /// Product name
        #[arg(short, long)]
        name: String,

        /// Unit price, e.g. `8.50`
        #[arg(long)]
        price: String,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: i64,

        /// Stock hint
        #[arg(long, default_value_t = 0)]
        stock: i64,

        /// Image URL
        #[arg(long)]
        image_url: Option<String>,
    },
    /// Set a line's quantity (0 or less removes it)
    Set {
        /// Product ID
        product_id: i64,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Product ID
        product_id: i64,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum GateAction {
    /// Decide whether a path may be entered
    Check {
        /// View path, e.g. `/cart`
        path: String,

        /// Require the admin role regardless of the route table
        #[arg(long)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let config = CliConfig::from_env()?;
    let state = config.open_state();

    match cli.command {
        Commands::Session { action } => match action {
            SessionAction::Login { email, password } => {
                commands::session::login(&state, &config, &email, password).await?;
            }
            SessionAction::Register {
                email,
                username,
                password,
                first_name,
                last_name,
            } => {
                let profile = commands::session::Profile {
                    email,
                    username,
                    first_name,
                    last_name,
                };
                commands::session::register(&state, &config, &profile, password).await?;
            }
            SessionAction::Token { token } => commands::session::store_token(&state, token)?,
            SessionAction::Show => commands::session::show(&state),
            SessionAction::Logout => commands::session::logout(&state)?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&state),
            CartAction::Add {
                product_id,
                name,
                price,
                quantity,
                stock,
                image_url,
            } => {
                let product =
                    commands::cart::snapshot(product_id, name, &price, stock, image_url)?;
                commands::cart::add(&state, product, quantity)?;
            }
            CartAction::Set {
                product_id,
                quantity,
            } => commands::cart::set(&state, product_id, quantity)?,
            CartAction::Remove { product_id } => commands::cart::remove(&state, product_id)?,
            CartAction::Clear => commands::cart::clear(&state)?,
        },
        Commands::Gate { action } => match action {
            GateAction::Check { path, admin } => commands::gate::check(&state, &path, admin)?,
        },
    }
    Ok(())
}
