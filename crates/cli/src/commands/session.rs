//! Session commands.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (password from the prompt-free env var)
//! SHOPFRONT_PASSWORD=hunter2 sf-cli session login -e ada@shop.com
//!
//! # Create an account
//! sf-cli session register -e ada@shop.com -u ada -p hunter2 --first-name Ada
//!
//! # Adopt a token issued elsewhere
//! sf-cli session token eyJhbGciOi...
//! ```

use secrecy::SecretString;
use shopfront_state::{AppState, AuthResponse, Identity};
use tracing::info;

use crate::api::{AuthClient, Registration};
use crate::config::CliConfig;
use crate::error::CliError;

/// Account details for `session register`.
#[derive(Debug, Clone)]
pub struct Profile {
    pub email: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Sign in against the auth API.
///
/// # Errors
///
/// Returns an error if the API cannot be reached, rejects the credentials,
/// or the session cannot be stored.
pub async fn login(
    state: &AppState,
    config: &CliConfig,
    email: &str,
    password: String,
) -> Result<(), CliError> {
    let client = AuthClient::new(&config.api_url);
    let response = client.login(email, &SecretString::from(password)).await?;
    establish(state, response)
}

/// Register an account and sign in.
///
/// # Errors
///
/// Returns an error if the API cannot be reached, rejects the registration,
/// or the session cannot be stored.
pub async fn register(
    state: &AppState,
    config: &CliConfig,
    profile: &Profile,
    password: String,
) -> Result<(), CliError> {
    let client = AuthClient::new(&config.api_url);
    let registration = Registration {
        email: &profile.email,
        username: &profile.username,
        first_name: profile.first_name.as_deref(),
        last_name: profile.last_name.as_deref(),
    };
    let response = client
        .register(&registration, &SecretString::from(password))
        .await?;
    establish(state, response)
}

/// Store a token obtained outside the CLI.
///
/// # Errors
///
/// Returns an error if the token does not decode to an identity or cannot be
/// stored.
pub fn store_token(state: &AppState, token: String) -> Result<(), CliError> {
    establish(state, AuthResponse::success(token))
}

/// Log the current identity.
pub fn show(state: &AppState) {
    let session = state.session();
    match session.current_identity() {
        Some(identity) => {
            log_identity(&identity);
            match session.credential_expires_at() {
                Some(expires_at) => info!("Credential expires at {expires_at}"),
                None => info!("Credential carries no expiry"),
            }
        }
        None => info!("Not signed in"),
    }
}

/// Sign out.
///
/// # Errors
///
/// Returns an error if the session or cart cannot be persisted.
pub fn logout(state: &AppState) -> Result<(), CliError> {
    state.logout()?;
    info!("Signed out");
    Ok(())
}

fn establish(state: &AppState, response: AuthResponse) -> Result<(), CliError> {
    let identity = state.session().derive_from_credential(response)?;
    info!("Signed in");
    log_identity(&identity);
    Ok(())
}

fn log_identity(identity: &Identity) {
    info!(
        "  {} <{}> (id {}, role {})",
        identity.display_name(),
        identity.email(),
        identity.id(),
        identity.role()
    );
}
