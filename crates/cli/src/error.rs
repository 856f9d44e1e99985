//! CLI error type.

use shopfront_state::{AuthError, CartError, ConfigError, StateError};
use thiserror::Error;

/// Errors surfaced by `sf-cli` commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The auth API could not be reached or answered unreadably.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The auth API answered with an error status and no envelope.
    #[error("Auth API returned {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// Session operation failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Composite state operation failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// A command argument could not be used.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Navigation was denied.
    #[error("Access denied: redirect to {0}")]
    Denied(String),
}
