//! Unified error type for callers that drive several stores.

use thiserror::Error;

use crate::cart::CartError;
use crate::config::ConfigError;
use crate::session::AuthError;
use crate::storage::StorageError;

/// Any error the state core can surface.
///
/// Nothing here is fatal: the worst outcome of each is a signed-out session
/// or an unchanged cart.
#[derive(Debug, Error)]
pub enum StateError {
    /// Session operation failed.
    #[error("Session error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Storage backend failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for `StateError`.
pub type Result<T> = std::result::Result<T, StateError>;
