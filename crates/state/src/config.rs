//! State configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `SHOPFRONT_KEY_PREFIX` - Prefix for storage keys (default: none)
//! - `SHOPFRONT_LOGIN_PATH` - Login view path (default: `/auth/login`)
//! - `SHOPFRONT_HOME_PATH` - Neutral default view path (default: `/`)
//! - `SHOPFRONT_CLEAR_CART_ON_LOGOUT` - Empty the cart on logout (default: false)

use thiserror::Error;

use crate::gate::GateConfig;
use crate::storage::StorageKeys;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Session and cart state configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateConfig {
    /// Prefix prepended to every storage key.
    pub key_prefix: String,
    /// Whether logging out also empties the cart.
    pub clear_cart_on_logout: bool,
    /// Route gate paths and rules.
    pub gate: GateConfig,
}

impl StateConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let defaults = GateConfig::default();
        let login_path = get_path_or_default("SHOPFRONT_LOGIN_PATH", &defaults.login_path)?;
        let home_path = get_path_or_default("SHOPFRONT_HOME_PATH", &defaults.home_path)?;

        Ok(Self {
            key_prefix: get_optional_env("SHOPFRONT_KEY_PREFIX").unwrap_or_default(),
            clear_cart_on_logout: get_optional_env("SHOPFRONT_CLEAR_CART_ON_LOGOUT")
                .map(|value| parse_bool("SHOPFRONT_CLEAR_CART_ON_LOGOUT", &value))
                .transpose()?
                .unwrap_or(false),
            gate: GateConfig {
                login_path,
                home_path,
                routes: defaults.routes,
            },
        })
    }

    /// Storage keys derived from the prefix.
    #[must_use]
    pub fn storage_keys(&self) -> StorageKeys {
        StorageKeys::with_prefix(&self.key_prefix)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get a view path, which must be absolute.
fn get_path_or_default(key: &str, default: &str) -> Result<String, ConfigError> {
    match get_optional_env(key) {
        Some(path) if path.starts_with('/') => Ok(path),
        Some(path) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("path must start with '/' (got {path:?})"),
        )),
        None => Ok(default.to_string()),
    }
}

/// Parse a boolean flag.
fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got {other:?}"),
        )),
    }
}
