//! CLI configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! Everything [`StateConfig::from_env`] reads, plus:
//! - `SHOPFRONT_STATE_FILE` - JSON file holding the session and cart
//!   (default: `./.shopfront-state.json`)
//! - `SHOPFRONT_API_URL` - Auth API base URL (default: `http://localhost:5000/api`)

use std::path::PathBuf;
use std::sync::Arc;

use shopfront_state::{AppState, ConfigError, FileStore, StateConfig};

const DEFAULT_STATE_FILE: &str = "./.shopfront-state.json";
const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Store configuration.
    pub state: StateConfig,
    /// Where the durable store lives.
    pub state_file: PathBuf,
    /// Auth API base URL, without a trailing slash.
    pub api_url: String,
}

impl CliConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let state = StateConfig::from_env()?;

        let state_file = std::env::var("SHOPFRONT_STATE_FILE")
            .map_or_else(|_| PathBuf::from(DEFAULT_STATE_FILE), PathBuf::from);

        let api_url = std::env::var("SHOPFRONT_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_owned());
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPFRONT_API_URL".to_owned(),
                "must start with http:// or https://".to_owned(),
            ));
        }

        Ok(Self {
            state,
            state_file,
            api_url: api_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Build the application state over the state file.
    #[must_use]
    pub fn open_state(&self) -> AppState {
        let storage = FileStore::open(self.state_file.clone());
        AppState::new(self.state.clone(), Arc::new(storage))
    }
}
