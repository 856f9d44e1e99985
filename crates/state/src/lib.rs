//! Shopfront State - client-side session and cart stores.
//!
//! Persisted, observable stores that a storefront client's views share:
//!
//! - [`session`] - bearer credential and the identity decoded from it
//! - [`cart`] - ordered, merge-by-product cart lines with totals
//! - [`gate`] - synchronous allow/deny decision for protected routes
//! - [`storage`] - durable key-value backends the stores persist through
//!
//! # Architecture
//!
//! Every store is an explicit object built over an `Arc<dyn DurableStore>`;
//! there are no globals, so tests and multiple clients can build as many
//! independent instances as they need. [`AppState`] bundles one of each.
//!
//! Reads are synchronous snapshots. Changes are delivered through
//! [`Observable`] subscriptions that replay the current value on subscribe.
//! Each mutation persists before it publishes.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use shopfront_state::{AppState, GateDecision, MemoryStore, StateConfig};
//!
//! let state = AppState::new(StateConfig::default(), Arc::new(MemoryStore::new()));
//! let decision = state.gate().decide_path("/cart");
//! assert!(matches!(decision, GateDecision::DenyUnauthenticated(_)));
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod credential;
pub mod error;
pub mod gate;
pub mod identity;
pub mod observable;
pub mod session;
pub mod state;
pub mod storage;

pub use cart::{Cart, CartError, CartLine, CartStore};
pub use config::{ConfigError, StateConfig};
pub use credential::{Claims, Credential, CredentialError};
pub use error::StateError;
pub use gate::{Access, GateConfig, GateDecision, Redirect, RouteGate, RouteTable};
pub use identity::Identity;
pub use observable::{Observable, Subscription};
pub use session::{AuthError, AuthResponse, MalformedResponse, SessionStore};
#[cfg(feature = "browser")]
pub use storage::LocalStorage;
pub use storage::{DurableStore, FileStore, MemoryStore, StorageError, StorageKeys};
pub use state::AppState;
