//! Integration tests for Shopfront.
//!
//! Exercises the session, cart, and gate stores together over real
//! storage backends, checking the behaviour views rely on across store
//! instances and restarts.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `session_lifecycle` - Login, restore, logout, and rejected responses
//! - `cart_properties` - Merge, removal, uniqueness, and persistence
//! - `route_gate` - Allow/deny matrix over roles and routes
//!
//! This library holds the helpers those tests share.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rust_decimal::Decimal;
use serde_json::json;
use shopfront_core::{ProductId, ProductSnapshot};
use shopfront_state::AuthResponse;

/// A signed-looking token whose payload carries the given claims.
///
/// The signature segment is filler; the client never verifies it.
#[must_use]
pub fn token(user_id: i64, email: &str, role: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({
            "nameid": user_id.to_string(),
            "email": email,
            "unique_name": email.split('@').next().unwrap_or(email),
            "role": role,
        })
        .to_string(),
    );
    format!("{header}.{payload}.dGVzdC1zaWduYXR1cmU")
}

/// Successful login envelope for a user.
#[must_use]
pub fn login_as(user_id: i64, role: &str) -> AuthResponse {
    AuthResponse::success(token(user_id, &format!("user{user_id}@shop.test"), role))
}

/// Product snapshot priced at `cents / 100`.
#[must_use]
pub fn product(id: i64, cents: i64) -> ProductSnapshot {
    ProductSnapshot::new(
        ProductId::new(id),
        format!("Product {id}"),
        Decimal::new(cents, 2),
        10,
    )
}

/// A unique, not yet existing file path under the system temp dir.
#[must_use]
pub fn temp_state_file() -> PathBuf {
    std::env::temp_dir().join(format!("shopfront-it-{}.json", uuid::Uuid::new_v4()))
}

/// Collects every value a subscription delivers.
#[derive(Debug)]
pub struct Recorder<T> {
    seen: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            seen: Arc::clone(&self.seen),
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone + Send + 'static> Recorder<T> {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback that records into this recorder.
    #[must_use]
    pub fn callback(&self) -> impl Fn(&T) + Send + Sync + 'static {
        let seen = Arc::clone(&self.seen);
        move |value: &T| {
            seen.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(value.clone());
        }
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget everything recorded so far.
    pub fn reset(&self) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
