//! Application state shared across views.

use std::sync::Arc;

use tracing::info;

use crate::cart::CartStore;
use crate::config::StateConfig;
use crate::error::Result;
use crate::gate::RouteGate;
use crate::session::SessionStore;
use crate::storage::DurableStore;

/// The stores one client instance works with.
///
/// Cheaply cloneable via `Arc`; hand clones to views instead of reaching for
/// globals. Independent instances over separate storage do not interact.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StateConfig,
    session: SessionStore,
    cart: CartStore,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("session", &self.inner.session)
            .field("cart", &self.inner.cart)
            .finish()
    }
}

impl AppState {
    /// Build the stores over `storage` and restore persisted state.
    #[must_use]
    pub fn new(config: StateConfig, storage: Arc<dyn DurableStore>) -> Self {
        let keys = config.storage_keys();
        let session = SessionStore::new(Arc::clone(&storage), keys.clone());
        session.restore_from_storage();
        let cart = CartStore::new(storage, &keys);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                session,
                cart,
            }),
        }
    }

    /// Get a reference to the state configuration.
    #[must_use]
    pub fn config(&self) -> &StateConfig {
        &self.inner.config
    }

    /// Get a reference to the session store.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Route gate over this state's session.
    #[must_use]
    pub fn gate(&self) -> RouteGate<'_> {
        RouteGate::new(&self.inner.session, &self.inner.config.gate)
    }

    /// End the session, emptying the cart too when configured to.
    ///
    /// # Errors
    ///
    /// Returns an error if the session or cart cannot be persisted. The
    /// session is cleared before the cart is touched.
    pub fn logout(&self) -> Result<()> {
        self.inner.session.logout()?;
        if self.inner.config.clear_cart_on_logout {
            self.inner.cart.clear()?;
            info!("cart cleared on logout");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use rust_decimal::Decimal;
    use serde_json::json;
    use shopfront_core::{ProductId, ProductSnapshot};

    use super::*;
    use crate::session::AuthResponse;
    use crate::storage::MemoryStore;

    fn login(state: &AppState) {
        let payload =
            URL_SAFE_NO_PAD.encode(json!({"nameid": 1, "email": "a@b.c"}).to_string());
        state
            .session()
            .derive_from_credential(AuthResponse::success(format!("h.{payload}.s")))
            .unwrap();
    }

    fn mug() -> ProductSnapshot {
        ProductSnapshot::new(ProductId::new(1), "Mug", Decimal::from_str("8.00").unwrap(), 4)
    }

    #[test]
    fn test_logout_keeps_cart_by_default() {
        let state = AppState::new(StateConfig::default(), Arc::new(MemoryStore::new()));
        login(&state);
        state.cart().add(mug(), 1).unwrap();

        state.logout().unwrap();
        assert!(!state.session().is_authenticated());
        assert_eq!(state.cart().quantity_of(ProductId::new(1)), 1);
    }

    #[test]
    fn test_logout_clears_cart_when_configured() {
        let config = StateConfig {
            clear_cart_on_logout: true,
            ..StateConfig::default()
        };
        let state = AppState::new(config, Arc::new(MemoryStore::new()));
        login(&state);
        state.cart().add(mug(), 2).unwrap();

        state.logout().unwrap();
        assert!(state.cart().is_empty());
    }

    #[test]
    fn test_new_restores_persisted_state() {
        let memory = MemoryStore::new();
        let first = AppState::new(StateConfig::default(), Arc::new(memory.clone()));
        login(&first);
        first.cart().add(mug(), 3).unwrap();

        let second = AppState::new(StateConfig::default(), Arc::new(memory));
        assert!(second.session().is_authenticated());
        assert_eq!(second.cart().quantity_of(ProductId::new(1)), 3);
    }

    #[test]
    fn test_prefixed_instances_share_storage_without_interfering() {
        let memory = MemoryStore::new();
        let a = AppState::new(
            StateConfig {
                key_prefix: "a.".to_owned(),
                ..StateConfig::default()
            },
            Arc::new(memory.clone()),
        );
        let b = AppState::new(
            StateConfig {
                key_prefix: "b.".to_owned(),
                ..StateConfig::default()
            },
            Arc::new(memory),
        );
        login(&a);
        assert!(a.session().is_authenticated());
        assert!(!b.session().is_authenticated());
    }
}
