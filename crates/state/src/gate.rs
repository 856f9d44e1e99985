//! Route authorization gate.
//!
//! The navigation layer asks the gate before entering a protected view. The
//! decision reads the session store's in-memory snapshot and its durable
//! credential slot only: it never touches the network and never blocks on
//! anything but a local lock, so routers can call it on the same tick.

use url::form_urlencoded;

use crate::session::SessionStore;

/// Query parameter carrying the originally requested path to the login view.
pub const RETURN_URL_PARAM: &str = "returnUrl";

/// Where to send a denied navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Target view path.
    pub path: String,
    /// Path to resume after login.
    pub return_url: Option<String>,
}

impl Redirect {
    /// The target with its query string, e.g. `/auth/login?returnUrl=%2Fcart`.
    #[must_use]
    pub fn href(&self) -> String {
        match &self.return_url {
            Some(return_url) => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair(RETURN_URL_PARAM, return_url)
                    .finish();
                format!("{}?{query}", self.path)
            }
            None => self.path.clone(),
        }
    }

    /// Where to go after a successful login, given the login view's query
    /// string.
    ///
    /// Only same-origin absolute paths are honoured; anything else (absent,
    /// `//host`, `https://...`) resumes at `fallback`.
    #[must_use]
    pub fn resume_target(query: &str, fallback: &str) -> String {
        form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .find(|(key, _)| key == RETURN_URL_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|target| is_local_path(target))
            .unwrap_or_else(|| fallback.to_owned())
    }
}

fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Enter the view.
    Allow,
    /// No session; go to the login view.
    DenyUnauthenticated(Redirect),
    /// Signed in without the required role; go to the neutral default view.
    DenyForbidden(Redirect),
}

impl GateDecision {
    /// Whether navigation may proceed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Redirect for a denied navigation.
    #[must_use]
    pub const fn redirect(&self) -> Option<&Redirect> {
        match self {
            Self::Allow => None,
            Self::DenyUnauthenticated(redirect) | Self::DenyForbidden(redirect) => Some(redirect),
        }
    }
}

/// Access level a route requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone.
    Public,
    /// Any signed-in user.
    Authenticated,
    /// Signed-in admins.
    Admin,
}

/// Access rules keyed by path prefix.
///
/// A prefix matches itself and anything below it on a segment boundary, so
/// `/cart` covers `/cart` and `/cart/checkout` but not `/cartography`. The
/// longest matching prefix wins; unmatched paths are public.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    rules: Vec<(String, Access)>,
}

impl RouteTable {
    /// A table with no rules: everything is public.
    #[must_use]
    pub const fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add or replace the rule for `prefix`.
    #[must_use]
    pub fn with(mut self, prefix: impl Into<String>, access: Access) -> Self {
        let prefix = normalize(&prefix.into());
        self.rules.retain(|(existing, _)| *existing != prefix);
        self.rules.push((prefix, access));
        self
    }

    /// Access required for `path`. Query and fragment are ignored.
    #[must_use]
    pub fn access_for(&self, path: &str) -> Access {
        let path = normalize(path.split(['?', '#']).next().unwrap_or_default());
        self.rules
            .iter()
            .filter(|(prefix, _)| covers(prefix, &path))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(Access::Public, |(_, access)| *access)
    }
}

impl Default for RouteTable {
    /// Catalog and cart views need a session; catalog editing needs admin.
    fn default() -> Self {
        Self::empty()
            .with("/products", Access::Authenticated)
            .with("/products/new", Access::Admin)
            .with("/products/edit", Access::Admin)
            .with("/cart", Access::Authenticated)
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

fn covers(prefix: &str, path: &str) -> bool {
    prefix == "/"
        || path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Paths and rules the gate works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Login view; unauthenticated navigations go here.
    pub login_path: String,
    /// Neutral default view; forbidden navigations go here.
    pub home_path: String,
    /// Access rules for [`RouteGate::decide_path`].
    pub routes: RouteTable,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            login_path: "/auth/login".to_owned(),
            home_path: "/".to_owned(),
            routes: RouteTable::default(),
        }
    }
}

/// Pre-navigation authorization over a session store.
#[derive(Debug, Clone, Copy)]
pub struct RouteGate<'a> {
    session: &'a SessionStore,
    config: &'a GateConfig,
}

impl<'a> RouteGate<'a> {
    /// Create a gate reading `session`.
    #[must_use]
    pub const fn new(session: &'a SessionStore, config: &'a GateConfig) -> Self {
        Self { session, config }
    }

    /// Decide whether `requested_path` may be entered.
    #[must_use]
    pub fn decide(&self, requested_path: &str, requires_admin: bool) -> GateDecision {
        if !self.session.is_authenticated() {
            tracing::debug!(path = requested_path, "gate: not authenticated");
            return GateDecision::DenyUnauthenticated(Redirect {
                path: self.config.login_path.clone(),
                return_url: Some(requested_path.to_owned()),
            });
        }
        if requires_admin && !self.session.is_admin() {
            tracing::debug!(path = requested_path, "gate: admin required");
            return GateDecision::DenyForbidden(Redirect {
                path: self.config.home_path.clone(),
                return_url: None,
            });
        }
        GateDecision::Allow
    }

    /// Decide for `path` using the route table.
    #[must_use]
    pub fn decide_path(&self, path: &str) -> GateDecision {
        match self.config.routes.access_for(path) {
            Access::Public => GateDecision::Allow,
            Access::Authenticated => self.decide(path, false),
            Access::Admin => self.decide(path, true),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use serde_json::json;

    use super::*;
    use crate::session::AuthResponse;
    use crate::storage::{MemoryStore, StorageKeys};

    fn session_as(role: Option<&str>) -> SessionStore {
        let session = SessionStore::new(Arc::new(MemoryStore::new()), StorageKeys::default());
        if let Some(role) = role {
            let payload = URL_SAFE_NO_PAD
                .encode(json!({"nameid": "1", "email": "a@b.c", "role": role}).to_string());
            session
                .derive_from_credential(AuthResponse::success(format!("h.{payload}.s")))
                .unwrap();
        }
        session
    }

    #[test]
    fn test_unauthenticated_redirects_to_login_with_return_url() {
        let session = session_as(None);
        let config = GateConfig::default();
        let decision = RouteGate::new(&session, &config).decide("/cart", false);

        let GateDecision::DenyUnauthenticated(redirect) = &decision else {
            panic!("expected DenyUnauthenticated, got {decision:?}");
        };
        assert_eq!(redirect.href(), "/auth/login?returnUrl=%2Fcart");
    }

    #[test]
    fn test_user_is_forbidden_admin_routes() {
        let session = session_as(Some("User"));
        let config = GateConfig::default();
        let gate = RouteGate::new(&session, &config);

        assert_eq!(gate.decide("/cart", false), GateDecision::Allow);
        assert_eq!(
            gate.decide("/products/new", true),
            GateDecision::DenyForbidden(Redirect {
                path: "/".to_owned(),
                return_url: None
            })
        );
    }

    #[test]
    fn test_admin_is_allowed_everywhere() {
        let session = session_as(Some("Admin"));
        let config = GateConfig::default();
        let gate = RouteGate::new(&session, &config);
        assert!(gate.decide("/products/edit/4", true).is_allowed());
        assert!(gate.decide_path("/products/edit/4").is_allowed());
    }

    #[test]
    fn test_route_table_longest_prefix() {
        let routes = RouteTable::default();
        assert_eq!(routes.access_for("/"), Access::Public);
        assert_eq!(routes.access_for("/auth/login"), Access::Public);
        assert_eq!(routes.access_for("/products"), Access::Authenticated);
        assert_eq!(routes.access_for("/products/12"), Access::Authenticated);
        assert_eq!(routes.access_for("/products/new"), Access::Admin);
        assert_eq!(routes.access_for("/products/edit/3?tab=images"), Access::Admin);
        assert_eq!(routes.access_for("/cart/"), Access::Authenticated);
        assert_eq!(routes.access_for("/cartography"), Access::Public);
    }

    #[test]
    fn test_decide_path_public_needs_no_session() {
        let session = session_as(None);
        let config = GateConfig::default();
        assert!(RouteGate::new(&session, &config).decide_path("/").is_allowed());
    }

    #[test]
    fn test_resume_target_only_accepts_local_paths() {
        assert_eq!(Redirect::resume_target("?returnUrl=%2Fcart", "/"), "/cart");
        assert_eq!(
            Redirect::resume_target("returnUrl=%2Fproducts%3Fpage%3D2", "/"),
            "/products?page=2"
        );
        assert_eq!(Redirect::resume_target("returnUrl=https%3A%2F%2Fevil.test", "/"), "/");
        assert_eq!(Redirect::resume_target("returnUrl=%2F%2Fevil.test", "/"), "/");
        assert_eq!(Redirect::resume_target("", "/home"), "/home");
    }

    #[test]
    fn test_redirect_without_return_url() {
        let redirect = Redirect {
            path: "/".to_owned(),
            return_url: None,
        };
        assert_eq!(redirect.href(), "/");
    }
}
