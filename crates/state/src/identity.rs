//! The signed-in user as seen by the client.

use serde::{Deserialize, Serialize};

use shopfront_core::{Email, Role, UserId};

use crate::credential::Claims;

/// Authenticated-user record derived from a credential.
///
/// Views read identities from the session store; they are only built from
/// decoded claims or restored from the persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    id: UserId,
    email: Email,
    display_name: String,
    role: Role,
}

impl Identity {
    pub(crate) fn from_claims(claims: &Claims) -> Self {
        Self {
            id: claims.subject,
            email: claims.email.clone(),
            display_name: claims.display_name.clone(),
            role: claims.role,
        }
    }

    /// User ID.
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// Email address.
    #[must_use]
    pub const fn email(&self) -> &Email {
        &self.email
    }

    /// Name to show in the UI.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Account role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Whether the role grants admin views.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
