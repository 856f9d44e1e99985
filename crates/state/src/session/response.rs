//! Auth service response envelope.
//!
//! `POST /auth/login` and `POST /auth/register` both answer with
//! `{ "success": bool, "message"?: string, "data"?: { "token": string } }`.
//! This is the only shape accepted; anything else is a
//! [`MalformedResponse`].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{AuthError, MalformedResponse};

/// Envelope returned by the login and register endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Whether the service accepted the request.
    pub success: bool,
    /// Human-readable message, usually present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Session data, present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AuthPayload>,
}

/// Session data inside a successful [`AuthResponse`].
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthPayload {
    /// Issued bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl fmt::Debug for AuthPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthPayload")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl AuthResponse {
    /// Successful envelope carrying `token`.
    #[must_use]
    pub fn success(token: impl Into<String>) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(AuthPayload {
                token: Some(token.into()),
            }),
        }
    }

    /// Failed envelope with an optional message.
    #[must_use]
    pub fn failure(message: Option<String>) -> Self {
        Self {
            success: false,
            message,
            data: None,
        }
    }

    /// Parse a raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedResponse::Json`] if the body is not the envelope.
    pub fn from_json(body: &str) -> Result<Self, MalformedResponse> {
        Ok(serde_json::from_str(body)?)
    }

    /// The issued token, or why there is none.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Rejected`] when `success` is false and
    /// [`AuthError::MalformedResponse`] when a successful envelope has no
    /// token.
    pub fn into_token(self) -> Result<String, AuthError> {
        if !self.success {
            return Err(AuthError::Rejected {
                message: self.message,
            });
        }
        let data = self.data.ok_or(MalformedResponse::MissingData)?;
        let token = data
            .token
            .filter(|token| !token.is_empty())
            .ok_or(MalformedResponse::MissingToken)?;
        Ok(token)
    }
}
