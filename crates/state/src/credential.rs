//! Bearer credential decoding.
//!
//! The auth service issues a signed token of three base64url segments
//! (`header.payload.signature`). The client never verifies the signature;
//! it decodes the payload to read the identity claims. Authorization is
//! re-checked server-side on every protected call.
//!
//! # Claims
//!
//! | Claim | Meaning | Required |
//! |-------|---------|----------|
//! | `nameid` | numeric user ID (string or number) | yes |
//! | `email` | email address | yes |
//! | `unique_name` | display name, falls back to `email` | no |
//! | `role` | `"Admin"` or `"User"`, defaults to `"User"` | no |
//! | `exp` | expiry, seconds since epoch | no |

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use shopfront_core::{Email, EmailError, Role, RoleParseError, UserId};

use crate::identity::Identity;

/// Seconds before `exp` at which a credential is already considered expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Errors decoding a credential's claims.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The token does not have three non-empty dot-separated segments.
    #[error("credential is not a three-part token")]
    NotAToken,

    /// The payload segment is not valid base64url.
    #[error("credential payload is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The payload is not a JSON claims object.
    #[error("credential payload is not a claims object: {0}")]
    Json(#[from] serde_json::Error),

    /// A required claim is absent.
    #[error("credential is missing the `{0}` claim")]
    MissingClaim(&'static str),

    /// The `nameid` claim is not an integer.
    #[error("credential subject is not numeric: {0}")]
    InvalidSubject(String),

    /// The `email` claim is not an address.
    #[error("credential email claim is invalid: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The `role` claim names an unknown role.
    #[error("credential role claim is invalid: {0}")]
    InvalidRole(#[from] RoleParseError),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SubjectClaim {
    Number(i64),
    Text(String),
}

#[derive(Deserialize)]
struct RawClaims {
    nameid: Option<SubjectClaim>,
    email: Option<String>,
    unique_name: Option<String>,
    role: Option<String>,
    exp: Option<i64>,
}

/// Claims decoded from a credential payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// User ID.
    pub subject: UserId,
    /// User email.
    pub email: Email,
    /// Name to show in the UI.
    pub display_name: String,
    /// Account role.
    pub role: Role,
    /// When the credential stops being accepted, if it says.
    pub expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<RawClaims> for Claims {
    type Error = CredentialError;

    fn try_from(raw: RawClaims) -> Result<Self, Self::Error> {
        let subject = match raw.nameid.ok_or(CredentialError::MissingClaim("nameid"))? {
            SubjectClaim::Number(id) => UserId::new(id),
            SubjectClaim::Text(text) => text
                .parse()
                .map_err(|_| CredentialError::InvalidSubject(text))?,
        };
        let email = Email::parse(&raw.email.ok_or(CredentialError::MissingClaim("email"))?)?;
        let display_name = raw
            .unique_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| email.as_str().to_owned());
        let role = raw.role.as_deref().map_or(Ok(Role::User), str::parse)?;
        let expires_at = raw.exp.and_then(|secs| DateTime::from_timestamp(secs, 0));

        Ok(Self {
            subject,
            email,
            display_name,
            role,
            expires_at,
        })
    }
}

/// A bearer credential together with its decoded claims.
///
/// The raw token is kept secret: it is redacted from `Debug` output and only
/// readable through [`Credential::expose`].
#[derive(Debug, Clone)]
pub struct Credential {
    raw: SecretString,
    claims: Claims,
}

impl Credential {
    /// Decode `raw` into a credential.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] if the token is not three segments, the
    /// payload is not base64url JSON, or a required claim is missing or
    /// invalid.
    pub fn parse(raw: impl Into<String>) -> Result<Self, CredentialError> {
        let raw: String = raw.into();
        let claims = decode_claims(&raw)?;
        Ok(Self {
            raw: SecretString::from(raw),
            claims,
        })
    }

    /// The raw token.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.raw.expose_secret()
    }

    /// Decoded claims.
    #[must_use]
    pub const fn claims(&self) -> &Claims {
        &self.claims
    }

    /// Identity described by the claims.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::from_claims(&self.claims)
    }

    /// Expiry from the `exp` claim.
    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims.expires_at
    }

    /// Whether the credential is expired or within a minute of expiring.
    ///
    /// Informational only: an expired credential still counts as a session
    /// until the server rejects it.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.claims.expires_at.is_some_and(|expires_at| {
            Utc::now().timestamp() >= expires_at.timestamp() - EXPIRY_SKEW_SECS
        })
    }
}

fn decode_claims(raw: &str) -> Result<Claims, CredentialError> {
    let mut segments = raw.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(CredentialError::NotAToken);
    };
    if header.is_empty() || payload.is_empty() || signature.is_empty() {
        return Err(CredentialError::NotAToken);
    }

    // Some issuers pad the segments; base64url in tokens is normally unpadded.
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    let raw_claims: RawClaims = serde_json::from_slice(&bytes)?;
    Claims::try_from(raw_claims)
}
