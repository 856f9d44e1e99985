//! Session error types.

use thiserror::Error;

use crate::credential::CredentialError;
use crate::storage::StorageError;

/// Ways an auth response can fail to describe a session.
#[derive(Debug, Error)]
pub enum MalformedResponse {
    /// The body is not the expected JSON envelope.
    #[error("response body is not an auth envelope: {0}")]
    Json(#[from] serde_json::Error),

    /// `success` was true but `data` was absent.
    #[error("successful response has no data")]
    MissingData,

    /// `data` carried no token.
    #[error("successful response has no token")]
    MissingToken,

    /// The token's claims do not describe an identity.
    #[error("token does not describe an identity: {0}")]
    Credential(#[from] CredentialError),
}

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The auth service returned a shape the client cannot use.
    #[error("malformed auth response: {0}")]
    MalformedResponse(#[from] MalformedResponse),

    /// The auth service reported failure.
    #[error("auth service rejected the request: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected {
        /// Message from the service, if it sent one.
        message: Option<String>,
    },

    /// Persisting the session failed; nothing was changed.
    #[error("session storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<CredentialError> for AuthError {
    fn from(err: CredentialError) -> Self {
        Self::MalformedResponse(MalformedResponse::Credential(err))
    }
}
