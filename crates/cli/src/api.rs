//! Auth API client.
//!
//! `POST {api}/auth/login` and `POST {api}/auth/register` both answer with the
//! [`AuthResponse`] envelope. The envelope is handed to the session store
//! unchanged; the store decides what counts as a session.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use shopfront_state::AuthResponse;
use tracing::instrument;

use crate::error::CliError;

/// Longest error body kept in [`CliError::Api`].
const MAX_ERROR_BODY: usize = 512;

/// Request body for login.
#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Request body for registration.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    email: &'a str,
    username: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<&'a str>,
}

/// New account details.
#[derive(Debug, Clone)]
pub struct Registration<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

/// HTTP client for the auth endpoints.
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    /// Create a client for the API at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Exchange email and password for an auth envelope.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Http` if the request fails, or `CliError::Api` if
    /// the server answers an error status without an envelope.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthResponse, CliError> {
        let body = LoginRequest {
            email,
            password: password.expose_secret(),
        };
        self.post("auth/login", &body).await
    }

    /// Create an account and receive an auth envelope.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Http` if the request fails, or `CliError::Api` if
    /// the server answers an error status without an envelope.
    #[instrument(skip(self, registration, password), fields(email = %registration.email))]
    pub async fn register(
        &self,
        registration: &Registration<'_>,
        password: &SecretString,
    ) -> Result<AuthResponse, CliError> {
        let body = RegisterRequest {
            email: registration.email,
            username: registration.username,
            password: password.expose_secret(),
            first_name: registration.first_name,
            last_name: registration.last_name,
        };
        self.post("auth/register", &body).await
    }

    async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<AuthResponse, CliError> {
        let response = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        // Failures such as bad credentials still come back as an envelope
        // with `success: false`, usually under a 4xx status.
        match AuthResponse::from_json(&text) {
            Ok(envelope) => Ok(envelope),
            Err(err) if status.is_success() => {
                tracing::warn!(error = %err, "auth API answered with an unexpected body");
                Err(CliError::Auth(err.into()))
            }
            Err(_) => Err(CliError::Api {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY).collect(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_omits_absent_names() {
        let body = RegisterRequest {
            email: "ada@shop.com",
            username: "ada",
            password: "hunter2",
            first_name: Some("Ada"),
            last_name: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["firstName"], "Ada");
        assert!(json.get("lastName").is_none());
    }

    #[test]
    fn test_login_request_shape() {
        let body = LoginRequest {
            email: "ada@shop.com",
            password: "hunter2",
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"email": "ada@shop.com", "password": "hunter2"})
        );
    }
}
