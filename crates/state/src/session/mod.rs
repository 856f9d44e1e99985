//! Session store.
//!
//! Owns the bearer credential and the identity derived from it. Both are
//! persisted under their own keys and always written and cleared together:
//! an identity is present exactly when a credential is.
//!
//! Identity changes are published through a replay-latest [`Observable`],
//! so a view that subscribes after a login still starts from the signed-in
//! identity.

mod error;
mod response;

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tracing::{debug, info, instrument, warn};

pub use error::{AuthError, MalformedResponse};
pub use response::{AuthPayload, AuthResponse};

use crate::credential::Credential;
use crate::identity::Identity;
use crate::observable::{Observable, Subscription};
use crate::storage::{DurableStore, StorageKeys, decode_record, encode_record, lock};

/// Persisted, observable session state.
pub struct SessionStore {
    storage: Arc<dyn DurableStore>,
    keys: StorageKeys,
    identity: Observable<Option<Identity>>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("keys", &self.keys)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a signed-out store over `storage`.
    ///
    /// Call [`restore_from_storage`](Self::restore_from_storage) once at
    /// start-up to pick up a session persisted by a previous run.
    #[must_use]
    pub fn new(storage: Arc<dyn DurableStore>, keys: StorageKeys) -> Self {
        Self {
            storage,
            keys,
            identity: Observable::new(None),
            write_lock: Mutex::new(()),
        }
    }

    /// Establish a session from a login or register response.
    ///
    /// On success the credential and identity are persisted, the identity is
    /// published, and returned. On any error nothing is written or published.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Rejected`] if the response reports failure
    /// - [`AuthError::MalformedResponse`] if the token is missing or its
    ///   claims do not describe an identity
    /// - [`AuthError::Storage`] if persisting fails
    #[instrument(skip_all, fields(success = response.success))]
    pub fn derive_from_credential(&self, response: AuthResponse) -> Result<Identity, AuthError> {
        let credential = Credential::parse(response.into_token()?)?;
        if credential.is_expired() {
            warn!("auth service issued a credential that is already expired");
        }
        let identity = credential.identity();
        let record = encode_record(&identity).map_err(crate::storage::StorageError::from)?;

        {
            let _guard = lock(&self.write_lock);
            let previous = self.storage.get(&self.keys.credential);

            self.storage.set(&self.keys.credential, credential.expose())?;
            if let Err(err) = self.storage.set(&self.keys.identity, &record) {
                let rollback = match previous {
                    Some(previous) => self.storage.set(&self.keys.credential, &previous),
                    None => self.storage.remove(&self.keys.credential),
                };
                if let Err(rollback_err) = rollback {
                    warn!(error = %rollback_err, "failed to roll back credential write");
                }
                return Err(err.into());
            }

            self.identity.stage(Some(identity.clone()));
        }
        self.identity.flush();

        info!(user_id = %identity.id(), role = %identity.role(), "session established");
        Ok(identity)
    }

    /// Parse a raw response body and establish a session from it.
    ///
    /// # Errors
    ///
    /// As [`derive_from_credential`](Self::derive_from_credential), plus
    /// [`AuthError::MalformedResponse`] if the body is not the envelope.
    pub fn derive_from_json(&self, body: &str) -> Result<Identity, AuthError> {
        self.derive_from_credential(AuthResponse::from_json(body)?)
    }

    /// Load the persisted session and publish it.
    ///
    /// A corrupt identity record, or a credential without an identity (or
    /// the reverse), is logged and cleared; the store then starts signed out.
    #[instrument(skip(self))]
    pub fn restore_from_storage(&self) -> Option<Identity> {
        let restored = {
            let _guard = lock(&self.write_lock);
            let has_credential = self.storage.get(&self.keys.credential).is_some();
            let stored = self.storage.get(&self.keys.identity);
            let has_record = stored.is_some();

            let identity = stored.and_then(|raw| {
                decode_record::<Identity>(&raw)
                    .inspect_err(|err| warn!(error = %err, "discarding corrupt identity record"))
                    .ok()
            });

            let restored = match identity {
                Some(identity) if has_credential => Some(identity),
                _ => {
                    if has_credential || has_record {
                        warn!(has_credential, has_record, "clearing incomplete session");
                        self.clear_best_effort();
                    }
                    None
                }
            };
            self.identity.stage(restored.clone());
            restored
        };
        self.identity.flush();

        match &restored {
            Some(identity) => debug!(user_id = %identity.id(), "session restored"),
            None => debug!("no session to restore"),
        }
        restored
    }

    /// Current identity, if signed in.
    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.identity.get()
    }

    /// Identity changes, replaying the current value to new subscribers.
    #[must_use]
    pub const fn identity_changes(&self) -> &Observable<Option<Identity>> {
        &self.identity
    }

    /// Shorthand for `identity_changes().subscribe(callback)`.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Option<Identity>) + Send + Sync + 'static,
    {
        self.identity.subscribe(callback)
    }

    /// The stored bearer credential.
    #[must_use]
    pub fn credential(&self) -> Option<SecretString> {
        self.storage.get(&self.keys.credential).map(SecretString::from)
    }

    /// `Authorization` header value for protected API calls.
    #[must_use]
    pub fn authorization_header(&self) -> Option<SecretString> {
        self.storage
            .get(&self.keys.credential)
            .map(|token| SecretString::from(format!("Bearer {token}")))
    }

    /// Expiry of the stored credential, if it carries one and still decodes.
    #[must_use]
    pub fn credential_expires_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.storage.get(&self.keys.credential)?;
        Credential::parse(raw).ok()?.expires_at()
    }

    /// Whether a credential is stored and an identity is loaded.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.storage.get(&self.keys.credential).is_some() && self.identity.with(Option::is_some)
    }

    /// Whether the signed-in user is an admin.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_authenticated() && self.identity.with(|id| id.as_ref().is_some_and(Identity::is_admin))
    }

    /// End the session.
    ///
    /// Clears the credential and identity from storage, then publishes
    /// `None`. Calling it while signed out still publishes `None` once.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the credential cannot be removed;
    /// the session is then left as it was.
    #[instrument(skip(self))]
    pub fn logout(&self) -> Result<(), AuthError> {
        let previous = {
            let _guard = lock(&self.write_lock);
            self.storage.remove(&self.keys.credential)?;
            if let Err(err) = self.storage.remove(&self.keys.identity) {
                // Without a credential the leftover record is cleared on the
                // next restore.
                warn!(error = %err, "failed to remove identity record");
            }
            let previous = self.identity.get();
            self.identity.stage(None);
            previous
        };
        self.identity.flush();

        match previous {
            Some(identity) => info!(user_id = %identity.id(), "signed out"),
            None => debug!("logout while signed out"),
        }
        Ok(())
    }

    fn clear_best_effort(&self) {
        for key in [&self.keys.credential, &self.keys.identity] {
            if let Err(err) = self.storage.remove(key) {
                warn!(key = %key, error = %err, "failed to clear session key");
            }
        }
    }
}
