//! Session store lifecycle across store instances.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use shopfront_core::{Role, UserId};
use shopfront_integration_tests::{Recorder, login_as, temp_state_file, token};
use shopfront_state::{
    AuthError, AuthResponse, DurableStore, FileStore, Identity, MalformedResponse, MemoryStore,
    SessionStore, StorageKeys,
};

fn session_over(memory: &MemoryStore) -> SessionStore {
    SessionStore::new(Arc::new(memory.clone()), StorageKeys::default())
}

// ============================================================================
// Login and restore
// ============================================================================

#[test]
fn test_login_then_restore_in_fresh_store() {
    let memory = MemoryStore::new();
    let session = session_over(&memory);

    let identity = session.derive_from_credential(login_as(42, "User")).unwrap();
    assert!(session.is_authenticated());
    assert_eq!(identity.id(), UserId::new(42));
    assert_eq!(identity.email().as_str(), "user42@shop.test");
    assert_eq!(identity.display_name(), "user42");

    let restarted = session_over(&memory);
    assert!(!restarted.is_authenticated());
    let restored = restarted.restore_from_storage();
    assert_eq!(restored.as_ref(), Some(&identity));
    assert_eq!(restarted.current_identity(), Some(identity));
    assert!(restarted.is_authenticated());
}

#[test]
fn test_restore_through_state_file() {
    let path = temp_state_file();
    {
        let session = SessionStore::new(Arc::new(FileStore::open(path.clone())), StorageKeys::default());
        session.derive_from_credential(login_as(7, "Admin")).unwrap();
    }

    let session = SessionStore::new(Arc::new(FileStore::open(path.clone())), StorageKeys::default());
    let restored = session.restore_from_storage().unwrap();
    assert_eq!(restored.role(), Role::Admin);
    assert!(session.is_admin());

    let _ = std::fs::remove_file(path);
}

#[test]
fn test_authorization_header_carries_credential() {
    let memory = MemoryStore::new();
    let session = session_over(&memory);
    let raw = token(3, "c@shop.test", "User");
    session
        .derive_from_credential(AuthResponse::success(raw.clone()))
        .unwrap();

    let header = session.authorization_header().unwrap();
    assert_eq!(secrecy::ExposeSecret::expose_secret(&header), format!("Bearer {raw}"));
}

// ============================================================================
// Rejected and malformed responses
// ============================================================================

#[test]
fn test_failed_response_writes_nothing() {
    let memory = MemoryStore::new();
    let session = session_over(&memory);
    let recorder = Recorder::<Option<Identity>>::new();
    let _sub = session.subscribe(recorder.callback());

    let err = session
        .derive_from_json(r#"{"success":false,"message":"Invalid email or password"}"#)
        .unwrap_err();

    match err {
        AuthError::Rejected { message } => {
            assert_eq!(message.as_deref(), Some("Invalid email or password"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert!(memory.is_empty());
    assert_eq!(session.current_identity(), None);
    assert!(!session.is_authenticated());
    // Only the replay on subscribe.
    assert_eq!(recorder.values(), vec![None]);
}

#[test]
fn test_malformed_responses_write_nothing() {
    let memory = MemoryStore::new();
    let session = session_over(&memory);

    for body in [
        r#"{"success":true}"#,
        r#"{"success":true,"data":{}}"#,
        r#"{"success":true,"data":{"token":"not-a-token"}}"#,
        r#"{"token":"abc"}"#,
        "<html>502</html>",
    ] {
        let err = session.derive_from_json(body).unwrap_err();
        assert!(
            matches!(err, AuthError::MalformedResponse(_)),
            "{body}: expected MalformedResponse, got {err:?}"
        );
    }
    assert!(matches!(
        session.derive_from_json(r#"{"success":true}"#),
        Err(AuthError::MalformedResponse(MalformedResponse::MissingData))
    ));
    assert!(memory.is_empty());
    assert!(!session.is_authenticated());
}

#[test]
fn test_failed_login_keeps_previous_session() {
    let memory = MemoryStore::new();
    let session = session_over(&memory);
    let identity = session.derive_from_credential(login_as(1, "User")).unwrap();

    assert!(session
        .derive_from_credential(AuthResponse::failure(None))
        .is_err());
    assert_eq!(session.current_identity(), Some(identity));
    assert!(session.is_authenticated());
}

// ============================================================================
// Logout
// ============================================================================

#[test]
fn test_logout_publishes_absent_once_per_call() {
    let memory = MemoryStore::new();
    let session = session_over(&memory);
    let identity = session.derive_from_credential(login_as(5, "User")).unwrap();

    let recorder = Recorder::<Option<Identity>>::new();
    let _sub = session.subscribe(recorder.callback());
    assert_eq!(recorder.values(), vec![Some(identity)]);
    recorder.reset();

    session.logout().unwrap();
    assert_eq!(recorder.values(), vec![None]);
    assert_eq!(session.current_identity(), None);
    assert!(!session.is_authenticated());
    assert!(memory.is_empty());

    session.logout().unwrap();
    assert_eq!(recorder.values(), vec![None, None]);
}

#[test]
fn test_logout_is_persisted_before_subscribers_run() {
    let memory = MemoryStore::new();
    let session = session_over(&memory);
    session.derive_from_credential(login_as(5, "User")).unwrap();

    let observed = Recorder::<bool>::new();
    let record = observed.callback();
    let probe = memory.clone();
    let keys = StorageKeys::default();
    let _sub = session.subscribe(move |identity: &Option<Identity>| {
        if identity.is_none() {
            record(&probe.get(&keys.credential).is_none());
        }
    });

    session.logout().unwrap();
    assert_eq!(observed.values(), vec![true]);
}

#[test]
fn test_identity_without_credential_is_not_restored() {
    let memory = MemoryStore::new();
    let session = session_over(&memory);
    session.derive_from_credential(login_as(9, "User")).unwrap();
    memory.remove(&StorageKeys::default().credential).unwrap();

    let restarted = session_over(&memory);
    assert_eq!(restarted.restore_from_storage(), None);
    assert!(!restarted.is_authenticated());
    assert!(memory.is_empty());
}
