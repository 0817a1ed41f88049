use super::*;
use crate::test_helpers::{admin_user, plain_user};
use crate::util::token_persistence::MemoryTokenStorage;

fn handle_with(storage: &Arc<MemoryTokenStorage>) -> SessionHandle {
    SessionHandle::restore(storage.clone())
}

fn assert_invariant(handle: &SessionHandle) {
    let snap = handle.snapshot();
    if snap.status == SessionStatus::Authenticated {
        assert!(snap.token.is_some(), "authenticated without token");
        assert!(snap.user.is_some(), "authenticated without user");
    }
}

// =============================================================================
// restore
// =============================================================================

#[test]
fn restore_reads_persisted_token() {
    let storage = Arc::new(MemoryTokenStorage::with_token("persisted"));
    let handle = handle_with(&storage);
    let snap = handle.snapshot();
    assert_eq!(snap.token.as_deref(), Some("persisted"));
    assert!(snap.user.is_none());
    assert_eq!(snap.status, SessionStatus::Idle);
    assert!(!handle.is_authenticated());
}

#[test]
fn restore_without_token() {
    let storage = Arc::new(MemoryTokenStorage::new());
    let handle = handle_with(&storage);
    assert_eq!(handle.snapshot(), Session::default());
}

// =============================================================================
// logout
// =============================================================================

#[test]
fn logout_clears_everything() {
    let storage = Arc::new(MemoryTokenStorage::new());
    let handle = handle_with(&storage);
    let ticket = handle.begin_action();
    let ticket = handle.install_token(ticket, "tok".into()).unwrap();
    assert!(handle.complete_fetch(ticket, plain_user()));
    assert!(handle.is_authenticated());

    handle.logout();
    let snap = handle.snapshot();
    assert!(snap.token.is_none());
    assert!(snap.user.is_none());
    assert_eq!(snap.status, SessionStatus::Idle);
    assert_eq!(storage.load(), None);
}

#[test]
fn logout_twice_matches_once() {
    let storage = Arc::new(MemoryTokenStorage::with_token("tok"));
    let handle = handle_with(&storage);
    handle.logout();
    let once = handle.snapshot();
    handle.logout();
    assert_eq!(handle.snapshot(), once);
    assert_eq!(storage.load(), None);
}

#[test]
fn logout_keeps_error_message() {
    let storage = Arc::new(MemoryTokenStorage::new());
    let handle = handle_with(&storage);
    handle.mark_error("boom".into());
    handle.logout();
    assert_eq!(handle.error_message(), "boom");
    assert_eq!(handle.status(), SessionStatus::Idle);
}

// =============================================================================
// action steps
// =============================================================================

#[test]
fn begin_action_sets_loading_and_clears_error() {
    let storage = Arc::new(MemoryTokenStorage::new());
    let handle = handle_with(&storage);
    handle.mark_error("old".into());
    handle.begin_action();
    assert_eq!(handle.status(), SessionStatus::Loading);
    assert_eq!(handle.error_message(), "");
}

#[test]
fn begin_fetch_without_token_is_noop() {
    let storage = Arc::new(MemoryTokenStorage::new());
    let handle = handle_with(&storage);
    assert!(handle.begin_fetch().is_none());
    assert_eq!(handle.status(), SessionStatus::Idle);
}

#[test]
fn begin_fetch_with_token_sets_loading() {
    let storage = Arc::new(MemoryTokenStorage::with_token("tok"));
    let handle = handle_with(&storage);
    assert!(handle.begin_fetch().is_some());
    assert_eq!(handle.status(), SessionStatus::Loading);
}

#[test]
fn install_token_persists_and_marks_success() {
    let storage = Arc::new(MemoryTokenStorage::new());
    let handle = handle_with(&storage);
    let ticket = handle.begin_action();
    handle.install_token(ticket, "fresh".into()).unwrap();
    assert_eq!(handle.token().as_deref(), Some("fresh"));
    assert_eq!(handle.status(), SessionStatus::Success);
    assert_eq!(storage.load().as_deref(), Some("fresh"));
    assert!(!handle.is_authenticated());
}

#[test]
fn install_token_after_logout_is_superseded() {
    let storage = Arc::new(MemoryTokenStorage::new());
    let handle = handle_with(&storage);
    let ticket = handle.begin_action();
    handle.logout();
    let err = handle.install_token(ticket, "late".into()).unwrap_err();
    assert!(matches!(err, ClientError::Superseded));
    assert!(handle.token().is_none());
    assert_eq!(storage.load(), None);
}

#[test]
fn complete_fetch_authenticates() {
    let storage = Arc::new(MemoryTokenStorage::with_token("tok"));
    let handle = handle_with(&storage);
    let ticket = handle.begin_fetch().unwrap();
    assert!(handle.complete_fetch(ticket, admin_user()));
    assert!(handle.is_authenticated());
    assert_eq!(handle.current_user().map(|u| u.username), Some("root".to_owned()));
    assert_invariant(&handle);
}

#[test]
fn stale_fetch_does_not_resurrect_user() {
    let storage = Arc::new(MemoryTokenStorage::with_token("tok"));
    let handle = handle_with(&storage);
    let ticket = handle.begin_fetch().unwrap();
    handle.logout();
    assert!(!handle.complete_fetch(ticket, plain_user()));
    assert!(handle.current_user().is_none());
    assert_eq!(handle.status(), SessionStatus::Idle);
    assert_invariant(&handle);
}

#[test]
fn fetch_from_previous_login_is_stale() {
    let storage = Arc::new(MemoryTokenStorage::with_token("old"));
    let handle = handle_with(&storage);
    let old_fetch = handle.begin_fetch().unwrap();
    let login = handle.begin_action();
    handle.install_token(login, "new".into()).unwrap();
    assert!(!handle.complete_fetch(old_fetch, plain_user()));
    assert!(handle.current_user().is_none());
}

#[test]
fn logout_if_current_skips_stale_ticket() {
    let storage = Arc::new(MemoryTokenStorage::with_token("tok"));
    let handle = handle_with(&storage);
    let stale = handle.begin_fetch().unwrap();
    let login = handle.begin_action();
    handle.install_token(login, "newer".into()).unwrap();
    assert!(!handle.logout_if_current(stale));
    assert_eq!(handle.token().as_deref(), Some("newer"));
}

#[test]
fn logout_bumps_epoch_once() {
    let storage = Arc::new(MemoryTokenStorage::new());
    let handle = handle_with(&storage);
    let before = handle.epoch();
    handle.logout();
    assert_eq!(handle.epoch(), before + 1);
}

#[test]
fn reject_token_drops_matching_token() {
    let storage = Arc::new(MemoryTokenStorage::with_token("expired"));
    let handle = handle_with(&storage);
    assert!(handle.reject_token(Some("expired")));
    assert!(handle.token().is_none());
    assert_eq!(handle.status(), SessionStatus::Idle);
    assert_eq!(storage.load(), None);
}

#[test]
fn reject_token_keeps_newer_token() {
    let storage = Arc::new(MemoryTokenStorage::with_token("old"));
    let handle = handle_with(&storage);
    let login = handle.begin_action();
    handle.install_token(login, "newer".into()).unwrap();
    let before = handle.epoch();

    assert!(!handle.reject_token(Some("old")));
    assert_eq!(handle.token().as_deref(), Some("newer"));
    assert_eq!(storage.load().as_deref(), Some("newer"));
    assert_eq!(handle.epoch(), before);
}

#[test]
fn reject_token_does_not_supersede_login() {
    let storage = Arc::new(MemoryTokenStorage::with_token("expired"));
    let handle = handle_with(&storage);
    let fetch = handle.begin_fetch().unwrap();
    let login = handle.begin_action();

    assert!(handle.reject_token(Some("expired")));
    assert!(!handle.logout_if_current(fetch));
    handle.install_token(login, "fresh".into()).unwrap();
    assert_eq!(handle.token().as_deref(), Some("fresh"));
    assert_eq!(handle.status(), SessionStatus::Success);
}

#[test]
fn dropping_credentials_does_not_supersede_login() {
    let storage = Arc::new(MemoryTokenStorage::with_token("expired"));
    let handle = handle_with(&storage);
    let fetch = handle.begin_fetch().unwrap();
    let login = handle.begin_action();

    assert!(handle.logout_if_current(fetch));
    assert!(handle.install_token(login, "fresh".into()).is_ok());
}

#[test]
fn fail_login_tears_down() {
    let storage = Arc::new(MemoryTokenStorage::with_token("tok"));
    let handle = handle_with(&storage);
    let ticket = handle.begin_action();
    assert!(handle.fail_login(ticket, "Bad credentials".into()));
    let snap = handle.snapshot();
    assert!(snap.token.is_none());
    assert!(snap.user.is_none());
    assert_eq!(snap.status, SessionStatus::Error);
    assert_eq!(snap.error_message, "Bad credentials");
    assert_eq!(storage.load(), None);
}

#[test]
fn fail_login_skipped_after_newer_login() {
    let storage = Arc::new(MemoryTokenStorage::new());
    let handle = handle_with(&storage);
    let first = handle.begin_action();
    let second = handle.begin_action();
    let second = handle.install_token(second, "winner".into()).unwrap();
    assert!(handle.complete_fetch(second, plain_user()));

    assert!(!handle.fail_login(first, "late failure".into()));
    assert!(handle.is_authenticated());
    assert_eq!(storage.load().as_deref(), Some("winner"));
}

#[test]
fn clear_error_leaves_other_fields() {
    let storage = Arc::new(MemoryTokenStorage::with_token("tok"));
    let handle = handle_with(&storage);
    handle.mark_error("oops".into());
    handle.clear_error();
    let snap = handle.snapshot();
    assert_eq!(snap.error_message, "");
    assert_eq!(snap.status, SessionStatus::Error);
    assert_eq!(snap.token.as_deref(), Some("tok"));
}

#[test]
fn clones_share_state() {
    let storage = Arc::new(MemoryTokenStorage::with_token("tok"));
    let handle = handle_with(&storage);
    let other = handle.clone();
    other.logout();
    assert!(handle.token().is_none());
}

#[test]
fn debug_does_not_leak_token() {
    let storage = Arc::new(MemoryTokenStorage::with_token("super-secret-token"));
    let handle = handle_with(&storage);
    let debug = format!("{handle:?}");
    assert!(!debug.contains("super-secret-token"));
    assert!(debug.contains("has_token"));
}
