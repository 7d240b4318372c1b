//! State-machine tests for the authentication service.
//!
//! Drives register / verify-otp / login / resend-otp end to end against the
//! in-process store and notifier doubles; no external infrastructure.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use ensaluti::auth::{AuthError, AuthService, LoginOutcome, TokenIssuer};
use ensaluti::email::{Notifier, NotifyError};
use ensaluti::store::{CredentialStore, MemoryCredentialStore, VerificationState};
use secrecy::SecretString;
use std::sync::{Arc, Mutex};

/// Records every dispatched (recipient, code) pair.
#[derive(Debug, Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    fn last_code(&self) -> String {
        self.sent.lock().unwrap().last().unwrap().1.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_otp(&self, to: &str, code: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), code.to_string()));
        Ok(())
    }
}

/// Refuses every send, like a relay that is down.
#[derive(Debug, Default)]
struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send_otp(&self, _to: &str, _code: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Rejected { status: 502 })
    }
}

struct Harness {
    service: AuthService,
    store: Arc<MemoryCredentialStore>,
    notifier: Arc<RecordingNotifier>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryCredentialStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = AuthService::new(
        store.clone(),
        notifier.clone(),
        TokenIssuer::new(&SecretString::from("test_secret_key".to_string())),
    );
    Harness {
        service,
        store,
        notifier,
    }
}

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

#[tokio::test]
async fn register_creates_pending_record_and_dispatches_code() {
    let h = harness();
    let outcome = h.service.register("a@x.com", "pw1", t0()).await.unwrap();
    assert!(outcome.requires_otp);

    let user = h.store.find_by_email("a@x.com").await.unwrap().unwrap();
    assert!(!user.is_verified());
    let challenge = user.challenge().expect("fresh record has a challenge");
    assert_eq!(challenge.expires_at, t0() + Duration::minutes(10));

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "a@x.com");
    assert_eq!(sent[0].1, challenge.code);
}

#[tokio::test]
async fn duplicate_register_conflicts() {
    let h = harness();
    h.service.register("a@x.com", "pw1", t0()).await.unwrap();

    let err = h.service.register("a@x.com", "pw2", t0()).await.unwrap_err();
    assert!(matches!(err, AuthError::Conflict));
    // The conflicting attempt never dispatched anything.
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn same_password_persists_different_hashes() {
    let h = harness();
    h.service.register("a@x.com", "pw1", t0()).await.unwrap();
    h.service.register("b@x.com", "pw1", t0()).await.unwrap();

    let first = h.store.find_by_email("a@x.com").await.unwrap().unwrap();
    let second = h.store.find_by_email("b@x.com").await.unwrap().unwrap();
    assert_ne!(first.password_hash, second.password_hash);
    assert!(!first.password_hash.contains("pw1"));
}

#[tokio::test]
async fn verify_with_wrong_code_is_mismatch() {
    let h = harness();
    h.service.register("a@x.com", "pw1", t0()).await.unwrap();
    let code = h.notifier.last_code();
    let wrong = if code == "1000" { "1001" } else { "1000" };

    let err = h.service.verify_otp("a@x.com", wrong, t0()).await.unwrap_err();
    assert!(matches!(err, AuthError::Mismatch));
}

#[tokio::test]
async fn verify_past_the_window_is_expired_even_with_the_right_code() {
    let h = harness();
    h.service.register("a@x.com", "pw1", t0()).await.unwrap();
    let code = h.notifier.last_code();

    let late = t0() + Duration::minutes(10) + Duration::seconds(1);
    let err = h.service.verify_otp("a@x.com", &code, late).await.unwrap_err();
    assert!(matches!(err, AuthError::Expired));

    // Wrong AND expired still reports expired.
    let err = h.service.verify_otp("a@x.com", "0000", late).await.unwrap_err();
    assert!(matches!(err, AuthError::Expired));
}

#[tokio::test]
async fn verify_unknown_email_is_not_found() {
    let h = harness();
    let err = h.service.verify_otp("a@x.com", "1234", t0()).await.unwrap_err();
    assert!(matches!(err, AuthError::NotFound));
}

#[tokio::test]
async fn successful_verify_issues_session_and_clears_challenge() {
    let h = harness();
    h.service.register("a@x.com", "pw1", t0()).await.unwrap();
    let code = h.notifier.last_code();

    let session = h.service.verify_otp("a@x.com", &code, t0()).await.unwrap();
    assert_eq!(session.user.email, "a@x.com");
    assert!(session.user.is_verified);

    let user = h.store.find_by_email("a@x.com").await.unwrap().unwrap();
    assert!(user.is_verified());
    assert!(user.challenge().is_none());

    // The token asserts this user's id.
    let tokens = TokenIssuer::new(&SecretString::from("test_secret_key".to_string()));
    assert_eq!(tokens.verify(&session.token, t0()).unwrap(), user.id);

    // Replaying the consumed code fails with NoChallenge, not Mismatch.
    let err = h.service.verify_otp("a@x.com", &code, t0()).await.unwrap_err();
    assert!(matches!(err, AuthError::NoChallenge));
}

#[tokio::test]
async fn login_before_verification_replaces_the_challenge() {
    let h = harness();
    h.service.register("a@x.com", "pw1", t0()).await.unwrap();

    let login_at = t0() + Duration::minutes(5);
    let outcome = h.service.login("a@x.com", "pw1", login_at).await.unwrap();
    assert!(matches!(outcome, LoginOutcome::VerificationRequired));

    // The stored challenge is the newly dispatched one with a pushed-out
    // expiry; the original code is gone even though it had not expired.
    let user = h.store.find_by_email("a@x.com").await.unwrap().unwrap();
    let challenge = user.challenge().unwrap();
    assert_eq!(challenge.expires_at, login_at + Duration::minutes(10));
    assert_eq!(h.notifier.sent().len(), 2);
    assert_eq!(challenge.code, h.notifier.last_code());
}

#[tokio::test]
async fn login_never_issues_a_token_for_an_unverified_user() {
    let h = harness();
    h.service.register("a@x.com", "pw1", t0()).await.unwrap();

    match h.service.login("a@x.com", "pw1", t0()).await.unwrap() {
        LoginOutcome::VerificationRequired => {}
        LoginOutcome::Session(_) => panic!("unverified login must not produce a session"),
    }
}

#[tokio::test]
async fn login_with_wrong_password_is_invalid_credentials() {
    let h = harness();
    h.service.register("a@x.com", "pw1", t0()).await.unwrap();

    let err = h.service.login("a@x.com", "wrong", t0()).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
    // No challenge refresh happened on the failed attempt.
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn login_with_unknown_email_is_the_same_invalid_credentials() {
    let h = harness();
    let err = h.service.login("ghost@x.com", "pw1", t0()).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn login_after_verification_issues_a_session() {
    let h = harness();
    h.service.register("a@x.com", "pw1", t0()).await.unwrap();
    let code = h.notifier.last_code();
    h.service.verify_otp("a@x.com", &code, t0()).await.unwrap();

    let outcome = h.service.login("a@x.com", "pw1", t0()).await.unwrap();
    let LoginOutcome::Session(session) = outcome else {
        panic!("verified login must produce a session");
    };
    assert!(session.user.is_verified);

    // Logging in does not install a challenge on a verified account.
    let user = h.store.find_by_email("a@x.com").await.unwrap().unwrap();
    assert!(user.challenge().is_none());
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn emails_are_case_sensitive() {
    let h = harness();
    h.service.register("A@x.com", "pw1", t0()).await.unwrap();

    // Lookup under different casing misses, so login is undifferentiated.
    let err = h.service.login("a@x.com", "pw1", t0()).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn resend_replaces_an_expired_challenge() {
    let h = harness();
    h.service.register("a@x.com", "pw1", t0()).await.unwrap();

    // Well past the first window.
    let resend_at = t0() + Duration::hours(1);
    h.service.resend_otp("a@x.com", resend_at).await.unwrap();

    let user = h.store.find_by_email("a@x.com").await.unwrap().unwrap();
    let challenge = user.challenge().unwrap();
    assert_eq!(challenge.expires_at, resend_at + Duration::minutes(10));

    // The fresh code redeems inside its own window.
    let fresh = h.notifier.last_code();
    let session = h
        .service
        .verify_otp("a@x.com", &fresh, resend_at + Duration::minutes(5))
        .await
        .unwrap();
    assert!(session.user.is_verified);
}

#[tokio::test]
async fn resend_for_unknown_email_is_not_found() {
    let h = harness();
    let err = h.service.resend_otp("ghost@x.com", t0()).await.unwrap_err();
    assert!(matches!(err, AuthError::NotFound));
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn resend_on_a_verified_account_sends_an_inert_code() {
    let h = harness();
    h.service.register("a@x.com", "pw1", t0()).await.unwrap();
    let code = h.notifier.last_code();
    h.service.verify_otp("a@x.com", &code, t0()).await.unwrap();

    // Unguarded by design: the call succeeds and an email goes out...
    h.service.resend_otp("a@x.com", t0()).await.unwrap();
    assert_eq!(h.notifier.sent().len(), 2);

    // ...but the record stays verified with nothing to redeem.
    let user = h.store.find_by_email("a@x.com").await.unwrap().unwrap();
    assert!(matches!(user.state, VerificationState::Verified));
    let mailed = h.notifier.last_code();
    let err = h.service.verify_otp("a@x.com", &mailed, t0()).await.unwrap_err();
    assert!(matches!(err, AuthError::NoChallenge));
}

#[tokio::test]
async fn failed_notification_leaves_the_registration_behind() {
    let store = Arc::new(MemoryCredentialStore::new());
    let broken = AuthService::new(
        store.clone(),
        Arc::new(FailingNotifier),
        TokenIssuer::new(&SecretString::from("test_secret_key".to_string())),
    );

    let err = broken.register("a@x.com", "pw1", t0()).await.unwrap_err();
    assert!(matches!(err, AuthError::Notification(_)));

    // No rollback: the record exists, pending, with a challenge the user
    // never received.
    let user = store.find_by_email("a@x.com").await.unwrap().unwrap();
    assert!(!user.is_verified());
    assert!(user.challenge().is_some());

    // Recovery path: a resend through a working notifier on the same store.
    let notifier = Arc::new(RecordingNotifier::default());
    let recovered = AuthService::new(
        store.clone(),
        notifier.clone(),
        TokenIssuer::new(&SecretString::from("test_secret_key".to_string())),
    );
    let resend_at = t0() + Duration::minutes(1);
    recovered.resend_otp("a@x.com", resend_at).await.unwrap();

    let fresh = notifier.last_code();
    let session = recovered
        .verify_otp("a@x.com", &fresh, resend_at)
        .await
        .unwrap();
    assert!(session.user.is_verified);
}

#[tokio::test]
async fn concurrent_resends_last_save_wins() {
    let h = harness();
    h.service.register("a@x.com", "pw1", t0()).await.unwrap();

    let first_at = t0() + Duration::minutes(1);
    let second_at = t0() + Duration::minutes(2);
    h.service.resend_otp("a@x.com", first_at).await.unwrap();
    h.service.resend_otp("a@x.com", second_at).await.unwrap();

    // Only the most recent save is redeemable.
    let user = h.store.find_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(
        user.challenge().unwrap().expires_at,
        second_at + Duration::minutes(10)
    );
    assert_eq!(user.challenge().unwrap().code, h.notifier.last_code());
}
