//! User records and the credential store contract.

use crate::auth::otp::OtpChallenge;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// Verification status of a user record.
///
/// The challenge lives inside `Pending` only, so "challenge while verified"
/// is unrepresentable. `Pending` keeps it optional: a pending record whose
/// challenge was never installed (or already consumed) still loads, and
/// validation treats it as "nothing requested".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationState {
    Pending { challenge: Option<OtpChallenge> },
    Verified,
}

/// A user record. Keyed by `email`, stored verbatim (case-sensitive).
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Opaque Argon2id PHC string; never reversible.
    pub password_hash: String,
    pub state: VerificationState,
}

impl User {
    /// Create a fresh record in the pending state with an outstanding
    /// challenge, as `register` does.
    #[must_use]
    pub fn new(email: String, password_hash: String, challenge: OtpChallenge) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            state: VerificationState::Pending {
                challenge: Some(challenge),
            },
        }
    }

    #[must_use]
    pub fn is_verified(&self) -> bool {
        matches!(self.state, VerificationState::Verified)
    }

    /// The outstanding challenge, if the record is pending and has one.
    #[must_use]
    pub fn challenge(&self) -> Option<&OtpChallenge> {
        match &self.state {
            VerificationState::Pending { challenge } => challenge.as_ref(),
            VerificationState::Verified => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistence contract for user records.
///
/// `save` is an atomic whole-record write; there is no cross-call
/// transaction or version token, so read-then-write flows race with
/// last-save-wins semantics by design.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a record by its exact email. Absence is a normal `Ok(None)`.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// `Conflict` if a record with the same email already exists.
    async fn create(&self, user: &User) -> Result<(), StoreError>;

    /// Persist an in-place mutation of an existing record.
    async fn save(&self, user: &User) -> Result<(), StoreError>;
}
