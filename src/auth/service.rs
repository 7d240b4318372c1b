//! The authentication state machine.
//!
//! `AuthService` is the only component with business-level transition
//! logic. It composes the credential store, the notifier, and the token
//! issuer; the HTTP layer above it only translates outcomes and errors.
//!
//! Flows are read-then-decide-then-write with no optimistic concurrency
//! token: two concurrent challenge refreshes for the same email race and
//! the last save wins, leaving the loser's emailed code invalid. Callers
//! recover by retrying with whichever code actually arrived.

use crate::auth::error::AuthError;
use crate::auth::otp::{self, OtpChallenge};
use crate::auth::password;
use crate::auth::token::TokenIssuer;
use crate::email::Notifier;
use crate::store::{CredentialStore, User, VerificationState};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// Public view of a user record, safe to return to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicUser {
    pub email: String,
    pub is_verified: bool,
}

/// Result of a successful registration.
#[derive(Debug, Clone, Copy)]
pub struct RegisterOutcome {
    /// Always true in this flow: the account starts unverified.
    pub requires_otp: bool,
}

/// A freshly issued session with the user it belongs to.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub token: String,
    pub user: PublicUser,
}

/// Result of a login with a correct password.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Verified account; a session was issued.
    Session(SessionOutcome),
    /// Account exists and the password matched, but the email is not yet
    /// verified; a fresh challenge was installed and dispatched.
    VerificationRequired,
}

pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
    tokens: TokenIssuer,
}

impl AuthService {
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            store,
            notifier,
            tokens,
        }
    }

    /// Create an unverified account and dispatch its first challenge.
    ///
    /// The record is created before notification; if the email cannot be
    /// handed off, the error propagates but the record stays. Recovery is
    /// `resend_otp`, never a compensating delete.
    ///
    /// # Errors
    ///
    /// `Conflict` if the email is taken, `Notification` if the code could
    /// not be dispatched, `Internal` on store or hashing failures.
    pub async fn register(
        &self,
        email: &str,
        plaintext_password: &str,
        now: DateTime<Utc>,
    ) -> Result<RegisterOutcome, AuthError> {
        if self.store.find_by_email(email).await?.is_some() {
            return Err(AuthError::Conflict);
        }

        let password_hash = password::hash(plaintext_password)?;
        let challenge = OtpChallenge::generate(now);
        let code = challenge.code.clone();

        let user = User::new(email.to_string(), password_hash, challenge);
        // The store enforces uniqueness again; two concurrent registers
        // cannot both pass the lookup above.
        self.store.create(&user).await?;

        info!(user_id = %user.id, "user registered, awaiting verification");

        self.notifier
            .send_otp(email, &code)
            .await
            .map_err(AuthError::Notification)?;

        Ok(RegisterOutcome { requires_otp: true })
    }

    /// Redeem an outstanding challenge and issue the first session.
    ///
    /// The only path that issues a token immediately after a transition
    /// into the verified state. Validation precedence: no challenge, then
    /// expiry, then code comparison.
    ///
    /// # Errors
    ///
    /// `NotFound`, `NoChallenge`, `Expired`, `Mismatch`, or `Internal`.
    pub async fn verify_otp(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionOutcome, AuthError> {
        let Some(mut user) = self.store.find_by_email(email).await? else {
            return Err(AuthError::NotFound);
        };

        otp::validate(user.challenge(), code, now)?;

        // Challenge cleared and status flipped in one whole-record write.
        user.state = VerificationState::Verified;
        self.store.save(&user).await?;

        info!(user_id = %user.id, "email verified");

        let token = self.tokens.sign(user.id, now)?;
        Ok(SessionOutcome {
            token,
            user: PublicUser {
                email: user.email,
                is_verified: true,
            },
        })
    }

    /// Authenticate with email and password.
    ///
    /// Unknown email and wrong password collapse into one undifferentiated
    /// `InvalidCredentials`. An unverified account with a correct password
    /// gets a replacement challenge (the old code dies even if unexpired)
    /// and a `VerificationRequired` outcome instead of a session.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials`, `Notification` (unverified branch), or
    /// `Internal`.
    pub async fn login(
        &self,
        email: &str,
        plaintext_password: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginOutcome, AuthError> {
        let Some(mut user) = self.store.find_by_email(email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        if !password::verify(plaintext_password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        match user.state {
            VerificationState::Pending { .. } => {
                let challenge = OtpChallenge::generate(now);
                let code = challenge.code.clone();
                user.state = VerificationState::Pending {
                    challenge: Some(challenge),
                };
                self.store.save(&user).await?;

                self.notifier
                    .send_otp(&user.email, &code)
                    .await
                    .map_err(AuthError::Notification)?;

                Ok(LoginOutcome::VerificationRequired)
            }
            VerificationState::Verified => {
                let token = self.tokens.sign(user.id, now)?;
                Ok(LoginOutcome::Session(SessionOutcome {
                    token,
                    user: PublicUser {
                        email: user.email,
                        is_verified: true,
                    },
                }))
            }
        }
    }

    /// Generate and dispatch a replacement challenge.
    ///
    /// For a pending record the new challenge unconditionally overwrites
    /// whatever was there, expired or not. A verified record is left
    /// untouched — the tagged state has nowhere to put a challenge — but
    /// the email is still sent and the call still succeeds; the mailed
    /// code is inert and a later `verify_otp` answers `NoChallenge`.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Notification`, or `Internal`.
    pub async fn resend_otp(&self, email: &str, now: DateTime<Utc>) -> Result<(), AuthError> {
        let Some(mut user) = self.store.find_by_email(email).await? else {
            return Err(AuthError::NotFound);
        };

        let challenge = OtpChallenge::generate(now);
        let code = challenge.code.clone();

        match user.state {
            VerificationState::Pending { .. } => {
                user.state = VerificationState::Pending {
                    challenge: Some(challenge),
                };
                self.store.save(&user).await?;
            }
            VerificationState::Verified => {
                warn!(user_id = %user.id, "resend requested for an already verified account");
            }
        }

        self.notifier
            .send_otp(&user.email, &code)
            .await
            .map_err(AuthError::Notification)?;

        Ok(())
    }
}
