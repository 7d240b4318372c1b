//! Domain error taxonomy for the authentication flows.

use crate::auth::otp::OtpValidationError;
use crate::email::NotifyError;
use crate::store::StoreError;
use thiserror::Error;

/// Everything an authentication operation can fail with.
///
/// Display strings double as the stable user-facing messages; the HTTP
/// layer maps each variant to exactly one status code. `Notification` and
/// `Internal` carry their sources for server-side logging but surface only
/// the generic message.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already registered")]
    Conflict,
    #[error("User not found")]
    NotFound,
    #[error("No OTP requested")]
    NoChallenge,
    #[error("OTP expired")]
    Expired,
    #[error("Invalid OTP")]
    Mismatch,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Failed to send verification email")]
    Notification(#[source] NotifyError),
    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => Self::Conflict,
            StoreError::Backend(source) => Self::Internal(source),
        }
    }
}

impl From<OtpValidationError> for AuthError {
    fn from(err: OtpValidationError) -> Self {
        match err {
            OtpValidationError::NoChallenge => Self::NoChallenge,
            OtpValidationError::Expired => Self::Expired,
            OtpValidationError::Mismatch => Self::Mismatch,
        }
    }
}
