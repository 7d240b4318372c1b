//! One-time passcode challenges.

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, Rng};
use thiserror::Error;

/// How long a freshly generated code stays valid.
const OTP_TTL_MINUTES: i64 = 10;

/// An outstanding OTP challenge attached to an unverified user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpChallenge {
    /// 4-digit numeric code, stored as the string the user must echo back.
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OtpValidationError {
    #[error("No OTP requested")]
    NoChallenge,
    #[error("OTP expired")]
    Expired,
    #[error("Invalid OTP")]
    Mismatch,
}

impl OtpChallenge {
    /// Draw a new 4-digit code from the OS CSPRNG, valid for ten minutes.
    ///
    /// Codes are uniform over [1000, 9999]; predictability of the code is
    /// the entire security boundary of this flow, so `OsRng` it is.
    #[must_use]
    pub fn generate(now: DateTime<Utc>) -> Self {
        let code = OsRng.gen_range(1000..=9999u16);
        Self {
            code: code.to_string(),
            expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
        }
    }
}

/// Validate a candidate code against an outstanding challenge, if any.
///
/// The check order is part of the contract: absence before expiry, expiry
/// before comparison. An expired-and-wrong code reports `Expired`.
/// `now == expires_at` is still inside the window.
///
/// # Errors
///
/// Returns `NoChallenge`, `Expired`, or `Mismatch` accordingly.
pub fn validate(
    challenge: Option<&OtpChallenge>,
    candidate: &str,
    now: DateTime<Utc>,
) -> Result<(), OtpValidationError> {
    let Some(challenge) = challenge else {
        return Err(OtpValidationError::NoChallenge);
    };

    if now > challenge.expires_at {
        return Err(OtpValidationError::Expired);
    }

    if challenge.code != candidate {
        return Err(OtpValidationError::Mismatch);
    }

    Ok(())
}
