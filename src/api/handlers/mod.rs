pub mod health;
pub use self::health::health;

pub mod register;
pub use self::register::register;

pub mod verify_otp;
pub use self::verify_otp::verify_otp;

pub mod login;
pub use self::login::login;

pub mod resend_otp;
pub use self::resend_otp::resend_otp;

// common functions for the handlers
use crate::auth::{AuthError, SESSION_TTL_HOURS};
use axum::{
    http::{header::InvalidHeaderValue, HeaderValue, StatusCode},
    Json,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

pub(crate) const SESSION_COOKIE_NAME: &str = "token";

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub email: String,
    #[serde(rename = "isVerified")]
    pub is_verified: bool,
}

/// Body of the "account exists but still needs its email verified" replies.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct OtpRequiredResponse {
    pub message: String,
    #[serde(rename = "requiresOTP")]
    pub requires_otp: bool,
}

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Translate a domain error into its one status code and stable message.
///
/// Infrastructure failures keep their detail in the server log only.
pub(crate) fn error_response(err: &AuthError) -> (StatusCode, Json<MessageResponse>) {
    let status = match err {
        AuthError::Conflict | AuthError::NoChallenge | AuthError::Expired | AuthError::Mismatch => {
            StatusCode::BAD_REQUEST
        }
        AuthError::NotFound => StatusCode::NOT_FOUND,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::Notification(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    match err {
        AuthError::Notification(source) => error!("Failed to send verification email: {source}"),
        AuthError::Internal(source) => error!("Internal error: {source:?}"),
        _ => {}
    }

    (
        status,
        Json(MessageResponse {
            message: err.to_string(),
        }),
    )
}

/// Build the `HttpOnly` session cookie carrying the token.
///
/// Max-Age mirrors the token's 24-hour expiry; `Secure` is appended in
/// release builds only, where transport is HTTPS.
pub(crate) fn session_cookie(token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let max_age = SESSION_TTL_HOURS * 60 * 60;
    let mut cookie =
        format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if !cfg!(debug_assertions) {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}
