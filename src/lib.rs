//! # Ensaluti (Email OTP Authentication)
//!
//! `ensaluti` authenticates end users with a password plus a one-time
//! 4-digit code delivered by email, then issues a bounded-lifetime session
//! token carried in an `HttpOnly` cookie.
//!
//! ## Account lifecycle
//!
//! A record is created by `register` in a pending state with a fresh OTP
//! challenge. A successful `verify-otp` moves it to verified and clears the
//! challenge; there is no path back. While unverified, `login` (with a
//! correct password) and `resend-otp` each install a replacement challenge,
//! unconditionally invalidating the previous code.
//!
//! - **Case-sensitive emails:** records are keyed by the email exactly as
//!   submitted; no normalization is applied.
//! - **Anti-enumeration:** `login` answers a single undifferentiated
//!   `401 Invalid credentials` for unknown emails and wrong passwords alike.
//!   Only after a correct password does the unverified branch reveal itself
//!   with `403 requiresOTP`.
//! - **No rollback on notification failure:** a registration that persisted
//!   but failed to email its code stays persisted; `resend-otp` is the
//!   recovery path.
//!
//! ## Sessions
//!
//! Session tokens are self-contained HS256 JWTs (`sub`, `iat`,
//! `exp = iat + 24h`); nothing is stored server-side and validity is
//! signature plus expiry only.

pub mod api;
pub mod auth;
pub mod cli;
pub mod email;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
