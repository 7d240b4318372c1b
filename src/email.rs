//! Outbound OTP email delivery.
//!
//! The notifier is an injected capability: the auth service only sees the
//! trait, so tests substitute a recording double and deployments choose
//! between the HTTP relay and the logging stub. Failures are reported to
//! the caller, never retried here.

use crate::APP_USER_AGENT;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use url::Url;

const OTP_EMAIL_SUBJECT: &str = "Email Verification Code";
const RELAY_TIMEOUT_SECONDS: u64 = 5;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail relay rejected the message with status {status}")]
    Rejected { status: u16 },
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// Delivers a one-time code to a user's email address.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `code` to `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be handed off; the caller
    /// decides what that means for the flow in progress.
    async fn send_otp(&self, to: &str, code: &str) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    to: &'a str,
    subject: &'a str,
    body: String,
}

fn otp_email_body(code: &str) -> String {
    format!("Your verification code is: {code}\nThis code will expire in 10 minutes.")
}

/// Hands messages to an HTTP mail relay as JSON.
#[derive(Debug, Clone)]
pub struct RelayNotifier {
    client: reqwest::Client,
    endpoint: Url,
}

impl RelayNotifier {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(endpoint: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(RELAY_TIMEOUT_SECONDS))
            .build()
            .context("failed to build mail relay HTTP client")?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Notifier for RelayNotifier {
    async fn send_otp(&self, to: &str, code: &str) -> Result<(), NotifyError> {
        let message = RelayMessage {
            to,
            subject: OTP_EMAIL_SUBJECT,
            body: otp_email_body(code),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&message)
            .send()
            .await
            .map_err(|e| anyhow!(e).context("failed to reach mail relay"))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(NotifyError::Rejected {
                status: response.status().as_u16(),
            })
        }
    }
}

/// Logging stub used when no relay is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_otp(&self, to: &str, _code: &str) -> Result<(), NotifyError> {
        info!(to_email = %to, subject = OTP_EMAIL_SUBJECT, "otp email send stub");
        Ok(())
    }
}
