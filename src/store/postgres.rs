//! Postgres-backed credential store.

use super::{CredentialStore, StoreError, User, VerificationState};
use crate::auth::otp::OtpChallenge;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{info_span, Instrument};

#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    let is_verified: bool = row.try_get("is_verified")?;
    let otp_code: Option<String> = row.try_get("otp_code")?;
    let otp_expires_at: Option<DateTime<Utc>> = row.try_get("otp_expires_at")?;

    let state = if is_verified {
        VerificationState::Verified
    } else {
        let challenge = match (otp_code, otp_expires_at) {
            (Some(code), Some(expires_at)) => Some(OtpChallenge { code, expires_at }),
            _ => None,
        };
        VerificationState::Pending { challenge }
    };

    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        state,
    })
}

/// Split the tagged state into the flat columns the table stores.
fn state_columns(state: &VerificationState) -> (bool, Option<&str>, Option<DateTime<Utc>>) {
    match state {
        VerificationState::Verified => (true, None, None),
        VerificationState::Pending { challenge } => (
            false,
            challenge.as_ref().map(|c| c.code.as_str()),
            challenge.as_ref().map(|c| c.expires_at),
        ),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = r"
            SELECT id, email, password_hash, is_verified, otp_code, otp_expires_at
            FROM users
            WHERE email = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up user by email")?;

        match row {
            Some(row) => {
                let user = user_from_row(&row).context("failed to decode user row")?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn create(&self, user: &User) -> Result<(), StoreError> {
        let (is_verified, otp_code, otp_expires_at) = state_columns(&user.state);

        let query = r"
            INSERT INTO users (id, email, password_hash, is_verified, otp_code, otp_expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(is_verified)
            .bind(otp_code)
            .bind(otp_expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict),
            Err(err) => Err(StoreError::Backend(
                anyhow::Error::new(err).context("failed to insert user"),
            )),
        }
    }

    async fn save(&self, user: &User) -> Result<(), StoreError> {
        let (is_verified, otp_code, otp_expires_at) = state_columns(&user.state);

        // Single UPDATE: the whole record changes atomically or not at all.
        let query = r"
            UPDATE users
            SET password_hash = $2,
                is_verified = $3,
                otp_code = $4,
                otp_expires_at = $5,
                updated_at = NOW()
            WHERE id = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(user.id)
            .bind(&user.password_hash)
            .bind(is_verified)
            .bind(otp_code)
            .bind(otp_expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to save user")?;

        Ok(())
    }
}
