//! In-process credential store.
//!
//! Backs the state-machine tests and local runs without Postgres. Shares
//! the contract of the SQL store: whole-record writes, conflict on
//! duplicate email, case-sensitive keys.

use super::{CredentialStore, StoreError, User};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    records: RwLock<HashMap<String, User>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(email).cloned())
    }

    async fn create(&self, user: &User) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&user.email) {
            return Err(StoreError::Conflict);
        }
        records.insert(user.email.clone(), user.clone());
        Ok(())
    }

    async fn save(&self, user: &User) -> Result<(), StoreError> {
        // Whole-record replacement; last save wins.
        let mut records = self.records.write().await;
        records.insert(user.email.clone(), user.clone());
        Ok(())
    }
}
