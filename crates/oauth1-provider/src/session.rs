//! Session storage trait.
//!
//! Pending transactions are persisted across the authorization dialog in the
//! user's session: a per-user mutable mapping holding, under a configurable
//! key, a nested map of transaction id to [`Transaction`]. How the session
//! itself is transported (cookies, signing) is the embedding application's
//! concern; the engine only requires a handle scoped to one user.
//!
//! The engine adds no locking of its own. Concurrent requests within a single
//! session are assumed to be serialized, or at least not corrupted, by the
//! surrounding session layer.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ProviderError, ProviderResult};
use crate::transaction::Transaction;

/// Storage operations on one user's session.
///
/// Implementations are handles scoped to a single user, typically resolved
/// from a session cookie by the transport before the endpoint handlers run.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Stores a transaction under `session[key][transaction_id]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    async fn insert_transaction(
        &self,
        key: &str,
        transaction_id: &str,
        transaction: Transaction,
    ) -> ProviderResult<()>;

    /// Looks up a transaction by id.
    ///
    /// Returns `None` if no transaction is stored under the id.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read.
    async fn find_transaction(
        &self,
        key: &str,
        transaction_id: &str,
    ) -> ProviderResult<Option<Transaction>>;

    /// Removes a transaction by id. Removing an absent id is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    async fn remove_transaction(&self, key: &str, transaction_id: &str) -> ProviderResult<()>;
}

/// In-process [`SessionStorage`] over a mutex-guarded nested map.
///
/// Suitable for tests and single-process embeddings; anything spanning
/// processes wants a real session backend.
#[derive(Default)]
pub struct MemorySession {
    maps: Mutex<HashMap<String, HashMap<String, Transaction>>>,
}

impl MemorySession {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> ProviderResult<std::sync::MutexGuard<'_, HashMap<String, HashMap<String, Transaction>>>> {
        self.maps
            .lock()
            .map_err(|_| ProviderError::server("session lock poisoned"))
    }
}

#[async_trait]
impl SessionStorage for MemorySession {
    async fn insert_transaction(
        &self,
        key: &str,
        transaction_id: &str,
        transaction: Transaction,
    ) -> ProviderResult<()> {
        self.lock()?
            .entry(key.to_string())
            .or_default()
            .insert(transaction_id.to_string(), transaction);
        Ok(())
    }

    async fn find_transaction(
        &self,
        key: &str,
        transaction_id: &str,
    ) -> ProviderResult<Option<Transaction>> {
        Ok(self
            .lock()?
            .get(key)
            .and_then(|transactions| transactions.get(transaction_id))
            .cloned())
    }

    async fn remove_transaction(&self, key: &str, transaction_id: &str) -> ProviderResult<()> {
        if let Some(transactions) = self.lock()?.get_mut(key) {
            transactions.remove(transaction_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::AuthorizationParams;
    use serde_json::json;

    fn transaction(token: &str) -> Transaction {
        Transaction::new(json!("c1"), None, None, AuthorizationParams::new(token))
    }

    #[tokio::test]
    async fn test_insert_find_remove() {
        let session = MemorySession::new();
        session
            .insert_transaction("authorize", "tid1", transaction("rt-1"))
            .await
            .unwrap();

        let found = session
            .find_transaction("authorize", "tid1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.authz.token, "rt-1");

        session
            .remove_transaction("authorize", "tid1")
            .await
            .unwrap();
        assert!(
            session
                .find_transaction("authorize", "tid1")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let session = MemorySession::new();
        session
            .insert_transaction("authorize", "tid1", transaction("rt-1"))
            .await
            .unwrap();

        assert!(
            session
                .find_transaction("other", "tid1")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_remove_absent_is_ok() {
        let session = MemorySession::new();
        session
            .remove_transaction("authorize", "never-stored")
            .await
            .unwrap();
    }
}
