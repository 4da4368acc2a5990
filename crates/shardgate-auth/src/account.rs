//! The persistent account row and the store seam in front of it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use shardgate_protocol::AccountId;
use tokio::sync::Mutex;

/// One persisted account.
///
/// Created by registration, mutated on login (`login_time`), never
/// deleted by this subsystem. `password_hash` is a bcrypt hash — the
/// plaintext never leaves the register/login handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub password_hash: String,
    /// Unix epoch ms at registration.
    pub create_time: i64,
    /// Unix epoch ms of the most recent successful login, 0 if never.
    pub login_time: i64,
}

/// Error surface of an account store.
///
/// The in-memory store never fails; real backends map connection and
/// query errors into `Unavailable`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("account store unavailable: {0}")]
    Unavailable(String),
}

/// Document-style persistence for accounts.
///
/// The contract mirrors a first/save document database: point reads by
/// a predicate field, upsert by primary key, per-row atomicity, no
/// cross-row transactions. Methods return `impl Future + Send` so
/// generic services can be driven from spawned tasks.
pub trait AccountStore: Send + Sync + 'static {
    /// Point read by unique username.
    fn first_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<Account>, StoreError>> + Send;

    /// Point read by primary key.
    fn first_by_id(
        &self,
        id: AccountId,
    ) -> impl Future<Output = Result<Option<Account>, StoreError>> + Send;

    /// Upsert by primary key.
    fn save(
        &self,
        account: &Account,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Allocates the next unused primary key.
    fn next_id(&self) -> impl Future<Output = Result<AccountId, StoreError>> + Send;
}

/// In-memory [`AccountStore`] for tests and demos.
///
/// Counts reads and writes so tests can assert database traffic — the
/// coalescing property of the login cache is "exactly one read per
/// burst", which is only checkable with a counting store.
pub struct MemoryAccountStore {
    rows: Mutex<Rows>,
    next_id: AtomicI64,
    reads: AtomicU64,
    writes: AtomicU64,
}

#[derive(Default)]
struct Rows {
    by_id: HashMap<AccountId, Account>,
    id_by_username: HashMap<String, AccountId>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Rows::default()),
            next_id: AtomicI64::new(1),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Total point reads served.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Total upserts served.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore for MemoryAccountStore {
    async fn first_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let rows = self.rows.lock().await;
        Ok(rows
            .id_by_username
            .get(username)
            .and_then(|id| rows.by_id.get(id))
            .cloned())
    }

    async fn first_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.rows.lock().await.by_id.get(&id).cloned())
    }

    async fn save(&self, account: &Account) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let mut rows = self.rows.lock().await;
        rows.id_by_username
            .insert(account.username.clone(), account.id);
        rows.by_id.insert(account.id, account.clone());
        Ok(())
    }

    async fn next_id(&self) -> Result<AccountId, StoreError> {
        Ok(AccountId(self.next_id.fetch_add(1, Ordering::Relaxed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: i64, username: &str) -> Account {
        Account {
            id: AccountId(id),
            username: username.into(),
            password_hash: "$2b$fake".into(),
            create_time: 100,
            login_time: 0,
        }
    }

    #[tokio::test]
    async fn test_first_by_username_missing_returns_none() {
        let store = MemoryAccountStore::new();
        assert_eq!(store.first_by_username("ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_then_first_by_username_round_trips() {
        let store = MemoryAccountStore::new();
        let acc = account(1, "alice");
        store.save(&acc).await.unwrap();

        let loaded = store.first_by_username("alice").await.unwrap();
        assert_eq!(loaded, Some(acc));
    }

    #[tokio::test]
    async fn test_save_is_upsert_by_id() {
        let store = MemoryAccountStore::new();
        let mut acc = account(1, "alice");
        store.save(&acc).await.unwrap();

        acc.login_time = 999;
        store.save(&acc).await.unwrap();

        let loaded = store.first_by_id(AccountId(1)).await.unwrap().unwrap();
        assert_eq!(loaded.login_time, 999);
    }

    #[tokio::test]
    async fn test_next_id_is_monotonic() {
        let store = MemoryAccountStore::new();
        let a = store.next_id().await.unwrap();
        let b = store.next_id().await.unwrap();
        assert!(b.0 > a.0);
    }

    #[tokio::test]
    async fn test_read_write_counters_track_traffic() {
        let store = MemoryAccountStore::new();
        store.save(&account(1, "alice")).await.unwrap();
        let _ = store.first_by_username("alice").await.unwrap();
        let _ = store.first_by_username("alice").await.unwrap();

        assert_eq!(store.writes(), 1);
        assert_eq!(store.reads(), 2);
    }
}
