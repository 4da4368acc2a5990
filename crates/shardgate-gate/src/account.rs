//! Gate-side account rows and their store.
//!
//! The gate persists only lifecycle timestamps; credentials live with
//! the auth service and never reach a gate.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use shardgate_protocol::{AccountId, AccountSnapshot};

/// A gate account row: the per-shard state for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameAccount {
    pub id: AccountId,
    /// When this account first logged into this gate, ms epoch.
    pub create_time: i64,
    /// Most recent login, ms epoch.
    pub login_time: i64,
}

impl GameAccount {
    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            create_time: self.create_time,
            login_time: self.login_time,
        }
    }
}

/// Store failure. Queries distinguish "no row" (`Ok(None)`) from this.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("gate account store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence seam for gate accounts.
///
/// Futures are `Send` so generic managers can run under `tokio::spawn`.
pub trait GameAccountStore: Send + Sync + 'static {
    fn first(
        &self,
        id: AccountId,
    ) -> impl Future<Output = Result<Option<GameAccount>, StoreError>> + Send;

    fn save(
        &self,
        account: &GameAccount,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// In-memory store used by tests and the demo.
///
/// Counts reads and writes so tests can assert that grace windows and
/// duplicate logins hit the store exactly as often as they should.
#[derive(Default)]
pub struct MemoryGameAccountStore {
    rows: Mutex<HashMap<AccountId, GameAccount>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryGameAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total `first` calls served.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Total `save` calls served.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Synchronous row peek for assertions.
    pub fn row(&self, id: AccountId) -> Option<GameAccount> {
        self.rows.lock().expect("store poisoned").get(&id).cloned()
    }
}

impl GameAccountStore for MemoryGameAccountStore {
    async fn first(&self, id: AccountId) -> Result<Option<GameAccount>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().expect("store poisoned").get(&id).cloned())
    }

    async fn save(&self, account: &GameAccount) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.rows
            .lock()
            .expect("store poisoned")
            .insert(account.id, account.clone());
        Ok(())
    }
}
