//! The gate manager: token-gated login, duplicate-login eviction,
//! and the disconnect grace window.

use std::collections::HashMap;

use shardgate_protocol::{AccountId, AccountSnapshot, GateResponse, SessionId, ShardId};
use shardgate_timeout::{TimerHandle, TimerQueue};
use shardgate_token::TokenVerifier;
use tokio::sync::Mutex;

use crate::{GameAccount, GameAccountStore, GateError, SessionSender};

/// Configuration for one gate.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Shard this gate serves. Tokens pinned to another shard are
    /// rejected before any state is touched.
    pub shard: ShardId,

    /// How long a displaced session is kept open after the
    /// `RepeatLogin` push, so the notice can flush before the close.
    pub repeat_login_close_ms: i64,

    /// Default grace window after a disconnect before the account is
    /// persisted and evicted. A reconnect inside the window costs no
    /// database read.
    pub disconnect_grace_ms: i64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            shard: ShardId(1),
            repeat_login_close_ms: 3_000,
            disconnect_grace_ms: 3_000,
        }
    }
}

/// Timer events drained by [`GateManager::sweep`].
enum GateTimer {
    /// Persist and evict `account` — but only if its entry still has
    /// the instance id captured here and no session has rebound.
    Evict { account: AccountId, instance: u64 },
    /// Close a displaced session whose `RepeatLogin` window elapsed.
    CloseSession(SessionSender),
}

/// One cached account: Bound while `session` is set, in its grace
/// window while an eviction timer is pending, Absent once evicted.
struct Entry {
    account: GameAccount,
    session: Option<SessionSender>,
    /// Bumped on every rebind; stale eviction timers fail to match it.
    instance: u64,
    evict_timer: TimerHandle,
}

struct GateState {
    accounts: HashMap<AccountId, Entry>,
    timers: TimerQueue<GateTimer>,
    next_instance: u64,
}

impl GateState {
    /// Binds `session` to an already-cached entry. Displaces any other
    /// bound session; a re-login from the same session is a no-op ack.
    fn bind(
        &mut self,
        now_ms: i64,
        account_id: AccountId,
        session: SessionSender,
        close_after_ms: i64,
    ) -> AccountSnapshot {
        let entry = self
            .accounts
            .get_mut(&account_id)
            .expect("bind requires a cached entry");

        if let Some(old) = &entry.session {
            if old.id() == session.id() {
                tracing::debug!(account = %account_id, session = %old.id(),
                    "re-login from bound session, ack only");
                return entry.account.snapshot();
            }
            tracing::info!(account = %account_id, old = %old.id(), new = %session.id(),
                "duplicate login, displacing old session");
            old.push(GateResponse::RepeatLogin);
            self.timers.schedule(
                now_ms + close_after_ms,
                GateTimer::CloseSession(old.clone()),
            );
        }

        // A new instance id orphans any pending eviction timer; the
        // handle field is cleared without canceling since the stale
        // event no-ops on the id mismatch anyway.
        entry.session = Some(session);
        entry.instance = self.next_instance;
        self.next_instance += 1;
        entry.evict_timer = TimerHandle::NONE;
        entry.account.login_time = now_ms;
        entry.account.snapshot()
    }
}

/// Session and account lifecycle manager for one gate.
///
/// All time is an explicit `now_ms` argument; expiry is driven by
/// [`sweep`](Self::sweep) from a periodic task.
pub struct GateManager<S: GameAccountStore> {
    verifier: TokenVerifier,
    store: S,
    state: Mutex<GateState>,
    config: GateConfig,
}

impl<S: GameAccountStore> GateManager<S> {
    pub fn new(verifier: TokenVerifier, store: S, config: GateConfig) -> Self {
        Self {
            verifier,
            store,
            state: Mutex::new(GateState {
                accounts: HashMap::new(),
                timers: TimerQueue::new(),
                next_instance: 1,
            }),
            config,
        }
    }

    pub fn shard(&self) -> ShardId {
        self.config.shard
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Read access to the store, mainly for tests and tooling.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Admits a session that presented `token`.
    ///
    /// Verifies the signature and shard pin, loads (or creates) the
    /// gate account, and binds the session to it. A failure means the
    /// caller should drop the connection without a response.
    pub async fn login(
        &self,
        now_ms: i64,
        session: SessionSender,
        token: &str,
    ) -> Result<(AccountId, AccountSnapshot), GateError> {
        let claims = self.verifier.verify(token)?;
        if let Some(shard) = claims.shard_id() {
            if shard != self.config.shard {
                tracing::warn!(%shard, gate = %self.config.shard, session = %session.id(),
                    "login with token for wrong shard");
                return Err(GateError::ShardMismatch {
                    token: shard,
                    gate: self.config.shard,
                });
            }
        }
        let account_id = claims.account_id();

        // Fast path: the account is cached (bound or in grace).
        {
            let mut state = self.state.lock().await;
            if state.accounts.contains_key(&account_id) {
                let snap = state.bind(
                    now_ms,
                    account_id,
                    session,
                    self.config.repeat_login_close_ms,
                );
                return Ok((account_id, snap));
            }
        }

        // Cache miss: hit the store with the lock released.
        let account = match self.store.first(account_id).await? {
            Some(account) => account,
            None => {
                let account = GameAccount {
                    id: account_id,
                    create_time: now_ms,
                    login_time: now_ms,
                };
                self.store.save(&account).await?;
                tracing::info!(%account_id, "first login, gate account created");
                account
            }
        };

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        // Another login for the same account may have filled the cache
        // while we were at the store; its entry wins and ours is the
        // duplicate that displaces or acks.
        let next_instance = &mut state.next_instance;
        state.accounts.entry(account_id).or_insert_with(|| {
            let instance = *next_instance;
            *next_instance += 1;
            Entry {
                account,
                session: None,
                instance,
                evict_timer: TimerHandle::NONE,
            }
        });
        let snap = state.bind(
            now_ms,
            account_id,
            session,
            self.config.repeat_login_close_ms,
        );
        tracing::info!(%account_id, "session bound");
        Ok((account_id, snap))
    }

    /// Handles the drop of `session`, which was bound to `account_id`.
    ///
    /// The account stays cached for `grace_ms`; a reconnect inside the
    /// window rebinds without a store read. `grace_ms <= 0` persists
    /// and evicts immediately. A disconnect from a session that is no
    /// longer the bound one (it was displaced) is a no-op.
    pub async fn disconnect(
        &self,
        now_ms: i64,
        account_id: AccountId,
        session: SessionId,
        grace_ms: i64,
    ) -> Result<(), GateError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let Some(entry) = state.accounts.get_mut(&account_id) else {
            tracing::warn!(%account_id, "disconnect for account not cached");
            return Ok(());
        };
        match &entry.session {
            None if entry.evict_timer.is_active() => {
                tracing::debug!(%account_id, "disconnect with eviction already pending");
                return Ok(());
            }
            None => {
                tracing::warn!(%account_id, "disconnect for account with no bound session");
                return Ok(());
            }
            Some(bound) if bound.id() != session => {
                tracing::debug!(%account_id, bound = %bound.id(), %session,
                    "stale disconnect from displaced session");
                return Ok(());
            }
            Some(_) => {}
        }
        entry.session = None;

        if grace_ms <= 0 {
            let row = entry.account.clone();
            self.store.save(&row).await?;
            state.accounts.remove(&account_id);
            tracing::info!(%account_id, "disconnect, account persisted and evicted");
            return Ok(());
        }

        let instance = entry.instance;
        entry.evict_timer = state.timers.schedule(
            now_ms + grace_ms,
            GateTimer::Evict {
                account: account_id,
                instance,
            },
        );
        tracing::debug!(%account_id, grace_ms, "disconnect, grace window armed");
        Ok(())
    }

    /// Fires due timers: evicts graced-out accounts (persist first)
    /// and closes displaced sessions whose notice window elapsed.
    ///
    /// A store failure keeps the affected account cached and moves on,
    /// so one bad row cannot wedge the rest of the sweep.
    pub async fn sweep(&self, now_ms: i64) {
        let mut state = self.state.lock().await;
        for event in state.timers.pop_due(now_ms) {
            match event {
                GateTimer::Evict { account, instance } => {
                    let evict = match state.accounts.get(&account) {
                        Some(e) if e.instance == instance && e.session.is_none() => {
                            Some(e.account.clone())
                        }
                        // Rebound or already gone since this timer was
                        // scheduled. Generation mismatch, skip.
                        _ => None,
                    };
                    let Some(row) = evict else { continue };
                    if let Err(err) = self.store.save(&row).await {
                        tracing::warn!(%account, %err, "eviction persist failed, keeping cached");
                        continue;
                    }
                    state.accounts.remove(&account);
                    tracing::info!(%account, "grace expired, account persisted and evicted");
                }
                GateTimer::CloseSession(session) => {
                    session.close();
                    tracing::debug!(session = %session.id(), "displaced session closed");
                }
            }
        }
    }

    /// Snapshot of a cached account, if any.
    pub async fn account_info(&self, account_id: AccountId) -> Option<AccountSnapshot> {
        let state = self.state.lock().await;
        state
            .accounts
            .get(&account_id)
            .map(|e| e.account.snapshot())
    }

    /// The session currently bound to `account_id`, if any.
    pub async fn bound_session(&self, account_id: AccountId) -> Option<SessionId> {
        let state = self.state.lock().await;
        state
            .accounts
            .get(&account_id)
            .and_then(|e| e.session.as_ref().map(|s| s.id()))
    }

    /// Number of cached accounts (bound plus in grace).
    pub async fn len(&self) -> usize {
        self.state.lock().await.accounts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops every cached account and timer without persisting, for
    /// immediate shutdown.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        let dropped = state.accounts.len();
        state.accounts.clear();
        state.timers = TimerQueue::new();
        if dropped > 0 {
            tracing::info!(dropped, "gate cleared without persisting");
        }
    }
}
