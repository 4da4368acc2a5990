//! The authentication service: register, login, result cache.

use std::collections::HashMap;

use shardgate_protocol::{
    AccountId, CODE_BAD_CREDENTIALS, CODE_DUPLICATE_ACCOUNT, CODE_OK,
    CODE_RATE_LIMITED, SessionId, ShardId,
};
use shardgate_timeout::{TimerHandle, TimerQueue, Timeout};
use shardgate_token::TokenIssuer;
use tokio::sync::Mutex;

use crate::{Account, AccountStore, AuthError, KeyedLocks, LockKind};

/// Configuration for the auth service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Minimum interval between requests from one session. A request
    /// inside the window is answered with [`CODE_RATE_LIMITED`] and
    /// touches no other state.
    pub min_request_interval_ms: i64,

    /// How long a login outcome stays cached. Within this window a
    /// repeated login for the same username is served from cache —
    /// one database read per burst.
    pub login_cache_ttl_ms: i64,

    /// bcrypt work factor. Tests use the crate minimum; production
    /// keeps the default.
    pub bcrypt_cost: u32,

    /// Gate endpoint embedded in issued tokens.
    pub gate_address: String,
    pub gate_port: u16,

    /// Shard issued tokens are pinned to, if any.
    pub gate_shard: Option<ShardId>,

    /// How long a rate-limit tracker may sit idle past its window
    /// before a sweep drops it.
    pub rate_tracker_idle_ms: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_request_interval_ms: 2_000,
            login_cache_ttl_ms: 3_000,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            gate_address: "127.0.0.1".to_string(),
            gate_port: 20001,
            gate_shard: None,
            rate_tracker_idle_ms: 60_000,
        }
    }
}

/// Result of a login call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    /// One of the `CODE_*` constants.
    pub code: i32,
    /// Gate token, present iff `code == CODE_OK`.
    pub token: Option<String>,
    /// Account id, present iff `code == CODE_OK`.
    pub account_id: Option<AccountId>,
}

impl LoginOutcome {
    fn failure(code: i32) -> Self {
        Self {
            code,
            token: None,
            account_id: None,
        }
    }
}

/// A cached login verdict for one username.
///
/// Caches the *verdict* (code + account id), not the token: every
/// successful login call still issues a fresh single-use token. A
/// success also carries the stored password hash — the cache spares
/// followers the store read, never the password check.
struct CachedVerdict {
    code: i32,
    account_id: Option<AccountId>,
    password_hash: Option<String>,
    expires_at_ms: i64,
    evict_timer: TimerHandle,
}

/// Timer event: drop the cache entry for this username.
struct EvictVerdict {
    username: String,
}

/// Mutable service state, all behind one mutex.
///
/// Synchronous mutations between `await` points are atomic under the
/// cooperative scheduler; the mutex makes that hold even when handlers
/// run on a multi-threaded runtime.
struct AuthState {
    cache: HashMap<String, CachedVerdict>,
    evictions: TimerQueue<EvictVerdict>,
    rate: HashMap<SessionId, Timeout>,
}

/// The authentication service for one login server.
///
/// All time is an explicit `now_ms` argument; see the workspace docs
/// for the time model. Callers drive expiry via [`sweep`](Self::sweep).
pub struct AuthService<S: AccountStore> {
    store: S,
    issuer: TokenIssuer,
    locks: KeyedLocks,
    state: Mutex<AuthState>,
    config: AuthConfig,
}

impl<S: AccountStore> AuthService<S> {
    pub fn new(store: S, issuer: TokenIssuer, config: AuthConfig) -> Self {
        Self {
            store,
            issuer,
            locks: KeyedLocks::new(),
            state: Mutex::new(AuthState {
                cache: HashMap::new(),
                evictions: TimerQueue::new(),
                rate: HashMap::new(),
            }),
            config,
        }
    }

    /// Read access to the store, mainly for tests and tooling.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates a new account.
    ///
    /// Returns a wire code: [`CODE_OK`], [`CODE_DUPLICATE_ACCOUNT`], or
    /// [`CODE_RATE_LIMITED`]. Infrastructure faults surface as
    /// [`AuthError`] and are the caller's problem to convert.
    pub async fn register(
        &self,
        now_ms: i64,
        session: SessionId,
        username: &str,
        password: &str,
    ) -> Result<i32, AuthError> {
        if !self.allow_request(now_ms, session).await {
            tracing::debug!(%session, username, "register rate limited");
            return Ok(CODE_RATE_LIMITED);
        }

        // One register per username at a time; the guard releases on
        // every exit path below.
        let _guard = self.locks.acquire(LockKind::Register, username).await;

        if self.store.first_by_username(username).await?.is_some() {
            tracing::info!(username, "register rejected: username taken");
            return Ok(CODE_DUPLICATE_ACCOUNT);
        }

        let password_hash = bcrypt::hash(password, self.config.bcrypt_cost)?;
        let account = Account {
            id: self.store.next_id().await?,
            username: username.to_string(),
            password_hash,
            create_time: now_ms,
            login_time: 0,
        };
        self.store.save(&account).await?;

        tracing::info!(account_id = %account.id, username, "account registered");
        Ok(CODE_OK)
    }

    /// Authenticates a username/password pair and issues a gate token.
    ///
    /// Rapid duplicate logins for one username coalesce onto a single
    /// database read: the first call under the key lock queries and
    /// caches the verdict; followers served within the TTL reuse it,
    /// with their password checked against the cached hash.
    pub async fn login(
        &self,
        now_ms: i64,
        session: SessionId,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, AuthError> {
        if !self.allow_request(now_ms, session).await {
            tracing::debug!(%session, username, "login rate limited");
            return Ok(LoginOutcome::failure(CODE_RATE_LIMITED));
        }

        let _guard = self.locks.acquire(LockKind::Login, username).await;

        // Fresh cached verdict? Serve it without touching the store.
        // A cached success is still gated on the presented password.
        if let Some((code, account_id, hash)) = self.cached_verdict(now_ms, username).await {
            let verified = match hash.as_deref() {
                Some(hash) => bcrypt::verify(password, hash)?,
                None => true,
            };
            if !verified {
                tracing::info!(username, "login rejected: password mismatch on cached verdict");
                return Ok(LoginOutcome::failure(CODE_BAD_CREDENTIALS));
            }
            tracing::debug!(username, code, "login served from cache");
            return self.finish_login(now_ms, code, account_id);
        }

        let (code, account_id, hash) = match self.store.first_by_username(username).await? {
            None => (CODE_BAD_CREDENTIALS, None, None),
            Some(mut account) => {
                if bcrypt::verify(password, &account.password_hash)? {
                    account.login_time = now_ms;
                    self.store.save(&account).await?;
                    (CODE_OK, Some(account.id), Some(account.password_hash))
                } else {
                    (CODE_BAD_CREDENTIALS, None, None)
                }
            }
        };

        self.cache_verdict(now_ms, username, code, account_id, hash)
            .await;

        if code == CODE_OK {
            tracing::info!(username, "login ok");
        } else {
            tracing::info!(username, code, "login rejected");
        }
        self.finish_login(now_ms, code, account_id)
    }

    /// Drops expired cache entries and long-idle rate trackers.
    /// Production calls this from a periodic sweeper task.
    pub async fn sweep(&self, now_ms: i64) {
        let mut state = self.state.lock().await;
        for evict in state.evictions.pop_due(now_ms) {
            // The entry may have been replaced by a newer login, in
            // which case its timer was canceled and we never get here
            // for it — present means ours.
            state.cache.remove(&evict.username);
        }
        let idle = self.config.rate_tracker_idle_ms;
        state
            .rate
            .retain(|_, t| now_ms < t.next_allowed_ms().saturating_add(idle));
    }

    /// Forgets the rate tracker of a closed session.
    pub async fn forget_session(&self, session: SessionId) {
        self.state.lock().await.rate.remove(&session);
    }

    /// Number of cached login verdicts (test/ops visibility).
    pub async fn cached_verdicts(&self) -> usize {
        self.state.lock().await.cache.len()
    }

    // -- internals ---------------------------------------------------------

    /// Checks and re-arms the per-session interval tracker.
    async fn allow_request(&self, now_ms: i64, session: SessionId) -> bool {
        let mut state = self.state.lock().await;
        let interval = self.config.min_request_interval_ms;
        state
            .rate
            .entry(session)
            .or_insert_with(|| Timeout::with_interval(interval))
            .check_interval(now_ms)
    }

    async fn cached_verdict(
        &self,
        now_ms: i64,
        username: &str,
    ) -> Option<(i32, Option<AccountId>, Option<String>)> {
        let mut state = self.state.lock().await;
        match state.cache.get(username) {
            Some(v) if now_ms < v.expires_at_ms => {
                Some((v.code, v.account_id, v.password_hash.clone()))
            }
            Some(_) => {
                // Expired but not swept yet: drop it lazily.
                if let Some(mut v) = state.cache.remove(username) {
                    state.evictions.cancel(&mut v.evict_timer);
                }
                None
            }
            None => None,
        }
    }

    async fn cache_verdict(
        &self,
        now_ms: i64,
        username: &str,
        code: i32,
        account_id: Option<AccountId>,
        password_hash: Option<String>,
    ) {
        let mut state = self.state.lock().await;
        let expires_at_ms = now_ms + self.config.login_cache_ttl_ms;

        // Replacing an entry cancels its timer so the old deadline
        // can't evict the fresh verdict early.
        if let Some(mut old) = state.cache.remove(username) {
            state.evictions.cancel(&mut old.evict_timer);
        }

        let evict_timer = state.evictions.schedule(
            expires_at_ms,
            EvictVerdict {
                username: username.to_string(),
            },
        );
        state.cache.insert(
            username.to_string(),
            CachedVerdict {
                code,
                account_id,
                password_hash,
                expires_at_ms,
                evict_timer,
            },
        );
    }

    fn finish_login(
        &self,
        now_ms: i64,
        code: i32,
        account_id: Option<AccountId>,
    ) -> Result<LoginOutcome, AuthError> {
        if code != CODE_OK {
            return Ok(LoginOutcome::failure(code));
        }
        let id = account_id.expect("CODE_OK always carries an account id");
        let token = self.issuer.issue(
            now_ms,
            id,
            &self.config.gate_address,
            self.config.gate_port,
            self.config.gate_shard,
        )?;
        Ok(LoginOutcome {
            code,
            token: Some(token),
            account_id: Some(id),
        })
    }
}
