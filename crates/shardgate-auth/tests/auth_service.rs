//! Behavior tests for `AuthService`: locking, coalescing, rate limits.
//!
//! All tests drive time explicitly (`now_ms` arguments) — no sleeps.
//! bcrypt runs at its minimum cost so hashing doesn't dominate runtime.

use shardgate_auth::{AccountStore, AuthConfig, AuthService, MemoryAccountStore};
use shardgate_protocol::{
    CODE_BAD_CREDENTIALS, CODE_DUPLICATE_ACCOUNT, CODE_OK, CODE_RATE_LIMITED,
    SessionId, ShardId,
};
use shardgate_token::{TokenConfig, TokenIssuer, TokenVerifier};

const PRIVATE_PEM: &str = include_str!("keys/test_rsa.pem");
const PUBLIC_PEM: &str = include_str!("keys/test_rsa.pub.pem");

fn service() -> AuthService<MemoryAccountStore> {
    let issuer =
        TokenIssuer::new(PRIVATE_PEM, TokenConfig::default()).expect("issuer");
    let config = AuthConfig {
        bcrypt_cost: 4, // minimum cost, tests only
        gate_shard: Some(ShardId(1)),
        ..AuthConfig::default()
    };
    AuthService::new(MemoryAccountStore::new(), issuer, config)
}

fn sid(id: u64) -> SessionId {
    SessionId(id)
}

// =========================================================================
// register()
// =========================================================================

#[tokio::test]
async fn test_register_new_username_succeeds() {
    let auth = service();

    let code = auth.register(0, sid(1), "alice", "pw").await.unwrap();

    assert_eq!(code, CODE_OK);
    let row = auth
        .store()
        .first_by_username("alice")
        .await
        .unwrap()
        .expect("row persisted");
    assert_eq!(row.create_time, 0);
    assert_eq!(row.login_time, 0);
    assert_ne!(row.password_hash, "pw", "password must be stored hashed");
}

#[tokio::test]
async fn test_register_duplicate_username_rejected() {
    let auth = service();
    auth.register(0, sid(1), "alice", "pw").await.unwrap();

    let code = auth.register(10_000, sid(2), "alice", "other").await.unwrap();

    assert_eq!(code, CODE_DUPLICATE_ACCOUNT);
}

#[tokio::test]
async fn test_register_within_interval_rate_limited_without_db_write() {
    let auth = service();
    auth.register(0, sid(1), "alice", "pw").await.unwrap();
    let writes_before = auth.store().writes();

    // Same session, 1 ms later — inside the 2000 ms window.
    let code = auth.register(1, sid(1), "bob", "pw").await.unwrap();

    assert_eq!(code, CODE_RATE_LIMITED);
    assert_eq!(
        auth.store().writes(),
        writes_before,
        "rate-limited request must not touch the store"
    );
}

#[tokio::test]
async fn test_register_after_interval_allowed_again() {
    let auth = service();
    auth.register(0, sid(1), "alice", "pw").await.unwrap();

    let code = auth.register(2_000, sid(1), "bob", "pw").await.unwrap();

    assert_eq!(code, CODE_OK);
}

#[tokio::test]
async fn test_register_rate_limit_is_per_session() {
    let auth = service();
    auth.register(0, sid(1), "alice", "pw").await.unwrap();

    // A different session at the same instant is unaffected.
    let code = auth.register(0, sid(2), "bob", "pw").await.unwrap();

    assert_eq!(code, CODE_OK);
}

// =========================================================================
// login()
// =========================================================================

#[tokio::test]
async fn test_login_correct_password_yields_token() {
    let auth = service();
    auth.register(0, sid(1), "alice", "hunter2").await.unwrap();

    let outcome = auth.login(10_000, sid(2), "alice", "hunter2").await.unwrap();

    assert_eq!(outcome.code, CODE_OK);
    let token = outcome.token.expect("token on success");

    // The token must verify against the cluster public key and carry
    // the right account and shard.
    let claims = TokenVerifier::new(PUBLIC_PEM)
        .unwrap()
        .verify(&token)
        .expect("token verifies");
    assert_eq!(Some(claims.account_id()), outcome.account_id);
    assert_eq!(claims.shard_id(), Some(ShardId(1)));
}

#[tokio::test]
async fn test_login_updates_login_time() {
    let auth = service();
    auth.register(0, sid(1), "alice", "pw").await.unwrap();

    auth.login(50_000, sid(2), "alice", "pw").await.unwrap();

    let row = auth
        .store()
        .first_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.login_time, 50_000);
}

#[tokio::test]
async fn test_login_wrong_password_rejected() {
    let auth = service();
    auth.register(0, sid(1), "alice", "pw").await.unwrap();

    let outcome = auth.login(10_000, sid(2), "alice", "nope").await.unwrap();

    assert_eq!(outcome.code, CODE_BAD_CREDENTIALS);
    assert!(outcome.token.is_none());
}

#[tokio::test]
async fn test_login_unknown_username_same_code_as_wrong_password() {
    // One code for both failures so responses can't probe usernames.
    let auth = service();

    let outcome = auth.login(0, sid(1), "ghost", "pw").await.unwrap();

    assert_eq!(outcome.code, CODE_BAD_CREDENTIALS);
}

#[tokio::test]
async fn test_login_within_interval_rate_limited() {
    let auth = service();
    auth.register(0, sid(1), "alice", "pw").await.unwrap();
    auth.login(10_000, sid(2), "alice", "pw").await.unwrap();

    let outcome = auth.login(10_001, sid(2), "alice", "pw").await.unwrap();

    assert_eq!(outcome.code, CODE_RATE_LIMITED);
    assert!(outcome.token.is_none());
}

// =========================================================================
// Coalescing: one DB read per burst
// =========================================================================

#[tokio::test]
async fn test_concurrent_logins_same_username_single_db_read() {
    let auth = service();
    auth.register(0, sid(1), "alice", "pw").await.unwrap();
    let reads_before = auth.store().reads();

    // Three "simultaneous" logins from different sessions. The key
    // lock serializes them; followers hit the cached verdict.
    let (a, b, c) = tokio::join!(
        auth.login(10_000, sid(2), "alice", "pw"),
        auth.login(10_000, sid(3), "alice", "pw"),
        auth.login(10_000, sid(4), "alice", "pw"),
    );
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

    assert_eq!(a.code, CODE_OK);
    assert_eq!(b.code, CODE_OK);
    assert_eq!(c.code, CODE_OK);
    assert_eq!(
        auth.store().reads() - reads_before,
        1,
        "the burst must coalesce onto exactly one account read"
    );
    // Every caller still gets its own single-use token.
    assert_ne!(a.token, b.token);
    assert_ne!(b.token, c.token);
}

#[tokio::test]
async fn test_cached_verdict_expires_after_ttl() {
    let auth = service();
    auth.register(0, sid(1), "alice", "pw").await.unwrap();

    auth.login(10_000, sid(2), "alice", "pw").await.unwrap();
    let reads_after_first = auth.store().reads();

    // Past the 3000 ms TTL: the cache must not answer.
    let outcome = auth.login(13_001, sid(3), "alice", "pw").await.unwrap();

    assert_eq!(outcome.code, CODE_OK);
    assert!(
        auth.store().reads() > reads_after_first,
        "expired verdict must be re-read from the store"
    );
}

#[tokio::test]
async fn test_failed_verdicts_are_cached_too() {
    let auth = service();
    auth.register(0, sid(1), "alice", "pw").await.unwrap();
    auth.login(10_000, sid(2), "alice", "wrong").await.unwrap();
    let reads_before = auth.store().reads();

    let outcome = auth.login(10_100, sid(3), "alice", "wrong").await.unwrap();

    assert_eq!(outcome.code, CODE_BAD_CREDENTIALS);
    assert_eq!(auth.store().reads(), reads_before, "served from cache");
}

#[tokio::test]
async fn test_cached_success_still_rejects_wrong_password() {
    // The cache skips the store read, never the password check: a
    // follower inside the TTL must not ride a prior success.
    let auth = service();
    auth.register(0, sid(1), "alice", "hunter2").await.unwrap();
    auth.login(10_000, sid(2), "alice", "hunter2").await.unwrap();
    let reads_before = auth.store().reads();

    let outcome = auth.login(10_100, sid(3), "alice", "nope").await.unwrap();

    assert_eq!(outcome.code, CODE_BAD_CREDENTIALS);
    assert!(outcome.token.is_none(), "no token on a mismatched password");
    assert_eq!(auth.store().reads(), reads_before, "still no store read");
}

#[tokio::test]
async fn test_cached_success_serves_correct_password_follower() {
    let auth = service();
    auth.register(0, sid(1), "alice", "hunter2").await.unwrap();
    auth.login(10_000, sid(2), "alice", "hunter2").await.unwrap();
    let reads_before = auth.store().reads();

    let outcome = auth.login(10_100, sid(3), "alice", "hunter2").await.unwrap();

    assert_eq!(outcome.code, CODE_OK);
    assert!(outcome.token.is_some());
    assert_eq!(auth.store().reads(), reads_before, "served from cache");
}

// =========================================================================
// sweep() / forget_session()
// =========================================================================

#[tokio::test]
async fn test_sweep_evicts_expired_verdicts() {
    let auth = service();
    auth.register(0, sid(1), "alice", "pw").await.unwrap();
    auth.login(10_000, sid(2), "alice", "pw").await.unwrap();
    assert_eq!(auth.cached_verdicts().await, 1);

    auth.sweep(13_000).await;

    assert_eq!(auth.cached_verdicts().await, 0);
}

#[tokio::test]
async fn test_sweep_keeps_fresh_verdicts() {
    let auth = service();
    auth.register(0, sid(1), "alice", "pw").await.unwrap();
    auth.login(10_000, sid(2), "alice", "pw").await.unwrap();

    auth.sweep(11_000).await;

    assert_eq!(auth.cached_verdicts().await, 1);
}

#[tokio::test]
async fn test_forget_session_resets_rate_window() {
    let auth = service();
    auth.register(0, sid(1), "alice", "pw").await.unwrap();

    // Session 1 reconnects and gets a fresh tracker: not limited.
    auth.forget_session(sid(1)).await;
    let code = auth.register(1, sid(1), "bob", "pw").await.unwrap();

    assert_eq!(code, CODE_OK);
}
