//! Account authentication for Shardgate's login server.
//!
//! This crate owns the register/login state machine:
//!
//! 1. **Rate limiting** — per-session minimum request interval; a
//!    too-fast caller gets a fixed error code and touches no state.
//! 2. **Per-account-key locking** — `await` points inside register and
//!    login let logically-concurrent requests for the same username
//!    interleave even on a cooperative scheduler, so both operations
//!    run under an async mutex keyed by `(kind, username)`.
//! 3. **Result caching** — a login outcome is cached for a short TTL
//!    so a burst of duplicate logins costs exactly one database read.
//! 4. **Token issuance** — a successful login yields a short-lived
//!    RS256 gate token (see `shardgate-token`).
//!
//! # How it fits in the stack
//!
//! ```text
//! shardgate (AuthServer handler)   ← decodes wire requests
//!     ↕
//! shardgate-auth (this crate)      ← register/login semantics
//!     ↕
//! AccountStore (trait)             ← your database; MemoryAccountStore
//!                                    for tests and demos
//! ```

#![allow(async_fn_in_trait)]

mod account;
mod error;
mod locks;
mod service;

pub use account::{Account, AccountStore, MemoryAccountStore, StoreError};
pub use error::AuthError;
pub use locks::{KeyGuard, KeyedLocks, LockKind};
pub use service::{AuthConfig, AuthService, LoginOutcome};
