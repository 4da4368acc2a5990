//! Gate-side session and account lifecycle for Shardgate.
//!
//! A gate terminates client connections after authentication. For each
//! account it keeps one cached [`GameAccount`] that moves through a
//! small state machine:
//!
//! ```text
//!  Absent ──(login: load/create)──► Bound ──(disconnect)──► Grace
//!    ▲                                ▲                       │
//!    │                                └──────(re-login)───────┤
//!    └──────(grace expires: persist + evict)◄─────────────────┘
//! ```
//!
//! - **Bound**: a live session owns the account. A second valid login
//!   for the same account displaces the old session: it is told
//!   `RepeatLogin`, given a short window for the push to flush, then
//!   closed.
//! - **Grace**: the session dropped but the account stays cached so a
//!   quick reconnect (mobile network flap) costs no database round
//!   trip and loses no in-memory state. If nobody returns, the account
//!   is persisted and evicted.
//!
//! Every eviction timer captures the entry's instance id when it is
//! scheduled; a rebind bumps the id, so a stale timer firing later is
//! a silent no-op rather than a lost account.

#![allow(async_fn_in_trait)]

mod account;
mod error;
mod manager;
mod session;

pub use account::{GameAccount, GameAccountStore, MemoryGameAccountStore, StoreError};
pub use error::GateError;
pub use manager::{GateConfig, GateManager};
pub use session::{SessionEvent, SessionSender};
