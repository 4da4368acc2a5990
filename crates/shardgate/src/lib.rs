//! # Shardgate
//!
//! Account and session lifecycle servers for sharded game clusters.
//!
//! A cluster runs one auth server and one gate server per shard. The
//! auth server owns credentials: it registers accounts, verifies
//! passwords with bcrypt, and issues short-lived RS256 tokens pinned
//! to a shard. A gate server never sees a password — it admits
//! sessions by verifying tokens against the cluster public key, then
//! manages the per-account lifecycle: duplicate-login eviction,
//! disconnect grace windows, and persistence on the way out.
//!
//! ```text
//!   client ── register/login ──► AuthServer ── token (RS256) ──► client
//!   client ── token login ─────► GateServer ── bound session
//! ```
//!
//! The business crates (`shardgate-auth`, `shardgate-gate`) take time
//! as an explicit `now_ms` argument and never sleep; the servers here
//! supply the wall clock and drive expiry from a 100 ms sweeper task.

mod auth_server;
mod error;
mod gate_server;
mod time;

pub use auth_server::AuthServer;
pub use error::ShardgateError;
pub use gate_server::GateServer;
pub use time::wall_clock_ms;

pub use shardgate_auth::{AuthConfig, AuthService, MemoryAccountStore};
pub use shardgate_gate::{GateConfig, GateManager, MemoryGameAccountStore};
pub use shardgate_protocol::{
    AccountId, AccountSnapshot, AuthRequest, AuthResponse, CODE_BAD_CREDENTIALS,
    CODE_DUPLICATE_ACCOUNT, CODE_OK, CODE_RATE_LIMITED, GateRequest,
    GateResponse, SessionId, ShardId,
};
pub use shardgate_token::{TokenConfig, TokenIssuer, TokenVerifier};

/// How often the servers drive expiry in their business state.
pub const SWEEP_INTERVAL_MS: u64 = 100;
