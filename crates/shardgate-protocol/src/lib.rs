//! Wire protocol for Shardgate's auth and gate servers.
//!
//! Everything a client and server exchange is defined here: identity
//! newtypes, the request/response enums for both server roles, the
//! numeric error codes, and the [`Codec`] seam used to serialize it all.
//!
//! # How it fits in the stack
//!
//! ```text
//! shardgate (servers/handlers)   ← dispatches on these messages
//!     ↕
//! shardgate-auth / shardgate-gate ← produce codes and snapshots
//!     ↕
//! shardgate-protocol (this crate) ← the shared vocabulary
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{
    AccountSnapshot, AuthRequest, AuthResponse, GateRequest, GateResponse,
};
pub use types::{AccountId, SessionId, ShardId};

/// Request accepted, operation succeeded.
pub const CODE_OK: i32 = 0;
/// Registration rejected: the username is already taken.
pub const CODE_DUPLICATE_ACCOUNT: i32 = 1;
/// Login rejected: unknown username or wrong password.
/// Deliberately one code for both so the response can't be used to
/// probe which usernames exist.
pub const CODE_BAD_CREDENTIALS: i32 = 2;
/// Request arrived below the minimum per-session interval.
/// Fixed wire constant — clients key retry/backoff UX off this value.
pub const CODE_RATE_LIMITED: i32 = 3;
