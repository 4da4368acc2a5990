//! Error type for the gate manager.

use shardgate_protocol::ShardId;
use shardgate_token::TokenError;

use crate::StoreError;

/// Why a gate operation failed.
///
/// Token and shard failures mean the connection should be terminated
/// without a response; store failures are infrastructure faults.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The presented token did not verify.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The token is pinned to a different shard than this gate serves.
    #[error("token is for shard {token}, this gate serves {gate}")]
    ShardMismatch { token: ShardId, gate: ShardId },

    /// The gate account store is unreachable or failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
