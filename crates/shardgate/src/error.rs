//! Unified error type for the Shardgate servers.

use shardgate_auth::AuthError;
use shardgate_gate::GateError;
use shardgate_net::NetError;
use shardgate_protocol::ProtocolError;
use shardgate_token::TokenError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From`
/// impls, so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ShardgateError {
    /// A network-level error (bind, accept, send, recv).
    #[error(transparent)]
    Net(#[from] NetError),

    /// A wire-format error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An auth-service fault (store, hashing, token issuance).
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A gate fault (token verification, shard pin, store).
    #[error(transparent)]
    Gate(#[from] GateError),

    /// A token-layer error outside the auth/gate services.
    #[error(transparent)]
    Token(#[from] TokenError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_net_error() {
        let err = NetError::Bind(std::io::Error::other("port taken"));
        let top: ShardgateError = err.into();
        assert!(matches!(top, ShardgateError::Net(_)));
        assert!(top.to_string().contains("port taken"));
    }

    #[test]
    fn test_from_gate_error() {
        let err = GateError::ShardMismatch {
            token: shardgate_protocol::ShardId(2),
            gate: shardgate_protocol::ShardId(1),
        };
        let top: ShardgateError = err.into();
        assert!(matches!(top, ShardgateError::Gate(_)));
    }
}
