//! The payload carried inside a gate token.

use serde::{Deserialize, Serialize};
use shardgate_protocol::{AccountId, ShardId};

/// Claims embedded in a gate token.
///
/// `uid`/`address`/`port`/`shard` are the application payload; the
/// rest are standard JWT claims. `shard` is optional on the wire —
/// tokens without it are accepted by any gate (used by internal
/// tooling), while shard-pinned tokens only pass the gate they name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateClaims {
    /// Account id the token authenticates.
    pub uid: i64,

    /// Gate address the client was directed to.
    pub address: String,

    /// Gate port the client was directed to.
    pub port: u16,

    /// Shard the token is valid for, if pinned.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub shard: Option<u32>,

    /// Unique token id (128-bit hex). Makes every issued token
    /// distinct even for back-to-back logins of the same account.
    pub jti: String,

    /// Issuer — always [`TOKEN_ISSUER`](crate::TOKEN_ISSUER).
    pub iss: String,

    /// Audience — always [`TOKEN_AUDIENCE`](crate::TOKEN_AUDIENCE).
    pub aud: String,

    /// Expiry, unix epoch seconds. See the crate docs for why the
    /// verifier does not re-check this.
    pub exp: u64,
}

impl GateClaims {
    /// The account id as its newtype.
    pub fn account_id(&self) -> AccountId {
        AccountId(self.uid)
    }

    /// The pinned shard as its newtype, if any.
    pub fn shard_id(&self) -> Option<ShardId> {
        self.shard.map(ShardId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_omitted_from_json_when_none() {
        let claims = GateClaims {
            uid: 1,
            address: "127.0.0.1".into(),
            port: 20001,
            shard: None,
            jti: "00".into(),
            iss: "i".into(),
            aud: "a".into(),
            exp: 0,
        };
        let json: serde_json::Value = serde_json::to_value(&claims).unwrap();
        assert!(json.get("shard").is_none());
    }

    #[test]
    fn test_claims_without_shard_field_deserialize() {
        // Older tooling-issued tokens have no shard claim at all.
        let json = r#"{"uid":7,"address":"gate","port":1,
                       "jti":"x","iss":"i","aud":"a","exp":10}"#;
        let claims: GateClaims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.shard_id(), None);
        assert_eq!(claims.account_id(), AccountId(7));
    }
}
