//! Token issuance — lives on the auth server.

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use rand::Rng;
use shardgate_protocol::{AccountId, ShardId};

use crate::{GateClaims, TOKEN_AUDIENCE, TOKEN_ISSUER, TokenError};

/// Knobs for token issuance.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// How long past issuance the `exp` claim is set. Kept very short:
    /// a token is consumed in the immediately following gate login.
    pub expiry_ms: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self { expiry_ms: 3_000 }
    }
}

/// Signs gate tokens with the cluster's RSA private key.
///
/// One instance per auth server, created at startup from configured
/// PEM key material. Read-only after construction, so it is shared
/// across connection tasks without a lock.
pub struct TokenIssuer {
    key: EncodingKey,
    header: Header,
    config: TokenConfig,
}

impl TokenIssuer {
    /// Builds an issuer from a PEM-encoded RSA private key.
    ///
    /// # Errors
    /// Returns [`TokenError::BadKey`] if the PEM is not an RSA private
    /// key (PKCS#1 and PKCS#8 are both accepted).
    pub fn new(private_key_pem: &str, config: TokenConfig) -> Result<Self, TokenError> {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(TokenError::BadKey)?;
        Ok(Self {
            key,
            header: Header::new(Algorithm::RS256),
            config,
        })
    }

    /// Issues a token authorizing `uid` to log in at `address:port`,
    /// optionally pinned to `shard`.
    pub fn issue(
        &self,
        now_ms: i64,
        uid: AccountId,
        address: &str,
        port: u16,
        shard: Option<ShardId>,
    ) -> Result<String, TokenError> {
        let claims = GateClaims {
            uid: uid.0,
            address: address.to_string(),
            port,
            shard: shard.map(|s| s.0),
            jti: new_jti(),
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
            exp: ((now_ms + self.config.expiry_ms).max(0) / 1_000) as u64,
        };
        encode(&self.header, &claims, &self.key).map_err(TokenError::Sign)
    }
}

/// Generates a random 32-character hex string (128 bits of entropy)
/// for the `jti` claim.
fn new_jti() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_garbage_pem() {
        let result = TokenIssuer::new("not a pem", TokenConfig::default());
        assert!(matches!(result, Err(TokenError::BadKey(_))));
    }

    #[test]
    fn test_new_jti_is_32_hex_chars_and_unique() {
        let a = new_jti();
        let b = new_jti();
        assert_eq!(a.len(), 32);
        assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
