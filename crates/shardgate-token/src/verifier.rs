//! Token verification — lives on the gate server.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::{GateClaims, TOKEN_AUDIENCE, TOKEN_ISSUER, TokenError};

/// Verifies gate tokens against the cluster's RSA public key.
///
/// The gate holds only the public half of the keypair: a compromised
/// gate cannot mint tokens for other shards. Read-only after
/// construction, shared across connection tasks without a lock.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Builds a verifier from a PEM-encoded RSA public key.
    pub fn new(public_key_pem: &str) -> Result<Self, TokenError> {
        let key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(TokenError::BadKey)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.set_issuer(&[TOKEN_ISSUER]);
        // Expiry is the issuer's short window, not re-checked here.
        // See the crate-level docs before changing this.
        validation.validate_exp = false;

        Ok(Self { key, validation })
    }

    /// Verifies signature, issuer, and audience, returning the claims.
    ///
    /// Never panics and never lets a `jsonwebtoken` error escape raw:
    /// each failure is mapped to a [`TokenError`] category and logged,
    /// so the caller only has to decide "terminate or proceed".
    pub fn verify(&self, token: &str) -> Result<GateClaims, TokenError> {
        match decode::<GateClaims>(token, &self.key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => {
                let err = match e.kind() {
                    ErrorKind::InvalidAudience => TokenError::BadAudience,
                    ErrorKind::InvalidIssuer => TokenError::BadIssuer,
                    ErrorKind::InvalidSignature => TokenError::BadSignature,
                    _ => TokenError::Invalid(e.to_string()),
                };
                tracing::warn!(error = %err, "gate token rejected");
                Err(err)
            }
        }
    }
}
