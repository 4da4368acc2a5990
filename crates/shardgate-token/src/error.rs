//! Error type for token issuance and verification.

/// Errors from the token layer.
///
/// Verification failures are categorized so the gate can log what kind
/// of hostile or stale input it saw, while still treating every
/// category the same way: terminate the connection, send nothing back.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The PEM key material handed to a constructor is not a usable
    /// RSA key. Raised at startup, never per-request.
    #[error("invalid RSA key material: {0}")]
    BadKey(#[source] jsonwebtoken::errors::Error),

    /// Signing failed. Effectively unreachable with a valid key.
    #[error("failed to sign gate token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),

    /// The `aud` claim does not match this cluster's audience.
    #[error("gate token audience mismatch")]
    BadAudience,

    /// The `iss` claim does not match this cluster's issuer.
    #[error("gate token issuer mismatch")]
    BadIssuer,

    /// The signature does not verify against the configured public key.
    #[error("gate token signature invalid")]
    BadSignature,

    /// Anything else: truncated, malformed, wrong algorithm, missing
    /// claims. The inner string is for logs only.
    #[error("gate token rejected: {0}")]
    Invalid(String),
}
