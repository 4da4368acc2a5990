//! Error type for the authentication service.

use crate::StoreError;
use shardgate_token::TokenError;

/// Failures the auth service cannot express as a wire error code.
///
/// Business outcomes (duplicate account, bad credentials, rate limit)
/// are NOT errors — they are codes in the normal return value. This
/// enum is for infrastructure faults only.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The account store is unreachable or failed a query.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Password hashing or verification failed internally.
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    /// Gate-token issuance failed.
    #[error(transparent)]
    Token(#[from] TokenError),
}
