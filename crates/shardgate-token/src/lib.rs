//! Gate tokens: short-lived RS256 credentials bridging the auth server
//! and the gate servers.
//!
//! The auth server verifies a password exactly once, then hands the
//! client a signed token naming the account, the gate address it may
//! connect to, and the shard it is valid for. The gate never sees a
//! password and holds no key capable of minting tokens — it carries
//! only the public half of the keypair.
//!
//! ```text
//! auth server ── TokenIssuer (private + public key) ──► token
//!                                                         │
//! gate server ── TokenVerifier (public key only) ◄────────┘
//! ```
//!
//! # Lifetime policy
//!
//! Tokens carry a very short `exp` (default 3 s past issuance), but the
//! verifier runs with `validate_exp = false`. That is deliberate, not
//! an oversight: a token is single-use and consumed within one
//! connection round-trip, so expiry is enforced by the issuer's short
//! window rather than re-checked by the verifier. Revisit before
//! letting tokens live longer or be replayed.

mod claims;
mod error;
mod issuer;
mod verifier;

pub use claims::GateClaims;
pub use error::TokenError;
pub use issuer::{TokenConfig, TokenIssuer};
pub use verifier::TokenVerifier;

/// Fixed `iss` claim on every gate token.
pub const TOKEN_ISSUER: &str = "shardgate-auth";

/// Fixed `aud` claim on every gate token.
pub const TOKEN_AUDIENCE: &str = "shardgate-gate";
