//! Error type for the protocol layer.

/// Errors raised while encoding, decoding, or validating wire frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed. Rare in practice — it means a server-side
    /// type produced a value the codec cannot represent.
    #[cfg(feature = "json")]
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// The incoming bytes are not a well-formed message.
    #[cfg(feature = "json")]
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),

    /// A structurally valid frame arrived where the protocol forbids it
    /// (for example, a request before the gate login).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
