//! Codec seam between message types and raw bytes.
//!
//! Handlers never call `serde_json` directly — they go through the
//! [`Codec`] trait so the wire format can be swapped (a binary codec
//! for production, JSON for development) without touching dispatch
//! code.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes and decodes wire messages.
///
/// `Send + Sync + 'static` because a codec is stored in long-lived
/// server state shared across connection tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] for malformed or mistyped input.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// JSON codec via `serde_json`.
///
/// Human-readable frames, easy to inspect in logs and browser dev
/// tools. The default for development and for the test suites.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{AuthRequest, GateResponse};

    #[test]
    fn test_json_codec_round_trips_auth_request() {
        let codec = JsonCodec;
        let msg = AuthRequest::Register {
            username: "bob".into(),
            password: "pw".into(),
        };
        let bytes = codec.encode(&msg).unwrap();
        let decoded: AuthRequest = codec.decode(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_json_codec_decode_garbage_returns_error() {
        let codec = JsonCodec;
        let result: Result<GateResponse, _> = codec.decode(b"\x00\x01 nope");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
