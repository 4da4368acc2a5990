//! Request/response messages for the auth server and the gate server.
//!
//! Both enums are internally tagged (`#[serde(tag = "type")]`), so a
//! login request travels as `{"type": "Login", "username": …}`. The
//! tag-based format keeps client SDKs free of positional decoding.
//!
//! Protocol rules enforced by the handlers (not by serde):
//! - The auth server answers every well-formed request.
//! - The gate server answers only authenticated requests. A malformed
//!   frame, a bad token, or a request before login terminates the
//!   connection with no response at all.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Auth server (registration / login)
// ---------------------------------------------------------------------------

/// Client → auth server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthRequest {
    /// Create a new account.
    Register { username: String, password: String },

    /// Authenticate and obtain a single-use gate token.
    Login { username: String, password: String },
}

/// Auth server → client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthResponse {
    /// Outcome of a `Register`. `code` is one of the `CODE_*` constants.
    RegisterAck { code: i32 },

    /// Outcome of a `Login`. On success (`code == CODE_OK`) `token`
    /// carries the RS256 gate token; on failure it is `None`.
    LoginAck { code: i32, token: Option<String> },
}

// ---------------------------------------------------------------------------
// Gate server (token login / account info)
// ---------------------------------------------------------------------------

/// Client → gate server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GateRequest {
    /// Present a gate token obtained from the auth server.
    /// Must be the first request on the connection.
    Login { token: String },

    /// Fetch the account snapshot for the already-bound session.
    GetAccountInfo,
}

/// Gate server → client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GateResponse {
    /// Outcome of a gate `Login`. Only sent on success — failed logins
    /// terminate the connection instead of answering.
    LoginAck { code: i32, account: AccountSnapshot },

    /// Reply to `GetAccountInfo`.
    AccountInfo { account: AccountSnapshot },

    /// Server push: this session is being displaced by a newer login
    /// for the same account. No payload beyond the message type.
    RepeatLogin,
}

/// The client-visible slice of a game account.
///
/// Timestamps are unix epoch milliseconds. The bound session id is
/// live-connection state and never leaves the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub create_time: i64,
    pub login_time: i64,
}

#[cfg(test)]
mod tests {
    //! The wire shapes below are contractual: client SDKs parse these
    //! exact JSON layouts.

    use super::*;

    #[test]
    fn test_auth_request_login_json_format() {
        let msg = AuthRequest::Login {
            username: "alice".into(),
            password: "hunter2".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "Login");
        assert_eq!(json["username"], "alice");
        assert_eq!(json["password"], "hunter2");
    }

    #[test]
    fn test_auth_response_login_ack_success_carries_token() {
        let msg = AuthResponse::LoginAck {
            code: 0,
            token: Some("jwt-here".into()),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "LoginAck");
        assert_eq!(json["code"], 0);
        assert_eq!(json["token"], "jwt-here");
    }

    #[test]
    fn test_auth_response_login_ack_failure_token_is_null() {
        let msg = AuthResponse::LoginAck {
            code: 2,
            token: None,
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert!(json["token"].is_null());
    }

    #[test]
    fn test_gate_request_login_round_trip() {
        let msg = GateRequest::Login {
            token: "abc.def.ghi".into(),
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let decoded: GateRequest = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_gate_request_get_account_info_json_format() {
        let json =
            serde_json::to_string(&GateRequest::GetAccountInfo).unwrap();
        assert_eq!(json, r#"{"type":"GetAccountInfo"}"#);
    }

    #[test]
    fn test_gate_response_repeat_login_has_no_payload() {
        let json = serde_json::to_string(&GateResponse::RepeatLogin).unwrap();
        assert_eq!(json, r#"{"type":"RepeatLogin"}"#);
    }

    #[test]
    fn test_gate_response_login_ack_round_trip() {
        let msg = GateResponse::LoginAck {
            code: 0,
            account: AccountSnapshot {
                create_time: 1_000,
                login_time: 2_000,
            },
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let decoded: GateResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_decode_unknown_request_type_returns_error() {
        let unknown = r#"{"type": "FormatHardDrive"}"#;
        let result: Result<GateRequest, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_missing_field_returns_error() {
        let missing = r#"{"type": "Login"}"#;
        let result: Result<AuthRequest, _> = serde_json::from_str(missing);
        assert!(result.is_err());
    }
}
