//! Identity newtypes shared by every layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A persistent account identifier — the database primary key.
///
/// Newtype over `i64` so an account id can never be confused with a
/// session id or a timestamp in a signature. `#[serde(transparent)]`
/// keeps the wire form a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A-{}", self.0)
    }
}

/// An opaque, stable identifier for one live connection.
///
/// Assigned by the network layer when a connection is accepted and
/// never reused for the lifetime of the process. `0` is reserved to
/// mean "no session bound".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl SessionId {
    /// The "no session" sentinel.
    pub const NONE: SessionId = SessionId(0);

    /// Returns `true` if this id refers to an actual session.
    pub fn is_bound(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// Identifier of a specific gate instance (a shard).
///
/// Gate tokens embed the shard they were issued for; a gate only
/// accepts tokens carrying its own id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardId(pub u32);

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&AccountId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_session_id_none_is_not_bound() {
        assert!(!SessionId::NONE.is_bound());
        assert!(SessionId(7).is_bound());
    }

    #[test]
    fn test_display_prefixes() {
        assert_eq!(AccountId(3).to_string(), "A-3");
        assert_eq!(SessionId(9).to_string(), "S-9");
        assert_eq!(ShardId(1).to_string(), "G-1");
    }

    #[test]
    fn test_ids_work_as_map_keys() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(AccountId(1), "alice");
        map.insert(AccountId(2), "bob");
        assert_eq!(map[&AccountId(1)], "alice");
    }
}
