//! Strongly-typed identifiers for domain entities

use serde::{Deserialize, Serialize};

/// Identifier of one character-creation dialogue.
///
/// One session per chat: the inner value is the chat identifier assigned
/// by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(i64);

impl SessionId {
    pub fn new(chat_id: i64) -> Self {
        Self(chat_id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SessionId {
    fn from(chat_id: i64) -> Self {
        Self(chat_id)
    }
}

impl From<SessionId> for i64 {
    fn from(id: SessionId) -> i64 {
        id.0
    }
}
