//! Conversation type definitions.
//!
//! Defines [`Role`] (who spoke), [`ChatTurn`] (one stored message),
//! [`TurnId`] (opaque store key) and [`ConversationId`] (the key every turn of
//! one conversation shares).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a turn, using the chat-completions role vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// SQL- and wire-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// Identifier handed back by the store for a persisted turn (UUID v7).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(pub String);

impl TurnId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }
}

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key shared by every turn of one conversation.
///
/// Derived from the display name, so the same user returns to the same
/// conversation across runs: `chat_<normalized>`. A fresh conversation under
/// the same name appends the creation instant in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(String);

impl ConversationId {
    /// The standing conversation for a display name.
    pub fn for_user(display_name: &str) -> Self {
        Self(format!("chat_{}", normalize_name(display_name)))
    }

    /// A new, empty conversation for a display name, scoped by `now`.
    pub fn fresh(display_name: &str, now: DateTime<Utc>) -> Self {
        Self(format!(
            "chat_{}_{}",
            normalize_name(display_name),
            now.timestamp_millis()
        ))
    }

    /// Wrap an identifier read back from storage or the command line.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase, then drop everything that is not an ASCII letter or digit.
pub fn normalize_name(display_name: &str) -> String {
    display_name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// One message in a conversation, matching the `chat_turns` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub conversation_id: ConversationId,
    pub role: Role,
    pub text: String,
    /// Display name of whoever produced the text.
    pub sender: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(
        conversation_id: &ConversationId,
        role: Role,
        text: impl Into<String>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.clone(),
            role,
            text: text.into(),
            sender: sender.into(),
            timestamp: Utc::now(),
        }
    }
}
