//! Append-only turn persistence.
//!
//! [`ConversationStore`] is the seam the session loop talks to; [`SqliteStore`]
//! is the production implementation over the `chat_turns` table. Reads degrade
//! to an empty history instead of failing, so a damaged database never blocks
//! session start-up.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use super::types::{ChatTurn, ConversationId, TurnId};
use crate::error::ChatError;

/// Durable storage for chat turns, keyed by conversation.
pub trait ConversationStore {
    /// Persist one turn atomically and return its identifier. `turn.timestamp`
    /// is updated to the time the store recorded.
    fn append(&mut self, turn: &mut ChatTurn) -> Result<TurnId, ChatError>;

    /// All turns of a conversation, oldest first. Empty when the conversation
    /// is unknown or the store cannot be read (the latter is logged).
    fn load_history(&self, conversation_id: &ConversationId) -> Vec<ChatTurn>;
}

/// Per-conversation summary for listings.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub turns: usize,
    pub last_activity: DateTime<Utc>,
}

/// [`ConversationStore`] backed by a SQLite connection.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Like [`ConversationStore::load_history`] but surfaces read failures.
    pub fn try_load_history(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<ChatTurn>, ChatError> {
        let mut stmt = self.conn.prepare(
            "SELECT conversation_id, role, text, sender, timestamp FROM chat_turns \
             WHERE conversation_id = ?1 ORDER BY timestamp ASC, rowid ASC",
        )?;

        let turns = stmt
            .query_map(params![conversation_id.as_str()], |row| {
                let role_str: String = row.get(1)?;
                let micros: i64 = row.get(4)?;
                Ok(ChatTurn {
                    conversation_id: ConversationId::from_raw(row.get::<_, String>(0)?),
                    role: role_str
                        .parse()
                        .map_err(|_| rusqlite::Error::InvalidQuery)?,
                    text: row.get(2)?,
                    sender: row.get(3)?,
                    timestamp: micros_to_datetime(micros)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(turns)
    }

    /// Every stored conversation, most recently active first.
    pub fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ChatError> {
        let mut stmt = self.conn.prepare(
            "SELECT conversation_id, COUNT(*), MAX(timestamp) FROM chat_turns \
             GROUP BY conversation_id ORDER BY MAX(timestamp) DESC",
        )?;

        let summaries = stmt
            .query_map([], |row| {
                let turns: i64 = row.get(1)?;
                Ok(ConversationSummary {
                    conversation_id: row.get(0)?,
                    turns: turns as usize,
                    last_activity: micros_to_datetime(row.get(2)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(summaries)
    }

    pub fn turn_count(&self, conversation_id: &ConversationId) -> Result<usize, ChatError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM chat_turns WHERE conversation_id = ?1",
            params![conversation_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl ConversationStore for SqliteStore {
    fn append(&mut self, turn: &mut ChatTurn) -> Result<TurnId, ChatError> {
        let tx = self.conn.transaction()?;

        // Strictly increasing per conversation, even when the clock stalls or steps back.
        let last: Option<i64> = tx
            .query_row(
                "SELECT MAX(timestamp) FROM chat_turns WHERE conversation_id = ?1",
                params![turn.conversation_id.as_str()],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?
            .flatten();
        let requested = turn.timestamp.timestamp_micros();
        let timestamp = match last {
            Some(last) if requested <= last => last + 1,
            _ => requested,
        };
        let recorded_at = micros_to_datetime(timestamp)?;

        let id = TurnId::generate();
        tx.execute(
            "INSERT INTO chat_turns (id, conversation_id, role, text, sender, timestamp) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id.0,
                turn.conversation_id.as_str(),
                turn.role.as_str(),
                turn.text,
                turn.sender,
                timestamp,
            ],
        )?;
        tx.commit()?;
        turn.timestamp = recorded_at;

        tracing::debug!(
            turn_id = %id,
            conversation_id = %turn.conversation_id,
            role = %turn.role,
            "turn appended"
        );
        Ok(id)
    }

    fn load_history(&self, conversation_id: &ConversationId) -> Vec<ChatTurn> {
        match self.try_load_history(conversation_id) {
            Ok(turns) => turns,
            Err(e) => {
                tracing::warn!(
                    conversation_id = %conversation_id,
                    error = %e,
                    "could not load conversation history, starting empty"
                );
                Vec::new()
            }
        }
    }
}

fn micros_to_datetime(micros: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(4, micros))
}
