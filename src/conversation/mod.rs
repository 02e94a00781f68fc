pub mod store;
pub mod types;

pub use store::{ConversationStore, ConversationSummary, SqliteStore};
pub use types::{ChatTurn, ConversationId, Role, TurnId};
