//! Reserved words recognized at the chat prompt.
//!
//! Matching is case-insensitive on the trimmed line; anything else non-empty
//! is a chat message.

/// What one input line asks the session to do.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// `quit` or `exit`.
    Quit,
    /// `history` or `load`: re-read the current conversation from the store.
    Reload,
    /// `new` or `reset`: switch to a fresh, empty conversation.
    NewConversation,
    /// Anything else with content.
    Message(String),
    /// Blank line.
    Empty,
}

pub fn parse(input: &str) -> Command {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Command::Empty;
    }

    match trimmed.to_lowercase().as_str() {
        "quit" | "exit" => Command::Quit,
        "history" | "load" => Command::Reload,
        "new" | "reset" => Command::NewConversation,
        _ => Command::Message(input.to_string()),
    }
}
