//! Chat-completions wire format.
//!
//! Builds the request message list (system prompt, bounded history window,
//! new user message) and turns a response body into either the reply text or
//! a structured [`ChatError`].

use serde::{Deserialize, Serialize};

use crate::config::ContextConfig;
use crate::conversation::{ChatTurn, Role};
use crate::error::ChatError;

/// Per-request facts about the session that shape the system prompt.
#[derive(Debug, Clone)]
pub struct SystemContext {
    pub user_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    pub messages: &'a [WireMessage],
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Hint lines for every user-authored line that mentions one of `markers`
/// (case-insensitive). A heuristic: misses are expected.
pub fn extract_user_facts(history: &[ChatTurn], markers: &[String]) -> Vec<String> {
    let markers: Vec<String> = markers.iter().map(|m| m.to_lowercase()).collect();
    history
        .iter()
        .filter(|turn| turn.role == Role::User)
        .flat_map(|turn| turn.text.lines())
        .filter(|line| {
            let lower = line.to_lowercase();
            markers.iter().any(|m| lower.contains(m.as_str()))
        })
        .map(|line| format!("User mentioned: {line}"))
        .collect()
}

pub fn system_prompt(user_name: &str, facts: &[String]) -> String {
    let mut prompt = format!(
        "You are having a conversation with {user_name}. You have access to the \
         conversation history and should use it to give personalized, contextual \
         answers. Remember details about the user and the topics discussed. If the \
         user has mentioned their name or personal details earlier, remember and \
         refer to them."
    );
    if !facts.is_empty() {
        prompt.push_str("\n\nKey information about the user:\n");
        prompt.push_str(&facts.join("\n"));
    }
    prompt
}

/// One system message, then the last `history_window` turns oldest first,
/// then the new user message.
///
/// Facts are mined from all of `history`, not just the window.
pub fn build_messages(
    system: &SystemContext,
    history: &[ChatTurn],
    new_message: &str,
    context: &ContextConfig,
) -> Vec<WireMessage> {
    let facts = extract_user_facts(history, &context.fact_markers);
    let window = &history[history.len().saturating_sub(context.history_window)..];

    let mut messages = Vec::with_capacity(window.len() + 2);
    messages.push(WireMessage {
        role: Role::System,
        content: system_prompt(&system.user_name, &facts),
    });
    messages.extend(window.iter().map(|turn| WireMessage {
        role: turn.role,
        content: turn.text.clone(),
    }));
    messages.push(WireMessage {
        role: Role::User,
        content: new_message.to_string(),
    });
    messages
}

/// Extract `choices[0].message.content` from a response body.
pub fn parse_reply(body: &str) -> Result<String, ChatError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|source| ChatError::Parse {
        body: body.to_string(),
        source,
    })?;

    let malformed = || ChatError::MalformedResponse {
        body: body.to_string(),
    };
    let response: CompletionResponse = serde_json::from_value(value).map_err(|_| malformed())?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(malformed)
}
