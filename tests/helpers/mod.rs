#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use lmchat::config::{ContextConfig, InferenceConfig};
use lmchat::conversation::{ChatTurn, ConversationId, ConversationStore, Role, SqliteStore};
use lmchat::inference::{build_messages, parse_reply, ChatBackend, SystemContext, WireMessage};
use lmchat::render::Palette;
use lmchat::session::Session;
use lmchat::ChatError;

/// Fresh in-memory store with the schema applied.
pub fn test_store() -> SqliteStore {
    SqliteStore::new(lmchat::db::open_memory_database().unwrap())
}

/// Append `count` alternating user/assistant turns ("turn 0", "turn 1", ...) to `id`.
pub fn seed_turns(store: &mut SqliteStore, id: &ConversationId, count: usize) {
    for i in 0..count {
        let (role, sender) = if i % 2 == 0 {
            (Role::User, "Ana")
        } else {
            (Role::Assistant, "bot")
        };
        store
            .append(&mut ChatTurn::new(id, role, format!("turn {i}"), sender))
            .unwrap();
    }
}

/// What the fake backend answers for one request.
pub enum Reply {
    /// A well-formed completion with this content.
    Text(&'static str),
    /// A raw response body, run through the real parser.
    Body(&'static str),
}

/// Scripted [`ChatBackend`] that records the message list it would have sent.
#[derive(Default)]
pub struct FakeBackend {
    replies: RefCell<VecDeque<Reply>>,
    pub sent: RefCell<Vec<Vec<WireMessage>>>,
}

impl FakeBackend {
    pub fn with_replies(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: RefCell::new(replies.into_iter().collect()),
            sent: RefCell::new(Vec::new()),
        }
    }
}

impl ChatBackend for FakeBackend {
    async fn ask(
        &self,
        system: &SystemContext,
        history: &[ChatTurn],
        new_message: &str,
    ) -> Result<String, ChatError> {
        self.sent.borrow_mut().push(build_messages(
            system,
            history,
            new_message,
            &ContextConfig::default(),
        ));
        match self.replies.borrow_mut().pop_front() {
            Some(Reply::Text(text)) => Ok(text.to_string()),
            Some(Reply::Body(body)) => parse_reply(body),
            None => parse_reply(r#"{"choices":[]}"#),
        }
    }
}

pub type TestSession<S, B> = Session<S, B, Vec<u8>>;

/// Session for "Ana" writing uncolored output into a buffer, rendering at width 80.
pub fn test_session<S, B>(store: S, backend: B) -> TestSession<S, B>
where
    S: ConversationStore,
    B: ChatBackend,
{
    Session::new(store, backend, Vec::new(), "Ana", &InferenceConfig::default())
        .with_palette(Palette::plain())
        .with_width(|| 80)
}

/// Everything the session printed, with any styling removed.
pub fn output_of<S, B>(session: &TestSession<S, B>) -> String
where
    S: ConversationStore,
    B: ChatBackend,
{
    console::strip_ansi_codes(&String::from_utf8_lossy(session.output())).into_owned()
}
