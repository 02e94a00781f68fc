mod helpers;

use helpers::{output_of, seed_turns, test_session, test_store, FakeBackend, Reply};
use lmchat::conversation::{ChatTurn, ConversationId, ConversationStore, Role, TurnId};
use lmchat::session::Flow;
use lmchat::ChatError;

#[tokio::test]
async fn chat_message_stores_both_turns() {
    let backend = FakeBackend::with_replies([Reply::Text("Hello Ana!")]);
    let mut session = test_session(test_store(), backend);

    let flow = session.handle_line("hi there").await.unwrap();
    assert_eq!(flow, Flow::Continue);

    let id = ConversationId::for_user("Ana");
    let stored = session.store().load_history(&id);
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].role, Role::User);
    assert_eq!(stored[0].text, "hi there");
    assert_eq!(stored[0].sender, "Ana");
    assert_eq!(stored[1].role, Role::Assistant);
    assert_eq!(stored[1].text, "Hello Ana!");
    assert_eq!(stored[1].sender, "Llama 3.3-70B");

    assert_eq!(session.mirror().len(), 2);
    let out = output_of(&session);
    assert!(out.contains("message ID "));
    assert!(out.contains("Llama 3.3-70B:"));
    assert!(out.contains("Hello Ana!"));
    assert!(out.contains("response ID "));
}

#[tokio::test]
async fn new_message_is_not_duplicated_in_context() {
    let backend = FakeBackend::with_replies([Reply::Text("ok"), Reply::Text("ok again")]);
    let mut session = test_session(test_store(), &backend);
    session.handle_line("first message").await.unwrap();
    session.handle_line("second message").await.unwrap();

    let sent = backend.sent.borrow();
    let first: Vec<&str> = sent[0][1..].iter().map(|m| m.content.as_str()).collect();
    assert_eq!(first, ["first message"]);
    let second: Vec<&str> = sent[1][1..].iter().map(|m| m.content.as_str()).collect();
    assert_eq!(second, ["first message", "ok", "second message"]);
}

#[tokio::test]
async fn fifteen_prior_turns_send_twelve_messages() {
    let mut store = test_store();
    seed_turns(&mut store, &ConversationId::for_user("Ana"), 15);

    let backend = FakeBackend::with_replies([Reply::Text("ok")]);
    let mut session = test_session(store, &backend);
    session.start().unwrap();
    assert_eq!(session.mirror().len(), 15);

    session.handle_line("what did I say?").await.unwrap();

    let sent = backend.sent.borrow();
    assert_eq!(sent.len(), 1);
    let messages = &sent[0];
    assert_eq!(messages.len(), 12);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[1].content, "turn 5");
    assert_eq!(messages[10].content, "turn 14");
    assert_eq!(messages[11].content, "what did I say?");
}

#[tokio::test]
async fn name_facts_reach_system_message() {
    let backend = FakeBackend::with_replies([Reply::Text("Nice to meet you"), Reply::Text("Ana")]);
    let mut session = test_session(test_store(), &backend);

    session.handle_line("my name is Ana").await.unwrap();
    session.handle_line("who am I?").await.unwrap();

    let sent = backend.sent.borrow();
    assert!(sent[1][0].content.contains("User mentioned: my name is Ana"));
}

#[tokio::test]
async fn new_then_history_yields_empty_mirror() {
    let mut store = test_store();
    seed_turns(&mut store, &ConversationId::for_user("Ana"), 4);

    let mut session = test_session(store, FakeBackend::default());
    session.start().unwrap();
    assert_eq!(session.mirror().len(), 4);

    session.handle_line("new").await.unwrap();
    assert!(session.mirror().is_empty());
    assert_ne!(session.conversation_id(), &ConversationId::for_user("Ana"));
    assert!(session.conversation_id().as_str().starts_with("chat_ana_"));

    session.handle_line("HISTORY").await.unwrap();
    assert!(session.mirror().is_empty());
    assert!(output_of(&session).contains("Started new conversation!"));
}

#[tokio::test]
async fn history_reload_replaces_mirror_from_store() {
    let mut session = test_session(test_store(), FakeBackend::with_replies([Reply::Text("hey")]));
    session.handle_line("hello").await.unwrap();
    assert_eq!(session.mirror().len(), 2);

    session.handle_line("load").await.unwrap();
    let texts: Vec<&str> = session.mirror().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, ["hello", "hey"]);
    assert!(output_of(&session).contains("Loaded 2 previous messages"));
}

#[tokio::test]
async fn malformed_response_keeps_only_user_turn() {
    let backend = FakeBackend::with_replies([Reply::Body(r#"{"foo": 1}"#)]);
    let mut session = test_session(test_store(), backend);

    let flow = session.handle_line("hello").await.unwrap();
    assert_eq!(flow, Flow::Continue);

    let stored = session.store().load_history(&ConversationId::for_user("Ana"));
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].role, Role::User);
    assert_eq!(session.mirror().len(), 1);
    assert_eq!(session.mirror()[0].role, Role::User);

    let out = output_of(&session);
    assert!(out.contains("Error: invalid response format"));
    assert!(out.contains(r#"Raw response: {"foo": 1}"#));
}

#[tokio::test]
async fn failed_turn_does_not_end_session() {
    let backend = FakeBackend::with_replies([Reply::Body("not json"), Reply::Text("recovered")]);
    let mut session = test_session(test_store(), backend);

    assert_eq!(session.handle_line("one").await.unwrap(), Flow::Continue);
    assert_eq!(session.handle_line("two").await.unwrap(), Flow::Continue);

    let texts: Vec<&str> = session.mirror().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, ["one", "two", "recovered"]);
    assert!(output_of(&session).contains("invalid JSON"));
}

/// Store that rejects every write.
struct FailingStore;

impl ConversationStore for FailingStore {
    fn append(&mut self, _turn: &mut ChatTurn) -> Result<TurnId, ChatError> {
        Err(ChatError::StoreUnavailable(rusqlite::Error::InvalidQuery))
    }

    fn load_history(&self, _conversation_id: &ConversationId) -> Vec<ChatTurn> {
        Vec::new()
    }
}

#[tokio::test]
async fn store_failure_is_reported_and_skips_inference() {
    let backend = FakeBackend::with_replies([Reply::Text("unused")]);
    let mut session = test_session(FailingStore, &backend);

    assert_eq!(session.handle_line("hello").await.unwrap(), Flow::Continue);
    assert!(session.mirror().is_empty());
    assert!(backend.sent.borrow().is_empty());
    assert!(output_of(&session).contains("Error: conversation store unavailable"));
}

#[tokio::test]
async fn code_replies_are_boxed() {
    let backend = FakeBackend::with_replies([Reply::Text("Here:\n```js\nconsole.log(1)\n```\nDone")]);
    let mut session = test_session(test_store(), backend);
    session.handle_line("show me js").await.unwrap();

    let out = output_of(&session);
    assert!(out.contains("│ JS                 │"));
    assert!(out.contains("│ console.log(1)     │"));
    // The stored turn keeps the raw text.
    assert!(session.mirror()[1].text.contains("```js"));
}

#[tokio::test]
async fn run_stops_at_quit() {
    let backend = FakeBackend::with_replies([Reply::Text("pong")]);
    let mut session = test_session(test_store(), &backend);
    let mut input = tokio::io::BufReader::new(&b"ping\n\nQUIT\nnever sent\n"[..]);

    session.run(&mut input).await.unwrap();

    assert_eq!(backend.sent.borrow().len(), 1);
    assert_eq!(session.mirror().len(), 2);
    assert!(output_of(&session).contains("Goodbye!"));
}

#[tokio::test]
async fn run_stops_at_end_of_input() {
    let mut session = test_session(test_store(), FakeBackend::default());
    let mut input = tokio::io::BufReader::new(&b"history\n"[..]);

    session.run(&mut input).await.unwrap();
    assert!(output_of(&session).contains("Goodbye!"));
}

#[tokio::test]
async fn prompt_name_skips_blank_lines() {
    let mut out = Vec::new();
    let mut input = tokio::io::BufReader::new(&b"\n   \n  Ana  \n"[..]);
    let name = lmchat::session::prompt_name(&mut input, &mut out).await.unwrap();
    assert_eq!(name.as_deref(), Some("Ana"));

    let mut closed = tokio::io::BufReader::new(&b""[..]);
    assert!(lmchat::session::prompt_name(&mut closed, &mut out)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn invalid_utf8_line_does_not_end_session() {
    let backend = FakeBackend::with_replies([Reply::Text("noted"), Reply::Text("pong")]);
    let mut session = test_session(test_store(), &backend);
    let mut input = tokio::io::BufReader::new(&b"caf\xe9\r\nping\nquit\n"[..]);

    session.run(&mut input).await.unwrap();

    let sent = backend.sent.borrow();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].last().unwrap().content, "caf\u{fffd}");
    assert_eq!(sent[1].last().unwrap().content, "ping");
    assert!(output_of(&session).contains("Goodbye!"));
}

#[tokio::test]
async fn messages_are_stored_verbatim() {
    let backend = FakeBackend::with_replies([Reply::Text("ok")]);
    let mut session = test_session(test_store(), backend);
    session.handle_line("  indented question ").await.unwrap();

    let stored = session.store().load_history(&ConversationId::for_user("Ana"));
    assert_eq!(stored[0].text, "  indented question ");
}

#[tokio::test]
async fn mirror_agrees_with_store_after_reload() {
    let backend = FakeBackend::with_replies([Reply::Text("one"), Reply::Text("two")]);
    let mut session = test_session(test_store(), backend);
    session.handle_line("first").await.unwrap();
    session.handle_line("second").await.unwrap();

    let before = session.mirror().to_vec();
    session.handle_line("history").await.unwrap();
    assert_eq!(session.mirror(), before.as_slice());
}
