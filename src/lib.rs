//! Terminal chat client for local LLM servers.
//!
//! `lmchat` keeps every conversation turn in a SQLite database and forwards the
//! dialogue to an OpenAI-compatible chat-completions endpoint (LM Studio on
//! `localhost:1234` by default). Replies are printed with fenced code blocks
//! drawn as bordered boxes that adapt to the terminal width.
//!
//! A conversation is keyed by the user's display name, so the same user picks
//! up where they left off on the next run. At the prompt:
//!
//! | Input | Effect |
//! |-------|--------|
//! | `quit`, `exit` | End the session |
//! | `history`, `load` | Re-read the current conversation from the database |
//! | `new`, `reset` | Start a fresh, empty conversation under the same name |
//! | anything else | Send as a chat message |
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite database initialization and schema
//! - [`conversation`] — Turn types and the append-only conversation store
//! - [`inference`] — Chat-completions client, request building and response parsing
//! - [`render`] — Code-block aware reply rendering
//! - [`session`] — The interactive read loop

pub mod config;
pub mod conversation;
pub mod db;
pub mod error;
pub mod inference;
pub mod render;
pub mod session;

pub use error::ChatError;
