//! The interactive read loop.
//!
//! A [`Session`] owns everything that changes while chatting: the current
//! [`ConversationId`] and the mirror of turns already in the store. Each input
//! line is handled to completion (store write, inference call, store write,
//! render) before the next one is read. Failures inside a chat turn are
//! reported on the output and never end the session.

pub mod commands;
pub mod terminal;

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::config::InferenceConfig;
use crate::conversation::{ChatTurn, ConversationId, ConversationStore, Role};
use crate::error::ChatError;
use crate::inference::{ChatBackend, SystemContext};
use crate::render::{self, Palette};
use commands::Command;

const CHAT_PROMPT: &str = "\nYou: ";
const NAME_PROMPT: &str = "Enter your name: ";
const RULE_WIDTH: usize = 50;

/// Whether the loop should read another line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Write `prompt`, then read one line without its line ending. Bytes that are
/// not UTF-8 are replaced rather than failing the read. `None` once the input
/// is closed.
pub async fn read_line<R, W>(input: &mut R, out: &mut W, prompt: &str) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    write!(out, "{}", style(prompt).blue().bold())?;
    out.flush()?;

    let mut buf = Vec::new();
    if input.read_until(b'\n', &mut buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }

    let line = match String::from_utf8(buf) {
        Ok(line) => line,
        Err(e) => {
            tracing::warn!("input line is not valid UTF-8, replacing invalid bytes");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };
    Ok(Some(line))
}

/// Ask for a display name until a non-blank one arrives. `None` on end of input.
pub async fn prompt_name<R, W>(input: &mut R, out: &mut W) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    while let Some(line) = read_line(input, out, NAME_PROMPT).await? {
        let name = line.trim();
        if !name.is_empty() {
            return Ok(Some(name.to_string()));
        }
    }
    Ok(None)
}

pub struct Session<S, B, W> {
    store: S,
    backend: B,
    out: W,
    user_name: String,
    assistant_name: String,
    endpoint: String,
    conversation_id: ConversationId,
    mirror: Vec<ChatTurn>,
    palette: Palette,
    width: fn() -> usize,
}

impl<S, B, W> Session<S, B, W>
where
    S: ConversationStore,
    B: ChatBackend,
    W: Write,
{
    pub fn new(store: S, backend: B, out: W, user_name: &str, inference: &InferenceConfig) -> Self {
        Self {
            store,
            backend,
            out,
            user_name: user_name.to_string(),
            assistant_name: inference.assistant_name.clone(),
            endpoint: inference.endpoint.clone(),
            conversation_id: ConversationId::for_user(user_name),
            mirror: Vec::new(),
            palette: Palette::for_stdout(),
            width: terminal::terminal_width,
        }
    }

    /// Render replies with `palette` instead of the stdout default.
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Take the render width from `width` instead of the terminal.
    pub fn with_width(mut self, width: fn() -> usize) -> Self {
        self.width = width;
        self
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn mirror(&self) -> &[ChatTurn] {
        &self.mirror
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Greet the user and pull in whatever the store has for their conversation.
    pub fn start(&mut self) -> Result<()> {
        writeln!(
            self.out,
            "{}",
            style(format!("\nHello, {}!", self.user_name)).green()
        )?;
        writeln!(
            self.out,
            "{}",
            style(format!("Chatting with {} at {}", self.assistant_name, self.endpoint)).cyan()
        )?;
        self.reload_history()?;
        writeln!(
            self.out,
            "{}",
            style("Commands: history | new | quit").dim()
        )?;
        Ok(())
    }

    /// Read and handle lines until a quit command or end of input.
    pub async fn run<R>(&mut self, input: &mut R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            let Some(line) = read_line(input, &mut self.out, CHAT_PROMPT).await? else {
                tracing::info!("input closed");
                writeln!(self.out, "\n{}", style("Goodbye!").green())?;
                return Ok(());
            };
            if self.handle_line(&line).await? == Flow::Close {
                return Ok(());
            }
        }
    }

    /// Handle one input line. Errors are output failures only.
    pub async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        match commands::parse(line) {
            Command::Quit => {
                writeln!(self.out, "\n{}", style("Goodbye!").green())?;
                return Ok(Flow::Close);
            }
            Command::Reload => {
                self.reload_history()?;
                writeln!(self.out, "{}", style("Conversation history loaded!").green())?;
            }
            Command::NewConversation => {
                self.conversation_id = ConversationId::fresh(&self.user_name, chrono::Utc::now());
                self.mirror.clear();
                tracing::info!(conversation_id = %self.conversation_id, "started new conversation");
                writeln!(self.out, "{}", style("Started new conversation!").green())?;
            }
            Command::Message(text) => self.chat(&text).await?,
            Command::Empty => {}
        }
        Ok(Flow::Continue)
    }

    fn reload_history(&mut self) -> Result<()> {
        self.mirror = self.store.load_history(&self.conversation_id);
        tracing::debug!(
            conversation_id = %self.conversation_id,
            turns = self.mirror.len(),
            "history loaded"
        );
        writeln!(
            self.out,
            "{}",
            style(format!("Loaded {} previous messages", self.mirror.len())).cyan()
        )?;
        Ok(())
    }

    async fn chat(&mut self, text: &str) -> Result<()> {
        let mut user_turn = ChatTurn::new(&self.conversation_id, Role::User, text, &self.user_name);
        let user_id = match self.store.append(&mut user_turn) {
            Ok(id) => id,
            Err(e) => return self.report_failure(&e),
        };
        writeln!(self.out, "{}", style(format!("message ID {user_id}")).dim())?;
        self.mirror.push(user_turn);

        let system = SystemContext {
            user_name: self.user_name.clone(),
        };
        let prior = &self.mirror[..self.mirror.len() - 1];
        let spinner = waiting_spinner(&self.assistant_name);
        let reply = self.backend.ask(&system, prior, text).await;
        spinner.finish_and_clear();

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => return self.report_failure(&e),
        };

        let mut assistant_turn =
            ChatTurn::new(&self.conversation_id, Role::Assistant, reply, &self.assistant_name);
        let stored = self.store.append(&mut assistant_turn);

        let rule = style("─".repeat(RULE_WIDTH)).dim();
        writeln!(self.out, "\n{}", style(format!("{}:", self.assistant_name)).magenta().bold())?;
        writeln!(self.out, "{rule}")?;
        writeln!(
            self.out,
            "{}",
            render::render_with(&assistant_turn.text, (self.width)(), &self.palette)
        )?;
        writeln!(self.out, "{rule}")?;

        match stored {
            Ok(id) => {
                writeln!(self.out, "{}", style(format!("response ID {id}")).dim())?;
                self.mirror.push(assistant_turn);
                Ok(())
            }
            Err(e) => self.report_failure(&e),
        }
    }

    fn report_failure(&mut self, error: &ChatError) -> Result<()> {
        tracing::warn!(error = %error, conversation_id = %self.conversation_id, "chat turn failed");
        writeln!(self.out, "{} {error}", style("Error:").red().bold())?;

        if error.is_connection_refused() {
            writeln!(
                self.out,
                "{}",
                style("Cannot connect to the inference server. Make sure:").red()
            )?;
            for step in [
                "1. LM Studio (or another OpenAI-compatible server) is running".to_string(),
                "2. A model is loaded".to_string(),
                format!("3. The local server is enabled and listening at {}", self.endpoint),
                "4. In LM Studio, check Settings > Local Server".to_string(),
            ] {
                writeln!(self.out, "   {}", style(step).yellow())?;
            }
        }
        if let Some(body) = error.raw_body() {
            writeln!(self.out, "{} {body}", style("Raw response:").dim())?;
        }
        Ok(())
    }
}

fn waiting_spinner(assistant_name: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.yellow} {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message(format!("Waiting for {assistant_name}..."));
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}
