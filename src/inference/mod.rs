//! Client for an OpenAI-compatible chat-completions endpoint (LM Studio by default).
//!
//! [`ChatBackend`] is the seam the session loop calls; [`InferenceClient`] is
//! the HTTP implementation. One request per turn, no streaming, no retries, and
//! no timeout beyond the transport default: an endpoint that never answers
//! blocks the turn until the user interrupts.

pub mod payload;

pub use payload::{build_messages, extract_user_facts, parse_reply, SystemContext, WireMessage};

use crate::config::{ContextConfig, InferenceConfig};
use crate::conversation::ChatTurn;
use crate::error::ChatError;
use payload::CompletionRequest;

/// Something that can answer a user message given the prior dialogue.
#[allow(async_fn_in_trait)]
pub trait ChatBackend {
    /// `history` is every prior turn the caller holds; implementations decide
    /// how much of it to send.
    async fn ask(
        &self,
        system: &SystemContext,
        history: &[ChatTurn],
        new_message: &str,
    ) -> Result<String, ChatError>;
}

impl<T: ChatBackend + ?Sized> ChatBackend for &T {
    async fn ask(
        &self,
        system: &SystemContext,
        history: &[ChatTurn],
        new_message: &str,
    ) -> Result<String, ChatError> {
        (**self).ask(system, history, new_message).await
    }
}

pub struct InferenceClient {
    http: reqwest::Client,
    endpoint: String,
    model: Option<String>,
    temperature: f32,
    max_tokens: u32,
    context: ContextConfig,
}

impl InferenceClient {
    pub fn new(inference: &InferenceConfig, context: &ContextConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: inference.endpoint.clone(),
            model: inference.model.clone(),
            temperature: inference.temperature,
            max_tokens: inference.max_tokens,
            context: context.clone(),
        }
    }

    fn transport_error(&self, source: reqwest::Error) -> ChatError {
        ChatError::InferenceTransport {
            endpoint: self.endpoint.clone(),
            source,
        }
    }
}

impl ChatBackend for InferenceClient {
    async fn ask(
        &self,
        system: &SystemContext,
        history: &[ChatTurn],
        new_message: &str,
    ) -> Result<String, ChatError> {
        let messages = build_messages(system, history, new_message, &self.context);
        tracing::debug!(
            messages = messages.len(),
            history = history.len(),
            endpoint = %self.endpoint,
            "sending chat completion request"
        );

        let request = CompletionRequest {
            model: self.model.as_deref(),
            messages: &messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;
        tracing::debug!(status = %status, bytes = body.len(), "inference response received");

        // Error statuses usually carry a JSON error object, which parses as malformed.
        parse_reply(&body)
    }
}
