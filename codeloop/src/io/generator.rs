//! Language-model adapter.
//!
//! The [`Generator`] trait decouples the repair loop from the chat backend.
//! [`OpenAiGenerator`] talks to any OpenAI-compatible `chat/completions`
//! endpoint with a blocking HTTP client.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::core::conversation::{Conversation, Role};
use crate::io::config::ModelConfig;

/// Abstraction over chat backends.
pub trait Generator {
    /// Send `request` after the messages already in `conversation` and return the reply text.
    ///
    /// Implementations must not assume the request has been appended to the
    /// conversation; the caller records the exchange once a reply arrives.
    fn generate(&self, request: &str, conversation: &Conversation) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Generator backed by an OpenAI-compatible HTTP API.
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl OpenAiGenerator {
    pub fn new(cfg: &ModelConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
            model: cfg.name.clone(),
            api_key,
        })
    }
}

impl Generator for OpenAiGenerator {
    #[instrument(skip_all, fields(model = %self.model, history = conversation.len()))]
    fn generate(&self, request: &str, conversation: &Conversation) -> Result<String> {
        let mut messages: Vec<ChatMessage<'_>> = conversation
            .messages()
            .iter()
            .map(|message| ChatMessage {
                role: message.role.as_str(),
                content: &message.content,
            })
            .collect();
        messages.push(ChatMessage {
            role: Role::User.as_str(),
            content: request,
        });

        info!(endpoint = %self.endpoint, "sending chat completion request");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages,
            })
            .send()
            .context("send chat completion request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow!("chat completion failed with status {status}: {body}"));
        }

        let parsed: ChatResponse = response.json().context("parse chat completion response")?;
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        debug!(reply_bytes = reply.len(), "received chat completion");
        Ok(reply)
    }
}

/// Read the API key from `var`, loading `.env` from the working directory first.
///
/// Returns `None` when the variable is unset or blank.
pub fn load_api_key(var: &str) -> Option<String> {
    if let Err(err) = dotenvy::dotenv() {
        debug!(err = %err, "no .env loaded");
    }
    env::var(var).ok().filter(|key| !key.trim().is_empty())
}
