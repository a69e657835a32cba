//! Completion-service client.
//!
//! The pipeline talks to an OpenAI-compatible chat endpoint through the
//! [`CompletionProvider`] trait. Blocking mode returns one completed string;
//! streaming mode forwards text deltas through an `mpsc` channel as they
//! arrive and returns the full accumulated text when the stream ends.

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use companyscout_shared::{Result, ScoutError};

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// A structured prompt with optional system and required user segments.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: Option<String>,
    pub user: String,
}

impl Prompt {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            system: None,
            user: text.into(),
        }
    }

    pub fn with_system(mut self, text: impl Into<String>) -> Self {
        self.system = Some(text.into());
        self
    }
}

// ---------------------------------------------------------------------------
// CompletionProvider
// ---------------------------------------------------------------------------

/// Boundary to the external completion service.
///
/// Implementations must support both modes: different pipeline stages use
/// blocking completion (briefing, report compile) and streaming completion
/// (query generation, report sweep).
pub trait CompletionProvider: Send + Sync + 'static {
    /// Complete a prompt and return the whole output at once.
    fn complete(&self, prompt: &Prompt) -> impl Future<Output = Result<String>> + Send;

    /// Complete a prompt in streaming mode. Each text delta is sent through
    /// `tx` as it arrives; the full accumulated text is returned when the
    /// stream terminates. A dropped receiver does not abort the stream.
    fn complete_stream(
        &self,
        prompt: &Prompt,
        tx: mpsc::Sender<String>,
    ) -> impl Future<Output = Result<String>> + Send;
}

// ---------------------------------------------------------------------------
// OpenAI-compatible client
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatClient {
    /// Build a client. A missing API key is a fatal configuration error,
    /// raised before any pipeline stage runs.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ScoutError::config("completion service API key is empty"));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ScoutError::completion(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }

    fn build_messages<'a>(&self, prompt: &'a Prompt) -> Vec<ChatMessage<'a>> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &prompt.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &prompt.user,
        });
        messages
    }

    async fn send(&self, prompt: &Prompt, stream: bool) -> Result<reqwest::Response> {
        let body = ChatRequest {
            model: &self.model,
            messages: self.build_messages(prompt),
            temperature: 0.0,
            stream,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ScoutError::completion(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ScoutError::completion(format!(
                "HTTP {status}: {}",
                truncate_at(&text, 200)
            )));
        }

        Ok(response)
    }
}

// Cut at a char boundary at or below `max` bytes. Upstream error bodies are
// not ASCII-bounded.
fn truncate_at(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

impl CompletionProvider for OpenAiCompatClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let response = self.send(prompt, false).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ScoutError::completion(format!("invalid completion response: {e}")))?;

        let content = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        debug!(chars = content.len(), "completion received");
        Ok(content)
    }

    async fn complete_stream(&self, prompt: &Prompt, tx: mpsc::Sender<String>) -> Result<String> {
        let response = self.send(prompt, true).await?;

        let mut accumulated = String::new();
        let mut line_buf = String::new();
        let mut stream = response.bytes_stream();

        'outer: while let Some(chunk) = stream.next().await {
            let bytes =
                chunk.map_err(|e| ScoutError::completion(format!("stream read failed: {e}")))?;
            line_buf.push_str(&String::from_utf8_lossy(&bytes));

            // Process every complete line; keep the partial tail buffered.
            while let Some(newline) = line_buf.find('\n') {
                let line: String = line_buf.drain(..=newline).collect();
                let line = line.trim();

                let Some(payload) = line.strip_prefix("data:") else {
                    continue;
                };
                let payload = payload.trim();

                if payload == "[DONE]" {
                    break 'outer;
                }

                let parsed: StreamChunk = serde_json::from_str(payload).map_err(|e| {
                    ScoutError::completion(format!("invalid stream chunk: {e}"))
                })?;

                let delta = parsed
                    .choices
                    .first()
                    .and_then(|c| c.delta.content.as_deref())
                    .unwrap_or_default();
                if !delta.is_empty() {
                    accumulated.push_str(delta);
                    // A dropped receiver means nobody is watching the
                    // stream anymore; keep accumulating regardless.
                    let _ = tx.send(delta.to_string()).await;
                }
            }
        }

        debug!(chars = accumulated.len(), "streaming completion finished");
        Ok(accumulated)
    }
}
