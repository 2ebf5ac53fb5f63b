//! OpenAI-compatible streaming provider
//!
//! Talks to any endpoint implementing the Chat Completions API with
//! `stream: true` (OpenAI, Azure-style gateways, local proxies).
//!
//! # Features
//!
//! - Shared, connection-pooled HTTP client
//! - Server-sent events decoded by `reqwest-eventsource`
//! - Upstream connection dropped as soon as the consumer goes away
//!
//! # Examples
//!
//! ```no_run
//! use homekey_llm::OpenAiProvider;
//!
//! let provider = OpenAiProvider::new("https://api.openai.com/v1", "gpt-4o", "sk-...").unwrap();
//! ```

use crate::{ChatModel, ChatRequest, LlmError, StreamEvent};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::retry::Never;
use reqwest_eventsource::{Error as EventSourceError, Event, EventSource};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model identifier
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Timeout for establishing the TCP/TLS connection
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default capacity of the event channel
pub const DEFAULT_BUFFER: usize = 64;

/// Payload marking the end of a completion stream
const DONE_SENTINEL: &str = "[DONE]";

/// Streaming chat provider for OpenAI-compatible APIs
pub struct OpenAiProvider {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
    buffer: usize,
}

/// Request body for the Chat Completions API
#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// One streamed `chat.completion.chunk`
#[derive(Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

impl OpenAiProvider {
    /// Create a provider
    ///
    /// # Parameters
    ///
    /// - `base_url`: API root, e.g. "https://api.openai.com/v1"
    /// - `model`: Model identifier, e.g. "gpt-4o"
    /// - `api_key`: Bearer credential
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Configuration("API key is empty".to_string()));
        }

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            client,
            buffer: DEFAULT_BUFFER,
        })
    }

    /// Set the event channel capacity
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    /// Model identifier
    pub fn model(&self) -> &str {
        &self.model
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Forward completion chunks from `source` into `tx` until completion,
    /// failure, or the consumer dropping its receiver.
    async fn forward_stream(mut source: EventSource, tx: mpsc::Sender<StreamEvent>) {
        let mut chunk_count = 0u32;

        loop {
            let next = tokio::select! {
                _ = tx.closed() => {
                    debug!(chunks = chunk_count, "Consumer dropped, releasing upstream connection");
                    source.close();
                    return;
                }
                next = source.next() => next,
            };

            let message = match next {
                Some(Ok(Event::Open)) => continue,
                Some(Ok(Event::Message(message))) => message,
                Some(Err(EventSourceError::StreamEnded)) | None => {
                    let _ = tx
                        .send(StreamEvent::Error(
                            "Upstream closed the stream before completion".to_string(),
                        ))
                        .await;
                    return;
                }
                Some(Err(e)) => {
                    source.close();
                    let _ = tx.send(StreamEvent::Error(format!("Stream error: {}", e))).await;
                    return;
                }
            };

            if message.data == DONE_SENTINEL {
                debug!(chunks = chunk_count, "Model stream complete");
                source.close();
                let _ = tx.send(StreamEvent::Done).await;
                return;
            }

            chunk_count += 1;
            let payload: CompletionChunk = match serde_json::from_str(&message.data) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(
                        error = %e,
                        chunk = chunk_count,
                        "Skipping unparseable chunk: {}",
                        preview(&message.data)
                    );
                    continue;
                }
            };

            if let Some(error) = payload.error {
                source.close();
                let _ = tx.send(StreamEvent::Error(error.message)).await;
                return;
            }

            for choice in payload.choices {
                if let Some(content) = choice.delta.content {
                    if content.is_empty() {
                        continue;
                    }
                    if tx.send(StreamEvent::Delta(content)).await.is_err() {
                        source.close();
                        return;
                    }
                }
            }
        }
    }
}

/// First 200 bytes of a payload, for logs
fn preview(data: &str) -> &str {
    let mut end = data.len().min(200);
    while !data.is_char_boundary(end) {
        end -= 1;
    }
    &data[..end]
}

/// Map a non-success status to an error
fn status_error(status: reqwest::StatusCode, body: String, model: &str) -> LlmError {
    match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            LlmError::Authentication(format!("HTTP {}: {}", status, body))
        }
        reqwest::StatusCode::NOT_FOUND => LlmError::ModelNotAvailable(model.to_string()),
        reqwest::StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimitExceeded,
        _ => LlmError::Communication(format!("HTTP {}: {}", status, body)),
    }
}

/// Map a failure to open the event stream to an error
async fn open_error(error: EventSourceError, model: &str) -> LlmError {
    match error {
        EventSourceError::InvalidStatusCode(status, response) => {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            status_error(status, body, model)
        }
        EventSourceError::InvalidContentType(content_type, _) => LlmError::InvalidResponse(
            format!("Expected an event stream, got content type {:?}", content_type),
        ),
        EventSourceError::Transport(e) => LlmError::Communication(format!("Request failed: {}", e)),
        other => LlmError::Communication(other.to_string()),
    }
}

#[async_trait]
impl ChatModel for OpenAiProvider {
    fn name(&self) -> &str {
        &self.model
    }

    async fn stream(&self, request: ChatRequest) -> Result<mpsc::Receiver<StreamEvent>, LlmError> {
        let conversation = request.to_messages();
        let body = CompletionRequest {
            model: &self.model,
            messages: conversation
                .messages()
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream: true,
        };

        let builder = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body);

        let mut source = EventSource::new(builder)
            .map_err(|e| LlmError::Configuration(format!("Request cannot be streamed: {}", e)))?;
        // a chat turn is not resumable, so never reconnect
        source.set_retry_policy(Box::new(Never));

        // the request is sent on first poll; the first event tells us whether it was accepted
        match source.next().await {
            Some(Ok(Event::Open)) => {}
            Some(Ok(Event::Message(_))) => {
                source.close();
                return Err(LlmError::InvalidResponse(
                    "Event stream sent data before opening".to_string(),
                ));
            }
            Some(Err(e)) => {
                source.close();
                return Err(open_error(e, &self.model).await);
            }
            None => {
                return Err(LlmError::Communication(
                    "Event stream closed before opening".to_string(),
                ));
            }
        }

        debug!(
            "Model stream opened ({} messages, model {})",
            conversation.len(),
            self.model
        );

        let (tx, rx) = mpsc::channel(self.buffer);
        tokio::spawn(Self::forward_stream(source, tx));

        Ok(rx)
    }
}
