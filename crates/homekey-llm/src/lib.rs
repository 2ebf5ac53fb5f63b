//! HomeKey LLM Provider Layer
//!
//! Streaming chat-model providers behind a common trait.
//!
//! # Architecture
//!
//! A provider turns a [`ChatRequest`] (system instruction plus conversation)
//! into a channel of [`StreamEvent`]s. The provider owns the producer side
//! and stops reading from its upstream connection as soon as the consumer
//! drops the receiver.
//!
//! # Providers
//!
//! - `MockModel`: Scripted deterministic model for testing
//! - `OpenAiProvider`: OpenAI-compatible Chat Completions streaming API
//!
//! # Examples
//!
//! ```
//! use homekey_domain::{Conversation, Message};
//! use homekey_llm::{ChatModel, ChatRequest, MockModel, StreamEvent};
//!
//! # tokio_test_block_on(async {
//! let model = MockModel::new(["Hi", " there"]);
//! let request = ChatRequest::new("Be brief", Conversation::from(vec![Message::user("Hello")]));
//! let mut events = model.stream(request).await.unwrap();
//!
//! assert_eq!(events.recv().await, Some(StreamEvent::Delta("Hi".to_string())));
//! assert_eq!(events.recv().await, Some(StreamEvent::Delta(" there".to_string())));
//! assert_eq!(events.recv().await, Some(StreamEvent::Done));
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

#![warn(missing_docs)]

pub mod mock;
pub mod openai;

use async_trait::async_trait;
use homekey_domain::Conversation;
use thiserror::Error;
use tokio::sync::mpsc;

pub use mock::MockModel;
pub use openai::OpenAiProvider;

/// Errors that can occur before a model stream is established
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Credentials rejected by the provider
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Invalid response from the provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Provider could not be constructed
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// One event on a model's output stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Next piece of generated text
    Delta(String),
    /// Model reported completion
    Done,
    /// Model or connection failed mid-stream; no further events follow
    Error(String),
}

/// Input to a streaming chat completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// System instruction placed ahead of the conversation
    pub system: String,
    /// Conversation history in client order
    pub conversation: Conversation,
}

impl ChatRequest {
    /// Create a request
    pub fn new(system: impl Into<String>, conversation: Conversation) -> Self {
        Self {
            system: system.into(),
            conversation,
        }
    }

    /// Messages as sent to the provider: the system instruction first
    pub fn to_messages(&self) -> Conversation {
        self.conversation.with_system_prefix(self.system.clone())
    }
}

/// A generative model that streams its reply
///
/// Implementations must stop producing (and release any upstream
/// connection) once the returned receiver is dropped.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for logs and health output
    fn name(&self) -> &str;

    /// Start a streamed completion
    ///
    /// Returns once the provider has accepted the request; text then
    /// arrives on the channel, ending with `Done` or `Error`.
    async fn stream(&self, request: ChatRequest) -> Result<mpsc::Receiver<StreamEvent>, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use homekey_domain::{Message, Role};

    #[test]
    fn test_to_messages_prefixes_system() {
        let request = ChatRequest::new(
            "You are a property assistant",
            Conversation::from(vec![Message::user("What's the price?")]),
        );

        let messages = request.to_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages.messages()[0].role, Role::System);
        assert_eq!(messages.messages()[0].content, "You are a property assistant");
        assert_eq!(messages.messages()[1].content, "What's the price?");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(LlmError::RateLimitExceeded.to_string(), "Rate limit exceeded");
        assert_eq!(
            LlmError::ModelNotAvailable("gpt-4o".to_string()).to_string(),
            "Model not available: gpt-4o"
        );
    }
}
