//! Streaming chat relay
//!
//! Wraps the caller's conversation with the assistant instruction, opens a
//! streamed completion and pumps its chunks into a bounded channel that the
//! HTTP layer drains. One wall-clock deadline covers the whole exchange.

use crate::prompt::SystemPrompt;
use futures::Stream;
use homekey_domain::Conversation;
use homekey_llm::{ChatModel, ChatRequest, StreamEvent};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, timeout_at, Instant};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// Default ceiling for a whole chat exchange
pub const DEFAULT_CEILING: Duration = Duration::from_secs(30);

/// Default capacity of the chunk channel
pub const DEFAULT_BUFFER: usize = 64;

/// Relay failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Request rejected before reaching the model
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The exchange ran past its ceiling
    #[error("Model did not respond within {0:?}")]
    Timeout(Duration),

    /// The model could not be reached or failed mid-stream
    #[error("Upstream model failure: {0}")]
    UpstreamFailure(String),
}

/// Relays conversations to a chat model
pub struct ChatRelay {
    model: Arc<dyn ChatModel>,
    ceiling: Duration,
    buffer: usize,
}

impl ChatRelay {
    /// Create a relay over `model` with the default ceiling and buffer
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            ceiling: DEFAULT_CEILING,
            buffer: DEFAULT_BUFFER,
        }
    }

    /// Set the wall-clock ceiling
    pub fn with_ceiling(mut self, ceiling: Duration) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Set the chunk channel capacity
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    /// Wall-clock ceiling
    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Name of the underlying model
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Start relaying `conversation` with `property_context` as the
    /// assistant's grounding.
    ///
    /// Returns once the model has accepted the request. Text then arrives on
    /// the returned stream in model order. A failure after that point is
    /// delivered as the stream's last item.
    pub async fn relay(
        &self,
        conversation: Conversation,
        property_context: &str,
    ) -> Result<RelayStream, RelayError> {
        if conversation.is_empty() {
            return Err(RelayError::BadRequest("messages must not be empty".to_string()));
        }
        if property_context.trim().is_empty() {
            return Err(RelayError::BadRequest(
                "propertyContext must not be blank".to_string(),
            ));
        }

        let started = Instant::now();
        let deadline = started + self.ceiling;
        let message_count = conversation.len();
        let request = ChatRequest::new(SystemPrompt::render(property_context), conversation);

        debug!(model = self.model.name(), messages = message_count, "Opening model stream");

        let upstream = match timeout_at(deadline, self.model.stream(request)).await {
            Ok(Ok(rx)) => rx,
            Ok(Err(e)) => {
                warn!(model = self.model.name(), error = %e, "Model stream failed to open");
                return Err(RelayError::UpstreamFailure(e.to_string()));
            }
            Err(_) => {
                warn!(model = self.model.name(), ceiling = ?self.ceiling, "Model stream did not open in time");
                return Err(RelayError::Timeout(self.ceiling));
            }
        };

        let (tx, rx) = mpsc::channel(self.buffer);
        tokio::spawn(pump(upstream, tx, deadline, self.ceiling, started));

        Ok(RelayStream {
            inner: ReceiverStream::new(rx),
        })
    }
}

/// Reply text from a relayed exchange
///
/// Dropping it stops the relay and releases the model connection.
#[derive(Debug)]
pub struct RelayStream {
    inner: ReceiverStream<Result<String, RelayError>>,
}

impl Stream for RelayStream {
    type Item = Result<String, RelayError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

enum Termination {
    Completed,
    Faulted(String),
    TimedOut,
    Cancelled,
}

impl Termination {
    fn as_str(&self) -> &'static str {
        match self {
            Termination::Completed => "completed",
            Termination::Faulted(_) => "upstream_failure",
            Termination::TimedOut => "timeout",
            Termination::Cancelled => "cancelled",
        }
    }
}

/// Move model events into `tx` until the model finishes, fails, the
/// deadline passes or the consumer goes away.
async fn pump(
    mut upstream: mpsc::Receiver<StreamEvent>,
    tx: mpsc::Sender<Result<String, RelayError>>,
    deadline: Instant,
    ceiling: Duration,
    started: Instant,
) {
    let mut chunks = 0usize;

    let termination = loop {
        tokio::select! {
            biased;

            _ = tx.closed() => break Termination::Cancelled,
            _ = sleep_until(deadline) => break Termination::TimedOut,
            event = upstream.recv() => match event {
                Some(StreamEvent::Delta(text)) => {
                    if text.is_empty() {
                        continue;
                    }
                    // a slow reader can hold us here, still bounded by the deadline
                    match timeout_at(deadline, tx.send(Ok(text))).await {
                        Ok(Ok(())) => chunks += 1,
                        Ok(Err(_)) => break Termination::Cancelled,
                        Err(_) => break Termination::TimedOut,
                    }
                }
                Some(StreamEvent::Done) => break Termination::Completed,
                Some(StreamEvent::Error(message)) => break Termination::Faulted(message),
                None => {
                    break Termination::Faulted("model stream ended without completing".to_string())
                }
            }
        }
    };

    // releases the provider's connection
    drop(upstream);

    let elapsed_ms = started.elapsed().as_millis() as u64;
    let reason = termination.as_str();

    match termination {
        Termination::Completed => {
            info!(chunks, elapsed_ms, reason, "Relay finished");
        }
        Termination::Faulted(message) => {
            warn!(chunks, elapsed_ms, reason, error = %message, "Relay ended by upstream failure");
            deliver_last(&tx, RelayError::UpstreamFailure(message)).await;
        }
        Termination::TimedOut => {
            warn!(chunks, elapsed_ms, reason, "Relay exceeded its ceiling");
            deliver_last(&tx, RelayError::Timeout(ceiling)).await;
        }
        Termination::Cancelled => {
            debug!(chunks, elapsed_ms, reason, "Relay consumer went away");
        }
    }
}

/// Queue the terminal error behind whatever the consumer has not read yet.
///
/// Waits for buffer space with no deadline; only a consumer that has gone
/// away loses it.
async fn deliver_last(tx: &mpsc::Sender<Result<String, RelayError>>, error: RelayError) {
    match tx.reserve().await {
        Ok(permit) => permit.send(Err(error)),
        Err(_) => debug!(error = %error, "Consumer gone before the terminal error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use homekey_domain::{Message, Role};
    use homekey_llm::MockModel;

    fn conversation(text: &str) -> Conversation {
        Conversation::from(vec![Message::user(text)])
    }

    #[tokio::test]
    async fn test_relay_forwards_chunks_in_order() {
        let relay = ChatRelay::new(Arc::new(MockModel::new(["The ", "price ", "is $570,000"])));

        let stream = relay
            .relay(conversation("What's the price?"), "Property: Royal Orchid")
            .await
            .unwrap();
        let items: Vec<_> = stream.collect().await;

        assert_eq!(
            items,
            vec![
                Ok("The ".to_string()),
                Ok("price ".to_string()),
                Ok("is $570,000".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_system_instruction_carries_context() {
        let model = MockModel::default();
        let relay = ChatRelay::new(Arc::new(model.clone()));

        let stream = relay
            .relay(conversation("hi"), "Property: Royal Orchid")
            .await
            .unwrap();
        let _: Vec<_> = stream.collect().await;

        let request = model.last_request().unwrap();
        assert!(request.system.contains("## Property Information:\nProperty: Royal Orchid"));

        let sent = request.to_messages();
        assert_eq!(sent.messages()[0].role, Role::System);
        assert_eq!(sent.messages()[1].content, "hi");
    }

    #[tokio::test]
    async fn test_empty_conversation_rejected_without_model_call() {
        let model = MockModel::default();
        let relay = ChatRelay::new(Arc::new(model.clone()));

        let result = relay.relay(Conversation::new(), "context").await;
        assert!(matches!(result, Err(RelayError::BadRequest(_))));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_context_rejected() {
        let model = MockModel::default();
        let relay = ChatRelay::new(Arc::new(model.clone()));

        let result = relay.relay(conversation("hi"), "  \n").await;
        assert!(matches!(result, Err(RelayError::BadRequest(_))));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_connect_failure_is_upstream_failure() {
        let relay = ChatRelay::new(Arc::new(MockModel::refusing("connection refused")));

        let result = relay.relay(conversation("hi"), "context").await;
        match result {
            Err(RelayError::UpstreamFailure(message)) => {
                assert!(message.contains("connection refused"))
            }
            other => panic!("expected upstream failure, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_builder_settings() {
        let relay = ChatRelay::new(Arc::new(MockModel::default()))
            .with_ceiling(Duration::from_secs(5))
            .with_buffer(0);

        assert_eq!(relay.ceiling(), Duration::from_secs(5));
        assert_eq!(relay.buffer, 1);
        assert_eq!(relay.model_name(), "mock");
    }
}
