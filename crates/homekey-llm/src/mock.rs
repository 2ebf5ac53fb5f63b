//! Scripted mock model for deterministic testing
//!
//! Replays pre-configured chunks without any network calls. Scripts can be
//! keyed by the content of the last user message so that concurrent
//! requests receive distinguishable replies.

use crate::{ChatModel, ChatRequest, LlmError, StreamEvent};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 32;

/// How a scripted stream ends after its chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ending {
    /// Emit `Done`
    Complete,
    /// Emit `Error` with this message
    Fault(String),
    /// Emit nothing and hold the stream open until the consumer leaves
    Stall,
}

/// Chunks to replay and how to finish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    chunks: Vec<String>,
    connect_delay: Duration,
    delay: Duration,
    ending: Ending,
}

impl Script {
    /// Script that emits `chunks` then completes
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            connect_delay: Duration::ZERO,
            delay: Duration::ZERO,
            ending: Ending::Complete,
        }
    }

    /// Wait `delay` before the stream opens
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Wait `delay` before each chunk
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Change how the stream ends
    pub fn ending(mut self, ending: Ending) -> Self {
        self.ending = ending;
        self
    }
}

#[derive(Debug)]
struct MockState {
    default_script: Script,
    scripts: Mutex<HashMap<String, Script>>,
    connect_error: Option<String>,
    calls: AtomicUsize,
    cancellations: AtomicUsize,
    last_request: Mutex<Option<ChatRequest>>,
}

/// Mock chat model
///
/// Clones share the same state, so call counts are visible from any handle.
///
/// # Examples
///
/// ```
/// use homekey_llm::MockModel;
///
/// let model = MockModel::new(["Hello", "!"]);
/// assert_eq!(model.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockModel {
    state: Arc<MockState>,
}

impl MockModel {
    /// Mock that replies with `chunks` to every request
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_script(Script::new(chunks))
    }

    /// Mock that replies with `script` to every request
    pub fn from_script(script: Script) -> Self {
        Self::build(script, None)
    }

    /// Mock that emits nothing and never completes
    pub fn stalling() -> Self {
        Self::from_script(Script::new(Vec::<String>::new()).ending(Ending::Stall))
    }

    /// Mock that emits `chunks` then fails with `message`
    pub fn failing_after<I, S>(chunks: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_script(Script::new(chunks).ending(Ending::Fault(message.into())))
    }

    /// Mock that takes `delay` to open each stream, then completes empty
    pub fn slow_to_connect(delay: Duration) -> Self {
        Self::from_script(Script::new(Vec::<String>::new()).with_connect_delay(delay))
    }

    /// Mock whose `stream` call itself fails
    pub fn refusing(message: impl Into<String>) -> Self {
        Self::build(Script::new(Vec::<String>::new()), Some(message.into()))
    }

    fn build(default_script: Script, connect_error: Option<String>) -> Self {
        Self {
            state: Arc::new(MockState {
                default_script,
                scripts: Mutex::new(HashMap::new()),
                connect_error,
                calls: AtomicUsize::new(0),
                cancellations: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }),
        }
    }

    /// Reply with `script` when the last user message equals `prompt`
    pub fn add_response(&self, prompt: impl Into<String>, script: Script) {
        self.state
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(prompt.into(), script);
    }

    /// Number of times `stream` was called
    pub fn call_count(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Number of streams whose consumer went away before the script finished
    pub fn cancellation_count(&self) -> usize {
        self.state.cancellations.load(Ordering::SeqCst)
    }

    /// The most recent request received
    pub fn last_request(&self) -> Option<ChatRequest> {
        self.state
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn script_for(&self, request: &ChatRequest) -> Script {
        let scripts = self
            .state
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        request
            .conversation
            .last_user_message()
            .and_then(|msg| scripts.get(&msg.content))
            .cloned()
            .unwrap_or_else(|| self.state.default_script.clone())
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new(["Default mock response"])
    }
}

#[async_trait]
impl ChatModel for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream(&self, request: ChatRequest) -> Result<mpsc::Receiver<StreamEvent>, LlmError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.state.connect_error {
            return Err(LlmError::Communication(message.clone()));
        }

        let script = self.script_for(&request);
        *self
            .state
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(request);

        if !script.connect_delay.is_zero() {
            tokio::time::sleep(script.connect_delay).await;
        }

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            if !play(script, &tx).await {
                state.cancellations.fetch_add(1, Ordering::SeqCst);
            }
        });

        Ok(rx)
    }
}

/// Replay a script into `tx`. Returns false if the consumer went away first.
async fn play(script: Script, tx: &mpsc::Sender<StreamEvent>) -> bool {
    for chunk in script.chunks {
        if !script.delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(script.delay) => {}
                _ = tx.closed() => return false,
            }
        }
        if tx.send(StreamEvent::Delta(chunk)).await.is_err() {
            return false;
        }
    }

    match script.ending {
        Ending::Complete => tx.send(StreamEvent::Done).await.is_ok(),
        Ending::Fault(message) => tx.send(StreamEvent::Error(message)).await.is_ok(),
        Ending::Stall => {
            tx.closed().await;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homekey_domain::{Conversation, Message};

    fn request(prompt: &str) -> ChatRequest {
        ChatRequest::new("system", Conversation::from(vec![Message::user(prompt)]))
    }

    async fn drain(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_default_script() {
        let model = MockModel::new(["Hi", " there", "!"]);
        let events = drain(model.stream(request("hello")).await.unwrap()).await;

        assert_eq!(
            events,
            vec![
                StreamEvent::Delta("Hi".to_string()),
                StreamEvent::Delta(" there".to_string()),
                StreamEvent::Delta("!".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_specific_responses() {
        let model = MockModel::default();
        model.add_response("price?", Script::new(["$570,000"]));

        let events = drain(model.stream(request("price?")).await.unwrap()).await;
        assert_eq!(events[0], StreamEvent::Delta("$570,000".to_string()));

        let events = drain(model.stream(request("other")).await.unwrap()).await;
        assert_eq!(events[0], StreamEvent::Delta("Default mock response".to_string()));
    }

    #[tokio::test]
    async fn test_call_count_shared_between_clones() {
        let model = MockModel::default();
        let other = model.clone();

        drain(model.stream(request("a")).await.unwrap()).await;
        drain(other.stream(request("b")).await.unwrap()).await;

        assert_eq!(model.call_count(), 2);
        assert_eq!(other.call_count(), 2);
        assert_eq!(model.last_request().unwrap().conversation.messages()[0].content, "b");
    }

    #[tokio::test]
    async fn test_fault_after_chunks() {
        let model = MockModel::failing_after(["partial"], "upstream reset");
        let events = drain(model.stream(request("x")).await.unwrap()).await;

        assert_eq!(
            events,
            vec![
                StreamEvent::Delta("partial".to_string()),
                StreamEvent::Error("upstream reset".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_refusing() {
        let model = MockModel::refusing("connection refused");
        let result = model.stream(request("x")).await;
        assert!(matches!(result, Err(LlmError::Communication(_))));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_stall_observes_cancellation() {
        let model = MockModel::stalling();
        let rx = model.stream(request("x")).await.unwrap();
        drop(rx);

        // give the producer task a chance to observe the closed channel
        for _ in 0..50 {
            if model.cancellation_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(model.cancellation_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_delay_holds_stream_open() {
        let delay = Duration::from_millis(80);
        let model = MockModel::slow_to_connect(delay);

        let started = std::time::Instant::now();
        let rx = model.stream(request("x")).await.unwrap();
        assert!(started.elapsed() >= delay);
        assert_eq!(model.call_count(), 1);
        assert_eq!(drain(rx).await, vec![StreamEvent::Done]);
    }
}
