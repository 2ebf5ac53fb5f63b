//! Conversation messages exchanged with the property assistant
//!
//! The client owns the conversation. The core never reorders or
//! validates role alternation; it only checks shape on ingress.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for a message
///
/// Clients choose their own identifiers, so any string is accepted. Ids
/// generated here are UUIDv7 strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Generate a new time-ordered identifier
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Wrap a client-supplied identifier
    ///
    /// # Examples
    ///
    /// ```
    /// use homekey_domain::MessageId;
    ///
    /// let id = MessageId::from_string("msg-1");
    /// assert_eq!(id.as_str(), "msg-1");
    /// ```
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End user
    User,
    /// The assistant (model output)
    Assistant,
    /// Instruction text
    System,
}

impl Role {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier, assigned on ingress when the client omits one
    #[serde(default)]
    pub id: MessageId,
    /// Author
    pub role: Role,
    /// Text content
    pub content: String,
}

impl Message {
    /// Create a message with a fresh identifier
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
        }
    }

    /// Shorthand for a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Shorthand for an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Shorthand for a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Ordered conversation history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Messages in order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when there are no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent user message, if any
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }

    /// A copy of this conversation with `instruction` placed first as a system message
    pub fn with_system_prefix(&self, instruction: impl Into<String>) -> Conversation {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.push(Message::system(instruction));
        messages.extend(self.messages.iter().cloned());
        Conversation { messages }
    }

    /// Consume into the underlying messages
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl From<Vec<Message>> for Conversation {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
