//! UI-agnostic conversation state
//!
//! The message log, the pending input and the two flags the poller and the
//! controller coordinate through. Front ends own one `Conversation` and hand
//! `&mut` to whichever side is reacting to an event.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Seeded into every new conversation.
pub const GREETING: &str = "Currently indexing documents and initializing backend. This may take up to a few minutes depending on the number of documents.";

/// Appended once the backend first reports healthy.
pub const READY_ANNOUNCEMENT: &str =
    "All documents have been indexed. Ask me anything about current legislation!";

/// Reply to a submission made before the backend is ready.
pub const STILL_INDEXING: &str = "Currently indexing documents. This may take up to a few minutes.";

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only ordered record of the conversation.
///
/// Messages are never edited or reordered once pushed; the only way in is
/// [`MessageLog::push`] and the only way out is a shared slice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn contains_content(&self, content: &str) -> bool {
        self.messages.iter().any(|m| m.content == content)
    }
}

/// Result of feeding one health check outcome into the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Unchanged,
    BecameReady,
    BecameUnready,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    log: MessageLog,
    pub pending_input: String,
    awaiting_response: bool,
    backend_ready: bool,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        let mut log = MessageLog::default();
        log.push(Message::assistant(GREETING));
        Self {
            log,
            pending_input: String::new(),
            awaiting_response: false,
            backend_ready: false,
        }
    }

    pub fn messages(&self) -> &MessageLog {
        &self.log
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.awaiting_response
    }

    pub fn is_backend_ready(&self) -> bool {
        self.backend_ready
    }

    pub(crate) fn append(&mut self, message: Message) {
        self.log.push(message);
    }

    pub(crate) fn set_awaiting_response(&mut self, awaiting: bool) {
        self.awaiting_response = awaiting;
    }

    /// Apply one health check outcome.
    ///
    /// A success while not ready flips readiness on and appends the
    /// announcement unless an identical message is already in the log. A
    /// failure while ready flips it off without touching the log. Flapping is
    /// allowed; only the content check keeps the announcement unique.
    pub fn record_health(&mut self, healthy: bool) -> Readiness {
        match (healthy, self.backend_ready) {
            (true, false) => {
                self.backend_ready = true;
                if !self.log.contains_content(READY_ANNOUNCEMENT) {
                    self.log.push(Message::assistant(READY_ANNOUNCEMENT));
                }
                info!("backend is ready");
                Readiness::BecameReady
            }
            (false, true) => {
                self.backend_ready = false;
                info!("backend is no longer ready");
                Readiness::BecameUnready
            }
            _ => Readiness::Unchanged,
        }
    }
}
