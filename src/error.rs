//! Errors produced while talking to the chat backend.
//!
//! Both kinds end up in the conversation as an assistant message; nothing here
//! is ever fatal to the client.

use thiserror::Error;

/// Fallback text when an error carries no usable description.
pub const UNKNOWN_ERROR: &str = "Unknown error occurred";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// The request never completed: connection refused, timeout, bad body.
    #[error("{0}")]
    Connectivity(String),

    /// The backend answered with a non-2xx status.
    #[error("Request failed with status code {status}")]
    Backend { status: u16, detail: Option<String> },
}

impl ChatError {
    pub fn connectivity(message: impl Into<String>) -> Self {
        ChatError::Connectivity(message.into())
    }

    pub fn backend(status: u16, detail: Option<String>) -> Self {
        ChatError::Backend { status, detail }
    }

    /// Structured detail reported by the backend, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ChatError::Backend { detail: Some(detail), .. } if !detail.is_empty() => Some(detail.as_str()),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ChatError::Backend { status, .. } => Some(*status),
            ChatError::Connectivity(_) => None,
        }
    }

    /// Text shown in the conversation: backend detail first, then the
    /// transport message, then a generic fallback.
    pub fn user_message(&self) -> String {
        let transport = self.to_string();
        let reason = self
            .detail()
            .or_else(|| (!transport.is_empty()).then_some(transport.as_str()))
            .unwrap_or(UNKNOWN_ERROR);
        format!("Error: {}", reason)
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Connectivity(err.to_string())
    }
}
