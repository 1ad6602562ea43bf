//! Conversation controller: mediates between user input and the chat endpoint.
//!
//! `submit` and `complete` are the two halves of one exchange. Front ends with
//! their own event loop call `submit`, run the request wherever they like and
//! feed the result back through `complete`. `exchange` does all three in
//! sequence for callers that can simply await.

use tracing::{debug, error, warn};

use crate::api::Backend;
use crate::error::ChatError;
use crate::state::{Conversation, Message, STILL_INDEXING};

/// What the caller has to do after a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Blank input or a request already in flight; nothing changed.
    Ignored,
    /// Backend not ready; the indexing notice was appended instead.
    Deferred,
    /// Send this text to the chat endpoint, then call [`complete`].
    Dispatch(String),
}

pub fn submit(conv: &mut Conversation, text: &str) -> Submission {
    if text.trim().is_empty() || conv.is_awaiting_response() {
        return Submission::Ignored;
    }

    conv.append(Message::user(text));
    conv.pending_input.clear();
    conv.set_awaiting_response(true);

    if !conv.is_backend_ready() {
        debug!("backend not ready, answering locally");
        conv.append(Message::assistant(STILL_INDEXING));
        conv.set_awaiting_response(false);
        return Submission::Deferred;
    }

    Submission::Dispatch(text.to_string())
}

/// Submit whatever is in `pending_input`.
pub fn submit_pending(conv: &mut Conversation) -> Submission {
    let text = conv.pending_input.clone();
    submit(conv, &text)
}

/// Record the outcome of a dispatched request.
///
/// Returns false and leaves the log alone when no request is in flight, so a
/// late reply from an abandoned exchange cannot land twice.
pub fn complete(conv: &mut Conversation, outcome: Result<String, ChatError>) -> bool {
    if !conv.is_awaiting_response() {
        warn!("dropping chat reply with no request in flight");
        return false;
    }

    let message = match outcome {
        Ok(answer) => Message::assistant(answer),
        Err(err) => {
            error!(error = %err, status = ?err.status(), detail = ?err.detail(), "chat request failed");
            Message::assistant(err.user_message())
        }
    };
    conv.append(message);
    conv.set_awaiting_response(false);
    true
}

/// Run one full exchange against `backend`.
pub async fn exchange<B: Backend + ?Sized>(
    conv: &mut Conversation,
    backend: &B,
    text: &str,
) -> Submission {
    let submission = submit(conv, text);
    if let Submission::Dispatch(ref message) = submission {
        let outcome = backend.chat(message).await;
        complete(conv, outcome);
    }
    submission
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Role, READY_ANNOUNCEMENT};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Backend that replays queued chat outcomes and records what it was sent.
    struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<String, ChatError>>>,
        sent: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Result<String, ChatError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Backend for ScriptedBackend {
        async fn health(&self) -> Result<(), ChatError> {
            Ok(())
        }

        async fn chat(&self, message: &str) -> Result<String, ChatError> {
            self.sent.lock().unwrap().push(message.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ChatError::connectivity("no reply queued")))
        }
    }

    fn ready_conversation() -> Conversation {
        let mut conv = Conversation::new();
        conv.record_health(true);
        conv
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut conv = ready_conversation();
        for text in ["", "   ", "\n\t "] {
            assert_eq!(submit(&mut conv, text), Submission::Ignored);
        }
        assert_eq!(conv.messages().len(), 2);
        assert!(!conv.is_awaiting_response());
    }

    #[test]
    fn in_flight_blocks_resubmission() {
        let mut conv = ready_conversation();
        conv.pending_input = "second".to_string();
        assert_eq!(submit(&mut conv, "first"), Submission::Dispatch("first".to_string()));
        assert!(conv.is_awaiting_response());
        assert!(conv.pending_input.is_empty());

        conv.pending_input = "second".to_string();
        assert_eq!(submit_pending(&mut conv), Submission::Ignored);
        assert_eq!(conv.messages().len(), 3);
        assert_eq!(conv.pending_input, "second");

        assert!(complete(&mut conv, Ok("answer".to_string())));
        assert_eq!(
            submit_pending(&mut conv),
            Submission::Dispatch("second".to_string())
        );
    }

    #[test]
    fn not_ready_short_circuits() {
        let mut conv = Conversation::new();
        assert_eq!(submit(&mut conv, "What is HR 1234?"), Submission::Deferred);

        let log = conv.messages().as_slice();
        assert_eq!(log.len(), 3);
        assert_eq!(log[1], Message::user("What is HR 1234?"));
        assert_eq!(log[2], Message::assistant(STILL_INDEXING));
        assert!(!conv.is_awaiting_response());
    }

    #[test]
    fn stale_completion_is_dropped() {
        let mut conv = ready_conversation();
        assert!(!complete(&mut conv, Ok("late".to_string())));
        assert_eq!(conv.messages().len(), 2);
    }

    #[tokio::test]
    async fn successful_exchange() {
        let backend = ScriptedBackend::new(vec![Ok("HR 1234 is...".to_string())]);
        let mut conv = ready_conversation();

        let submission = exchange(&mut conv, &backend, "What is HR 1234?").await;
        assert_eq!(submission, Submission::Dispatch("What is HR 1234?".to_string()));

        let log = conv.messages().as_slice();
        assert_eq!(log.len(), 4);
        assert_eq!(log[1].content, READY_ANNOUNCEMENT);
        assert_eq!(log[2], Message::user("What is HR 1234?"));
        assert_eq!(log[3], Message::assistant("HR 1234 is..."));
        assert!(!conv.is_awaiting_response());
        assert_eq!(backend.sent(), vec!["What is HR 1234?".to_string()]);
    }

    #[tokio::test]
    async fn transport_failure_is_reported() {
        let backend = ScriptedBackend::new(vec![Err(ChatError::connectivity("Network Error"))]);
        let mut conv = ready_conversation();

        exchange(&mut conv, &backend, "anything").await;

        let last = conv.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "Error: Network Error");
        assert!(!conv.is_awaiting_response());
    }

    #[tokio::test]
    async fn backend_detail_is_reported() {
        let backend = ScriptedBackend::new(vec![Err(ChatError::backend(
            500,
            Some("Chat engine not initialized".to_string()),
        ))]);
        let mut conv = ready_conversation();

        exchange(&mut conv, &backend, "anything").await;

        assert_eq!(
            conv.messages().last().unwrap().content,
            "Error: Chat engine not initialized"
        );
    }

    #[tokio::test]
    async fn not_ready_never_calls_backend() {
        let backend = ScriptedBackend::new(vec![Ok("unused".to_string())]);
        let mut conv = Conversation::new();

        assert_eq!(exchange(&mut conv, &backend, "hello").await, Submission::Deferred);
        assert!(backend.sent().is_empty());
        assert_eq!(conv.messages().len(), 3);
    }

    #[tokio::test]
    async fn multiline_answer_kept_verbatim() {
        let answer = "Summary:\n\n  - point one\n  - point two\n";
        let backend = ScriptedBackend::new(vec![Ok(answer.to_string())]);
        let mut conv = ready_conversation();

        exchange(&mut conv, &backend, "line one\nline two").await;

        let log = conv.messages().as_slice();
        assert_eq!(log[2].content, "line one\nline two");
        assert_eq!(log[3].content, answer);
    }

    proptest! {
        #[test]
        fn whitespace_never_mutates(text in "[ \t\n\r]{0,16}", ready in any::<bool>()) {
            let mut conv = Conversation::new();
            conv.record_health(ready);
            let before = conv.messages().clone();

            prop_assert_eq!(submit(&mut conv, &text), Submission::Ignored);
            prop_assert_eq!(conv.messages(), &before);
            prop_assert!(!conv.is_awaiting_response());
        }
    }
}
