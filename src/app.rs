use std::sync::Arc;
use std::time::Duration;
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use legislator_chat::controller::{self, Submission};
use legislator_chat::{Backend, ChatError, Conversation, ReadinessPoller};
use crate::tui::AppEvent;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub conversation: Conversation,
    pub base_url: String,

    // Input state
    pub input_cursor: usize,

    // Chat view state
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_lines: u16,
    pub chat_area: Option<Rect>,
    pub animation_frame: u8,

    // What the last auto-scroll saw, so log growth can be detected
    seen_len: usize,
    seen_awaiting: bool,

    backend: Arc<dyn Backend>,
    events: UnboundedSender<AppEvent>,
    poller: Option<ReadinessPoller>,
}

impl App {
    pub fn new(backend: Arc<dyn Backend>, base_url: &str, events: UnboundedSender<AppEvent>) -> Self {
        Self {
            should_quit: false,
            conversation: Conversation::new(),
            base_url: base_url.to_string(),

            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_lines: 0,
            chat_area: None,
            animation_frame: 0,

            seen_len: 0,
            seen_awaiting: false,

            backend,
            events,
            poller: None,
        }
    }

    /// Start the readiness poller; its outcomes come back as `AppEvent::Health`.
    pub fn start_polling(&mut self, interval: Duration) {
        let tx = self.events.clone();
        self.poller = Some(ReadinessPoller::spawn(
            self.backend.clone(),
            interval,
            move |outcome| tx.send(AppEvent::Health(outcome)).is_ok(),
        ));
    }

    pub fn apply_health(&mut self, outcome: Result<(), ChatError>) {
        self.conversation.record_health(outcome.is_ok());
    }

    /// Submit the pending input, spawning the chat request if one is needed.
    pub fn submit(&mut self) {
        if let Submission::Dispatch(text) = controller::submit_pending(&mut self.conversation) {
            self.input_cursor = 0;
            let backend = self.backend.clone();
            let tx = self.events.clone();
            tokio::spawn(async move {
                let outcome = backend.chat(&text).await;
                // The session may have ended while waiting
                if tx.send(AppEvent::Reply(outcome)).is_err() {
                    debug!("chat reply arrived after session ended");
                }
            });
        } else if self.conversation.pending_input.is_empty() {
            self.input_cursor = 0;
        }
    }

    pub fn apply_reply(&mut self, outcome: Result<String, ChatError>) {
        controller::complete(&mut self.conversation, outcome);
    }

    pub fn tick_animation(&mut self) {
        if self.conversation.is_awaiting_response() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Record the chat viewport and the rendered height of the log, and snap
    /// to the newest message whenever the log has grown or the thinking
    /// indicator toggled since the last call.
    pub fn sync_chat_view(&mut self, height: u16, total_lines: u16) {
        self.chat_height = height;
        self.chat_lines = total_lines;

        let len = self.conversation.messages().len();
        let awaiting = self.conversation.is_awaiting_response();
        if len != self.seen_len || awaiting != self.seen_awaiting {
            self.seen_len = len;
            self.seen_awaiting = awaiting;
            self.scroll_chat_to_bottom();
        } else {
            self.chat_scroll = self.chat_scroll.min(self.max_chat_scroll());
        }
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.max_chat_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_chat_scroll());
    }

    pub fn page_size(&self) -> u16 {
        self.chat_height.saturating_sub(1).max(1)
    }

    fn max_chat_scroll(&self) -> u16 {
        self.chat_lines.saturating_sub(self.chat_height)
    }

    /// Stop background polling. In-flight chat requests are left to finish;
    /// their replies are dropped with the event channel.
    pub fn shutdown(&mut self) {
        self.poller.take();
    }
}
