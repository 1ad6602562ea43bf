pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod poller;
pub mod state;

// Re-export main types for convenience
pub use api::{Backend, HttpBackend};
pub use config::Config;
pub use controller::Submission;
pub use error::ChatError;
pub use poller::ReadinessPoller;
pub use state::{Conversation, Message, MessageLog, Readiness, Role};
