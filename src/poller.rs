//! Readiness poller
//!
//! Checks backend health once immediately and then on a fixed interval,
//! handing every outcome to a caller-supplied sink. The sink decides what to
//! do with it (usually forward it to the UI event loop, which applies it with
//! [`Conversation::record_health`](crate::state::Conversation::record_health)).

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::Backend;
use crate::error::ChatError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Handle to a running poller. Dropping it cancels the task.
pub struct ReadinessPoller {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ReadinessPoller {
    /// Spawn the polling task on the current runtime.
    ///
    /// `report` returns false once its receiver is gone, which also stops the
    /// task. It is never called after cancellation.
    pub fn spawn<B, F>(backend: Arc<B>, interval: Duration, mut report: F) -> Self
    where
        B: Backend + ?Sized + 'static,
        F: FnMut(Result<(), ChatError>) -> bool + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let outcome = tokio::select! {
                    _ = token.cancelled() => break,
                    outcome = backend.health() => outcome,
                };

                match &outcome {
                    Ok(()) => debug!("health check ok"),
                    Err(err) => warn!(
                        error = %err,
                        status = ?err.status(),
                        detail = ?err.detail(),
                        "backend health check failed"
                    ),
                }

                if token.is_cancelled() || !report(outcome) {
                    break;
                }
            }
            debug!("readiness poller stopped");
        });

        Self {
            cancel,
            task: Some(task),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel and wait for the task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ReadinessPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
