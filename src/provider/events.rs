//! Event fan-out for provider implementations.
//!
//! Each subscriber gets its own unbounded channel, so a slow listener
//! never blocks emission and every listener sees events in emission order.

use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;

use super::{AuthEvent, AuthEvents};

#[derive(Default)]
pub struct EventHub {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<AuthEvent>>>,
}

impl EventHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber and queue `initial` as its first event.
    pub fn subscribe(&self, initial: AuthEvent) -> AuthEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        // Queued while holding the lock so no later emit can overtake it.
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = tx.send(initial);
        subscribers.push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber, pruning closed ones.
    pub fn emit(&self, event: &AuthEvent) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        debug!(kind = event.kind.as_str(), listeners = subscribers.len(), "auth event emitted");
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
#[path = "events_test.rs"]
mod tests;
