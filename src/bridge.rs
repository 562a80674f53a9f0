//! Provider event bridge: applies provider-pushed auth events to the store.
//!
//! DESIGN
//! ======
//! One task drains the provider's event stream. Each event is mapped to at
//! most one [`Transition`] and the task waits for the writer to publish it
//! before reading the next event, so events are applied strictly in
//! arrival order and never concurrently.
//!
//! | event             | session | result                         |
//! |-------------------|---------|--------------------------------|
//! | `INITIAL_SESSION` | present | user set, loading off          |
//! | `INITIAL_SESSION` | absent  | user cleared, loading off      |
//! | `SIGNED_IN`       | present | user set, loading off          |
//! | `TOKEN_REFRESHED` | present | user replaced, loading off     |
//! | `SIGNED_OUT`      | any     | user cleared, loading off      |
//! | anything else     |         | ignored                        |

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::provider::{AuthEvent, AuthEventKind, AuthEvents};
use crate::state::{AuthUser, Transition};
use crate::store::SessionWriter;

/// Owns the bridge task. Dropping it stops the bridge.
pub(crate) struct ProviderEventBridge {
    handle: JoinHandle<()>,
}

impl ProviderEventBridge {
    pub(crate) fn spawn(events: AuthEvents, writer: SessionWriter) -> Self {
        Self { handle: tokio::spawn(run(events, writer)) }
    }
}

impl Drop for ProviderEventBridge {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run(mut events: AuthEvents, writer: SessionWriter) {
    while let Some(event) = events.recv().await {
        debug!(kind = event.kind.as_str(), has_session = event.session.is_some(), "auth event received");
        match transition_for(&event) {
            Some(transition) => writer.apply(transition).await,
            None => debug!(kind = event.kind.as_str(), "auth event ignored"),
        }
    }
    info!("provider event stream closed");
}

/// The state change an event calls for, if any.
pub(crate) fn transition_for(event: &AuthEvent) -> Option<Transition> {
    let user = event.session.as_ref().map(|s| AuthUser::from(&s.user));
    match (event.kind, user) {
        (AuthEventKind::InitialSession | AuthEventKind::SignedIn | AuthEventKind::TokenRefreshed, Some(user)) => {
            Some(Transition::SignedIn(user))
        }
        (AuthEventKind::InitialSession | AuthEventKind::SignedOut, _) => Some(Transition::SignedOut),
        _ => None,
    }
}

#[cfg(test)]
#[path = "bridge_test.rs"]
mod tests;
