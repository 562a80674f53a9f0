//! Session store: the single authoritative session state and its commands.
//!
//! ARCHITECTURE
//! ============
//! One writer task owns the `watch::Sender<SessionState>`. Commands and
//! the provider event bridge never touch state directly: they send a
//! [`Transition`] to the writer and await its acknowledgement. Because the
//! writer applies one transition at a time, a command's write and an
//! event's write can never interleave, and readers only ever see whole
//! snapshots.
//!
//! Consumers hold a cloned [`SessionStore`] handle (or just a watch
//! receiver from [`SessionStore::subscribe`]); there is no global.
//!
//! LOADING FLAG
//! ============
//! Every command raises `is_loading` before its first provider call and
//! lowers it on every exit path through [`LoadingGuard`]. The flag is a
//! plain boolean, not a counter: with overlapping commands, whichever
//! finishes last leaves it `false`.
//!
//! ORDERING
//! ========
//! `login`/`register` do not write the user. The provider's `SIGNED_IN`
//! event does, through the bridge, and may land before or after the
//! command returns.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::bridge::ProviderEventBridge;
use crate::config::StoreConfig;
use crate::error::AuthError;
use crate::provider::{IdentityProvider, ProviderError};
use crate::state::{AuthUser, Route, SessionState, Transition};

// =============================================================================
// WRITER
// =============================================================================

struct WriteRequest {
    transition: Transition,
    ack: Option<oneshot::Sender<()>>,
}

/// Handle for submitting transitions to the writer task.
#[derive(Clone)]
pub(crate) struct SessionWriter {
    tx: mpsc::UnboundedSender<WriteRequest>,
}

impl SessionWriter {
    /// Spawn the writer task, returning its handle and a state receiver.
    pub(crate) fn spawn(initial: SessionState) -> (Self, watch::Receiver<SessionState>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(initial);
        tokio::spawn(writer_loop(rx, state_tx));
        (Self { tx }, state_rx)
    }

    /// Apply `transition` and wait until it is published.
    pub(crate) async fn apply(&self, transition: Transition) {
        let (ack_tx, ack_rx) = oneshot::channel();
        let request = WriteRequest { transition, ack: Some(ack_tx) };
        if self.tx.send(request).is_err() || ack_rx.await.is_err() {
            warn!("session writer stopped; transition dropped");
        }
    }

    /// Queue `transition` without waiting. Usable from `Drop`.
    pub(crate) fn apply_detached(&self, transition: Transition) {
        if self.tx.send(WriteRequest { transition, ack: None }).is_err() {
            warn!("session writer stopped; transition dropped");
        }
    }
}

async fn writer_loop(mut rx: mpsc::UnboundedReceiver<WriteRequest>, state_tx: watch::Sender<SessionState>) {
    while let Some(request) = rx.recv().await {
        let changed = state_tx.send_if_modified(|state| {
            let next = state.apply(&request.transition);
            if next == *state {
                return false;
            }
            *state = next;
            true
        });
        debug!(transition = ?request.transition, changed, "session transition applied");
        if let Some(ack) = request.ack {
            let _ = ack.send(());
        }
    }
    debug!("session writer stopped");
}

// =============================================================================
// LOADING GUARD
// =============================================================================

/// Holds `is_loading = true` for the life of a command.
///
/// Call [`LoadingGuard::release`] on normal exit so the reset is published
/// before the command returns. If the command future is dropped or
/// panics instead, `Drop` queues the reset.
pub(crate) struct LoadingGuard {
    writer: SessionWriter,
    armed: bool,
}

impl LoadingGuard {
    pub(crate) async fn acquire(writer: &SessionWriter) -> Self {
        // Armed before the raise is queued: a drop while awaiting the ack
        // still queues the reset behind it.
        let guard = Self { writer: writer.clone(), armed: true };
        guard.writer.apply(Transition::SetLoading(true)).await;
        guard
    }

    pub(crate) async fn release(mut self) {
        self.armed = false;
        self.writer.apply(Transition::SetLoading(false)).await;
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if self.armed {
            self.writer.apply_detached(Transition::SetLoading(false));
        }
    }
}

// =============================================================================
// SESSION STORE
// =============================================================================

struct Inner {
    provider: Arc<dyn IdentityProvider>,
    writer: SessionWriter,
    state: watch::Receiver<SessionState>,
    config: StoreConfig,
    _bridge: ProviderEventBridge,
}

/// Cloneable handle to the session store. All clones share one state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    /// Create the store and subscribe to the provider's event stream.
    ///
    /// This is the only place that subscribes; construct one store per
    /// process and hand clones to consumers.
    pub async fn start(provider: Arc<dyn IdentityProvider>, config: StoreConfig) -> Self {
        let (writer, state) = SessionWriter::spawn(SessionState::new());
        let events = provider.on_auth_state_change().await;
        let bridge = ProviderEventBridge::spawn(events, writer.clone());
        info!(command_timeout = ?config.command_timeout, "session store started");
        Self { inner: Arc::new(Inner { provider, writer, state, config, _bridge: bridge }) }
    }

    // =========================================================================
    // OBSERVATION
    // =========================================================================

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn route(&self) -> Route {
        self.inner.state.borrow().route()
    }

    /// Change notifications. Dropping the receiver unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.clone()
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    /// Authenticate with email and password.
    ///
    /// Success means the provider accepted the credentials; the user is
    /// published when the provider's `SIGNED_IN` event is processed.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] or [`AuthError::ProviderRejected`]
    /// with the provider's message, or [`AuthError::TransientFailure`].
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let loading = LoadingGuard::acquire(&self.inner.writer).await;
        info!(email, "attempting login");

        let result = self
            .call(self.inner.provider.sign_in_with_password(email, password))
            .await;
        match &result {
            Ok(()) => info!(email, "login accepted"),
            Err(e) => warn!(email, error = %e.detail(), "login failed"),
        }

        loading.release().await;
        result
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// [`AuthError::VerificationRequired`] when the account was created but
    /// the email must be confirmed before a session is issued; otherwise as
    /// for [`SessionStore::login`].
    pub async fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let loading = LoadingGuard::acquire(&self.inner.writer).await;
        info!(email, "attempting registration");

        let result = self
            .call(self.inner.provider.sign_up(email, password))
            .await
            .and_then(|response| {
                let unconfirmed = response
                    .user
                    .as_ref()
                    .is_some_and(|u| u.email_confirmed_at.is_none());
                if unconfirmed { Err(AuthError::VerificationRequired) } else { Ok(()) }
            });
        match &result {
            Ok(()) => info!(email, "registration accepted"),
            Err(AuthError::VerificationRequired) => info!(email, "registration needs email verification"),
            Err(e) => warn!(email, error = %e.detail(), "registration failed"),
        }

        loading.release().await;
        result
    }

    /// Sign out. Local state always ends logged out; provider failures are
    /// logged, not returned.
    pub async fn logout(&self) {
        let loading = LoadingGuard::acquire(&self.inner.writer).await;

        if let Err(e) = self.call(self.inner.provider.sign_out()).await {
            warn!(error = %e.detail(), "provider sign-out failed; clearing local session anyway");
        }
        self.inner.writer.apply(Transition::ClearUser).await;
        info!("logged out");

        loading.release().await;
    }

    /// Re-read the provider's current session and publish it.
    pub async fn reload(&self) {
        let loading = LoadingGuard::acquire(&self.inner.writer).await;

        let transition = match self.call(self.inner.provider.get_session()).await {
            Ok(Some(session)) => {
                info!(email = session.user.email.as_deref().unwrap_or_default(), "session restored");
                Transition::SignedIn(AuthUser::from(&session.user))
            }
            Ok(None) => {
                info!("no active session");
                Transition::SignedOut
            }
            Err(e) => {
                warn!(error = %e.detail(), "session reload failed");
                Transition::SignedOut
            }
        };
        self.inner.writer.apply(transition).await;

        loading.release().await;
    }

    /// Directly set the loading flag.
    pub async fn set_loading(&self, flag: bool) {
        self.inner.writer.apply(Transition::SetLoading(flag)).await;
    }

    /// Startup sequence: show loading immediately, then restore the session.
    pub async fn bootstrap(&self) {
        info!("initializing session");
        self.set_loading(true).await;
        self.reload().await;
    }

    /// Await a provider call under the configured timeout.
    async fn call<T, F>(&self, fut: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        match self.inner.config.command_timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result.map_err(AuthError::from),
                Err(_) => Err(AuthError::TransientFailure(format!(
                    "provider did not respond within {}ms",
                    limit.as_millis()
                ))),
            },
            None => fut.await.map_err(AuthError::from),
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
