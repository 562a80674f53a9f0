//! Shared fixtures: provider users/sessions and a scripted provider.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use time::macros::datetime;
use uuid::Uuid;

use crate::provider::events::EventHub;
use crate::provider::{
    AuthEvent, AuthEvents, IdentityProvider, ProviderError, ProviderSession, ProviderUser, SignUpResponse,
};

pub(crate) fn user(email: &str) -> ProviderUser {
    ProviderUser {
        id: Uuid::new_v5(&Uuid::NAMESPACE_OID, email.as_bytes()),
        email: Some(email.to_owned()),
        created_at: datetime!(2024-01-01 0:00 UTC),
        updated_at: Some(datetime!(2024-01-01 0:00 UTC)),
        email_confirmed_at: Some(datetime!(2024-01-01 0:00 UTC)),
    }
}

pub(crate) fn session_for(user: &ProviderUser) -> ProviderSession {
    ProviderSession {
        access_token: format!("at-{}", user.id),
        refresh_token: format!("rt-{}", user.id),
        token_type: Some("bearer".into()),
        expires_in: Some(3600),
        expires_at: None,
        user: user.clone(),
    }
}

pub(crate) fn rejected(message: &str) -> ProviderError {
    ProviderError::Rejected { status: Some(400), code: Some("invalid_credentials".into()), message: message.into() }
}

// =============================================================================
// ScriptedProvider
// =============================================================================

/// Identity provider double. Each call returns its scripted result; events
/// are only delivered when the test calls [`ScriptedProvider::emit`].
pub(crate) struct ScriptedProvider {
    pub sign_in: Mutex<Result<(), ProviderError>>,
    pub sign_up: Mutex<Result<SignUpResponse, ProviderError>>,
    pub sign_out: Mutex<Result<(), ProviderError>>,
    pub session: Mutex<Result<Option<ProviderSession>, ProviderError>>,
    /// Every call suspends forever while set.
    pub stall: AtomicBool,
    pub subscriptions: AtomicUsize,
    pub calls: Mutex<Vec<&'static str>>,
    hub: EventHub,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self {
            sign_in: Mutex::new(Ok(())),
            sign_up: Mutex::new(Ok(SignUpResponse::default())),
            sign_out: Mutex::new(Ok(())),
            session: Mutex::new(Ok(None)),
            stall: AtomicBool::new(false),
            subscriptions: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            hub: EventHub::new(),
        }
    }

    pub(crate) fn with_session(session: ProviderSession) -> Self {
        let provider = Self::new();
        *provider.session.lock().unwrap() = Ok(Some(session));
        provider
    }

    pub(crate) fn emit(&self, event: AuthEvent) {
        self.hub.emit(&event);
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    async fn enter(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for ScriptedProvider {
    async fn sign_in_with_password(&self, _email: &str, _password: &str) -> Result<(), ProviderError> {
        self.enter("sign_in").await;
        self.sign_in.lock().unwrap().clone()
    }

    async fn sign_up(&self, _email: &str, _password: &str) -> Result<SignUpResponse, ProviderError> {
        self.enter("sign_up").await;
        self.sign_up.lock().unwrap().clone()
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.enter("sign_out").await;
        self.sign_out.lock().unwrap().clone()
    }

    async fn get_session(&self) -> Result<Option<ProviderSession>, ProviderError> {
        self.enter("get_session").await;
        self.session.lock().unwrap().clone()
    }

    async fn on_auth_state_change(&self) -> AuthEvents {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let initial = self.session.lock().unwrap().clone().ok().flatten();
        self.hub.subscribe(AuthEvent::initial(initial))
    }
}
