//! Identity provider: the black-box collaborator that owns credentials.
//!
//! ARCHITECTURE
//! ============
//! The session core talks to the provider through two channels:
//! request/response calls on [`IdentityProvider`] and an ordered push
//! stream of [`AuthEvent`]s obtained once from `on_auth_state_change`.
//! The direct response to a sign-in does not carry the user; the
//! `SIGNED_IN` event that follows does.
//!
//! [`gotrue::GoTrueClient`] implements the trait against the Supabase
//! GoTrue REST API. Tests substitute a scripted double.

pub mod events;
pub mod gotrue;
pub mod refresh;
pub mod storage;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use uuid::Uuid;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by identity provider operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider answered and refused the request.
    #[error("{message}")]
    Rejected { status: Option<u16>, code: Option<String>, message: String },

    /// The request never got an answer (DNS, TLS, connect, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with a body we could not interpret.
    #[error("unexpected provider response: {0}")]
    Decode(String),

    /// Persisted session could not be read or written.
    #[error("session storage error: {0}")]
    Storage(String),
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// User record as the provider reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUser {
    /// GoTrue user id. Always a UUID; records with any other id shape
    /// fail to decode as [`ProviderError::Decode`].
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub email_confirmed_at: Option<OffsetDateTime>,
}

/// A provider-issued session: tokens plus the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: ProviderUser,
}

impl ProviderSession {
    /// Whether the session expires within `margin_secs` of `now_unix`.
    /// Sessions without an expiry never expire.
    #[must_use]
    pub fn expires_within(&self, now_unix: i64, margin_secs: i64) -> bool {
        self.expires_at
            .is_some_and(|at| at <= now_unix.saturating_add(margin_secs))
    }
}

/// Result of a sign-up call. A session is present only when the provider
/// auto-confirms new accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpResponse {
    pub user: Option<ProviderUser>,
    pub session: Option<ProviderSession>,
}

// =============================================================================
// EVENTS
// =============================================================================

/// Session lifecycle notifications pushed by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

impl AuthEventKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InitialSession => "INITIAL_SESSION",
            Self::SignedIn => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::UserUpdated => "USER_UPDATED",
            Self::PasswordRecovery => "PASSWORD_RECOVERY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<ProviderSession>,
}

impl AuthEvent {
    #[must_use]
    pub fn new(kind: AuthEventKind, session: Option<ProviderSession>) -> Self {
        Self { kind, session }
    }

    #[must_use]
    pub fn initial(session: Option<ProviderSession>) -> Self {
        Self::new(AuthEventKind::InitialSession, session)
    }

    #[must_use]
    pub fn signed_in(session: ProviderSession) -> Self {
        Self::new(AuthEventKind::SignedIn, Some(session))
    }

    #[must_use]
    pub fn token_refreshed(session: ProviderSession) -> Self {
        Self::new(AuthEventKind::TokenRefreshed, Some(session))
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self::new(AuthEventKind::SignedOut, None)
    }
}

/// Ordered event stream handed out by [`IdentityProvider::on_auth_state_change`].
/// Dropping it unsubscribes.
pub type AuthEvents = mpsc::UnboundedReceiver<AuthEvent>;

// =============================================================================
// PROVIDER TRAIT
// =============================================================================

/// Async contract for the identity service, shaped after GoTrue: users
/// are keyed by UUID and sessions carry a refresh token. Enables mocking
/// in tests.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticate with email and password. A successful call is followed
    /// by a `SIGNED_IN` event carrying the session.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<(), ProviderError>;

    /// Create an account.
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse, ProviderError>;

    /// End the current session, followed by a `SIGNED_OUT` event.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Current session from local storage, refreshed only if about to expire.
    async fn get_session(&self) -> Result<Option<ProviderSession>, ProviderError>;

    /// Register a listener. The first event delivered is `INITIAL_SESSION`
    /// with whatever session exists at subscription time; every change
    /// committed after that snapshot follows it, none is skipped.
    async fn on_auth_state_change(&self) -> AuthEvents;
}
