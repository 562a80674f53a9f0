//! GoTrue (Supabase auth) client: password grant, sign-up, sign-out,
//! refresh, and local session persistence.
//!
//! DESIGN
//! ======
//! Every state change the client makes is mirrored as an [`AuthEvent`]
//! after the session has been written to storage, so a listener that
//! re-reads storage on an event always sees the new value.
//!
//! Writing the session and emitting its event happen under `publish_lock`,
//! which `on_auth_state_change` also holds while it reads the initial
//! snapshot and registers the subscriber. A new subscriber therefore sees
//! either the old snapshot followed by the event, or the new snapshot.
//!
//! ERROR HANDLING
//! ==============
//! Sign-out always clears the local session and emits `SIGNED_OUT`, even
//! when the revoke request fails; the request error is still returned so
//! callers can log it. A refresh the server rejects means the refresh
//! token is dead, so the local session is discarded the same way.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use super::events::EventHub;
use super::storage::SessionStorage;
use super::{AuthEvent, AuthEvents, IdentityProvider, ProviderError, ProviderSession, ProviderUser, SignUpResponse};
use crate::config::ProviderConfig;

pub struct GoTrueClient {
    http: reqwest::Client,
    config: ProviderConfig,
    storage: Arc<dyn SessionStorage>,
    hub: EventHub,
    publish_lock: AsyncMutex<()>,
}

impl GoTrueClient {
    /// Build a client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] if the HTTP client fails to build.
    pub fn new(config: ProviderConfig, storage: Arc<dyn SessionStorage>) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self { http, config, storage, hub: EventHub::new(), publish_lock: AsyncMutex::new(()) })
    }

    /// Refresh only if the stored session is inside the refresh margin.
    /// Returns whether a refresh happened.
    ///
    /// # Errors
    ///
    /// Propagates transport, decode, and storage failures. A rejected
    /// refresh also signs the client out locally.
    pub async fn refresh_if_expiring(&self) -> Result<bool, ProviderError> {
        let Some(current) = self.load_session().await? else {
            return Ok(false);
        };
        if !current.expires_within(now_unix(), self.config.refresh_margin_secs) {
            return Ok(false);
        }
        self.refresh_from(&current).await?;
        Ok(true)
    }

    // =========================================================================
    // HTTP
    // =========================================================================

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.config.url)
    }

    async fn post(&self, path: &str, bearer: Option<&str>, body: &Value) -> Result<reqwest::Response, ProviderError> {
        let resp = self
            .http
            .post(self.endpoint(path))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.config.anon_key))
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(decode_error(status, &body))
    }

    async fn token_grant(&self, grant_type: &str, body: &Value) -> Result<ProviderSession, ProviderError> {
        let resp = self
            .post(&format!("token?grant_type={grant_type}"), None, body)
            .await?;
        let session = resp
            .json::<ProviderSession>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(with_expiry(session, now_unix()))
    }

    async fn refresh_from(&self, current: &ProviderSession) -> Result<ProviderSession, ProviderError> {
        let body = json!({ "refresh_token": current.refresh_token });
        match self.token_grant("refresh_token", &body).await {
            Ok(session) => {
                self.publish(Some(&session), AuthEvent::token_refreshed(session.clone()))
                    .await?;
                info!(user_id = %session.user.id, "session refreshed");
                Ok(session)
            }
            Err(err @ ProviderError::Rejected { .. }) => {
                warn!(error = %err, "refresh token rejected; signing out locally");
                self.publish(None, AuthEvent::signed_out()).await?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    // =========================================================================
    // STORAGE
    // =========================================================================

    async fn load_session(&self) -> Result<Option<ProviderSession>, ProviderError> {
        let Some(raw) = self.storage.get_item(&self.config.storage_key).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<ProviderSession>(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(error = %e, "discarding unreadable stored session");
                self.clear_session().await?;
                Ok(None)
            }
        }
    }

    async fn save_session(&self, session: &ProviderSession) -> Result<(), ProviderError> {
        let raw = serde_json::to_string(session).map_err(|e| ProviderError::Storage(e.to_string()))?;
        self.storage
            .set_item(&self.config.storage_key, &raw)
            .await
    }

    async fn clear_session(&self) -> Result<(), ProviderError> {
        self.storage.remove_item(&self.config.storage_key).await
    }

    /// Store `session` (or remove it when `None`) and emit `event`.
    /// A failed save suppresses the event; a removal always emits.
    async fn publish(&self, session: Option<&ProviderSession>, event: AuthEvent) -> Result<(), ProviderError> {
        let _guard = self.publish_lock.lock().await;
        let stored = match session {
            Some(session) => {
                self.save_session(session).await?;
                Ok(())
            }
            None => self.clear_session().await,
        };
        self.hub.emit(&event);
        stored
    }
}

#[async_trait::async_trait]
impl IdentityProvider for GoTrueClient {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<(), ProviderError> {
        let body = json!({ "email": email, "password": password });
        let session = self.token_grant("password", &body).await?;
        info!(user_id = %session.user.id, "password sign-in accepted");
        self.publish(Some(&session), AuthEvent::signed_in(session.clone()))
            .await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse, ProviderError> {
        let body = json!({ "email": email, "password": password });
        let resp = self.post("signup", None, &body).await?;
        let value = resp
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        let response = parse_sign_up(value, now_unix())?;

        if let Some(session) = &response.session {
            self.publish(Some(session), AuthEvent::signed_in(session.clone()))
                .await?;
        }
        Ok(response)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let session = self.load_session().await.unwrap_or_else(|e| {
            warn!(error = %e, "could not read stored session during sign-out");
            None
        });

        let revoked = match &session {
            Some(s) => self
                .post("logout", Some(&s.access_token), &json!({}))
                .await
                .map(|_| ()),
            None => Ok(()),
        };
        let cleared = self.publish(None, AuthEvent::signed_out()).await;
        revoked.and(cleared)
    }

    async fn get_session(&self) -> Result<Option<ProviderSession>, ProviderError> {
        let Some(current) = self.load_session().await? else {
            return Ok(None);
        };
        if current.expires_within(now_unix(), self.config.refresh_margin_secs) {
            return self.refresh_from(&current).await.map(Some);
        }
        Ok(Some(current))
    }

    async fn on_auth_state_change(&self) -> AuthEvents {
        let _guard = self.publish_lock.lock().await;
        let initial = self.load_session().await.unwrap_or_else(|e| {
            warn!(error = %e, "could not read stored session for initial snapshot");
            None
        });
        self.hub.subscribe(AuthEvent::initial(initial))
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// Union of the error body shapes GoTrue has used across versions.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error_code: Option<String>,
    code: Option<Value>,
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

pub(crate) fn decode_error(status: u16, body: &str) -> ProviderError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed
        .error_code
        .or_else(|| parsed.code.as_ref().and_then(Value::as_str).map(str::to_owned))
        .or_else(|| parsed.error.clone());
    let message = parsed
        .msg
        .or(parsed.message)
        .or(parsed.error_description)
        .or(parsed.error)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() { format!("request failed with status {status}") } else { trimmed.to_owned() }
        });
    ProviderError::Rejected { status: Some(status), code, message }
}

/// Sign-up answers with a full session when the project auto-confirms,
/// otherwise with the bare user (sometimes wrapped in `user`).
pub(crate) fn parse_sign_up(value: Value, now: i64) -> Result<SignUpResponse, ProviderError> {
    if value.get("access_token").is_some() {
        let session: ProviderSession =
            serde_json::from_value(value).map_err(|e| ProviderError::Decode(e.to_string()))?;
        let session = with_expiry(session, now);
        return Ok(SignUpResponse { user: Some(session.user.clone()), session: Some(session) });
    }

    let user_value = match value.get("user") {
        Some(inner) if !inner.is_null() => inner.clone(),
        _ => value,
    };
    if user_value.is_null() {
        return Ok(SignUpResponse::default());
    }
    let user: ProviderUser = serde_json::from_value(user_value).map_err(|e| ProviderError::Decode(e.to_string()))?;
    Ok(SignUpResponse { user: Some(user), session: None })
}

/// Fill `expires_at` from `expires_in` when the server only sent the latter.
pub(crate) fn with_expiry(mut session: ProviderSession, now: i64) -> ProviderSession {
    if session.expires_at.is_none() {
        session.expires_at = session.expires_in.map(|secs| now.saturating_add(secs));
    }
    session
}

fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

#[cfg(test)]
#[path = "gotrue_test.rs"]
mod tests;
