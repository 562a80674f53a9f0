//! Session state: the snapshot every consumer observes.
//!
//! DESIGN
//! ======
//! `SessionState` stores only `user` and `is_loading`; "logged in" is
//! computed from `user`, so no reachable value can disagree with it.
//! Writers never patch fields: each [`Transition`] maps one complete
//! snapshot to the next, and the store publishes the result whole.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::provider::ProviderUser;

// =============================================================================
// AUTH USER
// =============================================================================

/// Identity of the signed-in user as shown to the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    /// Provider user id (a UUID).
    pub id: Uuid,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&ProviderUser> for AuthUser {
    fn from(user: &ProviderUser) -> Self {
        Self {
            id: user.id,
            email: user.email.clone().unwrap_or_default(),
            created_at: user.created_at,
            updated_at: user.updated_at.unwrap_or(user.created_at),
        }
    }
}

// =============================================================================
// SESSION STATE
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    user: Option<AuthUser>,
    is_loading: bool,
}

impl SessionState {
    /// Logged out, not loading. The state before startup runs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Which screen flow navigation should render for this snapshot.
    #[must_use]
    pub fn route(&self) -> Route {
        if self.is_loading {
            Route::Loading
        } else if self.is_logged_in() {
            Route::Main
        } else {
            Route::Auth
        }
    }

    /// Next snapshot after `transition`.
    #[must_use]
    pub(crate) fn apply(&self, transition: &Transition) -> Self {
        match transition {
            Transition::SetLoading(flag) => Self { user: self.user.clone(), is_loading: *flag },
            Transition::SignedIn(user) => Self { user: Some(user.clone()), is_loading: false },
            Transition::SignedOut => Self { user: None, is_loading: false },
            Transition::ClearUser => Self { user: None, is_loading: self.is_loading },
        }
    }
}

impl Serialize for SessionState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Snapshot<'a> {
            user: Option<&'a AuthUser>,
            is_logged_in: bool,
            is_loading: bool,
            route: Route,
        }

        Snapshot { user: self.user(), is_logged_in: self.is_logged_in(), is_loading: self.is_loading, route: self.route() }
            .serialize(serializer)
    }
}

// =============================================================================
// TRANSITIONS
// =============================================================================

/// A single atomic state change. Produced by commands and by the
/// provider event bridge; applied by the store's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Transition {
    /// Only the loading flag changes.
    SetLoading(bool),
    /// A session is active for `user`; loading ends.
    SignedIn(AuthUser),
    /// No session; loading ends.
    SignedOut,
    /// No session; loading is left to the command's cleanup.
    ClearUser,
}

// =============================================================================
// ROUTE
// =============================================================================

/// Screen flow gate consumed by navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// A session-affecting operation is in flight.
    Loading,
    /// Sign-in / registration screens.
    Auth,
    /// The authenticated app.
    Main,
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
