//! Client-side session management over a hosted identity provider.
//!
//! A [`SessionStore`] holds the one authoritative [`SessionState`]
//! (current user, loading flag), runs the auth commands against an
//! [`IdentityProvider`], and applies the provider's pushed auth events in
//! arrival order. Consumers read snapshots or subscribe to changes.

mod bridge;
pub mod config;
pub mod credentials;
pub mod error;
pub mod provider;
pub mod state;
mod store;

#[cfg(test)]
mod test_helpers;

pub use config::{ProviderConfig, StoreConfig};
pub use credentials::Credentials;
pub use error::{AuthError, CommandOutcome, ErrorCode};
pub use provider::IdentityProvider;
pub use state::{AuthUser, Route, SessionState};
pub use store::SessionStore;
