//! Email/password validation run by callers before any command.
//!
//! Commands assume their input already passed these checks; the provider
//! is never contacted for an obviously malformed email or short password.

use crate::error::AuthError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Validated credentials ready to hand to `login`/`register`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Validate and normalize raw form input.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidInput`] with a user-facing message for a
    /// malformed email or a password shorter than [`MIN_PASSWORD_LEN`].
    pub fn parse(email: &str, password: &str) -> Result<Self, AuthError> {
        let email = normalize_email(email)
            .ok_or_else(|| AuthError::InvalidInput("Please enter a valid email address".into()))?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::InvalidInput(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(Self { email, password: password.to_owned() })
    }
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

#[cfg(test)]
#[path = "credentials_test.rs"]
mod tests;
