//! Command-level errors surfaced to UI callers.
//!
//! DESIGN
//! ======
//! Commands never panic or throw past their boundary: every failure is an
//! `AuthError` value. Provider rejections keep the provider's message
//! verbatim so the UI can show it as-is; transport faults collapse to a
//! generic message with the detail kept for logs.

use serde::Serialize;

use crate::provider::ProviderError;

/// Generic message shown for failures the user cannot act on.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Shown when sign-up created the account but no session was issued.
pub const VERIFICATION_REQUIRED_MESSAGE: &str =
    "Check your email and click the verification link to activate your account.";

/// GoTrue error codes that mean "wrong email or password".
const INVALID_CREDENTIAL_CODES: &[&str] = &["invalid_credentials", "invalid_grant"];

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured errors.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// AUTH ERROR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Email or password failed local validation. Never reaches the provider.
    #[error("{0}")]
    InvalidInput(String),

    /// The provider rejected the email/password pair.
    #[error("{0}")]
    InvalidCredentials(String),

    /// Any other provider-side rejection, message passed through verbatim.
    #[error("{0}")]
    ProviderRejected(String),

    /// Sign-up created the account but the email must be confirmed first.
    #[error("{}", VERIFICATION_REQUIRED_MESSAGE)]
    VerificationRequired,

    /// Network failure, timeout, or an unreadable provider response.
    #[error("{}", UNEXPECTED_ERROR_MESSAGE)]
    TransientFailure(String),
}

impl AuthError {
    /// Internal detail for logging. Equals the display text except for
    /// transient failures, which display a generic message.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::InvalidInput(msg)
            | Self::InvalidCredentials(msg)
            | Self::ProviderRejected(msg)
            | Self::TransientFailure(msg) => msg,
            Self::VerificationRequired => VERIFICATION_REQUIRED_MESSAGE,
        }
    }
}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rejected { code, message, .. } => {
                if code
                    .as_deref()
                    .is_some_and(|c| INVALID_CREDENTIAL_CODES.contains(&c))
                {
                    Self::InvalidCredentials(message)
                } else {
                    Self::ProviderRejected(message)
                }
            }
            other => Self::TransientFailure(other.to_string()),
        }
    }
}

impl ErrorCode for AuthError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "E_INVALID_INPUT",
            Self::InvalidCredentials(_) => "E_INVALID_CREDENTIALS",
            Self::ProviderRejected(_) => "E_PROVIDER_REJECTED",
            Self::VerificationRequired => "E_VERIFICATION_REQUIRED",
            Self::TransientFailure(_) => "E_TRANSIENT",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::TransientFailure(_))
    }
}

// =============================================================================
// COMMAND OUTCOME
// =============================================================================

/// UI-facing rendering of a command result: a success flag plus, on
/// failure, the message to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl From<Result<(), AuthError>> for CommandOutcome {
    fn from(result: Result<(), AuthError>) -> Self {
        match result {
            Ok(()) => Self { success: true, error: None, code: None },
            Err(e) => Self { success: false, error: Some(e.to_string()), code: Some(e.error_code()) },
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
