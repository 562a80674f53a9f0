//! Session configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Provider credentials are required: without them there is nothing to
//! authenticate against, so `ProviderConfig::from_env` fails loudly.
//! Everything else has a `DEFAULT_*` constant and a tolerant parser that
//! falls back to the default on garbage input.

use std::time::Duration;

pub const DEFAULT_STORAGE_KEY: &str = "sessiongate-auth-token";
pub const DEFAULT_AUTH_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_AUTH_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REFRESH_MARGIN_SECS: i64 = 60;
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing identity provider credentials: env var {var} not set (add it to .env)")]
    Missing { var: &'static str },
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

// =============================================================================
// PROVIDER CONFIG
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for ProviderTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_AUTH_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_AUTH_CONNECT_TIMEOUT_SECS }
    }
}

/// Connection settings for the GoTrue identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Project base URL without a trailing slash, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Public anon key sent as the `apikey` header.
    pub anon_key: String,
    /// Key under which the session is persisted in [`crate::provider::storage::SessionStorage`].
    pub storage_key: String,
    pub timeouts: ProviderTimeouts,
    /// Sessions expiring within this many seconds are refreshed on read.
    pub refresh_margin_secs: i64,
}

impl ProviderConfig {
    /// Build a config with defaults for everything but the credentials.
    #[must_use]
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            timeouts: ProviderTimeouts::default(),
            refresh_margin_secs: DEFAULT_REFRESH_MARGIN_SECS,
        }
    }

    /// Build typed provider config from environment variables.
    ///
    /// Required:
    /// - `SUPABASE_URL`
    /// - `SUPABASE_ANON_KEY`
    ///
    /// Optional:
    /// - `AUTH_STORAGE_KEY`: default `sessiongate-auth-token`
    /// - `AUTH_REQUEST_TIMEOUT_SECS`: default 30
    /// - `AUTH_CONNECT_TIMEOUT_SECS`: default 10
    /// - `AUTH_REFRESH_MARGIN_SECS`: default 60
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if a credential is unset or blank,
    /// and [`ConfigError::Invalid`] if the URL is not http(s).
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = required("SUPABASE_URL")?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid { var: "SUPABASE_URL", value: url });
        }
        let anon_key = required("SUPABASE_ANON_KEY")?;

        let mut config = Self::new(url, anon_key);
        if let Ok(key) = std::env::var("AUTH_STORAGE_KEY") {
            if !key.trim().is_empty() {
                config.storage_key = key.trim().to_string();
            }
        }
        config.timeouts = ProviderTimeouts {
            request_secs: env_parse("AUTH_REQUEST_TIMEOUT_SECS", DEFAULT_AUTH_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("AUTH_CONNECT_TIMEOUT_SECS", DEFAULT_AUTH_CONNECT_TIMEOUT_SECS),
        };
        config.refresh_margin_secs = env_parse("AUTH_REFRESH_MARGIN_SECS", DEFAULT_REFRESH_MARGIN_SECS);
        Ok(config)
    }
}

// =============================================================================
// STORE CONFIG
// =============================================================================

/// Tuning for [`crate::SessionStore`] commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Upper bound on each provider call made by a command. `None` waits forever.
    pub command_timeout: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { command_timeout: Some(Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS)) }
    }
}

impl StoreConfig {
    /// Read `AUTH_COMMAND_TIMEOUT_SECS` (default 30, `0` disables the timeout).
    #[must_use]
    pub fn from_env() -> Self {
        let secs = env_parse("AUTH_COMMAND_TIMEOUT_SECS", DEFAULT_COMMAND_TIMEOUT_SECS);
        Self { command_timeout: (secs > 0).then(|| Duration::from_secs(secs)) }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn required(var: &'static str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::Missing { var }),
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
