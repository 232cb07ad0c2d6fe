//! Session subsystem configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Session configuration
///
/// Controls the cookie that binds visitors to server-side sessions and the
/// lifetime of in-memory session entries.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Name of the session cookie
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Cookie max-age in seconds (7 days by default)
    #[serde(default = "default_cookie_max_age")]
    pub cookie_max_age_secs: u64,

    /// In-memory entry lifetime in seconds; 0 disables expiry
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
}

impl SessionConfig {
    /// Entry lifetime for the in-memory store; `None` disables expiry.
    pub fn store_ttl(&self) -> Option<u64> {
        (self.ttl_secs > 0).then_some(self.ttl_secs)
    }

    /// Validate session configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cookie_name.is_empty() {
            return Err(ValidationError::EmptyCookieName);
        }
        // Cookie names are RFC 6265 tokens: no separators, whitespace, or
        // control characters.
        if !self
            .cookie_name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return Err(ValidationError::InvalidCookieName);
        }
        if self.cookie_max_age_secs == 0 {
            return Err(ValidationError::InvalidCookieMaxAge);
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            cookie_max_age_secs: default_cookie_max_age(),
            ttl_secs: default_ttl(),
        }
    }
}

fn default_cookie_name() -> String {
    "servette_session".to_string()
}

fn default_cookie_max_age() -> u64 {
    // 1 week
    3600 * 24 * 7
}

fn default_ttl() -> u64 {
    default_cookie_max_age()
}
