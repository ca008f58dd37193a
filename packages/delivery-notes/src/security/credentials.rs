//! Credential handling with secure memory.
//!
//! Uses the `secrecy` crate so the API key never ends up in logs, debug
//! output or error messages.

use std::fmt;

use secrecy::{ExposeSecret, SecretBox};

use crate::error::{ExtractionError, Result};

/// A secret string that won't be logged or displayed.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::from(value.into().as_str())))
    }

    /// Expose the secret value for use.
    ///
    /// Only call this when actually using the secret (e.g., in an API request).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_string())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Credentials for the model provider.
#[derive(Clone)]
pub struct ApiCredentials {
    pub api_key: SecretString,

    /// Endpoint override (proxies, compatible providers)
    pub base_url: Option<String>,
}

impl ApiCredentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Read `OPENAI_API_KEY` and the optional `OPENAI_BASE_URL`.
    ///
    /// A missing or blank key is a configuration error, reported before
    /// any document is touched.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let key = lookup("OPENAI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ExtractionError::Config("OPENAI_API_KEY not set".into()))?;

        let credentials = Self::new(key.trim());
        Ok(match lookup("OPENAI_BASE_URL").filter(|u| !u.trim().is_empty()) {
            Some(url) => credentials.with_base_url(url),
            None => credentials,
        })
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}
