//! API credential brokers.
//!
//! The animation step asks the broker whether a key has been selected and,
//! if not, asks it to select one before the first video request.

use crate::error::{PosterError, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// Environment variables consulted by [`EnvCredentials`], in order.
pub const API_KEY_ENV_VARS: [&str; 3] = ["GOOGLE_API_KEY", "GEMINI_API_KEY", "API_KEY"];

/// Source of the API key used for generation calls.
#[async_trait]
pub trait CredentialBroker: Send + Sync {
    /// Returns true when a key is available without user interaction.
    async fn has_selected_key(&self) -> bool;

    /// Makes a key available, prompting or resolving as needed.
    async fn select_key(&self) -> Result<()>;

    /// Returns the selected key, used to build the providers.
    fn api_key(&self) -> Option<String>;
}

/// A fixed key supplied by the caller.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    key: String,
}

impl StaticCredentials {
    /// Wraps an explicit key.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait]
impl CredentialBroker for StaticCredentials {
    async fn has_selected_key(&self) -> bool {
        !self.key.is_empty()
    }

    async fn select_key(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(PosterError::Auth("empty API key".into()));
        }
        Ok(())
    }

    fn api_key(&self) -> Option<String> {
        (!self.key.is_empty()).then(|| self.key.clone())
    }
}

/// Resolves the key from a configured fallback and the environment.
///
/// The configured key wins; otherwise the first set variable of
/// [`API_KEY_ENV_VARS`] is used. Resolution happens lazily in `select_key`.
#[derive(Debug, Default)]
pub struct EnvCredentials {
    configured: Option<String>,
    selected: Mutex<Option<String>>,
}

impl EnvCredentials {
    /// Creates a broker with an optional key from the settings file.
    pub fn new(configured: Option<String>) -> Self {
        let configured = configured.filter(|k| !k.trim().is_empty());
        Self {
            selected: Mutex::new(configured.clone()),
            configured,
        }
    }

    fn resolve(&self) -> Option<String> {
        self.configured.clone().or_else(|| {
            API_KEY_ENV_VARS
                .iter()
                .filter_map(|name| std::env::var(name).ok())
                .find(|v| !v.trim().is_empty())
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.selected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CredentialBroker for EnvCredentials {
    async fn has_selected_key(&self) -> bool {
        self.lock().is_some()
    }

    async fn select_key(&self) -> Result<()> {
        let key = self.resolve().ok_or_else(|| {
            PosterError::Auth(format!(
                "no API key configured; set one of {}",
                API_KEY_ENV_VARS.join(", ")
            ))
        })?;
        tracing::debug!("API key selected");
        *self.lock() = Some(key);
        Ok(())
    }

    fn api_key(&self) -> Option<String> {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_credentials() {
        let creds = StaticCredentials::new("abc");
        assert!(creds.has_selected_key().await);
        assert!(creds.select_key().await.is_ok());
        assert_eq!(creds.api_key().as_deref(), Some("abc"));

        let empty = StaticCredentials::new("");
        assert!(!empty.has_selected_key().await);
        assert!(matches!(empty.select_key().await, Err(PosterError::Auth(_))));
        assert_eq!(empty.api_key(), None);
    }

    #[tokio::test]
    async fn test_env_credentials_prefers_configured_key() {
        let creds = EnvCredentials::new(Some("from-config".into()));
        assert!(creds.has_selected_key().await);
        creds.select_key().await.unwrap();
        assert_eq!(creds.api_key().as_deref(), Some("from-config"));
    }

    #[tokio::test]
    async fn test_env_credentials_blank_config_is_unselected() {
        let creds = EnvCredentials::new(Some("   ".into()));
        assert!(!creds.has_selected_key().await);
    }
}
