//! Client configuration

use std::fmt;
use std::time::Duration;
use tapo_core::{TapoError, TapoResult};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = tapo_transport::DEFAULT_TIMEOUT;

/// Environment variable holding the camera account name
pub const ENV_USERNAME: &str = "TAPO_DEFAULT_USERNAME";
/// Environment variable holding the camera account password
pub const ENV_PASSWORD: &str = "TAPO_DEFAULT_PASSWORD";
/// Environment variable overriding the request timeout, in whole seconds
pub const ENV_TIMEOUT_SECS: &str = "TAPO_TIMEOUT_SECS";

/// Connection parameters for one camera
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    /// Whole-request timeout applied to every POST
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration with the default timeout
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read the default credentials from the process environment
    ///
    /// # Errors
    /// Returns [`TapoError::InvalidConfig`] if a credential is missing or the
    /// timeout override is not a positive number of seconds.
    pub fn from_env(host: impl Into<String>) -> TapoResult<Self> {
        Self::from_lookup(host, |key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source
    pub fn from_lookup<F>(host: impl Into<String>, lookup: F) -> TapoResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| TapoError::InvalidConfig(format!("{} is not set", key)))
        };
        let username = required(ENV_USERNAME)?;
        let password = required(ENV_PASSWORD)?;

        let timeout = match lookup(ENV_TIMEOUT_SECS).filter(|value| !value.is_empty()) {
            None => DEFAULT_TIMEOUT,
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(TapoError::InvalidConfig(format!(
                        "{} must be a positive number of seconds, got {:?}",
                        ENV_TIMEOUT_SECS, value
                    )));
                }
            },
        };

        Ok(Self::new(host, username, password).with_timeout(timeout))
    }

    /// Check that the configuration can reach a camera
    pub fn validate(&self) -> TapoResult<()> {
        if self.host.trim().is_empty() {
            return Err(TapoError::InvalidConfig("host is empty".to_string()));
        }
        if self.username.is_empty() {
            return Err(TapoError::InvalidConfig("username is empty".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(TapoError::InvalidConfig("timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}
