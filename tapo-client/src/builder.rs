//! Channel builder
//!
//! ```rust,no_run
//! use tapo_client::ClientBuilder;
//!
//! # async fn run() -> tapo_core::TapoResult<()> {
//! let mut channel = ClientBuilder::new()
//!     .host("192.168.1.100")
//!     .credentials("admin", "password")
//!     .build()?;
//! channel.authenticate().await?;
//! # Ok(())
//! # }
//! ```

use crate::channel::SecureChannel;
use crate::config::{ClientConfig, DEFAULT_TIMEOUT};
use std::time::Duration;
use tapo_core::{TapoError, TapoResult};
use tapo_session::Session;
use tapo_transport::{HttpsSettings, HttpsTransport, Transport};

/// Builder for [`SecureChannel`]
///
/// Host and username are required. Without an explicit transport, the
/// channel talks HTTPS through [`HttpsTransport`] with the configured timeout.
pub struct ClientBuilder {
    host: Option<String>,
    username: Option<String>,
    password: String,
    timeout: Duration,
    transport: Option<Box<dyn Transport>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            host: None,
            username: None,
            password: String::new(),
            timeout: DEFAULT_TIMEOUT,
            transport: None,
        }
    }

    /// Camera host name or IP address (port 443 is implied)
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = password.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Take host, credentials and timeout from a configuration
    pub fn config(self, config: ClientConfig) -> Self {
        self.host(config.host)
            .credentials(config.username, config.password)
            .timeout(config.timeout)
    }

    /// Use a custom transport instead of the default HTTPS one
    ///
    /// The timeout setting does not apply to a custom transport.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Build the channel
    ///
    /// No request is sent; the handshake runs on the first command or on an
    /// explicit [`SecureChannel::authenticate`].
    ///
    /// # Errors
    /// Returns [`TapoError::InvalidConfig`] if a required setting is missing
    /// or the HTTPS client cannot be created.
    pub fn build(self) -> TapoResult<SecureChannel> {
        let host = self
            .host
            .ok_or_else(|| TapoError::InvalidConfig("host is required".to_string()))?;
        let username = self
            .username
            .ok_or_else(|| TapoError::InvalidConfig("credentials are required".to_string()))?;

        let config = ClientConfig::new(host, username, self.password).with_timeout(self.timeout);
        config.validate()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let https = HttpsTransport::new(HttpsSettings::with_timeout(config.timeout))
                    .map_err(|e| TapoError::InvalidConfig(e.to_string()))?;
                Box::new(https) as Box<dyn Transport>
            }
        };

        log::debug!("Building channel for {}", config.host);
        let session = Session::new(config.host, config.username, config.password);
        Ok(SecureChannel::new(session, transport))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
