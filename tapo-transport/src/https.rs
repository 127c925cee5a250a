//! HTTPS transport implementation
//!
//! The camera presents a self-signed certificate, so certificate and host
//! name verification are disabled on this transport. This is a trust
//! boundary decision: a caller that needs to authenticate the device must
//! supply its own [`Transport`] with pinned trust.

use crate::transport::{ApiRequest, Transport, HEADER_ACCEPT_ENCODING};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tapo_core::TransportError;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTPS transport settings
#[derive(Debug, Clone)]
pub struct HttpsSettings {
    /// Whole-request timeout (connect, send and read)
    pub timeout: Duration,
}

impl HttpsSettings {
    /// Create new settings with the default timeout
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create settings with a custom timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpsSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTPS transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpsTransport {
    client: reqwest::Client,
    settings: HttpsSettings,
}

impl HttpsTransport {
    /// Create a new HTTPS transport
    ///
    /// # Errors
    /// Returns [`TransportError::Client`] if the TLS backend cannot be initialized.
    pub fn new(settings: HttpsSettings) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &HttpsSettings {
        &self.settings
    }
}

fn map_request_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

#[async_trait]
impl Transport for HttpsTransport {
    async fn post(&self, request: ApiRequest) -> Result<Bytes, TransportError> {
        log::debug!(
            "POST {:?} on {} ({} bytes)",
            request.endpoint(),
            request.host(),
            request.body().len()
        );

        let mut builder = self.client.post(request.url());
        for (name, value) in request.headers() {
            // reqwest negotiates and decodes gzip/deflate itself
            if name.eq_ignore_ascii_case(HEADER_ACCEPT_ENCODING) {
                continue;
            }
            builder = builder.header(*name, value.as_str());
        }

        let response = builder
            .body(request.into_body())
            .send()
            .await
            .map_err(map_request_error)?;

        log::debug!("Response status {}", response.status());

        response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Body(e.to_string())
            }
        })
    }
}
