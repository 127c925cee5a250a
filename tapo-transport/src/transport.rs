//! Request model and transport trait

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use tapo_core::TransportError;

/// HTTPS port the camera control API listens on
pub const DEVICE_PORT: u16 = 443;

/// Client identifier sent with every request
pub const USER_AGENT: &str = "Tapo CameraClient Android";

pub const HEADER_SEQ: &str = "Seq";
pub const HEADER_TAG: &str = "Tapo_tag";
pub const HEADER_ACCEPT_ENCODING: &str = "Accept-Encoding";

/// Target endpoint on the camera
#[derive(Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `https://{host}:443/`, used only by the login handshake
    Login,
    /// `https://{host}:443/stok={token}/ds`, used after authentication
    Session(String),
}

impl Endpoint {
    /// Build the full URL for this endpoint
    pub fn url(&self, host: &str) -> String {
        match self {
            Endpoint::Login => format!("https://{}:{}/", host, DEVICE_PORT),
            Endpoint::Session(token) => {
                format!("https://{}:{}/stok={}/ds", host, DEVICE_PORT, token)
            }
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Login => f.write_str("Login"),
            Endpoint::Session(_) => f.write_str("Session(<token>)"),
        }
    }
}

/// A single JSON POST to the camera
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    host: String,
    endpoint: Endpoint,
    headers: Vec<(&'static str, String)>,
    body: Bytes,
}

impl ApiRequest {
    /// Create a request carrying the fixed header set
    ///
    /// # Arguments
    /// * `host` - Camera host name or IP address
    /// * `endpoint` - Login or authenticated endpoint
    /// * `body` - Serialized JSON body
    pub fn new(host: &str, endpoint: Endpoint, body: impl Into<Bytes>) -> Self {
        Self {
            host: host.to_string(),
            endpoint,
            headers: default_headers(host),
            body: body.into(),
        }
    }

    /// Set a header, replacing any existing value of the same name
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
        self
    }

    /// Look up a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &[(&'static str, String)] {
        &self.headers
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn url(&self) -> String {
        self.endpoint.url(&self.host)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }
}

/// Fixed headers sent with every request
pub fn default_headers(host: &str) -> Vec<(&'static str, String)> {
    vec![
        ("Host", format!("{}:{}", host, DEVICE_PORT)),
        ("Referer", format!("https://{}", host)),
        ("Accept", "application/json".to_string()),
        (HEADER_ACCEPT_ENCODING, "gzip, deflate".to_string()),
        ("User-Agent", USER_AGENT.to_string()),
        ("Connection", "close".to_string()),
        ("requestByApp", "true".to_string()),
        ("Content-Type", "application/json; charset=UTF-8".to_string()),
    ]
}

/// Transport used to reach the camera
///
/// Implementations perform one POST per call and return the raw response
/// body. They never retry: a failure is returned to the caller immediately.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the response body
    ///
    /// # Errors
    /// Returns [`TransportError`] on connection failure, timeout, or if the
    /// response body cannot be read.
    async fn post(&self, request: ApiRequest) -> Result<Bytes, TransportError>;
}
