//! Per-device session state
//!
//! A [`Session`] is owned by exactly one caller and is not synchronized.
//! Concurrent use of the same session must be serialized by the owner, for
//! example by keeping one session per camera connection or wrapping it in a
//! mutex or actor at integration time.

use std::fmt;
use tapo_security::SessionKeys;
use tapo_transport::Endpoint;

/// Values produced by a successful handshake, applied to the session at once
#[derive(Debug, Clone)]
pub(crate) struct Established {
    pub token: String,
    pub secure: bool,
    pub hashed_password: String,
    pub cnonce: String,
    pub nonce: String,
    pub keys: Option<SessionKeys>,
    pub start_seq: i64,
    pub user_group: Option<String>,
}

/// Session with one camera
///
/// # Invariants
/// - The session is authenticated iff the token is non-empty.
/// - Session keys are present iff the session runs in secure mode and a
///   secure handshake succeeded.
/// - The sequence counter only moves forward by one per secure request and is
///   only reset by a new successful handshake.
#[derive(Clone)]
pub struct Session {
    host: String,
    username: String,
    password: String,
    token: String,
    sequence: i64,
    start_seq: i64,
    cnonce: String,
    nonce: String,
    hashed_password: String,
    keys: Option<SessionKeys>,
    secure: bool,
    user_group: Option<String>,
}

impl Session {
    /// Create an unauthenticated session
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            token: String::new(),
            sequence: 0,
            start_seq: 0,
            cnonce: String::new(),
            nonce: String::new(),
            hashed_password: String::new(),
            keys: None,
            secure: false,
            user_group: None,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    /// Check if the session holds a token
    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    /// Current session token (empty when unauthenticated)
    pub fn session_token(&self) -> &str {
        &self.token
    }

    /// Check if the last successful handshake selected secure mode
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Sequence number the next secure request will carry
    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    /// Sequence number issued by the device at login
    pub fn start_seq(&self) -> i64 {
        self.start_seq
    }

    /// Take the current sequence number and advance the counter by one
    pub fn next_sequence(&mut self) -> i64 {
        let current = self.sequence;
        self.sequence += 1;
        current
    }

    pub fn client_nonce(&self) -> &str {
        &self.cnonce
    }

    pub fn server_nonce(&self) -> &str {
        &self.nonce
    }

    /// Password hash the device accepted
    pub fn hashed_password(&self) -> &str {
        &self.hashed_password
    }

    /// AES key material of a secure session
    pub fn keys(&self) -> Option<&SessionKeys> {
        self.keys.as_ref()
    }

    /// User group reported by the device at login, if any
    pub fn user_group(&self) -> Option<&str> {
        self.user_group.as_deref()
    }

    /// Base URL of the camera (`https://{host}:443`)
    pub fn base_url(&self) -> String {
        Endpoint::Login.url(&self.host).trim_end_matches('/').to_string()
    }

    /// Authenticated endpoint for the current token
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::Session(self.token.clone())
    }

    /// URL of the authenticated endpoint (`https://{host}:443/stok={token}/ds`)
    pub fn request_url(&self) -> String {
        self.endpoint().url(&self.host)
    }

    /// Drop the session token so the next command re-runs the handshake
    pub fn invalidate(&mut self) {
        self.token.clear();
    }

    pub(crate) fn establish(&mut self, established: Established) {
        self.token = established.token;
        self.secure = established.secure;
        self.hashed_password = established.hashed_password;
        self.cnonce = established.cnonce;
        self.nonce = established.nonce;
        self.keys = established.keys;
        self.sequence = established.start_seq;
        self.start_seq = established.start_seq;
        self.user_group = established.user_group;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("authenticated", &self.is_authenticated())
            .field("secure", &self.secure)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}
