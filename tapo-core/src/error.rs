use crate::status::DeviceStatus;
use std::fmt;
use thiserror::Error;

/// Protocol phase that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Secure/legacy mode detection probe
    Detection,
    /// Legacy MD5 login
    LegacyLogin,
    /// Secure login phase 1 (nonce exchange)
    SecurePhase1,
    /// Secure login phase 2 (device confirm validation, key derivation)
    SecurePhase2,
    /// Secure login phase 3 (digest submission)
    SecurePhase3,
    /// Command dispatch to the authenticated endpoint
    Dispatch,
    /// Decoding and decryption of a secure response
    Decrypt,
}

impl Phase {
    /// Check if this phase belongs to the login handshake
    pub fn is_handshake(&self) -> bool {
        !matches!(self, Phase::Dispatch | Phase::Decrypt)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Detection => "mode detection",
            Phase::LegacyLogin => "legacy login",
            Phase::SecurePhase1 => "secure login phase 1",
            Phase::SecurePhase2 => "secure login phase 2",
            Phase::SecurePhase3 => "secure login phase 3",
            Phase::Dispatch => "dispatch",
            Phase::Decrypt => "decrypt",
        };
        f.write_str(name)
    }
}

/// Cryptographic failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid {what} length: expected 16 bytes, got {len}")]
    InvalidKeyMaterial { what: &'static str, len: usize },

    #[error("Ciphertext length {0} is not a multiple of the 16-byte block size")]
    InvalidCiphertextLength(usize),

    #[error("Invalid PKCS7 padding")]
    InvalidPadding,
}

/// Failure of the HTTP transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to read response: {0}")]
    Body(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Main error type for camera protocol operations
#[derive(Error, Debug)]
pub enum TapoError {
    #[error("{phase}: transport error: {source}")]
    Transport {
        phase: Phase,
        #[source]
        source: TransportError,
    },

    #[error("{phase}: serialization error: {source}")]
    Serialization {
        phase: Phase,
        #[source]
        source: serde_json::Error,
    },

    #[error("{phase}: device error {}: {}", .status.code(), .status.message())]
    Device { phase: Phase, status: DeviceStatus },

    #[error("{phase}: authentication failed: {reason}")]
    AuthenticationFailed { phase: Phase, reason: String },

    #[error("{phase}: malformed response: {reason}")]
    MalformedResponse { phase: Phase, reason: String },

    #[error("{phase}: {source}")]
    Crypto {
        phase: Phase,
        #[source]
        source: CryptoError,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TapoError {
    pub fn transport(phase: Phase, source: TransportError) -> Self {
        TapoError::Transport { phase, source }
    }

    pub fn serialization(phase: Phase, source: serde_json::Error) -> Self {
        TapoError::Serialization { phase, source }
    }

    /// Build a device error from a raw, non-zero status code
    pub fn device(phase: Phase, code: i32) -> Self {
        TapoError::Device {
            phase,
            status: DeviceStatus::from_code(code),
        }
    }

    pub fn crypto(phase: Phase, source: CryptoError) -> Self {
        TapoError::Crypto { phase, source }
    }

    pub fn malformed(phase: Phase, reason: impl Into<String>) -> Self {
        TapoError::MalformedResponse {
            phase,
            reason: reason.into(),
        }
    }

    /// Phase that produced this error, if any
    pub fn phase(&self) -> Option<Phase> {
        match self {
            TapoError::Transport { phase, .. }
            | TapoError::Serialization { phase, .. }
            | TapoError::Device { phase, .. }
            | TapoError::AuthenticationFailed { phase, .. }
            | TapoError::MalformedResponse { phase, .. }
            | TapoError::Crypto { phase, .. } => Some(*phase),
            TapoError::InvalidConfig(_) => None,
        }
    }

    /// Device status carried by this error, if it came from the camera
    pub fn device_status(&self) -> Option<DeviceStatus> {
        match self {
            TapoError::Device { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw device status code carried by this error
    pub fn device_code(&self) -> Option<i32> {
        self.device_status().map(|status| status.code())
    }

    /// Check if the device reported the session token as invalid or expired
    pub fn is_session_expired(&self) -> bool {
        self.device_status()
            .is_some_and(|status| status.is_invalid_token())
    }
}

/// Result type alias for camera protocol operations
pub type TapoResult<T> = Result<T, TapoError>;
