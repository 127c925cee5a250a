//! Device status taxonomy
//!
//! Every response from the camera carries a numeric `error_code`. Zero means
//! success; the known negative codes are mapped to fixed human-readable
//! messages. Codes outside the table are kept as [`DeviceStatus::Unknown`] so
//! callers can still branch on the original value.

use std::fmt;

/// Classified device status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceStatus {
    /// Request succeeded (`0`)
    Success,
    /// Session token is invalid or expired (`-40401`)
    InvalidToken,
    /// Too many attempts, the device suspended access temporarily (`-40404`)
    RateLimited,
    /// Authentication data was rejected (`-40411`)
    InvalidAuth,
    /// Login required; returned by the mode detection probe (`-40413`)
    LoginRequired,
    /// A PTZ cruise is running and blocks the operation (`-64303`)
    CruiseInProgress,
    /// Generic failure (`-1`)
    General,
    /// Any code not in the table
    Unknown(i32),
}

impl DeviceStatus {
    pub const SUCCESS: i32 = 0;
    pub const INVALID_TOKEN: i32 = -40401;
    pub const RATE_LIMITED: i32 = -40404;
    pub const INVALID_AUTH: i32 = -40411;
    pub const LOGIN_REQUIRED: i32 = -40413;
    pub const CRUISE_IN_PROGRESS: i32 = -64303;
    pub const GENERAL: i32 = -1;

    /// Classify a raw status code
    pub fn from_code(code: i32) -> Self {
        match code {
            Self::SUCCESS => DeviceStatus::Success,
            Self::INVALID_TOKEN => DeviceStatus::InvalidToken,
            Self::RATE_LIMITED => DeviceStatus::RateLimited,
            Self::INVALID_AUTH => DeviceStatus::InvalidAuth,
            Self::LOGIN_REQUIRED => DeviceStatus::LoginRequired,
            Self::CRUISE_IN_PROGRESS => DeviceStatus::CruiseInProgress,
            Self::GENERAL => DeviceStatus::General,
            other => DeviceStatus::Unknown(other),
        }
    }

    /// Get the raw status code
    pub fn code(&self) -> i32 {
        match self {
            DeviceStatus::Success => Self::SUCCESS,
            DeviceStatus::InvalidToken => Self::INVALID_TOKEN,
            DeviceStatus::RateLimited => Self::RATE_LIMITED,
            DeviceStatus::InvalidAuth => Self::INVALID_AUTH,
            DeviceStatus::LoginRequired => Self::LOGIN_REQUIRED,
            DeviceStatus::CruiseInProgress => Self::CRUISE_IN_PROGRESS,
            DeviceStatus::General => Self::GENERAL,
            DeviceStatus::Unknown(code) => *code,
        }
    }

    /// Get the fixed human-readable message for this status
    pub fn message(&self) -> &'static str {
        match self {
            DeviceStatus::Success => "Success",
            DeviceStatus::InvalidToken => "Invalid or expired token",
            DeviceStatus::RateLimited => "Rate limited - temporary suspension",
            DeviceStatus::InvalidAuth => "Invalid authentication data",
            DeviceStatus::LoginRequired => "Login required",
            DeviceStatus::CruiseInProgress => "Cruise in progress - stop cruise first",
            DeviceStatus::General => "General error",
            DeviceStatus::Unknown(_) => "Unknown error",
        }
    }

    /// Check if this status is success
    pub fn is_success(&self) -> bool {
        matches!(self, DeviceStatus::Success)
    }

    /// Check if this status means the session token must be discarded
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, DeviceStatus::InvalidToken)
    }
}

impl From<i32> for DeviceStatus {
    fn from(code: i32) -> Self {
        Self::from_code(code)
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}
