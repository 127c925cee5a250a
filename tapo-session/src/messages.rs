//! Login request and response bodies

use serde::{Deserialize, Serialize};
use tapo_core::de::null_as_default;

/// Login method name
pub const LOGIN_METHOD: &str = "login";

/// `login` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub method: &'static str,
    pub params: LoginParams,
}

/// Parameters of a `login` request
///
/// Absent fields are omitted from the JSON body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoginParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypt_type: Option<String>,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest_passwd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl LoginRequest {
    fn with_params(params: LoginParams) -> Self {
        Self {
            method: LOGIN_METHOD,
            params,
        }
    }

    /// Mode detection probe: username and encrypt type only
    pub fn detect(username: &str, encrypt_type: &str) -> Self {
        Self::with_params(LoginParams {
            encrypt_type: Some(encrypt_type.to_string()),
            username: username.to_string(),
            ..Default::default()
        })
    }

    /// Legacy login with an MD5 password hash
    pub fn legacy(username: &str, hashed_password: &str) -> Self {
        Self::with_params(LoginParams {
            username: username.to_string(),
            hashed: Some(true),
            password: Some(hashed_password.to_string()),
            ..Default::default()
        })
    }

    /// Secure login phase 1: client nonce
    pub fn secure_nonce(username: &str, cnonce: &str, encrypt_type: &str) -> Self {
        Self::with_params(LoginParams {
            cnonce: Some(cnonce.to_string()),
            encrypt_type: Some(encrypt_type.to_string()),
            username: username.to_string(),
            ..Default::default()
        })
    }

    /// Secure login phase 3: password digest
    pub fn secure_digest(username: &str, cnonce: &str, encrypt_type: &str, digest: &str) -> Self {
        Self::with_params(LoginParams {
            cnonce: Some(cnonce.to_string()),
            encrypt_type: Some(encrypt_type.to_string()),
            username: username.to_string(),
            digest_passwd: Some(digest.to_string()),
            ..Default::default()
        })
    }
}

/// `login` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub error_code: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: LoginResult,
}

/// Result object of a `login` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoginResult {
    #[serde(default)]
    pub data: Option<LoginData>,
    #[serde(default)]
    pub stok: Option<String>,
    #[serde(default)]
    pub start_seq: Option<i64>,
    #[serde(default)]
    pub user_group: Option<String>,
}

/// Handshake data returned by the device during secure login
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoginData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub encrypt_type: Vec<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub device_confirm: Option<String>,
}

impl LoginResponse {
    /// Check if the response advertises support for an encrypt type
    pub fn supports_encrypt_type(&self, encrypt_type: &str) -> bool {
        self.result
            .data
            .as_ref()
            .is_some_and(|data| data.encrypt_type.iter().any(|t| t == encrypt_type))
    }

    /// Session token, if present and non-empty
    pub fn token(&self) -> Option<&str> {
        self.result.stok.as_deref().filter(|stok| !stok.is_empty())
    }
}
