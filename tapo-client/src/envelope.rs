//! Request and response envelopes of the authenticated endpoint

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tapo_core::de::null_as_default;
use tapo_core::{Phase, TapoError, TapoResult};

/// Batch wrapper method
pub const MULTIPLE_REQUEST_METHOD: &str = "multipleRequest";

/// Encrypted envelope method
pub const SECURE_PASSTHROUGH_METHOD: &str = "securePassthrough";

/// One `{method, params}` entry of a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleRequest {
    pub method: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

/// `multipleRequest` batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultipleRequest {
    pub method: &'static str,
    pub params: MultipleParams,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultipleParams {
    pub requests: Vec<SingleRequest>,
}

impl MultipleRequest {
    /// Wrap a single command in a batch
    pub fn single(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: MULTIPLE_REQUEST_METHOD,
            params: MultipleParams {
                requests: vec![SingleRequest {
                    method: method.into(),
                    params,
                }],
            },
        }
    }
}

/// `securePassthrough` envelope carrying a base64 AES ciphertext
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurePassthrough {
    pub method: String,
    pub params: PassthroughParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassthroughParams {
    pub request: String,
}

impl SecurePassthrough {
    pub fn new(request: String) -> Self {
        Self {
            method: SECURE_PASSTHROUGH_METHOD.to_string(),
            params: PassthroughParams { request },
        }
    }
}

/// Plain response (also the decrypted inner response in secure mode)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub error_code: i32,
    #[serde(default)]
    pub result: Value,
}

/// Outer response to a `securePassthrough` request
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SecureResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub error_code: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: SecureResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SecureResult {
    /// Base64 AES ciphertext of the inner response
    #[serde(default, deserialize_with = "null_as_default")]
    pub response: String,
}

/// Result document of a `multipleRequest` batch
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BatchResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub responses: Vec<BatchEntry>,
}

/// Per-command entry of a batch result
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BatchEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub method: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub error_code: i32,
    #[serde(default)]
    pub result: Value,
}

/// Extract the result of the first command of a batch
///
/// # Errors
/// Returns [`TapoError::Device`] if the entry carries a non-zero status and
/// [`TapoError::MalformedResponse`] if the batch holds no entry.
pub fn first_response(batch: Value) -> TapoResult<Value> {
    let batch: BatchResult =
        serde_json::from_value(batch).map_err(|e| TapoError::serialization(Phase::Dispatch, e))?;
    let entry = batch
        .responses
        .into_iter()
        .next()
        .ok_or_else(|| TapoError::malformed(Phase::Dispatch, "empty batch response"))?;

    if entry.error_code != 0 {
        return Err(TapoError::device(Phase::Dispatch, entry.error_code));
    }
    Ok(entry.result)
}
