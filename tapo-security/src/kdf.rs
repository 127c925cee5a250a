//! Secure login key derivation
//!
//! The secure handshake binds every derived value to the client nonce
//! (`cnonce`), the server nonce (`nonce`) and the password hash the device
//! accepted. All functions here are pure: identical inputs always produce
//! identical outputs.
//!
//! # Derived values
//! - device confirm: `SHA256(cnonce + hash + nonce) + nonce + cnonce`
//! - hashed key: `SHA256(cnonce + hash + nonce)`
//! - cipher key: first 16 bytes of `SHA256("lsk" + cnonce + nonce + hashed key)`
//! - cipher IV: first 16 bytes of `SHA256("ivb" + cnonce + nonce + hashed key)`
//! - digest password: `SHA256(hash + cnonce + nonce) + cnonce + nonce`
//! - request tag: `SHA256(SHA256(hash + cnonce) + request JSON + seq)`

use crate::aes_cbc::{self, KEY_SIZE};
use crate::hashing::{md5_hex, sha256_bytes, sha256_hex};
use std::fmt;
use tapo_core::CryptoError;

/// Password hash algorithm accepted by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordHash {
    Sha256,
    Md5,
}

impl PasswordHash {
    /// Candidates in the order they are tried during validation
    pub const CANDIDATES: [PasswordHash; 2] = [PasswordHash::Sha256, PasswordHash::Md5];

    /// Hash a password with this algorithm (uppercase hex)
    pub fn apply(&self, password: &str) -> String {
        match self {
            PasswordHash::Sha256 => sha256_hex(password),
            PasswordHash::Md5 => md5_hex(password),
        }
    }

    /// Pick the first candidate whose device confirm matches
    ///
    /// # Returns
    /// The algorithm and the resulting password hash, or `None` if neither
    /// candidate reproduces `device_confirm` (usually a wrong password).
    pub fn select(
        password: &str,
        cnonce: &str,
        nonce: &str,
        device_confirm: &str,
    ) -> Option<(PasswordHash, String)> {
        Self::CANDIDATES.iter().find_map(|algorithm| {
            let hashed = algorithm.apply(password);
            validate_device_confirm(cnonce, nonce, &hashed, device_confirm)
                .then_some((*algorithm, hashed))
        })
    }
}

/// Expected device confirm for a password hash
pub fn device_confirm(cnonce: &str, nonce: &str, hashed_password: &str) -> String {
    let mut confirm = sha256_hex(format!("{cnonce}{hashed_password}{nonce}"));
    confirm.push_str(nonce);
    confirm.push_str(cnonce);
    confirm
}

/// Check a device confirm value against a password hash
pub fn validate_device_confirm(
    cnonce: &str,
    nonce: &str,
    hashed_password: &str,
    confirm: &str,
) -> bool {
    device_confirm(cnonce, nonce, hashed_password) == confirm
}

/// `digest_passwd` value sent in secure login phase 3
pub fn digest_password(hashed_password: &str, cnonce: &str, nonce: &str) -> String {
    let mut digest = sha256_hex(format!("{hashed_password}{cnonce}{nonce}"));
    digest.push_str(cnonce);
    digest.push_str(nonce);
    digest
}

/// Integrity tag sent in the `Tapo_tag` header of a secure request
///
/// # Arguments
/// * `hashed_password` - Password hash accepted during the handshake
/// * `cnonce` - Client nonce of the handshake
/// * `request_json` - Exact serialized passthrough body being sent
/// * `seq` - Sequence number sent in the `Seq` header
pub fn request_tag(hashed_password: &str, cnonce: &str, request_json: &str, seq: i64) -> String {
    let tag_key = sha256_hex(format!("{hashed_password}{cnonce}"));
    sha256_hex(format!("{tag_key}{request_json}{seq}"))
}

/// Per-session AES key and IV
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKeys {
    key: [u8; KEY_SIZE],
    iv: [u8; KEY_SIZE],
}

impl SessionKeys {
    /// Derive the session key material
    ///
    /// # Arguments
    /// * `cnonce` - Client nonce
    /// * `nonce` - Server nonce
    /// * `hashed_password` - Password hash selected by device confirm validation
    pub fn derive(cnonce: &str, nonce: &str, hashed_password: &str) -> Self {
        let hashed_key = sha256_hex(format!("{cnonce}{hashed_password}{nonce}"));
        let lsk = sha256_bytes(format!("lsk{cnonce}{nonce}{hashed_key}"));
        let ivb = sha256_bytes(format!("ivb{cnonce}{nonce}{hashed_key}"));

        let mut key = [0u8; KEY_SIZE];
        let mut iv = [0u8; KEY_SIZE];
        key.copy_from_slice(&lsk[..KEY_SIZE]);
        iv.copy_from_slice(&ivb[..KEY_SIZE]);
        Self { key, iv }
    }

    /// Build session keys from raw parts
    ///
    /// # Errors
    /// Returns [`CryptoError::InvalidKeyMaterial`] unless both parts are 16 bytes.
    pub fn from_parts(key: &[u8], iv: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_SIZE] = key.try_into().map_err(|_| CryptoError::InvalidKeyMaterial {
            what: "key",
            len: key.len(),
        })?;
        let iv: [u8; KEY_SIZE] = iv.try_into().map_err(|_| CryptoError::InvalidKeyMaterial {
            what: "IV",
            len: iv.len(),
        })?;
        Ok(Self { key, iv })
    }

    pub fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    pub fn iv(&self) -> &[u8; KEY_SIZE] {
        &self.iv
    }

    /// Encrypt a plaintext envelope with these keys
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        aes_cbc::encrypt(plaintext, &self.key, &self.iv)
    }

    /// Decrypt a ciphertext envelope with these keys
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        aes_cbc::decrypt(ciphertext, &self.key, &self.iv)
    }
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys")
            .field("key", &"<redacted>")
            .field("iv", &"<redacted>")
            .finish()
    }
}
