//! Hash primitives and nonce generation
//!
//! All hex output is uppercase, which is what the camera compares against.

use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

/// Nonce returned when the system entropy source fails
///
/// This is a weak fallback kept for compatibility with the device firmware
/// expectations: the handshake still proceeds, but the client nonce is then
/// predictable. A warning is logged whenever it is used.
pub const NONCE_FALLBACK: &str = "ABCD1234";

/// Length of a generated client nonce in hex characters
pub const NONCE_LENGTH: usize = 8;

/// MD5 digest as 32 uppercase hex characters
pub fn md5_hex(data: impl AsRef<[u8]>) -> String {
    format!("{:X}", md5::compute(data.as_ref()))
}

/// SHA-256 digest as 64 uppercase hex characters
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode_upper(Sha256::digest(data.as_ref()))
}

/// Raw SHA-256 digest
pub fn sha256_bytes(data: impl AsRef<[u8]>) -> [u8; 32] {
    let digest = Sha256::digest(data.as_ref());
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Generate a client nonce
///
/// # Returns
/// 8 uppercase hex characters built from 4 random bytes, or
/// [`NONCE_FALLBACK`] if the entropy source is unavailable.
pub fn generate_nonce() -> String {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; NONCE_LENGTH / 2];
    match rng.fill(&mut bytes) {
        Ok(()) => hex::encode_upper(bytes),
        Err(_) => {
            log::warn!("System entropy source failed, using fixed fallback client nonce");
            NONCE_FALLBACK.to_string()
        }
    }
}
