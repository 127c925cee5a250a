//! Security module for the Tapo camera protocol
//!
//! This crate provides the hash primitives and nonce generation used by the
//! login handshake, the AES-128-CBC envelope cipher, and the derivation of
//! the per-session key material.

pub mod aes_cbc;
pub mod hashing;
pub mod kdf;

pub use aes_cbc::{decrypt, encrypt, pkcs7_pad, pkcs7_unpad, BLOCK_SIZE, KEY_SIZE};
pub use hashing::{generate_nonce, md5_hex, sha256_bytes, sha256_hex, NONCE_FALLBACK};
pub use kdf::{PasswordHash, SessionKeys};
