//! Session layer module for the Tapo camera protocol
//!
//! This crate owns the per-device [`Session`] state and the login handshake
//! ([`SessionProtocol`]) that fills it in.
//!
//! # Handshake
//!
//! ```text
//! Unauthenticated -> DetectingMode -> LegacyLogin ----------------------------> Authenticated
//!                                  \-> SecurePhase1 -> SecurePhase2 -> SecurePhase3 -/
//! ```
//!
//! Any failure returns to `Unauthenticated`. Values computed during a failed
//! attempt (nonces, password hash, keys) are discarded and never written to
//! the session.

pub mod handshake;
pub mod messages;
pub mod session;

pub use handshake::{HandshakeState, SessionProtocol, SECURE_ENCRYPT_TYPE};
pub use messages::{LoginData, LoginParams, LoginRequest, LoginResponse, LoginResult};
pub use session::Session;
