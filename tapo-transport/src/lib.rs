//! Transport layer module for the Tapo camera protocol
//!
//! This crate provides the request model shared by the handshake and the
//! command channel, the [`Transport`] trait, and an HTTPS implementation.

pub mod https;
pub mod transport;

pub use https::{HttpsSettings, HttpsTransport, DEFAULT_TIMEOUT};
pub use transport::{ApiRequest, Endpoint, Transport, DEVICE_PORT, USER_AGENT};
