//! Core types and utilities for the Tapo camera control protocol
//!
//! This crate provides the error enumeration shared by every layer of the
//! client and the device status taxonomy used to classify the numeric
//! `error_code` values returned by the camera.

pub mod de;
pub mod error;
pub mod status;

pub use error::{CryptoError, Phase, TapoError, TapoResult, TransportError};
pub use status::DeviceStatus;
