//! tapo_rs - Rust client for the Tapo IP camera control protocol
//!
//! This library authenticates against a Tapo camera's HTTPS control API,
//! negotiating between the legacy (MD5, unencrypted) and the secure
//! (SHA-256, AES-128-CBC) login, and sends commands over the resulting
//! session.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `tapo-core`: Error enumeration and device status taxonomy
//! - `tapo-security`: Hashes, nonces, AES-128-CBC, session key derivation
//! - `tapo-transport`: Request model, `Transport` trait, HTTPS transport
//! - `tapo-session`: Session state and the login handshake
//! - `tapo-client`: Command channel, builder, configuration, command catalogue
//!
//! # Usage
//!
//! ```no_run
//! use tapo::client::{ClientBuilder, Command};
//!
//! # async fn run() -> tapo::TapoResult<()> {
//! let mut channel = ClientBuilder::new()
//!     .host("192.168.1.100")
//!     .credentials("admin", "password")
//!     .build()?;
//! channel.send(&Command::set_led_status(false)).await?;
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use tapo_core::{DeviceStatus, Phase, TapoError, TapoResult};

// Re-export the most used entry points
pub use tapo_client::{ClientBuilder, ClientConfig, Command, SecureChannel};
pub use tapo_session::Session;

// Re-export client API
pub mod client {
    pub use tapo_client::*;
}

// Re-export session layer
pub mod session {
    pub use tapo_session::*;
}

// Re-export transport layer
pub mod transport {
    pub use tapo_transport::*;
}

// Re-export crypto primitives
pub mod security {
    pub use tapo_security::*;
}
