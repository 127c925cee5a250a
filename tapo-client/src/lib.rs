//! Tapo camera client
//!
//! This crate provides the authenticated command channel on top of the
//! session layer: plain and encrypted request framing, sequence numbering,
//! token expiry handling, the camera command catalogue and a builder.
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use tapo_client::{ClientBuilder, Command, first_response};
//!
//! # async fn run() -> tapo_core::TapoResult<()> {
//! let mut channel = ClientBuilder::new()
//!     .host("192.168.1.100")
//!     .credentials("admin", "password")
//!     .build()?;
//!
//! let batch = channel.send(&Command::get_device_info()).await?;
//! let info = first_response(batch)?;
//! println!("{}", info);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod channel;
pub mod commands;
pub mod config;
pub mod envelope;

pub use builder::ClientBuilder;
pub use channel::SecureChannel;
pub use commands::Command;
pub use config::{ClientConfig, DEFAULT_TIMEOUT};
pub use envelope::{first_response, BatchEntry, BatchResult};
