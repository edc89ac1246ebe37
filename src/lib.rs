//! # naivesocks - SOCKS5 tunnel with a home-grown key exchange
//!
//! naivesocks splits a SOCKS5 proxy into two relays. The **local** relay
//! accepts SOCKS5 clients; the **server** relay dials the destinations.
//! Between them, every connection first runs a key-exchange handshake built
//! on a small RSA-like primitive, then carries application bytes in
//! DES-ECB frames under the negotiated session key.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use naivesocks::config::load_config;
//! use naivesocks::tunnel::LocalRelay;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config("config.json")?;
//!     let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     LocalRelay::bind(&config).await?.run(shutdown_rx).await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! SOCKS5 Client -> Local relay == handshake + DES frames ==> Server relay -> Target
//! ```
//!
//! Everything exchanged before the session key exists (the destination
//! header and the handshake messages) is obscured by a byte substitution
//! table derived from the shared password.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod crypto;
pub mod error;
pub mod helper;
pub mod protocol;
pub mod relay;
pub mod socks;
pub mod transport;
pub mod tunnel;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use error::{CryptoError, NaiveSocksError, ProtocolError};
pub use tunnel::{LocalRelay, ServerRelay};

/// Version of the naivesocks library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
