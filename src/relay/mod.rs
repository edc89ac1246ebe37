//! Relay engine
//!
//! Once the handshake produced a [`SessionCipher`](crate::crypto::SessionCipher),
//! the relay carries application bytes between the two streams of a
//! connection, sealing one direction and opening the other.

mod connection;
mod engine;

pub use connection::Connection;
pub use engine::{run, RelayStats};
