//! SOCKS5 front end
//!
//! The local relay speaks just enough SOCKS5 to learn the destination of a
//! CONNECT request, answers eagerly, and forwards the destination to the
//! server relay.

mod auth;
mod command;
mod consts;
mod forward;
mod types;

pub use auth::negotiate;
pub use command::{build_reply, parse_request, reply_code_for, send_eager_reply};
pub use consts::*;
pub use forward::{read_target, write_target, SubstitutedReader};
pub use types::TargetAddr;
