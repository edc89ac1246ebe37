//! SOCKS5 request handling
//!
//! Parses CONNECT requests and builds replies.

mod parser;
mod reply;

pub use parser::parse_request;
pub use reply::{build_reply, reply_code_for, send_eager_reply};
