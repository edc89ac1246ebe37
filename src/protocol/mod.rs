//! Tunnel protocol
//!
//! Framing for handshake messages and relay frames, plus the key exchange
//! that runs between the local relay and the server relay before any
//! application bytes are forwarded.

mod codec;
mod handshake;
mod types;

pub use codec::{
    encode_frame, read_message, take_frame, write_message, FRAME_HEADER_LEN, MAX_FRAME_LEN,
};
pub use handshake::{initiate, recover_session_key, respond, Handshake, KeyRecovery};
pub use types::{HandshakeState, Role, ID_LEN, INITIATOR_ID, RESPONDER_ID, SEQ_UPPER_BOUND};
