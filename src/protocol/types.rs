//! Handshake type definitions
//!
//! Identity tags and sequence bounds must match the peer implementation.

use std::fmt;

/// Identity tag appended by the initiating (local) relay
pub const INITIATOR_ID: &str = "2017013684";

/// Identity tag appended by the responding (server) relay
pub const RESPONDER_ID: &str = "2017011303";

/// Width of both identity tags
pub const ID_LEN: usize = 10;

/// Exclusive upper bound of the initiator's sequence number
pub const SEQ_UPPER_BOUND: u32 = 10_000;

/// Which side of the handshake a relay plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Local relay: dials the server and proposes the session key
    Initiator,
    /// Server relay: accepts the tunnel and recovers the session key
    Responder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => write!(f, "initiator"),
            Role::Responder => write!(f, "responder"),
        }
    }
}

/// Progress of one handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Nothing exchanged yet
    Start,
    /// Our public key is on the wire
    SentPublicKey,
    /// The peer's public key was received and validated
    ReceivedPublicKey,
    /// Initiator: identity challenge sent
    SentIdentity,
    /// Identity exchange checked out on this side
    VerifiedIdentity,
    /// Both sides hold the session key
    KeyEstablished,
    /// Terminal failure
    Aborted,
}

impl HandshakeState {
    /// Whether no further transitions are possible
    pub fn is_terminal(self) -> bool {
        matches!(self, HandshakeState::KeyEstablished | HandshakeState::Aborted)
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandshakeState::Start => "START",
            HandshakeState::SentPublicKey => "SENT_PUBKEY",
            HandshakeState::ReceivedPublicKey => "RECEIVED_PUBKEY",
            HandshakeState::SentIdentity => "SENT_IDENTITY",
            HandshakeState::VerifiedIdentity => "VERIFIED_IDENTITY",
            HandshakeState::KeyEstablished => "KEY_ESTABLISHED",
            HandshakeState::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_tags() {
        assert_eq!(INITIATOR_ID.len(), ID_LEN);
        assert_eq!(RESPONDER_ID.len(), ID_LEN);
        assert!(INITIATOR_ID.bytes().all(|b| b.is_ascii_digit()));
        assert!(RESPONDER_ID.bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn test_terminal_states() {
        assert!(HandshakeState::KeyEstablished.is_terminal());
        assert!(HandshakeState::Aborted.is_terminal());
        assert!(!HandshakeState::Start.is_terminal());
        assert!(!HandshakeState::VerifiedIdentity.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(HandshakeState::SentPublicKey.to_string(), "SENT_PUBKEY");
        assert_eq!(Role::Responder.to_string(), "responder");
    }
}
