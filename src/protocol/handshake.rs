//! Session key exchange between the two relays
//!
//! Every message travels as a substituted frame (see [`super::codec`]).
//!
//! ```text
//! Initiator                                   Responder
//!   | -- "e_I-n_I" --------------------------> |
//!   | <------------------------- "e_R-n_R" --- |
//!   | -- enc_R(seq ‖ INITIATOR_ID) ----------> |  checks the tag
//!   | <--------- enc_I(seq+1 ‖ RESPONDER_ID) - |
//!   | -- enc_R(sign_I(session key)) ---------> |  recovers the key
//! ```
//!
//! The responder never aborts on a key it cannot recover: it falls back to
//! [`FALLBACK_SESSION_KEY`](crate::crypto::FALLBACK_SESSION_KEY) through
//! [`KeyRecovery::Degraded`]. Transport failures still abort.

use super::codec::{read_message, write_message};
use super::types::{
    HandshakeState, Role, ID_LEN, INITIATOR_ID, RESPONDER_ID, SEQ_UPPER_BOUND,
};
use crate::crypto::{bitcodec, KeyPair, PublicKey, SessionCipher, SessionKey, SubstitutionCipher};
use crate::error::{CryptoError, ProtocolError, Result};
use rand::Rng;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, trace, warn};

/// Outcome of the responder's session key recovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRecovery {
    /// The key was opened and its signature checked out
    Recovered(SessionKey),
    /// Recovery failed; the fixed fallback key is used instead
    Degraded(CryptoError),
}

impl KeyRecovery {
    /// The key to use for the relay
    pub fn into_key(self) -> SessionKey {
        match self {
            KeyRecovery::Recovered(key) => key,
            KeyRecovery::Degraded(cause) => {
                warn!(
                    "Session key recovery failed ({}), falling back to the default key",
                    cause
                );
                SessionKey::fallback()
            }
        }
    }

    /// Whether the fallback path was taken
    pub fn is_degraded(&self) -> bool {
        matches!(self, KeyRecovery::Degraded(_))
    }
}

/// Open a sign-then-encrypt session key message
///
/// Undoes the encryption layer with our private key, then the signature
/// layer with the peer's public key.
pub fn recover_session_key(message: &[u8], own: &KeyPair, peer: &PublicKey) -> KeyRecovery {
    match open_session_key(message, own, peer) {
        Ok(key) => KeyRecovery::Recovered(key),
        Err(cause) => KeyRecovery::Degraded(cause),
    }
}

fn open_session_key(
    message: &[u8],
    own: &KeyPair,
    peer: &PublicKey,
) -> std::result::Result<SessionKey, CryptoError> {
    let sealed = std::str::from_utf8(message)
        .map_err(|_| CryptoError::MalformedBits("session key message is not text".to_string()))?;
    let signed = bitcodec::decode(sealed.trim(), own.d(), own.n(), own.k())?;
    let signed = String::from_utf8(signed)
        .map_err(|_| CryptoError::MalformedBits("signed session key is not text".to_string()))?;
    let key = bitcodec::decode(&signed, &peer.e, &peer.n, own.k())?;
    SessionKey::from_bytes(&key)
}

/// Split `"{seq}{tag}"` into its sequence and identity parts
fn split_identity(message: &str) -> std::result::Result<(&str, &str), ProtocolError> {
    let at = message
        .len()
        .checked_sub(ID_LEN)
        .filter(|&at| message.is_char_boundary(at))
        .ok_or_else(|| ProtocolError::MalformedMessage(format!("identity {:?}", message)))?;
    Ok(message.split_at(at))
}

/// One side of a key exchange
///
/// Owns a fresh [`KeyPair`] for the lifetime of the exchange. The state is
/// kept so that the outcome can be inspected after [`run`](Self::run).
#[derive(Debug)]
pub struct Handshake<'a> {
    role: Role,
    table: &'a SubstitutionCipher,
    keypair: KeyPair,
    state: HandshakeState,
}

impl<'a> Handshake<'a> {
    /// Create a handshake with a freshly generated key pair
    pub fn new(role: Role, table: &'a SubstitutionCipher) -> Result<Self> {
        let keypair = KeyPair::generate_default()?;
        Ok(Self::with_keypair(role, table, keypair))
    }

    /// Create a handshake around an existing key pair
    pub fn with_keypair(role: Role, table: &'a SubstitutionCipher, keypair: KeyPair) -> Self {
        Handshake {
            role,
            table,
            keypair,
            state: HandshakeState::Start,
        }
    }

    /// Role played by this side
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current state
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    fn advance(&mut self, next: HandshakeState) {
        trace!("{} handshake {} -> {}", self.role, self.state, next);
        self.state = next;
    }

    /// Run the exchange to completion over `stream`
    ///
    /// On success the state is `KeyEstablished`; on any failure it is
    /// `Aborted` and no cipher is returned.
    pub async fn run<S>(&mut self, stream: &mut S) -> Result<SessionCipher>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let result = match self.role {
            Role::Initiator => self.initiate(stream).await,
            Role::Responder => self.respond(stream).await,
        };

        match &result {
            Ok(_) => self.advance(HandshakeState::KeyEstablished),
            Err(e) => {
                debug!("{} handshake aborted in {}: {}", self.role, self.state, e);
                self.advance(HandshakeState::Aborted);
            }
        }

        result
    }

    async fn initiate<S>(&mut self, stream: &mut S) -> Result<SessionCipher>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let k = self.keypair.k();

        self.send_public_key(stream).await?;
        self.advance(HandshakeState::SentPublicKey);

        let peer = self.read_public_key(stream).await?;
        debug!("Initiator received public key {}", peer);
        self.advance(HandshakeState::ReceivedPublicKey);

        let seq: u32 = rand::thread_rng().gen_range(0..SEQ_UPPER_BOUND);
        let challenge = format!("{}{}", seq, INITIATOR_ID);
        let sealed = bitcodec::encode(challenge.as_bytes(), &peer.e, &peer.n, k)?;
        write_message(stream, self.table, sealed.as_bytes()).await?;
        self.advance(HandshakeState::SentIdentity);

        let response = self.read_sealed(stream).await?;
        let (seq_field, tag) = split_identity(&response)?;
        let expected = seq + 1;
        if seq_field != expected.to_string() {
            return Err(ProtocolError::UnknownSequence {
                expected,
                got: seq_field.to_string(),
            }
            .into());
        }
        if tag != RESPONDER_ID {
            return Err(ProtocolError::UnknownPartner(tag.to_string()).into());
        }
        self.advance(HandshakeState::VerifiedIdentity);

        let key = SessionKey::random();
        let signed = bitcodec::encode(key.as_bytes(), self.keypair.d(), self.keypair.n(), k)?;
        let sealed = bitcodec::encode(signed.as_bytes(), &peer.e, &peer.n, k)?;
        write_message(stream, self.table, sealed.as_bytes()).await?;

        debug!("Initiator key exchange complete");
        Ok(SessionCipher::new(key))
    }

    async fn respond<S>(&mut self, stream: &mut S) -> Result<SessionCipher>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let k = self.keypair.k();

        let peer = self.read_public_key(stream).await?;
        debug!("Responder received public key {}", peer);
        self.advance(HandshakeState::ReceivedPublicKey);

        self.send_public_key(stream).await?;
        self.advance(HandshakeState::SentPublicKey);

        let challenge = self.read_sealed(stream).await?;
        let (seq_field, tag) = split_identity(&challenge)?;
        if tag != INITIATOR_ID {
            return Err(ProtocolError::UnknownPartner(tag.to_string()).into());
        }
        let next = seq_field
            .parse::<u64>()
            .ok()
            .and_then(|seq| seq.checked_add(1))
            .ok_or_else(|| ProtocolError::MalformedMessage(format!("sequence {:?}", seq_field)))?;
        self.advance(HandshakeState::VerifiedIdentity);

        let response = format!("{}{}", next, RESPONDER_ID);
        let sealed = bitcodec::encode(response.as_bytes(), &peer.e, &peer.n, k)?;
        write_message(stream, self.table, sealed.as_bytes()).await?;

        let message = read_message(stream, self.table).await?;
        let key = recover_session_key(&message, &self.keypair, &peer).into_key();

        debug!(
            "Responder key exchange complete{}",
            if key.is_fallback() { " (fallback key)" } else { "" }
        );
        Ok(SessionCipher::new(key))
    }

    async fn send_public_key<S>(&self, stream: &mut S) -> Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        let public = self.keypair.to_public().to_string();
        write_message(stream, self.table, public.as_bytes()).await
    }

    async fn read_public_key<S>(&self, stream: &mut S) -> Result<PublicKey>
    where
        S: AsyncRead + Unpin,
    {
        let payload = read_message(stream, self.table).await?;
        let text = String::from_utf8_lossy(&payload);
        let peer: PublicKey = text.parse()?;

        if !peer.fits_chunk_bits(self.keypair.k()) {
            return Err(ProtocolError::MalformedPublicKey(format!(
                "modulus {} is too small for {}-bit chunks",
                peer.n,
                self.keypair.k()
            ))
            .into());
        }

        Ok(peer)
    }

    /// Read a message sealed to our public key and open it
    async fn read_sealed<S>(&self, stream: &mut S) -> Result<String>
    where
        S: AsyncRead + Unpin,
    {
        let payload = read_message(stream, self.table).await?;
        let sealed = std::str::from_utf8(&payload)
            .map_err(|_| ProtocolError::MalformedMessage("sealed message is not text".to_string()))?;

        let keypair = &self.keypair;
        let opened = bitcodec::decode(sealed.trim(), keypair.d(), keypair.n(), keypair.k())?;
        let opened = String::from_utf8(opened)
            .map_err(|_| ProtocolError::MalformedMessage("opened message is not text".to_string()))?;

        Ok(opened.trim().to_string())
    }
}

/// Run the initiating side with a fresh key pair
pub async fn initiate<S>(stream: &mut S, table: &SubstitutionCipher) -> Result<SessionCipher>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    Handshake::new(Role::Initiator, table)?.run(stream).await
}

/// Run the responding side with a fresh key pair
pub async fn respond<S>(stream: &mut S, table: &SubstitutionCipher) -> Result<SessionCipher>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    Handshake::new(Role::Responder, table)?.run(stream).await
}
