//! Cryptographic primitives used by the tunnel
//!
//! The handshake runs over a small RSA-like primitive ([`KeyPair`] plus the
//! [`bitcodec`] chunk encoding) protected by a password-derived
//! [`SubstitutionCipher`]. Live traffic is carried under a [`SessionCipher`].

pub mod bitcodec;
mod keypair;
pub mod modular;
mod session;
mod substitution;

pub use keypair::{
    KeyPair, PrimeSampler, PublicKey, DEFAULT_CHUNK_BITS, DEFAULT_PRIME_LOWER_BOUND,
    DEFAULT_PRIME_UPPER_BOUND,
};
pub use session::{SessionCipher, SessionKey, BLOCK_SIZE, FALLBACK_SESSION_KEY};
pub use substitution::SubstitutionCipher;
