//! Error types for Naivesocks
//!
//! This module defines all custom error types used throughout the application.
//! Every error is local to the connection task that produced it.

use std::io;
use thiserror::Error;

/// Main error type for Naivesocks operations
#[derive(Error, Debug)]
pub enum NaiveSocksError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Socket-level failure or unexpected close
    #[error("Transport error: {0}")]
    Transport(String),

    /// Handshake or SOCKS5 protocol violation
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Failure inside one of the cipher primitives
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),
}

/// Errors raised by the asymmetric primitive, the codecs and the ciphers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Modulus outside the domain of modular arithmetic
    #[error("Modulus must be positive")]
    Domain,

    /// No multiplicative inverse exists
    #[error("{0} has no inverse modulo {1}")]
    NotInvertible(String, String),

    /// Key generation could not derive a private exponent
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Key parameters violate a construction invariant
    #[error("Invalid key parameters: {0}")]
    Configuration(String),

    /// Nothing to encode
    #[error("Cannot encode an empty plaintext")]
    EmptyPlaintext,

    /// Bit string contains something other than '0' and '1'
    #[error("Malformed bit string: {0}")]
    MalformedBits(String),

    /// Padding stripping consumed the whole bit string
    #[error("Bit string underflow while stripping padding")]
    DecodeUnderflow,

    /// Block cipher input or padding is invalid
    #[error("Invalid block padding: {0}")]
    Padding(String),

    /// Session key has the wrong size
    #[error("Session key must be 8 bytes, got {0}")]
    InvalidKeyLength(usize),
}

/// Handshake and SOCKS5 protocol violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Peer identity tag did not match the expected constant
    #[error("Unknown partner: {0:?}")]
    UnknownPartner(String),

    /// Responder echoed the wrong sequence number
    #[error("Unknown sequence: expected {expected}, got {got:?}")]
    UnknownSequence {
        /// Sequence number the initiator expected
        expected: u32,
        /// Sequence field as received
        got: String,
    },

    /// Public key message could not be parsed or is unusable
    #[error("Malformed public key: {0}")]
    MalformedPublicKey(String),

    /// Handshake message could not be interpreted
    #[error("Malformed handshake message: {0}")]
    MalformedMessage(String),

    /// Unsupported SOCKS version
    #[error("Unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    /// No acceptable authentication method
    #[error("No acceptable authentication method")]
    NoAcceptableMethod,

    /// Command not supported
    #[error("Command not supported: {0}")]
    CommandNotSupported(u8),

    /// Address type not supported
    #[error("Address type not supported: {0}")]
    AddressTypeNotSupported(u8),

    /// Invalid domain name
    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),
}

/// Result alias used by the library modules
pub type Result<T, E = NaiveSocksError> = std::result::Result<T, E>;
