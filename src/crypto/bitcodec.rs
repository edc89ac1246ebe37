//! Bit-packing codec over the asymmetric primitive
//!
//! Bytes are rendered as a string of `'0'`/`'1'` characters, terminated by a
//! sentinel bit (the complement of the last data bit), padded with copies of
//! the sentinel to a multiple of the chunk width, and each chunk is raised to
//! an exponent under a modulus. Encoding under a peer's public exponent seals
//! a message to that peer; encoding under our own private exponent signs it.
//!
//! Padding is recognized by the sentinel alone. A bit string whose trailing
//! run is not preceded by a sentinel decodes to a truncated value.

use super::modular::power_mod;
use crate::error::CryptoError;
use num_bigint::BigUint;
use num_traits::Zero;

/// Encode `plaintext` into fixed-width bit chunks raised to `exponent`
///
/// Each output chunk is `bit_length(modulus)` characters wide.
pub fn encode(
    plaintext: &[u8],
    exponent: &BigUint,
    modulus: &BigUint,
    chunk_bits: u32,
) -> Result<String, CryptoError> {
    if plaintext.is_empty() {
        return Err(CryptoError::EmptyPlaintext);
    }
    if chunk_bits == 0 {
        return Err(CryptoError::Configuration("chunk width must be positive".to_string()));
    }
    if modulus.is_zero() {
        return Err(CryptoError::Domain);
    }

    let chunk_bits = chunk_bits as usize;
    let width = modulus.bits() as usize;

    let mut bits = String::with_capacity(plaintext.len() * 8 + chunk_bits);
    for byte in plaintext {
        bits.push_str(&format!("{:08b}", byte));
    }

    let sentinel = if bits.ends_with('0') { '1' } else { '0' };
    bits.push(sentinel);
    while bits.len() % chunk_bits != 0 {
        bits.push(sentinel);
    }

    let mut encoded = String::with_capacity(bits.len() / chunk_bits * width);
    for chunk in bits.as_bytes().chunks(chunk_bits) {
        let value = parse_bits(chunk)?;
        let raised = power_mod(&value, exponent, modulus)?;
        encoded.push_str(&format!("{:0width$b}", raised, width = width));
    }

    Ok(encoded)
}

/// Decode a bit string produced by [`encode`] with the matching exponent
pub fn decode(
    bits: &str,
    exponent: &BigUint,
    modulus: &BigUint,
    chunk_bits: u32,
) -> Result<Vec<u8>, CryptoError> {
    if modulus.is_zero() {
        return Err(CryptoError::Domain);
    }
    if let Some(bad) = bits.chars().find(|c| *c != '0' && *c != '1') {
        return Err(CryptoError::MalformedBits(format!(
            "unexpected character {:?}",
            bad
        )));
    }

    let width = modulus.bits() as usize;
    let chunk_bits = chunk_bits as usize;

    let mut opened = String::with_capacity(bits.len() / width.max(1) * chunk_bits + chunk_bits);
    for chunk in bits.as_bytes().chunks(width.max(1)) {
        let value = parse_bits(chunk)?;
        let raised = power_mod(&value, exponent, modulus)?;
        opened.push_str(&format!("{:0width$b}", raised, width = chunk_bits));
    }

    let mut opened = opened.into_bytes();
    strip_padding(&mut opened)?;

    Ok(opened
        .chunks(8)
        .map(|group| group.iter().fold(0u8, |acc, bit| (acc << 1) | (bit - b'0')))
        .collect())
}

/// Drop the trailing run of padding bits and the sentinel before it
fn strip_padding(bits: &mut Vec<u8>) -> Result<(), CryptoError> {
    loop {
        let len = bits.len();
        if len < 2 {
            return Err(CryptoError::DecodeUnderflow);
        }
        if bits[len - 1] != bits[len - 2] {
            break;
        }
        bits.pop();
    }
    bits.pop();
    Ok(())
}

fn parse_bits(chunk: &[u8]) -> Result<BigUint, CryptoError> {
    BigUint::parse_bytes(chunk, 2).ok_or_else(|| {
        CryptoError::MalformedBits(String::from_utf8_lossy(chunk).into_owned())
    })
}
