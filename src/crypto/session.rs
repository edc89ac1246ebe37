//! Session cipher for the relay
//!
//! DES in ECB mode with PKCS5 padding, keyed by the 8-byte session key
//! agreed during the handshake. Both relays use the same key and mode, so
//! each side decrypts exactly what the other encrypted.

use crate::error::CryptoError;
use des::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use des::Des;
use rand::Rng;
use std::fmt;

/// DES block size in bytes
pub const BLOCK_SIZE: usize = 8;

/// Key the responder falls back to when key recovery fails
pub const FALLBACK_SESSION_KEY: &[u8; 8] = b"12345678";

/// An 8-byte session key
///
/// Keys drawn by the initiator are eight ASCII decimal digits, which is also
/// how they travel through the handshake.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SessionKey([u8; 8]);

impl SessionKey {
    /// Draw a random key in `[10_000_000, 100_000_000)`
    pub fn random() -> Self {
        let value: u32 = rand::thread_rng().gen_range(10_000_000..100_000_000);
        let mut key = [0u8; 8];
        key.copy_from_slice(value.to_string().as_bytes());
        SessionKey(key)
    }

    /// The fixed key used by the degraded recovery path
    pub fn fallback() -> Self {
        SessionKey(*FALLBACK_SESSION_KEY)
    }

    /// Build a key from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; 8] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength(bytes.len()))?;
        Ok(SessionKey(key))
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Whether this is the fixed fallback key
    pub fn is_fallback(&self) -> bool {
        &self.0 == FALLBACK_SESSION_KEY
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// DES-ECB with PKCS5 padding
#[derive(Clone)]
pub struct SessionCipher {
    key: SessionKey,
    cipher: Des,
}

impl SessionCipher {
    /// Create a cipher for the given key
    pub fn new(key: SessionKey) -> Self {
        let cipher = Des::new(key.as_bytes().into());
        SessionCipher { key, cipher }
    }

    /// Key this cipher was built from
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Pad and encrypt; the output is a non-empty multiple of the block size
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let pad = BLOCK_SIZE - plaintext.len() % BLOCK_SIZE;
        let mut data = Vec::with_capacity(plaintext.len() + pad);
        data.extend_from_slice(plaintext);
        data.resize(plaintext.len() + pad, pad as u8);

        for chunk in data.chunks_exact_mut(BLOCK_SIZE) {
            self.cipher.encrypt_block(chunk.into());
        }

        data
    }

    /// Decrypt and strip the padding
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CryptoError::Padding(format!(
                "ciphertext length {} is not a positive multiple of {}",
                ciphertext.len(),
                BLOCK_SIZE
            )));
        }

        let mut data = ciphertext.to_vec();
        for chunk in data.chunks_exact_mut(BLOCK_SIZE) {
            self.cipher.decrypt_block(chunk.into());
        }

        let pad = data[data.len() - 1] as usize;
        if pad == 0 || pad > BLOCK_SIZE || data[data.len() - pad..].iter().any(|&b| b as usize != pad) {
            return Err(CryptoError::Padding("bad PKCS5 padding".to_string()));
        }
        data.truncate(data.len() - pad);

        Ok(data)
    }
}

impl fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCipher")
            .field("mode", &"DES-ECB-PKCS5")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    fn cipher(key: &[u8]) -> SessionCipher {
        SessionCipher::new(SessionKey::from_bytes(key).unwrap())
    }

    #[test]
    fn test_des_known_block() {
        let cipher = cipher(&hex("133457799bbcdff1"));
        let ct = cipher.encrypt(&hex("0123456789abcdef"));
        assert_eq!(ct, hex("85e813540f0ab405fdf2e174492922f8"));
    }

    #[test]
    fn test_request_vector() {
        let cipher = cipher(b"ABCDEFGH");
        let ct = cipher.encrypt(b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(ct, hex("70677e4c3bb85630017c8073170cdfbae7f470542e88ce11"));
        assert_eq!(cipher.decrypt(&ct).unwrap(), b"GET / HTTP/1.1\r\n\r\n");
    }

    #[test]
    fn test_empty_plaintext_is_one_padding_block() {
        let cipher = cipher(FALLBACK_SESSION_KEY);
        let ct = cipher.encrypt(b"");
        assert_eq!(ct, hex("feb959b7d4642fcb"));
        assert_eq!(cipher.decrypt(&ct).unwrap(), b"");
    }

    #[test]
    fn test_round_trip_lengths() {
        let cipher = cipher(b"87654321");
        for len in 0..40 {
            let msg: Vec<u8> = (0..len as u8).collect();
            let ct = cipher.encrypt(&msg);
            assert_eq!(ct.len() % BLOCK_SIZE, 0);
            assert!(ct.len() > msg.len());
            assert_eq!(cipher.decrypt(&ct).unwrap(), msg);
        }
    }

    #[test]
    fn test_decrypt_rejects_bad_length() {
        let cipher = cipher(b"87654321");
        assert!(cipher.decrypt(b"").is_err());
        assert!(cipher.decrypt(b"1234567").is_err());
        assert!(cipher.decrypt(b"123456789").is_err());
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails_or_differs() {
        let ct = cipher(b"ABCDEFGH").encrypt(b"secret payload");
        match cipher(b"HGFEDCBA").decrypt(&ct) {
            Ok(plain) => assert_ne!(plain, b"secret payload"),
            Err(err) => assert!(matches!(err, CryptoError::Padding(_))),
        }
    }

    #[test]
    fn test_session_key_random_is_eight_digits() {
        for _ in 0..20 {
            let key = SessionKey::random();
            let text = std::str::from_utf8(key.as_bytes()).unwrap();
            let value: u32 = text.parse().unwrap();
            assert!((10_000_000..100_000_000).contains(&value));
        }
    }

    #[test]
    fn test_session_key_from_bytes() {
        assert!(SessionKey::from_bytes(b"1234567").is_err());
        assert_eq!(
            SessionKey::from_bytes(b"123456789").unwrap_err(),
            CryptoError::InvalidKeyLength(9)
        );
        assert!(SessionKey::from_bytes(b"12345678").unwrap().is_fallback());
        assert!(!SessionKey::from_bytes(b"87654321").unwrap().is_fallback());
    }

    #[test]
    fn test_debug_hides_key() {
        let cipher = cipher(b"ABCDEFGH");
        assert!(!format!("{:?}", cipher).contains("ABCDEFGH"));
        assert_eq!(format!("{:?}", cipher.key()), "SessionKey(..)");
    }
}
