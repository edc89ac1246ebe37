//! Password-derived byte substitution
//!
//! Both relays derive the same 256-entry permutation from the shared password
//! and use it to obscure everything sent before the session key exists. The
//! table is built once at startup and shared read-only between connections.

use md5::{Digest, Md5};

/// Number of sorting rounds applied to the identity permutation
const SORT_ROUNDS: u64 = 1024;

/// A byte permutation and its inverse
#[derive(Clone, PartialEq, Eq)]
pub struct SubstitutionCipher {
    encrypt_table: [u8; 256],
    decrypt_table: [u8; 256],
}

impl SubstitutionCipher {
    /// Derive the tables from a password
    pub fn new(password: &[u8]) -> Self {
        let encrypt_table = derive_table(password);

        let mut decrypt_table = [0u8; 256];
        for (plain, &cipher) in encrypt_table.iter().enumerate() {
            decrypt_table[cipher as usize] = plain as u8;
        }

        SubstitutionCipher {
            encrypt_table,
            decrypt_table,
        }
    }

    /// Forward permutation
    pub fn encrypt_table(&self) -> &[u8; 256] {
        &self.encrypt_table
    }

    /// Substitute every byte of `data`
    pub fn encrypt(&self, data: &[u8]) -> Vec<u8> {
        data.iter().map(|&b| self.encrypt_table[b as usize]).collect()
    }

    /// Undo [`encrypt`](Self::encrypt)
    pub fn decrypt(&self, data: &[u8]) -> Vec<u8> {
        data.iter().map(|&b| self.decrypt_table[b as usize]).collect()
    }

    /// Substitute in place
    pub fn encrypt_in_place(&self, data: &mut [u8]) {
        for b in data.iter_mut() {
            *b = self.encrypt_table[*b as usize];
        }
    }

    /// Undo the substitution in place
    pub fn decrypt_in_place(&self, data: &mut [u8]) {
        for b in data.iter_mut() {
            *b = self.decrypt_table[*b as usize];
        }
    }
}

impl std::fmt::Debug for SubstitutionCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubstitutionCipher").finish_non_exhaustive()
    }
}

/// Build the forward permutation
///
/// The first little-endian word `a` of the password's MD5 digest drives
/// `SORT_ROUNDS - 1` stable sorts of the identity permutation, round `i`
/// ordering each byte `x` by `a mod (x + i)`.
fn derive_table(password: &[u8]) -> [u8; 256] {
    let digest = Md5::digest(password);
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    let a = u64::from_le_bytes(word);

    let mut table: Vec<u8> = (0..=255).collect();
    for i in 1..SORT_ROUNDS {
        table.sort_by_key(|&x| a % (x as u64 + i));
    }

    let mut out = [0u8; 256];
    out.copy_from_slice(&table);
    out
}
