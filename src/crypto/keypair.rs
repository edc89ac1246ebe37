//! Asymmetric key pairs for the handshake
//!
//! A key pair is built from three primes drawn by index from the ordered list
//! of primes: one each for `p`, `q` and the public exponent `e`. The private
//! exponent and the CRT values are derived once at construction.

use super::modular::invert;
use crate::error::{CryptoError, ProtocolError};
use lazy_static::lazy_static;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::Rng;
use std::fmt;
use std::str::FromStr;

/// Lowest prime index drawn by default
pub const DEFAULT_PRIME_LOWER_BOUND: usize = 80_000;

/// Prime index upper bound (exclusive) used by default
pub const DEFAULT_PRIME_UPPER_BOUND: usize = 120_000;

/// Width in bits of a plaintext chunk fed to the primitive
pub const DEFAULT_CHUNK_BITS: u32 = 20;

lazy_static! {
    static ref DEFAULT_SAMPLER: PrimeSampler =
        PrimeSampler::new(DEFAULT_PRIME_LOWER_BOUND, DEFAULT_PRIME_UPPER_BOUND)
            .expect("default prime bounds should always be valid");
}

/// Draws primes by a uniformly random index into the ordered prime list
///
/// Index `i` selects the `i`-th prime counting from 1, so index 1 is 2.
/// The list is sieved once when the sampler is built.
#[derive(Debug, Clone)]
pub struct PrimeSampler {
    lower: usize,
    upper: usize,
    primes: Vec<u64>,
}

impl PrimeSampler {
    /// Build a sampler for indices in `[lower, upper)`
    pub fn new(lower: usize, upper: usize) -> Result<Self, CryptoError> {
        if lower < 1 {
            return Err(CryptoError::Configuration(
                "prime lower bound must be no less than 1".to_string(),
            ));
        }
        if lower >= upper {
            return Err(CryptoError::Configuration(format!(
                "prime bounds [{}, {}) are empty",
                lower, upper
            )));
        }

        Ok(PrimeSampler {
            lower,
            upper,
            primes: first_primes(upper - 1),
        })
    }

    /// The process-wide sampler for the default bounds
    pub fn default_bounds() -> &'static PrimeSampler {
        &DEFAULT_SAMPLER
    }

    /// Index bounds as `(lower, upper)`
    pub fn bounds(&self) -> (usize, usize) {
        (self.lower, self.upper)
    }

    /// The `index`-th prime, counting from 1
    pub fn nth(&self, index: usize) -> Option<u64> {
        index.checked_sub(1).and_then(|i| self.primes.get(i)).copied()
    }

    /// Draw one prime
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        let index = rng.gen_range(self.lower..self.upper);
        self.primes[index - 1]
    }
}

/// Sieve the first `count` primes
fn first_primes(count: usize) -> Vec<u64> {
    let limit = sieve_limit(count);
    let mut composite = vec![false; limit + 1];
    let mut primes = Vec::with_capacity(count);

    for i in 2..=limit {
        if composite[i] {
            continue;
        }
        primes.push(i as u64);
        if primes.len() == count {
            break;
        }
        let mut j = i * i;
        while j <= limit {
            composite[j] = true;
            j += i;
        }
    }

    primes
}

/// Upper bound on the `count`-th prime: n(ln n + ln ln n) for n >= 6
fn sieve_limit(count: usize) -> usize {
    if count < 6 {
        return 15;
    }
    let n = count as f64;
    (n * (n.ln() + n.ln().ln())).ceil() as usize
}

/// Trial division primality check
fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    let mut i = 2u64;
    while i * i <= n {
        if n % i == 0 {
            return false;
        }
        i += 1;
    }
    true
}

/// The shareable half of a key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    /// Public exponent
    pub e: BigUint,
    /// Modulus
    pub n: BigUint,
}

impl PublicKey {
    /// Whether `chunk_bits`-wide chunks fit under this modulus (`2^k < n`)
    pub fn fits_chunk_bits(&self, chunk_bits: u32) -> bool {
        (BigUint::one() << chunk_bits) < self.n
    }
}

/// Wire form `"{e}-{n}"`
impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.e, self.n)
    }
}

impl FromStr for PublicKey {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ProtocolError::MalformedPublicKey(s.to_string());

        let (e, n) = s.trim().split_once('-').ok_or_else(malformed)?;
        let e = BigUint::from_str(e.trim()).map_err(|_| malformed())?;
        let n = BigUint::from_str(n.trim()).map_err(|_| malformed())?;

        if n.is_zero() || e.is_zero() {
            return Err(malformed());
        }

        Ok(PublicKey { e, n })
    }
}

/// A fresh asymmetric key pair, generated per connection
#[derive(Clone)]
pub struct KeyPair {
    p: BigUint,
    q: BigUint,
    n: BigUint,
    e: BigUint,
    d: BigUint,
    dp: BigUint,
    dq: BigUint,
    qinv: BigUint,
    k: u32,
}

impl KeyPair {
    /// Generate a key pair from prime indices drawn in `[lower, upper)`
    pub fn generate(lower: usize, upper: usize) -> Result<Self, CryptoError> {
        let sampler = PrimeSampler::new(lower, upper)?;
        Self::generate_with(&sampler, DEFAULT_CHUNK_BITS)
    }

    /// Generate a key pair with the default bounds and chunk width
    pub fn generate_default() -> Result<Self, CryptoError> {
        Self::generate_with(PrimeSampler::default_bounds(), DEFAULT_CHUNK_BITS)
    }

    /// Generate a key pair from an existing sampler
    ///
    /// Fails fast with [`CryptoError::KeyGeneration`] when the drawn exponent
    /// has no inverse; the caller decides whether to draw again.
    pub fn generate_with(sampler: &PrimeSampler, k: u32) -> Result<Self, CryptoError> {
        let (p, q, e) = {
            let mut rng = rand::thread_rng();
            (
                sampler.sample(&mut rng),
                sampler.sample(&mut rng),
                sampler.sample(&mut rng),
            )
        };

        Self::build(p, q, e, k)
    }

    /// Build a key pair from explicit primes and exponent
    pub fn from_primes(p: u64, q: u64, e: u64, k: u32) -> Result<Self, CryptoError> {
        if !is_prime(p) {
            return Err(CryptoError::Configuration(format!("p = {} is not prime", p)));
        }
        if !is_prime(q) {
            return Err(CryptoError::Configuration(format!("q = {} is not prime", q)));
        }

        Self::build(p, q, e, k)
    }

    fn build(p: u64, q: u64, e: u64, k: u32) -> Result<Self, CryptoError> {
        let (p, q, e) = (BigUint::from(p), BigUint::from(q), BigUint::from(e));
        let n = &p * &q;

        if (BigUint::one() << k) >= n {
            return Err(CryptoError::Configuration(format!(
                "k = {} must be less than log2(n) for n = {}",
                k, n
            )));
        }

        let one = BigUint::one();
        let phi = if p != q {
            (&p - &one) * (&q - &one)
        } else {
            &p * &p - &p
        };

        let d = invert(&e, &phi).map_err(|err| CryptoError::KeyGeneration(err.to_string()))?;
        let dp = &d % (&p - &one);
        let dq = &d % (&q - &one);
        // CRT is undefined for a square modulus
        let qinv = if p != q {
            invert(&q, &p).map_err(|err| CryptoError::KeyGeneration(err.to_string()))?
        } else {
            BigUint::zero()
        };

        Ok(KeyPair {
            p,
            q,
            n,
            e,
            d,
            dp,
            dq,
            qinv,
            k,
        })
    }

    /// The shareable `(e, n)` pair
    pub fn to_public(&self) -> PublicKey {
        PublicKey {
            e: self.e.clone(),
            n: self.n.clone(),
        }
    }

    /// Public exponent
    pub fn e(&self) -> &BigUint {
        &self.e
    }

    /// Private exponent
    pub fn d(&self) -> &BigUint {
        &self.d
    }

    /// Modulus
    pub fn n(&self) -> &BigUint {
        &self.n
    }

    /// Prime factors `(p, q)`
    pub fn primes(&self) -> (&BigUint, &BigUint) {
        (&self.p, &self.q)
    }

    /// CRT values `(dP, dQ, qInv)`
    pub fn crt(&self) -> (&BigUint, &BigUint, &BigUint) {
        (&self.dp, &self.dq, &self.qinv)
    }

    /// Chunk width in bits
    pub fn k(&self) -> u32 {
        self.k
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("e", &self.e)
            .field("n", &self.n)
            .field("k", &self.k)
            .finish_non_exhaustive()
    }
}
