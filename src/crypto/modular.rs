//! Modular arithmetic over arbitrary-precision integers
//!
//! Square-and-multiply exponentiation and the extended Euclidean inverse
//! used by key generation and the bit codec.

use crate::error::CryptoError;
use num_bigint::{BigInt, BigUint, Sign};
use num_integer::{ExtendedGcd, Integer};
use num_traits::{One, Zero};

/// Compute `base^exponent mod modulus` by binary exponentiation
///
/// Scans the exponent from its least significant bit, squaring the base at
/// every step and multiplying it into the accumulator on set bits.
pub fn power_mod(
    base: &BigUint,
    exponent: &BigUint,
    modulus: &BigUint,
) -> Result<BigUint, CryptoError> {
    if modulus.is_zero() {
        return Err(CryptoError::Domain);
    }

    let mut result = BigUint::one() % modulus;
    let mut base = base % modulus;

    for i in 0..exponent.bits() {
        if exponent.bit(i) {
            result = (&result * &base) % modulus;
        }
        base = (&base * &base) % modulus;
    }

    Ok(result)
}

/// Multiplicative inverse of `a` modulo `modulus`
///
/// Returns the representative in `[0, modulus)`.
pub fn invert(a: &BigUint, modulus: &BigUint) -> Result<BigUint, CryptoError> {
    let not_invertible = || CryptoError::NotInvertible(a.to_string(), modulus.to_string());

    if modulus.is_zero() {
        return Err(not_invertible());
    }

    let m = BigInt::from_biguint(Sign::Plus, modulus.clone());
    let a = BigInt::from_biguint(Sign::Plus, a % modulus);
    let ExtendedGcd { gcd, x, .. } = a.extended_gcd(&m);

    if !gcd.is_one() {
        return Err(not_invertible());
    }

    x.mod_floor(&m).to_biguint().ok_or_else(not_invertible)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(v: u64) -> BigUint {
        BigUint::from(v)
    }

    #[test]
    fn test_power_mod_small() {
        assert_eq!(power_mod(&big(2), &big(10), &big(2000)).unwrap(), big(1024));
        assert_eq!(power_mod(&big(3), &big(0), &big(7)).unwrap(), big(1));
        assert_eq!(power_mod(&big(0), &big(5), &big(7)).unwrap(), big(0));
        assert_eq!(power_mod(&big(5), &big(3), &big(13)).unwrap(), big(8));
    }

    #[test]
    fn test_power_mod_modulus_one() {
        assert_eq!(power_mod(&big(9), &big(0), &big(1)).unwrap(), big(0));
    }

    #[test]
    fn test_power_mod_zero_modulus() {
        assert_eq!(
            power_mod(&big(2), &big(3), &big(0)),
            Err(CryptoError::Domain)
        );
    }

    #[test]
    fn test_power_mod_matches_builtin_beyond_machine_words() {
        let base = BigUint::parse_bytes(b"123456789012345678901234567890", 10).unwrap();
        let exponent = BigUint::parse_bytes(b"98765432109876543210", 10).unwrap();
        let modulus =
            BigUint::parse_bytes(b"340282366920938463463374607431768211507", 10).unwrap();

        assert_eq!(
            power_mod(&base, &exponent, &modulus).unwrap(),
            base.modpow(&exponent, &modulus)
        );
    }

    #[test]
    fn test_invert() {
        assert_eq!(invert(&big(3), &big(11)).unwrap(), big(4));
        assert_eq!(invert(&big(10), &big(17)).unwrap(), big(12));
        assert_eq!(invert(&big(65537), &big(9786 * 9790)).unwrap(), big(28390493));
    }

    #[test]
    fn test_invert_reduces_input() {
        assert_eq!(invert(&big(14), &big(11)).unwrap(), big(4));
    }

    #[test]
    fn test_invert_not_invertible() {
        let err = invert(&big(4), &big(8)).unwrap_err();
        assert_eq!(err, CryptoError::NotInvertible("4".to_string(), "8".to_string()));
        assert!(invert(&big(0), &big(7)).is_err());
        assert!(invert(&big(3), &big(0)).is_err());
    }

    #[test]
    fn test_invert_matches_fermat_for_wide_prime() {
        // 2^128 + 51 is prime
        let prime =
            BigUint::parse_bytes(b"340282366920938463463374607431768211507", 10).unwrap();
        let a = BigUint::parse_bytes(b"123456789012345678901234567890", 10).unwrap();

        let expected = a.modpow(&(&prime - big(2)), &prime);
        assert_eq!(invert(&a, &prime).unwrap(), expected);
    }

    #[test]
    fn test_invert_product_is_one() {
        let modulus = big(1_000_003);
        for a in [2u64, 17, 999_999, 123_456] {
            let inv = invert(&big(a), &modulus).unwrap();
            assert_eq!((big(a) * inv) % &modulus, big(1));
        }
    }
}
