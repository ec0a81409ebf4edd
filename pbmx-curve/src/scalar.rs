//! The scalar field Z_q of the PBMX group.

use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use ark_ff::{BigInt, Field, PrimeField, UniformRand, Zero};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

use crate::error::{Error, Result};

pub(crate) type Fr = ark_babyjubjub::Fr;

/// The byte length of a canonical scalar encoding.
pub const SCALAR_BYTES: usize = 32;

/// An element of the scalar field `Z_q`, where `q` is the order of the PBMX group.
///
/// Encodes canonically to 32 little-endian bytes. Decoding rejects any byte
/// string whose integer value is not already the unique representative below
/// the field modulus, so the same scalar never has two valid encodings.
#[derive(Clone, Copy, PartialEq, Eq, Zeroize)]
pub struct Scalar(pub(crate) Fr);

impl Scalar {
    /// The additive identity.
    pub fn zero() -> Self {
        Self(Fr::zero())
    }

    /// The multiplicative identity.
    pub fn one() -> Self {
        Self(Fr::from(1u64))
    }

    /// Samples a uniformly random scalar.
    pub fn random<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        Self(Fr::rand(rng))
    }

    /// Lifts a `u64` into the scalar field.
    pub fn from_u64(value: u64) -> Self {
        Self(Fr::from(value))
    }

    /// Returns `true` iff this is the additive identity.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns the multiplicative inverse, or `None` if `self` is zero.
    pub fn invert(&self) -> Option<Self> {
        self.0.inverse().map(Self)
    }

    /// Encodes this scalar as 32 canonical little-endian bytes.
    pub fn to_bytes(&self) -> [u8; SCALAR_BYTES] {
        let mut out = [0u8; SCALAR_BYTES];
        let le = self.0.into_bigint().to_bytes_le();
        out[..le.len()].copy_from_slice(&le);
        out
    }

    /// Decodes a scalar from its canonical 32-byte little-endian encoding.
    ///
    /// # Errors
    /// Returns [`Error::BadLength`] if `bytes` is not 32 bytes long, or
    /// [`Error::NonCanonicalScalar`] if the encoded integer is not already
    /// reduced modulo the field order.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SCALAR_BYTES {
            return Err(Error::BadLength {
                expected: SCALAR_BYTES,
                got: bytes.len(),
            });
        }
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let start = i * 8;
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&bytes[start..start + 8]);
            *limb = u64::from_le_bytes(chunk);
        }
        Fr::from_bigint(BigInt::<4>(limbs))
            .map(Self)
            .ok_or(Error::NonCanonicalScalar)
    }

    /// Reduces an arbitrary-length little-endian byte string modulo `q`.
    ///
    /// Unlike [`Scalar::from_bytes`], this never fails: it is used to turn a
    /// wide hash output (a Fiat-Shamir challenge) into a scalar without
    /// rejection sampling, so every transcript produces exactly one challenge.
    pub fn from_wide_bytes(bytes: &[u8]) -> Self {
        Self(Fr::from_le_bytes_mod_order(bytes))
    }
}

impl Add for Scalar {
    type Output = Scalar;
    fn add(self, rhs: Scalar) -> Scalar {
        Scalar(self.0 + rhs.0)
    }
}

impl AddAssign for Scalar {
    fn add_assign(&mut self, rhs: Scalar) {
        self.0 += rhs.0;
    }
}

impl Sub for Scalar {
    type Output = Scalar;
    fn sub(self, rhs: Scalar) -> Scalar {
        Scalar(self.0 - rhs.0)
    }
}

impl SubAssign for Scalar {
    fn sub_assign(&mut self, rhs: Scalar) {
        self.0 -= rhs.0;
    }
}

impl Mul for Scalar {
    type Output = Scalar;
    fn mul(self, rhs: Scalar) -> Scalar {
        Scalar(self.0 * rhs.0)
    }
}

impl MulAssign for Scalar {
    fn mul_assign(&mut self, rhs: Scalar) {
        self.0 *= rhs.0;
    }
}

impl Neg for Scalar {
    type Output = Scalar;
    fn neg(self) -> Scalar {
        Scalar(-self.0)
    }
}

impl std::fmt::Debug for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Scalar(..)")
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let bytes = <Vec<u8>>::deserialize(deserializer)?;
        Scalar::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_canonical_bytes() {
        let mut rng = rand::thread_rng();
        for _ in 0..32 {
            let s = Scalar::random(&mut rng);
            let bytes = s.to_bytes();
            let back = Scalar::from_bytes(&bytes).unwrap();
            assert_eq!(s, back);
        }
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            Scalar::from_bytes(&[0u8; 31]).unwrap_err(),
            Error::BadLength {
                expected: 32,
                got: 31
            }
        );
    }

    #[test]
    fn zero_and_one_are_identities() {
        let mut rng = rand::thread_rng();
        let s = Scalar::random(&mut rng);
        assert_eq!(s + Scalar::zero(), s);
        assert_eq!(s * Scalar::one(), s);
    }

    #[test]
    fn invert_of_zero_is_none() {
        assert!(Scalar::zero().invert().is_none());
    }

    #[test]
    fn wide_reduction_is_deterministic() {
        let bytes = [7u8; 64];
        assert_eq!(Scalar::from_wide_bytes(&bytes), Scalar::from_wide_bytes(&bytes));
    }
}
