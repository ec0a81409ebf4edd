//! The PBMX group `G`: a prime-order elliptic curve group with fixed generator.

use std::ops::{Add, Mul, Neg, Sub};

use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::Zero;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, Validate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::scalar::Scalar;

pub(crate) type Affine = ark_babyjubjub::EdwardsAffine;
pub(crate) type Projective = ark_babyjubjub::EdwardsProjective;

/// The canonical compressed encoding length of a [`Point`].
pub const POINT_BYTES: usize = 32;

/// An element of the PBMX group `G`.
///
/// `G` is a prime-order subgroup of a twisted Edwards curve; every [`Point`]
/// constructed via [`Point::decode`] or produced by the arithmetic operators
/// is guaranteed to lie on the curve and in that prime-order subgroup.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Point(pub(crate) Affine);

impl Point {
    /// The fixed process-wide generator `G`.
    pub fn generator() -> Self {
        Self(Affine::generator())
    }

    /// The group identity (point at infinity).
    pub fn identity() -> Self {
        Self(Affine::zero())
    }

    /// Returns `true` iff this is the group identity.
    pub fn is_identity(&self) -> bool {
        self.0.is_zero()
    }

    /// Encodes this point in its canonical compressed form.
    pub fn to_bytes(&self) -> [u8; POINT_BYTES] {
        let mut buf = Vec::with_capacity(POINT_BYTES);
        self.0
            .serialize_compressed(&mut buf)
            .expect("affine points serialize infallibly");
        let mut out = [0u8; POINT_BYTES];
        out[..buf.len()].copy_from_slice(&buf);
        out
    }

    /// Decodes a point from its canonical compressed encoding.
    ///
    /// # Errors
    /// Returns [`Error::BadLength`] if `bytes` is not [`POINT_BYTES`] long,
    /// [`Error::NotOnCurve`] if the bytes do not decode to a point on the
    /// curve, and [`Error::NotInSubgroup`] if the point is on the curve but
    /// outside the prime-order subgroup `G` lives in.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != POINT_BYTES {
            return Err(Error::BadLength {
                expected: POINT_BYTES,
                got: bytes.len(),
            });
        }
        let affine = Affine::deserialize_with_mode(bytes, ark_serialize::Compress::Yes, Validate::No)
            .map_err(|_| Error::NotOnCurve)?;
        if !affine.is_on_curve() {
            return Err(Error::NotOnCurve);
        }
        if !affine.is_in_correct_subgroup_assuming_on_curve() {
            return Err(Error::NotInSubgroup);
        }
        Ok(Self(affine))
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point((self.0 + rhs.0).into_affine())
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point((self.0.into_group() - rhs.0.into_group()).into_affine())
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point(-self.0)
    }
}

impl Mul<Scalar> for Point {
    type Output = Point;
    fn mul(self, rhs: Scalar) -> Point {
        Point((self.0 * rhs.0).into_affine())
    }
}

impl Mul<Point> for Scalar {
    type Output = Point;
    fn mul(self, rhs: Point) -> Point {
        rhs * self
    }
}

/// Sums a slice of points; used by mask aggregation and stack/session folds.
pub fn sum(points: &[Point]) -> Point {
    let mut acc = Projective::zero();
    for p in points {
        acc += p.0;
    }
    Point(acc.into_affine())
}

impl Serialize for Point {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let bytes = <Vec<u8>>::deserialize(deserializer)?;
        Point::decode(&bytes).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::Scalar;

    #[test]
    fn generator_roundtrips() {
        let g = Point::generator();
        let bytes = g.to_bytes();
        assert_eq!(Point::decode(&bytes).unwrap(), g);
    }

    #[test]
    fn scalar_mult_then_decode_roundtrips() {
        let mut rng = rand::thread_rng();
        let x = Scalar::random(&mut rng);
        let p = Point::generator() * x;
        assert_eq!(Point::decode(&p.to_bytes()).unwrap(), p);
    }

    #[test]
    fn rejects_bad_length() {
        assert_eq!(
            Point::decode(&[0u8; 31]).unwrap_err(),
            Error::BadLength {
                expected: 32,
                got: 31
            }
        );
    }

    #[test]
    fn identity_is_additive_identity() {
        let g = Point::generator();
        assert_eq!(g + Point::identity(), g);
    }

    #[test]
    fn sum_matches_fold() {
        let mut rng = rand::thread_rng();
        let pts: Vec<Point> = (0..5)
            .map(|_| Point::generator() * Scalar::random(&mut rng))
            .collect();
        let folded = pts
            .iter()
            .fold(Point::identity(), |acc, p| acc + *p);
        assert_eq!(sum(&pts), folded);
    }
}
