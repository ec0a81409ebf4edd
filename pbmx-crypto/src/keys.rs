//! Per-party keys and the shared threshold-ElGamal public key.

use pbmx_curve::{Point, Scalar};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::ZeroizeOnDrop;

/// The byte length of a [`Fingerprint`].
pub const FINGERPRINT_BYTES: usize = 20;

/// A stable identifier for a party, derived from its [`PublicKey`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; FINGERPRINT_BYTES]);

impl Fingerprint {
    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_BYTES] {
        &self.0
    }
}

/// A party's secret scalar `x`. Never serialized except via
/// [`PrivateKey::to_bytes`] for opaque local persistence, and zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct PrivateKey(Scalar);

impl PrivateKey {
    /// Samples a fresh private key.
    pub fn random<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        Self(Scalar::random(rng))
    }

    /// Derives the corresponding [`PublicKey`] `x*G`.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(Point::generator() * self.0)
    }

    /// The raw secret scalar, used by mask/share operations in this crate.
    pub(crate) fn scalar(&self) -> Scalar {
        self.0
    }

    /// Encodes the key as opaque bytes for local storage.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Decodes a key previously produced by [`PrivateKey::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> pbmx_curve::Result<Self> {
        Scalar::from_bytes(bytes).map(Self)
    }
}

/// A party's public point `x*G`, or (when summed) the shared key `H`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PublicKey(pub(crate) Point);

/// The threshold-ElGamal shared key `H = sum_i x_i*G`.
///
/// Structurally identical to [`PublicKey`]: a sum of public keys is itself a
/// valid (if nobody's single) public key, so the two share a representation.
pub type SharedKey = PublicKey;

impl PublicKey {
    /// Wraps a raw point as a public key. Used when reconstituting `H` as the
    /// running sum of every published key.
    pub fn from_point(point: Point) -> Self {
        Self(point)
    }

    /// The underlying point.
    pub fn point(&self) -> Point {
        self.0
    }

    /// The group identity, the shared key of an empty party set.
    pub fn identity() -> Self {
        Self(Point::identity())
    }

    /// This key's [`Fingerprint`].
    pub fn fingerprint(&self) -> Fingerprint {
        let hash = blake3::hash(&self.0.to_bytes());
        let mut out = [0u8; FINGERPRINT_BYTES];
        out.copy_from_slice(&hash.as_bytes()[..FINGERPRINT_BYTES]);
        Fingerprint(out)
    }

    /// Encodes the key as its point's canonical bytes.
    pub fn to_bytes(&self) -> [u8; pbmx_curve::POINT_BYTES] {
        self.0.to_bytes()
    }

    /// Decodes a public key from canonical point bytes.
    pub fn from_bytes(bytes: &[u8]) -> pbmx_curve::Result<Self> {
        Point::decode(bytes).map(Self)
    }
}

impl std::ops::Add for PublicKey {
    type Output = PublicKey;
    fn add(self, rhs: PublicKey) -> PublicKey {
        PublicKey(self.0 + rhs.0)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Point::deserialize(deserializer).map(Self)
    }
}
