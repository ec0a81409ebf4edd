//! Masks: ElGamal ciphertexts under the shared key `H`, and the per-party
//! decryption shares that unmask them.

use pbmx_curve::{Point, Scalar};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::keys::{PrivateKey, PublicKey, SharedKey};
use crate::proofs::dlog_eq::DlogEqProof;
use crate::token::Token;
use crate::transcript::Transcript;

const MASK_LABEL: &[u8] = b"pbmx.mask";
const REMASK_LABEL: &[u8] = b"pbmx.remask";
const SHARE_LABEL: &[u8] = b"pbmx.share";

/// An ElGamal ciphertext `(c1, c2) = (r*G, r*H + t*G)` hiding a [`Token`].
///
/// `remaining` tracks how many parties' shares (or private keys) still need
/// to be removed before [`Mask::unmask_open`] may recover a token; it is set
/// by [`Mask::mask`] to the number of parties whose keys compose `H` at that
/// moment, and decremented by [`Mask::unmask_share`]/[`Mask::unmask_private`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Mask {
    c1: Point,
    c2: Point,
    remaining: u32,
}

/// One party's contribution `x_i * c1` toward unmasking a [`Mask`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Share(Point);

impl Mask {
    /// The first ciphertext component `r*G`.
    pub fn c1(&self) -> Point {
        self.c1
    }

    /// The second ciphertext component `r*H + t*G`.
    pub fn c2(&self) -> Point {
        self.c2
    }

    /// How many parties' shares still need to be removed before opening.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Builds a mask directly from its components, e.g. when decoding from
    /// the wire. `remaining` must be supplied by the caller (it is not
    /// recoverable from the ciphertext alone).
    pub fn from_parts(c1: Point, c2: Point, remaining: u32) -> Self {
        Self { c1, c2, remaining }
    }

    /// Encrypts `token` under `h`, choosing a fresh blinding factor.
    ///
    /// `num_parties` is the number of distinct private keys summed into `h`
    /// at the time of masking; it becomes the mask's starting
    /// [`Mask::remaining`] count.
    pub fn mask<R: Rng + CryptoRng>(
        h: &SharedKey,
        token: Token,
        num_parties: u32,
        rng: &mut R,
    ) -> (Self, DlogEqProof) {
        let r = Scalar::random(rng);
        let g = Point::generator();
        let c1 = g * r;
        let c2 = h.point() * r + token.embed();

        let proof = DlogEqProof::prove(MASK_LABEL, g, h.point(), c1, c2 - token.embed(), r, rng);
        (
            Self {
                c1,
                c2,
                remaining: num_parties,
            },
            proof,
        )
    }

    /// Verifies a [`Mask::mask`] proof against the claimed output and token.
    pub fn verify_mask(&self, h: &SharedKey, token: Token, proof: &DlogEqProof) -> Result<()> {
        proof
            .verify(MASK_LABEL, Point::generator(), h.point(), self.c1, self.c2 - token.embed())
            .map_err(|_| Error::ProofInvalid)
    }

    /// Re-randomizes this mask by adding a fresh encryption of zero, without
    /// changing the hidden token or `remaining`.
    pub fn remask<R: Rng + CryptoRng>(&self, h: &SharedKey, rng: &mut R) -> (Self, DlogEqProof) {
        let r = Scalar::random(rng);
        let g = Point::generator();
        let delta1 = g * r;
        let delta2 = h.point() * r;
        let proof = DlogEqProof::prove(REMASK_LABEL, g, h.point(), delta1, delta2, r, rng);
        (
            Self {
                c1: self.c1 + delta1,
                c2: self.c2 + delta2,
                remaining: self.remaining,
            },
            proof,
        )
    }

    /// Verifies a [`Mask::remask`] proof that `remasked` is `self` plus a
    /// zero-encryption.
    pub fn verify_remask(&self, remasked: &Self, h: &SharedKey, proof: &DlogEqProof) -> Result<()> {
        proof
            .verify(
                REMASK_LABEL,
                Point::generator(),
                h.point(),
                remasked.c1 - self.c1,
                remasked.c2 - self.c2,
            )
            .map_err(|_| Error::ProofInvalid)
    }

    /// Computes this party's decryption [`Share`] of the mask.
    pub fn share<R: Rng + CryptoRng>(
        &self,
        sk: &PrivateKey,
        pk: &PublicKey,
        rng: &mut R,
    ) -> (Share, DlogEqProof) {
        let x = sk.scalar();
        let share_point = self.c1 * x;
        let proof = DlogEqProof::prove(SHARE_LABEL, Point::generator(), self.c1, pk.point(), share_point, x, rng);
        (Share(share_point), proof)
    }

    /// Verifies a [`Mask::share`] proof against the claimed public key.
    pub fn verify_share(&self, pk: &PublicKey, share: &Share, proof: &DlogEqProof) -> Result<()> {
        proof
            .verify(SHARE_LABEL, Point::generator(), self.c1, pk.point(), share.0)
            .map_err(|_| Error::ProofInvalid)
    }

    /// Removes one party's published [`Share`] from this mask.
    pub fn unmask_share(&self, share: &Share) -> Self {
        Self {
            c1: self.c1,
            c2: self.c2 - share.0,
            remaining: self.remaining.saturating_sub(1),
        }
    }

    /// Removes one layer of encryption using the caller's own private key,
    /// without publishing a [`Share`].
    pub fn unmask_private(&self, sk: &PrivateKey) -> Self {
        Self {
            c1: self.c1,
            c2: self.c2 - self.c1 * sk.scalar(),
            remaining: self.remaining.saturating_sub(1),
        }
    }

    /// Recovers the hidden [`Token`] once every party's share has been
    /// removed.
    ///
    /// # Errors
    /// Returns [`Error::ExhaustedRecovery`] if `remaining != 0`, and
    /// propagates [`Error::RecoveryExhausted`] if the token is outside the
    /// search bound.
    pub fn unmask_open(&self, bound: u64) -> Result<Token> {
        if self.remaining != 0 {
            return Err(Error::ExhaustedRecovery {
                remaining: self.remaining,
            });
        }
        Token::recover(self.c2, bound)
    }
}

impl std::ops::Add for Mask {
    type Output = Mask;

    /// Homomorphic combination: `decrypt(m1 + m2) = decrypt(m1) + decrypt(m2)`.
    ///
    /// Only meaningful for masks encrypted under the same `H` with the same
    /// party count; callers (e.g. Rng entropy aggregation) are responsible
    /// for that invariant.
    fn add(self, rhs: Mask) -> Mask {
        Mask {
            c1: self.c1 + rhs.c1,
            c2: self.c2 + rhs.c2,
            remaining: self.remaining,
        }
    }
}

impl Share {
    /// The underlying point `x_i * c1`.
    pub fn point(&self) -> Point {
        self.0
    }

    /// Wraps a raw point, e.g. when decoding from the wire.
    pub fn from_point(point: Point) -> Self {
        Self(point)
    }
}

impl std::ops::Sub for Share {
    type Output = Share;
    fn sub(self, rhs: Share) -> Share {
        Share(self.0 - rhs.0)
    }
}
