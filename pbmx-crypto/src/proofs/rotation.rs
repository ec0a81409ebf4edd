//! Proof that a stack is a cyclic rotation of another by a hidden amount.

use pbmx_curve::{Point, Scalar};
use rand::{CryptoRng, Rng};

use crate::error::{Error, Result};
use crate::keys::SharedKey;
use crate::mask::Mask;
use crate::proofs::or_dlogeq::OrDlogEqProof;
use crate::transcript::Transcript;

const ROTATION_LABEL: &[u8] = b"pbmx.rotation";
const WEIGHT_LABEL: &[u8] = b"pbmx.rotation.weights";

/// Proof that `after[i] = remask(before[(i - k) mod n])` for some hidden `k`.
///
/// Collapses the `n` per-position checks into a single [`OrDlogEqProof`]
/// over the `n` candidate shift amounts: position-indexed weights (derived
/// from the transcript) fold each candidate's `n` equalities into one
/// shared-basis target pair, so the OR-proof needs only `n` branches, not
/// `n^2`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RotationProof {
    pub(crate) or_proof: OrDlogEqProof,
}

fn weights(before: &[Mask], after: &[Mask]) -> Vec<Scalar> {
    let n = before.len();
    let mut transcript = Transcript::new(WEIGHT_LABEL);
    transcript.append_u64(n as u64);
    for m in before {
        transcript.append_point(&m.c1()).append_point(&m.c2());
    }
    for m in after {
        transcript.append_point(&m.c1()).append_point(&m.c2());
    }
    (0..n).map(|i| transcript.challenge_scalar_indexed(i as u64)).collect()
}

/// For each candidate shift `k'`, the combined point `(Σ w_i (after[i].c1 -
/// before[(i-k') mod n].c1), Σ w_i (after[i].c2 - before[(i-k') mod n].c2))`.
/// Exactly one candidate (the real `k`) equals `(R*g, R*h)` for the combined
/// randomizer `R = Σ w_i * randomizers[i]`.
fn candidate_targets(before: &[Mask], after: &[Mask], weights: &[Scalar]) -> Vec<(Point, Point)> {
    let n = before.len();
    (0..n)
        .map(|k| {
            let mut d1 = Point::identity();
            let mut d2 = Point::identity();
            for i in 0..n {
                let src = (i + n - k % n) % n;
                d1 = d1 + after[i].c1() * weights[i] - before[src].c1() * weights[i];
                d2 = d2 + after[i].c2() * weights[i] - before[src].c2() * weights[i];
            }
            (d1, d2)
        })
        .collect()
}

impl RotationProof {
    /// Proves `after` is `before` rotated by `k`, remasked under `h`, using
    /// `randomizers[i]` as the remask factor for `after[i]`.
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if `before`/`after`/`randomizers`
    /// disagree in length, or the stack is empty.
    pub fn prove<R: Rng + CryptoRng>(
        h: &SharedKey,
        before: &[Mask],
        after: &[Mask],
        k: usize,
        randomizers: &[Scalar],
        rng: &mut R,
    ) -> Result<Self> {
        let n = before.len();
        if n == 0 || after.len() != n || randomizers.len() != n {
            return Err(Error::ShapeMismatch {
                expected: n,
                got: after.len().max(randomizers.len()),
            });
        }

        let w = weights(before, after);
        let targets = candidate_targets(before, after, &w);
        let r_combined = (0..n).fold(Scalar::zero(), |acc, i| acc + w[i] * randomizers[i]);

        let or_proof = OrDlogEqProof::prove(
            ROTATION_LABEL,
            Point::generator(),
            h.point(),
            &targets,
            k,
            r_combined,
            rng,
        );
        Ok(Self { or_proof })
    }

    /// Verifies the proof for the given `(before, after)` pair under `h`.
    pub fn verify(&self, h: &SharedKey, before: &[Mask], after: &[Mask]) -> Result<()> {
        let n = before.len();
        if n == 0 || after.len() != n {
            return Err(Error::ShapeMismatch {
                expected: n,
                got: after.len(),
            });
        }
        let w = weights(before, after);
        let targets = candidate_targets(before, after, &w);
        self.or_proof.verify(ROTATION_LABEL, Point::generator(), h.point(), &targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::PrivateKey;
    use crate::token::Token;

    fn rotate_apply(h: &SharedKey, before: &[Mask], k: usize, rng: &mut impl Rng) -> (Vec<Mask>, Vec<Scalar>) {
        let n = before.len();
        let mut randomizers = Vec::with_capacity(n);
        let mut after = Vec::with_capacity(n);
        for i in 0..n {
            let src = (i + n - k % n) % n;
            let r = Scalar::random(rng);
            randomizers.push(r);
            after.push(Mask::from_parts(
                before[src].c1() + Point::generator() * r,
                before[src].c2() + h.point() * r,
                before[src].remaining(),
            ));
        }
        (after, randomizers)
    }

    #[test]
    fn valid_rotation_verifies() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let h = sk.public_key();
        let before: Vec<Mask> = (0..5)
            .map(|i| Mask::mask(&h, Token::new(i).unwrap(), 1, &mut rng).0)
            .collect();

        let k = 2;
        let (after, randomizers) = rotate_apply(&h, &before, k, &mut rng);
        let proof = RotationProof::prove(&h, &before, &after, k, &randomizers, &mut rng).unwrap();
        proof.verify(&h, &before, &after).unwrap();
    }

    #[test]
    fn shift_by_zero_is_valid() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let h = sk.public_key();
        let before: Vec<Mask> = (0..3)
            .map(|i| Mask::mask(&h, Token::new(i).unwrap(), 1, &mut rng).0)
            .collect();
        let (after, randomizers) = rotate_apply(&h, &before, 0, &mut rng);
        let proof = RotationProof::prove(&h, &before, &after, 0, &randomizers, &mut rng).unwrap();
        proof.verify(&h, &before, &after).unwrap();
    }

    #[test]
    fn wrong_claimed_shift_is_rejected() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let h = sk.public_key();
        let before: Vec<Mask> = (0..4)
            .map(|i| Mask::mask(&h, Token::new(i).unwrap(), 1, &mut rng).0)
            .collect();

        let (after, randomizers) = rotate_apply(&h, &before, 1, &mut rng);
        let proof = RotationProof::prove(&h, &before, &after, 2, &randomizers, &mut rng).unwrap();
        assert!(proof.verify(&h, &before, &after).is_err());
    }

    #[test]
    fn empty_stack_is_rejected() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let h = sk.public_key();
        assert!(RotationProof::prove(&h, &[], &[], 0, &[], &mut rng).is_err());
    }
}
