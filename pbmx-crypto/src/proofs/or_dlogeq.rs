//! `k`-way OR-composition of [`DlogEqProof`](super::dlog_eq::DlogEqProof)
//! statements (Cramer-Damgård-Schoenmakers), used wherever a proof must
//! attest "one of these `k` public statements holds" without revealing
//! which one.
//!
//! [`RotationProof`](super::rotation::RotationProof) and
//! [`ShuffleProof`](super::shuffle::ShuffleProof) both reduce their hidden
//! structure (a shift amount, a swap-or-not bit) down to exactly this shape:
//! a single shared basis pair `(g, h)` and `k` candidate targets
//! `(a_j, b_j)`, exactly one of which is `(x*g, x*h)` for a witness `x` only
//! the prover knows.

use pbmx_curve::{Point, Scalar};
use rand::{CryptoRng, Rng};

use crate::error::{Error, Result};
use crate::transcript::Transcript;

/// One OR-branch's commitment/response pair.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct BranchResponse {
    pub(crate) e: Scalar,
    pub(crate) s: Scalar,
}

/// Proof that `exists j: targets[j] = (x*g, x*h)` for some secret `x`, for a
/// single shared basis `(g, h)` and public `targets`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct OrDlogEqProof {
    pub(crate) branches: Vec<BranchResponse>,
}

impl OrDlogEqProof {
    /// Proves the statement is true at `true_index` with witness `x`, i.e.
    /// `targets[true_index] = (x*g, x*h)`.
    ///
    /// # Panics
    /// Panics if `targets` is empty or `true_index` is out of range; these
    /// are caller-enforced preconditions, not recoverable runtime errors.
    pub fn prove<R: Rng + CryptoRng>(
        label: &'static [u8],
        g: Point,
        h: Point,
        targets: &[(Point, Point)],
        true_index: usize,
        x: Scalar,
        rng: &mut R,
    ) -> Self {
        assert!(!targets.is_empty(), "OR-proof requires at least one branch");
        assert!(true_index < targets.len(), "true_index out of range");

        let mut e = vec![Scalar::zero(); targets.len()];
        let mut s = vec![Scalar::zero(); targets.len()];
        let mut commitments = vec![(Point::identity(), Point::identity()); targets.len()];

        // Simulate every false branch: pick (e_j, s_j) first, derive the
        // commitment that makes the verification equation hold.
        for (j, (a, b)) in targets.iter().enumerate() {
            if j == true_index {
                continue;
            }
            let ej = Scalar::random(rng);
            let sj = Scalar::random(rng);
            commitments[j] = (g * sj - *a * ej, h * sj - *b * ej);
            e[j] = ej;
            s[j] = sj;
        }

        // Honest commitment for the true branch.
        let k = Scalar::random(rng);
        commitments[true_index] = (g * k, h * k);

        let mut transcript = Transcript::new(label);
        transcript.append_point(&g).append_point(&h);
        for (a, b) in targets {
            transcript.append_point(a).append_point(b);
        }
        for (t1, t2) in &commitments {
            transcript.append_point(t1).append_point(t2);
        }
        let total_challenge = transcript.challenge_scalar();

        let mut sum_others = Scalar::zero();
        for (j, ej) in e.iter().enumerate() {
            if j != true_index {
                sum_others += *ej;
            }
        }
        let e_true = total_challenge - sum_others;
        let s_true = k + e_true * x;
        e[true_index] = e_true;
        s[true_index] = s_true;

        let branches = e
            .into_iter()
            .zip(s)
            .map(|(e, s)| BranchResponse { e, s })
            .collect();
        Self { branches }
    }

    /// Verifies the proof against the shared basis and candidate targets.
    pub fn verify(
        &self,
        label: &'static [u8],
        g: Point,
        h: Point,
        targets: &[(Point, Point)],
    ) -> Result<()> {
        if self.branches.len() != targets.len() {
            return Err(Error::ShapeMismatch {
                expected: targets.len(),
                got: self.branches.len(),
            });
        }

        let commitments: Vec<(Point, Point)> = self
            .branches
            .iter()
            .zip(targets)
            .map(|(branch, (a, b))| (g * branch.s - *a * branch.e, h * branch.s - *b * branch.e))
            .collect();

        let mut transcript = Transcript::new(label);
        transcript.append_point(&g).append_point(&h);
        for (a, b) in targets {
            transcript.append_point(a).append_point(b);
        }
        for (t1, t2) in &commitments {
            transcript.append_point(t1).append_point(t2);
        }
        let expected_total = transcript.challenge_scalar();

        let actual_total = self
            .branches
            .iter()
            .fold(Scalar::zero(), |acc, branch| acc + branch.e);

        if actual_total == expected_total {
            Ok(())
        } else {
            Err(Error::ProofInvalid)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABEL: &[u8] = b"test.or_dlogeq";

    #[test]
    fn true_branch_verifies() {
        let mut rng = rand::thread_rng();
        let g = Point::generator();
        let h = Point::generator() * Scalar::random(&mut rng);
        let x = Scalar::random(&mut rng);

        let true_target = (g * x, h * x);
        let decoy1 = (g * Scalar::random(&mut rng), h * Scalar::random(&mut rng));
        let decoy2 = (g * Scalar::random(&mut rng), h * Scalar::random(&mut rng));
        let targets = [decoy1, true_target, decoy2];

        let proof = OrDlogEqProof::prove(LABEL, g, h, &targets, 1, x, &mut rng);
        proof.verify(LABEL, g, h, &targets).unwrap();
    }

    #[test]
    fn no_true_branch_is_rejected() {
        let mut rng = rand::thread_rng();
        let g = Point::generator();
        let h = Point::generator() * Scalar::random(&mut rng);
        let x = Scalar::random(&mut rng);

        // Claim index 0 is true but it isn't: verification must fail since
        // no branch actually satisfies the relation.
        let targets = [
            (g * Scalar::random(&mut rng), h * Scalar::random(&mut rng)),
            (g * x, h * x),
        ];
        let proof = OrDlogEqProof::prove(LABEL, g, h, &targets, 0, x, &mut rng);
        assert!(proof.verify(LABEL, g, h, &targets).is_err());
    }

    #[test]
    fn tampered_target_is_rejected() {
        let mut rng = rand::thread_rng();
        let g = Point::generator();
        let h = Point::generator() * Scalar::random(&mut rng);
        let x = Scalar::random(&mut rng);
        let targets = [(g * x, h * x)];
        let proof = OrDlogEqProof::prove(LABEL, g, h, &targets, 0, x, &mut rng);

        let tampered = [(g * x + g, h * x)];
        assert!(proof.verify(LABEL, g, h, &tampered).is_err());
    }
}
