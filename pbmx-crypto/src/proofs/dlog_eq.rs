//! Non-distributed Chaum-Pedersen discrete-log-equality proof.
//!
//! PBMX never reconstructs a secret from a threshold subset: every party
//! holds a full key share and *all* shares are required (additive, n-of-n),
//! so this is the plain single-prover Chaum-Pedersen sigma protocol,
//! Fiat-Shamir transformed with the shared [`Transcript`].

use pbmx_curve::{Point, Scalar};
use rand::{CryptoRng, Rng};

use crate::error::{Error, Result};
use crate::transcript::Transcript;

/// Proof that `a = x*g` and `b = x*h` for the same secret `x`, without
/// revealing `x`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DlogEqProof {
    pub(crate) e: Scalar,
    pub(crate) s: Scalar,
}

impl DlogEqProof {
    /// Proves knowledge of `x` such that `a = x*g`, `b = x*h`.
    pub fn prove<R: Rng + CryptoRng>(
        label: &'static [u8],
        g: Point,
        h: Point,
        a: Point,
        b: Point,
        x: Scalar,
        rng: &mut R,
    ) -> Self {
        let k = Scalar::random(rng);
        let k1 = g * k;
        let k2 = h * k;

        let mut transcript = Transcript::new(label);
        transcript
            .append_point(&g)
            .append_point(&h)
            .append_point(&a)
            .append_point(&b)
            .append_point(&k1)
            .append_point(&k2);
        let e = transcript.challenge_scalar();
        let s = k + e * x;
        Self { e, s }
    }

    /// Verifies the proof against the public statement `(g, h, a, b)`.
    pub fn verify(&self, label: &'static [u8], g: Point, h: Point, a: Point, b: Point) -> Result<()> {
        let k1 = g * self.s - a * self.e;
        let k2 = h * self.s - b * self.e;

        let mut transcript = Transcript::new(label);
        transcript
            .append_point(&g)
            .append_point(&h)
            .append_point(&a)
            .append_point(&b)
            .append_point(&k1)
            .append_point(&k2);
        let expected = transcript.challenge_scalar();

        if expected == self.e {
            Ok(())
        } else {
            Err(Error::ProofInvalid)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABEL: &[u8] = b"test.dlogeq";

    #[test]
    fn valid_proof_verifies() {
        let mut rng = rand::thread_rng();
        let g = Point::generator();
        let h = Point::generator() * Scalar::random(&mut rng);
        let x = Scalar::random(&mut rng);
        let a = g * x;
        let b = h * x;

        let proof = DlogEqProof::prove(LABEL, g, h, a, b, x, &mut rng);
        proof.verify(LABEL, g, h, a, b).unwrap();
    }

    #[test]
    fn mismatched_witness_is_rejected() {
        let mut rng = rand::thread_rng();
        let g = Point::generator();
        let h = Point::generator() * Scalar::random(&mut rng);
        let x = Scalar::random(&mut rng);
        let y = Scalar::random(&mut rng);
        let a = g * x;
        let b = h * y;

        let proof = DlogEqProof::prove(LABEL, g, h, a, b, x, &mut rng);
        assert!(proof.verify(LABEL, g, h, a, b).is_err());
    }

    #[test]
    fn tampered_statement_is_rejected() {
        let mut rng = rand::thread_rng();
        let g = Point::generator();
        let h = Point::generator() * Scalar::random(&mut rng);
        let x = Scalar::random(&mut rng);
        let a = g * x;
        let b = h * x;
        let proof = DlogEqProof::prove(LABEL, g, h, a, b, x, &mut rng);

        let other_a = a + Point::generator();
        assert!(proof.verify(LABEL, g, h, other_a, b).is_err());
    }
}
