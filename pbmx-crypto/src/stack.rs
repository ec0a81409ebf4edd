//! Stacks: ordered, content-addressed sequences of [`Mask`]s.

use serde::{Deserialize, Serialize};

use crate::keys::{Fingerprint, FINGERPRINT_BYTES};
use crate::mask::Mask;

/// A content-addressed [`Stack`] identifier: the fingerprint of the stack's
/// canonical byte encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct StackId(Fingerprint);

impl StackId {
    /// Raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_BYTES] {
        self.0.as_bytes()
    }

    /// Wraps a raw fingerprint as a stack Id, e.g. when decoding from the wire.
    pub fn from_fingerprint(fingerprint: Fingerprint) -> Self {
        Self(fingerprint)
    }
}

/// An ordered, immutable sequence of [`Mask`]s.
///
/// Two stacks with the same masks in the same order have the same
/// [`StackId`]; this is how `pbmx-chain` cross-references stacks produced by
/// earlier payloads without assigning them an out-of-band name.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Stack(Vec<Mask>);

impl Stack {
    /// Wraps `masks` into a stack.
    pub fn new(masks: Vec<Mask>) -> Self {
        Self(masks)
    }

    /// The stack's masks, in order.
    pub fn masks(&self) -> &[Mask] {
        &self.0
    }

    /// Number of masks in the stack.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the stack has no masks.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The content-addressed identifier: blake3 of the canonical
    /// bincode-style encoding of the mask sequence, truncated to
    /// [`FINGERPRINT_BYTES`] the same way [`crate::keys::PublicKey::fingerprint`]
    /// derives a party fingerprint from a point encoding.
    pub fn id(&self) -> StackId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"pbmx.stack.id");
        hasher.update(&(self.0.len() as u64).to_le_bytes());
        for mask in &self.0 {
            hasher.update(&mask.c1().to_bytes());
            hasher.update(&mask.c2().to_bytes());
            hasher.update(&mask.remaining().to_le_bytes());
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; FINGERPRINT_BYTES];
        bytes.copy_from_slice(&digest.as_bytes()[..FINGERPRINT_BYTES]);
        StackId(Fingerprint(bytes))
    }
}

impl std::ops::Index<usize> for Stack {
    type Output = Mask;

    fn index(&self, index: usize) -> &Mask {
        &self.0[index]
    }
}

impl IntoIterator for Stack {
    type Item = Mask;
    type IntoIter = std::vec::IntoIter<Mask>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::PrivateKey;
    use crate::token::Token;

    fn sample_stack(h: &crate::keys::SharedKey, rng: &mut impl rand::Rng) -> Stack {
        Stack::new((1..=4).map(|i| Mask::mask(h, Token::new(i).unwrap(), 1, rng).0).collect())
    }

    #[test]
    fn identical_sequences_share_an_id() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let h = sk.public_key();
        let a = sample_stack(&h, &mut rng);
        let b = Stack::new(a.masks().to_vec());
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn reordering_changes_the_id() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let h = sk.public_key();
        let a = sample_stack(&h, &mut rng);
        let mut reordered = a.masks().to_vec();
        reordered.swap(0, 1);
        let b = Stack::new(reordered);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn different_length_changes_the_id() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let h = sk.public_key();
        let a = Stack::new(vec![Mask::mask(&h, Token::new(1).unwrap(), 1, &mut rng).0]);
        let b = Stack::new(vec![]);
        assert_ne!(a.id(), b.id());
    }
}
