//! Schnorr signatures over the PBMX group.
//!
//! `pbmx-chain` signs blocks with these: built from the same
//! [`Transcript`]/sigma-protocol shape as the rest of the proof suite rather
//! than pulling in a second signature crate for the one place this workspace
//! needs one.

use pbmx_curve::{Point, Scalar};
use rand::{CryptoRng, Rng};

use crate::error::{Error, Result};
use crate::keys::{PrivateKey, PublicKey};
use crate::transcript::Transcript;

const SIGNATURE_LABEL: &[u8] = b"pbmx.signature";

/// A Schnorr signature over an arbitrary message.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Signature {
    r: Point,
    s: Scalar,
}

fn challenge(r: Point, pk: &PublicKey, message: &[u8]) -> Scalar {
    let mut transcript = Transcript::new(SIGNATURE_LABEL);
    transcript.append_point(&r).append_point(&pk.point()).append_bytes(message);
    transcript.challenge_scalar()
}

impl Signature {
    /// Signs `message` with `sk`.
    pub fn sign<R: Rng + CryptoRng>(sk: &PrivateKey, message: &[u8], rng: &mut R) -> Self {
        let k = Scalar::random(rng);
        let r = Point::generator() * k;
        let e = challenge(r, &sk.public_key(), message);
        let s = k + e * sk.scalar();
        Self { r, s }
    }

    /// Verifies the signature against `message` and the signer's `pk`.
    pub fn verify(&self, pk: &PublicKey, message: &[u8]) -> Result<()> {
        let e = challenge(self.r, pk, message);
        let lhs = Point::generator() * self.s;
        let rhs = self.r + pk.point() * e;
        if lhs == rhs {
            Ok(())
        } else {
            Err(Error::ProofInvalid)
        }
    }

    /// The commitment component `R`, used by wire encoding.
    pub fn r(&self) -> Point {
        self.r
    }

    /// The response component `s`, used by wire encoding.
    pub fn s(&self) -> Scalar {
        self.s
    }

    /// Rebuilds a signature from its wire-decoded components.
    pub fn from_parts(r: Point, s: Scalar) -> Self {
        Self { r, s }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_signature_verifies() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let pk = sk.public_key();
        let message = b"block contents";
        let sig = Signature::sign(&sk, message, &mut rng);
        sig.verify(&pk, message).unwrap();
    }

    #[test]
    fn wrong_signer_is_rejected() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let other = PrivateKey::random(&mut rng).public_key();
        let message = b"block contents";
        let sig = Signature::sign(&sk, message, &mut rng);
        assert!(sig.verify(&other, message).is_err());
    }

    #[test]
    fn tampered_message_is_rejected() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let pk = sk.public_key();
        let sig = Signature::sign(&sk, b"original", &mut rng);
        assert!(sig.verify(&pk, b"tampered").is_err());
    }
}
