//! The canonical length-delimited tagged-field wire codec.
//!
//! Every type that crosses the wire gets its own explicit, hand-written
//! [`Encode`]/[`Decode`] impl rather than a generic derive, so the byte
//! layout used for hashing (Fiat-Shamir, block Ids) is the same one used for
//! disk/network transfer. `pbmx-chain` reuses these traits for its own
//! block/payload types rather than defining a second codec.

use pbmx_curve::{Point, Scalar, POINT_BYTES, SCALAR_BYTES};

use crate::keys::{Fingerprint, PublicKey, FINGERPRINT_BYTES};
use crate::mask::{Mask, Share};
use crate::proofs::dlog_eq::DlogEqProof;
use crate::proofs::entanglement::EntanglementProof;
use crate::proofs::or_dlogeq::{BranchResponse, OrDlogEqProof};
use crate::proofs::rotation::RotationProof;
use crate::proofs::shuffle::{GateProof as ShuffleGateProof, ShuffleProof};
use crate::signature::Signature;
use crate::stack::{Stack, StackId};

/// A decoding failure, carrying a human-readable description. Each crate's
/// own error type converts this into its own `Decoding` variant at the
/// crate boundary.
#[derive(Debug, Clone)]
pub struct WireError(pub String);

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed wire encoding: {}", self.0)
    }
}

impl std::error::Error for WireError {}

/// Convenience alias for [`Decode::decode`] results.
pub type WireResult<T> = std::result::Result<T, WireError>;

/// A type with a canonical byte encoding.
pub trait Encode {
    /// Appends this value's canonical encoding to `out`.
    fn encode(&self, out: &mut Vec<u8>);

    /// Convenience: encodes into a fresh buffer.
    fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }
}

/// The inverse of [`Encode`]: consumes bytes from the front of `buf`.
pub trait Decode: Sized {
    /// Decodes one value, advancing `buf` past the bytes it consumed.
    fn decode(buf: &mut &[u8]) -> WireResult<Self>;
}

fn take<'a>(buf: &mut &'a [u8], n: usize) -> WireResult<&'a [u8]> {
    if buf.len() < n {
        return Err(WireError(format!("expected {n} bytes, got {}", buf.len())));
    }
    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

impl Encode for u8 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }
}

impl Decode for u8 {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        Ok(take(buf, 1)?[0])
    }
}

impl Encode for bool {
    fn encode(&self, out: &mut Vec<u8>) {
        (*self as u8).encode(out);
    }
}

impl Decode for bool {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        match u8::decode(buf)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WireError(format!("invalid bool byte {other}"))),
        }
    }
}

impl Encode for u32 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Decode for u32 {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        let bytes = take(buf, 4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }
}

impl Encode for u64 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Decode for u64 {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        let bytes = take(buf, 8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }
}

impl Encode for Vec<u8> {
    fn encode(&self, out: &mut Vec<u8>) {
        (self.len() as u64).encode(out);
        out.extend_from_slice(self);
    }
}

impl Decode for Vec<u8> {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        let len = u64::decode(buf)? as usize;
        Ok(take(buf, len)?.to_vec())
    }
}

impl Encode for String {
    fn encode(&self, out: &mut Vec<u8>) {
        self.as_bytes().to_vec().encode(out);
    }
}

impl Decode for String {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        let bytes = Vec::decode(buf)?;
        String::from_utf8(bytes).map_err(|e| WireError(e.to_string()))
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, out: &mut Vec<u8>) {
        (self.len() as u64).encode(out);
        for item in self {
            item.encode(out);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        let len = u64::decode(buf)? as usize;
        (0..len).map(|_| T::decode(buf)).collect()
    }
}

impl Encode for Point {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_bytes());
    }
}

impl Decode for Point {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        let bytes = take(buf, POINT_BYTES)?;
        Point::decode(bytes).map_err(|e| WireError(e.to_string()))
    }
}

impl Encode for Scalar {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_bytes());
    }
}

impl Decode for Scalar {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        let bytes = take(buf, SCALAR_BYTES)?;
        Scalar::from_bytes(bytes).map_err(|e| WireError(e.to_string()))
    }
}

impl Encode for Fingerprint {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }
}

impl Decode for Fingerprint {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        let bytes = take(buf, FINGERPRINT_BYTES)?;
        let mut array = [0u8; FINGERPRINT_BYTES];
        array.copy_from_slice(bytes);
        Ok(Fingerprint(array))
    }
}

impl Encode for StackId {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }
}

impl Decode for StackId {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        let fingerprint = Fingerprint::decode(buf)?;
        Ok(StackId::from_fingerprint(fingerprint))
    }
}

impl Encode for PublicKey {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_bytes());
    }
}

impl Decode for PublicKey {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        let bytes = take(buf, POINT_BYTES)?;
        PublicKey::from_bytes(bytes).map_err(|e| WireError(e.to_string()))
    }
}

impl Encode for Mask {
    fn encode(&self, out: &mut Vec<u8>) {
        self.c1().encode(out);
        self.c2().encode(out);
        self.remaining().encode(out);
    }
}

impl Decode for Mask {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        let c1 = Point::decode(buf)?;
        let c2 = Point::decode(buf)?;
        let remaining = u32::decode(buf)?;
        Ok(Mask::from_parts(c1, c2, remaining))
    }
}

impl Encode for Share {
    fn encode(&self, out: &mut Vec<u8>) {
        self.point().encode(out);
    }
}

impl Decode for Share {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        Ok(Share::from_point(Point::decode(buf)?))
    }
}

impl Encode for Stack {
    fn encode(&self, out: &mut Vec<u8>) {
        self.masks().to_vec().encode(out);
    }
}

impl Decode for Stack {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        Ok(Stack::new(Vec::<Mask>::decode(buf)?))
    }
}

impl Encode for DlogEqProof {
    fn encode(&self, out: &mut Vec<u8>) {
        self.e.encode(out);
        self.s.encode(out);
    }
}

impl Decode for DlogEqProof {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        let e = Scalar::decode(buf)?;
        let s = Scalar::decode(buf)?;
        Ok(DlogEqProof { e, s })
    }
}

impl Encode for OrDlogEqProof {
    fn encode(&self, out: &mut Vec<u8>) {
        (self.branches.len() as u64).encode(out);
        for branch in &self.branches {
            branch.e.encode(out);
            branch.s.encode(out);
        }
    }
}

impl Decode for OrDlogEqProof {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        let len = u64::decode(buf)? as usize;
        let mut branches = Vec::with_capacity(len);
        for _ in 0..len {
            let e = Scalar::decode(buf)?;
            let s = Scalar::decode(buf)?;
            branches.push(BranchResponse { e, s });
        }
        Ok(OrDlogEqProof { branches })
    }
}

impl Encode for RotationProof {
    fn encode(&self, out: &mut Vec<u8>) {
        self.or_proof.encode(out);
    }
}

impl Decode for RotationProof {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        Ok(RotationProof {
            or_proof: OrDlogEqProof::decode(buf)?,
        })
    }
}

const GATE_TAG_PAIR: u8 = 0;
const GATE_TAG_SINGLE: u8 = 1;

impl Encode for ShuffleGateProof {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            ShuffleGateProof::Pair(proof) => {
                GATE_TAG_PAIR.encode(out);
                proof.encode(out);
            }
            ShuffleGateProof::Single(proof) => {
                GATE_TAG_SINGLE.encode(out);
                proof.encode(out);
            }
        }
    }
}

impl Decode for ShuffleGateProof {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        match u8::decode(buf)? {
            GATE_TAG_PAIR => Ok(ShuffleGateProof::Pair(OrDlogEqProof::decode(buf)?)),
            GATE_TAG_SINGLE => Ok(ShuffleGateProof::Single(DlogEqProof::decode(buf)?)),
            other => Err(WireError(format!("unknown gate proof tag {other}"))),
        }
    }
}

impl Encode for ShuffleProof {
    fn encode(&self, out: &mut Vec<u8>) {
        self.gates.encode(out);
        self.intermediate.encode(out);
    }
}

impl Decode for ShuffleProof {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        Ok(ShuffleProof {
            gates: Vec::decode(buf)?,
            intermediate: Vec::decode(buf)?,
        })
    }
}

use crate::proofs::entanglement::GateProof as EntanglementGateProof;

impl Encode for EntanglementGateProof {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            EntanglementGateProof::Pair(proof) => {
                GATE_TAG_PAIR.encode(out);
                proof.encode(out);
            }
            EntanglementGateProof::Single(proof) => {
                GATE_TAG_SINGLE.encode(out);
                proof.encode(out);
            }
        }
    }
}

impl Decode for EntanglementGateProof {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        match u8::decode(buf)? {
            GATE_TAG_PAIR => Ok(EntanglementGateProof::Pair(OrDlogEqProof::decode(buf)?)),
            GATE_TAG_SINGLE => Ok(EntanglementGateProof::Single(DlogEqProof::decode(buf)?)),
            other => Err(WireError(format!("unknown gate proof tag {other}"))),
        }
    }
}

impl Encode for EntanglementProof {
    fn encode(&self, out: &mut Vec<u8>) {
        self.gates.encode(out);
        (self.intermediate.len() as u64).encode(out);
        for round in &self.intermediate {
            round.encode(out);
        }
    }
}

impl Decode for EntanglementProof {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        let gates = Vec::decode(buf)?;
        let len = u64::decode(buf)? as usize;
        let mut intermediate = Vec::with_capacity(len);
        for _ in 0..len {
            intermediate.push(Vec::<Vec<Mask>>::decode(buf)?);
        }
        Ok(EntanglementProof { gates, intermediate })
    }
}

impl Encode for Signature {
    fn encode(&self, out: &mut Vec<u8>) {
        self.r().encode(out);
        self.s().encode(out);
    }
}

impl Decode for Signature {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        let r = Point::decode(buf)?;
        let s = Scalar::decode(buf)?;
        Ok(Signature::from_parts(r, s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::PrivateKey;
    use crate::proofs::shuffle::ShuffleProof;
    use crate::token::Token;

    #[test]
    fn u64_roundtrips() {
        let mut out = Vec::new();
        42u64.encode(&mut out);
        let mut buf = out.as_slice();
        assert_eq!(u64::decode(&mut buf).unwrap(), 42);
        assert!(buf.is_empty());
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let mut buf: &[u8] = &[0u8, 1, 2];
        assert!(u64::decode(&mut buf).is_err());
    }

    #[test]
    fn point_roundtrips() {
        let mut rng = rand::thread_rng();
        let p = Point::generator() * Scalar::random(&mut rng);
        let mut out = Vec::new();
        p.encode(&mut out);
        let mut buf = out.as_slice();
        assert_eq!(Point::decode(&mut buf).unwrap(), p);
    }

    #[test]
    fn shuffle_proof_roundtrips() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let h = sk.public_key();
        let before: Vec<Mask> = (1..=4).map(|i| Mask::mask(&h, Token::new(i).unwrap(), 1, &mut rng).0).collect();
        let dest = vec![2, 0, 3, 1];
        let (proof, after) = ShuffleProof::prove(&h, &before, &dest, &mut rng).unwrap();

        let mut out = Vec::new();
        proof.encode(&mut out);
        let mut buf = out.as_slice();
        let decoded = ShuffleProof::decode(&mut buf).unwrap();
        assert!(buf.is_empty());
        decoded.verify(&h, &before, &after).unwrap();
    }
}
