//! The closed catalog of move types a block may carry.
//!
//! Runtime polymorphism on [`Payload`] is a tagged variant rather than a
//! class hierarchy: dispatch in [`crate::chain::Chain::validate`] and
//! [`crate::session::Session`]'s replay fold is an exhaustive match. Tag
//! numbers are part of the wire contract; tag 10 is reserved and rejected
//! rather than treated as an unknown future tag.

use pbmx_crypto::proofs::{EntanglementProof, RotationProof, ShuffleProof};
use pbmx_crypto::{Mask, PublicKey, Share, Stack, StackId};

use crate::wire::{Decode, Encode, WireError, WireResult};

/// One move recorded in a block.
#[derive(Clone, Debug)]
pub enum Payload {
    /// Opaque application bytes, not interpreted by the chain.
    Raw(Vec<u8>),
    /// Publishes a party's public key under a display name.
    PublishKey { name: String, key: PublicKey },
    /// Opens a brand-new stack with no provenance proof (e.g. a freshly
    /// masked deck before any shuffle).
    OpenStack { stack: Stack },
    /// Remasks a stack's tokens under fresh randomness, one remask proof per
    /// element.
    MaskStack {
        source: StackId,
        result: Stack,
        proofs: Vec<pbmx_crypto::proofs::DlogEqProof>,
    },
    /// Shuffles a stack under a hidden permutation.
    ShuffleStack { source: StackId, result: Stack, proof: ShuffleProof },
    /// Cyclically shifts a stack by a hidden amount.
    ShiftStack { source: StackId, result: Stack, proof: RotationProof },
    /// (Re)binds a name to a stack Id.
    NameStack { target: StackId, name: String },
    /// Extracts a sub-sequence of a stack by index into a new stack.
    TakeStack { source: StackId, indices: Vec<u64>, result: StackId },
    /// Concatenates several stacks into one.
    PileStacks { sources: Vec<StackId>, result: StackId },
    /// Publishes one party's decryption shares for a stack, one proof per
    /// share.
    PublishShares {
        target: StackId,
        shares: Vec<Share>,
        proofs: Vec<pbmx_crypto::proofs::DlogEqProof>,
    },
    /// Declares a named Rng with a spec string.
    RandomSpec { name: String, spec: String },
    /// Contributes entropy toward a named Rng.
    RandomEntropy { name: String, mask: Mask },
    /// Publishes a reveal share for a named Rng.
    RandomReveal {
        name: String,
        share: Share,
        proof: pbmx_crypto::proofs::DlogEqProof,
    },
    /// Free-form UTF-8 text, e.g. chat.
    Text(String),
    /// Attests that several shuffles shared one hidden permutation.
    ProveEntanglement {
        sources: Vec<StackId>,
        shuffled: Vec<StackId>,
        proof: EntanglementProof,
    },
}

const TAG_RAW: u8 = 1;
const TAG_PUBLISH_KEY: u8 = 2;
const TAG_OPEN_STACK: u8 = 3;
const TAG_MASK_STACK: u8 = 4;
const TAG_SHUFFLE_STACK: u8 = 5;
const TAG_SHIFT_STACK: u8 = 6;
const TAG_NAME_STACK: u8 = 7;
const TAG_TAKE_STACK: u8 = 8;
const TAG_PILE_STACKS: u8 = 9;
const TAG_RESERVED: u8 = 10;
/// Sentinel recognized by [`crate::error::Error`]'s `From<WireError>` impl
/// to surface tag 10 as `Error::ReservedTag` rather than a generic decoding
/// error.
pub(crate) const RESERVED_TAG_MESSAGE: &str = "payload tag 10 is reserved";
const TAG_PUBLISH_SHARES: u8 = 11;
const TAG_RANDOM_SPEC: u8 = 12;
const TAG_RANDOM_ENTROPY: u8 = 13;
const TAG_RANDOM_REVEAL: u8 = 14;
const TAG_TEXT: u8 = 15;
const TAG_PROVE_ENTANGLEMENT: u8 = 16;

impl Encode for Payload {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Payload::Raw(bytes) => {
                TAG_RAW.encode(out);
                bytes.encode(out);
            }
            Payload::PublishKey { name, key } => {
                TAG_PUBLISH_KEY.encode(out);
                name.encode(out);
                key.encode(out);
            }
            Payload::OpenStack { stack } => {
                TAG_OPEN_STACK.encode(out);
                stack.encode(out);
            }
            Payload::MaskStack { source, result, proofs } => {
                TAG_MASK_STACK.encode(out);
                source.encode(out);
                result.encode(out);
                proofs.encode(out);
            }
            Payload::ShuffleStack { source, result, proof } => {
                TAG_SHUFFLE_STACK.encode(out);
                source.encode(out);
                result.encode(out);
                proof.encode(out);
            }
            Payload::ShiftStack { source, result, proof } => {
                TAG_SHIFT_STACK.encode(out);
                source.encode(out);
                result.encode(out);
                proof.encode(out);
            }
            Payload::NameStack { target, name } => {
                TAG_NAME_STACK.encode(out);
                target.encode(out);
                name.encode(out);
            }
            Payload::TakeStack { source, indices, result } => {
                TAG_TAKE_STACK.encode(out);
                source.encode(out);
                indices.encode(out);
                result.encode(out);
            }
            Payload::PileStacks { sources, result } => {
                TAG_PILE_STACKS.encode(out);
                sources.encode(out);
                result.encode(out);
            }
            Payload::PublishShares { target, shares, proofs } => {
                TAG_PUBLISH_SHARES.encode(out);
                target.encode(out);
                shares.encode(out);
                proofs.encode(out);
            }
            Payload::RandomSpec { name, spec } => {
                TAG_RANDOM_SPEC.encode(out);
                name.encode(out);
                spec.encode(out);
            }
            Payload::RandomEntropy { name, mask } => {
                TAG_RANDOM_ENTROPY.encode(out);
                name.encode(out);
                mask.encode(out);
            }
            Payload::RandomReveal { name, share, proof } => {
                TAG_RANDOM_REVEAL.encode(out);
                name.encode(out);
                share.encode(out);
                proof.encode(out);
            }
            Payload::Text(text) => {
                TAG_TEXT.encode(out);
                text.encode(out);
            }
            Payload::ProveEntanglement { sources, shuffled, proof } => {
                TAG_PROVE_ENTANGLEMENT.encode(out);
                sources.encode(out);
                shuffled.encode(out);
                proof.encode(out);
            }
        }
    }
}

impl Decode for Payload {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        let tag = u8::decode(buf)?;
        match tag {
            TAG_RAW => Ok(Payload::Raw(Vec::decode(buf)?)),
            TAG_PUBLISH_KEY => Ok(Payload::PublishKey {
                name: String::decode(buf)?,
                key: PublicKey::decode(buf)?,
            }),
            TAG_OPEN_STACK => Ok(Payload::OpenStack { stack: Stack::decode(buf)? }),
            TAG_MASK_STACK => Ok(Payload::MaskStack {
                source: StackId::decode(buf)?,
                result: Stack::decode(buf)?,
                proofs: Vec::decode(buf)?,
            }),
            TAG_SHUFFLE_STACK => Ok(Payload::ShuffleStack {
                source: StackId::decode(buf)?,
                result: Stack::decode(buf)?,
                proof: ShuffleProof::decode(buf)?,
            }),
            TAG_SHIFT_STACK => Ok(Payload::ShiftStack {
                source: StackId::decode(buf)?,
                result: Stack::decode(buf)?,
                proof: RotationProof::decode(buf)?,
            }),
            TAG_NAME_STACK => Ok(Payload::NameStack {
                target: StackId::decode(buf)?,
                name: String::decode(buf)?,
            }),
            TAG_TAKE_STACK => Ok(Payload::TakeStack {
                source: StackId::decode(buf)?,
                indices: Vec::decode(buf)?,
                result: StackId::decode(buf)?,
            }),
            TAG_PILE_STACKS => Ok(Payload::PileStacks {
                sources: Vec::decode(buf)?,
                result: StackId::decode(buf)?,
            }),
            TAG_PUBLISH_SHARES => Ok(Payload::PublishShares {
                target: StackId::decode(buf)?,
                shares: Vec::decode(buf)?,
                proofs: Vec::decode(buf)?,
            }),
            TAG_RANDOM_SPEC => Ok(Payload::RandomSpec {
                name: String::decode(buf)?,
                spec: String::decode(buf)?,
            }),
            TAG_RANDOM_ENTROPY => Ok(Payload::RandomEntropy {
                name: String::decode(buf)?,
                mask: Mask::decode(buf)?,
            }),
            TAG_RANDOM_REVEAL => Ok(Payload::RandomReveal {
                name: String::decode(buf)?,
                share: Share::decode(buf)?,
                proof: pbmx_crypto::proofs::DlogEqProof::decode(buf)?,
            }),
            TAG_TEXT => Ok(Payload::Text(String::decode(buf)?)),
            TAG_PROVE_ENTANGLEMENT => Ok(Payload::ProveEntanglement {
                sources: Vec::decode(buf)?,
                shuffled: Vec::decode(buf)?,
                proof: EntanglementProof::decode(buf)?,
            }),
            TAG_RESERVED => Err(WireError(RESERVED_TAG_MESSAGE.to_string())),
            other => Err(WireError(format!("unknown payload tag {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbmx_crypto::PrivateKey;

    #[test]
    fn text_payload_roundtrips() {
        let payload = Payload::Text("gg".to_string());
        let mut out = Vec::new();
        payload.encode(&mut out);
        let mut buf = out.as_slice();
        let decoded = Payload::decode(&mut buf).unwrap();
        assert!(matches!(decoded, Payload::Text(s) if s == "gg"));
        assert!(buf.is_empty());
    }

    #[test]
    fn publish_key_payload_roundtrips() {
        let mut rng = rand::thread_rng();
        let key = PrivateKey::random(&mut rng).public_key();
        let payload = Payload::PublishKey { name: "alice".to_string(), key };
        let mut out = Vec::new();
        payload.encode(&mut out);
        let mut buf = out.as_slice();
        match Payload::decode(&mut buf).unwrap() {
            Payload::PublishKey { name, key: decoded } => {
                assert_eq!(name, "alice");
                assert_eq!(decoded, key);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn reserved_tag_is_rejected() {
        let mut buf: &[u8] = &[TAG_RESERVED];
        let err: crate::error::Error = Payload::decode(&mut buf).unwrap_err().into();
        assert!(matches!(err, crate::error::Error::ReservedTag));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut buf: &[u8] = &[99];
        assert!(Payload::decode(&mut buf).is_err());
    }
}
