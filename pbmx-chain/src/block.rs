//! Blocks: a signed, content-addressed batch of payloads acknowledging zero
//! or more parent blocks.

use pbmx_crypto::{Fingerprint, PrivateKey, PublicKey, Signature, FINGERPRINT_BYTES};

use crate::error::{Error, Result};
use crate::payload::Payload;
use crate::wire::{Decode, Encode, WireResult};

const BLOCK_ID_LABEL: &[u8] = b"pbmx.block.id";

/// A content-addressed block identifier: the fingerprint of the block's
/// canonical pre-signature encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct BlockId(Fingerprint);

impl BlockId {
    /// Raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_BYTES] {
        self.0.as_bytes()
    }

    /// Wraps a raw fingerprint as a block Id, e.g. when decoding from the
    /// wire.
    pub fn from_fingerprint(fingerprint: Fingerprint) -> Self {
        Self(fingerprint)
    }
}

/// One signed entry in the chain: a set of acknowledged parents plus the
/// payloads this block contributes.
///
/// A block's [`BlockId`] is derived from its content, not assigned: two
/// parties independently building the identical block (same acks, same
/// payloads, same signer) get the identical Id, the same content-addressing
/// discipline [`pbmx_crypto::Stack::id`] uses for stacks.
#[derive(Clone, Debug)]
pub struct Block {
    acks: Vec<BlockId>,
    payloads: Vec<Payload>,
    signer: Fingerprint,
    signature: Signature,
}

impl Block {
    /// Builds and signs a block over `acks` (deduplicated and sorted) and
    /// `payloads`.
    pub fn create<R: rand::Rng + rand::CryptoRng>(
        mut acks: Vec<BlockId>,
        payloads: Vec<Payload>,
        sk: &PrivateKey,
        rng: &mut R,
    ) -> Self {
        acks.sort();
        acks.dedup();
        let signer = sk.public_key().fingerprint();
        let preimage = Self::preimage(&acks, &payloads, &signer);
        let signature = Signature::sign(sk, &preimage, rng);
        Self {
            acks,
            payloads,
            signer,
            signature,
        }
    }

    fn preimage(acks: &[BlockId], payloads: &[Payload], signer: &Fingerprint) -> Vec<u8> {
        let mut out = Vec::new();
        (acks.len() as u64).encode(&mut out);
        for ack in acks {
            out.extend_from_slice(ack.as_bytes());
        }
        payloads.to_vec().encode(&mut out);
        signer.encode(&mut out);
        out
    }

    /// The parent blocks this block acknowledges.
    pub fn acks(&self) -> &[BlockId] {
        &self.acks
    }

    /// The payloads carried by this block, in order.
    pub fn payloads(&self) -> &[Payload] {
        &self.payloads
    }

    /// The fingerprint of the signing party.
    pub fn signer(&self) -> Fingerprint {
        self.signer
    }

    /// The block's signature over its own content.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Verifies the block's signature against `signer_key`, whose
    /// fingerprint must match [`Block::signer`].
    pub fn verify_signature(&self, signer_key: &PublicKey) -> Result<()> {
        if signer_key.fingerprint() != self.signer {
            return Err(Error::ChainIntegrity("signing key does not match block's signer fingerprint".to_string()));
        }
        let preimage = Self::preimage(&self.acks, &self.payloads, &self.signer);
        self.signature.verify(signer_key, &preimage).map_err(|_| Error::ProofInvalid)
    }

    /// The content-addressed identifier of this block.
    pub fn id(&self) -> BlockId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(BLOCK_ID_LABEL);
        let preimage = Self::preimage(&self.acks, &self.payloads, &self.signer);
        hasher.update(&preimage);
        hasher.update(&self.signature.r().to_bytes());
        hasher.update(&self.signature.s().to_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; FINGERPRINT_BYTES];
        bytes.copy_from_slice(&digest.as_bytes()[..FINGERPRINT_BYTES]);
        BlockId(Fingerprint(bytes))
    }
}

impl Encode for BlockId {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.0.as_bytes());
    }
}

impl Decode for BlockId {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        let fingerprint = Fingerprint::decode(buf)?;
        Ok(BlockId(fingerprint))
    }
}

impl Encode for Block {
    fn encode(&self, out: &mut Vec<u8>) {
        self.acks.encode(out);
        self.payloads.to_vec().encode(out);
        self.signer.encode(out);
        self.signature.encode(out);
    }
}

impl Decode for Block {
    fn decode(buf: &mut &[u8]) -> WireResult<Self> {
        Ok(Self {
            acks: Vec::decode(buf)?,
            payloads: Vec::decode(buf)?,
            signer: Fingerprint::decode(buf)?,
            signature: Signature::decode(buf)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Payload;

    #[test]
    fn block_signature_verifies() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let block = Block::create(vec![], vec![Payload::Text("hi".to_string())], &sk, &mut rng);
        block.verify_signature(&sk.public_key()).unwrap();
    }

    #[test]
    fn wrong_key_is_rejected() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let other = PrivateKey::random(&mut rng);
        let block = Block::create(vec![], vec![Payload::Text("hi".to_string())], &sk, &mut rng);
        assert!(block.verify_signature(&other.public_key()).is_err());
    }

    #[test]
    fn acks_are_sorted_and_deduped() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let a = Block::create(vec![], vec![], &sk, &mut rng).id();
        let b = Block::create(vec![], vec![Payload::Text("x".to_string())], &sk, &mut rng).id();
        let block = Block::create(vec![b, a, b], vec![], &sk, &mut rng);
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(block.acks().to_vec(), expected);
    }

    #[test]
    fn block_roundtrips_through_wire() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let block = Block::create(vec![], vec![Payload::Text("hi".to_string())], &sk, &mut rng);
        let mut out = Vec::new();
        block.encode(&mut out);
        let mut buf = out.as_slice();
        let decoded = Block::decode(&mut buf).unwrap();
        assert!(buf.is_empty());
        assert_eq!(decoded.id(), block.id());
    }

    #[test]
    fn decoding_preserves_signature_validity() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let pk = sk.public_key();
        let a = Block::create(vec![], vec![Payload::Text("x".to_string())], &sk, &mut rng);
        let mut out = Vec::new();
        a.encode(&mut out);
        let mut buf = out.as_slice();
        let decoded = Block::decode(&mut buf).unwrap();
        decoded.verify_signature(&pk).unwrap();
    }
}
