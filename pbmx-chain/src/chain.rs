//! The append-only DAG of signed blocks, and validation/replay over it.

use std::collections::{BTreeSet, HashMap, HashSet};

use pbmx_crypto::PublicKey;
use tracing::instrument;

use crate::block::{Block, BlockId};
use crate::error::{Error, Result};
use crate::payload::Payload;
use crate::session::Session;

/// The signed block DAG: a map keyed by content-addressed [`BlockId`].
///
/// Mutated only through [`Chain::append`], which validates a candidate block
/// against a replay of the existing chain before ever touching the map, so a
/// failing block leaves the chain untouched.
#[derive(Clone, Debug, Default)]
pub struct Chain {
    blocks: HashMap<BlockId, Block>,
}

impl Chain {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// All blocks in the chain, unordered.
    pub fn blocks(&self) -> impl Iterator<Item = (&BlockId, &Block)> {
        self.blocks.iter()
    }

    /// Looks up one block by Id.
    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    /// Whether the chain has no blocks.
    pub fn empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Whether any block in the chain acks an Id the chain does not have.
    pub fn incomplete(&self) -> bool {
        self.blocks.values().any(|b| b.acks().iter().any(|ack| !self.blocks.contains_key(ack)))
    }

    /// Blocks with no acks: the bootstrapping entries of the DAG.
    pub fn roots(&self) -> BTreeSet<BlockId> {
        self.blocks.iter().filter(|(_, b)| b.acks().is_empty()).map(|(id, _)| *id).collect()
    }

    /// Blocks no other block in the chain acks: the current frontier.
    pub fn heads(&self) -> BTreeSet<BlockId> {
        let acked: HashSet<BlockId> = self.blocks.values().flat_map(|b| b.acks().iter().copied()).collect();
        self.blocks.keys().copied().filter(|id| !acked.contains(id)).collect()
    }

    /// Whether the chain has converged on a single head.
    pub fn merged(&self) -> bool {
        self.heads().len() == 1
    }

    /// The acked parents of `id`, or an empty slice if `id` is not present.
    pub fn parents_of(&self, id: &BlockId) -> &[BlockId] {
        self.blocks.get(id).map(Block::acks).unwrap_or(&[])
    }

    /// A canonical topological order over the chain: Kahn's algorithm, with
    /// blocks that become ready simultaneously broken by Id ascending so
    /// every party folds payloads in the identical order regardless of the
    /// order blocks were appended in.
    fn topological_order(&self) -> Vec<BlockId> {
        let mut pending: HashMap<BlockId, usize> =
            self.blocks.iter().map(|(id, b)| (*id, b.acks().len())).collect();
        let mut children: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
        for (id, block) in &self.blocks {
            for ack in block.acks() {
                children.entry(*ack).or_default().push(*id);
            }
        }

        let mut ready: BTreeSet<BlockId> =
            pending.iter().filter(|(_, &n)| n == 0).map(|(id, _)| *id).collect();
        let mut order = Vec::with_capacity(self.blocks.len());
        while let Some(id) = ready.iter().next().copied() {
            ready.remove(&id);
            order.push(id);
            if let Some(kids) = children.get(&id) {
                for child in kids {
                    if let Some(count) = pending.get_mut(child) {
                        *count -= 1;
                        if *count == 0 {
                            ready.insert(*child);
                        }
                    }
                }
            }
        }
        order
    }

    /// Folds every block's payloads, in canonical topological order, into
    /// fresh derived [`Session`] state.
    pub fn replay(&self) -> Result<Session> {
        let mut session = Session::new();
        for id in self.topological_order() {
            session.apply_block(&self.blocks[&id])?;
        }
        Ok(session)
    }

    /// Checks `block` against the chain without mutating it, returning the
    /// [`Session`] state that would result from appending it.
    #[instrument(level = "debug", skip_all, fields(block = ?block.id()))]
    pub fn validate(&self, block: &Block) -> Result<Session> {
        tracing::debug!("checking ack ordering");
        if !block.acks().windows(2).all(|w| w[0] < w[1]) {
            let err = Error::ChainIntegrity("acks are not strictly sorted (unsorted or duplicate parent)".to_string());
            tracing::warn!(kind = err.kind(), "rejecting block: ack ordering violation");
            return Err(err);
        }

        tracing::debug!("checking acks");
        for ack in block.acks() {
            if !self.blocks.contains_key(ack) {
                let err = Error::ChainIntegrity(format!("ack {ack:?} is not in the chain"));
                tracing::warn!(kind = err.kind(), "rejecting block: dangling ack");
                return Err(err);
            }
        }

        tracing::debug!("replaying chain to derive signer's key");
        let mut session = self.replay()?;
        let signer_key = match session.key_of(block.signer()) {
            Some(key) => key,
            None => Self::bootstrap_key(block).inspect_err(|e| {
                tracing::warn!(kind = %e.kind(), "rejecting block: unknown signer");
            })?,
        };

        tracing::debug!("verifying signature");
        block.verify_signature(&signer_key).inspect_err(|e| {
            tracing::warn!(kind = %e.kind(), "rejecting block: bad signature");
        })?;

        tracing::debug!("folding payloads");
        session.apply_block(block).inspect_err(|e| {
            tracing::warn!(kind = %e.kind(), "rejecting block: payload fold failed");
        })?;
        Ok(session)
    }

    /// A root block is its own signer's first publication: if the chain
    /// doesn't know the signer yet, look for a matching `publish_key`
    /// payload inside the candidate block itself.
    fn bootstrap_key(block: &Block) -> Result<PublicKey> {
        block
            .payloads()
            .iter()
            .find_map(|p| match p {
                Payload::PublishKey { key, .. } if key.fingerprint() == block.signer() => Some(*key),
                _ => None,
            })
            .ok_or_else(|| Error::ChainIntegrity("unknown signer and no self-published key in block".to_string()))
    }

    /// Validates and appends `block`. On any failure the chain is left
    /// exactly as it was.
    #[instrument(level = "debug", skip_all, fields(block = ?block.id()))]
    pub fn append(&mut self, block: Block) -> Result<()> {
        self.validate(&block)?;
        tracing::debug!("appended");
        self.blocks.insert(block.id(), block);
        Ok(())
    }

    /// Inserts a block without validation, e.g. when restoring a chain from
    /// local storage that was already validated before it was persisted.
    /// Does not check acks, signature, or proofs: a chain reconstructed this
    /// way may be [`Chain::incomplete`] if the storage layer lost a block.
    pub fn insert_unchecked(&mut self, block: Block) {
        self.blocks.insert(block.id(), block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Payload;
    use crate::wire::{Decode, Encode};
    use pbmx_crypto::PrivateKey;

    /// Re-encodes `block`'s wire bytes with its acks replaced by
    /// `acks`, leaving payloads/signer/signature untouched. Lets tests
    /// hand-craft the unsorted/duplicate-ack wire bytes a legitimate
    /// `Block::create` caller (which always sorts and dedups) can never
    /// produce, simulating an adversary crafting bytes directly.
    fn with_raw_acks(block: &Block, acks: Vec<BlockId>) -> Block {
        let mut out = Vec::new();
        acks.encode(&mut out);
        block.payloads().to_vec().encode(&mut out);
        block.signer().encode(&mut out);
        block.signature().encode(&mut out);
        Block::decode(&mut out.as_slice()).unwrap()
    }

    #[test]
    fn key_exchange_converges_to_same_shared_key() {
        let mut rng = rand::thread_rng();
        let sk1 = PrivateKey::random(&mut rng);
        let sk2 = PrivateKey::random(&mut rng);

        let b1 = Block::create(vec![], vec![Payload::PublishKey { name: "alice".to_string(), key: sk1.public_key() }], &sk1, &mut rng);
        let b2 = Block::create(vec![], vec![Payload::PublishKey { name: "bob".to_string(), key: sk2.public_key() }], &sk2, &mut rng);

        let mut chain_a = Chain::new();
        chain_a.append(b1.clone()).unwrap();
        chain_a.append(b2.clone()).unwrap();

        let mut chain_b = Chain::new();
        chain_b.append(b2).unwrap();
        chain_b.append(b1).unwrap();

        let session_a = chain_a.replay().unwrap();
        let session_b = chain_b.replay().unwrap();
        assert_eq!(session_a.shared_key().fingerprint(), session_b.shared_key().fingerprint());
    }

    #[test]
    fn unknown_signer_is_rejected() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let other = PrivateKey::random(&mut rng);
        let mut chain = Chain::new();
        chain
            .append(Block::create(vec![], vec![Payload::PublishKey { name: "alice".to_string(), key: sk.public_key() }], &sk, &mut rng))
            .unwrap();

        let bad = Block::create(vec![], vec![Payload::Text("hi".to_string())], &other, &mut rng);
        assert!(chain.append(bad).is_err());
        assert_eq!(chain.blocks().count(), 1);
    }

    #[test]
    fn missing_ack_is_rejected() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let ghost = Block::create(vec![], vec![], &sk, &mut rng).id();
        let block = Block::create(
            vec![ghost],
            vec![Payload::PublishKey { name: "alice".to_string(), key: sk.public_key() }],
            &sk,
            &mut rng,
        );
        let mut chain = Chain::new();
        assert!(chain.append(block).is_err());
        assert!(chain.empty());
    }

    #[test]
    fn unsorted_acks_are_rejected_even_when_hand_crafted_on_the_wire() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let mut chain = Chain::new();

        let a = Block::create(vec![], vec![Payload::PublishKey { name: "alice".to_string(), key: sk.public_key() }], &sk, &mut rng);
        let b = Block::create(vec![], vec![Payload::Text("root2".to_string())], &sk, &mut rng);
        chain.append(a.clone()).unwrap();
        chain.append(b.clone()).unwrap();

        let (lo, hi) = if a.id() < b.id() { (a.id(), b.id()) } else { (b.id(), a.id()) };
        let child = Block::create(vec![lo, hi], vec![], &sk, &mut rng);

        let unsorted = with_raw_acks(&child, vec![hi, lo]);
        assert!(chain.append(unsorted).is_err());

        let duplicated = with_raw_acks(&child, vec![lo, lo]);
        assert!(chain.append(duplicated).is_err());

        assert_eq!(chain.blocks().count(), 2);
    }

    #[test]
    fn chain_topology_tracks_roots_heads_merged_and_incomplete() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);
        let mut chain = Chain::new();

        let b1 = Block::create(vec![], vec![Payload::PublishKey { name: "alice".to_string(), key: sk.public_key() }], &sk, &mut rng);
        let b2 = Block::create(vec![], vec![Payload::Text("root2".to_string())], &sk, &mut rng);
        chain.append(b1.clone()).unwrap();
        chain.append(b2.clone()).unwrap();

        let b3 = Block::create(vec![b1.id(), b2.id()], vec![], &sk, &mut rng);
        chain.append(b3.clone()).unwrap();

        let b4 = Block::create(vec![b3.id()], vec![Payload::Text("b4".to_string())], &sk, &mut rng);
        let b5 = Block::create(vec![b3.id()], vec![Payload::Text("b5".to_string())], &sk, &mut rng);
        chain.append(b4.clone()).unwrap();
        chain.append(b5.clone()).unwrap();

        let b6 = Block::create(vec![b4.id(), b5.id()], vec![], &sk, &mut rng);
        chain.append(b6.clone()).unwrap();

        assert_eq!(chain.roots(), [b1.id(), b2.id()].into_iter().collect());
        assert_eq!(chain.heads(), [b6.id()].into_iter().collect());
        assert!(chain.merged());
        assert!(!chain.incomplete());

        let mut partial = Chain::new();
        partial.append(b1).unwrap();
        partial.append(b2).unwrap();
        partial.append(b3).unwrap();
        partial.append(b5).unwrap();
        assert!(!partial.incomplete());
        let dangling = Block::create(vec![b4.id()], vec![], &sk, &mut rng);
        assert!(partial.append(dangling).is_err());
    }

    #[test]
    fn late_joiner_with_a_missing_block_is_incomplete() {
        let mut rng = rand::thread_rng();
        let sk = PrivateKey::random(&mut rng);

        let b1 = Block::create(vec![], vec![Payload::PublishKey { name: "alice".to_string(), key: sk.public_key() }], &sk, &mut rng);
        let b3 = Block::create(vec![b1.id()], vec![Payload::Text("b3".to_string())], &sk, &mut rng);
        let b5 = Block::create(vec![b3.id()], vec![Payload::Text("b5".to_string())], &sk, &mut rng);

        // Only b5 reached this party; reconstructing from local storage
        // cannot validate it since its ack b3 was never delivered.
        let mut chain = Chain::new();
        chain.insert_unchecked(b5);
        assert!(chain.incomplete());
    }
}
