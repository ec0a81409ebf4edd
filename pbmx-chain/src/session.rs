//! Derived game state: the fold of a chain's payloads into parties, stacks
//! and named Rngs, plus the builders that turn an intended move into a
//! [`Payload`] without touching the chain itself.

use std::collections::HashMap;

use pbmx_curve::{Point, Scalar};
use pbmx_crypto::proofs::{insertion_dest, RotationProof, ShuffleProof};
use pbmx_crypto::{Fingerprint, Mask, PrivateKey, PublicKey, Stack, StackId, Token};
use rand::{CryptoRng, Rng};

use crate::block::{Block, BlockId};
use crate::error::{Error, Result};
use crate::payload::Payload;
use crate::rng::{RngSpec, RngState};

/// State derived by folding a [`crate::chain::Chain`]'s payloads in
/// canonical order. Operations on a `Session` never mutate the chain: they
/// return a [`Payload`] for the caller to hand to a [`BlockBuilder`].
#[derive(Clone, Debug)]
pub struct Session {
    party_order: Vec<Fingerprint>,
    party_names: HashMap<Fingerprint, String>,
    party_keys: HashMap<Fingerprint, PublicKey>,
    shared_key: PublicKey,
    stacks: HashMap<StackId, Stack>,
    stack_names: HashMap<String, StackId>,
    rngs: HashMap<String, RngState>,
}

impl Session {
    /// An empty session: no parties, identity shared key.
    pub fn new() -> Self {
        Self {
            party_order: Vec::new(),
            party_names: HashMap::new(),
            party_keys: HashMap::new(),
            shared_key: PublicKey::identity(),
            stacks: HashMap::new(),
            stack_names: HashMap::new(),
            rngs: HashMap::new(),
        }
    }

    /// Parties, in first-publication order.
    pub fn parties(&self) -> impl Iterator<Item = Fingerprint> + '_ {
        self.party_order.iter().copied()
    }

    /// The display name a party published under.
    pub fn name_of(&self, party: Fingerprint) -> Option<&str> {
        self.party_names.get(&party).map(String::as_str)
    }

    /// The running sum of every published party key.
    pub fn shared_key(&self) -> PublicKey {
        self.shared_key
    }

    /// A party's published key.
    pub fn key_of(&self, party: Fingerprint) -> Option<PublicKey> {
        self.party_keys.get(&party).copied()
    }

    /// Looks up a stack by its content-addressed Id.
    pub fn stack(&self, id: &StackId) -> Option<&Stack> {
        self.stacks.get(id)
    }

    /// Looks up a stack by the name it was last bound to.
    pub fn stack_named(&self, name: &str) -> Option<&Stack> {
        self.stack_names.get(name).and_then(|id| self.stacks.get(id))
    }

    /// Looks up a declared Rng's derived state.
    pub fn rng(&self, name: &str) -> Option<&RngState> {
        self.rngs.get(name)
    }

    /// Every currently-bound stack name, alongside the Id it resolves to.
    pub fn stacks_named(&self) -> impl Iterator<Item = (&str, StackId)> {
        self.stack_names.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Folds every payload of `block`, in listed order, into this session.
    pub(crate) fn apply_block(&mut self, block: &Block) -> Result<()> {
        for payload in block.payloads() {
            self.apply_payload(block.signer(), payload)?;
        }
        Ok(())
    }

    fn require_stack(&self, id: &StackId) -> Result<&Stack> {
        self.stacks.get(id).ok_or(Error::StackUnknown(*id))
    }

    fn require_key(&self, party: Fingerprint) -> Result<PublicKey> {
        self.party_keys
            .get(&party)
            .copied()
            .ok_or_else(|| Error::ChainIntegrity("payload signer has not published a key".to_string()))
    }

    fn apply_payload(&mut self, signer: Fingerprint, payload: &Payload) -> Result<()> {
        match payload {
            Payload::Raw(_) | Payload::Text(_) => Ok(()),

            Payload::PublishKey { name, key } => {
                match self.party_keys.get(&signer) {
                    Some(existing) if existing == key => Ok(()),
                    Some(_) => Err(Error::ChainIntegrity("party republished a different key".to_string())),
                    None => {
                        self.party_order.push(signer);
                        self.party_names.insert(signer, name.clone());
                        self.party_keys.insert(signer, *key);
                        self.shared_key = self.shared_key + *key;
                        Ok(())
                    }
                }
            }

            Payload::OpenStack { stack } => {
                self.stacks.insert(stack.id(), stack.clone());
                Ok(())
            }

            Payload::MaskStack { source, result, proofs } => {
                let before = self.require_stack(source)?;
                if before.len() != result.len() || before.len() != proofs.len() {
                    return Err(Error::ShapeMismatch(format!(
                        "mask_stack: source has {}, result has {}, proofs has {}",
                        before.len(),
                        result.len(),
                        proofs.len()
                    )));
                }
                for i in 0..before.len() {
                    before.masks()[i].verify_remask(&result[i], &self.shared_key, &proofs[i])?;
                }
                self.stacks.insert(result.id(), result.clone());
                Ok(())
            }

            Payload::ShuffleStack { source, result, proof } => {
                let before = self.require_stack(source)?;
                proof.verify(&self.shared_key, before.masks(), result.masks())?;
                self.stacks.insert(result.id(), result.clone());
                Ok(())
            }

            Payload::ShiftStack { source, result, proof } => {
                let before = self.require_stack(source)?;
                proof.verify(&self.shared_key, before.masks(), result.masks())?;
                self.stacks.insert(result.id(), result.clone());
                Ok(())
            }

            Payload::NameStack { target, name } => {
                self.require_stack(target)?;
                self.stack_names.insert(name.clone(), *target);
                Ok(())
            }

            Payload::TakeStack { source, indices, result } => {
                let before = self.require_stack(source)?;
                let mut masks = Vec::with_capacity(indices.len());
                for &idx in indices {
                    let idx = usize::try_from(idx)
                        .map_err(|_| Error::ShapeMismatch(format!("take_stack index {idx} out of range")))?;
                    masks.push(*before.masks().get(idx).ok_or_else(|| {
                        Error::ShapeMismatch(format!("take_stack index {idx} out of range for stack of length {}", before.len()))
                    })?);
                }
                let sub = Stack::new(masks);
                if sub.id() != *result {
                    return Err(Error::ChainIntegrity("take_stack result does not match its claimed content".to_string()));
                }
                self.stacks.insert(*result, sub);
                Ok(())
            }

            Payload::PileStacks { sources, result } => {
                let mut masks = Vec::new();
                for source in sources {
                    masks.extend_from_slice(self.require_stack(source)?.masks());
                }
                let piled = Stack::new(masks);
                if piled.id() != *result {
                    return Err(Error::ChainIntegrity("pile_stacks result does not match its claimed content".to_string()));
                }
                self.stacks.insert(*result, piled);
                Ok(())
            }

            Payload::PublishShares { target, shares, proofs } => {
                let before = self.require_stack(target)?;
                if before.len() != shares.len() || before.len() != proofs.len() {
                    return Err(Error::ShapeMismatch(format!(
                        "publish_shares: stack has {}, shares has {}, proofs has {}",
                        before.len(),
                        shares.len(),
                        proofs.len()
                    )));
                }
                let signer_key = self.require_key(signer)?;
                let mut unmasked = Vec::with_capacity(before.len());
                for i in 0..before.len() {
                    before.masks()[i].verify_share(&signer_key, &shares[i], &proofs[i])?;
                    unmasked.push(before.masks()[i].unmask_share(&shares[i]));
                }
                // Updated in place under the same key: a stack undergoing
                // progressive reveal keeps the handle it was opened/named
                // under rather than being re-keyed by its changing content.
                self.stacks.insert(*target, Stack::new(unmasked));
                Ok(())
            }

            Payload::RandomSpec { name, spec } => {
                if self.rngs.contains_key(name) {
                    return Err(Error::ChainIntegrity(format!("rng {name:?} already declared")));
                }
                let parsed = RngSpec::parse(spec)?;
                self.rngs.insert(name.clone(), RngState::new(parsed));
                Ok(())
            }

            Payload::RandomEntropy { name, mask } => {
                let rng = self
                    .rngs
                    .get_mut(name)
                    .ok_or_else(|| Error::ChainIntegrity(format!("rng {name:?} was never declared")))?;
                rng.add_entropy(signer, *mask);
                Ok(())
            }

            Payload::RandomReveal { name, share, proof } => {
                let signer_key = self.require_key(signer)?;
                let rng = self
                    .rngs
                    .get_mut(name)
                    .ok_or_else(|| Error::ChainIntegrity(format!("rng {name:?} was never declared")))?;
                rng.add_reveal(signer, &signer_key, share, proof)?;
                Ok(())
            }

            Payload::ProveEntanglement { sources, shuffled, proof } => {
                let before: Vec<Vec<Mask>> = sources
                    .iter()
                    .map(|id| self.require_stack(id).map(|s| s.masks().to_vec()))
                    .collect::<Result<_>>()?;
                let after: Vec<Vec<Mask>> = shuffled
                    .iter()
                    .map(|id| self.require_stack(id).map(|s| s.masks().to_vec()))
                    .collect::<Result<_>>()?;
                proof.verify(&self.shared_key, &before, &after)?;
                Ok(())
            }
        }
    }

    /// Publishes `key` under `name`.
    pub fn publish_key(&self, name: &str, key: PublicKey) -> Payload {
        Payload::PublishKey { name: name.to_string(), key }
    }

    /// Opens a freshly-masked stack with no provenance proof.
    pub fn open_stack(&self, stack: Stack) -> Payload {
        Payload::OpenStack { stack }
    }

    /// Remasks every element of `source` under fresh randomness.
    pub fn mask_stack<R: Rng + CryptoRng>(&self, source: StackId, rng: &mut R) -> Result<Payload> {
        let before = self.require_stack(&source)?;
        let mut masks = Vec::with_capacity(before.len());
        let mut proofs = Vec::with_capacity(before.len());
        for mask in before.masks() {
            let (remasked, proof) = mask.remask(&self.shared_key, rng);
            masks.push(remasked);
            proofs.push(proof);
        }
        Ok(Payload::MaskStack {
            source,
            result: Stack::new(masks),
            proofs,
        })
    }

    /// Shuffles `source` under the hidden permutation `dest`, where `dest[i]`
    /// is the destination index of `source`'s element `i`.
    pub fn shuffle_stack<R: Rng + CryptoRng>(&self, source: StackId, dest: &[usize], rng: &mut R) -> Result<Payload> {
        let before = self.require_stack(&source)?;
        let (proof, after) = ShuffleProof::prove(&self.shared_key, before.masks(), dest, rng)?;
        Ok(Payload::ShuffleStack {
            source,
            result: Stack::new(after),
            proof,
        })
    }

    /// Cyclically shifts `source` by `k` positions.
    pub fn shift_stack<R: Rng + CryptoRng>(&self, source: StackId, k: usize, rng: &mut R) -> Result<Payload> {
        let before = self.require_stack(&source)?;
        let n = before.len();
        let mut randomizers = Vec::with_capacity(n);
        let mut after = Vec::with_capacity(n);
        for i in 0..n {
            let src = (i + n - k % n.max(1)) % n.max(1);
            let r = Scalar::random(rng);
            randomizers.push(r);
            let from = &before.masks()[src];
            after.push(Mask::from_parts(
                from.c1() + Point::generator() * r,
                from.c2() + self.shared_key.point() * r,
                from.remaining(),
            ));
        }
        let proof = RotationProof::prove(&self.shared_key, before.masks(), &after, k, &randomizers, rng)?;
        Ok(Payload::ShiftStack {
            source,
            result: Stack::new(after),
            proof,
        })
    }

    /// Binds `name` to `target`.
    pub fn name_stack(&self, target: StackId, name: &str) -> Result<Payload> {
        self.require_stack(&target)?;
        Ok(Payload::NameStack { target, name: name.to_string() })
    }

    /// Extracts the elements of `source` at `indices` into a new stack.
    pub fn take_stack(&self, source: StackId, indices: Vec<u64>) -> Result<Payload> {
        let before = self.require_stack(&source)?;
        let mut masks = Vec::with_capacity(indices.len());
        for &idx in &indices {
            let idx = usize::try_from(idx).map_err(|_| Error::ShapeMismatch(format!("take_stack index {idx} out of range")))?;
            masks.push(*before.masks().get(idx).ok_or_else(|| {
                Error::ShapeMismatch(format!("take_stack index {idx} out of range for stack of length {}", before.len()))
            })?);
        }
        let result = Stack::new(masks).id();
        Ok(Payload::TakeStack { source, indices, result })
    }

    /// Concatenates `sources` in order into one new stack.
    pub fn pile_stacks(&self, sources: Vec<StackId>) -> Result<Payload> {
        let mut masks = Vec::new();
        for source in &sources {
            masks.extend_from_slice(self.require_stack(source)?.masks());
        }
        let result = Stack::new(masks).id();
        Ok(Payload::PileStacks { sources, result })
    }

    /// Splices `needle` into `target` at the hidden `position`
    /// (`0..=target.len()`). Carries no dedicated wire tag: the combined
    /// stack is first piled (content-addressed, unproved), then shuffled
    /// under the interleaving permutation, so the move is recorded as a
    /// [`Payload::PileStacks`] immediately followed by a
    /// [`Payload::ShuffleStack`] over the piled Id, within the same block.
    pub fn insert_stack<R: Rng + CryptoRng>(
        &self,
        target: StackId,
        needle: StackId,
        position: usize,
        rng: &mut R,
    ) -> Result<(Payload, Payload)> {
        let n = self.require_stack(&target)?.len();
        let m = self.require_stack(&needle)?.len();
        if position > n {
            return Err(Error::ShapeMismatch(format!("insert_stack position {position} out of range for stack of length {n}")));
        }
        let pile = self.pile_stacks(vec![target, needle])?;
        let Payload::PileStacks { result: combined_id, .. } = &pile else { unreachable!() };
        let dest = insertion_dest(n, m, position);
        let combined_masks: Vec<Mask> =
            self.require_stack(&target)?.masks().iter().chain(self.require_stack(&needle)?.masks()).copied().collect();
        let (proof, after) = ShuffleProof::prove(&self.shared_key, &combined_masks, &dest, rng)?;
        let shuffle = Payload::ShuffleStack { source: *combined_id, result: Stack::new(after), proof };
        Ok((pile, shuffle))
    }

    /// Publishes this party's decryption shares for every element of
    /// `target`.
    pub fn publish_shares<R: Rng + CryptoRng>(&self, target: StackId, sk: &PrivateKey, rng: &mut R) -> Result<Payload> {
        let before = self.require_stack(&target)?;
        let pk = sk.public_key();
        let mut shares = Vec::with_capacity(before.len());
        let mut proofs = Vec::with_capacity(before.len());
        for mask in before.masks() {
            let (share, proof) = mask.share(sk, &pk, rng);
            shares.push(share);
            proofs.push(proof);
        }
        Ok(Payload::PublishShares { target, shares, proofs })
    }

    /// Declares a new named Rng, validating the grammar eagerly.
    pub fn random_spec(&self, name: &str, spec: &str) -> Result<Payload> {
        RngSpec::parse(spec)?;
        Ok(Payload::RandomSpec { name: name.to_string(), spec: spec.to_string() })
    }

    /// Contributes this party's entropy toward `name`: a fresh encryption of
    /// zero under the current shared key.
    pub fn random_entropy<R: Rng + CryptoRng>(&self, name: &str, rng: &mut R) -> Result<Payload> {
        if !self.rngs.contains_key(name) {
            return Err(Error::ChainIntegrity(format!("rng {name:?} was never declared")));
        }
        let num_parties = self.party_order.len() as u32;
        let (mask, _proof) = Mask::mask(&self.shared_key, Token::new(0).unwrap(), num_parties, rng);
        Ok(Payload::RandomEntropy { name: name.to_string(), mask })
    }

    /// Publishes this party's reveal share for `name`'s accumulated entropy.
    pub fn random_reveal<R: Rng + CryptoRng>(&self, name: &str, sk: &PrivateKey, rng: &mut R) -> Result<Payload> {
        let entropy = self
            .rngs
            .get(name)
            .ok_or_else(|| Error::ChainIntegrity(format!("rng {name:?} was never declared")))?
            .entropy()
            .ok_or_else(|| Error::ChainIntegrity(format!("rng {name:?} has no entropy yet")))?;
        let pk = sk.public_key();
        let (share, proof) = entropy.share(sk, &pk, rng);
        Ok(Payload::RandomReveal { name: name.to_string(), share, proof })
    }
}

/// Accumulates acks and payloads for one block, then signs it.
#[derive(Clone, Debug, Default)]
pub struct BlockBuilder {
    acks: Vec<BlockId>,
    payloads: Vec<Payload>,
}

impl BlockBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acknowledges one parent block.
    pub fn ack(mut self, id: BlockId) -> Self {
        self.acks.push(id);
        self
    }

    /// Acknowledges several parent blocks.
    pub fn acks(mut self, ids: impl IntoIterator<Item = BlockId>) -> Self {
        self.acks.extend(ids);
        self
    }

    /// Appends one payload.
    pub fn payload(mut self, payload: Payload) -> Self {
        self.payloads.push(payload);
        self
    }

    /// Signs the accumulated acks and payloads into a [`Block`].
    pub fn build<R: Rng + CryptoRng>(self, sk: &PrivateKey, rng: &mut R) -> Block {
        Block::create(self.acks, self.payloads, sk, rng)
    }
}
