#![deny(missing_docs)]
//! Threshold ElGamal keys, masks and stacks, and the PBMX zero-knowledge
//! proof suite (discrete-log equality, shift/rotation, shuffle, insertion,
//! entanglement) built on top of [`pbmx_curve`].
//!
//! Every proof in this crate is a non-interactive Fiat-Shamir transform over
//! a domain-separated [`transcript::Transcript`]; see that module for the
//! shared challenge-derivation primitive the rest of the crate builds on.

mod error;
mod keys;
mod mask;
mod signature;
mod stack;
mod token;
mod transcript;

pub mod proofs;
pub mod wire;

pub use error::{Error, Result};
pub use keys::{Fingerprint, PrivateKey, PublicKey, SharedKey, FINGERPRINT_BYTES};
pub use mask::{Mask, Share};
pub use signature::Signature;
pub use stack::{Stack, StackId};
pub use token::{Token, DEFAULT_RECOVERY_BOUND};
pub use transcript::Transcript;
pub use wire::{Decode, Encode};
