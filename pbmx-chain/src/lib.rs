#![deny(missing_docs)]
//! The payload catalog, signed block DAG and derived session state that sit
//! on top of [`pbmx_crypto`]'s threshold-ElGamal keys, masks, stacks and
//! zero-knowledge proof suite.
//!
//! A [`Chain`] is a content-addressed, append-only set of signed [`Block`]s;
//! [`Chain::replay`] folds it, in a canonical topological order, into a
//! [`Session`] describing the game's current parties, stacks and named
//! random generators. Callers build moves against a `Session` via its
//! operation methods, accumulate the resulting [`Payload`]s into a
//! [`BlockBuilder`], and [`Chain::append`] the signed result.

mod block;
mod error;
mod payload;
mod rng;
mod wire;

pub mod chain;
pub mod session;

pub use block::{Block, BlockId};
pub use chain::Chain;
pub use error::{Error, Result};
pub use payload::Payload;
pub use rng::{RngSpec, RngState};
pub use session::{BlockBuilder, Session};
pub use wire::{Decode, Encode};
