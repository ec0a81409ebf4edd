//! The wire codec used by payloads and blocks.
//!
//! The trait definitions and every impl for a `pbmx-crypto` type already
//! live in that crate (it owns the fields); this module just re-exports
//! them so chain-level code reaches for the same traits pbmx-crypto's own
//! types implement, rather than standing up a second codec.

pub use pbmx_crypto::wire::{Decode, Encode, WireError, WireResult};
