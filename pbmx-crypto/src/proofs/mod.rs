//! Zero-knowledge proof suite: discrete-log equality, shift/rotation,
//! shuffle, insertion, and multi-stream entanglement.

pub mod dlog_eq;
pub mod entanglement;
pub mod insert;
pub mod or_dlogeq;
pub mod rotation;
pub mod shuffle;

pub use dlog_eq::DlogEqProof;
pub use entanglement::EntanglementProof;
pub use insert::{insertion_dest, InsertProof};
pub use or_dlogeq::OrDlogEqProof;
pub use rotation::RotationProof;
pub use shuffle::ShuffleProof;
