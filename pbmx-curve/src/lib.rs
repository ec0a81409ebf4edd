#![deny(missing_docs)]
//! The PBMX group layer: a prime-order elliptic curve group with a fixed
//! generator, its scalar field, constant-time arithmetic, uniform random
//! sampling, and canonical byte encoding.
//!
//! Everything above this layer (keys, masks, proofs, chain) only ever talks
//! to the curve through [`Point`] and [`Scalar`]: no other crate in this
//! workspace names the underlying curve directly.

mod error;
mod point;
mod scalar;

pub use error::{Error, Result};
pub use point::{sum, Point, POINT_BYTES};
pub use scalar::{Scalar, SCALAR_BYTES};
