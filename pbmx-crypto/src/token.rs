//! 64-bit game tokens and their embedding into the group.

use std::collections::HashMap;

use pbmx_curve::{Point, Scalar};

use crate::error::{Error, Result};

/// The sentinel value reserved to mean "no token" and rejected by [`Token::new`].
pub const SENTINEL: u64 = u64::MAX;

/// The default search bound for [`Token::recover`].
pub const DEFAULT_RECOVERY_BOUND: u64 = 1 << 32;

/// A 64-bit integer game value (a card, a die face, ...), embedded into the
/// group as `t*G` so it can be carried inside an ElGamal ciphertext.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token(u64);

impl Token {
    /// Wraps a raw value, rejecting the reserved [`SENTINEL`].
    pub fn new(value: u64) -> Result<Self> {
        if value == SENTINEL {
            return Err(Error::TokenOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// The raw integer value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Embeds this token as the group element `t*G`.
    pub fn embed(&self) -> Point {
        Point::generator() * Scalar::from_u64(self.0)
    }

    /// Recovers a token from its embedding via baby-step/giant-step, searching
    /// `0..=bound`.
    ///
    /// # Errors
    /// Returns [`Error::RecoveryExhausted`] if no token in the searched range
    /// embeds to `point`.
    pub fn recover(point: Point, bound: u64) -> Result<Self> {
        if point.is_identity() {
            return Ok(Self(0));
        }
        let m = (bound as f64).sqrt().ceil() as u64 + 1;
        let g = Point::generator();

        let mut baby_steps = HashMap::with_capacity(m as usize);
        let mut acc = Point::identity();
        for j in 0..m {
            baby_steps.entry(acc.to_bytes()).or_insert(j);
            acc = acc + g;
        }

        let giant_stride = -(g * Scalar::from_u64(m));
        let mut giant = point;
        for i in 0..=(bound / m.max(1)) {
            if let Some(j) = baby_steps.get(&giant.to_bytes()) {
                let candidate = i * m + j;
                if candidate <= bound {
                    return Ok(Self(candidate));
                }
            }
            giant = giant + giant_stride;
        }
        Err(Error::RecoveryExhausted(bound))
    }

    /// Recovers a token using [`DEFAULT_RECOVERY_BOUND`].
    pub fn recover_default(point: Point) -> Result<Self> {
        Self::recover(point, DEFAULT_RECOVERY_BOUND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_sentinel() {
        assert!(Token::new(SENTINEL).is_err());
    }

    #[test]
    fn small_tokens_roundtrip_through_embedding() {
        for v in [0u64, 1, 2, 17, 1000] {
            let t = Token::new(v).unwrap();
            let p = t.embed();
            let recovered = Token::recover(p, 10_000).unwrap();
            assert_eq!(recovered.value(), v);
        }
    }

    #[test]
    fn recovery_fails_outside_bound() {
        let t = Token::new(10_000).unwrap();
        let p = t.embed();
        assert!(Token::recover(p, 100).is_err());
    }
}
