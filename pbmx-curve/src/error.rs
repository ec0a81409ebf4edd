//! Error types for the group layer.

/// Errors produced while decoding or otherwise validating group elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The byte length did not match the canonical encoding length for the type being decoded.
    #[error("expected {expected} bytes, got {got}")]
    BadLength {
        /// Expected length in bytes.
        expected: usize,
        /// Length actually supplied.
        got: usize,
    },
    /// The bytes do not decode to a valid curve point.
    #[error("bytes do not decode to a point on the curve")]
    NotOnCurve,
    /// The point decodes but does not lie in the prime-order subgroup.
    #[error("point is not in the prime-order subgroup")]
    NotInSubgroup,
    /// The bytes decode to a scalar that is not the canonical (fully reduced) representative.
    #[error("scalar is not canonically reduced")]
    NonCanonicalScalar,
    /// A token value fell outside the range representable by the embedding.
    #[error("token {0} is not representable (reserved sentinel or out of range)")]
    TokenOutOfRange(u64),
    /// Discrete-log recovery did not find a token within the searched bound.
    #[error("token recovery exhausted search bound {0} without finding a match")]
    RecoveryExhausted(u64),
}

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;
