//! Error types for the threshold-ElGamal and zero-knowledge proof layer.

/// Errors produced by mask, share, token and proof operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A lower-layer group/scalar decoding error.
    #[error(transparent)]
    Curve(#[from] pbmx_curve::Error),
    /// A zero-knowledge proof did not verify.
    #[error("proof does not verify")]
    ProofInvalid,
    /// An operation was applied to masks/stacks of inconsistent size.
    #[error("expected {expected} masks, got {got}")]
    ShapeMismatch {
        /// Size required by the operation.
        expected: usize,
        /// Size actually supplied.
        got: usize,
    },
    /// Token recovery was attempted on a mask that still has encryption
    /// layers remaining.
    #[error("mask still has {remaining} encryption layer(s) to remove")]
    ExhaustedRecovery {
        /// Number of shares/private-key applications still outstanding.
        remaining: u32,
    },
    /// A token value fell outside the representable range.
    #[error("token {0} is not representable")]
    TokenOutOfRange(u64),
    /// Baby-step/giant-step recovery exhausted its search bound.
    #[error("token recovery exhausted search bound {0}")]
    RecoveryExhausted(u64),
    /// Malformed wire bytes: bad length, truncated buffer, non-canonical field.
    #[error("malformed wire encoding: {0}")]
    Decoding(String),
}

impl From<crate::wire::WireError> for Error {
    fn from(e: crate::wire::WireError) -> Self {
        Error::Decoding(e.0)
    }
}

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;
