//! Error types for the payload, block, chain and session layer.

/// Errors produced while decoding, validating or replaying chain state.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A lower-layer proof/mask/key error.
    #[error(transparent)]
    Crypto(#[from] pbmx_crypto::Error),
    /// Malformed wire bytes: bad tag, truncated buffer, non-canonical field.
    #[error("malformed wire encoding: {0}")]
    Decoding(String),
    /// A payload tag 10 was encountered: reserved for future extension and
    /// never treated as an unknown tag.
    #[error("payload tag 10 is reserved")]
    ReservedTag,
    /// A cryptographic proof did not verify.
    #[error("proof does not verify")]
    ProofInvalid,
    /// A payload referenced a stack Id absent from derived state.
    #[error("stack {0:?} is not known to this session")]
    StackUnknown(pbmx_crypto::StackId),
    /// A shuffle/shift/insert/take/pile operation was given inconsistent sizes.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    /// A block failed chain-level integrity checks.
    #[error("chain integrity violation: {0}")]
    ChainIntegrity(String),
    /// `unmask_open` was applied to a mask with outstanding encryption layers.
    #[error("mask still has {0} encryption layer(s) to remove")]
    ExhaustedRecovery(u32),
    /// A random spec string did not parse.
    #[error("could not parse random spec: {0}")]
    SpecParse(String),
}

impl Error {
    /// The variant name, with no payload, suitable for logging alongside
    /// secret-adjacent material (shares, payload bytes) that must not be
    /// logged itself.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Crypto(_) => "Crypto",
            Error::Decoding(_) => "Decoding",
            Error::ReservedTag => "ReservedTag",
            Error::ProofInvalid => "ProofInvalid",
            Error::StackUnknown(_) => "StackUnknown",
            Error::ShapeMismatch(_) => "ShapeMismatch",
            Error::ChainIntegrity(_) => "ChainIntegrity",
            Error::ExhaustedRecovery(_) => "ExhaustedRecovery",
            Error::SpecParse(_) => "SpecParse",
        }
    }
}

impl From<crate::wire::WireError> for Error {
    fn from(e: crate::wire::WireError) -> Self {
        if e.0 == crate::payload::RESERVED_TAG_MESSAGE {
            Error::ReservedTag
        } else {
            Error::Decoding(e.0)
        }
    }
}

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;
