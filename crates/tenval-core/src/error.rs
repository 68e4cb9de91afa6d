//! Error types for the tensor value model
//!
//! Every fallible operation in `tenval-core` reports a [`CoreError`]. The
//! higher layers wrap it (`SparseError::Core`, `anyhow` contexts in the
//! executor) instead of flattening it into strings, so callers can still match
//! on the exact failure.

use thiserror::Error;

/// Errors produced while building or combining tensor types, addresses and specs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid tensor type '{input}': {reason}")]
    TypeParse { input: String, reason: String },

    #[error("Duplicate dimension '{0}'")]
    DuplicateDimension(String),

    #[error("Indexed dimension '{0}' must have a size greater than zero")]
    ZeroSize(String),

    #[error("Dense subspace size of ({0}) overflows")]
    SizeOverflow(String),

    #[error("Dimension '{name}' mismatch: {lhs} vs {rhs}")]
    DimensionMismatch {
        name: String,
        lhs: String,
        rhs: String,
    },

    #[error("Unknown dimension '{name}' in {value_type}")]
    UnknownDimension { name: String, value_type: String },

    #[error("Invalid address {address} for {value_type}: {reason}")]
    InvalidAddress {
        address: String,
        value_type: String,
        reason: String,
    },

    #[error("Unknown aggregator '{0}'")]
    UnknownAggregator(String),
}

impl CoreError {
    pub(crate) fn parse(input: &str, reason: impl Into<String>) -> Self {
        CoreError::TypeParse {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias for `tenval-core`
pub type CoreResult<T> = Result<T, CoreError>;
