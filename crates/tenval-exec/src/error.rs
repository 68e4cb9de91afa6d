//! Errors raised while building or evaluating tensor functions
//!
//! Engine and evaluation entry points return `anyhow::Result`; these typed
//! errors are attached as the root cause and can be recovered with
//! `downcast_ref::<ExecError>()`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("Peek index for '{dimension}' must be a double, got {value_type}")]
    NotScalar {
        dimension: String,
        value_type: String,
    },

    #[error("Parameter {index} out of range ({count} given)")]
    ParamOutOfRange { index: usize, count: usize },

    #[error("Stash exhausted: limit of {limit} values reached")]
    StashExhausted { limit: usize },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Peek dimension '{name}' not in {value_type}")]
    UnknownPeekDimension { name: String, value_type: String },
}
