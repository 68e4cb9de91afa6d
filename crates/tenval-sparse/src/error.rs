//! Error types for the reference tensor and the binary codec
//!
//! - **`SparseError`**: top-level error for tensor construction and algebra
//! - **`CodecError`**: failures while reading or writing the binary format
//!
//! Type-level failures from `tenval-core` are carried unchanged in
//! [`SparseError::Core`].

use tenval_core::CoreError;
use thiserror::Error;

/// Top-level error type for reference tensor operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SparseError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Duplicate cell {address} in {value_type}")]
    DuplicateCell { address: String, value_type: String },

    #[error("Cell has {found} labels but {value_type} has {expected} dimensions")]
    LabelCount {
        value_type: String,
        expected: usize,
        found: usize,
    },

    #[error("Label '{label}' does not fit dimension {dimension}")]
    InvalidLabel { label: String, dimension: String },
}

/// Errors of the binary tensor format
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unknown format tag {0}")]
    UnknownTag(usize),

    #[error("Unknown cell width {0}")]
    UnknownCellWidth(usize),

    #[error("Buffer truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("{0} trailing bytes after tensor")]
    TrailingBytes(usize),

    #[error("Label is not valid UTF-8")]
    InvalidUtf8,

    #[error("Value {0} does not fit a compact integer")]
    CompactOverflow(usize),

    #[error("Indexed dimension '{0}' has size zero")]
    ZeroSize(String),

    #[error("Dimensions not in canonical order: {0}")]
    DimensionOrder(String),

    #[error("Duplicate cell {0}")]
    DuplicateCell(String),

    #[error("Invalid tensor type: {0}")]
    InvalidType(String),

    #[error("Subspace has {found} values, expected {expected}")]
    BlockSize { expected: usize, found: usize },
}

/// Result alias for tenval-sparse operations
pub type SparseResult<T> = Result<T, SparseError>;

/// Result alias for codec operations
pub type CodecResult<T> = Result<T, CodecError>;
