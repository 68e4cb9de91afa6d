//! Store adapter errors

use tenval_sparse::SparseError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Serial number 0 is reserved")]
    ZeroSerial,

    #[error("Tensor codec failure: {0}")]
    Codec(#[from] SparseError),
}

pub type StoreResult<T> = Result<T, StoreError>;
