//! # tenval-sparse
//!
//! Reference tensor implementation and binary tensor format.
//!
//! - [`SimpleTensor`]: explicit-cell tensor with map, join, reduce and peek.
//!   It is the semantic oracle for every other engine.
//! - [`codec`]: the versioned binary format (tags 1/2/3 and 5/6/7) over the
//!   engine-neutral [`WireTensor`] view
//! - [`stream`]: big-endian byte-stream primitives used by the codec
//!
//! ## Example
//!
//! ```
//! use tenval_core::{Label, TensorSpec};
//! use tenval_sparse::{CodecFormat, SimpleTensor};
//!
//! let spec = TensorSpec::parse("tensor(x{},y{})").unwrap()
//!     .add([("x", Label::from("a")), ("y", Label::from("a"))], 1.0)
//!     .add([("x", Label::from("a")), ("y", Label::from("b"))], 2.0);
//! let tensor = SimpleTensor::create(&spec).unwrap();
//!
//! let bytes = tensor.encode(CodecFormat::Legacy).unwrap();
//! assert_eq!(bytes[0], 1);
//! let decoded = SimpleTensor::decode(&bytes).unwrap();
//! assert_eq!(decoded.to_spec(), spec);
//! ```

#![deny(warnings)]

pub mod codec;
pub mod error;
pub mod simple;
pub mod stream;

pub use codec::{CodecFormat, WireSubspace, WireTensor};
pub use error::*;
pub use simple::{Cell, SimpleTensor};
