//! # tenval-core
//!
//! Value model for labeled tensors used by ranking expressions.
//!
//! This crate provides the types every other tenval crate builds on:
//!
//! - **Type descriptors** ([`Dimension`], [`CellType`], [`TensorType`]) with
//!   the textual grammar `double` / `tensor<float>(x{},y[3])`
//! - **Addresses** ([`Label`], [`Address`]) and the truncation rule that turns
//!   computed numbers into labels ([`label_from_number`])
//! - **Engine-neutral specs** ([`TensorSpec`]) used to move values between
//!   engines and to compare their results
//! - **Aggregation** ([`Aggr`], [`Aggregator`]) for reduce
//! - **Cell operations** ([`MapOp`], [`JoinOp`]) for map and join
//! - **Typed cell storage** ([`CellStorage`], [`CellValue`])
//!
//! ## Dimension kinds
//!
//! A mapped dimension (`x{}`) is addressed by arbitrary strings and only the
//! cells that exist are stored. An indexed dimension (`x[3]`) is addressed by
//! an integer in `[0, size)`. A type with only indexed dimensions is dense, a
//! type with only mapped dimensions is sparse, and a type with both is mixed.
//! Dimensions are always kept sorted by name.
//!
//! ## Quick Start
//!
//! ```
//! use tenval_core::{Label, TensorSpec, TensorType};
//!
//! let t = TensorType::parse("tensor(y[2],x{})").unwrap();
//! assert_eq!(t.to_string(), "tensor(x{},y[2])");
//!
//! let spec = TensorSpec::new(t)
//!     .add([("x", Label::from("a")), ("y", Label::from(0))], 1.0)
//!     .add([("x", Label::from("a")), ("y", Label::from(1))], 2.0);
//! assert!(spec.validate().is_ok());
//! assert_eq!(spec.len(), 2);
//! ```
//!
//! ## Type algebra
//!
//! ```
//! use tenval_core::TensorType;
//!
//! let a: TensorType = "tensor(x[3],y[2])".parse().unwrap();
//! let b: TensorType = "tensor(y[2],z{})".parse().unwrap();
//! let joined = TensorType::join(&a, &b).unwrap();
//! assert_eq!(joined.to_string(), "tensor(x[3],y[2],z{})");
//! assert_eq!(joined.reduce(&["y"]).unwrap().to_string(), "tensor(x[3],z{})");
//! ```
//!
//! ## Features
//!
//! - `serde`: Serialize/Deserialize for the type descriptors, labels and
//!   aggregators

#![deny(warnings)]

pub mod address;
pub mod aggr;
pub mod cells;
pub mod error;
pub mod layout;
pub mod ops;
pub mod spec;
pub mod types;


pub use address::{
    address, format_address, label_from_number, resolve_label, validate_address, Address, Label,
};
pub use aggr::{Aggr, Aggregator};
pub use cells::{CellStorage, CellValue};
pub use error::{CoreError, CoreResult};
pub use ops::{JoinOp, MapOp};
pub use spec::TensorSpec;
pub use types::{CellType, Dimension, DimensionKind, TensorType};
