//! # tenval-exec
//!
//! Tensor engines and tensor function evaluation for tenval.
//!
//! This crate provides:
//! - [`TensorEngine`] trait with the reference [`SimpleEngine`] and the
//!   production [`PackedEngine`]
//! - [`TensorFunction`] trees, evaluated into a per-evaluation [`Stash`]
//! - [`optimize`], which rewrites fully addressed dense peeks into
//!   [`DenseTensorPeekFunction`]s
//! - [`Evaluator`] binding a function to an engine and [`ExecHints`]
//! - [`conformance`] harness checking one engine against another
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use tenval_core::{Label, TensorSpec, TensorType};
//! use tenval_exec::{
//!     Evaluator, ExecHints, PackedEngine, PeekLabel, TensorEngine, TensorFunction, Value,
//! };
//!
//! let engine = PackedEngine::new();
//! let x3 = TensorSpec::parse("tensor(x[3])").unwrap()
//!     .add([("x", Label::from(0))], 1.0)
//!     .add([("x", Label::from(1))], 2.0)
//!     .add([("x", Label::from(2))], 3.0);
//!
//! // x3{x:(a)}
//! let function = TensorFunction::peek(
//!     TensorFunction::inject(x3.value_type().clone(), 0),
//!     BTreeMap::from([(
//!         "x".to_string(),
//!         PeekLabel::from(TensorFunction::inject(TensorType::double(), 1)),
//!     )]),
//! )
//! .unwrap();
//!
//! let evaluator = Evaluator::new(engine, function, ExecHints::default());
//! let params = [engine.from_spec(&x3).unwrap(), Value::Double(1.7)];
//! let mut stash = evaluator.new_stash();
//! assert_eq!(evaluator.evaluate(&params, &mut stash).unwrap(), &Value::Double(2.0));
//! ```

#![deny(warnings)]

pub mod conformance;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod function;
pub mod hints;
pub mod optimize;
pub mod packed;
pub mod simple_engine;
pub mod stash;

#[cfg(test)]
mod property_tests;

// Re-exports
pub use engine::{TensorEngine, TensorValue, Value};
pub use error::ExecError;
pub use evaluator::Evaluator;
pub use function::{PeekLabel, TensorFunction};
pub use hints::ExecHints;
pub use optimize::{
    constant_double, optimize, DenseIndex, DensePeekDim, DenseTensorPeekFunction,
    OptimizationConfig, OptimizationPass, OptimizationStats,
};
pub use packed::{PackedEngine, PackedTensor};
pub use simple_engine::SimpleEngine;
pub use stash::{Stash, StashStats};
