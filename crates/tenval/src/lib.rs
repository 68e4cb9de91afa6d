//! # tenval - Labeled Tensor Values for Ranking Expressions
//!
//! This is the **meta crate** that re-exports all tenval components for
//! convenient access.
//!
//! ## Quick Start
//!
//! ```
//! use tenval::prelude::*;
//!
//! let engine = PackedEngine::new();
//! let spec = TensorSpec::parse("tensor(x{},y[2])")?
//!     .add([("x", Label::from("a")), ("y", Label::from(0))], 1.0)
//!     .add([("x", Label::from("a")), ("y", Label::from(1))], 2.0);
//! let value = engine.from_spec(&spec)?;
//!
//! let sum = engine.reduce(&value, Aggr::Sum, &["x".to_string(), "y".to_string()])?;
//! assert_eq!(sum, Value::Double(3.0));
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Components
//!
//! ### Value Model ([`core`])
//!
//! Tensor types and their textual form, addresses, specs, aggregators.
//!
//! ```
//! use tenval::core::TensorType;
//!
//! let t: TensorType = "tensor<float>(y[2],x{})".parse().unwrap();
//! assert_eq!(t.to_string(), "tensor<float>(x{},y[2])");
//! ```
//!
//! ### Reference Tensor and Codec ([`sparse`])
//!
//! [`sparse::SimpleTensor`] defines the semantics of every operation;
//! [`sparse::codec`] reads and writes the binary format.
//!
//! ### Engines and Evaluation ([`exec`])
//!
//! [`exec::TensorEngine`] implementations, [`exec::TensorFunction`] trees and
//! the dense peek optimization.
//!
//! ### Document Store Adapter (`store`, feature `store`)
//!
//! Replay-safe persistence of encoded tensors.
//!
//! ## Features
//!
//! - `store` (default): include `tenval-store`
//! - `serde`: serde support for the value model types

#![deny(warnings)]

// Re-export all components
pub use tenval_core as core;
pub use tenval_exec as exec;
pub use tenval_sparse as sparse;

#[cfg(feature = "store")]
pub use tenval_store as store;

pub mod prelude {
    //! Prelude module for convenient imports
    //!
    //! # Example
    //!
    //! ```
    //! use tenval::prelude::*;
    //!
    //! let t = TensorType::parse("tensor(x[3])").unwrap();
    //! assert!(t.is_dense());
    //! ```

    // Value model
    pub use crate::core::{
        Address, Aggr, CellType, Dimension, JoinOp, Label, MapOp, TensorSpec, TensorType,
    };

    // Reference tensor and codec
    pub use crate::sparse::{CodecFormat, SimpleTensor};

    // Engines and evaluation
    pub use crate::exec::{
        optimize, Evaluator, ExecHints, OptimizationConfig, PackedEngine, PeekLabel,
        SimpleEngine, Stash, TensorEngine, TensorFunction, Value,
    };

    // Store
    #[cfg(feature = "store")]
    pub use crate::store::{DocumentStore, MemoryDocumentStore, SummaryAdapter};
}
