//! Tensor function optimization
//!
//! This module rewrites [`TensorFunction`] trees before evaluation:
//!
//! - **DensePeek**: a peek that addresses every dimension of a dense source
//!   (at least one dimension, all indexed) becomes a
//!   [`DenseTensorPeekFunction`], which computes a row-major offset and reads
//!   the cell directly instead of building an address and searching for it
//! - **ConstantIndexes**: peek index expressions built only from constant
//!   doubles are evaluated once and replaced by their label
//!
//! Rewriting is a pure bottom-up tree transformation; the input tree is left
//! untouched.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use tenval_core::TensorType;
//! use tenval_exec::{optimize, OptimizationConfig, PeekLabel, TensorFunction};
//!
//! let x3 = TensorFunction::inject(TensorType::parse("tensor(x[3])").unwrap(), 0);
//! let a = TensorFunction::inject(TensorType::double(), 1);
//! let peek = TensorFunction::peek(
//!     x3,
//!     BTreeMap::from([("x".to_string(), PeekLabel::from(a))]),
//! )
//! .unwrap();
//!
//! let (optimized, stats) = optimize(&peek, &OptimizationConfig::default());
//! assert!(matches!(optimized, TensorFunction::DenseTensorPeek(_)));
//! assert_eq!(stats.peeks_rewritten, 1);
//! ```

use crate::engine::{TensorEngine, Value};
use crate::function::{lookup, PeekLabel, TensorFunction};
use crate::stash::Stash;
use anyhow::Result;
use std::collections::BTreeMap;
use tenval_core::{label_from_number, resolve_label, Dimension, Label, TensorType};
use tracing::{debug, info};

/// Index source for one dimension of a dense peek
#[derive(Debug, Clone)]
pub enum DenseIndex {
    /// Resolved at optimization time; `None` addresses nothing
    Fixed(Option<usize>),
    /// Computed per evaluation
    Dynamic(Box<TensorFunction>),
}

#[derive(Debug, Clone)]
pub struct DensePeekDim {
    pub dimension: Dimension,
    pub index: DenseIndex,
}

/// Single-cell peek into a dense tensor by linear offset.
///
/// Always produces a fresh double: the addressed cell, or 0.0 when any index
/// is out of range.
#[derive(Debug, Clone)]
pub struct DenseTensorPeekFunction {
    child: Box<TensorFunction>,
    dims: Vec<DensePeekDim>,
}

impl DenseTensorPeekFunction {
    /// Whether a peek with `spec` over `child_type` can be rewritten.
    pub fn is_applicable(child_type: &TensorType, spec: &BTreeMap<String, PeekLabel>) -> bool {
        child_type.rank() >= 1
            && child_type.count_mapped() == 0
            && spec.len() == child_type.rank()
            && child_type
                .dimensions()
                .iter()
                .all(|d| spec.contains_key(&d.name))
    }

    /// Build from a peek that passed [`Self::is_applicable`].
    pub fn new(child: TensorFunction, mut spec: BTreeMap<String, PeekLabel>) -> Self {
        let dims = child
            .result_type()
            .dimensions()
            .iter()
            .map(|dim| {
                let index = match spec.remove(&dim.name) {
                    Some(PeekLabel::Label(label)) => {
                        DenseIndex::Fixed(resolve_label(dim, &label).and_then(|l| l.as_index()))
                    }
                    Some(PeekLabel::Expr(expr)) => DenseIndex::Dynamic(expr),
                    None => DenseIndex::Fixed(None),
                };
                DensePeekDim {
                    dimension: dim.clone(),
                    index,
                }
            })
            .collect();
        Self {
            child: Box::new(child),
            dims,
        }
    }

    pub fn child(&self) -> &TensorFunction {
        &self.child
    }

    pub fn dims(&self) -> &[DensePeekDim] {
        &self.dims
    }

    pub(crate) fn child_node_count(&self) -> usize {
        self.child.node_count()
            + self
                .dims
                .iter()
                .map(|d| match &d.index {
                    DenseIndex::Fixed(_) => 0,
                    DenseIndex::Dynamic(expr) => expr.node_count(),
                })
                .sum::<usize>()
    }

    /// Row-major offset of the addressed cell, or `None` if out of range.
    fn offset<E: TensorEngine>(
        &self,
        engine: &E,
        params: &[Value<E::Tensor>],
        stash: &mut Stash<E::Tensor>,
    ) -> Result<Option<usize>> {
        let mut offset = 0;
        for dim in &self.dims {
            let idx = match &dim.index {
                DenseIndex::Fixed(idx) => *idx,
                DenseIndex::Dynamic(expr) => {
                    let value = expr.evaluate_index(&dim.dimension.name, engine, params, stash)?;
                    label_from_number(&dim.dimension, value).and_then(|l| l.as_index())
                }
            };
            let Some(idx) = idx else {
                return Ok(None);
            };
            offset = offset * dim.dimension.size.unwrap_or(1) + idx;
        }
        Ok(Some(offset))
    }

    pub(crate) fn evaluate_cell<E: TensorEngine>(
        &self,
        engine: &E,
        params: &[Value<E::Tensor>],
        stash: &mut Stash<E::Tensor>,
    ) -> Result<f64> {
        let slot = self.child.eval_slot(engine, params, stash)?;
        let Some(offset) = self.offset(engine, params, stash)? else {
            return Ok(0.0);
        };
        Ok(match lookup(params, stash, slot)? {
            Value::Tensor(tensor) => engine.dense_cell(tensor, offset).unwrap_or(0.0),
            Value::Double(_) => 0.0,
        })
    }
}

/// Optimization passes that can be applied to a tensor function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationPass {
    /// Rewrite fully addressed dense peeks into direct cell reads
    DensePeek,
    /// Resolve constant peek index expressions to labels
    ConstantIndexes,
    /// All optimization passes
    All,
}

/// Configuration for tensor function optimization
#[derive(Debug, Clone)]
pub struct OptimizationConfig {
    /// Passes to apply
    pub passes: Vec<OptimizationPass>,
    /// Log statistics after optimizing
    pub verbose: bool,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            passes: vec![OptimizationPass::All],
            verbose: false,
        }
    }
}

impl OptimizationConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration with no passes enabled
    pub fn none() -> Self {
        Self {
            passes: Vec::new(),
            verbose: false,
        }
    }

    /// Add an optimization pass
    pub fn with_pass(mut self, pass: OptimizationPass) -> Self {
        self.passes.push(pass);
        self
    }

    /// Enable verbose logging
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn is_enabled(&self, pass: OptimizationPass) -> bool {
        self.passes
            .iter()
            .any(|p| *p == pass || *p == OptimizationPass::All)
    }
}

/// Statistics from one optimization run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizationStats {
    pub nodes_before: usize,
    pub nodes_after: usize,
    pub peeks_rewritten: usize,
    pub constants_resolved: usize,
}

impl OptimizationStats {
    /// Percentage of nodes removed
    pub fn reduction_percent(&self) -> f64 {
        if self.nodes_before == 0 {
            0.0
        } else {
            100.0 * (1.0 - self.nodes_after as f64 / self.nodes_before as f64)
        }
    }
}

impl std::fmt::Display for OptimizationStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Tensor Function Optimization Statistics:")?;
        writeln!(f, "  Nodes before: {}", self.nodes_before)?;
        writeln!(f, "  Nodes after: {}", self.nodes_after)?;
        writeln!(f, "  Reduction: {:.1}%", self.reduction_percent())?;
        writeln!(f, "  Peeks rewritten: {}", self.peeks_rewritten)?;
        writeln!(f, "  Constant indexes resolved: {}", self.constants_resolved)?;
        Ok(())
    }
}

/// Value of a scalar subtree built only from constants.
pub fn constant_double(function: &TensorFunction) -> Option<f64> {
    match function {
        TensorFunction::ConstValue { spec } => spec.as_double(),
        TensorFunction::Map { child, op, .. } if child.result_type().is_scalar() => {
            constant_double(child).map(|v| op.apply(v))
        }
        TensorFunction::Join { lhs, rhs, op, .. }
            if lhs.result_type().is_scalar() && rhs.result_type().is_scalar() =>
        {
            Some(op.apply(constant_double(lhs)?, constant_double(rhs)?))
        }
        _ => None,
    }
}

/// Optimize `function` with the passes enabled in `config`.
pub fn optimize(
    function: &TensorFunction,
    config: &OptimizationConfig,
) -> (TensorFunction, OptimizationStats) {
    let mut stats = OptimizationStats {
        nodes_before: function.node_count(),
        ..Default::default()
    };
    let optimized = rewrite(function, config, &mut stats);
    stats.nodes_after = optimized.node_count();
    if config.verbose {
        info!("{}", stats);
    }
    (optimized, stats)
}

fn rewrite(
    function: &TensorFunction,
    config: &OptimizationConfig,
    stats: &mut OptimizationStats,
) -> TensorFunction {
    let boxed =
        |f: &TensorFunction, stats: &mut OptimizationStats| Box::new(rewrite(f, config, stats));
    match function {
        TensorFunction::ConstValue { .. } | TensorFunction::Inject { .. } => function.clone(),
        TensorFunction::Map {
            child,
            op,
            result_type,
        } => TensorFunction::Map {
            child: boxed(child, stats),
            op: *op,
            result_type: result_type.clone(),
        },
        TensorFunction::Join {
            lhs,
            rhs,
            op,
            result_type,
        } => TensorFunction::Join {
            lhs: boxed(lhs, stats),
            rhs: boxed(rhs, stats),
            op: *op,
            result_type: result_type.clone(),
        },
        TensorFunction::Reduce {
            child,
            aggr,
            dims,
            result_type,
        } => TensorFunction::Reduce {
            child: boxed(child, stats),
            aggr: *aggr,
            dims: dims.clone(),
            result_type: result_type.clone(),
        },
        TensorFunction::Peek {
            child,
            spec,
            result_type,
        } => {
            let child = rewrite(child, config, stats);
            let mut spec: BTreeMap<String, PeekLabel> = spec
                .iter()
                .map(|(name, label)| {
                    let label = match label {
                        PeekLabel::Label(label) => PeekLabel::Label(label.clone()),
                        PeekLabel::Expr(expr) => PeekLabel::Expr(boxed(expr, stats)),
                    };
                    (name.clone(), label)
                })
                .collect();
            if config.is_enabled(OptimizationPass::ConstantIndexes) {
                resolve_constant_indexes(child.result_type(), &mut spec, stats);
            }
            if config.is_enabled(OptimizationPass::DensePeek)
                && DenseTensorPeekFunction::is_applicable(child.result_type(), &spec)
            {
                debug!(
                    "rewriting peek over {} into dense cell lookup",
                    child.result_type()
                );
                stats.peeks_rewritten += 1;
                return TensorFunction::DenseTensorPeek(DenseTensorPeekFunction::new(child, spec));
            }
            TensorFunction::Peek {
                child: Box::new(child),
                spec,
                result_type: result_type.clone(),
            }
        }
        TensorFunction::DenseTensorPeek(dense) => {
            TensorFunction::DenseTensorPeek(DenseTensorPeekFunction {
                child: boxed(&dense.child, stats),
                dims: dense
                    .dims
                    .iter()
                    .map(|d| DensePeekDim {
                        dimension: d.dimension.clone(),
                        index: match &d.index {
                            DenseIndex::Fixed(idx) => DenseIndex::Fixed(*idx),
                            DenseIndex::Dynamic(expr) => DenseIndex::Dynamic(boxed(expr, stats)),
                        },
                    })
                    .collect(),
            })
        }
    }
}

fn resolve_constant_indexes(
    child_type: &TensorType,
    spec: &mut BTreeMap<String, PeekLabel>,
    stats: &mut OptimizationStats,
) {
    for (name, label) in spec.iter_mut() {
        let PeekLabel::Expr(expr) = label else {
            continue;
        };
        let resolved: Option<Label> = constant_double(expr)
            .zip(child_type.dimension(name))
            .and_then(|(value, dim)| label_from_number(dim, value));
        if let Some(resolved) = resolved {
            *label = PeekLabel::Label(resolved);
            stats.constants_resolved += 1;
        }
    }
}
