//! Typed tensor function trees and their evaluation.
//!
//! A [`TensorFunction`] is built bottom-up; every constructor checks its
//! inputs and computes the node's result type, so a finished tree is always
//! well typed. Evaluation walks the tree against a [`TensorEngine`], storing
//! each intermediate in a [`Stash`].

use crate::engine::{TensorEngine, Value, DOUBLE};
use crate::error::ExecError;
use crate::optimize::DenseTensorPeekFunction;
use crate::stash::Stash;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use tenval_core::{
    label_from_number, Address, Aggr, JoinOp, Label, MapOp, TensorSpec, TensorType,
};

/// Peek component for one dimension
#[derive(Debug, Clone)]
pub enum PeekLabel {
    /// Literal label
    Label(Label),
    /// Double-valued expression, truncated toward zero at evaluation time
    Expr(Box<TensorFunction>),
}

impl From<Label> for PeekLabel {
    fn from(label: Label) -> Self {
        PeekLabel::Label(label)
    }
}

impl From<TensorFunction> for PeekLabel {
    fn from(function: TensorFunction) -> Self {
        PeekLabel::Expr(Box::new(function))
    }
}

/// Node of a tensor function tree
#[derive(Debug, Clone)]
pub enum TensorFunction {
    /// Constant value
    ConstValue { spec: TensorSpec },
    /// Evaluation parameter `param`, which must have type `value_type`
    Inject { value_type: TensorType, param: usize },
    Map {
        child: Box<TensorFunction>,
        op: MapOp,
        result_type: TensorType,
    },
    Join {
        lhs: Box<TensorFunction>,
        rhs: Box<TensorFunction>,
        op: JoinOp,
        result_type: TensorType,
    },
    Reduce {
        child: Box<TensorFunction>,
        aggr: Aggr,
        dims: Vec<String>,
        result_type: TensorType,
    },
    /// Generic label lookup
    Peek {
        child: Box<TensorFunction>,
        spec: BTreeMap<String, PeekLabel>,
        result_type: TensorType,
    },
    /// Single-cell lookup through direct dense indexing
    DenseTensorPeek(DenseTensorPeekFunction),
}

/// Where an evaluated value lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Param(usize),
    Stash(usize),
}

pub(crate) fn lookup<'a, T>(
    params: &'a [Value<T>],
    stash: &'a Stash<T>,
    slot: Slot,
) -> Result<&'a Value<T>> {
    match slot {
        Slot::Param(idx) => params.get(idx),
        Slot::Stash(idx) => stash.get(idx),
    }
    .ok_or_else(|| anyhow!("dangling evaluation slot {:?}", slot))
}

impl TensorFunction {
    /// Constant node; the spec must be valid for its type.
    pub fn const_value(spec: TensorSpec) -> Result<Self> {
        spec.validate()?;
        Ok(TensorFunction::ConstValue { spec })
    }

    /// Constant double
    pub fn double(value: f64) -> Self {
        TensorFunction::ConstValue {
            spec: TensorSpec::scalar(value),
        }
    }

    pub fn inject(value_type: TensorType, param: usize) -> Self {
        TensorFunction::Inject { value_type, param }
    }

    pub fn map(child: TensorFunction, op: MapOp) -> Self {
        let result_type = child.result_type().clone();
        TensorFunction::Map {
            child: Box::new(child),
            op,
            result_type,
        }
    }

    pub fn join(lhs: TensorFunction, rhs: TensorFunction, op: JoinOp) -> Result<Self> {
        let result_type = TensorType::join(lhs.result_type(), rhs.result_type())?;
        Ok(TensorFunction::Join {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            op,
            result_type,
        })
    }

    pub fn reduce<S: AsRef<str>>(child: TensorFunction, aggr: Aggr, dims: &[S]) -> Result<Self> {
        let result_type = child.result_type().reduce(dims)?;
        Ok(TensorFunction::Reduce {
            child: Box::new(child),
            aggr,
            dims: dims.iter().map(|d| d.as_ref().to_string()).collect(),
            result_type,
        })
    }

    /// Peek node addressing the dimensions named in `spec`.
    ///
    /// Every addressed dimension must exist in the child type and every
    /// expression component must produce a double.
    pub fn peek(child: TensorFunction, spec: BTreeMap<String, PeekLabel>) -> Result<Self> {
        let child_type = child.result_type();
        for (name, label) in &spec {
            if child_type.dimension(name).is_none() {
                return Err(ExecError::UnknownPeekDimension {
                    name: name.clone(),
                    value_type: child_type.to_string(),
                }
                .into());
            }
            if let PeekLabel::Expr(expr) = label {
                if !expr.result_type().is_scalar() {
                    return Err(ExecError::TypeMismatch {
                        expected: DOUBLE.to_string(),
                        found: expr.result_type().to_string(),
                    }
                    .into());
                }
            }
        }
        let names: Vec<&str> = spec.keys().map(String::as_str).collect();
        let result_type = child_type.peek(&names)?;
        Ok(TensorFunction::Peek {
            child: Box::new(child),
            spec,
            result_type,
        })
    }

    pub fn result_type(&self) -> &TensorType {
        match self {
            TensorFunction::ConstValue { spec } => spec.value_type(),
            TensorFunction::Inject { value_type, .. } => value_type,
            TensorFunction::Map { result_type, .. }
            | TensorFunction::Join { result_type, .. }
            | TensorFunction::Reduce { result_type, .. }
            | TensorFunction::Peek { result_type, .. } => result_type,
            TensorFunction::DenseTensorPeek(_) => &DOUBLE,
        }
    }

    /// Whether evaluation produces a fresh value rather than exposing a
    /// constant or a parameter.
    pub fn result_is_mutable(&self) -> bool {
        !matches!(
            self,
            TensorFunction::ConstValue { .. } | TensorFunction::Inject { .. }
        )
    }

    /// Number of nodes in the tree, including peek index expressions.
    pub fn node_count(&self) -> usize {
        1 + match self {
            TensorFunction::ConstValue { .. } | TensorFunction::Inject { .. } => 0,
            TensorFunction::Map { child, .. } | TensorFunction::Reduce { child, .. } => {
                child.node_count()
            }
            TensorFunction::Join { lhs, rhs, .. } => lhs.node_count() + rhs.node_count(),
            TensorFunction::Peek { child, spec, .. } => {
                child.node_count()
                    + spec
                        .values()
                        .map(|label| match label {
                            PeekLabel::Label(_) => 0,
                            PeekLabel::Expr(expr) => expr.node_count(),
                        })
                        .sum::<usize>()
            }
            TensorFunction::DenseTensorPeek(dense) => dense.child_node_count(),
        }
    }

    /// Evaluate against `engine`.
    ///
    /// The returned value either is one of `params` or lives in `stash`.
    pub fn evaluate<'a, E: TensorEngine>(
        &self,
        engine: &E,
        params: &'a [Value<E::Tensor>],
        stash: &'a mut Stash<E::Tensor>,
    ) -> Result<&'a Value<E::Tensor>> {
        let slot = self.eval_slot(engine, params, stash)?;
        let stash: &'a Stash<E::Tensor> = stash;
        lookup(params, stash, slot)
    }

    pub(crate) fn eval_slot<E: TensorEngine>(
        &self,
        engine: &E,
        params: &[Value<E::Tensor>],
        stash: &mut Stash<E::Tensor>,
    ) -> Result<Slot> {
        let value = match self {
            TensorFunction::ConstValue { spec } => engine.from_spec(spec)?,
            TensorFunction::Inject { value_type, param } => {
                let value = params.get(*param).ok_or(ExecError::ParamOutOfRange {
                    index: *param,
                    count: params.len(),
                })?;
                if value.value_type() != value_type {
                    return Err(ExecError::TypeMismatch {
                        expected: value_type.to_string(),
                        found: value.value_type().to_string(),
                    }
                    .into());
                }
                return Ok(Slot::Param(*param));
            }
            TensorFunction::Map { child, op, .. } => {
                let slot = child.eval_slot(engine, params, stash)?;
                engine.map(lookup(params, stash, slot)?, *op)?
            }
            TensorFunction::Join { lhs, rhs, op, .. } => {
                let a = lhs.eval_slot(engine, params, stash)?;
                let b = rhs.eval_slot(engine, params, stash)?;
                engine.join(lookup(params, stash, a)?, lookup(params, stash, b)?, *op)?
            }
            TensorFunction::Reduce {
                child, aggr, dims, ..
            } => {
                let slot = child.eval_slot(engine, params, stash)?;
                engine.reduce(lookup(params, stash, slot)?, *aggr, dims)?
            }
            TensorFunction::Peek {
                child,
                spec,
                result_type,
            } => {
                let slot = child.eval_slot(engine, params, stash)?;
                match self.peek_address(child.result_type(), spec, engine, params, stash)? {
                    Some(address) => engine.peek(lookup(params, stash, slot)?, &address)?,
                    None => engine.from_spec(&TensorSpec::new(result_type.clone()))?,
                }
            }
            TensorFunction::DenseTensorPeek(dense) => {
                Value::Double(dense.evaluate_cell(engine, params, stash)?)
            }
        };
        Ok(Slot::Stash(stash.push(value)?))
    }

    /// Resolve the peek components; `None` if some computed index addresses
    /// nothing.
    fn peek_address<E: TensorEngine>(
        &self,
        child_type: &TensorType,
        spec: &BTreeMap<String, PeekLabel>,
        engine: &E,
        params: &[Value<E::Tensor>],
        stash: &mut Stash<E::Tensor>,
    ) -> Result<Option<Address>> {
        let mut address = Address::new();
        for (name, label) in spec {
            let label = match label {
                PeekLabel::Label(label) => label.clone(),
                PeekLabel::Expr(expr) => {
                    let dim = child_type.dimension(name).ok_or_else(|| {
                        ExecError::UnknownPeekDimension {
                            name: name.clone(),
                            value_type: child_type.to_string(),
                        }
                    })?;
                    let value = expr.evaluate_index(name, engine, params, stash)?;
                    match label_from_number(dim, value) {
                        Some(label) => label,
                        None => return Ok(None),
                    }
                }
            };
            address.insert(name.clone(), label);
        }
        Ok(Some(address))
    }

    /// Evaluate a peek index expression for `dimension` as a double.
    pub(crate) fn evaluate_index<E: TensorEngine>(
        &self,
        dimension: &str,
        engine: &E,
        params: &[Value<E::Tensor>],
        stash: &mut Stash<E::Tensor>,
    ) -> Result<f64> {
        let slot = self.eval_slot(engine, params, stash)?;
        let value = lookup(params, stash, slot)?;
        value.as_double().ok_or_else(|| {
            ExecError::NotScalar {
                dimension: dimension.to_string(),
                value_type: value.value_type().to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimpleEngine;

    fn x3() -> TensorSpec {
        TensorSpec::parse("tensor(x[3])")
            .unwrap()
            .add([("x", Label::from(0))], 1.0)
            .add([("x", Label::from(1))], 2.0)
            .add([("x", Label::from(2))], 3.0)
    }

    fn peek_x(child: TensorFunction, label: impl Into<PeekLabel>) -> Result<TensorFunction> {
        TensorFunction::peek(child, BTreeMap::from([("x".to_string(), label.into())]))
    }

    #[test]
    fn test_result_types() {
        let t = TensorFunction::const_value(x3()).unwrap();
        let sum = TensorFunction::reduce(t.clone(), Aggr::Sum, &["x"]).unwrap();
        assert!(sum.result_type().is_scalar());
        let joined =
            TensorFunction::join(t.clone(), TensorFunction::double(2.0), JoinOp::Mul).unwrap();
        assert_eq!(joined.result_type().to_string(), "tensor(x[3])");
        assert_eq!(joined.node_count(), 3);
        assert!(!t.result_is_mutable());
        assert!(joined.result_is_mutable());
    }

    #[test]
    fn test_peek_type_checks() {
        let t = TensorFunction::const_value(x3()).unwrap();
        let err = TensorFunction::peek(
            t.clone(),
            BTreeMap::from([("y".to_string(), PeekLabel::from(Label::from(0)))]),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExecError>(),
            Some(ExecError::UnknownPeekDimension { .. })
        ));

        let err = peek_x(t.clone(), t).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExecError>(),
            Some(ExecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_evaluate_generic_peek() {
        let engine = SimpleEngine::new();
        let t = TensorFunction::const_value(x3()).unwrap();
        let a = TensorFunction::inject(TensorType::double(), 0);
        let params = [Value::Double(1.7)];

        let f = peek_x(t.clone(), a.clone()).unwrap();
        let mut stash = Stash::new();
        assert_eq!(
            f.evaluate(&engine, &params, &mut stash).unwrap(),
            &Value::Double(2.0)
        );

        let minus_two =
            TensorFunction::join(a, TensorFunction::double(2.0), JoinOp::Sub).unwrap();
        let f = peek_x(t, minus_two).unwrap();
        let mut stash = Stash::new();
        assert_eq!(
            f.evaluate(&engine, &[Value::Double(1.0)], &mut stash)
                .unwrap(),
            &Value::Double(0.0)
        );
    }

    #[test]
    fn test_inject_checks_params() {
        let engine = SimpleEngine::new();
        let f = TensorFunction::inject(TensorType::double(), 1);
        let mut stash = Stash::new();
        let err = f
            .evaluate(&engine, &[Value::Double(1.0)], &mut stash)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ExecError>(),
            Some(&ExecError::ParamOutOfRange { index: 1, count: 1 })
        );

        let f = TensorFunction::inject(TensorType::parse("tensor(x[3])").unwrap(), 0);
        let mut stash = Stash::new();
        let err = f
            .evaluate(&engine, &[Value::Double(1.0)], &mut stash)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExecError>(),
            Some(ExecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_inject_borrows_params() {
        let engine = SimpleEngine::new();
        let f = TensorFunction::inject(TensorType::double(), 0);
        let params = [Value::Double(5.0)];
        let mut stash = Stash::new();
        let value = f.evaluate(&engine, &params, &mut stash).unwrap();
        assert!(std::ptr::eq(value, &params[0]));
    }

    #[test]
    fn test_stash_limit_is_fatal() {
        let engine = SimpleEngine::new();
        let t = TensorFunction::const_value(x3()).unwrap();
        let f = TensorFunction::map(TensorFunction::map(t, MapOp::Neg), MapOp::Abs);
        let mut stash = Stash::with_limit(2);
        let err = f.evaluate(&engine, &[], &mut stash).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ExecError>(),
            Some(&ExecError::StashExhausted { limit: 2 })
        );
    }
}
