//! Bound tensor function ready for repeated evaluation

use crate::engine::{TensorEngine, Value};
use crate::function::TensorFunction;
use crate::hints::ExecHints;
use crate::optimize::{optimize, OptimizationConfig, OptimizationStats};
use crate::stash::Stash;
use anyhow::Result;
use tenval_core::TensorSpec;

/// A tensor function bound to an engine and execution hints.
///
/// The function is optimized once at construction when
/// [`ExecHints::optimize`] is set.
#[derive(Debug, Clone)]
pub struct Evaluator<E: TensorEngine> {
    engine: E,
    function: TensorFunction,
    hints: ExecHints,
    stats: Option<OptimizationStats>,
}

impl<E: TensorEngine> Evaluator<E> {
    pub fn new(engine: E, function: TensorFunction, hints: ExecHints) -> Self {
        Self::with_config(engine, function, hints, &OptimizationConfig::default())
    }

    pub fn with_config(
        engine: E,
        function: TensorFunction,
        hints: ExecHints,
        config: &OptimizationConfig,
    ) -> Self {
        let (function, stats) = if hints.optimize {
            let (optimized, stats) = optimize(&function, config);
            (optimized, Some(stats))
        } else {
            (function, None)
        };
        Self {
            engine,
            function,
            hints,
            stats,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The function that is evaluated, after optimization
    pub fn function(&self) -> &TensorFunction {
        &self.function
    }

    pub fn optimization_stats(&self) -> Option<&OptimizationStats> {
        self.stats.as_ref()
    }

    /// Empty stash honoring the configured limit
    pub fn new_stash(&self) -> Stash<E::Tensor> {
        match self.hints.stash_limit {
            Some(limit) => Stash::with_limit(limit),
            None => Stash::new(),
        }
    }

    /// Evaluate into `stash`, clearing whatever it held before.
    pub fn evaluate<'a>(
        &self,
        params: &'a [Value<E::Tensor>],
        stash: &'a mut Stash<E::Tensor>,
    ) -> Result<&'a Value<E::Tensor>> {
        stash.clear();
        self.function.evaluate(&self.engine, params, stash)
    }

    pub fn evaluate_spec(&self, params: &[Value<E::Tensor>]) -> Result<TensorSpec> {
        let mut stash = self.new_stash();
        let value = self.evaluate(params, &mut stash)?;
        Ok(self.engine.to_spec(value))
    }

    /// Evaluate and encode the result with the configured format.
    pub fn evaluate_encoded(&self, params: &[Value<E::Tensor>]) -> Result<Vec<u8>> {
        let mut stash = self.new_stash();
        let value = self.evaluate(params, &mut stash)?;
        self.engine.encode(value, self.hints.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PackedEngine, PeekLabel, SimpleEngine};
    use std::collections::BTreeMap;
    use tenval_core::{Label, TensorType};
    use tenval_sparse::CodecFormat;

    fn peek_function() -> TensorFunction {
        let x3 = TensorFunction::inject(TensorType::parse("tensor(x[3])").unwrap(), 0);
        let a = TensorFunction::inject(TensorType::double(), 1);
        TensorFunction::peek(x3, BTreeMap::from([("x".to_string(), PeekLabel::from(a))])).unwrap()
    }

    fn x3_spec() -> TensorSpec {
        TensorSpec::parse("tensor(x[3])")
            .unwrap()
            .add([("x", Label::from(0))], 1.0)
            .add([("x", Label::from(1))], 2.0)
            .add([("x", Label::from(2))], 3.0)
    }

    #[test]
    fn test_optimizes_by_default() {
        let evaluator = Evaluator::new(PackedEngine::new(), peek_function(), ExecHints::new());
        assert!(matches!(
            evaluator.function(),
            TensorFunction::DenseTensorPeek(_)
        ));
        assert_eq!(evaluator.optimization_stats().unwrap().peeks_rewritten, 1);

        let plain = Evaluator::new(
            PackedEngine::new(),
            peek_function(),
            ExecHints::new().with_optimize(false),
        );
        assert!(matches!(plain.function(), TensorFunction::Peek { .. }));
        assert!(plain.optimization_stats().is_none());
    }

    #[test]
    fn test_stash_is_reused() {
        let engine = SimpleEngine::new();
        let evaluator = Evaluator::new(engine, peek_function(), ExecHints::new());
        let params = [
            engine.from_spec(&x3_spec()).unwrap(),
            Value::Double(2.0),
        ];
        let mut stash = evaluator.new_stash();
        assert_eq!(
            evaluator.evaluate(&params, &mut stash).unwrap(),
            &Value::Double(3.0)
        );
        assert_eq!(
            evaluator.evaluate(&params, &mut stash).unwrap(),
            &Value::Double(3.0)
        );
        assert_eq!(stash.len(), 1);
    }

    #[test]
    fn test_encoded_result() {
        let engine = PackedEngine::new();
        let evaluator = Evaluator::new(
            engine,
            peek_function(),
            ExecHints::new().with_format(CodecFormat::Explicit),
        );
        let params = [engine.from_spec(&x3_spec()).unwrap(), Value::Double(0.0)];
        let bytes = evaluator.evaluate_encoded(&params).unwrap();
        assert_eq!(bytes[0], 6);
        assert_eq!(
            engine.to_spec(&engine.decode(&bytes).unwrap()),
            TensorSpec::scalar(1.0)
        );
    }
}
