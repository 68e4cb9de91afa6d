//! Reference engine over [`SimpleTensor`].

use crate::engine::{TensorEngine, TensorValue, Value};
use anyhow::Result;
use tenval_core::layout::indexed_sizes;
use tenval_core::{Address, Aggr, JoinOp, MapOp, TensorSpec, TensorType};
use tenval_sparse::{CodecFormat, SimpleTensor};

impl TensorValue for SimpleTensor {
    fn value_type(&self) -> &TensorType {
        SimpleTensor::value_type(self)
    }
}

/// Engine whose results define correct behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleEngine;

impl SimpleEngine {
    pub fn new() -> Self {
        Self
    }

    fn lift(value: &Value<SimpleTensor>) -> SimpleTensor {
        match value {
            Value::Double(v) => SimpleTensor::from_double(*v),
            Value::Tensor(t) => t.clone(),
        }
    }

    fn wrap(tensor: SimpleTensor) -> Value<SimpleTensor> {
        match tensor.as_double() {
            Some(v) => Value::Double(v),
            None => Value::Tensor(tensor),
        }
    }
}

impl TensorEngine for SimpleEngine {
    type Tensor = SimpleTensor;

    fn name(&self) -> &'static str {
        "simple"
    }

    fn from_spec(&self, spec: &TensorSpec) -> Result<Value<SimpleTensor>> {
        Ok(Self::wrap(SimpleTensor::create(spec)?))
    }

    fn to_spec(&self, value: &Value<SimpleTensor>) -> TensorSpec {
        match value {
            Value::Double(v) => TensorSpec::scalar(*v),
            Value::Tensor(t) => t.to_spec(),
        }
    }

    fn map(&self, value: &Value<SimpleTensor>, op: MapOp) -> Result<Value<SimpleTensor>> {
        Ok(match value {
            Value::Double(v) => Value::Double(op.apply(*v)),
            Value::Tensor(t) => Value::Tensor(t.map(op)),
        })
    }

    fn join(
        &self,
        lhs: &Value<SimpleTensor>,
        rhs: &Value<SimpleTensor>,
        op: JoinOp,
    ) -> Result<Value<SimpleTensor>> {
        if let (Value::Double(a), Value::Double(b)) = (lhs, rhs) {
            return Ok(Value::Double(op.apply(*a, *b)));
        }
        let result = SimpleTensor::join(&Self::lift(lhs), &Self::lift(rhs), op)?;
        Ok(Self::wrap(result))
    }

    fn reduce(
        &self,
        value: &Value<SimpleTensor>,
        aggr: Aggr,
        dims: &[String],
    ) -> Result<Value<SimpleTensor>> {
        Ok(Self::wrap(Self::lift(value).reduce(aggr, dims)?))
    }

    fn peek(&self, value: &Value<SimpleTensor>, address: &Address) -> Result<Value<SimpleTensor>> {
        Ok(Self::wrap(Self::lift(value).peek(address)?))
    }

    fn dense_cell(&self, tensor: &SimpleTensor, offset: usize) -> Option<f64> {
        let value_type = tensor.value_type();
        if value_type.count_mapped() > 0 {
            return None;
        }
        let block: usize = indexed_sizes(value_type).iter().product();
        if offset >= block {
            return None;
        }
        tensor.cells().get(offset).map(|c| c.value)
    }

    fn encode(&self, value: &Value<SimpleTensor>, format: CodecFormat) -> Result<Vec<u8>> {
        Ok(Self::lift(value).encode(format)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value<SimpleTensor>> {
        Ok(Self::wrap(SimpleTensor::decode(bytes)?))
    }
}
