//! Tensor engine abstraction.
//!
//! A [`TensorEngine`] owns one tensor representation and implements the value
//! algebra over it. All engines must agree: for identical inputs, every
//! operation yields results whose [`TensorSpec`]s compare equal. The
//! reference engine ([`crate::SimpleEngine`]) defines the expected results;
//! [`crate::conformance`] checks other engines against it.
//!
//! Values are either plain doubles or engine tensors. Engines never return a
//! tensor of scalar type: scalar results are always [`Value::Double`].

use anyhow::Result;
use std::fmt;
use tenval_core::{Address, Aggr, JoinOp, MapOp, TensorSpec, TensorType};
use tenval_sparse::CodecFormat;

pub(crate) static DOUBLE: TensorType = TensorType::double();

/// Engine tensor types expose their tensor type.
pub trait TensorValue: Clone + fmt::Debug + Send + Sync {
    fn value_type(&self) -> &TensorType;
}

/// A double or an engine tensor.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<T> {
    Double(f64),
    Tensor(T),
}

impl<T: TensorValue> Value<T> {
    pub fn value_type(&self) -> &TensorType {
        match self {
            Value::Double(_) => &DOUBLE,
            Value::Tensor(t) => t.value_type(),
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Tensor(_) => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&T> {
        match self {
            Value::Double(_) => None,
            Value::Tensor(t) => Some(t),
        }
    }
}

/// Value algebra over one tensor representation.
///
/// Implementations are stateless, so one engine can serve any number of
/// concurrent evaluations.
pub trait TensorEngine: Send + Sync {
    type Tensor: TensorValue;

    fn name(&self) -> &'static str;

    /// Build a value from a spec. Scalar specs become [`Value::Double`].
    fn from_spec(&self, spec: &TensorSpec) -> Result<Value<Self::Tensor>>;

    /// Fully materialized spec of `value`.
    fn to_spec(&self, value: &Value<Self::Tensor>) -> TensorSpec;

    fn map(&self, value: &Value<Self::Tensor>, op: MapOp) -> Result<Value<Self::Tensor>>;

    fn join(
        &self,
        lhs: &Value<Self::Tensor>,
        rhs: &Value<Self::Tensor>,
        op: JoinOp,
    ) -> Result<Value<Self::Tensor>>;

    fn reduce(
        &self,
        value: &Value<Self::Tensor>,
        aggr: Aggr,
        dims: &[String],
    ) -> Result<Value<Self::Tensor>>;

    /// Generic label lookup on the addressed dimensions.
    fn peek(&self, value: &Value<Self::Tensor>, address: &Address)
        -> Result<Value<Self::Tensor>>;

    /// Cell at row-major `offset` of a dense tensor; `None` for non-dense
    /// tensors or offsets past the end.
    fn dense_cell(&self, tensor: &Self::Tensor, offset: usize) -> Option<f64>;

    fn encode(&self, value: &Value<Self::Tensor>, format: CodecFormat) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<Value<Self::Tensor>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenval_sparse::SimpleTensor;

    #[test]
    fn test_double_value_type() {
        let v: Value<SimpleTensor> = Value::Double(1.5);
        assert!(v.value_type().is_scalar());
        assert_eq!(v.as_double(), Some(1.5));
        assert!(v.as_tensor().is_none());
    }
}
