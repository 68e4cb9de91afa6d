//! Engine-neutral tensor description.
//!
//! A [`TensorSpec`] is a tensor type plus an explicit list of cells. Engines
//! build their values from specs and export them back to specs, which makes
//! the spec the common currency for comparing results across engines.
//!
//! # Equality
//!
//! Types must match exactly. Cells compare by value, with any address present
//! on only one side counting as 0.0 there, so a spec listing a zero cell equals
//! one that omits it. NaN compares equal to NaN.
//!
//! # Examples
//!
//! ```
//! use tenval_core::{Label, TensorSpec};
//!
//! let a = TensorSpec::parse("tensor(x[2])").unwrap()
//!     .add([("x", Label::from(0))], 1.0)
//!     .add([("x", Label::from(1))], 0.0);
//! let b = TensorSpec::parse("tensor(x[2])").unwrap()
//!     .add([("x", Label::from(0))], 1.0);
//! assert_eq!(a, b);
//! ```

use crate::address::{format_address, validate_address, Address, Label};
use crate::error::CoreResult;
use crate::types::TensorType;
use std::collections::BTreeMap;
use std::fmt;

/// A tensor type with explicitly listed cells.
#[derive(Debug, Clone)]
pub struct TensorSpec {
    value_type: TensorType,
    cells: BTreeMap<Address, f64>,
}

impl TensorSpec {
    pub fn new(value_type: TensorType) -> Self {
        Self {
            value_type,
            cells: BTreeMap::new(),
        }
    }

    /// Spec with the type given in textual form.
    pub fn parse(value_type: &str) -> CoreResult<Self> {
        Ok(Self::new(TensorType::parse(value_type)?))
    }

    /// Spec of the scalar `value`.
    pub fn scalar(value: f64) -> Self {
        let mut spec = Self::new(TensorType::double());
        spec.insert(Address::new(), value);
        spec
    }

    /// Add a cell, builder style. A later value for the same address wins.
    pub fn add<N, I>(mut self, address: I, value: f64) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Label)>,
    {
        self.insert(crate::address::address(address), value);
        self
    }

    /// Set the value at `address`, replacing any earlier value.
    pub fn insert(&mut self, address: Address, value: f64) {
        self.cells.insert(address, value);
    }

    pub fn value_type(&self) -> &TensorType {
        &self.value_type
    }

    pub fn cells(&self) -> &BTreeMap<Address, f64> {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Value at `address`, 0.0 when not listed.
    pub fn value_of(&self, address: &Address) -> f64 {
        self.cells.get(address).copied().unwrap_or(0.0)
    }

    /// Scalar value of a `double` spec.
    pub fn as_double(&self) -> Option<f64> {
        self.value_type
            .is_scalar()
            .then(|| self.value_of(&Address::new()))
    }

    /// Check every listed address against the type.
    pub fn validate(&self) -> CoreResult<()> {
        self.cells
            .keys()
            .try_for_each(|address| validate_address(&self.value_type, address))
    }
}

fn same_value(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl PartialEq for TensorSpec {
    fn eq(&self, other: &Self) -> bool {
        if self.value_type != other.value_type {
            return false;
        }
        let lhs_ok = self
            .cells
            .iter()
            .all(|(addr, value)| same_value(*value, other.value_of(addr)));
        let rhs_ok = other
            .cells
            .iter()
            .filter(|(addr, _)| !self.cells.contains_key(*addr))
            .all(|(_, value)| same_value(*value, 0.0));
        lhs_ok && rhs_ok
    }
}

impl fmt::Display for TensorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spec({}) {{", self.value_type)?;
        for (address, value) in &self.cells {
            write!(f, "\n  {}: {}", format_address(address), value)?;
        }
        if !self.cells.is_empty() {
            writeln!(f)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn test_last_write_wins() {
        let spec = TensorSpec::parse("tensor(x{})")
            .unwrap()
            .add([("x", Label::from("a"))], 1.0)
            .add([("x", Label::from("a"))], 5.0);
        assert_eq!(spec.len(), 1);
        assert_eq!(
            spec.value_of(&crate::address::address([("x", Label::from("a"))])),
            5.0
        );
    }

    #[test]
    fn test_equality_rules() {
        let base = TensorSpec::parse("tensor(x{})").unwrap();
        let a = base.clone().add([("x", Label::from("a"))], f64::NAN);
        let b = base
            .clone()
            .add([("x", Label::from("a"))], f64::NAN)
            .add([("x", Label::from("b"))], 0.0);
        let c = base.clone().add([("x", Label::from("b"))], 1.0);
        assert_eq!(a, b);
        assert_eq!(b, a);
        assert_ne!(base, c);
        assert_ne!(c, base);
        assert_ne!(base, TensorSpec::parse("tensor(y{})").unwrap());
    }

    #[test]
    fn test_validate() {
        let spec = TensorSpec::parse("tensor(x[2])")
            .unwrap()
            .add([("x", Label::from(2))], 1.0);
        assert!(matches!(
            spec.validate(),
            Err(CoreError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_scalar() {
        let spec = TensorSpec::scalar(3.5);
        assert_eq!(spec.as_double(), Some(3.5));
        assert_eq!(TensorSpec::new(TensorType::double()).as_double(), Some(0.0));
        assert_eq!(TensorSpec::parse("tensor(x{})").unwrap().as_double(), None);
        assert_eq!(spec.to_string(), "spec(double) {\n  {}: 3.5\n}");
    }
}
