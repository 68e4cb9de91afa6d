//! Cell-level operations used by map and join.
//!
//! [`MapOp`] is applied to one cell value, [`JoinOp`] combines one lhs cell
//! with one rhs cell. Both offer a `Custom` variant wrapping a plain function
//! pointer for operations outside the built-in set.

use std::fmt;

/// Unary cell operation
#[derive(Clone, Copy)]
pub enum MapOp {
    /// Negation: -x
    Neg,
    /// Absolute value: |x|
    Abs,
    /// Exponential: e^x
    Exp,
    /// Natural logarithm: ln(x)
    Log,
    /// Square root
    Sqrt,
    /// Square: x^2
    Sqr,
    /// Reciprocal: 1/x
    Recip,
    /// Sigmoid: 1 / (1 + e^(-x))
    Sigmoid,
    /// Rectified linear unit: max(0, x)
    Relu,
    Custom(fn(f64) -> f64),
}

impl MapOp {
    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            MapOp::Neg => -x,
            MapOp::Abs => x.abs(),
            MapOp::Exp => x.exp(),
            MapOp::Log => x.ln(),
            MapOp::Sqrt => x.sqrt(),
            MapOp::Sqr => x * x,
            MapOp::Recip => 1.0 / x,
            MapOp::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            MapOp::Relu => x.max(0.0),
            MapOp::Custom(f) => f(x),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MapOp::Neg => "neg",
            MapOp::Abs => "abs",
            MapOp::Exp => "exp",
            MapOp::Log => "log",
            MapOp::Sqrt => "sqrt",
            MapOp::Sqr => "sqr",
            MapOp::Recip => "recip",
            MapOp::Sigmoid => "sigmoid",
            MapOp::Relu => "relu",
            MapOp::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for MapOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binary cell operation
#[derive(Clone, Copy)]
pub enum JoinOp {
    /// x + y
    Add,
    /// x - y
    Sub,
    /// x * y
    Mul,
    /// x / y
    Div,
    /// x^y
    Pow,
    Max,
    Min,
    Custom(fn(f64, f64) -> f64),
}

impl JoinOp {
    #[inline]
    pub fn apply(self, x: f64, y: f64) -> f64 {
        match self {
            JoinOp::Add => x + y,
            JoinOp::Sub => x - y,
            JoinOp::Mul => x * y,
            JoinOp::Div => x / y,
            JoinOp::Pow => x.powf(y),
            JoinOp::Max => x.max(y),
            JoinOp::Min => x.min(y),
            JoinOp::Custom(f) => f(x, y),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            JoinOp::Add => "add",
            JoinOp::Sub => "sub",
            JoinOp::Mul => "mul",
            JoinOp::Div => "div",
            JoinOp::Pow => "pow",
            JoinOp::Max => "max",
            JoinOp::Min => "min",
            JoinOp::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for JoinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
