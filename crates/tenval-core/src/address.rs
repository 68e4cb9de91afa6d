//! Labels and addresses of tensor cells.
//!
//! An [`Address`] maps every dimension name of a tensor type to a [`Label`]:
//! a string for mapped dimensions and an integer index for indexed ones.
//! Addresses are `BTreeMap`s, so they iterate in canonical dimension order.

use crate::error::{CoreError, CoreResult};
use crate::types::{Dimension, TensorType};
use std::collections::BTreeMap;
use std::fmt;

/// Label of a cell along one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Label {
    /// Position along an indexed dimension
    Indexed(usize),
    /// Label along a mapped dimension
    Mapped(String),
}

impl Label {
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Label::Indexed(idx) => Some(*idx),
            Label::Mapped(_) => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Label::Indexed(_) => None,
            Label::Mapped(name) => Some(name),
        }
    }
}

impl From<usize> for Label {
    fn from(idx: usize) -> Self {
        Label::Indexed(idx)
    }
}

impl From<&str> for Label {
    fn from(name: &str) -> Self {
        Label::Mapped(name.to_string())
    }
}

impl From<String> for Label {
    fn from(name: String) -> Self {
        Label::Mapped(name)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Indexed(idx) => write!(f, "{}", idx),
            Label::Mapped(name) => f.write_str(name),
        }
    }
}

/// Cell address: dimension name to label, in canonical order.
pub type Address = BTreeMap<String, Label>;

/// Build an address from `(dimension, label)` pairs.
///
/// ```
/// use tenval_core::{address, Label};
///
/// let addr = address([("y", Label::from(1)), ("x", Label::from("a"))]);
/// assert_eq!(tenval_core::format_address(&addr), "{x:a,y:1}");
/// ```
pub fn address<N, I>(entries: I) -> Address
where
    N: Into<String>,
    I: IntoIterator<Item = (N, Label)>,
{
    entries
        .into_iter()
        .map(|(name, label)| (name.into(), label))
        .collect()
}

/// Render an address as `{x:a,y:1}`.
pub fn format_address(address: &Address) -> String {
    let body: Vec<String> = address
        .iter()
        .map(|(name, label)| format!("{}:{}", name, label))
        .collect();
    format!("{{{}}}", body.join(","))
}

/// Check that `address` is a complete, well-formed address for `value_type`.
///
/// # Errors
///
/// Missing or unknown dimensions, labels of the wrong kind and indexes past
/// the dimension size yield [`CoreError::InvalidAddress`].
pub fn validate_address(value_type: &TensorType, address: &Address) -> CoreResult<()> {
    let invalid = |reason: String| CoreError::InvalidAddress {
        address: format_address(address),
        value_type: value_type.to_string(),
        reason,
    };
    if address.len() != value_type.rank() {
        if let Some(dim) = value_type
            .dimensions()
            .iter()
            .find(|d| !address.contains_key(&d.name))
        {
            return Err(invalid(format!("missing dimension '{}'", dim.name)));
        }
    }
    for (name, label) in address {
        let dim = value_type
            .dimension(name)
            .ok_or_else(|| invalid(format!("unknown dimension '{}'", name)))?;
        check_label(dim, label).map_err(invalid)?;
    }
    Ok(())
}

fn check_label(dim: &Dimension, label: &Label) -> Result<(), String> {
    match (dim.size, label) {
        (None, Label::Mapped(_)) => Ok(()),
        (Some(size), Label::Indexed(idx)) if *idx < size => Ok(()),
        (Some(size), Label::Indexed(idx)) => Err(format!(
            "index {} out of range for '{}' (size {})",
            idx, dim.name, size
        )),
        (None, Label::Indexed(_)) => Err(format!("'{}' is mapped, got an index", dim.name)),
        (Some(_), Label::Mapped(_)) => Err(format!("'{}' is indexed, got a label", dim.name)),
    }
}

/// Turn a computed peek coordinate into a label for `dim`.
///
/// The value is truncated toward zero. For indexed dimensions the result must
/// fall inside `[0, size)`; for mapped dimensions the truncated integer is
/// formatted as the label string. Non-finite values address nothing.
///
/// ```
/// use tenval_core::{label_from_number, Dimension, Label};
///
/// let x = Dimension::indexed("x", 3);
/// assert_eq!(label_from_number(&x, 1.7), Some(Label::Indexed(1)));
/// assert_eq!(label_from_number(&x, -0.5), Some(Label::Indexed(0)));
/// assert_eq!(label_from_number(&x, 3.0), None);
///
/// let m = Dimension::mapped("m");
/// assert_eq!(label_from_number(&m, -1.7), Some(Label::from("-1")));
/// ```
pub fn label_from_number(dim: &Dimension, value: f64) -> Option<Label> {
    if !value.is_finite() {
        return None;
    }
    let truncated = value.trunc();
    match dim.size {
        Some(size) => {
            if truncated < 0.0 || truncated >= size as f64 {
                None
            } else {
                Some(Label::Indexed(truncated as usize))
            }
        }
        None => Some(Label::Mapped(format!("{}", truncated as i64))),
    }
}

/// Adapt a literal peek label to `dim`.
///
/// Mapped dimensions accept index labels by their decimal text; indexed
/// dimensions accept mapped labels that parse as an in-range integer.
/// Anything else addresses nothing.
pub fn resolve_label(dim: &Dimension, label: &Label) -> Option<Label> {
    match (dim.size, label) {
        (None, Label::Mapped(_)) => Some(label.clone()),
        (None, Label::Indexed(idx)) => Some(Label::Mapped(idx.to_string())),
        (Some(size), Label::Indexed(idx)) => (*idx < size).then_some(label.clone()),
        (Some(size), Label::Mapped(text)) => text
            .parse::<usize>()
            .ok()
            .filter(|idx| *idx < size)
            .map(Label::Indexed),
    }
}
