//! Core type definitions for tenval tensors.
//!
//! This module defines the type descriptors shared by every tensor value:
//!
//! - [`Dimension`] with its [`DimensionKind`] (mapped or indexed)
//! - [`CellType`] selecting the numeric width of stored cells
//! - [`TensorType`], an ordered set of dimensions plus a cell type
//!
//! # Textual form
//!
//! ```text
//! double
//! tensor(x{},y[3])
//! tensor<float>(x[2],y[3])
//! ```
//!
//! Dimensions are always kept in ascending name order, regardless of the order
//! they were declared in. That order governs printing, address layout and the
//! row-major layout of dense cells.
//!
//! # Examples
//!
//! ```
//! use tenval_core::{CellType, TensorType};
//!
//! let t = TensorType::parse("tensor<float>(y[3],x{})").unwrap();
//! assert_eq!(t.to_string(), "tensor<float>(x{},y[3])");
//! assert_eq!(t.cell_type(), CellType::Float);
//! assert_eq!(t.dense_subspace_size(), 3);
//!
//! let scalar = TensorType::parse("double").unwrap();
//! assert!(scalar.is_scalar());
//! ```

use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::str::FromStr;

/// Kind of a tensor dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DimensionKind {
    /// Open set of string labels (sparse addressing)
    Mapped,
    /// Fixed integer domain `[0, size)` (dense addressing)
    Indexed,
}

/// A named tensor dimension.
///
/// The size is present exactly for indexed dimensions, so the kind is derived
/// from it and can never disagree with it.
///
/// # Examples
///
/// ```
/// use tenval_core::{Dimension, DimensionKind};
///
/// let x = Dimension::indexed("x", 3);
/// assert_eq!(x.kind(), DimensionKind::Indexed);
/// assert_eq!(x.to_string(), "x[3]");
///
/// let cat = Dimension::mapped("cat");
/// assert!(cat.is_mapped());
/// assert_eq!(cat.to_string(), "cat{}");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dimension {
    /// Dimension name
    pub name: String,
    /// Number of indexes for indexed dimensions, `None` for mapped ones
    pub size: Option<usize>,
}

impl Dimension {
    /// Create a mapped (string labeled) dimension.
    pub fn mapped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
        }
    }

    /// Create an indexed dimension with `size` indexes.
    pub fn indexed(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size: Some(size),
        }
    }

    pub fn kind(&self) -> DimensionKind {
        match self.size {
            Some(_) => DimensionKind::Indexed,
            None => DimensionKind::Mapped,
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.size.is_none()
    }

    pub fn is_indexed(&self) -> bool {
        self.size.is_some()
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.size {
            Some(size) => write!(f, "{}[{}]", self.name, size),
            None => write!(f, "{}{{}}", self.name),
        }
    }
}

/// Numeric width of stored tensor cells.
///
/// All computation happens in `f64`; a `Float` tensor rounds every stored
/// value through `f32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellType {
    #[default]
    Double,
    Float,
}

impl CellType {
    /// Cell type of a value combining cells of `a` and `b`.
    ///
    /// ```
    /// use tenval_core::CellType;
    ///
    /// assert_eq!(CellType::unify(CellType::Float, CellType::Float), CellType::Float);
    /// assert_eq!(CellType::unify(CellType::Float, CellType::Double), CellType::Double);
    /// ```
    pub fn unify(a: CellType, b: CellType) -> CellType {
        match (a, b) {
            (CellType::Float, CellType::Float) => CellType::Float,
            _ => CellType::Double,
        }
    }

    /// Round `value` to what a cell of this type can hold.
    pub fn fit(self, value: f64) -> f64 {
        match self {
            CellType::Double => value,
            CellType::Float => value as f32 as f64,
        }
    }

    /// Size of one stored cell in bytes
    pub fn byte_width(self) -> usize {
        match self {
            CellType::Double => 8,
            CellType::Float => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CellType::Double => "double",
            CellType::Float => "float",
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type of a tensor value: a cell type and a name-ordered set of dimensions.
///
/// The zero-dimension type is the scalar `double`. Scalars always have
/// [`CellType::Double`] cells; asking for a float scalar yields `double`.
///
/// # Examples
///
/// ```
/// use tenval_core::{Dimension, TensorType, CellType};
///
/// let t = TensorType::new(
///     CellType::Double,
///     vec![Dimension::indexed("y", 2), Dimension::mapped("x")],
/// ).unwrap();
/// assert_eq!(t.to_string(), "tensor(x{},y[2])");
/// assert!(t.is_mixed());
///
/// let joined = TensorType::join(&t, &"tensor(z[4])".parse().unwrap()).unwrap();
/// assert_eq!(joined.to_string(), "tensor(x{},y[2],z[4])");
///
/// let reduced = joined.reduce(&["x", "y", "z"]).unwrap();
/// assert!(reduced.is_scalar());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TensorType {
    cell_type: CellType,
    dimensions: Vec<Dimension>,
}

impl TensorType {
    /// The scalar type.
    pub const fn double() -> Self {
        Self {
            cell_type: CellType::Double,
            dimensions: Vec::new(),
        }
    }

    /// Create a tensor type, sorting the dimensions by name.
    ///
    /// # Errors
    ///
    /// Returns an error if two dimensions share a name, an indexed
    /// dimension has size zero, or the dense subspace size overflows `usize`.
    pub fn new(cell_type: CellType, mut dimensions: Vec<Dimension>) -> CoreResult<Self> {
        dimensions.sort_by(|a, b| a.name.cmp(&b.name));
        for pair in dimensions.windows(2) {
            if pair[0].name == pair[1].name {
                return Err(CoreError::DuplicateDimension(pair[0].name.clone()));
            }
        }
        if let Some(dim) = dimensions.iter().find(|d| d.size == Some(0)) {
            return Err(CoreError::ZeroSize(dim.name.clone()));
        }
        let cells = dimensions
            .iter()
            .filter_map(|d| d.size)
            .try_fold(1usize, |acc, size| acc.checked_mul(size));
        if cells.is_none() {
            let sizes: Vec<String> = dimensions
                .iter()
                .filter_map(|d| d.size.map(|size| format!("{}[{}]", d.name, size)))
                .collect();
            return Err(CoreError::SizeOverflow(sizes.join(",")));
        }
        let cell_type = if dimensions.is_empty() {
            CellType::Double
        } else {
            cell_type
        };
        Ok(Self {
            cell_type,
            dimensions,
        })
    }

    /// Parse a textual tensor type such as `tensor(x{},y[3])`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TypeParse`] for malformed input, and the
    /// [`TensorType::new`] errors for duplicate, zero-sized or oversized
    /// dimensions.
    pub fn parse(input: &str) -> CoreResult<Self> {
        let text = input.trim();
        if text == "double" {
            return Ok(Self::double());
        }

        let rest = text
            .strip_prefix("tensor")
            .ok_or_else(|| CoreError::parse(input, "expected 'double' or 'tensor'"))?
            .trim_start();

        let (cell_type, rest) = match rest.strip_prefix('<') {
            Some(inner) => {
                let end = inner
                    .find('>')
                    .ok_or_else(|| CoreError::parse(input, "unterminated cell type"))?;
                let cell_type = match inner[..end].trim() {
                    "double" => CellType::Double,
                    "float" => CellType::Float,
                    other => {
                        return Err(CoreError::parse(
                            input,
                            format!("unknown cell type '{}'", other),
                        ))
                    }
                };
                (cell_type, inner[end + 1..].trim_start())
            }
            None => (CellType::Double, rest),
        };

        let body = rest
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .ok_or_else(|| CoreError::parse(input, "expected parenthesized dimension list"))?;

        let mut dimensions = Vec::new();
        if !body.trim().is_empty() {
            for entry in body.split(',') {
                dimensions.push(parse_dimension(input, entry.trim())?);
            }
        }
        Self::new(cell_type, dimensions)
    }

    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Number of dimensions
    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Position of dimension `name` in canonical order
    pub fn dimension_index(&self, name: &str) -> Option<usize> {
        self.dimensions
            .binary_search_by(|d| d.name.as_str().cmp(name))
            .ok()
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimension_index(name).map(|idx| &self.dimensions[idx])
    }

    /// Dimension names in canonical order
    pub fn dimension_names(&self) -> Vec<String> {
        self.dimensions.iter().map(|d| d.name.clone()).collect()
    }

    pub fn mapped_dimensions(&self) -> impl Iterator<Item = &Dimension> + '_ {
        self.dimensions.iter().filter(|d| d.is_mapped())
    }

    pub fn indexed_dimensions(&self) -> impl Iterator<Item = &Dimension> + '_ {
        self.dimensions.iter().filter(|d| d.is_indexed())
    }

    pub fn count_mapped(&self) -> usize {
        self.mapped_dimensions().count()
    }

    pub fn count_indexed(&self) -> usize {
        self.indexed_dimensions().count()
    }

    /// All dimensions indexed. Vacuously true for the scalar type.
    pub fn is_dense(&self) -> bool {
        self.dimensions.iter().all(Dimension::is_indexed)
    }

    /// At least one dimension and all of them mapped.
    pub fn is_sparse(&self) -> bool {
        !self.dimensions.is_empty() && self.dimensions.iter().all(Dimension::is_mapped)
    }

    /// Both mapped and indexed dimensions present.
    pub fn is_mixed(&self) -> bool {
        self.count_mapped() > 0 && self.count_indexed() > 0
    }

    /// Number of cells in one dense subspace (product of indexed sizes).
    pub fn dense_subspace_size(&self) -> usize {
        self.indexed_dimensions()
            .filter_map(|d| d.size)
            .product()
    }

    /// Result type of joining `lhs` with `rhs`: the union of their dimensions.
    ///
    /// # Errors
    ///
    /// Dimensions present in both must agree in kind and size.
    pub fn join(lhs: &TensorType, rhs: &TensorType) -> CoreResult<TensorType> {
        let mut dimensions = Vec::with_capacity(lhs.rank() + rhs.rank());
        let (mut i, mut j) = (0, 0);
        while i < lhs.dimensions.len() && j < rhs.dimensions.len() {
            let (a, b) = (&lhs.dimensions[i], &rhs.dimensions[j]);
            match a.name.cmp(&b.name) {
                std::cmp::Ordering::Less => {
                    dimensions.push(a.clone());
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    dimensions.push(b.clone());
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    if a != b {
                        return Err(CoreError::DimensionMismatch {
                            name: a.name.clone(),
                            lhs: a.to_string(),
                            rhs: b.to_string(),
                        });
                    }
                    dimensions.push(a.clone());
                    i += 1;
                    j += 1;
                }
            }
        }
        dimensions.extend_from_slice(&lhs.dimensions[i..]);
        dimensions.extend_from_slice(&rhs.dimensions[j..]);
        Self::new(CellType::unify(lhs.cell_type, rhs.cell_type), dimensions)
    }

    /// Result type of removing `removed` dimensions.
    ///
    /// # Errors
    ///
    /// Every removed name must be a dimension of this type.
    pub fn reduce<S: AsRef<str>>(&self, removed: &[S]) -> CoreResult<TensorType> {
        for name in removed {
            if self.dimension_index(name.as_ref()).is_none() {
                return Err(CoreError::UnknownDimension {
                    name: name.as_ref().to_string(),
                    value_type: self.to_string(),
                });
            }
        }
        let kept = self
            .dimensions
            .iter()
            .filter(|d| !removed.iter().any(|r| r.as_ref() == d.name))
            .cloned()
            .collect();
        Self::new(self.cell_type, kept)
    }

    /// Result type of a peek addressing `addressed` dimensions.
    pub fn peek<S: AsRef<str>>(&self, addressed: &[S]) -> CoreResult<TensorType> {
        self.reduce(addressed)
    }

    /// Same dimensions with another cell type.
    pub fn with_cell_type(&self, cell_type: CellType) -> TensorType {
        TensorType {
            cell_type: if self.is_scalar() {
                CellType::Double
            } else {
                cell_type
            },
            dimensions: self.dimensions.clone(),
        }
    }
}

fn parse_dimension(input: &str, entry: &str) -> CoreResult<Dimension> {
    let split = entry
        .find(['{', '['])
        .ok_or_else(|| CoreError::parse(input, format!("dimension '{}' has no kind", entry)))?;
    let name = entry[..split].trim();
    if !is_valid_name(name) {
        return Err(CoreError::parse(
            input,
            format!("invalid dimension name '{}'", name),
        ));
    }
    let suffix = entry[split..].trim();
    if suffix == "{}" {
        return Ok(Dimension::mapped(name));
    }
    let size = suffix
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .and_then(|s| s.trim().parse::<usize>().ok())
        .ok_or_else(|| {
            CoreError::parse(input, format!("invalid size for dimension '{}'", name))
        })?;
    Ok(Dimension::indexed(name, size))
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_scalar() {
            return f.write_str("double");
        }
        f.write_str("tensor")?;
        if self.cell_type == CellType::Float {
            f.write_str("<float>")?;
        }
        f.write_str("(")?;
        for (i, dim) in self.dimensions.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", dim)?;
        }
        f.write_str(")")
    }
}

impl FromStr for TensorType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TensorType::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalar_forms() {
        assert!(TensorType::parse("double").unwrap().is_scalar());
        assert!(TensorType::parse("tensor()").unwrap().is_scalar());
        assert_eq!(
            TensorType::parse("tensor<float>()").unwrap(),
            TensorType::double()
        );
    }

    #[test]
    fn test_parse_sorts_dimensions() {
        let t = TensorType::parse("tensor(z[2], x{}, y[3])").unwrap();
        assert_eq!(t.to_string(), "tensor(x{},y[3],z[2])");
        assert_eq!(t.dimension_index("y"), Some(1));
        assert_eq!(t.dimension_index("w"), None);
        assert_eq!(t.dense_subspace_size(), 6);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "",
            "float",
            "tensor",
            "tensor(x)",
            "tensor(x[])",
            "tensor(x[-1])",
            "tensor(x{},)",
            "tensor<int8>(x[2])",
            "tensor(1x[2])",
            "tensor(x[2]",
        ] {
            assert!(TensorType::parse(bad).is_err(), "accepted '{}'", bad);
        }
    }

    #[test]
    fn test_duplicate_and_zero_size_are_rejected() {
        assert_eq!(
            TensorType::parse("tensor(x[2],x{})"),
            Err(CoreError::DuplicateDimension("x".to_string()))
        );
        assert_eq!(
            TensorType::parse("tensor(x[0])"),
            Err(CoreError::ZeroSize("x".to_string()))
        );
    }

    #[test]
    fn test_oversized_dense_subspace_is_rejected() {
        let half = usize::MAX / 2 + 1;
        let dims = vec![Dimension::indexed("x", half), Dimension::indexed("y", 2)];
        assert!(matches!(
            TensorType::new(CellType::Double, dims),
            Err(CoreError::SizeOverflow(_))
        ));

        // each side is valid on its own, the union is not
        let x = TensorType::new(CellType::Double, vec![Dimension::indexed("x", half)]).unwrap();
        let y = TensorType::new(CellType::Double, vec![Dimension::indexed("y", 2)]).unwrap();
        assert_eq!(x.dense_subspace_size(), half);
        assert!(matches!(
            TensorType::join(&x, &y),
            Err(CoreError::SizeOverflow(_))
        ));
    }

    #[test]
    fn test_kind_predicates() {
        let sparse = TensorType::parse("tensor(x{},y{})").unwrap();
        let dense = TensorType::parse("tensor(x[3])").unwrap();
        let mixed = TensorType::parse("tensor(x{},y[2])").unwrap();
        assert!(sparse.is_sparse() && !sparse.is_dense() && !sparse.is_mixed());
        assert!(dense.is_dense() && !dense.is_sparse());
        assert!(mixed.is_mixed() && !mixed.is_dense() && !mixed.is_sparse());
        assert!(TensorType::double().is_dense());
    }

    #[test]
    fn test_join_types() {
        let a = TensorType::parse("tensor<float>(x{},y[2])").unwrap();
        let b = TensorType::parse("tensor<float>(y[2],z{})").unwrap();
        let c = TensorType::parse("tensor(y[3])").unwrap();
        let d = TensorType::parse("tensor(y{})").unwrap();

        let ab = TensorType::join(&a, &b).unwrap();
        assert_eq!(ab.to_string(), "tensor<float>(x{},y[2],z{})");
        assert!(matches!(
            TensorType::join(&a, &c),
            Err(CoreError::DimensionMismatch { .. })
        ));
        assert!(TensorType::join(&a, &d).is_err());

        let with_scalar = TensorType::join(&a, &TensorType::double()).unwrap();
        assert_eq!(with_scalar.cell_type(), CellType::Double);
    }

    #[test]
    fn test_reduce_types() {
        let t = TensorType::parse("tensor<float>(x[3],y[2])").unwrap();
        assert_eq!(t.reduce(&["y"]).unwrap().to_string(), "tensor<float>(x[3])");
        assert_eq!(t.reduce::<&str>(&[]).unwrap(), t);
        assert_eq!(t.reduce(&["x", "y"]).unwrap(), TensorType::double());
        assert!(matches!(
            t.reduce(&["z"]),
            Err(CoreError::UnknownDimension { .. })
        ));
    }

    #[test]
    fn test_cell_type_fit() {
        assert_eq!(CellType::Double.fit(0.1), 0.1);
        assert_eq!(CellType::Float.fit(0.1), 0.1f32 as f64);
        assert_eq!(CellType::Float.byte_width(), 4);
    }
}
