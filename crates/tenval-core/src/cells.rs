//! Typed storage for tensor cell values.
//!
//! Computation is always carried out in `f64`; [`CellStorage`] keeps the
//! stored values at the width selected by the tensor's [`CellType`]. Generic
//! kernels can reach the underlying slice through [`CellValue::slice`].

use crate::types::CellType;
use scirs2_core::numeric::Float;

/// Scalar type usable as stored cell value.
pub trait CellValue: Float + Send + Sync + 'static {
    const CELL_TYPE: CellType;

    fn from_double(value: f64) -> Self;

    fn to_double(self) -> f64;

    /// Borrow `storage` as a slice of `Self`, if it has that width.
    fn slice(storage: &CellStorage) -> Option<&[Self]>;
}

impl CellValue for f64 {
    const CELL_TYPE: CellType = CellType::Double;

    #[inline]
    fn from_double(value: f64) -> Self {
        value
    }

    #[inline]
    fn to_double(self) -> f64 {
        self
    }

    fn slice(storage: &CellStorage) -> Option<&[Self]> {
        match storage {
            CellStorage::Double(values) => Some(values),
            CellStorage::Float(_) => None,
        }
    }
}

impl CellValue for f32 {
    const CELL_TYPE: CellType = CellType::Float;

    #[inline]
    fn from_double(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn to_double(self) -> f64 {
        self as f64
    }

    fn slice(storage: &CellStorage) -> Option<&[Self]> {
        match storage {
            CellStorage::Float(values) => Some(values),
            CellStorage::Double(_) => None,
        }
    }
}

/// Cell values at their stored width.
#[derive(Debug, Clone, PartialEq)]
pub enum CellStorage {
    Double(Vec<f64>),
    Float(Vec<f32>),
}

impl CellStorage {
    pub fn with_capacity(cell_type: CellType, capacity: usize) -> Self {
        match cell_type {
            CellType::Double => CellStorage::Double(Vec::with_capacity(capacity)),
            CellType::Float => CellStorage::Float(Vec::with_capacity(capacity)),
        }
    }

    pub fn zeros(cell_type: CellType, len: usize) -> Self {
        match cell_type {
            CellType::Double => CellStorage::Double(vec![0.0; len]),
            CellType::Float => CellStorage::Float(vec![0.0; len]),
        }
    }

    /// Collect `values`, narrowing them to `cell_type`.
    pub fn from_values<I: IntoIterator<Item = f64>>(cell_type: CellType, values: I) -> Self {
        match cell_type {
            CellType::Double => CellStorage::Double(values.into_iter().collect()),
            CellType::Float => CellStorage::Float(values.into_iter().map(|v| v as f32).collect()),
        }
    }

    pub fn cell_type(&self) -> CellType {
        match self {
            CellStorage::Double(_) => CellType::Double,
            CellStorage::Float(_) => CellType::Float,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CellStorage::Double(values) => values.len(),
            CellStorage::Float(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<f64> {
        match self {
            CellStorage::Double(values) => values.get(idx).copied(),
            CellStorage::Float(values) => values.get(idx).map(|v| *v as f64),
        }
    }

    pub fn set(&mut self, idx: usize, value: f64) {
        match self {
            CellStorage::Double(values) => values[idx] = value,
            CellStorage::Float(values) => values[idx] = value as f32,
        }
    }

    pub fn push(&mut self, value: f64) {
        match self {
            CellStorage::Double(values) => values.push(value),
            CellStorage::Float(values) => values.push(value as f32),
        }
    }

    /// Append `count` zero cells.
    pub fn extend_zeros(&mut self, count: usize) {
        match self {
            CellStorage::Double(values) => values.resize(values.len() + count, 0.0),
            CellStorage::Float(values) => values.resize(values.len() + count, 0.0),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = f64> + '_> {
        match self {
            CellStorage::Double(values) => Box::new(values.iter().copied()),
            CellStorage::Float(values) => Box::new(values.iter().map(|v| *v as f64)),
        }
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }

    /// Apply `f` to every value, keeping the width.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        match self {
            CellStorage::Double(values) => {
                CellStorage::Double(values.iter().map(|v| f(*v)).collect())
            }
            CellStorage::Float(values) => {
                CellStorage::Float(values.iter().map(|v| f(*v as f64) as f32).collect())
            }
        }
    }

    /// Values in `[start, start + len)` widened to `f64`.
    pub fn block(&self, start: usize, len: usize) -> Vec<f64> {
        self.iter().skip(start).take(len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_storage_narrows() {
        let cells = CellStorage::from_values(CellType::Float, [0.1, 2.0]);
        assert_eq!(cells.cell_type(), CellType::Float);
        assert_eq!(cells.get(0), Some(0.1f32 as f64));
        assert_eq!(cells.get(2), None);
        assert!(f32::slice(&cells).is_some());
        assert!(f64::slice(&cells).is_none());
    }

    #[test]
    fn test_map_and_block() {
        let mut cells = CellStorage::zeros(CellType::Double, 2);
        cells.set(1, 3.0);
        cells.push(4.0);
        cells.extend_zeros(1);
        assert_eq!(cells.to_f64_vec(), vec![0.0, 3.0, 4.0, 0.0]);
        assert_eq!(cells.map(|v| v * 2.0).block(1, 2), vec![6.0, 8.0]);
        assert_eq!(<f32 as CellValue>::from_double(1.5).to_double(), 1.5);
    }
}
