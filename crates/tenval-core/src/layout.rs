//! Row-major layout of dense subspaces.
//!
//! The indexed dimensions of a type, in canonical name order, span one dense
//! subspace. Cells of a subspace are laid out row-major: the last indexed
//! dimension varies fastest.

use crate::types::TensorType;

/// Sizes of the indexed dimensions, in canonical order.
pub fn indexed_sizes(value_type: &TensorType) -> Vec<usize> {
    value_type.indexed_dimensions().filter_map(|d| d.size).collect()
}

/// Row-major strides for `sizes`.
///
/// ```
/// assert_eq!(tenval_core::layout::strides(&[3, 2, 4]), vec![8, 4, 1]);
/// ```
pub fn strides(sizes: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; sizes.len()];
    for dim in (0..sizes.len().saturating_sub(1)).rev() {
        strides[dim] = strides[dim + 1] * sizes[dim + 1];
    }
    strides
}

/// Linear offset of `indices` within a block of `sizes`.
///
/// Returns `None` if any index is out of range.
pub fn offset_of(sizes: &[usize], indices: &[usize]) -> Option<usize> {
    if sizes.len() != indices.len() {
        return None;
    }
    let mut offset = 0;
    for (&idx, &size) in indices.iter().zip(sizes) {
        if idx >= size {
            return None;
        }
        offset = offset * size + idx;
    }
    Some(offset)
}

/// Multi-index of the cell at `offset` within a block of `sizes`.
pub fn indices_of(sizes: &[usize], offset: usize) -> Vec<usize> {
    let mut indices = vec![0; sizes.len()];
    let mut remaining = offset;
    for (dim, &size) in sizes.iter().enumerate().rev() {
        indices[dim] = remaining % size;
        remaining /= size;
    }
    indices
}

/// Every multi-index of a block of `sizes`, in row-major order.
///
/// ```
/// use tenval_core::layout::row_major;
///
/// let all: Vec<Vec<usize>> = row_major(&[2, 2]).collect();
/// assert_eq!(all, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
/// ```
pub fn row_major(sizes: &[usize]) -> impl Iterator<Item = Vec<usize>> + '_ {
    let total: usize = sizes.iter().product();
    (0..total).map(move |offset| indices_of(sizes, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_roundtrip() {
        let sizes = [3, 2];
        for offset in 0..6 {
            assert_eq!(offset_of(&sizes, &indices_of(&sizes, offset)), Some(offset));
        }
        assert_eq!(offset_of(&sizes, &[1, 1]), Some(3));
        assert_eq!(offset_of(&sizes, &[3, 0]), None);
        assert_eq!(offset_of(&sizes, &[0]), None);
    }

    #[test]
    fn test_scalar_block() {
        assert_eq!(row_major(&[]).collect::<Vec<_>>(), vec![Vec::<usize>::new()]);
        assert_eq!(offset_of(&[], &[]), Some(0));
        assert!(strides(&[]).is_empty());
    }

    #[test]
    fn test_indexed_sizes() {
        let t = TensorType::parse("tensor(a[2],b{},c[5])").unwrap();
        assert_eq!(indexed_sizes(&t), vec![2, 5]);
    }
}
