//! Binary tensor format.
//!
//! # Format
//!
//! A value starts with a compact-integer tag selecting the layout family:
//!
//! | tag | family | cells |
//! |-----|--------|-------|
//! | 1 | sparse | double |
//! | 2 | dense | double |
//! | 3 | mixed | double |
//! | 5 | sparse | width byte follows |
//! | 6 | dense | width byte follows |
//! | 7 | mixed | width byte follows |
//!
//! The width is a compact integer, 0 for double and 1 for float cells.
//!
//! - **sparse**: `n_dims`, names; `n_cells`; per cell one label per dimension,
//!   then the value
//! - **dense**: `n_dims`, `(name, size)` pairs; all values in row-major order
//! - **mixed**: `n_mapped`, names; `n_indexed`, `(name, size)` pairs;
//!   `n_subspaces`; per subspace one label per mapped dimension, then the full
//!   dense block of values
//!
//! Engines convert to and from [`WireTensor`], a subspace-oriented view that
//! maps directly onto all three layouts.
//!
//! # Examples
//!
//! ```
//! use tenval_core::TensorType;
//! use tenval_sparse::codec::{decode, encode, CodecFormat, WireTensor};
//!
//! let t = TensorType::parse("tensor(x[3])").unwrap();
//! let wire = WireTensor::dense(t, vec![1.0, 2.0, 3.0]);
//! let bytes = encode(&wire, CodecFormat::Legacy).unwrap();
//! assert_eq!(bytes[0], 2);
//! assert_eq!(decode(&bytes).unwrap(), wire);
//! ```

use crate::error::{CodecError, CodecResult};
use crate::stream::{ByteReader, ByteWriter};
use std::collections::HashSet;
use tenval_core::{CellType, Dimension, TensorType};
use tracing::trace;

const SPARSE_LEGACY: usize = 1;
const DENSE_LEGACY: usize = 2;
const MIXED_LEGACY: usize = 3;
const SPARSE: usize = 5;
const DENSE: usize = 6;
const MIXED: usize = 7;

const WIDTH_DOUBLE: usize = 0;
const WIDTH_FLOAT: usize = 1;

/// Which tags to emit for double tensors.
///
/// Float tensors always use the explicit tags, since the legacy ones cannot
/// express the cell width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodecFormat {
    /// Tags 1/2/3 for double cells
    #[default]
    Legacy,
    /// Tags 5/6/7 with an explicit width for every tensor
    Explicit,
}

/// One dense subspace: its mapped labels and every cell of its block.
#[derive(Debug, Clone, PartialEq)]
pub struct WireSubspace {
    pub labels: Vec<String>,
    pub cells: Vec<f64>,
}

/// Engine-neutral view of a tensor as it appears on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct WireTensor {
    pub value_type: TensorType,
    pub subspaces: Vec<WireSubspace>,
}

impl WireTensor {
    /// A dense (or scalar) tensor from its row-major cells.
    pub fn dense(value_type: TensorType, cells: Vec<f64>) -> Self {
        Self {
            value_type,
            subspaces: vec![WireSubspace {
                labels: Vec::new(),
                cells,
            }],
        }
    }

    /// Sort subspaces by their labels so equal tensors encode identically.
    pub fn sorted(mut self) -> Self {
        self.subspaces.sort_by(|a, b| a.labels.cmp(&b.labels));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Sparse,
    Dense,
    Mixed,
}

fn family_of(value_type: &TensorType) -> Family {
    match (value_type.count_mapped(), value_type.count_indexed()) {
        (0, _) => Family::Dense,
        (_, 0) => Family::Sparse,
        _ => Family::Mixed,
    }
}

/// Encode `tensor` with the tags selected by `format`.
///
/// # Errors
///
/// Fails if a subspace block does not match the dense subspace size of the
/// type, or a count exceeds the compact integer range.
pub fn encode(tensor: &WireTensor, format: CodecFormat) -> CodecResult<Vec<u8>> {
    let value_type = &tensor.value_type;
    let cell_type = value_type.cell_type();
    let family = family_of(value_type);
    let block_size = value_type.dense_subspace_size();
    for subspace in &tensor.subspaces {
        if subspace.cells.len() != block_size {
            return Err(CodecError::BlockSize {
                expected: block_size,
                found: subspace.cells.len(),
            });
        }
    }

    let explicit = format == CodecFormat::Explicit || cell_type == CellType::Float;
    let tag = match (family, explicit) {
        (Family::Sparse, false) => SPARSE_LEGACY,
        (Family::Dense, false) => DENSE_LEGACY,
        (Family::Mixed, false) => MIXED_LEGACY,
        (Family::Sparse, true) => SPARSE,
        (Family::Dense, true) => DENSE,
        (Family::Mixed, true) => MIXED,
    };
    trace!("encoding {} with tag {}", value_type, tag);

    let mut w = ByteWriter::new();
    w.put_compact(tag)?;
    if explicit {
        w.put_compact(match cell_type {
            CellType::Double => WIDTH_DOUBLE,
            CellType::Float => WIDTH_FLOAT,
        })?;
    }

    match family {
        Family::Sparse => {
            put_names(&mut w, value_type.mapped_dimensions())?;
            w.put_compact(tensor.subspaces.len())?;
            for subspace in &tensor.subspaces {
                put_labels(&mut w, &subspace.labels)?;
                put_cells(&mut w, cell_type, &subspace.cells);
            }
        }
        Family::Dense => {
            put_sized(&mut w, value_type.indexed_dimensions())?;
            match tensor.subspaces.first() {
                Some(subspace) => put_cells(&mut w, cell_type, &subspace.cells),
                None => put_cells(&mut w, cell_type, &vec![0.0; block_size]),
            }
        }
        Family::Mixed => {
            put_names(&mut w, value_type.mapped_dimensions())?;
            put_sized(&mut w, value_type.indexed_dimensions())?;
            w.put_compact(tensor.subspaces.len())?;
            for subspace in &tensor.subspaces {
                put_labels(&mut w, &subspace.labels)?;
                put_cells(&mut w, cell_type, &subspace.cells);
            }
        }
    }
    Ok(w.into_bytes())
}

fn put_names<'a>(
    w: &mut ByteWriter,
    dims: impl Iterator<Item = &'a Dimension>,
) -> CodecResult<()> {
    let dims: Vec<&Dimension> = dims.collect();
    w.put_compact(dims.len())?;
    dims.iter().try_for_each(|d| w.put_small_string(&d.name))
}

fn put_sized<'a>(
    w: &mut ByteWriter,
    dims: impl Iterator<Item = &'a Dimension>,
) -> CodecResult<()> {
    let dims: Vec<&Dimension> = dims.collect();
    w.put_compact(dims.len())?;
    for dim in dims {
        w.put_small_string(&dim.name)?;
        w.put_compact(dim.size.unwrap_or(0))?;
    }
    Ok(())
}

fn put_labels(w: &mut ByteWriter, labels: &[String]) -> CodecResult<()> {
    labels.iter().try_for_each(|label| w.put_small_string(label))
}

fn put_cells(w: &mut ByteWriter, cell_type: CellType, cells: &[f64]) {
    match cell_type {
        CellType::Double => cells.iter().for_each(|v| w.put_f64(*v)),
        CellType::Float => cells.iter().for_each(|v| w.put_f32(*v as f32)),
    }
}

/// Decode a tensor from `bytes`, which must hold exactly one value.
///
/// # Errors
///
/// Unknown tags or widths, truncated input, trailing bytes, invalid labels,
/// zero-sized or non-canonical dimensions and duplicate cells are reported as
/// [`CodecError`].
pub fn decode(bytes: &[u8]) -> CodecResult<WireTensor> {
    let mut r = ByteReader::new(bytes);
    let tag = r.get_compact()?;
    let (family, cell_type) = match tag {
        SPARSE_LEGACY => (Family::Sparse, CellType::Double),
        DENSE_LEGACY => (Family::Dense, CellType::Double),
        MIXED_LEGACY => (Family::Mixed, CellType::Double),
        SPARSE | DENSE | MIXED => {
            let cell_type = match r.get_compact()? {
                WIDTH_DOUBLE => CellType::Double,
                WIDTH_FLOAT => CellType::Float,
                other => return Err(CodecError::UnknownCellWidth(other)),
            };
            let family = match tag {
                SPARSE => Family::Sparse,
                DENSE => Family::Dense,
                _ => Family::Mixed,
            };
            (family, cell_type)
        }
        other => return Err(CodecError::UnknownTag(other)),
    };
    trace!("decoding tag {} as {:?} {}", tag, family, cell_type);

    let mapped = match family {
        Family::Sparse | Family::Mixed => get_names(&mut r)?,
        Family::Dense => Vec::new(),
    };
    let indexed = match family {
        Family::Dense | Family::Mixed => get_sized(&mut r)?,
        Family::Sparse => Vec::new(),
    };
    let mapped_count = mapped.len();
    let value_type = make_type(cell_type, mapped.into_iter().chain(indexed))?;
    let block_size = value_type.dense_subspace_size();

    let subspaces = match family {
        Family::Dense => vec![WireSubspace {
            labels: Vec::new(),
            cells: get_cells(&mut r, cell_type, block_size)?,
        }],
        Family::Sparse | Family::Mixed => {
            let count = r.get_compact()?;
            let mut seen = HashSet::new();
            let mut subspaces = Vec::with_capacity(count.min(r.remaining()));
            for _ in 0..count {
                let labels = (0..mapped_count)
                    .map(|_| r.get_small_string())
                    .collect::<CodecResult<Vec<_>>>()?;
                if !seen.insert(labels.clone()) {
                    return Err(CodecError::DuplicateCell(format!("{:?}", labels)));
                }
                let cells = get_cells(&mut r, cell_type, block_size)?;
                subspaces.push(WireSubspace { labels, cells });
            }
            subspaces
        }
    };
    r.finish()?;
    Ok(WireTensor {
        value_type,
        subspaces,
    })
}

fn get_names(r: &mut ByteReader<'_>) -> CodecResult<Vec<Dimension>> {
    let count = r.get_compact()?;
    (0..count)
        .map(|_| r.get_small_string().map(Dimension::mapped))
        .collect()
}

fn get_sized(r: &mut ByteReader<'_>) -> CodecResult<Vec<Dimension>> {
    let count = r.get_compact()?;
    let mut dims = Vec::with_capacity(count.min(r.remaining()));
    for _ in 0..count {
        let name = r.get_small_string()?;
        let size = r.get_compact()?;
        if size == 0 {
            return Err(CodecError::ZeroSize(name));
        }
        dims.push(Dimension::indexed(name, size));
    }
    Ok(dims)
}

fn make_type(
    cell_type: CellType,
    dims: impl Iterator<Item = Dimension>,
) -> CodecResult<TensorType> {
    let dims: Vec<Dimension> = dims.collect();
    let value_type = TensorType::new(cell_type, dims.clone())
        .map_err(|e| CodecError::InvalidType(e.to_string()))?;
    let mapped_ok = dims
        .iter()
        .filter(|d| d.is_mapped())
        .eq(value_type.mapped_dimensions());
    let indexed_ok = dims
        .iter()
        .filter(|d| d.is_indexed())
        .eq(value_type.indexed_dimensions());
    if !(mapped_ok && indexed_ok) {
        return Err(CodecError::DimensionOrder(value_type.to_string()));
    }
    Ok(value_type)
}

fn get_cells(r: &mut ByteReader<'_>, cell_type: CellType, count: usize) -> CodecResult<Vec<f64>> {
    let width = cell_type.byte_width();
    if r.remaining() / width < count {
        return Err(CodecError::Truncated {
            needed: count.saturating_mul(width),
            remaining: r.remaining(),
        });
    }
    (0..count)
        .map(|_| match cell_type {
            CellType::Double => r.get_f64(),
            CellType::Float => r.get_f32().map(f64::from),
        })
        .collect()
}
