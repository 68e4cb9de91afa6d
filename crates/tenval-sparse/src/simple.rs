//! Reference tensor implementation.
//!
//! [`SimpleTensor`] stores every cell explicitly as a label vector plus a
//! value, sorted by address. It favours obviously-correct algorithms over
//! speed and serves as the oracle other engines are checked against.
//!
//! # Materialization
//!
//! Dense subspaces are stored in full: whenever a tensor holds one cell of a
//! subspace (the cells sharing all mapped labels), it holds every cell of that
//! subspace, with 0.0 where nothing was given. Pure dense tensors and scalars
//! always have their single subspace. Cells of mapped dimensions that were
//! never given stay absent, and read as 0.0.
//!
//! # Examples
//!
//! ```
//! use tenval_core::{address, Aggr, JoinOp, Label, MapOp, TensorSpec};
//! use tenval_sparse::SimpleTensor;
//!
//! let spec = TensorSpec::parse("tensor(x[3])").unwrap()
//!     .add([("x", Label::from(0))], 1.0)
//!     .add([("x", Label::from(2))], 3.0);
//! let t = SimpleTensor::create(&spec).unwrap();
//! assert_eq!(t.len(), 3);
//!
//! let doubled = SimpleTensor::join(&t, &SimpleTensor::from_double(2.0), JoinOp::Mul).unwrap();
//! let sum = doubled.reduce(Aggr::Sum, &["x"]).unwrap();
//! assert_eq!(sum.as_double(), Some(8.0));
//!
//! let negated = t.map(MapOp::Neg).to_spec();
//! assert_eq!(negated.value_of(&address([("x", Label::from(2))])), -3.0);
//! ```

use crate::codec::{self, CodecFormat, WireSubspace, WireTensor};
use crate::error::{SparseError, SparseResult};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tenval_core::layout::{indexed_sizes, offset_of, row_major};
use tenval_core::{
    resolve_label, Address, Aggr, Aggregator, CoreError, JoinOp, Label, MapOp, TensorSpec,
    TensorType,
};

/// One explicit cell: a label per dimension, in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub labels: Vec<Label>,
    pub value: f64,
}

/// Reference tensor value.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleTensor {
    value_type: TensorType,
    cells: Vec<Cell>,
}

impl SimpleTensor {
    /// Build a tensor from explicit cells.
    ///
    /// Labels are checked against the type, cells are sorted and values are
    /// rounded to the cell type. Dense subspaces are not filled in; use
    /// [`SimpleTensor::create`] for that.
    ///
    /// # Errors
    ///
    /// Wrong label counts, labels of the wrong kind, indexes out of range and
    /// duplicate addresses are rejected.
    pub fn new(value_type: TensorType, mut cells: Vec<Cell>) -> SparseResult<Self> {
        for cell in &mut cells {
            check_labels(&value_type, &cell.labels)?;
            cell.value = value_type.cell_type().fit(cell.value);
        }
        cells.sort_by(|a, b| a.labels.cmp(&b.labels));
        if let Some(pair) = cells.windows(2).find(|p| p[0].labels == p[1].labels) {
            return Err(SparseError::DuplicateCell {
                address: format_labels(&pair[0].labels),
                value_type: value_type.to_string(),
            });
        }
        Ok(Self { value_type, cells })
    }

    /// Cells are already validated and unique; sort and round them.
    fn from_parts(value_type: TensorType, mut cells: Vec<Cell>) -> Self {
        let cell_type = value_type.cell_type();
        for cell in &mut cells {
            cell.value = cell_type.fit(cell.value);
        }
        cells.sort_by(|a, b| a.labels.cmp(&b.labels));
        Self { value_type, cells }
    }

    pub fn from_double(value: f64) -> Self {
        Self {
            value_type: TensorType::double(),
            cells: vec![Cell {
                labels: Vec::new(),
                value,
            }],
        }
    }

    /// Build a tensor from a spec, filling every touched dense subspace.
    ///
    /// # Errors
    ///
    /// Any spec address that is not a valid address of the spec type.
    pub fn create(spec: &TensorSpec) -> SparseResult<Self> {
        spec.validate()?;
        let value_type = spec.value_type().clone();
        let given: BTreeMap<Vec<Label>, f64> = spec
            .cells()
            .iter()
            .map(|(address, value)| (address.values().cloned().collect(), *value))
            .collect();
        let cells = materialize(&value_type, given);
        Ok(Self::from_parts(value_type, cells))
    }

    pub fn value_type(&self) -> &TensorType {
        &self.value_type
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Value of a scalar tensor.
    pub fn as_double(&self) -> Option<f64> {
        self.value_type
            .is_scalar()
            .then(|| self.cells.first().map_or(0.0, |c| c.value))
    }

    /// Value at a full address, 0.0 when absent.
    pub fn get(&self, labels: &[Label]) -> f64 {
        self.cells
            .binary_search_by(|c| c.labels.as_slice().cmp(labels))
            .map_or(0.0, |idx| self.cells[idx].value)
    }

    /// Apply `op` to every stored cell.
    pub fn map(&self, op: MapOp) -> Self {
        let cells = self
            .cells
            .iter()
            .map(|c| Cell {
                labels: c.labels.clone(),
                value: op.apply(c.value),
            })
            .collect();
        Self::from_parts(self.value_type.clone(), cells)
    }

    /// Generalized join: cells agreeing on all shared dimensions are combined
    /// with `op`; disjoint dimensions form a cartesian product.
    ///
    /// # Errors
    ///
    /// Shared dimensions that differ in kind or size.
    pub fn join(lhs: &SimpleTensor, rhs: &SimpleTensor, op: JoinOp) -> SparseResult<Self> {
        let result_type = TensorType::join(&lhs.value_type, &rhs.value_type)?;
        // (lhs position, rhs position) of every shared dimension
        let shared: Vec<(usize, usize)> = lhs
            .value_type
            .dimensions()
            .iter()
            .enumerate()
            .filter_map(|(li, d)| rhs.value_type.dimension_index(&d.name).map(|ri| (li, ri)))
            .collect();

        let mut by_shared: HashMap<Vec<&Label>, Vec<&Cell>> = HashMap::new();
        for cell in &rhs.cells {
            let key = shared.iter().map(|&(_, ri)| &cell.labels[ri]).collect();
            by_shared.entry(key).or_default().push(cell);
        }

        let sources: Vec<Source> = result_type
            .dimensions()
            .iter()
            .map(|d| match lhs.value_type.dimension_index(&d.name) {
                Some(li) => Source::Lhs(li),
                None => Source::Rhs(rhs.value_type.dimension_index(&d.name).unwrap_or(0)),
            })
            .collect();

        let mut cells = Vec::new();
        for l in &lhs.cells {
            let key: Vec<&Label> = shared.iter().map(|&(li, _)| &l.labels[li]).collect();
            let Some(matches) = by_shared.get(&key) else {
                continue;
            };
            for r in matches {
                let labels = sources
                    .iter()
                    .map(|source| match *source {
                        Source::Lhs(i) => l.labels[i].clone(),
                        Source::Rhs(i) => r.labels[i].clone(),
                    })
                    .collect();
                cells.push(Cell {
                    labels,
                    value: op.apply(l.value, r.value),
                });
            }
        }
        Ok(Self::from_parts(result_type, cells))
    }

    /// Remove `dims`, folding cells that agree on the remaining dimensions.
    ///
    /// An empty `dims` keeps every dimension and folds each cell on its own.
    ///
    /// # Errors
    ///
    /// Dimensions not present in the tensor type.
    pub fn reduce<S: AsRef<str>>(&self, aggr: Aggr, dims: &[S]) -> SparseResult<Self> {
        let result_type = self.value_type.reduce(dims)?;
        let kept: Vec<usize> = result_type
            .dimensions()
            .iter()
            .filter_map(|d| self.value_type.dimension_index(&d.name))
            .collect();

        let mut groups: BTreeMap<Vec<Label>, Aggregator> = BTreeMap::new();
        for cell in &self.cells {
            let key: Vec<Label> = kept.iter().map(|&i| cell.labels[i].clone()).collect();
            groups
                .entry(key)
                .and_modify(|acc| acc.add(cell.value))
                .or_insert_with(|| Aggregator::first(aggr, cell.value));
        }
        let mut cells: Vec<Cell> = groups
            .into_iter()
            .map(|(labels, acc)| Cell {
                labels,
                value: acc.result(),
            })
            .collect();
        if result_type.count_mapped() == 0 && cells.is_empty() {
            cells = materialize(&result_type, BTreeMap::new());
        }
        Ok(Self::from_parts(result_type, cells))
    }

    /// Look up the cells matching `address` on the addressed dimensions.
    ///
    /// The result spans the unaddressed dimensions; addressing every dimension
    /// yields a scalar. Labels that cannot exist in their dimension select
    /// nothing, which reads as 0.0.
    ///
    /// # Errors
    ///
    /// Address entries naming dimensions the tensor does not have.
    pub fn peek(&self, address: &Address) -> SparseResult<Self> {
        let names: Vec<&str> = address.keys().map(String::as_str).collect();
        let result_type = self.value_type.peek(&names)?;

        let mut wanted: Vec<(usize, Label)> = Vec::with_capacity(address.len());
        let mut addressable = true;
        for (name, label) in address {
            let idx = self.value_type.dimension_index(name).ok_or_else(|| {
                CoreError::UnknownDimension {
                    name: name.clone(),
                    value_type: self.value_type.to_string(),
                }
            })?;
            match resolve_label(&self.value_type.dimensions()[idx], label) {
                Some(resolved) => wanted.push((idx, resolved)),
                None => addressable = false,
            }
        }

        let kept: Vec<usize> = result_type
            .dimensions()
            .iter()
            .filter_map(|d| self.value_type.dimension_index(&d.name))
            .collect();
        let mut given = BTreeMap::new();
        if addressable {
            for cell in &self.cells {
                if wanted.iter().all(|(i, label)| &cell.labels[*i] == label) {
                    let labels: Vec<Label> =
                        kept.iter().map(|&i| cell.labels[i].clone()).collect();
                    given.insert(labels, cell.value);
                }
            }
        }
        let cells = materialize(&result_type, given);
        Ok(Self::from_parts(result_type, cells))
    }

    /// Fully materialized spec of this tensor.
    pub fn to_spec(&self) -> TensorSpec {
        let names = self.value_type.dimension_names();
        let mut spec = TensorSpec::new(self.value_type.clone());
        for cell in &self.cells {
            let address: Address = names.iter().cloned().zip(cell.labels.clone()).collect();
            spec.insert(address, cell.value);
        }
        spec
    }

    /// Subspace view used by the binary codec.
    pub fn to_wire(&self) -> WireTensor {
        let sizes = indexed_sizes(&self.value_type);
        let block: usize = sizes.iter().product();
        let mut subspaces: BTreeMap<Vec<String>, Vec<f64>> = BTreeMap::new();
        for cell in &self.cells {
            let (mapped, indexed) = split_labels(&cell.labels);
            let values = subspaces
                .entry(mapped)
                .or_insert_with(|| vec![0.0; block]);
            if let Some(offset) = offset_of(&sizes, &indexed) {
                values[offset] = cell.value;
            }
        }
        if self.value_type.count_mapped() == 0 && subspaces.is_empty() {
            subspaces.insert(Vec::new(), vec![0.0; block]);
        }
        WireTensor {
            value_type: self.value_type.clone(),
            subspaces: subspaces
                .into_iter()
                .map(|(labels, cells)| WireSubspace { labels, cells })
                .collect(),
        }
    }

    /// Rebuild a tensor from its subspace view.
    ///
    /// # Errors
    ///
    /// Subspaces with the wrong number of labels or values, or repeated
    /// mapped labels.
    pub fn from_wire(wire: WireTensor) -> SparseResult<Self> {
        let value_type = wire.value_type;
        let sizes = indexed_sizes(&value_type);
        let block: usize = sizes.iter().product();
        let mut cells = Vec::with_capacity(wire.subspaces.len() * block);
        for subspace in wire.subspaces {
            if subspace.labels.len() != value_type.count_mapped() {
                return Err(SparseError::LabelCount {
                    value_type: value_type.to_string(),
                    expected: value_type.count_mapped(),
                    found: subspace.labels.len(),
                });
            }
            if subspace.cells.len() != block {
                return Err(crate::error::CodecError::BlockSize {
                    expected: block,
                    found: subspace.cells.len(),
                }
                .into());
            }
            for (indexes, value) in row_major(&sizes).zip(subspace.cells) {
                let labels = join_labels(&value_type, &subspace.labels, &indexes);
                cells.push(Cell { labels, value });
            }
        }
        Self::new(value_type, cells)
    }

    /// Encode with the binary tensor format.
    pub fn encode(&self, format: CodecFormat) -> SparseResult<Vec<u8>> {
        Ok(codec::encode(&self.to_wire(), format)?)
    }

    /// Decode from the binary tensor format.
    pub fn decode(bytes: &[u8]) -> SparseResult<Self> {
        Self::from_wire(codec::decode(bytes)?)
    }
}

/// Where a join result dimension takes its label from
#[derive(Clone, Copy)]
enum Source {
    Lhs(usize),
    Rhs(usize),
}

fn check_labels(value_type: &TensorType, labels: &[Label]) -> SparseResult<()> {
    if labels.len() != value_type.rank() {
        return Err(SparseError::LabelCount {
            value_type: value_type.to_string(),
            expected: value_type.rank(),
            found: labels.len(),
        });
    }
    for (dim, label) in value_type.dimensions().iter().zip(labels) {
        let fits = match (dim.size, label) {
            (None, Label::Mapped(_)) => true,
            (Some(size), Label::Indexed(idx)) => *idx < size,
            _ => false,
        };
        if !fits {
            return Err(SparseError::InvalidLabel {
                label: label.to_string(),
                dimension: dim.to_string(),
            });
        }
    }
    Ok(())
}

fn format_labels(labels: &[Label]) -> String {
    let parts: Vec<String> = labels.iter().map(Label::to_string).collect();
    format!("[{}]", parts.join(","))
}

fn split_labels(labels: &[Label]) -> (Vec<String>, Vec<usize>) {
    let mut mapped = Vec::new();
    let mut indexed = Vec::new();
    for label in labels {
        match label {
            Label::Mapped(name) => mapped.push(name.clone()),
            Label::Indexed(idx) => indexed.push(*idx),
        }
    }
    (mapped, indexed)
}

/// Interleave mapped labels and dense indexes back into dimension order.
fn join_labels(value_type: &TensorType, mapped: &[String], indexes: &[usize]) -> Vec<Label> {
    let mut mapped = mapped.iter();
    let mut indexes = indexes.iter();
    value_type
        .dimensions()
        .iter()
        .map(|d| {
            if d.is_mapped() {
                Label::Mapped(mapped.next().cloned().unwrap_or_default())
            } else {
                Label::Indexed(indexes.next().copied().unwrap_or(0))
            }
        })
        .collect()
}

/// Expand `given` cells so every touched dense subspace is complete.
fn materialize(value_type: &TensorType, given: BTreeMap<Vec<Label>, f64>) -> Vec<Cell> {
    let sizes = indexed_sizes(value_type);
    let mut subspaces: BTreeSet<Vec<String>> = given
        .keys()
        .map(|labels| split_labels(labels).0)
        .collect();
    if value_type.count_mapped() == 0 {
        subspaces.insert(Vec::new());
    }
    let mut cells = Vec::with_capacity(subspaces.len() * value_type.dense_subspace_size());
    for mapped in &subspaces {
        for indexes in row_major(&sizes) {
            let labels = join_labels(value_type, mapped, &indexes);
            let value = given.get(&labels).copied().unwrap_or(0.0);
            cells.push(Cell { labels, value });
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenval_core::address;

    fn spec(ty: &str) -> TensorSpec {
        TensorSpec::parse(ty).unwrap()
    }

    fn l(s: &str) -> Label {
        Label::from(s)
    }

    fn i(idx: usize) -> Label {
        Label::from(idx)
    }

    #[test]
    fn test_create_materializes_dense_subspaces() {
        let input = spec("tensor(w{},x[2],y{},z[2])")
            .add([("w", l("xxx")), ("x", i(0)), ("y", l("xxx")), ("z", i(0))], 1.0)
            .add([("w", l("xxx")), ("x", i(0)), ("y", l("yyy")), ("z", i(1))], 2.0)
            .add([("w", l("xxx")), ("x", i(1)), ("y", l("xxx")), ("z", i(0))], 3.0)
            .add([("w", l("yyy")), ("x", i(0)), ("y", l("xxx")), ("z", i(0))], 4.0)
            .add([("w", l("yyy")), ("x", i(1)), ("y", l("yyy")), ("z", i(1))], 5.0);
        let tensor = SimpleTensor::create(&input).unwrap();

        // 4 touched (w, y) subspaces of 4 cells each
        assert_eq!(tensor.len(), 16);
        let output = tensor.to_spec();
        assert_eq!(output.len(), 16);
        assert_eq!(output, input);
        let filler = address([("w", l("yyy")), ("x", i(0)), ("y", l("yyy")), ("z", i(0))]);
        assert_eq!(output.cells().get(&filler), Some(&0.0));
    }

    #[test]
    fn test_dense_always_materialized() {
        let tensor = SimpleTensor::create(&spec("tensor(x[2],y[3])")).unwrap();
        assert_eq!(tensor.len(), 6);
        let scalar = SimpleTensor::create(&spec("double")).unwrap();
        assert_eq!(scalar.as_double(), Some(0.0));
        let sparse = SimpleTensor::create(&spec("tensor(x{})")).unwrap();
        assert!(sparse.is_empty());
    }

    #[test]
    fn test_create_rejects_invalid_address() {
        let bad = spec("tensor(x[2])").add([("x", i(2))], 1.0);
        assert!(matches!(
            SimpleTensor::create(&bad),
            Err(SparseError::Core(CoreError::InvalidAddress { .. }))
        ));
    }

    #[test]
    fn test_new_rejects_duplicates() {
        let t = TensorType::parse("tensor(x{})").unwrap();
        let cells = vec![
            Cell {
                labels: vec![l("a")],
                value: 1.0,
            },
            Cell {
                labels: vec![l("a")],
                value: 2.0,
            },
        ];
        assert!(matches!(
            SimpleTensor::new(t, cells),
            Err(SparseError::DuplicateCell { .. })
        ));
    }

    #[test]
    fn test_map_negates() {
        let input = spec("tensor(x{},y{})")
            .add([("x", l("1")), ("y", l("1"))], 1.0)
            .add([("x", l("2")), ("y", l("1"))], -3.0)
            .add([("x", l("1")), ("y", l("2"))], 5.0);
        let expected = spec("tensor(x{},y{})")
            .add([("x", l("1")), ("y", l("1"))], -1.0)
            .add([("x", l("2")), ("y", l("1"))], 3.0)
            .add([("x", l("1")), ("y", l("2"))], -5.0);
        let tensor = SimpleTensor::create(&input).unwrap();
        assert_eq!(tensor.map(MapOp::Neg).to_spec(), expected);
    }

    #[test]
    fn test_map_keeps_absent_cells_absent() {
        let input = spec("tensor(x{})").add([("x", l("a"))], 1.0);
        let mapped = SimpleTensor::create(&input)
            .unwrap()
            .map(MapOp::Custom(|v| v + 1.0));
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped.get(&[l("a")]), 2.0);
    }

    #[test]
    fn test_join_inner_and_cartesian() {
        let lhs = spec("tensor(x{},y{})")
            .add([("x", l("1")), ("y", l("1"))], 1.0)
            .add([("x", l("2")), ("y", l("1"))], 3.0)
            .add([("x", l("1")), ("y", l("2"))], 5.0);
        let rhs = spec("tensor(y{},z{})")
            .add([("y", l("1")), ("z", l("1"))], 7.0)
            .add([("y", l("2")), ("z", l("1"))], 11.0)
            .add([("y", l("1")), ("z", l("2"))], 13.0);
        let expected = spec("tensor(x{},y{},z{})")
            .add([("x", l("1")), ("y", l("1")), ("z", l("1"))], 7.0)
            .add([("x", l("1")), ("y", l("1")), ("z", l("2"))], 13.0)
            .add([("x", l("2")), ("y", l("1")), ("z", l("1"))], 21.0)
            .add([("x", l("2")), ("y", l("1")), ("z", l("2"))], 39.0)
            .add([("x", l("1")), ("y", l("2")), ("z", l("1"))], 55.0);
        let result = SimpleTensor::join(
            &SimpleTensor::create(&lhs).unwrap(),
            &SimpleTensor::create(&rhs).unwrap(),
            JoinOp::Mul,
        )
        .unwrap();
        assert_eq!(result.len(), 5);
        assert_eq!(result.to_spec(), expected);
    }

    #[test]
    fn test_join_kind_mismatch_fails() {
        let a = SimpleTensor::create(&spec("tensor(x{})")).unwrap();
        let b = SimpleTensor::create(&spec("tensor(x[2])")).unwrap();
        assert!(matches!(
            SimpleTensor::join(&a, &b, JoinOp::Add),
            Err(SparseError::Core(CoreError::DimensionMismatch { .. }))
        ));
    }

    #[test]
    fn test_join_float_with_double_is_double() {
        let a = SimpleTensor::create(&spec("tensor<float>(x[2])")).unwrap();
        let b = SimpleTensor::create(&spec("tensor<float>(x[2])")).unwrap();
        let c = SimpleTensor::create(&spec("tensor(x[2])")).unwrap();
        let ab = SimpleTensor::join(&a, &b, JoinOp::Add).unwrap();
        let ac = SimpleTensor::join(&a, &c, JoinOp::Add).unwrap();
        assert_eq!(ab.value_type().to_string(), "tensor<float>(x[2])");
        assert_eq!(ac.value_type().to_string(), "tensor(x[2])");
    }

    fn x3y2() -> SimpleTensor {
        let mut s = spec("tensor(x[3],y[2])");
        for x in 0..3 {
            for y in 0..2 {
                s = s.add([("x", i(x)), ("y", i(y))], (x * 2 + y + 1) as f64);
            }
        }
        SimpleTensor::create(&s).unwrap()
    }

    #[test]
    fn test_reduce_sum() {
        let t = x3y2();
        let over_x = t.reduce(Aggr::Sum, &["x"]).unwrap();
        assert_eq!(
            over_x.to_spec(),
            spec("tensor(y[2])")
                .add([("y", i(0))], 9.0)
                .add([("y", i(1))], 12.0)
        );
        let over_y = t.reduce(Aggr::Sum, &["y"]).unwrap();
        assert_eq!(
            over_y.to_spec(),
            spec("tensor(x[3])")
                .add([("x", i(0))], 3.0)
                .add([("x", i(1))], 7.0)
                .add([("x", i(2))], 11.0)
        );
        assert_eq!(
            t.reduce(Aggr::Sum, &["x", "y"]).unwrap().as_double(),
            Some(21.0)
        );
    }

    #[test]
    fn test_reduce_empty_dimension_list_folds_each_cell() {
        let t = x3y2();
        assert_eq!(t.reduce::<&str>(Aggr::Max, &[]).unwrap(), t);
        let counted = t.reduce::<&str>(Aggr::Count, &[]).unwrap();
        assert!(counted.cells().iter().all(|c| c.value == 1.0));
    }

    #[test]
    fn test_reduce_unknown_dimension_fails() {
        assert!(matches!(
            x3y2().reduce(Aggr::Sum, &["z"]),
            Err(SparseError::Core(CoreError::UnknownDimension { .. }))
        ));
    }

    #[test]
    fn test_reduce_empty_sparse_to_scalar() {
        let t = SimpleTensor::create(&spec("tensor(x{})")).unwrap();
        assert_eq!(t.reduce(Aggr::Avg, &["x"]).unwrap().as_double(), Some(0.0));
    }

    #[test]
    fn test_oversized_type_is_an_error() {
        let mut bytes = vec![2, 3];
        for name in [b'a', b'b', b'c'] {
            bytes.extend_from_slice(&[1, name, 0xff, 0xff, 0xff, 0xff]);
        }
        assert!(matches!(
            SimpleTensor::decode(&bytes),
            Err(SparseError::Codec(crate::error::CodecError::InvalidType(_)))
        ));
        assert!(matches!(
            TensorSpec::parse("tensor(a[4294967296],b[4294967296],c[4294967296])"),
            Err(CoreError::SizeOverflow(_))
        ));
    }

    #[test]
    fn test_reduce_empty_mixed_to_dense_keeps_block() {
        let t = SimpleTensor::create(&spec("tensor(m{},x[2])")).unwrap();
        assert!(t.is_empty());
        let dense = t.reduce(Aggr::Sum, &["m"]).unwrap();
        assert_eq!(dense.len(), 2);
        assert_eq!(dense.get(&[i(1)]), 0.0);
        let count = dense.reduce(Aggr::Count, &["x"]).unwrap();
        assert_eq!(count.as_double(), Some(2.0));
    }

    #[test]
    fn test_peek_partial_and_full() {
        let t = x3y2();
        let row = t.peek(&address([("x", i(1))])).unwrap();
        assert_eq!(
            row.to_spec(),
            spec("tensor(y[2])")
                .add([("y", i(0))], 3.0)
                .add([("y", i(1))], 4.0)
        );
        let cell = t.peek(&address([("x", i(2)), ("y", i(1))])).unwrap();
        assert_eq!(cell.as_double(), Some(6.0));
        let outside = t.peek(&address([("x", i(3)), ("y", i(1))])).unwrap();
        assert_eq!(outside.as_double(), Some(0.0));
        assert!(t.peek(&address([("q", i(0))])).is_err());
    }

    #[test]
    fn test_peek_mapped_with_numeric_label() {
        let t = SimpleTensor::create(&spec("tensor(x{})").add([("x", l("-1"))], 4.0)).unwrap();
        assert_eq!(
            t.peek(&address([("x", l("-1"))])).unwrap().as_double(),
            Some(4.0)
        );
        assert_eq!(
            t.peek(&address([("x", l("2"))])).unwrap().as_double(),
            Some(0.0)
        );
    }

    #[test]
    fn test_codec_roundtrip_mixed() {
        let input = spec("tensor<float>(x{},y[2])")
            .add([("x", l("b")), ("y", i(1))], 2.5)
            .add([("x", l("a")), ("y", i(0))], 0.5);
        let t = SimpleTensor::create(&input).unwrap();
        for format in [CodecFormat::Legacy, CodecFormat::Explicit] {
            let bytes = t.encode(format).unwrap();
            assert_eq!(bytes[..2], [7, 1]);
            assert_eq!(SimpleTensor::decode(&bytes).unwrap(), t);
        }
    }
}
