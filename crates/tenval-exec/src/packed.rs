//! Production engine over [`PackedTensor`].
//!
//! A packed tensor stores one dense block per distinct combination of mapped
//! labels (a subspace), all blocks back to back in typed [`CellStorage`]. A
//! hash index maps mapped labels to their subspace. Types without mapped
//! dimensions always hold exactly one subspace.
//!
//! Operations precompute a plan over the dense block layout once, then apply
//! it to every subspace (pair):
//!
//! - **join**: `(lhs offset, rhs offset)` for every result block offset
//! - **reduce**: result block offset for every source block offset
//! - **peek**: source block offset for every result block offset

use crate::engine::{TensorEngine, TensorValue, Value};
use anyhow::Result;
use smallvec::SmallVec;
use std::collections::HashMap;
use tenval_core::layout::{indexed_sizes, offset_of, row_major};
use tenval_core::{
    resolve_label, Address, Aggr, Aggregator, CellStorage, CellType, CellValue, CoreError,
    CoreResult, JoinOp, Label, MapOp, TensorSpec, TensorType,
};
use tenval_sparse::{codec, CodecFormat, WireSubspace, WireTensor};

/// Mapped labels of one subspace, in canonical dimension order
pub type Labels = SmallVec<[String; 4]>;

type Indexes = SmallVec<[usize; 6]>;

/// Subspace-blocked tensor with typed cells.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedTensor {
    value_type: TensorType,
    subspaces: Vec<Labels>,
    index: HashMap<Labels, usize>,
    cells: CellStorage,
}

/// Accumulates subspaces for a new tensor.
struct Builder {
    value_type: TensorType,
    block: usize,
    subspaces: Vec<Labels>,
    index: HashMap<Labels, usize>,
    cells: CellStorage,
}

impl Builder {
    fn new(value_type: TensorType) -> Self {
        let block = value_type.dense_subspace_size();
        let cells = CellStorage::with_capacity(value_type.cell_type(), block);
        Self {
            value_type,
            block,
            subspaces: Vec::new(),
            index: HashMap::new(),
            cells,
        }
    }

    /// Subspace for `labels`, appended as zeros if new.
    fn subspace(&mut self, labels: Labels) -> usize {
        if let Some(&idx) = self.index.get(&labels) {
            return idx;
        }
        let idx = self.subspaces.len();
        self.index.insert(labels.clone(), idx);
        self.subspaces.push(labels);
        self.cells.extend_zeros(self.block);
        idx
    }

    fn set(&mut self, subspace: usize, offset: usize, value: f64) {
        self.cells.set(subspace * self.block + offset, value);
    }

    /// Append a subspace known not to exist yet.
    fn push_block(&mut self, labels: Labels, values: impl Iterator<Item = f64>) {
        self.index.insert(labels.clone(), self.subspaces.len());
        self.subspaces.push(labels);
        for value in values {
            self.cells.push(value);
        }
    }

    fn build(mut self) -> PackedTensor {
        if self.value_type.count_mapped() == 0 && self.subspaces.is_empty() {
            self.subspace(Labels::new());
        }
        PackedTensor {
            value_type: self.value_type,
            subspaces: self.subspaces,
            index: self.index,
            cells: self.cells,
        }
    }
}

/// Where a result label comes from
#[derive(Clone, Copy)]
enum Source {
    Lhs(usize),
    Rhs(usize),
}

/// Position of each name of `names` within `within`.
fn positions<'a>(names: impl Iterator<Item = &'a str>, within: &[&str]) -> Vec<usize> {
    names
        .filter_map(|n| within.iter().position(|w| *w == n))
        .collect()
}

fn mapped_names(value_type: &TensorType) -> Vec<&str> {
    value_type
        .mapped_dimensions()
        .map(|d| d.name.as_str())
        .collect()
}

fn indexed_names(value_type: &TensorType) -> Vec<&str> {
    value_type
        .indexed_dimensions()
        .map(|d| d.name.as_str())
        .collect()
}

fn read<T: CellValue>(cells: &CellStorage, offset: usize) -> Option<f64> {
    T::slice(cells)?.get(offset).map(|v| v.to_double())
}

impl PackedTensor {
    pub fn from_double(value: f64) -> Self {
        let mut builder = Builder::new(TensorType::double());
        builder.push_block(Labels::new(), std::iter::once(value));
        builder.build()
    }

    /// Empty tensor of `value_type`; dense types get one block of zeros.
    pub fn empty(value_type: TensorType) -> Self {
        Builder::new(value_type).build()
    }

    pub fn from_spec(spec: &TensorSpec) -> CoreResult<Self> {
        spec.validate()?;
        let sizes = indexed_sizes(spec.value_type());
        let mut builder = Builder::new(spec.value_type().clone());
        for (address, value) in spec.cells() {
            let mut labels = Labels::new();
            let mut indexes = Indexes::new();
            for label in address.values() {
                match label {
                    Label::Mapped(name) => labels.push(name.clone()),
                    Label::Indexed(idx) => indexes.push(*idx),
                }
            }
            let subspace = builder.subspace(labels);
            let offset = offset_of(&sizes, &indexes).unwrap_or(0);
            builder.set(subspace, offset, *value);
        }
        Ok(builder.build())
    }

    pub fn value_type(&self) -> &TensorType {
        &self.value_type
    }

    pub fn subspace_count(&self) -> usize {
        self.subspaces.len()
    }

    pub fn cells(&self) -> &CellStorage {
        &self.cells
    }

    fn block(&self) -> usize {
        self.value_type.dense_subspace_size()
    }

    #[inline]
    fn cell(&self, idx: usize) -> f64 {
        self.cells.get(idx).unwrap_or(0.0)
    }

    /// Dense block of the subspace with `labels`.
    pub fn subspace(&self, labels: &[String]) -> Option<Vec<f64>> {
        let key: Labels = labels.iter().cloned().collect();
        let idx = *self.index.get(&key)?;
        Some(self.cells.block(idx * self.block(), self.block()))
    }

    /// Cell at `offset` of a tensor without mapped dimensions.
    pub fn dense_cell(&self, offset: usize) -> Option<f64> {
        if self.value_type.count_mapped() > 0 {
            return None;
        }
        match self.cells.cell_type() {
            CellType::Double => read::<f64>(&self.cells, offset),
            CellType::Float => read::<f32>(&self.cells, offset),
        }
    }

    pub fn to_spec(&self) -> TensorSpec {
        let sizes = indexed_sizes(&self.value_type);
        let block = self.block();
        let mut spec = TensorSpec::new(self.value_type.clone());
        for (si, labels) in self.subspaces.iter().enumerate() {
            for (offset, indexes) in row_major(&sizes).enumerate() {
                let address = self.address_of(labels, &indexes);
                spec.insert(address, self.cell(si * block + offset));
            }
        }
        spec
    }

    fn address_of(&self, labels: &[String], indexes: &[usize]) -> Address {
        let mut labels = labels.iter();
        let mut indexes = indexes.iter();
        self.value_type
            .dimensions()
            .iter()
            .map(|d| {
                let label = if d.is_mapped() {
                    Label::Mapped(labels.next().cloned().unwrap_or_default())
                } else {
                    Label::Indexed(indexes.next().copied().unwrap_or(0))
                };
                (d.name.clone(), label)
            })
            .collect()
    }

    pub fn map(&self, op: MapOp) -> Self {
        self.map_values(|v| op.apply(v))
    }

    fn map_values<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        Self {
            value_type: self.value_type.clone(),
            subspaces: self.subspaces.clone(),
            index: self.index.clone(),
            cells: self.cells.map(f),
        }
    }

    pub fn join(lhs: &PackedTensor, rhs: &PackedTensor, op: JoinOp) -> CoreResult<Self> {
        let result_type = TensorType::join(&lhs.value_type, &rhs.value_type)?;
        let lhs_mapped = mapped_names(&lhs.value_type);
        let rhs_mapped = mapped_names(&rhs.value_type);

        // (lhs position, rhs position) of every shared mapped dimension
        let shared: Vec<(usize, usize)> = lhs_mapped
            .iter()
            .enumerate()
            .filter_map(|(lp, n)| rhs_mapped.iter().position(|r| r == n).map(|rp| (lp, rp)))
            .collect();
        let sources: Vec<Source> = result_type
            .mapped_dimensions()
            .map(|d| match lhs_mapped.iter().position(|n| *n == d.name) {
                Some(lp) => Source::Lhs(lp),
                None => Source::Rhs(
                    rhs_mapped
                        .iter()
                        .position(|n| *n == d.name)
                        .unwrap_or(0),
                ),
            })
            .collect();

        let result_sizes = indexed_sizes(&result_type);
        let result_indexed = indexed_names(&result_type);
        let lhs_sizes = indexed_sizes(&lhs.value_type);
        let rhs_sizes = indexed_sizes(&rhs.value_type);
        let lhs_proj = positions(
            lhs.value_type.indexed_dimensions().map(|d| d.name.as_str()),
            &result_indexed,
        );
        let rhs_proj = positions(
            rhs.value_type.indexed_dimensions().map(|d| d.name.as_str()),
            &result_indexed,
        );
        let plan: Vec<(usize, usize)> = row_major(&result_sizes)
            .map(|idx| {
                let l: Indexes = lhs_proj.iter().map(|&p| idx[p]).collect();
                let r: Indexes = rhs_proj.iter().map(|&p| idx[p]).collect();
                (
                    offset_of(&lhs_sizes, &l).unwrap_or(0),
                    offset_of(&rhs_sizes, &r).unwrap_or(0),
                )
            })
            .collect();

        let mut by_shared: HashMap<Labels, Vec<usize>> = HashMap::new();
        for (ri, labels) in rhs.subspaces.iter().enumerate() {
            let key = shared.iter().map(|&(_, rp)| labels[rp].clone()).collect();
            by_shared.entry(key).or_default().push(ri);
        }

        let (lhs_block, rhs_block) = (lhs.block(), rhs.block());
        let mut builder = Builder::new(result_type);
        for (li, lhs_labels) in lhs.subspaces.iter().enumerate() {
            let key: Labels = shared.iter().map(|&(lp, _)| lhs_labels[lp].clone()).collect();
            let Some(matches) = by_shared.get(&key) else {
                continue;
            };
            for &ri in matches {
                let rhs_labels = &rhs.subspaces[ri];
                let labels = sources
                    .iter()
                    .map(|source| match *source {
                        Source::Lhs(p) => lhs_labels[p].clone(),
                        Source::Rhs(p) => rhs_labels[p].clone(),
                    })
                    .collect();
                let (lbase, rbase) = (li * lhs_block, ri * rhs_block);
                builder.push_block(
                    labels,
                    plan.iter()
                        .map(|&(lo, ro)| op.apply(lhs.cell(lbase + lo), rhs.cell(rbase + ro))),
                );
            }
        }
        Ok(builder.build())
    }

    pub fn reduce<S: AsRef<str>>(&self, aggr: Aggr, dims: &[S]) -> CoreResult<Self> {
        let result_type = self.value_type.reduce(dims)?;
        if dims.is_empty() {
            return Ok(self.map_values(|v| Aggregator::first(aggr, v).result()));
        }
        let src_mapped = mapped_names(&self.value_type);
        let kept_mapped = positions(
            result_type.mapped_dimensions().map(|d| d.name.as_str()),
            &src_mapped,
        );
        let src_sizes = indexed_sizes(&self.value_type);
        let result_sizes = indexed_sizes(&result_type);
        let kept_indexed = positions(
            result_type.indexed_dimensions().map(|d| d.name.as_str()),
            &indexed_names(&self.value_type),
        );
        let plan: Vec<usize> = row_major(&src_sizes)
            .map(|idx| {
                let kept: Indexes = kept_indexed.iter().map(|&p| idx[p]).collect();
                offset_of(&result_sizes, &kept).unwrap_or(0)
            })
            .collect();
        let result_block = result_type.dense_subspace_size();

        let mut groups: Vec<(Labels, Vec<Option<Aggregator>>)> = Vec::new();
        let mut group_of: HashMap<Labels, usize> = HashMap::new();
        let block = self.block();
        for (si, labels) in self.subspaces.iter().enumerate() {
            let key: Labels = kept_mapped.iter().map(|&p| labels[p].clone()).collect();
            let g = *group_of.entry(key.clone()).or_insert_with(|| {
                groups.push((key, vec![None; result_block]));
                groups.len() - 1
            });
            let accs = &mut groups[g].1;
            for (offset, &target) in plan.iter().enumerate() {
                let value = self.cell(si * block + offset);
                match &mut accs[target] {
                    Some(acc) => acc.add(value),
                    slot @ None => *slot = Some(Aggregator::first(aggr, value)),
                }
            }
        }

        let mut builder = Builder::new(result_type);
        for (labels, accs) in groups {
            builder.push_block(
                labels,
                accs.into_iter().map(|acc| acc.map_or(0.0, Aggregator::result)),
            );
        }
        Ok(builder.build())
    }

    pub fn peek(&self, address: &Address) -> CoreResult<Self> {
        let names: Vec<&str> = address.keys().map(String::as_str).collect();
        let result_type = self.value_type.peek(&names)?;
        let src_mapped = mapped_names(&self.value_type);
        let src_indexed = indexed_names(&self.value_type);

        let mut mapped_wanted: Vec<(usize, String)> = Vec::new();
        let mut indexed_fixed: Vec<(usize, usize)> = Vec::new();
        for (name, label) in address {
            let dim = self
                .value_type
                .dimension(name)
                .ok_or_else(|| CoreError::UnknownDimension {
                    name: name.clone(),
                    value_type: self.value_type.to_string(),
                })?;
            match resolve_label(dim, label) {
                Some(Label::Mapped(wanted)) => {
                    let pos = src_mapped.iter().position(|n| *n == name.as_str()).unwrap_or(0);
                    mapped_wanted.push((pos, wanted));
                }
                Some(Label::Indexed(idx)) => {
                    let pos = src_indexed.iter().position(|n| *n == name.as_str()).unwrap_or(0);
                    indexed_fixed.push((pos, idx));
                }
                None => return Ok(Self::empty(result_type)),
            }
        }

        let kept_mapped = positions(
            result_type.mapped_dimensions().map(|d| d.name.as_str()),
            &src_mapped,
        );
        let kept_indexed = positions(
            result_type.indexed_dimensions().map(|d| d.name.as_str()),
            &src_indexed,
        );
        let src_sizes = indexed_sizes(&self.value_type);
        let result_sizes = indexed_sizes(&result_type);
        let plan: Vec<usize> = row_major(&result_sizes)
            .map(|idx| {
                let mut src: Indexes = SmallVec::from_elem(0, src_sizes.len());
                for (k, &p) in kept_indexed.iter().enumerate() {
                    src[p] = idx[k];
                }
                for &(p, fixed) in &indexed_fixed {
                    src[p] = fixed;
                }
                offset_of(&src_sizes, &src).unwrap_or(0)
            })
            .collect();

        let block = self.block();
        let mut builder = Builder::new(result_type);
        for (si, labels) in self.subspaces.iter().enumerate() {
            if !mapped_wanted.iter().all(|(p, wanted)| labels[*p] == *wanted) {
                continue;
            }
            let kept: Labels = kept_mapped.iter().map(|&p| labels[p].clone()).collect();
            builder.push_block(kept, plan.iter().map(|&o| self.cell(si * block + o)));
        }
        Ok(builder.build())
    }

    pub fn to_wire(&self) -> WireTensor {
        let block = self.block();
        WireTensor {
            value_type: self.value_type.clone(),
            subspaces: self
                .subspaces
                .iter()
                .enumerate()
                .map(|(si, labels)| WireSubspace {
                    labels: labels.to_vec(),
                    cells: self.cells.block(si * block, block),
                })
                .collect(),
        }
        .sorted()
    }

    pub fn from_wire(wire: WireTensor) -> Self {
        let mut builder = Builder::new(wire.value_type);
        for subspace in wire.subspaces {
            builder.push_block(subspace.labels.into_iter().collect(), subspace.cells.into_iter());
        }
        builder.build()
    }

    /// Scalar value, if this is a scalar tensor.
    pub fn as_double(&self) -> Option<f64> {
        self.value_type.is_scalar().then(|| self.cell(0))
    }
}

impl TensorValue for PackedTensor {
    fn value_type(&self) -> &TensorType {
        &self.value_type
    }
}

/// Engine backed by [`PackedTensor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PackedEngine;

impl PackedEngine {
    pub fn new() -> Self {
        Self
    }

    fn lift(value: &Value<PackedTensor>) -> std::borrow::Cow<'_, PackedTensor> {
        match value {
            Value::Double(v) => std::borrow::Cow::Owned(PackedTensor::from_double(*v)),
            Value::Tensor(t) => std::borrow::Cow::Borrowed(t),
        }
    }

    fn wrap(tensor: PackedTensor) -> Value<PackedTensor> {
        match tensor.as_double() {
            Some(v) => Value::Double(v),
            None => Value::Tensor(tensor),
        }
    }
}

impl TensorEngine for PackedEngine {
    type Tensor = PackedTensor;

    fn name(&self) -> &'static str {
        "packed"
    }

    fn from_spec(&self, spec: &TensorSpec) -> Result<Value<PackedTensor>> {
        Ok(Self::wrap(PackedTensor::from_spec(spec)?))
    }

    fn to_spec(&self, value: &Value<PackedTensor>) -> TensorSpec {
        match value {
            Value::Double(v) => TensorSpec::scalar(*v),
            Value::Tensor(t) => t.to_spec(),
        }
    }

    fn map(&self, value: &Value<PackedTensor>, op: MapOp) -> Result<Value<PackedTensor>> {
        Ok(match value {
            Value::Double(v) => Value::Double(op.apply(*v)),
            Value::Tensor(t) => Value::Tensor(t.map(op)),
        })
    }

    fn join(
        &self,
        lhs: &Value<PackedTensor>,
        rhs: &Value<PackedTensor>,
        op: JoinOp,
    ) -> Result<Value<PackedTensor>> {
        if let (Value::Double(a), Value::Double(b)) = (lhs, rhs) {
            return Ok(Value::Double(op.apply(*a, *b)));
        }
        let result = PackedTensor::join(&Self::lift(lhs), &Self::lift(rhs), op)?;
        Ok(Self::wrap(result))
    }

    fn reduce(
        &self,
        value: &Value<PackedTensor>,
        aggr: Aggr,
        dims: &[String],
    ) -> Result<Value<PackedTensor>> {
        Ok(Self::wrap(Self::lift(value).reduce(aggr, dims)?))
    }

    fn peek(&self, value: &Value<PackedTensor>, address: &Address) -> Result<Value<PackedTensor>> {
        Ok(Self::wrap(Self::lift(value).peek(address)?))
    }

    fn dense_cell(&self, tensor: &PackedTensor, offset: usize) -> Option<f64> {
        tensor.dense_cell(offset)
    }

    fn encode(&self, value: &Value<PackedTensor>, format: CodecFormat) -> Result<Vec<u8>> {
        Ok(codec::encode(&Self::lift(value).to_wire(), format)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value<PackedTensor>> {
        Ok(Self::wrap(PackedTensor::from_wire(codec::decode(bytes)?)))
    }
}
