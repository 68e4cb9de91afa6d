//! Property-based tests for engine equivalence
//!
//! Every operation is run through [`Conformance`] on random inputs; the
//! packed engine must reproduce the reference engine exactly. Values are
//! small integers so that results do not depend on folding order.

#[cfg(test)]
mod tests {
    use crate::conformance::Conformance;
    use crate::{PackedEngine, SimpleEngine};
    use proptest::prelude::*;
    use tenval_core::{address, Aggr, Dimension, JoinOp, Label, MapOp, TensorSpec, TensorType};
    use tenval_sparse::CodecFormat;

    const TYPES: [&str; 7] = [
        "tensor(x{})",
        "tensor(x[3],y[2])",
        "tensor(x{},y[2])",
        "tensor<float>(x{},y{})",
        "tensor<float>(y[2],z[2])",
        "tensor(y{},z{})",
        "tensor(w{},x[2],y{},z[2])",
    ];

    fn label_for(dim: &Dimension, pick: usize) -> Label {
        match dim.size {
            Some(size) => Label::from(pick % size),
            None => Label::from(["a", "b", "c"][pick % 3]),
        }
    }

    fn spec_of(type_idx: usize, cells: Vec<(Vec<usize>, i32)>) -> TensorSpec {
        let value_type = TensorType::parse(TYPES[type_idx]).unwrap();
        let mut spec = TensorSpec::new(value_type.clone());
        for (picks, value) in cells {
            let addr = address(
                value_type
                    .dimensions()
                    .iter()
                    .zip(picks)
                    .map(|(d, p)| (d.name.clone(), label_for(d, p))),
            );
            spec.insert(addr, f64::from(value));
        }
        spec
    }

    fn spec_strategy() -> impl Strategy<Value = TensorSpec> {
        (
            0..TYPES.len(),
            prop::collection::vec((prop::collection::vec(0usize..6, 4), -9i32..9), 0..12),
        )
            .prop_map(|(type_idx, cells)| spec_of(type_idx, cells))
    }

    fn aggr_strategy() -> impl Strategy<Value = Aggr> {
        prop::sample::select(Aggr::ALL.to_vec())
    }

    fn map_strategy() -> impl Strategy<Value = MapOp> {
        prop::sample::select(vec![
            MapOp::Neg,
            MapOp::Abs,
            MapOp::Sqr,
            MapOp::Relu,
            MapOp::Exp,
            MapOp::Sigmoid,
        ])
    }

    fn join_strategy() -> impl Strategy<Value = JoinOp> {
        prop::sample::select(vec![JoinOp::Add, JoinOp::Sub, JoinOp::Mul, JoinOp::Max])
    }

    fn engines() -> Conformance<SimpleEngine, PackedEngine> {
        Conformance::new(SimpleEngine::new(), PackedEngine::new())
    }

    proptest! {
        #[test]
        fn prop_map_equivalent(spec in spec_strategy(), op in map_strategy()) {
            let mut c = engines();
            c.check_map("map", &spec, op);
            prop_assert!(c.report().is_ok(), "{}", c.report());
        }

        #[test]
        fn prop_join_equivalent(
            lhs in spec_strategy(),
            rhs in spec_strategy(),
            op in join_strategy(),
        ) {
            let mut c = engines();
            c.check_join("join", &lhs, &rhs, op);
            prop_assert!(c.report().is_ok(), "{}", c.report());
        }

        #[test]
        fn prop_reduce_equivalent(
            spec in spec_strategy(),
            aggr in aggr_strategy(),
            mask in prop::collection::vec(prop::bool::ANY, 4),
        ) {
            let dims: Vec<String> = spec
                .value_type()
                .dimension_names()
                .into_iter()
                .zip(mask)
                .filter_map(|(name, keep)| keep.then_some(name))
                .collect();
            let mut c = engines();
            c.check_reduce("reduce", &spec, aggr, &dims);
            prop_assert!(c.report().is_ok(), "{}", c.report());
        }

        #[test]
        fn prop_peek_equivalent(
            spec in spec_strategy(),
            picks in prop::collection::vec(prop::option::of(0usize..7), 4),
        ) {
            let value_type = spec.value_type().clone();
            let addr = address(
                value_type
                    .dimensions()
                    .iter()
                    .zip(picks)
                    .filter_map(|(d, p)| p.map(|p| (d.name.clone(), label_for(d, p)))),
            );
            let mut c = engines();
            c.check_peek("peek", &spec, &addr);
            prop_assert!(c.report().is_ok(), "{}", c.report());
        }

        #[test]
        fn prop_codec_equivalent(spec in spec_strategy(), explicit in prop::bool::ANY) {
            let format = if explicit { CodecFormat::Explicit } else { CodecFormat::Legacy };
            let mut c = engines();
            c.check_codec("codec", &spec, format);
            prop_assert!(c.report().is_ok(), "{}", c.report());
        }
    }
}
