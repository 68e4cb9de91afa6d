//! Cross-engine conformance checking.
//!
//! [`Conformance`] runs the same [`Case`] through a reference engine and a
//! candidate engine and records every case where the results differ. Results
//! are compared as [`TensorSpec`]s; codec cases additionally compare the
//! encoded bytes. Two engines that both reject a case agree on it.
//!
//! ```
//! use tenval_exec::conformance::{standard_cases, Conformance};
//! use tenval_exec::{PackedEngine, SimpleEngine};
//!
//! let mut conformance = Conformance::new(SimpleEngine::new(), PackedEngine::new());
//! for case in standard_cases().unwrap() {
//!     conformance.check(&case);
//! }
//! let report = conformance.finish();
//! assert!(report.is_ok(), "{}", report);
//! ```

use crate::engine::{TensorEngine, Value};
use crate::function::{PeekLabel, TensorFunction};
use crate::stash::Stash;
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt;
use tenval_core::{address, Address, Aggr, JoinOp, Label, MapOp, TensorSpec, TensorType};
use tenval_sparse::CodecFormat;

/// One operation to run on both engines
#[derive(Debug, Clone)]
pub enum Case {
    Map {
        input: TensorSpec,
        op: MapOp,
    },
    Join {
        lhs: TensorSpec,
        rhs: TensorSpec,
        op: JoinOp,
    },
    Reduce {
        input: TensorSpec,
        aggr: Aggr,
        dims: Vec<String>,
    },
    Peek {
        input: TensorSpec,
        address: Address,
    },
    Codec {
        input: TensorSpec,
        format: CodecFormat,
    },
    Function {
        function: TensorFunction,
        params: Vec<TensorSpec>,
    },
}

#[derive(Debug, Clone)]
pub struct NamedCase {
    pub name: String,
    pub case: Case,
}

impl NamedCase {
    pub fn new(name: impl Into<String>, case: Case) -> Self {
        Self {
            name: name.into(),
            case,
        }
    }
}

/// What one engine produced for a case
#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Value {
        spec: TensorSpec,
        bytes: Option<Vec<u8>>,
    },
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Value { spec, bytes: None } => write!(f, "{}", spec),
            Outcome::Value {
                spec,
                bytes: Some(bytes),
            } => write!(f, "{} encoded as {:?}", spec, bytes),
            Outcome::Failed => write!(f, "error"),
        }
    }
}

/// A case on which the engines disagree
#[derive(Debug, Clone)]
pub struct Divergence {
    pub case: String,
    pub reference: String,
    pub candidate: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConformanceReport {
    pub reference: String,
    pub candidate: String,
    pub checked: usize,
    pub divergences: Vec<Divergence>,
}

impl ConformanceReport {
    pub fn is_ok(&self) -> bool {
        self.divergences.is_empty()
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} vs {}: {} cases, {} divergent",
            self.reference,
            self.candidate,
            self.checked,
            self.divergences.len()
        )?;
        for d in &self.divergences {
            writeln!(f, "  {}:", d.case)?;
            writeln!(f, "    {}: {}", self.reference, d.reference)?;
            writeln!(f, "    {}: {}", self.candidate, d.candidate)?;
        }
        Ok(())
    }
}

/// Runs cases against a reference and a candidate engine
pub struct Conformance<A: TensorEngine, B: TensorEngine> {
    reference: A,
    candidate: B,
    report: ConformanceReport,
}

impl<A: TensorEngine, B: TensorEngine> Conformance<A, B> {
    pub fn new(reference: A, candidate: B) -> Self {
        let report = ConformanceReport {
            reference: reference.name().to_string(),
            candidate: candidate.name().to_string(),
            ..Default::default()
        };
        Self {
            reference,
            candidate,
            report,
        }
    }

    /// Run `case` on both engines; returns whether they agree.
    pub fn check(&mut self, case: &NamedCase) -> bool {
        let expected = run(&self.reference, &case.case);
        let actual = run(&self.candidate, &case.case);
        self.report.checked += 1;
        if expected == actual {
            return true;
        }
        tracing::warn!("engines diverge on {}", case.name);
        self.report.divergences.push(Divergence {
            case: case.name.clone(),
            reference: expected.to_string(),
            candidate: actual.to_string(),
        });
        false
    }

    pub fn check_map(&mut self, name: &str, input: &TensorSpec, op: MapOp) -> bool {
        self.check(&NamedCase::new(
            name,
            Case::Map {
                input: input.clone(),
                op,
            },
        ))
    }

    pub fn check_join(
        &mut self,
        name: &str,
        lhs: &TensorSpec,
        rhs: &TensorSpec,
        op: JoinOp,
    ) -> bool {
        self.check(&NamedCase::new(
            name,
            Case::Join {
                lhs: lhs.clone(),
                rhs: rhs.clone(),
                op,
            },
        ))
    }

    pub fn check_reduce<S: AsRef<str>>(
        &mut self,
        name: &str,
        input: &TensorSpec,
        aggr: Aggr,
        dims: &[S],
    ) -> bool {
        self.check(&NamedCase::new(
            name,
            Case::Reduce {
                input: input.clone(),
                aggr,
                dims: dims.iter().map(|d| d.as_ref().to_string()).collect(),
            },
        ))
    }

    pub fn check_peek(&mut self, name: &str, input: &TensorSpec, address: &Address) -> bool {
        self.check(&NamedCase::new(
            name,
            Case::Peek {
                input: input.clone(),
                address: address.clone(),
            },
        ))
    }

    pub fn check_codec(&mut self, name: &str, input: &TensorSpec, format: CodecFormat) -> bool {
        self.check(&NamedCase::new(
            name,
            Case::Codec {
                input: input.clone(),
                format,
            },
        ))
    }

    pub fn check_function(
        &mut self,
        name: &str,
        function: &TensorFunction,
        params: &[TensorSpec],
    ) -> bool {
        self.check(&NamedCase::new(
            name,
            Case::Function {
                function: function.clone(),
                params: params.to_vec(),
            },
        ))
    }

    pub fn report(&self) -> &ConformanceReport {
        &self.report
    }

    pub fn finish(self) -> ConformanceReport {
        self.report
    }
}

fn run<E: TensorEngine>(engine: &E, case: &Case) -> Outcome {
    match try_run(engine, case) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::debug!("{} failed: {:#}", engine.name(), e);
            Outcome::Failed
        }
    }
}

fn try_run<E: TensorEngine>(engine: &E, case: &Case) -> Result<Outcome> {
    let outcome = |value: Value<E::Tensor>| Outcome::Value {
        spec: engine.to_spec(&value),
        bytes: None,
    };
    Ok(match case {
        Case::Map { input, op } => outcome(engine.map(&engine.from_spec(input)?, *op)?),
        Case::Join { lhs, rhs, op } => outcome(engine.join(
            &engine.from_spec(lhs)?,
            &engine.from_spec(rhs)?,
            *op,
        )?),
        Case::Reduce { input, aggr, dims } => {
            outcome(engine.reduce(&engine.from_spec(input)?, *aggr, dims)?)
        }
        Case::Peek { input, address } => outcome(engine.peek(&engine.from_spec(input)?, address)?),
        Case::Codec { input, format } => {
            let bytes = engine.encode(&engine.from_spec(input)?, *format)?;
            let decoded = engine.decode(&bytes)?;
            Outcome::Value {
                spec: engine.to_spec(&decoded),
                bytes: Some(bytes),
            }
        }
        Case::Function { function, params } => {
            let params = params
                .iter()
                .map(|p| engine.from_spec(p))
                .collect::<Result<Vec<_>>>()?;
            let mut stash = Stash::new();
            let result = function.evaluate(engine, &params, &mut stash)?;
            Outcome::Value {
                spec: engine.to_spec(result),
                bytes: None,
            }
        }
    })
}

fn dense(value_type: &str, values: &[f64]) -> Result<TensorSpec> {
    let value_type = TensorType::parse(value_type)?;
    let mut spec = TensorSpec::new(value_type.clone());
    let sizes = tenval_core::layout::indexed_sizes(&value_type);
    for (indexes, v) in tenval_core::layout::row_major(&sizes).zip(values) {
        let entries = value_type
            .dimensions()
            .iter()
            .zip(indexes)
            .map(|(d, i)| (d.name.clone(), Label::Indexed(i)));
        spec.insert(address(entries), *v);
    }
    Ok(spec)
}

fn sparse<const N: usize>(value_type: &str, cells: &[([&str; N], f64)]) -> Result<TensorSpec> {
    let value_type = TensorType::parse(value_type)?;
    let mut spec = TensorSpec::new(value_type.clone());
    for (labels, v) in cells {
        let entries = value_type
            .dimensions()
            .iter()
            .zip(labels.iter())
            .map(|(d, l)| (d.name.clone(), Label::from(*l)));
        spec.insert(address(entries), *v);
    }
    Ok(spec)
}

fn peek_param(value_type: &str, dims: &[&str]) -> Result<TensorFunction> {
    let child = TensorFunction::inject(TensorType::parse(value_type)?, 0);
    let spec: BTreeMap<String, PeekLabel> = dims
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let index = TensorFunction::inject(TensorType::double(), i + 1);
            (d.to_string(), PeekLabel::from(index))
        })
        .collect();
    TensorFunction::peek(child, spec)
}

/// Built-in cases covering every operation on sparse, dense and mixed
/// tensors, double and float cells.
pub fn standard_cases() -> Result<Vec<NamedCase>> {
    let x3y2 = dense("tensor(x[3],y[2])", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;
    let x3y2f = dense("tensor<float>(x[3],y[2])", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;
    let xy = sparse(
        "tensor(x{},y{})",
        &[(["a", "a"], 1.0), (["a", "b"], 2.0), (["b", "a"], 3.0)],
    )?;
    let yz = sparse(
        "tensor(y{},z{})",
        &[(["a", "a"], 7.0), (["a", "b"], 13.0), (["b", "a"], 11.0)],
    )?;
    let mixed = TensorSpec::parse("tensor(x{},y[2])")?
        .add([("x", Label::from("a")), ("y", Label::from(0))], 1.0)
        .add([("x", Label::from("a")), ("y", Label::from(1))], 2.0)
        .add([("x", Label::from("b")), ("y", Label::from(1))], 4.0);
    let y2 = dense("tensor(y[2])", &[10.0, 20.0])?;
    let scalar = TensorSpec::scalar(2.5);
    let empty_mixed = TensorSpec::parse("tensor(m{},x[2])")?;

    let mut cases = Vec::new();
    for (name, spec) in [
        ("x3y2", &x3y2),
        ("x3y2f", &x3y2f),
        ("xy", &xy),
        ("mixed", &mixed),
        ("scalar", &scalar),
    ] {
        for op in [MapOp::Neg, MapOp::Sqr, MapOp::Relu] {
            cases.push(NamedCase::new(
                format!("map {} {}", op.name(), name),
                Case::Map {
                    input: spec.clone(),
                    op,
                },
            ));
        }
        for format in [CodecFormat::Legacy, CodecFormat::Explicit] {
            cases.push(NamedCase::new(
                format!("codec {:?} {}", format, name),
                Case::Codec {
                    input: spec.clone(),
                    format,
                },
            ));
        }
        for aggr in Aggr::ALL {
            cases.push(NamedCase::new(
                format!("reduce {} {} all", aggr, name),
                Case::Reduce {
                    input: spec.clone(),
                    aggr,
                    dims: spec.value_type().dimension_names(),
                },
            ));
            cases.push(NamedCase::new(
                format!("reduce {} {} none", aggr, name),
                Case::Reduce {
                    input: spec.clone(),
                    aggr,
                    dims: Vec::new(),
                },
            ));
        }
    }
    for (name, spec, dim) in [
        ("x3y2", &x3y2, "x"),
        ("x3y2f", &x3y2f, "y"),
        ("mixed", &mixed, "x"),
        ("mixed", &mixed, "y"),
        ("empty mixed", &empty_mixed, "m"),
    ] {
        cases.push(NamedCase::new(
            format!("reduce sum {} over {}", name, dim),
            Case::Reduce {
                input: spec.clone(),
                aggr: Aggr::Sum,
                dims: vec![dim.to_string()],
            },
        ));
    }

    let joins = [
        ("join xy*yz", &xy, &yz, JoinOp::Mul),
        ("join x3y2+y2", &x3y2, &y2, JoinOp::Add),
        ("join x3y2f*x3y2f", &x3y2f, &x3y2f, JoinOp::Mul),
        ("join mixed-y2", &mixed, &y2, JoinOp::Sub),
        ("join mixed*xy", &mixed, &xy, JoinOp::Mul),
        ("join scalar*x3y2f", &scalar, &x3y2f, JoinOp::Mul),
    ];
    for (name, lhs, rhs, op) in joins {
        cases.push(NamedCase::new(
            name,
            Case::Join {
                lhs: lhs.clone(),
                rhs: rhs.clone(),
                op,
            },
        ));
    }

    let peeks = [
        (
            "peek x3y2 full",
            &x3y2,
            address([("x", Label::from(2)), ("y", Label::from(1))]),
        ),
        ("peek x3y2 partial", &x3y2, address([("y", Label::from(0))])),
        ("peek x3y2 out of range", &x3y2, address([("x", Label::from(3))])),
        ("peek mixed row", &mixed, address([("x", Label::from("a"))])),
        ("peek mixed missing", &mixed, address([("x", Label::from("c"))])),
        ("peek mixed column", &mixed, address([("y", Label::from(1))])),
        (
            "peek xy cell",
            &xy,
            address([("x", Label::from("b")), ("y", Label::from("a"))]),
        ),
    ];
    for (name, input, address) in peeks {
        cases.push(NamedCase::new(
            name,
            Case::Peek {
                input: input.clone(),
                address,
            },
        ));
    }

    // empty mixed input still reduces to a full dense block
    let sum_then_count = TensorFunction::reduce(
        TensorFunction::reduce(
            TensorFunction::inject(empty_mixed.value_type().clone(), 0),
            Aggr::Sum,
            &["m"],
        )?,
        Aggr::Count,
        &["x"],
    )?;
    cases.push(NamedCase::new(
        "function count after sum empty mixed",
        Case::Function {
            function: sum_then_count,
            params: vec![empty_mixed.clone()],
        },
    ));

    let x3y2_peek = peek_param("tensor(x[3],y[2])", &["x", "y"])?;
    let mixed_peek = peek_param("tensor(x{},y[2])", &["x", "y"])?;
    for (a, b) in [(0.0, 1.0), (2.9, 0.2), (-0.7, 1.0), (3.0, 0.0), (1.0, -1.0)] {
        for (name, function, input) in [
            ("x3y2", &x3y2_peek, &x3y2),
            ("mixed", &mixed_peek, &mixed),
        ] {
            cases.push(NamedCase::new(
                format!("function peek {} ({}, {})", name, a, b),
                Case::Function {
                    function: function.clone(),
                    params: vec![input.clone(), TensorSpec::scalar(a), TensorSpec::scalar(b)],
                },
            ));
        }
    }
    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PackedEngine, SimpleEngine};

    #[test]
    fn test_standard_cases_agree() {
        let mut conformance = Conformance::new(SimpleEngine::new(), PackedEngine::new());
        for case in standard_cases().unwrap() {
            conformance.check(&case);
        }
        let report = conformance.finish();
        assert!(report.checked > 50);
        assert!(report.is_ok(), "{}", report);
    }

    #[test]
    fn test_both_failing_agree() {
        let mut conformance = Conformance::new(SimpleEngine::new(), PackedEngine::new());
        let x3 = dense("tensor(x[3])", &[1.0, 2.0, 3.0]).unwrap();
        let x2 = dense("tensor(x[2])", &[1.0, 2.0]).unwrap();
        assert!(conformance.check_join("mismatch", &x3, &x2, JoinOp::Add));
        assert!(conformance.report().is_ok());
    }

    #[test]
    fn test_report_display() {
        let report = ConformanceReport {
            reference: "simple".into(),
            candidate: "other".into(),
            checked: 2,
            divergences: vec![Divergence {
                case: "map neg".into(),
                reference: "1".into(),
                candidate: "2".into(),
            }],
        };
        let text = report.to_string();
        assert!(text.starts_with("simple vs other: 2 cases, 1 divergent"));
        assert!(text.contains("    other: 2"));
    }
}
