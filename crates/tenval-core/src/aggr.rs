//! Aggregation functions used by reduce.
//!
//! [`Aggr`] names the closed set of aggregations. An [`Aggregator`] is the
//! per-group fold state: it is started from the first value of a group, fed
//! every further value with [`Aggregator::add`], and consumed by
//! [`Aggregator::result`]. Starting from a value means an aggregator never
//! exists for an empty group.
//!
//! ```
//! use tenval_core::{Aggr, Aggregator};
//!
//! let mut avg = Aggregator::first(Aggr::Avg, 1.0);
//! avg.add(2.0);
//! avg.add(6.0);
//! assert_eq!(avg.result(), 3.0);
//!
//! assert_eq!("max".parse::<Aggr>().unwrap(), Aggr::Max);
//! ```

use crate::error::CoreError;
use std::fmt;
use std::str::FromStr;

/// Named aggregation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Aggr {
    Avg,
    Count,
    Prod,
    Sum,
    Max,
    Min,
}

impl Aggr {
    pub const ALL: [Aggr; 6] = [
        Aggr::Avg,
        Aggr::Count,
        Aggr::Prod,
        Aggr::Sum,
        Aggr::Max,
        Aggr::Min,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Aggr::Avg => "avg",
            Aggr::Count => "count",
            Aggr::Prod => "prod",
            Aggr::Sum => "sum",
            Aggr::Max => "max",
            Aggr::Min => "min",
        }
    }

    /// Fold a non-empty sequence of values.
    pub fn fold<I: IntoIterator<Item = f64>>(self, values: I) -> Option<f64> {
        let mut iter = values.into_iter();
        let mut acc = Aggregator::first(self, iter.next()?);
        for v in iter {
            acc.add(v);
        }
        Some(acc.result())
    }
}

impl fmt::Display for Aggr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Aggr {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Aggr::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| CoreError::UnknownAggregator(s.to_string()))
    }
}

/// Running state of one aggregation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregator {
    Avg { sum: f64, count: usize },
    Count(usize),
    Prod(f64),
    Sum(f64),
    Max(f64),
    Min(f64),
}

impl Aggregator {
    /// Start aggregating with the first value of a group.
    pub fn first(aggr: Aggr, value: f64) -> Self {
        match aggr {
            Aggr::Avg => Aggregator::Avg {
                sum: value,
                count: 1,
            },
            Aggr::Count => Aggregator::Count(1),
            Aggr::Prod => Aggregator::Prod(value),
            Aggr::Sum => Aggregator::Sum(value),
            Aggr::Max => Aggregator::Max(value),
            Aggr::Min => Aggregator::Min(value),
        }
    }

    pub fn add(&mut self, value: f64) {
        match self {
            Aggregator::Avg { sum, count } => {
                *sum += value;
                *count += 1;
            }
            Aggregator::Count(n) => *n += 1,
            Aggregator::Prod(p) => *p *= value,
            Aggregator::Sum(s) => *s += value,
            Aggregator::Max(m) => *m = m.max(value),
            Aggregator::Min(m) => *m = m.min(value),
        }
    }

    pub fn result(self) -> f64 {
        match self {
            Aggregator::Avg { sum, count } => sum / count as f64,
            Aggregator::Count(n) => n as f64,
            Aggregator::Prod(v)
            | Aggregator::Sum(v)
            | Aggregator::Max(v)
            | Aggregator::Min(v) => v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for aggr in Aggr::ALL {
            assert_eq!(aggr.name().parse::<Aggr>().unwrap(), aggr);
        }
        assert_eq!(
            "median".parse::<Aggr>(),
            Err(CoreError::UnknownAggregator("median".to_string()))
        );
    }

    #[test]
    fn test_fold_each_aggregator() {
        let values = [2.0, 5.0, 3.0];
        assert_eq!(Aggr::Avg.fold(values), Some(10.0 / 3.0));
        assert_eq!(Aggr::Count.fold(values), Some(3.0));
        assert_eq!(Aggr::Prod.fold(values), Some(30.0));
        assert_eq!(Aggr::Sum.fold(values), Some(10.0));
        assert_eq!(Aggr::Max.fold(values), Some(5.0));
        assert_eq!(Aggr::Min.fold(values), Some(2.0));
        assert_eq!(Aggr::Sum.fold(std::iter::empty()), None);
    }

    #[test]
    fn test_single_value_identity() {
        for aggr in Aggr::ALL {
            let expected = if aggr == Aggr::Count { 1.0 } else { 7.5 };
            assert_eq!(Aggregator::first(aggr, 7.5).result(), expected);
        }
    }
}
