//! Per-evaluation value arena
//!
//! Every intermediate produced while evaluating a [`crate::TensorFunction`]
//! is pushed into a [`Stash`] and addressed by slot. References handed out by
//! evaluation borrow the stash, so no value outlives the evaluation that
//! produced it. Clearing the stash reuses its allocation for the next run.

use crate::engine::Value;
use crate::error::ExecError;

/// Arena of evaluation results
#[derive(Debug)]
pub struct Stash<T> {
    values: Vec<Value<T>>,
    limit: Option<usize>,
    /// Statistics for monitoring
    total_pushes: usize,
    peak: usize,
}

/// Stash statistics
#[derive(Debug, Clone, PartialEq)]
pub struct StashStats {
    /// Values currently held
    pub len: usize,
    /// Values pushed since creation
    pub total_pushes: usize,
    /// Highest number of values held at once
    pub peak: usize,
    pub limit: Option<usize>,
}

impl<T> Default for Stash<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Stash<T> {
    /// Create an unbounded stash
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            limit: None,
            total_pushes: 0,
            peak: 0,
        }
    }

    /// Create a stash that refuses to hold more than `limit` values
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }

    /// Store `value`, returning its slot.
    pub fn push(&mut self, value: Value<T>) -> Result<usize, ExecError> {
        if let Some(limit) = self.limit {
            if self.values.len() >= limit {
                return Err(ExecError::StashExhausted { limit });
            }
        }
        self.values.push(value);
        self.total_pushes += 1;
        self.peak = self.peak.max(self.values.len());
        Ok(self.values.len() - 1)
    }

    pub fn get(&self, slot: usize) -> Option<&Value<T>> {
        self.values.get(slot)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop every stored value, keeping the allocation
    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn stats(&self) -> StashStats {
        StashStats {
            len: self.values.len(),
            total_pushes: self.total_pushes,
            peak: self.peak,
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_get() {
        let mut stash: Stash<()> = Stash::new();
        let a = stash.push(Value::Double(1.0)).unwrap();
        let b = stash.push(Value::Double(2.0)).unwrap();
        assert_eq!((a, b), (0, 1));
        assert_eq!(stash.get(1), Some(&Value::Double(2.0)));
        assert_eq!(stash.get(2), None);
    }

    #[test]
    fn test_limit() {
        let mut stash: Stash<()> = Stash::with_limit(1);
        stash.push(Value::Double(1.0)).unwrap();
        assert_eq!(
            stash.push(Value::Double(2.0)),
            Err(ExecError::StashExhausted { limit: 1 })
        );
    }

    #[test]
    fn test_clear_keeps_stats() {
        let mut stash: Stash<()> = Stash::new();
        stash.push(Value::Double(1.0)).unwrap();
        stash.push(Value::Double(2.0)).unwrap();
        stash.clear();
        stash.push(Value::Double(3.0)).unwrap();
        let stats = stash.stats();
        assert_eq!(stats.len, 1);
        assert_eq!(stats.total_pushes, 3);
        assert_eq!(stats.peak, 2);
        assert!(!stash.is_empty());
    }
}
