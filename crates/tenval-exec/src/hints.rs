//! Execution hints and configuration

use tenval_sparse::CodecFormat;

/// Execution hints for controlling function evaluation
#[derive(Clone, Debug)]
pub struct ExecHints {
    /// Run the optimizer before evaluation
    pub optimize: bool,
    /// Maximum number of values one evaluation may store
    pub stash_limit: Option<usize>,
    /// Tag family used when encoding results
    pub format: CodecFormat,
}

impl Default for ExecHints {
    fn default() -> Self {
        Self {
            optimize: true,
            stash_limit: None,
            format: CodecFormat::Legacy,
        }
    }
}

impl ExecHints {
    /// Create new execution hints with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable optimization
    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    /// Set stash limit
    pub fn with_stash_limit(mut self, limit: usize) -> Self {
        self.stash_limit = Some(limit);
        self
    }

    /// Set result encoding format
    pub fn with_format(mut self, format: CodecFormat) -> Self {
        self.format = format;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let hints = ExecHints::new()
            .with_optimize(false)
            .with_stash_limit(8)
            .with_format(CodecFormat::Explicit);
        assert!(!hints.optimize);
        assert_eq!(hints.stash_limit, Some(8));
        assert_eq!(hints.format, CodecFormat::Explicit);
        assert!(ExecHints::default().optimize);
    }
}
