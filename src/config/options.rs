//! Evaluation options for expression assignment.
//!
//! This module provides the `EvalOptions` struct, which selects between the
//! reference and the register-blocked kernels and gates parallel (SMP)
//! assignment by result size. Options are passed into an evaluation context
//! rather than compiled in, so kernel selection can be exercised under every
//! setting.

/// Default number of result elements from which an SMP assignment pays off (55x55).
pub const DEFAULT_SMP_THRESHOLD: usize = 3025;

/// Kernel selection & parallel dispatch parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalOptions {
    /// Use the loop-unrolled kernels where they apply
    pub optimized_kernels: bool,

    /// Minimum `rows * columns` of a result before SMP assignment is used
    pub smp_threshold: usize,

    /// Allow SMP assignment at all
    pub smp_enabled: bool,
}

impl EvalOptions {
    pub fn new() -> Self {
        Self {
            optimized_kernels: true,
            smp_threshold: DEFAULT_SMP_THRESHOLD,
            smp_enabled: true,
        }
    }

    pub fn with_optimized_kernels(mut self, on: bool) -> Self {
        self.optimized_kernels = on;
        self
    }

    pub fn with_smp_threshold(mut self, threshold: usize) -> Self {
        self.smp_threshold = threshold;
        self
    }

    pub fn with_smp(mut self, on: bool) -> Self {
        self.smp_enabled = on;
        self
    }
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self::new()
    }
}
