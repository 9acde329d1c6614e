//! Configuration for expression evaluation.

pub mod options;
pub use options::{DEFAULT_SMP_THRESHOLD, EvalOptions};
