//! Evaluation context for expression assignment.
//!
//! This module provides the context type that carries evaluation options and
//! the parallel backend into every assignment. Contexts encapsulate kernel
//! selection settings so that the same expression can be evaluated serially,
//! in parallel, with or without the optimized kernels.
//!
//! Modules:
//! - [`eval_context`]: Contains the `EvalContext` struct and the assignment entry points.
//!
//! # Example
//! ```rust,ignore
//! use exprla::{CsrMatrix, EvalContext, mul};
//! let ctx = EvalContext::new();
//! let c = ctx.evaluate(&mul(&a, &b)?);
//! ```

pub mod eval_context;
pub use eval_context::{EvalContext, Mode};
