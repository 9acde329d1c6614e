//! exprla: structure-aware sparse times dense matrix products over Faer
//!
//! This crate evaluates `A * B`, with `A` a row-major sparse matrix and `B` a
//! column-major dense matrix, as a lazy expression. The structural properties
//! of the operands (triangular, unit diagonal, symmetric, Hermitian, diagonal)
//! and the ones declared on the product select the element-access plan and the
//! evaluation kernel, serial or parallel.

pub mod parallel;

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod expr;
pub mod matrix;

// Re-exports for convenience
pub use crate::config::*;
pub use crate::context::*;
pub use crate::core::*;
pub use crate::error::*;
pub use crate::expr::*;
pub use crate::matrix::*;
pub use crate::parallel::{Backend, Executor, SerialExecutor};
