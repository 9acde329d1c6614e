//! Core traits, structural classification and operand wrappers.

pub mod structure;
pub mod traits;
pub mod wrappers;

pub use structure::{propagate, Decl, Structure};
pub use traits::{DenseOperand, MatShape, MatrixGet, Operand, OperandKind, Scalar, SparseOperand};
pub use wrappers::{mat_addr, trans, DenseSnapshot, Held, Transposed};
