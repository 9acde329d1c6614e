//! Core linear-algebra traits for exprla.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Mul, MulAssign, Sub, SubAssign};

use faer::Mat;
use num_complex::Complex;
use num_traits::{One, Zero};

use crate::context::{EvalContext, Mode};
use crate::core::structure::Structure;
use crate::matrix::sparse::CsrMatrix;

/// Fixed-width element type: real or complex, single or double precision.
pub trait Scalar:
    Copy
    + Debug
    + PartialEq
    + Send
    + Sync
    + 'static
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
{
    /// Whether the type has no imaginary part.
    const IS_REAL: bool;
    /// Arithmetic never reallocates, so accumulation may be regrouped freely.
    /// All built-in element types are fixed width; an arbitrary-precision type
    /// would set this to `false` and stay on the default kernel.
    const FIXED_WIDTH: bool = true;
    /// Complex conjugate (identity for real types).
    fn conj(self) -> Self;
}

impl Scalar for f32 {
    const IS_REAL: bool = true;
    fn conj(self) -> Self {
        self
    }
}

impl Scalar for f64 {
    const IS_REAL: bool = true;
    fn conj(self) -> Self {
        self
    }
}

impl Scalar for Complex<f32> {
    const IS_REAL: bool = false;
    fn conj(self) -> Self {
        Complex::conj(&self)
    }
}

impl Scalar for Complex<f64> {
    const IS_REAL: bool = false;
    fn conj(self) -> Self {
        Complex::conj(&self)
    }
}

/// Row/column dimensions of a matrix-shaped value.
pub trait MatShape {
    fn nrows(&self) -> usize;
    fn ncols(&self) -> usize;
}

/// Unchecked element read.
pub trait MatrixGet<T> {
    fn get(&self, i: usize, j: usize) -> T;
}

/// How an operand participates in an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// A named container; held by reference, read in place.
    Leaf,
    /// A cheap expression over existing storage (e.g. a transpose); held by value, read in place.
    View,
    /// A lazily computed value; held by value and evaluated before kernel use.
    Computation,
}

/// Anything that can appear as a matrix operand of an expression.
///
/// Operands are read concurrently by SMP assignment, hence `Sync`.
pub trait Operand: MatShape + Sync {
    fn kind(&self) -> OperandKind;
    /// Structural properties known to hold.
    fn structure(&self) -> Structure;
    /// Whether the operand's storage may overlap the storage starting at `addr`.
    fn is_aliased(&self, addr: *const ()) -> bool;
    fn requires_evaluation(&self) -> bool {
        self.kind() == OperandKind::Computation
    }
}

/// Row-major sparse operand.
pub trait SparseOperand<T: Scalar>: Operand + MatrixGet<T> + Clone {
    /// Zero-copy access for operands that already are compressed row storage.
    fn as_csr(&self) -> Option<&CsrMatrix<T>>;
    /// Materialize into compressed row storage.
    fn evaluate(&self, ctx: &EvalContext, mode: Mode) -> CsrMatrix<T>;
    /// `sum_{begin <= k < end} self(i, k) * f(k)`.
    fn row_dot<F: Fn(usize) -> T>(&self, i: usize, begin: usize, end: usize, f: F) -> T {
        (begin..end).fold(T::zero(), |acc, k| acc + self.get(i, k) * f(k))
    }
    /// Whether the operand can be read from several threads without prior evaluation.
    fn smp_assignable(&self) -> bool {
        !self.requires_evaluation()
    }
}

/// Column-major dense operand.
pub trait DenseOperand<T: Scalar>: Operand + MatrixGet<T> + Clone {
    /// Materialize into a dense matrix.
    fn evaluate(&self, ctx: &EvalContext, mode: Mode) -> Mat<T>;
    fn smp_assignable(&self) -> bool {
        !self.requires_evaluation()
    }
}
