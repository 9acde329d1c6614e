//! Operand wrappers for faer dense matrices, transpose views and evaluation snapshots.
//!
//! This module makes `faer::Mat` usable as a leaf dense operand, provides the
//! [`Transposed`] view, the [`Held`] ownership mode used by expressions to store
//! their operands, and the snapshot types that kernels read from.
//!
//! # Ownership
//! Leaves are held by reference; views and computations are held by value.
//! The choice is a pure function of [`OperandKind`], made once when an
//! expression is built.
//!
//! # Snapshots
//! Right before a kernel runs, each operand is turned into a snapshot: a
//! zero-copy reference when the operand can be read in place, or a freshly
//! evaluated container when it is a computation. A snapshot lives for exactly
//! one kernel invocation.

use std::borrow::Cow;
use std::ops::Deref;

use faer::Mat;
use log::trace;

use crate::context::{EvalContext, Mode};
use crate::core::structure::Structure;
use crate::core::traits::{DenseOperand, MatShape, MatrixGet, Operand, OperandKind, Scalar, SparseOperand};
use crate::matrix::sparse::CsrMatrix;

/// Address of the first element of a dense matrix, for alias checks.
pub fn mat_addr<T>(m: &Mat<T>) -> *const () {
    m.as_ref().as_ptr() as *const ()
}

impl<T> MatShape for Mat<T> {
    fn nrows(&self) -> usize {
        self.nrows()
    }
    fn ncols(&self) -> usize {
        self.ncols()
    }
}

impl<T: Copy> MatrixGet<T> for Mat<T> {
    fn get(&self, i: usize, j: usize) -> T {
        self[(i, j)]
    }
}

/// A plain faer matrix is an unstructured leaf.
impl<T: Scalar> Operand for Mat<T> {
    fn kind(&self) -> OperandKind {
        OperandKind::Leaf
    }
    fn structure(&self) -> Structure {
        Structure::empty()
    }
    fn is_aliased(&self, addr: *const ()) -> bool {
        mat_addr(self) == addr
    }
}

impl<T: Scalar> DenseOperand<T> for Mat<T> {
    fn evaluate(&self, _ctx: &EvalContext, _mode: Mode) -> Mat<T> {
        self.clone()
    }
}

/// Operand storage inside an expression.
#[derive(Debug)]
pub enum Held<'a, M> {
    Borrowed(&'a M),
    Owned(M),
}

impl<'a, M: Operand + Clone> Held<'a, M> {
    /// Borrow leaves, copy views and computations.
    pub fn of(m: &'a M) -> Self {
        match m.kind() {
            OperandKind::Leaf => Held::Borrowed(m),
            OperandKind::View | OperandKind::Computation => Held::Owned(m.clone()),
        }
    }

    pub fn is_borrowed(&self) -> bool {
        matches!(self, Held::Borrowed(_))
    }
}

impl<M> Deref for Held<'_, M> {
    type Target = M;
    fn deref(&self) -> &M {
        match self {
            Held::Borrowed(m) => m,
            Held::Owned(m) => m,
        }
    }
}

impl<M: Clone> Clone for Held<'_, M> {
    fn clone(&self) -> Self {
        match self {
            Held::Borrowed(m) => Held::Borrowed(m),
            Held::Owned(m) => Held::Owned(m.clone()),
        }
    }
}

/// Zero-copy transpose of a dense operand.
#[derive(Debug)]
pub struct Transposed<'a, R> {
    inner: Held<'a, R>,
}

impl<'a, R: Operand + Clone> Transposed<'a, R> {
    pub fn new(inner: &'a R) -> Self {
        Self { inner: Held::of(inner) }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

/// `trans(r)`: transpose view of a dense operand.
pub fn trans<R: Operand + Clone>(r: &R) -> Transposed<'_, R> {
    Transposed::new(r)
}

impl<R: Clone> Clone for Transposed<'_, R> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<R: MatShape> MatShape for Transposed<'_, R> {
    fn nrows(&self) -> usize {
        self.inner.ncols()
    }
    fn ncols(&self) -> usize {
        self.inner.nrows()
    }
}

impl<T, R: MatrixGet<T>> MatrixGet<T> for Transposed<'_, R> {
    fn get(&self, i: usize, j: usize) -> T {
        self.inner.get(j, i)
    }
}

impl<R: Operand> Operand for Transposed<'_, R> {
    fn kind(&self) -> OperandKind {
        OperandKind::View
    }
    fn structure(&self) -> Structure {
        self.inner.structure().transposed()
    }
    fn is_aliased(&self, addr: *const ()) -> bool {
        self.inner.is_aliased(addr)
    }
    fn requires_evaluation(&self) -> bool {
        self.inner.requires_evaluation()
    }
}

impl<T: Scalar, R: DenseOperand<T>> DenseOperand<T> for Transposed<'_, R> {
    fn evaluate(&self, ctx: &EvalContext, mode: Mode) -> Mat<T> {
        let src = snapshot_dense(&*self.inner, ctx, mode);
        Mat::from_fn(self.nrows(), self.ncols(), |i, j| src.get(j, i))
    }
}

/// Dense operand as seen by a kernel: in place or evaluated.
pub enum DenseSnapshot<'s, T, R> {
    View(&'s R),
    Evaluated(Mat<T>),
}

impl<T: Copy, R: MatrixGet<T>> MatrixGet<T> for DenseSnapshot<'_, T, R> {
    #[inline]
    fn get(&self, i: usize, j: usize) -> T {
        match self {
            DenseSnapshot::View(r) => r.get(i, j),
            DenseSnapshot::Evaluated(m) => m[(i, j)],
        }
    }
}

impl<T, R: MatShape> MatShape for DenseSnapshot<'_, T, R> {
    fn nrows(&self) -> usize {
        match self {
            DenseSnapshot::View(r) => r.nrows(),
            DenseSnapshot::Evaluated(m) => m.nrows(),
        }
    }
    fn ncols(&self) -> usize {
        match self {
            DenseSnapshot::View(r) => r.ncols(),
            DenseSnapshot::Evaluated(m) => m.ncols(),
        }
    }
}

/// Evaluate `r` if it is a computation, otherwise read it in place.
pub fn snapshot_dense<'s, T: Scalar, R: DenseOperand<T>>(
    r: &'s R,
    ctx: &EvalContext,
    mode: Mode,
) -> DenseSnapshot<'s, T, R> {
    if r.requires_evaluation() {
        trace!("evaluating {}x{} dense operand ({:?})", r.nrows(), r.ncols(), mode);
        let m = r.evaluate(ctx, mode);
        debug_assert_eq!(m.nrows(), r.nrows(), "Invalid number of rows");
        debug_assert_eq!(m.ncols(), r.ncols(), "Invalid number of columns");
        DenseSnapshot::Evaluated(m)
    } else {
        DenseSnapshot::View(r)
    }
}

/// Borrow compressed row storage when available, otherwise evaluate into it.
pub fn snapshot_sparse<'s, T: Scalar, L: SparseOperand<T>>(
    l: &'s L,
    ctx: &EvalContext,
    mode: Mode,
) -> Cow<'s, CsrMatrix<T>> {
    match l.as_csr() {
        Some(m) if !l.requires_evaluation() => Cow::Borrowed(m),
        _ => {
            trace!("evaluating {}x{} sparse operand ({:?})", l.nrows(), l.ncols(), mode);
            let m = l.evaluate(ctx, mode);
            debug_assert_eq!(m.nrows(), l.nrows(), "Invalid number of rows");
            debug_assert_eq!(m.ncols(), l.ncols(), "Invalid number of columns");
            Cow::Owned(m)
        }
    }
}
