//! Dense matrix with structural tags, on top of Faer.
//!
//! `DenseMatrix` pairs a column-major `faer::Mat<T>` with the [`Structure`]
//! known to hold for it. The structure is checked when it is attached, so the
//! kernels can rely on it (e.g. a symmetric right operand enables the
//! restructured product, a diagonal one the diagonal fast path).

use faer::Mat;

use crate::context::{EvalContext, Mode};
use crate::core::structure::Structure;
use crate::core::traits::{DenseOperand, MatShape, MatrixGet, Operand, OperandKind, Scalar};
use crate::core::wrappers::mat_addr;
use crate::error::LaError;

#[derive(Debug, Clone)]
pub struct DenseMatrix<T> {
    inner: Mat<T>,
    structure: Structure,
}

impl<T: Scalar> DenseMatrix<T> {
    /// Wrap an existing matrix without structural claims.
    pub fn new(inner: Mat<T>) -> Self {
        Self { inner, structure: Structure::empty() }
    }

    pub fn from_fn<F: FnMut(usize, usize) -> T>(nrows: usize, ncols: usize, f: F) -> Self {
        Self::new(Mat::from_fn(nrows, ncols, f))
    }

    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self::from_fn(nrows, ncols, |_, _| T::zero())
    }

    /// Tag the matrix with structural properties, after checking they hold.
    pub fn with_structure(mut self, structure: Structure) -> Result<Self, LaError> {
        let structure = structure.normalized();
        let m = &self.inner;
        structure.verify(m.nrows(), m.ncols(), |i, j| m[(i, j)])?;
        self.structure = structure;
        Ok(self)
    }

    pub fn structure(&self) -> Structure {
        self.structure
    }

    pub fn as_mat(&self) -> &Mat<T> {
        &self.inner
    }

    pub fn into_mat(self) -> Mat<T> {
        self.inner
    }
}

impl<T: Scalar> MatShape for DenseMatrix<T> {
    fn nrows(&self) -> usize {
        self.inner.nrows()
    }
    fn ncols(&self) -> usize {
        self.inner.ncols()
    }
}

impl<T: Scalar> MatrixGet<T> for DenseMatrix<T> {
    #[inline]
    fn get(&self, i: usize, j: usize) -> T {
        self.inner[(i, j)]
    }
}

impl<T: Scalar> Operand for DenseMatrix<T> {
    fn kind(&self) -> OperandKind {
        OperandKind::Leaf
    }
    fn structure(&self) -> Structure {
        self.structure
    }
    fn is_aliased(&self, addr: *const ()) -> bool {
        mat_addr(&self.inner) == addr
    }
}

impl<T: Scalar> DenseOperand<T> for DenseMatrix<T> {
    fn evaluate(&self, _ctx: &EvalContext, _mode: Mode) -> Mat<T> {
        self.inner.clone()
    }
}
