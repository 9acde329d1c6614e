//! Evaluation context: options, backend and assignment entry points.
//!
//! `EvalContext` is the single place where user code hands a product
//! expression to a destination. Each entry point checks the destination shape
//! and then forwards to the expression's own dispatch, which selects the
//! evaluation strategy once per call.
//!
//! # Usage
//!
//! 1. Construct an `EvalContext` (default options, or `with_options`).
//! 2. Build an expression with `mul` or the `*` operator.
//! 3. Call `assign`, `add_assign`, `sub_assign`, `schur_assign` (or their `smp_` forms).

use faer::Mat;

use crate::config::EvalOptions;
use crate::core::traits::{DenseOperand, Scalar, SparseOperand};
use crate::error::LaError;
use crate::expr::SparseDenseProduct;
use crate::matrix::sparse::CsrMatrix;
use crate::parallel::{Backend, SerialExecutor};

/// How nested computations are evaluated when an operand snapshot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Force nested computations to evaluate serially.
    Serial,
    /// Let nested computations choose their own (possibly parallel) strategy.
    Smp,
}

/// Options and backend for a family of assignments.
#[derive(Debug, Clone)]
pub struct EvalContext {
    /// Kernel selection & SMP parameters
    pub options: EvalOptions,
    /// Executor used by SMP assignments
    pub backend: Backend,
}

impl EvalContext {
    /// Default options on the default backend.
    pub fn new() -> Self {
        Self { options: EvalOptions::default(), backend: Backend::default() }
    }

    /// Default options with SMP assignment disabled and a serial backend.
    pub fn serial() -> Self {
        Self {
            options: EvalOptions::default().with_smp(false),
            backend: Backend::Serial(SerialExecutor),
        }
    }

    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Evaluate an expression into a fresh matrix.
    pub fn evaluate<T, L, R>(&self, expr: &SparseDenseProduct<'_, T, L, R>) -> Mat<T>
    where
        T: Scalar,
        L: SparseOperand<T>,
        R: DenseOperand<T>,
    {
        expr.eval(self, Mode::Serial)
    }

    /// `dst = expr`
    pub fn assign<T, L, R>(&self, dst: &mut Mat<T>, expr: &SparseDenseProduct<'_, T, L, R>) -> Result<(), LaError>
    where
        T: Scalar,
        L: SparseOperand<T>,
        R: DenseOperand<T>,
    {
        check_target(dst, expr)?;
        expr.assign_to(dst, self);
        Ok(())
    }

    /// `dst += expr`
    pub fn add_assign<T, L, R>(&self, dst: &mut Mat<T>, expr: &SparseDenseProduct<'_, T, L, R>) -> Result<(), LaError>
    where
        T: Scalar,
        L: SparseOperand<T>,
        R: DenseOperand<T>,
    {
        check_target(dst, expr)?;
        expr.add_assign_to(dst, self);
        Ok(())
    }

    /// `dst -= expr`
    pub fn sub_assign<T, L, R>(&self, dst: &mut Mat<T>, expr: &SparseDenseProduct<'_, T, L, R>) -> Result<(), LaError>
    where
        T: Scalar,
        L: SparseOperand<T>,
        R: DenseOperand<T>,
    {
        check_target(dst, expr)?;
        expr.sub_assign_to(dst, self);
        Ok(())
    }

    /// `dst = dst ∘ expr` (element-wise product)
    pub fn schur_assign<T, L, R>(&self, dst: &mut Mat<T>, expr: &SparseDenseProduct<'_, T, L, R>) -> Result<(), LaError>
    where
        T: Scalar,
        L: SparseOperand<T>,
        R: DenseOperand<T>,
    {
        check_target(dst, expr)?;
        expr.schur_assign_to(dst, self);
        Ok(())
    }

    /// Evaluate into compressed row storage (the dense result is materialized first).
    pub fn assign_sparse<T, L, R>(&self, expr: &SparseDenseProduct<'_, T, L, R>) -> CsrMatrix<T>
    where
        T: Scalar,
        L: SparseOperand<T>,
        R: DenseOperand<T>,
    {
        expr.eval_sparse(self)
    }

    /// SMP form of [`assign`](Self::assign).
    pub fn smp_assign<T, L, R>(&self, dst: &mut Mat<T>, expr: &SparseDenseProduct<'_, T, L, R>) -> Result<(), LaError>
    where
        T: Scalar,
        L: SparseOperand<T>,
        R: DenseOperand<T>,
    {
        check_target(dst, expr)?;
        expr.smp_assign_to(dst, self);
        Ok(())
    }

    /// SMP form of [`add_assign`](Self::add_assign).
    pub fn smp_add_assign<T, L, R>(&self, dst: &mut Mat<T>, expr: &SparseDenseProduct<'_, T, L, R>) -> Result<(), LaError>
    where
        T: Scalar,
        L: SparseOperand<T>,
        R: DenseOperand<T>,
    {
        check_target(dst, expr)?;
        expr.smp_add_assign_to(dst, self);
        Ok(())
    }

    /// SMP form of [`sub_assign`](Self::sub_assign).
    pub fn smp_sub_assign<T, L, R>(&self, dst: &mut Mat<T>, expr: &SparseDenseProduct<'_, T, L, R>) -> Result<(), LaError>
    where
        T: Scalar,
        L: SparseOperand<T>,
        R: DenseOperand<T>,
    {
        check_target(dst, expr)?;
        expr.smp_sub_assign_to(dst, self);
        Ok(())
    }

    /// SMP form of [`schur_assign`](Self::schur_assign).
    pub fn smp_schur_assign<T, L, R>(&self, dst: &mut Mat<T>, expr: &SparseDenseProduct<'_, T, L, R>) -> Result<(), LaError>
    where
        T: Scalar,
        L: SparseOperand<T>,
        R: DenseOperand<T>,
    {
        check_target(dst, expr)?;
        expr.smp_schur_assign_to(dst, self);
        Ok(())
    }

    /// `dst = lhs * dst`, snapshotting `dst` when the product would read it while writing.
    pub fn assign_product_in_place<T, L>(&self, lhs: &L, dst: &mut Mat<T>) -> Result<(), LaError>
    where
        T: Scalar,
        L: SparseOperand<T>,
    {
        crate::expr::assign_product_in_place(lhs, dst, self)
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}

fn check_target<T, L, R>(dst: &Mat<T>, expr: &SparseDenseProduct<'_, T, L, R>) -> Result<(), LaError>
where
    T: Scalar,
    L: SparseOperand<T>,
    R: DenseOperand<T>,
{
    if dst.nrows() != expr.nrows() || dst.ncols() != expr.ncols() {
        return Err(LaError::SizeMismatch {
            lhs_rows: dst.nrows(),
            lhs_cols: dst.ncols(),
            rhs_rows: expr.nrows(),
            rhs_cols: expr.ncols(),
        });
    }
    Ok(())
}
