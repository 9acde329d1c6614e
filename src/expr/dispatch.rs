//! Assignment of a [`SparseDenseProduct`] into a dense destination.
//!
//! Every assignment picks an [`AssignStrategy`] once, before touching the
//! destination:
//!
//! * `Restructure` when the dense operand is symmetric: `A * B` is computed as
//!   `A * Bᵀ`, keeping the declared flags.
//! * `Direct(Optimized)` when the optimized kernels are enabled, the dense
//!   operand is not diagonal and the element type is fixed width.
//! * `Direct(Default)` otherwise.
//!
//! Serial assignments evaluate computation operands serially and run the
//! blocked kernels of [`kernels`](super::kernels). SMP assignments evaluate
//! operands without forcing a mode and hand an element function to the
//! context's [`Executor`]; they fall back to the serial path when disabled,
//! below the size threshold, or for a diagonal dense operand.

use faer::Mat;
use log::{debug, trace};

use crate::config::EvalOptions;
use crate::context::{EvalContext, Mode};
use crate::core::structure::Decl;
use crate::core::traits::{DenseOperand, MatShape, MatrixGet, Operand, Scalar, SparseOperand};
use crate::core::wrappers::{mat_addr, snapshot_dense, snapshot_sparse};
use crate::error::LaError;
use crate::expr::kernels::{self, Accumulate, AddTo, SubFrom};
use crate::expr::smat_dmat::SparseDenseProduct;
use crate::parallel::Executor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelVariant {
    /// Column-blocked reference kernel.
    Default,
    /// Column-blocked kernel consuming non-zeros in groups of four.
    Optimized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignStrategy {
    /// Evaluate as `decl(A * Bᵀ)`, valid because `B` is symmetric.
    Restructure,
    Direct(KernelVariant),
}

/// Direct kernel for a non-symmetric dense operand.
fn kernel_variant(optimized: bool, rhs_diagonal: bool, fixed_width: bool) -> KernelVariant {
    if optimized && !rhs_diagonal && fixed_width {
        KernelVariant::Optimized
    } else {
        KernelVariant::Default
    }
}

/// Apply the declared region to an element function: mirror symmetric and
/// Hermitian products, zero outside a declared triangle.
#[inline]
fn declared<T: Scalar>(decl: Decl, i: usize, j: usize, f: impl Fn(usize, usize) -> T) -> T {
    if decl.sym() || decl.herm() {
        if i < j {
            let v = f(j, i);
            return if decl.herm() { v.conj() } else { v };
        }
        return f(i, j);
    }
    if (decl.low() && i < j) || (decl.upp() && i > j) {
        return T::zero();
    }
    f(i, j)
}

/// Zero outside the triangle an update is restricted to.
#[inline]
fn declared_update<T: Scalar>(decl: Decl, i: usize, j: usize, f: impl Fn(usize, usize) -> T) -> T {
    if (decl.low() && i < j) || (decl.upp() && i > j) {
        return T::zero();
    }
    f(i, j)
}

impl<T, L, R> SparseDenseProduct<'_, T, L, R>
where
    T: Scalar,
    L: SparseOperand<T>,
    R: DenseOperand<T>,
{
    /// Evaluation strategy for this product under `options`.
    pub fn select_strategy(&self, options: &EvalOptions) -> AssignStrategy {
        let rs = self.rhs.structure();
        if rs.is_symmetric() {
            AssignStrategy::Restructure
        } else {
            AssignStrategy::Direct(kernel_variant(options.optimized_kernels, rs.is_diagonal(), T::FIXED_WIDTH))
        }
    }

    /// `dst = self`, serially. `dst` must already have the product's shape.
    pub(crate) fn assign_to(&self, dst: &mut Mat<T>, ctx: &EvalContext) {
        debug_assert_eq!(dst.nrows(), self.nrows(), "Invalid number of rows");
        debug_assert_eq!(dst.ncols(), self.ncols(), "Invalid number of columns");
        let strategy = self.select_strategy(&ctx.options);
        debug!("assign {}x{} sparse*dense product via {:?}", self.nrows(), self.ncols(), strategy);

        let a = snapshot_sparse(&*self.lhs, ctx, Mode::Serial);
        let b = snapshot_dense(&*self.rhs, ctx, Mode::Serial);
        let (bs, decl) = (self.rhs.structure(), self.decl());
        match strategy {
            AssignStrategy::Restructure => kernels::restructured_assign(dst, &a, &b, decl),
            AssignStrategy::Direct(KernelVariant::Default) => kernels::default_assign(dst, &a, &b, bs, decl),
            AssignStrategy::Direct(KernelVariant::Optimized) => kernels::optimized_assign(dst, &a, &b, bs, decl),
        }
    }

    fn update_to<A: Accumulate>(&self, dst: &mut Mat<T>, ctx: &EvalContext) {
        debug_assert_eq!(dst.nrows(), self.nrows(), "Invalid number of rows");
        debug_assert_eq!(dst.ncols(), self.ncols(), "Invalid number of columns");
        let strategy = self.select_strategy(&ctx.options);
        debug!(
            "update {}x{} with sparse*dense product via {:?}",
            self.nrows(),
            self.ncols(),
            strategy
        );

        let a = snapshot_sparse(&*self.lhs, ctx, Mode::Serial);
        let b = snapshot_dense(&*self.rhs, ctx, Mode::Serial);
        let (bs, decl) = (self.rhs.structure(), self.decl());
        match strategy {
            AssignStrategy::Restructure => kernels::restructured_update::<T, _, A>(dst, &a, &b, decl),
            AssignStrategy::Direct(KernelVariant::Default) => {
                kernels::default_update::<T, _, A>(dst, &a, &b, bs, decl)
            }
            AssignStrategy::Direct(KernelVariant::Optimized) => {
                kernels::optimized_update::<T, _, A>(dst, &a, &b, bs, decl)
            }
        }
    }

    /// `dst += self`
    pub(crate) fn add_assign_to(&self, dst: &mut Mat<T>, ctx: &EvalContext) {
        self.update_to::<AddTo>(dst, ctx);
    }

    /// `dst -= self`
    pub(crate) fn sub_assign_to(&self, dst: &mut Mat<T>, ctx: &EvalContext) {
        self.update_to::<SubFrom>(dst, ctx);
    }

    /// `dst = dst ∘ self`, through a materialized product.
    pub(crate) fn schur_assign_to(&self, dst: &mut Mat<T>, ctx: &EvalContext) {
        let tmp = self.eval(ctx, Mode::Serial);
        for j in 0..dst.ncols() {
            for i in 0..dst.nrows() {
                dst[(i, j)] *= tmp[(i, j)];
            }
        }
    }

    /// SMP form of `assign_to`.
    pub(crate) fn smp_assign_to(&self, dst: &mut Mat<T>, ctx: &EvalContext) {
        if !self.can_smp_assign(&ctx.options) {
            trace!("SMP assignment not applicable, assigning serially");
            return self.assign_to(dst, ctx);
        }
        let strategy = self.select_strategy(&ctx.options);
        debug!(
            "SMP assign {}x{} sparse*dense product on {} workers ({:?})",
            self.nrows(),
            self.ncols(),
            ctx.backend.size(),
            strategy
        );

        let a = snapshot_sparse(&*self.lhs, ctx, Mode::Smp);
        let b = snapshot_dense(&*self.rhs, ctx, Mode::Smp);
        let (a, b, decl) = (&*a, &b, self.decl());
        let inner = a.ncols();
        if strategy == AssignStrategy::Restructure {
            ctx.backend.fill(dst, |i, j| {
                declared(decl, i, j, |i, j| a.row_dot(i, 0, inner, |k| b.get(j, k)))
            });
        } else {
            ctx.backend.fill(dst, |i, j| {
                declared(decl, i, j, |i, j| a.row_dot(i, 0, inner, |k| b.get(k, j)))
            });
        }
        ctx.backend.barrier();
    }

    fn smp_update_to<A: Accumulate>(&self, dst: &mut Mat<T>, ctx: &EvalContext) {
        if !self.can_smp_assign(&ctx.options) {
            trace!("SMP update not applicable, updating serially");
            return self.update_to::<A>(dst, ctx);
        }
        let strategy = self.select_strategy(&ctx.options);
        debug!(
            "SMP update {}x{} with sparse*dense product on {} workers ({:?})",
            self.nrows(),
            self.ncols(),
            ctx.backend.size(),
            strategy
        );

        let a = snapshot_sparse(&*self.lhs, ctx, Mode::Smp);
        let b = snapshot_dense(&*self.rhs, ctx, Mode::Smp);
        let (a, b, decl) = (&*a, &b, self.decl());
        let inner = a.ncols();
        let combine = |c: T, v: T| {
            let mut c = c;
            A::apply(&mut c, v);
            c
        };
        if strategy == AssignStrategy::Restructure {
            ctx.backend.update(
                dst,
                |i, j| declared_update(decl, i, j, |i, j| a.row_dot(i, 0, inner, |k| b.get(j, k))),
                combine,
            );
        } else {
            ctx.backend.update(
                dst,
                |i, j| declared_update(decl, i, j, |i, j| a.row_dot(i, 0, inner, |k| b.get(k, j))),
                combine,
            );
        }
        ctx.backend.barrier();
    }

    /// SMP form of `add_assign_to`.
    pub(crate) fn smp_add_assign_to(&self, dst: &mut Mat<T>, ctx: &EvalContext) {
        self.smp_update_to::<AddTo>(dst, ctx);
    }

    /// SMP form of `sub_assign_to`.
    pub(crate) fn smp_sub_assign_to(&self, dst: &mut Mat<T>, ctx: &EvalContext) {
        self.smp_update_to::<SubFrom>(dst, ctx);
    }

    /// SMP form of `schur_assign_to`: the product is materialized with an
    /// unforced evaluation, then combined element-wise on the executor.
    pub(crate) fn smp_schur_assign_to(&self, dst: &mut Mat<T>, ctx: &EvalContext) {
        if !self.can_smp_assign(&ctx.options) {
            return self.schur_assign_to(dst, ctx);
        }
        let tmp = self.eval(ctx, Mode::Smp);
        let tmp = &tmp;
        ctx.backend.update(dst, |i, j| tmp[(i, j)], |c, v| c * v);
        ctx.backend.barrier();
    }
}

/// `dst = lhs * dst`.
///
/// The destination is the dense operand of its own product, so it is
/// snapshotted before the kernel writes into it.
pub fn assign_product_in_place<T, L>(lhs: &L, dst: &mut Mat<T>, ctx: &EvalContext) -> Result<(), LaError>
where
    T: Scalar,
    L: SparseOperand<T>,
{
    if lhs.ncols() != dst.nrows() || lhs.nrows() != dst.nrows() {
        return Err(LaError::SizeMismatch {
            lhs_rows: lhs.nrows(),
            lhs_cols: lhs.ncols(),
            rhs_rows: dst.nrows(),
            rhs_cols: dst.ncols(),
        });
    }
    let aliased = SparseDenseProduct::new(lhs, &*dst).is_aliased(mat_addr(dst));
    debug_assert!(aliased, "product over the destination must report aliasing");
    trace!("snapshotting aliased {}x{} destination", dst.nrows(), dst.ncols());

    let snapshot = dst.clone();
    let expr = SparseDenseProduct::new(lhs, &snapshot);
    debug_assert!(!expr.is_aliased(mat_addr(dst)));
    expr.assign_to(dst, ctx);
    Ok(())
}
