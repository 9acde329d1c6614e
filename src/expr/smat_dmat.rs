//! Sparse (row-major) times dense (column-major) product expression.
//!
//! A [`SparseDenseProduct`] is a lazily evaluated `A * B`. It holds its
//! operands per their [`OperandKind`](crate::core::traits::OperandKind)
//! (leaves by reference, views and computations by value), carries the flags
//! declared through the `decl_*` operations, and resolves once, at
//! construction, both its [`Structure`] and the element-access plan used by
//! [`element`](SparseDenseProduct::element).
//!
//! Assignment to a destination lives in [`dispatch`](super::dispatch).

use std::marker::PhantomData;
use std::ops::Mul;

use faer::Mat;

use crate::config::EvalOptions;
use crate::context::{EvalContext, Mode};
use crate::core::structure::{propagate, Decl, Structure};
use crate::core::traits::{DenseOperand, MatShape, MatrixGet, Operand, OperandKind, Scalar, SparseOperand};
use crate::core::wrappers::Held;
use crate::error::LaError;
use crate::matrix::sparse::{CsrMatrix, ScaledSparse};

/// How a single element of the product is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementAccess {
    /// `A` is diagonal: `A(i,i) * B(i,j)`.
    LeftDiagonal,
    /// `B` is diagonal: `A(i,j) * B(j,j)`.
    RightDiagonal,
    /// Either operand is triangular: dot product over the intersected index range.
    Restricted,
    /// Full dot product.
    General,
}

impl ElementAccess {
    fn select(lhs: Structure, rhs: Structure) -> Self {
        if lhs.is_diagonal() {
            ElementAccess::LeftDiagonal
        } else if rhs.is_diagonal() {
            ElementAccess::RightDiagonal
        } else if lhs.is_triangular() || rhs.is_triangular() {
            ElementAccess::Restricted
        } else {
            ElementAccess::General
        }
    }
}

/// Lazily evaluated `A * B` with `A` sparse row-major and `B` dense column-major.
#[derive(Debug, Clone)]
pub struct SparseDenseProduct<'a, T, L, R> {
    pub(crate) lhs: Held<'a, L>,
    pub(crate) rhs: Held<'a, R>,
    decl: Decl,
    structure: Structure,
    access: ElementAccess,
    _elem: PhantomData<T>,
}

/// `lhs * rhs`, failing with [`LaError::SizeMismatch`] on incompatible shapes.
pub fn mul<'a, T, L, R>(lhs: &'a L, rhs: &'a R) -> Result<SparseDenseProduct<'a, T, L, R>, LaError>
where
    T: Scalar,
    L: SparseOperand<T>,
    R: DenseOperand<T>,
{
    SparseDenseProduct::try_new(lhs, rhs)
}

impl<'a, T, L, R> SparseDenseProduct<'a, T, L, R>
where
    T: Scalar,
    L: SparseOperand<T>,
    R: DenseOperand<T>,
{
    /// Build the product. The inner dimensions must agree.
    pub fn new(lhs: &'a L, rhs: &'a R) -> Self {
        assert_eq!(lhs.ncols(), rhs.nrows(), "Invalid matrix sizes");
        let (ls, rs) = (lhs.structure(), rhs.structure());
        Self {
            lhs: Held::of(lhs),
            rhs: Held::of(rhs),
            decl: Decl::empty(),
            structure: propagate(Decl::empty(), ls, rs, T::IS_REAL),
            access: ElementAccess::select(ls, rs),
            _elem: PhantomData,
        }
    }

    pub fn try_new(lhs: &'a L, rhs: &'a R) -> Result<Self, LaError> {
        if lhs.ncols() != rhs.nrows() {
            return Err(LaError::SizeMismatch {
                lhs_rows: lhs.nrows(),
                lhs_cols: lhs.ncols(),
                rhs_rows: rhs.nrows(),
                rhs_cols: rhs.ncols(),
            });
        }
        Ok(Self::new(lhs, rhs))
    }

    pub fn nrows(&self) -> usize {
        self.lhs.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.rhs.ncols()
    }

    pub fn left_operand(&self) -> &L {
        &self.lhs
    }

    pub fn right_operand(&self) -> &R {
        &self.rhs
    }

    /// Flags declared on this expression.
    pub fn decl(&self) -> Decl {
        self.decl
    }

    /// Structure of the product, combining operand structure and declared flags.
    pub fn structure(&self) -> Structure {
        self.structure
    }

    pub fn element_access(&self) -> ElementAccess {
        self.access
    }

    /// Element `(i, j)` of the product.
    ///
    /// Indices are only checked in debug builds; out-of-range indices panic in
    /// the underlying storage in release builds. Use [`at`](Self::at) for a
    /// checked read.
    pub fn element(&self, i: usize, j: usize) -> T {
        debug_assert!(i < self.nrows(), "Invalid row access index");
        debug_assert!(j < self.ncols(), "Invalid column access index");
        let (lhs, rhs) = (&*self.lhs, &*self.rhs);
        match self.access {
            ElementAccess::LeftDiagonal => lhs.get(i, i) * rhs.get(i, j),
            ElementAccess::RightDiagonal => lhs.get(i, j) * rhs.get(j, j),
            ElementAccess::Restricted => {
                let (begin, end) = self.restricted_range(i, j);
                if begin >= end {
                    T::zero()
                } else {
                    lhs.row_dot(i, begin, end, |k| rhs.get(k, j))
                }
            }
            ElementAccess::General => lhs.row_dot(i, 0, lhs.ncols(), |k| rhs.get(k, j)),
        }
    }

    /// Range of the inner index where both `A(i, k)` and `B(k, j)` may be non-zero.
    fn restricted_range(&self, i: usize, j: usize) -> (usize, usize) {
        let (ls, rs) = (self.lhs.structure(), self.rhs.structure());
        let inner = self.lhs.ncols();
        let mut begin = 0;
        let mut end = inner;
        if ls.is_upper() {
            begin = begin.max(if ls.is_strictly_upper() { i + 1 } else { i });
        }
        if rs.is_lower() {
            begin = begin.max(if rs.is_strictly_lower() { j + 1 } else { j });
        }
        if ls.is_lower() {
            end = end.min(if ls.is_strictly_lower() { i } else { i + 1 });
        }
        if rs.is_upper() {
            end = end.min(if rs.is_strictly_upper() { j } else { j + 1 });
        }
        (begin, end)
    }

    /// Checked element read.
    pub fn at(&self, i: usize, j: usize) -> Result<T, LaError> {
        let (rows, cols) = (self.nrows(), self.ncols());
        if i >= rows || j >= cols {
            return Err(LaError::OutOfRange { row: i, col: j, rows, cols });
        }
        Ok(self.element(i, j))
    }

    /// Whether the expression may read storage starting at `addr`.
    pub fn can_alias(&self, addr: *const ()) -> bool {
        self.lhs.is_aliased(addr) || self.rhs.is_aliased(addr)
    }

    pub fn is_aliased(&self, addr: *const ()) -> bool {
        self.lhs.is_aliased(addr) || self.rhs.is_aliased(addr)
    }

    /// Both operands can be read in place from several threads.
    pub fn smp_assignable(&self) -> bool {
        !self.lhs.requires_evaluation()
            && self.lhs.smp_assignable()
            && !self.rhs.requires_evaluation()
            && self.rhs.smp_assignable()
    }

    /// Whether an SMP assignment is worth it under `options`.
    pub fn can_smp_assign(&self, options: &EvalOptions) -> bool {
        options.smp_enabled
            && self.nrows() * self.ncols() >= options.smp_threshold
            && !self.rhs.structure().is_diagonal()
    }

    fn redeclare(mut self, flag: Decl, kind: &'static str) -> Result<Self, LaError> {
        if self.nrows() != self.ncols() {
            return Err(LaError::NotSquare { kind, rows: self.nrows(), cols: self.ncols() });
        }
        self.decl |= flag;
        self.structure = propagate(self.decl, self.lhs.structure(), self.rhs.structure(), T::IS_REAL);
        Ok(self)
    }

    /// Declare the product symmetric: only one triangle is computed and mirrored.
    pub fn decl_sym(self) -> Result<Self, LaError> {
        self.redeclare(Decl::SYM, "symmetric")
    }

    /// Declare the product Hermitian: one triangle is computed and mirrored with conjugation.
    pub fn decl_herm(self) -> Result<Self, LaError> {
        self.redeclare(Decl::HERM, "Hermitian")
    }

    /// Declare the product lower triangular; the strict upper part is written as zero.
    pub fn decl_low(self) -> Result<Self, LaError> {
        self.redeclare(Decl::LOW, "lower")
    }

    pub fn decl_upp(self) -> Result<Self, LaError> {
        self.redeclare(Decl::UPP, "upper")
    }

    pub fn decl_diag(self) -> Result<Self, LaError> {
        self.redeclare(Decl::DIAG, "diagonal")
    }

    /// Evaluate into a fresh dense matrix.
    pub fn eval(&self, ctx: &EvalContext, mode: Mode) -> Mat<T> {
        let mut out = Mat::from_fn(self.nrows(), self.ncols(), |_, _| T::zero());
        match mode {
            Mode::Serial => self.assign_to(&mut out, ctx),
            Mode::Smp => self.smp_assign_to(&mut out, ctx),
        }
        out
    }

    /// Evaluate into compressed row storage, keeping the product's structure.
    pub fn eval_sparse(&self, ctx: &EvalContext) -> CsrMatrix<T> {
        let dense = self.eval(ctx, Mode::Serial);
        CsrMatrix::from_dense(&dense).with_structure_unchecked(self.structure)
    }
}

impl<T, L, R> MatShape for SparseDenseProduct<'_, T, L, R>
where
    T: Scalar,
    L: SparseOperand<T>,
    R: DenseOperand<T>,
{
    fn nrows(&self) -> usize {
        self.lhs.nrows()
    }
    fn ncols(&self) -> usize {
        self.rhs.ncols()
    }
}

impl<T, L, R> MatrixGet<T> for SparseDenseProduct<'_, T, L, R>
where
    T: Scalar,
    L: SparseOperand<T>,
    R: DenseOperand<T>,
{
    fn get(&self, i: usize, j: usize) -> T {
        self.element(i, j)
    }
}

impl<T, L, R> Operand for SparseDenseProduct<'_, T, L, R>
where
    T: Scalar,
    L: SparseOperand<T>,
    R: DenseOperand<T>,
{
    fn kind(&self) -> OperandKind {
        OperandKind::Computation
    }
    fn structure(&self) -> Structure {
        self.structure
    }
    fn is_aliased(&self, addr: *const ()) -> bool {
        SparseDenseProduct::is_aliased(self, addr)
    }
}

/// A product nested inside another product is evaluated into a snapshot first.
impl<T, L, R> DenseOperand<T> for SparseDenseProduct<'_, T, L, R>
where
    T: Scalar,
    L: SparseOperand<T>,
    R: DenseOperand<T>,
{
    fn evaluate(&self, ctx: &EvalContext, mode: Mode) -> Mat<T> {
        self.eval(ctx, mode)
    }
    fn smp_assignable(&self) -> bool {
        false
    }
}

impl<'a, T, R> Mul<&'a R> for &'a CsrMatrix<T>
where
    T: Scalar,
    R: DenseOperand<T>,
{
    type Output = Result<SparseDenseProduct<'a, T, CsrMatrix<T>, R>, LaError>;

    fn mul(self, rhs: &'a R) -> Self::Output {
        SparseDenseProduct::try_new(self, rhs)
    }
}

impl<'a, 's, T, R> Mul<&'a R> for &'a ScaledSparse<'s, T>
where
    T: Scalar,
    R: DenseOperand<T>,
{
    type Output = Result<SparseDenseProduct<'a, T, ScaledSparse<'s, T>, R>, LaError>;

    fn mul(self, rhs: &'a R) -> Self::Output {
        SparseDenseProduct::try_new(self, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::wrappers::trans;
    use crate::matrix::DenseMatrix;

    fn golden() -> (CsrMatrix<f64>, Mat<f64>) {
        let a = CsrMatrix::from_triplets(3, 4, &[(0, 0, 2.0), (1, 2, 3.0), (2, 3, 1.0)]).unwrap();
        let b = Mat::from_fn(4, 2, |i, j| (i + 1 + 4 * j) as f64);
        (a, b)
    }

    #[test]
    fn shape_and_elements() {
        let (a, b) = golden();
        let p = (&a * &b).unwrap();
        assert_eq!((p.nrows(), p.ncols()), (3, 2));
        assert_eq!(p.element_access(), ElementAccess::General);
        assert_eq!(p.element(0, 0), 2.0);
        assert_eq!(p.element(1, 1), 21.0);
        assert_eq!(p.at(2, 1), Ok(8.0));
        assert!(matches!(p.at(3, 0), Err(LaError::OutOfRange { .. })));
        assert!(!p.at(0, 2).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn mismatched_inner_dimension() {
        let (a, _) = golden();
        let b = Mat::from_fn(3, 2, |_, _| 1.0);
        let err = mul(&a, &b).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(
            err,
            LaError::SizeMismatch { lhs_rows: 3, lhs_cols: 4, rhs_rows: 3, rhs_cols: 2 }
        );
    }

    #[test]
    fn leaves_are_borrowed() {
        let (a, b) = golden();
        let p = mul(&a, &b).unwrap();
        assert!(p.lhs.is_borrowed() && p.rhs.is_borrowed());
        assert!(p.is_aliased(crate::core::wrappers::mat_addr(&b)));
        assert!(p.smp_assignable());
        let s = a.scaled(2.0);
        let q = (&s * &b).unwrap();
        assert!(!q.lhs.is_borrowed());
        assert!(!q.smp_assignable());
        assert_eq!(q.element(1, 1), 42.0);
    }

    #[test]
    fn decl_requires_square() {
        let (a, b) = golden();
        let p = mul(&a, &b).unwrap();
        assert_eq!(
            p.clone().decl_sym().unwrap_err(),
            LaError::NotSquare { kind: "symmetric", rows: 3, cols: 2 }
        );
        assert!(p.clone().decl_herm().is_err());
        assert!(p.clone().decl_low().is_err());
        assert!(p.clone().decl_upp().is_err());
        assert!(p.decl_diag().is_err());
    }

    #[test]
    fn decl_updates_structure() {
        let a = CsrMatrix::from_triplets(3, 3, &[(0, 0, 1.0), (1, 0, 2.0), (2, 2, 3.0)]).unwrap();
        let b = Mat::from_fn(3, 3, |i, j| (i * j) as f64);
        let p = mul(&a, &b).unwrap().decl_low().unwrap();
        assert_eq!(p.decl(), Decl::LOW);
        assert!(p.structure().is_lower() && !p.structure().is_upper());
        let d = mul(&a, &b).unwrap().decl_diag().unwrap();
        assert!(d.structure().is_diagonal() && d.structure().is_symmetric());
    }

    #[test]
    fn diagonal_tiers() {
        let d = CsrMatrix::from_triplets(3, 3, &[(0, 0, 2.0), (1, 1, 3.0), (2, 2, 4.0)])
            .unwrap()
            .with_structure(Structure::DIAGONAL)
            .unwrap();
        let b = Mat::from_fn(3, 3, |i, j| (1 + i + 3 * j) as f64);
        let p = mul(&d, &b).unwrap();
        assert_eq!(p.element_access(), ElementAccess::LeftDiagonal);
        assert_eq!(p.element(1, 2), 3.0 * b[(1, 2)]);

        let a = CsrMatrix::from_dense(&Mat::from_fn(3, 3, |i, j| (i + j) as f64 + 1.0));
        let db = DenseMatrix::from_fn(3, 3, |i, j| if i == j { 5.0 } else { 0.0 })
            .with_structure(Structure::DIAGONAL)
            .unwrap();
        let q = mul(&a, &db).unwrap();
        assert_eq!(q.element_access(), ElementAccess::RightDiagonal);
        assert_eq!(q.element(2, 0), a.get(2, 0) * 5.0);
    }

    #[test]
    fn restricted_range_matches_full_dot() {
        let l = CsrMatrix::from_dense(&Mat::from_fn(4, 4, |i, j| if i > j { (i + j) as f64 } else { 0.0 }))
            .with_structure(Structure::STRICTLY_LOWER)
            .unwrap();
        let u = DenseMatrix::from_fn(4, 4, |i, j| if i <= j { 1.0 + (i * j) as f64 } else { 0.0 })
            .with_structure(Structure::UPPER)
            .unwrap();
        let p = mul(&l, &u).unwrap();
        assert_eq!(p.element_access(), ElementAccess::Restricted);
        for i in 0..4 {
            for j in 0..4 {
                let full: f64 = (0..4).map(|k| l.get(i, k) * u.get(k, j)).sum();
                assert_eq!(p.element(i, j), full);
            }
        }
    }

    #[test]
    fn transposed_operand_structure() {
        let u = DenseMatrix::from_fn(3, 3, |i, j| if i <= j { 1.0 } else { 0.0 })
            .with_structure(Structure::UPPER)
            .unwrap();
        let l = CsrMatrix::from_dense(&Mat::from_fn(3, 3, |i, j| if i >= j { 2.0 } else { 0.0 }))
            .with_structure(Structure::LOWER)
            .unwrap();
        let t = trans(&u);
        let p = mul(&l, &t).unwrap();
        assert!(p.structure().is_lower());
        assert_eq!(p.element(2, 1), 4.0);
    }
}
