//! Serial evaluation kernels for `C (=, +=, -=) A * B`, `A` in compressed row
//! storage and `B` column-major dense.
//!
//! The direct kernels walk the output in column blocks of 4, then 2, then 1,
//! so every pass over a sparse row feeds several output columns. Inside a
//! block only the rows allowed by the declared flags are computed, and each
//! sparse row is narrowed to the index range where the triangular structure of
//! `B` can contribute.
//!
//! The restructured kernels compute `A * Bᵀ` row by row. They are used when
//! `B` is symmetric, where `A * Bᵀ == A * B` and `B(j, k)` is read down a
//! contiguous column.

use std::ops::Range;

use faer::Mat;

use crate::core::structure::{Decl, Structure};
use crate::core::traits::{MatrixGet, Scalar};
use crate::matrix::sparse::{CsrMatrix, SparseRow};

/// How a computed term is combined into the destination.
pub trait Accumulate {
    fn apply<T: Scalar>(c: &mut T, v: T);
}

/// `c += v`
#[derive(Debug, Clone, Copy)]
pub struct AddTo;

/// `c -= v`
#[derive(Debug, Clone, Copy)]
pub struct SubFrom;

impl Accumulate for AddTo {
    #[inline]
    fn apply<T: Scalar>(c: &mut T, v: T) {
        *c += v;
    }
}

impl Accumulate for SubFrom {
    #[inline]
    fn apply<T: Scalar>(c: &mut T, v: T) {
        *c -= v;
    }
}

/// Output rows computed for the column block `[j, j + w)`.
#[inline]
fn block_rows(from_block: bool, to_block: bool, j: usize, w: usize, m: usize) -> Range<usize> {
    let lo = if from_block { j } else { 0 };
    let hi = if to_block { (j + w).min(m) } else { m };
    lo..hi
}

/// Positions of `row` that can meet a non-zero of `B` in columns `j..=jl`.
#[inline]
fn nz_range<T: Copy>(row: &SparseRow<'_, T>, bs: Structure, j: usize, jl: usize) -> (usize, usize) {
    let end = if bs.is_upper() {
        if bs.is_strictly_upper() { row.lower_bound(jl) } else { row.upper_bound(jl) }
    } else {
        row.len()
    };
    let begin = if bs.is_lower() {
        if bs.is_strictly_lower() { row.upper_bound(j) } else { row.lower_bound(j) }
    } else {
        0
    };
    (begin, end.max(begin))
}

/// Mirror or clear the part of `C` the declared flags leave uncomputed.
pub fn finalize<T: Scalar>(c: &mut Mat<T>, decl: Decl) {
    let (m, n) = (c.nrows(), c.ncols());
    if decl.sym() || decl.herm() {
        let herm = decl.herm();
        for j in 1..n {
            for i in 0..j {
                let v = c[(j, i)];
                c[(i, j)] = if herm { v.conj() } else { v };
            }
        }
    } else if decl.low() || decl.upp() {
        let (low, upp) = (decl.low(), decl.upp());
        for j in 0..n {
            for i in 0..m {
                if (low && i < j) || (upp && i > j) {
                    c[(i, j)] = T::zero();
                }
            }
        }
    }
}

fn default_assign_block<T, B, const W: usize>(
    c: &mut Mat<T>,
    a: &CsrMatrix<T>,
    b: &B,
    bs: Structure,
    decl: Decl,
    j: usize,
) where
    T: Scalar,
    B: MatrixGet<T>,
{
    let rows = block_rows(decl.sym() || decl.herm() || decl.low(), decl.upp(), j, W, a.nrows());
    for i in rows {
        let row = a.row(i);
        let (begin, end) = nz_range(&row, bs, j, j + W - 1);
        if begin == end {
            for w in 0..W {
                c[(i, j + w)] = T::zero();
            }
            continue;
        }
        let idx = &row.indices()[begin..end];
        let val = &row.values()[begin..end];
        for w in 0..W {
            c[(i, j + w)] = val[0] * b.get(idx[0], j + w);
        }
        for (&k, &v) in idx[1..].iter().zip(&val[1..]) {
            for w in 0..W {
                c[(i, j + w)] += v * b.get(k, j + w);
            }
        }
    }
}

/// Reference kernel for `C = A * B`. Every computed element is overwritten,
/// so `C` need not be zeroed beforehand.
pub fn default_assign<T, B>(c: &mut Mat<T>, a: &CsrMatrix<T>, b: &B, bs: Structure, decl: Decl)
where
    T: Scalar,
    B: MatrixGet<T>,
{
    let (m, n) = (c.nrows(), c.ncols());
    debug_assert!(!decl.restricts() || m == n, "Broken invariant detected");
    let mut j = 0;
    while j + 4 <= n {
        default_assign_block::<T, B, 4>(c, a, b, bs, decl, j);
        j += 4;
    }
    while j + 2 <= n {
        default_assign_block::<T, B, 2>(c, a, b, bs, decl, j);
        j += 2;
    }
    while j < n {
        default_assign_block::<T, B, 1>(c, a, b, bs, decl, j);
        j += 1;
    }
    finalize(c, decl);
}

/// Sum of one group of four non-zeros against column `col` of `B`.
#[inline]
fn group4<T: Scalar, B: MatrixGet<T>>(idx: &[usize], val: &[T], b: &B, col: usize) -> T {
    val[0] * b.get(idx[0], col)
        + val[1] * b.get(idx[1], col)
        + val[2] * b.get(idx[2], col)
        + val[3] * b.get(idx[3], col)
}

fn optimized_block<T, B, A, const W: usize>(
    c: &mut Mat<T>,
    a: &CsrMatrix<T>,
    b: &B,
    bs: Structure,
    rows: Range<usize>,
    j: usize,
) where
    T: Scalar,
    B: MatrixGet<T>,
    A: Accumulate,
{
    for i in rows {
        let row = a.row(i);
        let (begin, end) = nz_range(&row, bs, j, j + W - 1);
        let idx = &row.indices()[begin..end];
        let val = &row.values()[begin..end];

        let groups = idx.chunks_exact(4).zip(val.chunks_exact(4));
        for (gi, gv) in groups {
            debug_assert!(
                gi[0] < gi[1] && gi[1] < gi[2] && gi[2] < gi[3],
                "Invalid sparse matrix index detected"
            );
            for w in 0..W {
                A::apply(&mut c[(i, j + w)], group4(gi, gv, b, j + w));
            }
        }

        let tail = idx.len() - idx.len() % 4;
        for (&k, &v) in idx[tail..].iter().zip(&val[tail..]) {
            for w in 0..W {
                A::apply(&mut c[(i, j + w)], v * b.get(k, j + w));
            }
        }
    }
}

fn optimized_sweep<T, B, A>(c: &mut Mat<T>, a: &CsrMatrix<T>, b: &B, bs: Structure, from_block: bool, to_block: bool)
where
    T: Scalar,
    B: MatrixGet<T>,
    A: Accumulate,
{
    let (m, n) = (c.nrows(), c.ncols());
    let mut j = 0;
    while j + 4 <= n {
        optimized_block::<T, B, A, 4>(c, a, b, bs, block_rows(from_block, to_block, j, 4, m), j);
        j += 4;
    }
    while j + 2 <= n {
        optimized_block::<T, B, A, 2>(c, a, b, bs, block_rows(from_block, to_block, j, 2, m), j);
        j += 2;
    }
    while j < n {
        optimized_block::<T, B, A, 1>(c, a, b, bs, block_rows(from_block, to_block, j, 1, m), j);
        j += 1;
    }
}

/// Register-blocked kernel for `C = A * B`: zeroes `C`, then accumulates the
/// sparse rows in groups of four.
pub fn optimized_assign<T, B>(c: &mut Mat<T>, a: &CsrMatrix<T>, b: &B, bs: Structure, decl: Decl)
where
    T: Scalar,
    B: MatrixGet<T>,
{
    debug_assert!(!decl.restricts() || c.nrows() == c.ncols(), "Broken invariant detected");
    reset(c);
    optimized_sweep::<T, B, AddTo>(c, a, b, bs, decl.sym() || decl.herm() || decl.low(), decl.upp());
    finalize(c, decl);
}

/// Reference kernel for `C += A * B` / `C -= A * B`.
pub fn default_update<T, B, A>(c: &mut Mat<T>, a: &CsrMatrix<T>, b: &B, bs: Structure, decl: Decl)
where
    T: Scalar,
    B: MatrixGet<T>,
    A: Accumulate,
{
    let (m, n) = (c.nrows(), c.ncols());
    debug_assert!(!(decl.low() || decl.upp()) || m == n, "Broken invariant detected");
    let mut j = 0;
    let mut w = 4;
    while j < n {
        while j + w > n {
            w /= 2;
        }
        for i in block_rows(decl.low(), decl.upp(), j, w, m) {
            let row = a.row(i);
            let (begin, end) = nz_range(&row, bs, j, j + w - 1);
            for (&k, &v) in row.indices()[begin..end].iter().zip(&row.values()[begin..end]) {
                for jj in j..j + w {
                    A::apply(&mut c[(i, jj)], v * b.get(k, jj));
                }
            }
        }
        j += w;
    }
}

/// Register-blocked kernel for `C += A * B` / `C -= A * B`.
pub fn optimized_update<T, B, A>(c: &mut Mat<T>, a: &CsrMatrix<T>, b: &B, bs: Structure, decl: Decl)
where
    T: Scalar,
    B: MatrixGet<T>,
    A: Accumulate,
{
    debug_assert!(!(decl.low() || decl.upp()) || c.nrows() == c.ncols(), "Broken invariant detected");
    optimized_sweep::<T, B, A>(c, a, b, bs, decl.low(), decl.upp());
}

/// Columns of row `i` computed by the restructured kernels.
#[inline]
fn row_cols(to_diag: bool, from_diag: bool, i: usize, n: usize) -> Range<usize> {
    let lo = if from_diag { i } else { 0 };
    let hi = if to_diag { (i + 1).min(n) } else { n };
    lo..hi
}

/// `C = A * Bᵀ`, row by row.
pub fn restructured_assign<T, B>(c: &mut Mat<T>, a: &CsrMatrix<T>, b: &B, decl: Decl)
where
    T: Scalar,
    B: MatrixGet<T>,
{
    let n = c.ncols();
    reset(c);
    let to_diag = decl.sym() || decl.herm() || decl.low();
    for i in 0..a.nrows() {
        let cols = row_cols(to_diag, decl.upp(), i, n);
        for e in a.row(i).iter() {
            let (k, v) = (e.index(), e.value());
            for j in cols.clone() {
                c[(i, j)] += v * b.get(j, k);
            }
        }
    }
    finalize(c, decl);
}

/// `C += A * Bᵀ` / `C -= A * Bᵀ`, row by row.
pub fn restructured_update<T, B, A>(c: &mut Mat<T>, a: &CsrMatrix<T>, b: &B, decl: Decl)
where
    T: Scalar,
    B: MatrixGet<T>,
    A: Accumulate,
{
    let n = c.ncols();
    for i in 0..a.nrows() {
        let cols = row_cols(decl.low(), decl.upp(), i, n);
        for e in a.row(i).iter() {
            let (k, v) = (e.index(), e.value());
            for j in cols.clone() {
                A::apply(&mut c[(i, j)], v * b.get(j, k));
            }
        }
    }
}

pub fn reset<T: Scalar>(c: &mut Mat<T>) {
    for j in 0..c.ncols() {
        for i in 0..c.nrows() {
            c[(i, j)] = T::zero();
        }
    }
}
