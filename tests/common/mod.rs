//! Random operand generators and reference helpers shared by the integration tests.
//!
//! Every generator takes the RNG explicitly so that a failing case can be
//! replayed from its seed.

#![allow(dead_code)]

use approx::assert_abs_diff_eq;
use exprla::{CsrMatrix, DenseMatrix, MatShape, MatrixGet, Structure};
use faer::Mat;
use num_complex::Complex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

fn value(rng: &mut StdRng) -> f64 {
    rng.gen_range(-1.0..1.0)
}

/// Random sparse matrix whose entries are kept with probability `density`
/// among the positions accepted by `keep`.
pub fn sparse_where<F>(rng: &mut StdRng, m: usize, n: usize, density: f64, keep: F) -> CsrMatrix<f64>
where
    F: Fn(usize, usize) -> bool,
{
    let mut triplets = Vec::new();
    for i in 0..m {
        for j in 0..n {
            if keep(i, j) && rng.gen_bool(density) {
                let v = value(rng);
                if v != 0.0 {
                    triplets.push((i, j, v));
                }
            }
        }
    }
    CsrMatrix::from_triplets(m, n, &triplets).unwrap()
}

pub fn random_sparse(rng: &mut StdRng, m: usize, n: usize, density: f64) -> CsrMatrix<f64> {
    sparse_where(rng, m, n, density, |_, _| true)
}

/// Lower triangular sparse matrix, tagged with `structure`.
pub fn random_lower_sparse(rng: &mut StdRng, n: usize, density: f64, strict: bool) -> CsrMatrix<f64> {
    let a = sparse_where(rng, n, n, density, |i, j| if strict { i > j } else { i >= j });
    let s = if strict { Structure::STRICTLY_LOWER } else { Structure::LOWER };
    a.with_structure(s).unwrap()
}

pub fn random_upper_sparse(rng: &mut StdRng, n: usize, density: f64) -> CsrMatrix<f64> {
    sparse_where(rng, n, n, density, |i, j| i <= j)
        .with_structure(Structure::UPPER)
        .unwrap()
}

pub fn random_diagonal_sparse(rng: &mut StdRng, n: usize) -> CsrMatrix<f64> {
    let triplets: Vec<_> = (0..n).map(|i| (i, i, 1.0 + value(rng).abs())).collect();
    CsrMatrix::from_triplets(n, n, &triplets)
        .unwrap()
        .with_structure(Structure::DIAGONAL)
        .unwrap()
}

pub fn random_dense(rng: &mut StdRng, m: usize, n: usize) -> Mat<f64> {
    let vals: Vec<f64> = (0..m * n).map(|_| value(rng)).collect();
    Mat::from_fn(m, n, |i, j| vals[j * m + i])
}

/// Dense matrix zeroed outside the region accepted by `keep`, tagged with `structure`.
pub fn random_dense_where<F>(rng: &mut StdRng, n: usize, structure: Structure, keep: F) -> DenseMatrix<f64>
where
    F: Fn(usize, usize) -> bool,
{
    let full = random_dense(rng, n, n);
    DenseMatrix::from_fn(n, n, |i, j| if keep(i, j) { full[(i, j)] } else { 0.0 })
        .with_structure(structure)
        .unwrap()
}

pub fn random_symmetric_dense(rng: &mut StdRng, n: usize) -> DenseMatrix<f64> {
    let full = random_dense(rng, n, n);
    DenseMatrix::from_fn(n, n, |i, j| full[(i.max(j), i.min(j))])
        .with_structure(Structure::SYMMETRIC)
        .unwrap()
}

pub fn random_complex_sparse(rng: &mut StdRng, m: usize, n: usize, density: f64) -> CsrMatrix<Complex<f64>> {
    let mut triplets = Vec::new();
    for i in 0..m {
        for j in 0..n {
            if rng.gen_bool(density) {
                triplets.push((i, j, Complex::new(value(rng), value(rng))));
            }
        }
    }
    CsrMatrix::from_triplets(m, n, &triplets).unwrap()
}

/// Brute-force `A * B` through element reads only.
pub fn brute<T, A, B>(a: &A, b: &B) -> Mat<T>
where
    T: exprla::Scalar,
    A: MatShape + MatrixGet<T>,
    B: MatShape + MatrixGet<T>,
{
    Mat::from_fn(a.nrows(), b.ncols(), |i, j| {
        (0..a.ncols()).fold(T::zero(), |acc, k| acc + a.get(i, k) * b.get(k, j))
    })
}

pub fn assert_mat_close(actual: &Mat<f64>, expected: &Mat<f64>, eps: f64) {
    assert_eq!(actual.nrows(), expected.nrows());
    assert_eq!(actual.ncols(), expected.ncols());
    for j in 0..actual.ncols() {
        for i in 0..actual.nrows() {
            assert_abs_diff_eq!(actual[(i, j)], expected[(i, j)], epsilon = eps);
        }
    }
}

pub fn assert_cmat_close(actual: &Mat<Complex<f64>>, expected: &Mat<Complex<f64>>, eps: f64) {
    assert_eq!(actual.nrows(), expected.nrows());
    assert_eq!(actual.ncols(), expected.ncols());
    for j in 0..actual.ncols() {
        for i in 0..actual.nrows() {
            assert_abs_diff_eq!(actual[(i, j)].re, expected[(i, j)].re, epsilon = eps);
            assert_abs_diff_eq!(actual[(i, j)].im, expected[(i, j)].im, epsilon = eps);
        }
    }
}
