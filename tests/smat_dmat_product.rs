//! Tests for the sparse-dense product expression: construction, element access,
//! structure propagation and declarations.

mod common;

use approx::assert_abs_diff_eq;
use common::*;
use exprla::{
    mul, trans, CsrMatrix, Decl, DenseMatrix, ElementAccess, EvalContext, EvalOptions, LaError, Mode,
    Structure,
};
use faer::Mat;
use num_complex::Complex;

/// The reference 3x4 times 4x2 scenario, evaluated through the default context.
#[test]
fn golden_product() {
    let a = CsrMatrix::from_triplets(3, 4, &[(0, 0, 2.0), (1, 2, 3.0), (2, 3, 1.0)]).unwrap();
    let b = Mat::from_fn(4, 2, |i, j| [[1.0, 5.0], [2.0, 6.0], [3.0, 7.0], [4.0, 8.0]][i][j]);
    let expect = Mat::from_fn(3, 2, |i, j| [[2.0, 10.0], [9.0, 21.0], [4.0, 8.0]][i][j]);

    let p = (&a * &b).unwrap();
    assert_eq!((p.nrows(), p.ncols()), (3, 2));
    let ctx = EvalContext::serial();
    assert_mat_close(&ctx.evaluate(&p), &expect, 0.0);

    let mut c = Mat::from_fn(3, 2, |_, _| -1.0);
    ctx.assign(&mut c, &p).unwrap();
    assert_mat_close(&c, &expect, 0.0);
}

/// Incompatible inner dimensions are rejected at construction; compatible ones size the result.
#[test]
fn inner_dimension_mismatch_is_rejected() {
    let mut rng = rng(1);
    for (m, k, n) in [(3, 4, 5), (1, 1, 1), (6, 2, 3)] {
        let a = random_sparse(&mut rng, m, k, 0.5);
        let ok = random_dense(&mut rng, k, n);
        let bad = random_dense(&mut rng, k + 1, n);
        let p = mul(&a, &ok).unwrap();
        assert_eq!((p.nrows(), p.ncols()), (m, n));
        let err = (&a * &bad).unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(matches!(err, LaError::SizeMismatch { .. }));
    }
}

/// Assigning into a destination of the wrong shape is an error, not a truncation.
#[test]
fn destination_shape_is_checked() {
    let mut rng = rng(2);
    let a = random_sparse(&mut rng, 4, 3, 0.5);
    let b = random_dense(&mut rng, 3, 2);
    let p = mul(&a, &b).unwrap();
    let mut c = Mat::from_fn(4, 3, |_, _| 0.0);
    let ctx = EvalContext::serial();
    assert!(ctx.assign(&mut c, &p).is_err());
    assert!(ctx.add_assign(&mut c, &p).is_err());
    assert!(ctx.smp_assign(&mut c, &p).is_err());
}

/// Checked access reports out-of-range indices; in-range reads equal the brute-force product.
#[test]
fn checked_access() {
    let mut rng = rng(3);
    let a = random_sparse(&mut rng, 5, 6, 0.4);
    let b = random_dense(&mut rng, 6, 4);
    let p = mul(&a, &b).unwrap();
    let expect = brute(&a, &b);
    for i in 0..5 {
        for j in 0..4 {
            assert_abs_diff_eq!(p.at(i, j).unwrap(), expect[(i, j)], epsilon = 1e-12);
        }
    }
    assert_eq!(
        p.at(5, 0),
        Err(LaError::OutOfRange { row: 5, col: 0, rows: 5, cols: 4 })
    );
    assert!(p.at(0, 4).is_err());
}

/// Diagonal left operand: every element is `A(i,i) * B(i,j)`, zero is never read off the diagonal.
#[test]
fn diagonal_fast_path() {
    let mut rng = rng(4);
    let d = random_diagonal_sparse(&mut rng, 6);
    let b = random_dense(&mut rng, 6, 5);
    let p = mul(&d, &b).unwrap();
    assert_eq!(p.element_access(), ElementAccess::LeftDiagonal);
    let c = EvalContext::serial().evaluate(&p);
    for i in 0..6 {
        for j in 0..5 {
            assert_eq!(p.element(i, j), d.get(i, i) * b[(i, j)]);
            assert_eq!(c[(i, j)], d.get(i, i) * b[(i, j)]);
        }
    }
}

/// Lower times upper: the restricted dot product equals the brute-force one everywhere.
#[test]
fn triangular_restriction_matches_reference() {
    let mut rng = rng(5);
    for strict in [false, true] {
        let l = random_lower_sparse(&mut rng, 7, 0.6, strict);
        let u = random_dense_where(&mut rng, 7, Structure::UPPER, |i, j| i <= j);
        let p = mul(&l, &u).unwrap();
        assert_eq!(p.element_access(), ElementAccess::Restricted);
        let expect = brute(&l, &u);
        for i in 0..7 {
            for j in 0..7 {
                assert_abs_diff_eq!(p.element(i, j), expect[(i, j)], epsilon = 1e-12);
            }
        }
        let c = EvalContext::serial().evaluate(&p);
        assert_mat_close(&c, &expect, 1e-12);
    }
}

/// Lower times lower is lower: the restricted range above the diagonal is empty.
#[test]
fn lower_times_lower_is_zero_above_diagonal() {
    let mut rng = rng(6);
    let l = random_lower_sparse(&mut rng, 6, 0.7, false);
    let m = random_dense_where(&mut rng, 6, Structure::LOWER, |i, j| i >= j);
    let p = mul(&l, &m).unwrap();
    assert!(p.structure().is_lower());
    for i in 0..6 {
        for j in (i + 1)..6 {
            assert_eq!(p.element(i, j), 0.0);
        }
    }
}

fn kernel_contexts() -> [EvalContext; 2] {
    [false, true].map(|optimized| {
        EvalContext::serial().with_options(EvalOptions::default().with_smp(false).with_optimized_kernels(optimized))
    })
}

/// Declaring `A * Aᵀ` symmetric changes the evaluation path, never the values,
/// on the default and the optimized kernel alike.
#[test]
fn symmetric_declaration_round_trip() {
    let mut rng = rng(7);
    for n in [3, 8, 13] {
        let a = random_sparse(&mut rng, n, n + 2, 0.4);
        let ad = a.to_dense();
        let at = trans(&ad);
        for ctx in kernel_contexts() {
            let plain = ctx.evaluate(&mul(&a, &at).unwrap());
            let declared = mul(&a, &at).unwrap().decl_sym().unwrap();
            assert_eq!(declared.decl(), Decl::SYM);
            let sym = ctx.evaluate(&declared);
            assert_mat_close(&sym, &plain, 1e-12);
            for i in 0..n {
                for j in 0..n {
                    assert_eq!(sym[(i, j)], sym[(j, i)]);
                }
            }
        }
    }
}

/// Every declaration requires a square product.
#[test]
fn declarations_require_square() {
    let mut rng = rng(8);
    let a = random_sparse(&mut rng, 4, 3, 0.5);
    let b = random_dense(&mut rng, 3, 5);
    let p = mul(&a, &b).unwrap();
    for r in [
        p.clone().decl_sym(),
        p.clone().decl_herm(),
        p.clone().decl_low(),
        p.clone().decl_upp(),
        p.decl_diag(),
    ] {
        let err = r.unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(matches!(err, LaError::NotSquare { rows: 4, cols: 5, .. }));
    }
}

/// Hermitian declaration on a complex `A * Aᴴ` mirrors the lower triangle with conjugation,
/// on both kernels.
#[test]
fn complex_hermitian_declaration() {
    let mut rng = rng(9);
    let a = random_complex_sparse(&mut rng, 5, 4, 0.6);
    let ad = a.to_dense();
    let ah = Mat::from_fn(4, 5, |i, j| ad[(j, i)].conj());
    let expect = brute(&a, &ah);
    let p = mul(&a, &ah).unwrap().decl_herm().unwrap();
    assert!(p.structure().is_hermitian());
    assert!(!p.structure().is_symmetric());
    for ctx in kernel_contexts() {
        let c = ctx.evaluate(&p);
        assert_cmat_close(&c, &expect, 1e-12);
        for i in 0..5 {
            for j in 0..5 {
                assert_eq!(c[(i, j)], c[(j, i)].conj());
            }
        }
    }
}

/// Known asymmetry: symmetry of a product can follow from declarations, Hermitian-ness is
/// never inferred from Hermitian operands.
#[test]
fn hermitian_not_inferred_from_operands() {
    let h = CsrMatrix::from_triplets(
        2,
        2,
        &[(0, 0, Complex::new(1.0, 0.0)), (0, 1, Complex::new(0.0, 1.0)), (1, 0, Complex::new(0.0, -1.0))],
    )
    .unwrap()
    .with_structure(Structure::HERMITIAN)
    .unwrap();
    let hd = DenseMatrix::new(h.to_dense()).with_structure(Structure::HERMITIAN).unwrap();
    let p = mul(&h, &hd).unwrap();
    assert!(!p.structure().is_hermitian());
    assert!(p.decl_herm().unwrap().structure().is_hermitian());
}

/// A product nested as the dense operand is evaluated into a snapshot first.
#[test]
fn nested_product() {
    let mut rng = rng(10);
    let a = random_sparse(&mut rng, 4, 5, 0.5);
    let c = random_sparse(&mut rng, 5, 6, 0.5);
    let d = random_dense(&mut rng, 6, 3);
    let inner = mul(&c, &d).unwrap();
    let outer = mul(&a, &inner).unwrap();
    let expect = brute(&a, &brute(&c, &d));
    let ctx = EvalContext::serial();
    assert_mat_close(&ctx.evaluate(&outer), &expect, 1e-12);
    assert_abs_diff_eq!(outer.element(3, 2), expect[(3, 2)], epsilon = 1e-12);
    assert!(!outer.smp_assignable());
}

/// A scaled sparse operand is a computation, evaluated before the kernel runs.
#[test]
fn scaled_sparse_operand() {
    let mut rng = rng(11);
    let a = random_sparse(&mut rng, 6, 6, 0.5);
    let b = random_dense(&mut rng, 6, 4);
    let s = a.scaled(-2.5);
    let p = (&s * &b).unwrap();
    let mut expect = brute(&a, &b);
    for j in 0..4 {
        for i in 0..6 {
            expect[(i, j)] *= -2.5;
        }
    }
    let ctx = EvalContext::serial();
    assert_mat_close(&p.eval(&ctx, Mode::Serial), &expect, 1e-12);
}
