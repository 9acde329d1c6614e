// Compressed row storage on top of faer, plus the scaled-sparse computation.

use std::fmt;

use faer::Mat;
use faer::sparse::{SparseRowMat, SymbolicSparseRowMat};

use crate::context::{EvalContext, Mode};
use crate::core::structure::Structure;
use crate::core::traits::{MatShape, MatrixGet, Operand, OperandKind, Scalar, SparseOperand};
use crate::core::wrappers::Held;
use crate::error::LaError;

/// Row-major sparse matrix. Column indices are strictly increasing within each row.
#[derive(Clone)]
pub struct CsrMatrix<T> {
    inner: SparseRowMat<usize, T>,
    structure: Structure,
}

/// One non-zero of a sparse row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry<T> {
    index: usize,
    value: T,
}

impl<T: Copy> Entry<T> {
    pub fn index(&self) -> usize {
        self.index
    }
    pub fn value(&self) -> T {
        self.value
    }
}

/// Borrowed view of the non-zeros of one row.
#[derive(Debug, Clone, Copy)]
pub struct SparseRow<'a, T> {
    indices: &'a [usize],
    values: &'a [T],
}

impl<'a, T: Copy> SparseRow<'a, T> {
    pub fn indices(&self) -> &'a [usize] {
        self.indices
    }
    pub fn values(&self) -> &'a [T] {
        self.values
    }
    pub fn len(&self) -> usize {
        self.indices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
    /// First position whose column index is not less than `col`.
    pub fn lower_bound(&self, col: usize) -> usize {
        self.indices.partition_point(|&k| k < col)
    }
    /// First position whose column index is greater than `col`.
    pub fn upper_bound(&self, col: usize) -> usize {
        self.indices.partition_point(|&k| k <= col)
    }
    pub fn iter(self) -> impl Iterator<Item = Entry<T>> + 'a {
        let values = self.values;
        self.indices
            .iter()
            .zip(values)
            .map(|(&index, &value)| Entry { index, value })
    }
}

fn check_csr(nrows: usize, ncols: usize, row_ptr: &[usize], col_idx: &[usize], nvals: usize) -> Result<(), LaError> {
    if row_ptr.len() != nrows + 1 {
        return Err(LaError::InvalidStorage(format!(
            "row_ptr has length {}, expected {}",
            row_ptr.len(),
            nrows + 1
        )));
    }
    if row_ptr[0] != 0 || row_ptr[nrows] != col_idx.len() {
        return Err(LaError::InvalidStorage("row_ptr must start at 0 and end at nnz".into()));
    }
    if col_idx.len() != nvals {
        return Err(LaError::InvalidStorage(format!(
            "{} column indices but {} values",
            col_idx.len(),
            nvals
        )));
    }
    if let Some(i) = row_ptr.windows(2).position(|w| w[0] > w[1]) {
        return Err(LaError::InvalidStorage(format!("row_ptr decreases at row {i}")));
    }
    if let Some(&p) = row_ptr.iter().find(|&&p| p > col_idx.len()) {
        return Err(LaError::InvalidStorage(format!(
            "row_ptr entry {p} exceeds nnz {}",
            col_idx.len()
        )));
    }
    for i in 0..nrows {
        let row = &col_idx[row_ptr[i]..row_ptr[i + 1]];
        if let Some(&last) = row.last() {
            if last >= ncols {
                return Err(LaError::InvalidStorage(format!("column index {last} out of bounds in row {i}")));
            }
        }
        if row.windows(2).any(|w| w[0] >= w[1]) {
            return Err(LaError::InvalidStorage(format!(
                "column indices of row {i} are not strictly increasing"
            )));
        }
    }
    Ok(())
}

impl<T: Scalar> CsrMatrix<T> {
    /// Build a CSR from raw row‐ptr, col‐idx, and values, validating the layout.
    pub fn try_from_csr(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, LaError> {
        check_csr(nrows, ncols, &row_ptr, &col_idx, values.len())?;
        let symbolic = SymbolicSparseRowMat::new_checked(nrows, ncols, row_ptr, None, col_idx);
        let inner = SparseRowMat::new(symbolic, values);
        Ok(Self { inner, structure: Structure::empty() })
    }

    /// Panicking form of [`try_from_csr`](Self::try_from_csr).
    pub fn from_csr(nrows: usize, ncols: usize, row_ptr: Vec<usize>, col_idx: Vec<usize>, values: Vec<T>) -> Self {
        match Self::try_from_csr(nrows, ncols, row_ptr, col_idx, values) {
            Ok(m) => m,
            Err(e) => panic!("{e}"),
        }
    }

    /// Build from `(row, col, value)` triplets; duplicates are summed.
    pub fn from_triplets(nrows: usize, ncols: usize, triplets: &[(usize, usize, T)]) -> Result<Self, LaError> {
        let mut sorted = triplets.to_vec();
        if let Some(&(i, j, _)) = sorted.iter().find(|&&(i, j, _)| i >= nrows || j >= ncols) {
            return Err(LaError::OutOfRange { row: i, col: j, rows: nrows, cols: ncols });
        }
        sorted.sort_by_key(|&(i, j, _)| (i, j));
        let mut row_ptr = vec![0; nrows + 1];
        let mut col_idx: Vec<usize> = Vec::with_capacity(sorted.len());
        let mut values: Vec<T> = Vec::with_capacity(sorted.len());
        let mut last: Option<(usize, usize)> = None;
        for (i, j, v) in sorted {
            if last == Some((i, j)) {
                if let Some(acc) = values.last_mut() {
                    *acc += v;
                }
                continue;
            }
            col_idx.push(j);
            values.push(v);
            row_ptr[i + 1] += 1;
            last = Some((i, j));
        }
        for i in 0..nrows {
            row_ptr[i + 1] += row_ptr[i];
        }
        Self::try_from_csr(nrows, ncols, row_ptr, col_idx, values)
    }

    /// Keep the non-zero entries of a dense matrix.
    pub fn from_dense(a: &Mat<T>) -> Self {
        let (m, n) = (a.nrows(), a.ncols());
        let mut row_ptr = vec![0; m + 1];
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        for i in 0..m {
            for j in 0..n {
                let v = a[(i, j)];
                if v != T::zero() {
                    col_idx.push(j);
                    values.push(v);
                }
            }
            row_ptr[i + 1] = col_idx.len();
        }
        Self::from_csr(m, n, row_ptr, col_idx, values)
    }

    /// Tag the matrix with structural properties, after checking they hold.
    pub fn with_structure(mut self, structure: Structure) -> Result<Self, LaError> {
        let structure = structure.normalized();
        structure.verify(self.nrows(), self.ncols(), |i, j| self.get(i, j))?;
        self.structure = structure;
        Ok(self)
    }

    /// Attach a structure the caller guarantees, e.g. one enforced by an evaluation kernel.
    pub(crate) fn with_structure_unchecked(mut self, structure: Structure) -> Self {
        self.structure = structure.normalized();
        self
    }

    pub fn structure(&self) -> Structure {
        self.structure
    }

    pub fn nrows(&self) -> usize {
        self.inner.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.inner.ncols()
    }

    pub fn nnz(&self) -> usize {
        self.inner.val().len()
    }

    pub fn row(&self, i: usize) -> SparseRow<'_, T> {
        SparseRow {
            indices: self.inner.symbolic().col_idx_of_row_raw(i),
            values: self.inner.val_of_row(i),
        }
    }

    /// Position of the first non-zero of row `i` (always 0).
    pub fn begin(&self, _i: usize) -> usize {
        0
    }

    /// One past the last non-zero of row `i`.
    pub fn end(&self, i: usize) -> usize {
        self.row(i).len()
    }

    pub fn lower_bound(&self, i: usize, col: usize) -> usize {
        self.row(i).lower_bound(col)
    }

    pub fn upper_bound(&self, i: usize, col: usize) -> usize {
        self.row(i).upper_bound(col)
    }

    /// Element `(i, j)`, zero when not stored.
    pub fn get(&self, i: usize, j: usize) -> T {
        let row = self.row(i);
        match row.indices.binary_search(&j) {
            Ok(p) => row.values[p],
            Err(_) => T::zero(),
        }
    }

    pub fn to_dense(&self) -> Mat<T> {
        let mut d = Mat::from_fn(self.nrows(), self.ncols(), |_, _| T::zero());
        for i in 0..self.nrows() {
            for e in self.row(i).iter() {
                d[(i, e.index())] = e.value();
            }
        }
        d
    }

    /// `s * self`, evaluated lazily.
    pub fn scaled(&self, s: T) -> ScaledSparse<'_, T> {
        ScaledSparse::new(self, s)
    }
}

impl<T> fmt::Debug for CsrMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrMatrix")
            .field("nrows", &self.inner.nrows())
            .field("ncols", &self.inner.ncols())
            .field("nnz", &self.inner.val().len())
            .field("structure", &self.structure)
            .finish()
    }
}

impl<T: Scalar> MatShape for CsrMatrix<T> {
    fn nrows(&self) -> usize {
        self.inner.nrows()
    }
    fn ncols(&self) -> usize {
        self.inner.ncols()
    }
}

impl<T: Scalar> MatrixGet<T> for CsrMatrix<T> {
    fn get(&self, i: usize, j: usize) -> T {
        CsrMatrix::get(self, i, j)
    }
}

impl<T: Scalar> Operand for CsrMatrix<T> {
    fn kind(&self) -> OperandKind {
        OperandKind::Leaf
    }
    fn structure(&self) -> Structure {
        self.structure
    }
    fn is_aliased(&self, addr: *const ()) -> bool {
        self.inner.val().as_ptr() as *const () == addr
    }
}

impl<T: Scalar> SparseOperand<T> for CsrMatrix<T> {
    fn as_csr(&self) -> Option<&CsrMatrix<T>> {
        Some(self)
    }
    fn evaluate(&self, _ctx: &EvalContext, _mode: Mode) -> CsrMatrix<T> {
        self.clone()
    }
    fn row_dot<F: Fn(usize) -> T>(&self, i: usize, begin: usize, end: usize, f: F) -> T {
        let row = self.row(i);
        let (lo, hi) = (row.lower_bound(begin), row.lower_bound(end));
        row.indices[lo..hi]
            .iter()
            .zip(&row.values[lo..hi])
            .fold(T::zero(), |acc, (&k, &v)| acc + v * f(k))
    }
}

/// Scalar times a sparse operand: a computation that is evaluated before kernel use.
#[derive(Debug)]
pub struct ScaledSparse<'a, T> {
    inner: Held<'a, CsrMatrix<T>>,
    scale: T,
}

impl<'a, T: Scalar> ScaledSparse<'a, T> {
    pub fn new(inner: &'a CsrMatrix<T>, scale: T) -> Self {
        Self { inner: Held::of(inner), scale }
    }

    pub fn scale(&self) -> T {
        self.scale
    }
}

impl<T: Scalar> Clone for ScaledSparse<'_, T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), scale: self.scale }
    }
}

impl<T: Scalar> MatShape for ScaledSparse<'_, T> {
    fn nrows(&self) -> usize {
        self.inner.nrows()
    }
    fn ncols(&self) -> usize {
        self.inner.ncols()
    }
}

impl<T: Scalar> MatrixGet<T> for ScaledSparse<'_, T> {
    fn get(&self, i: usize, j: usize) -> T {
        self.scale * self.inner.get(i, j)
    }
}

impl<T: Scalar> Operand for ScaledSparse<'_, T> {
    fn kind(&self) -> OperandKind {
        OperandKind::Computation
    }
    /// Triangularity and symmetry survive scaling; a unit diagonal and Hermitian-ness need not.
    fn structure(&self) -> Structure {
        self.inner.structure()
            - (Structure::UNI_LOWER | Structure::UNI_UPPER | Structure::HERMITIAN)
    }
    fn is_aliased(&self, addr: *const ()) -> bool {
        self.inner.is_aliased(addr)
    }
}

impl<T: Scalar> SparseOperand<T> for ScaledSparse<'_, T> {
    fn as_csr(&self) -> Option<&CsrMatrix<T>> {
        None
    }
    fn evaluate(&self, _ctx: &EvalContext, _mode: Mode) -> CsrMatrix<T> {
        let src = &*self.inner;
        let mut row_ptr = Vec::with_capacity(src.nrows() + 1);
        let mut col_idx = Vec::with_capacity(src.nnz());
        let mut values = Vec::with_capacity(src.nnz());
        row_ptr.push(0);
        for i in 0..src.nrows() {
            for e in src.row(i).iter() {
                col_idx.push(e.index());
                values.push(self.scale * e.value());
            }
            row_ptr.push(col_idx.len());
        }
        let symbolic = SymbolicSparseRowMat::new_checked(src.nrows(), src.ncols(), row_ptr, None, col_idx);
        CsrMatrix {
            inner: SparseRowMat::new(symbolic, values),
            structure: self.structure(),
        }
    }
    fn row_dot<F: Fn(usize) -> T>(&self, i: usize, begin: usize, end: usize, f: F) -> T {
        self.scale * self.inner.row_dot(i, begin, end, f)
    }
}
