use thiserror::Error;

// Unified error type for exprla

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaError {
    #[error("matrix sizes do not match: {lhs_rows}x{lhs_cols} * {rhs_rows}x{rhs_cols}")]
    SizeMismatch {
        lhs_rows: usize,
        lhs_cols: usize,
        rhs_rows: usize,
        rhs_cols: usize,
    },
    #[error("invalid {kind} matrix declaration: {rows}x{cols} is not square")]
    NotSquare {
        kind: &'static str,
        rows: usize,
        cols: usize,
    },
    #[error("matrix does not satisfy the {0} structure")]
    StructureViolation(&'static str),
    #[error("invalid sparse storage: {0}")]
    InvalidStorage(String),
    #[error("invalid access index ({row}, {col}) for {rows}x{cols} matrix")]
    OutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
}

impl LaError {
    /// True for every caller-input validation failure (shapes, structure, storage).
    pub fn is_invalid_argument(&self) -> bool {
        !matches!(self, LaError::OutOfRange { .. })
    }
}
