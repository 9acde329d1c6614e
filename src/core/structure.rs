//! Structural classification of matrices and matrix expressions.
//!
//! A [`Structure`] records the shape properties (triangularity, unit
//! diagonal, symmetry) that are known to hold for an operand, and a [`Decl`]
//! records the properties explicitly declared on a product expression.
//! [`propagate`] combines both into the structure of a sparse-dense product.
//! The evaluation kernels read and write only inside the region these
//! properties leave valid, so a wrong claim here is a correctness bug rather
//! than a missed optimization.

use bitflags::bitflags;

use crate::core::traits::Scalar;
use crate::error::LaError;

bitflags! {
    /// Shape properties known to hold for a matrix or expression.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Structure: u32 {
        const LOWER          = 0b0000_0001;
        const UPPER          = 0b0000_0010;
        const STRICTLY_LOWER = 0b0000_0100;
        const STRICTLY_UPPER = 0b0000_1000;
        const UNI_LOWER      = 0b0001_0000;
        const UNI_UPPER      = 0b0010_0000;
        const SYMMETRIC      = 0b0100_0000;
        const HERMITIAN      = 0b1000_0000;
        const DIAGONAL       = Self::LOWER.bits() | Self::UPPER.bits();
    }
}

bitflags! {
    /// Flags declared on a product expression via `decl_*`.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Decl: u8 {
        const SYM  = 0b0001;
        const HERM = 0b0010;
        const LOW  = 0b0100;
        const UPP  = 0b1000;
        const DIAG = Self::LOW.bits() | Self::UPP.bits();
    }
}

impl Structure {
    /// Add the flags implied by the stricter ones (strictly/uni => triangular).
    pub fn normalized(self) -> Self {
        let mut s = self;
        if s.intersects(Self::STRICTLY_LOWER | Self::UNI_LOWER) {
            s |= Self::LOWER;
        }
        if s.intersects(Self::STRICTLY_UPPER | Self::UNI_UPPER) {
            s |= Self::UPPER;
        }
        s
    }

    pub fn is_lower(self) -> bool {
        self.contains(Self::LOWER)
    }
    pub fn is_upper(self) -> bool {
        self.contains(Self::UPPER)
    }
    pub fn is_strictly_lower(self) -> bool {
        self.contains(Self::STRICTLY_LOWER)
    }
    pub fn is_strictly_upper(self) -> bool {
        self.contains(Self::STRICTLY_UPPER)
    }
    pub fn is_uni_lower(self) -> bool {
        self.contains(Self::UNI_LOWER)
    }
    pub fn is_uni_upper(self) -> bool {
        self.contains(Self::UNI_UPPER)
    }
    pub fn is_symmetric(self) -> bool {
        self.contains(Self::SYMMETRIC)
    }
    pub fn is_hermitian(self) -> bool {
        self.contains(Self::HERMITIAN)
    }
    pub fn is_diagonal(self) -> bool {
        self.contains(Self::DIAGONAL)
    }
    pub fn is_triangular(self) -> bool {
        self.intersects(Self::DIAGONAL)
    }

    /// Structure of the transpose: the lower and upper families swap places.
    pub fn transposed(self) -> Self {
        let pairs = [
            (Self::LOWER, Self::UPPER),
            (Self::STRICTLY_LOWER, Self::STRICTLY_UPPER),
            (Self::UNI_LOWER, Self::UNI_UPPER),
        ];
        let mut t = self & (Self::SYMMETRIC | Self::HERMITIAN);
        for (l, u) in pairs {
            if self.contains(l) {
                t |= u;
            }
            if self.contains(u) {
                t |= l;
            }
        }
        t
    }

    /// Check that the values reachable through `get` satisfy every flag in `self`.
    pub fn verify<T, F>(self, rows: usize, cols: usize, get: F) -> Result<(), LaError>
    where
        T: Scalar,
        F: Fn(usize, usize) -> T,
    {
        if self.is_empty() {
            return Ok(());
        }
        if rows != cols {
            return Err(LaError::NotSquare { kind: "structured", rows, cols });
        }
        let s = self.normalized();
        let n = rows;
        for j in 0..n {
            for i in 0..n {
                let v = get(i, j);
                if i < j && s.is_lower() && v != T::zero() {
                    return Err(LaError::StructureViolation("lower"));
                }
                if i > j && s.is_upper() && v != T::zero() {
                    return Err(LaError::StructureViolation("upper"));
                }
                if i == j {
                    if (s.is_strictly_lower() || s.is_strictly_upper()) && v != T::zero() {
                        return Err(LaError::StructureViolation("strictly triangular"));
                    }
                    if (s.is_uni_lower() || s.is_uni_upper()) && v != T::one() {
                        return Err(LaError::StructureViolation("unitriangular"));
                    }
                }
                if i > j {
                    let w = get(j, i);
                    if s.is_symmetric() && v != w {
                        return Err(LaError::StructureViolation("symmetric"));
                    }
                    if s.is_hermitian() && v != w.conj() {
                        return Err(LaError::StructureViolation("Hermitian"));
                    }
                }
                if i == j && s.is_hermitian() && v != v.conj() {
                    return Err(LaError::StructureViolation("Hermitian"));
                }
            }
        }
        Ok(())
    }
}

impl Decl {
    /// Symmetric mirroring applies only when no triangular flag overrides it.
    pub fn sym(self) -> bool {
        self.contains(Self::SYM) && !self.intersects(Self::HERM | Self::LOW | Self::UPP)
    }

    pub fn herm(self) -> bool {
        self.contains(Self::HERM) && !self.intersects(Self::LOW | Self::UPP)
    }

    /// A symmetric or Hermitian upper matrix is diagonal, hence also lower.
    pub fn low(self) -> bool {
        self.contains(Self::LOW)
            || (self.intersects(Self::SYM | Self::HERM) && self.contains(Self::UPP))
    }

    pub fn upp(self) -> bool {
        self.contains(Self::UPP)
            || (self.intersects(Self::SYM | Self::HERM) && self.contains(Self::LOW))
    }

    /// True when any flag restricts the computed region, i.e. the result must be square.
    pub fn restricts(self) -> bool {
        self.sym() || self.herm() || self.low() || self.upp()
    }
}

/// Structure of `decl(lhs * rhs)` given the operand structures.
///
/// `real` states whether the element type is real, in which case a declared
/// Hermitian product is also symmetric. Hermitian-ness itself is never inferred
/// from the operands, only declared.
pub fn propagate(decl: Decl, lhs: Structure, rhs: Structure, real: bool) -> Structure {
    let sf = decl.contains(Decl::SYM);
    let hf = decl.contains(Decl::HERM);
    let lf = decl.contains(Decl::LOW);
    let uf = decl.contains(Decl::UPP);
    let mirrored = sf || hf;

    let mut s = Structure::empty();

    if lf || (lhs.is_lower() && rhs.is_lower()) || (mirrored && lhs.is_upper() && rhs.is_upper()) {
        s |= Structure::LOWER;
    }
    if uf || (lhs.is_upper() && rhs.is_upper()) || (mirrored && lhs.is_lower() && rhs.is_lower()) {
        s |= Structure::UPPER;
    }

    let strictly_lower = (lhs.is_strictly_lower() && rhs.is_lower())
        || (rhs.is_strictly_lower() && lhs.is_lower());
    let strictly_upper = (lhs.is_strictly_upper() && rhs.is_upper())
        || (rhs.is_strictly_upper() && lhs.is_upper());
    if strictly_lower || (mirrored && strictly_upper) {
        s |= Structure::STRICTLY_LOWER;
    }
    if strictly_upper || (mirrored && strictly_lower) {
        s |= Structure::STRICTLY_UPPER;
    }

    let uni_lower = lhs.is_uni_lower() && rhs.is_uni_lower();
    let uni_upper = lhs.is_uni_upper() && rhs.is_uni_upper();
    if uni_lower || (mirrored && uni_upper) {
        s |= Structure::UNI_LOWER;
    }
    if uni_upper || (mirrored && uni_lower) {
        s |= Structure::UNI_UPPER;
    }

    if sf || (hf && real) || (lf && uf) {
        s |= Structure::SYMMETRIC;
    }
    if hf {
        s |= Structure::HERMITIAN;
    }

    s.normalized()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: Structure = Structure::empty();

    #[test]
    fn normalized_adds_implied_flags() {
        let s = (Structure::STRICTLY_LOWER | Structure::UNI_UPPER).normalized();
        assert!(s.is_lower() && s.is_upper());
        assert!(s.is_diagonal());
    }

    #[test]
    fn transposed_swaps_families() {
        let s = Structure::STRICTLY_LOWER.normalized() | Structure::SYMMETRIC;
        let t = s.transposed();
        assert!(t.is_upper() && t.is_strictly_upper() && !t.is_lower());
        assert!(t.is_symmetric());
    }

    #[test]
    fn effective_declared_flags() {
        assert!(Decl::SYM.sym());
        assert!(!(Decl::SYM | Decl::LOW).sym());
        assert!((Decl::SYM | Decl::LOW).low());
        assert!((Decl::SYM | Decl::LOW).upp());
        assert!((Decl::HERM | Decl::UPP).low());
        assert!(!(Decl::HERM | Decl::UPP).herm());
        assert!(!Decl::empty().restricts());
    }

    #[test]
    fn lower_times_lower_is_lower() {
        let s = propagate(Decl::empty(), Structure::LOWER, Structure::LOWER, true);
        assert!(s.is_lower() && !s.is_upper());
    }

    #[test]
    fn upper_times_upper_declared_symmetric_is_lower() {
        let s = propagate(Decl::SYM, Structure::UPPER, Structure::UPPER, true);
        assert!(s.is_lower() && s.is_upper() && s.is_symmetric());
        let s = propagate(Decl::empty(), Structure::UPPER, Structure::UPPER, true);
        assert!(!s.is_lower());
    }

    #[test]
    fn strictly_lower_needs_one_strict_and_one_lower() {
        let sl = Structure::STRICTLY_LOWER.normalized();
        assert!(propagate(Decl::empty(), sl, Structure::LOWER, true).is_strictly_lower());
        assert!(propagate(Decl::empty(), Structure::LOWER, sl, true).is_strictly_lower());
        assert!(!propagate(Decl::empty(), Structure::LOWER, Structure::LOWER, true).is_strictly_lower());
        let su = Structure::STRICTLY_UPPER.normalized();
        assert!(propagate(Decl::HERM, su, Structure::UPPER, false).is_strictly_lower());
        assert!(!propagate(Decl::empty(), su, Structure::UPPER, false).is_strictly_lower());
    }

    #[test]
    fn uni_lower_needs_both_uni() {
        let ul = Structure::UNI_LOWER.normalized();
        let uu = Structure::UNI_UPPER.normalized();
        assert!(propagate(Decl::empty(), ul, ul, true).is_uni_lower());
        assert!(!propagate(Decl::empty(), ul, Structure::LOWER, true).is_uni_lower());
        assert!(propagate(Decl::SYM, uu, uu, true).is_uni_lower());
        assert!(!propagate(Decl::empty(), uu, uu, true).is_uni_lower());
    }

    #[test]
    fn symmetric_rules() {
        assert!(propagate(Decl::SYM, NONE, NONE, false).is_symmetric());
        assert!(propagate(Decl::HERM, NONE, NONE, true).is_symmetric());
        assert!(!propagate(Decl::HERM, NONE, NONE, false).is_symmetric());
        assert!(propagate(Decl::DIAG, NONE, NONE, false).is_symmetric());
        assert!(!propagate(Decl::LOW, NONE, NONE, true).is_symmetric());
    }

    // Hermitian-ness is deliberately not inferred from Hermitian operands, only declared.
    #[test]
    fn hermitian_is_only_declared() {
        let h = Structure::HERMITIAN;
        assert!(!propagate(Decl::empty(), h, h, false).is_hermitian());
        assert!(!propagate(Decl::SYM, h, h, false).is_hermitian());
        assert!(propagate(Decl::HERM, NONE, NONE, false).is_hermitian());
    }

    #[test]
    fn verify_detects_violations() {
        let lower = |i: usize, j: usize| if i >= j { 1.0 + i as f64 } else { 0.0 };
        assert!(Structure::LOWER.verify(3, 3, lower).is_ok());
        assert_eq!(
            Structure::UPPER.verify(3, 3, lower),
            Err(LaError::StructureViolation("upper"))
        );
        assert!(matches!(
            Structure::LOWER.verify(2, 3, lower),
            Err(LaError::NotSquare { .. })
        ));
        let unit = |i: usize, j: usize| if i == j { 1.0 } else if i > j { 2.0 } else { 0.0 };
        assert!(Structure::UNI_LOWER.verify(3, 3, unit).is_ok());
        assert!(Structure::STRICTLY_LOWER.verify(3, 3, unit).is_err());
        let sym = |i: usize, j: usize| (i + j) as f64;
        assert!(Structure::SYMMETRIC.verify(4, 4, sym).is_ok());
        assert!(Structure::empty().verify(2, 5, sym).is_ok());
    }
}
