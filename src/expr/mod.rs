//! Expression layer: the sparse-dense product, its kernels and their dispatch.
//!
//! - [`smat_dmat`]: the lazily evaluated product, element access and declarations.
//! - [`kernels`]: serial blocked, register-blocked and restructured kernels.
//! - [`dispatch`]: strategy selection and (SMP) assignment.

pub mod dispatch;
pub mod kernels;
pub mod smat_dmat;

pub use dispatch::{assign_product_in_place, AssignStrategy, KernelVariant};
pub use smat_dmat::{mul, ElementAccess, SparseDenseProduct};
