//! Execution backends for SMP assignment.
//!
//! An [`Executor`] fills a dense destination from an element function and
//! returns once every element is written. The blocked serial kernels never go
//! through here; SMP assignment always uses this generic path.

use faer::Mat;
use num_traits::Zero;

/// Synchronous element-wise fill of a dense matrix, possibly fanned out across workers.
pub trait Executor {
    /// Number of workers.
    fn size(&self) -> usize;
    /// Wait for outstanding work (no-op for synchronous backends).
    fn barrier(&self);
    /// `dst(i, j) = f(i, j)` for every element of `dst`.
    fn fill<T, F>(&self, dst: &mut Mat<T>, f: F)
    where
        T: Copy + Send + Sync,
        F: Fn(usize, usize) -> T + Sync + Send;
    /// `dst(i, j) = g(dst(i, j), f(i, j))` for every element of `dst`.
    fn update<T, F, G>(&self, dst: &mut Mat<T>, f: F, g: G)
    where
        T: Copy + Send + Sync + Zero,
        F: Fn(usize, usize) -> T + Sync + Send,
        G: Fn(T, T) -> T,
    {
        let (m, n) = (dst.nrows(), dst.ncols());
        let mut tmp = Mat::from_fn(m, n, |_, _| T::zero());
        self.fill(&mut tmp, f);
        for j in 0..n {
            for i in 0..m {
                dst[(i, j)] = g(dst[(i, j)], tmp[(i, j)]);
            }
        }
    }
}

#[cfg(feature = "rayon")]
pub mod rayon_backend;
#[cfg(feature = "rayon")]
pub use rayon_backend::RayonExecutor;

/// Single-threaded executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialExecutor;

impl Executor for SerialExecutor {
    fn size(&self) -> usize {
        1
    }
    fn barrier(&self) {}
    fn fill<T, F>(&self, dst: &mut Mat<T>, f: F)
    where
        T: Copy + Send + Sync,
        F: Fn(usize, usize) -> T + Sync + Send,
    {
        for j in 0..dst.ncols() {
            for i in 0..dst.nrows() {
                dst[(i, j)] = f(i, j);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Backend {
    #[cfg(feature = "rayon")]
    Rayon(RayonExecutor),
    Serial(SerialExecutor),
}

impl Default for Backend {
    fn default() -> Self {
        #[cfg(feature = "rayon")]
        {
            Backend::Rayon(RayonExecutor::new())
        }
        #[cfg(not(feature = "rayon"))]
        {
            Backend::Serial(SerialExecutor)
        }
    }
}

impl Executor for Backend {
    fn size(&self) -> usize {
        match self {
            #[cfg(feature = "rayon")]
            Backend::Rayon(exec) => exec.size(),
            Backend::Serial(exec) => exec.size(),
        }
    }
    fn barrier(&self) {
        match self {
            #[cfg(feature = "rayon")]
            Backend::Rayon(exec) => exec.barrier(),
            Backend::Serial(exec) => exec.barrier(),
        }
    }
    fn fill<T, F>(&self, dst: &mut Mat<T>, f: F)
    where
        T: Copy + Send + Sync,
        F: Fn(usize, usize) -> T + Sync + Send,
    {
        match self {
            #[cfg(feature = "rayon")]
            Backend::Rayon(exec) => exec.fill(dst, f),
            Backend::Serial(exec) => exec.fill(dst, f),
        }
    }
}
