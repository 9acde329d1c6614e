// rayon-based column-parallel fill, each worker writing whole columns in place

use faer::Mat;
use rayon::prelude::*;

use super::Executor;

#[derive(Debug, Clone, Copy)]
pub struct RayonExecutor;

impl RayonExecutor {
    pub fn new() -> Self {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_cpus::get())
            .build_global()
            .ok();
        RayonExecutor
    }
}

impl Default for RayonExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for RayonExecutor {
    fn size(&self) -> usize {
        rayon::current_num_threads()
    }
    fn barrier(&self) {
        rayon::scope(|_| {});
    }
    fn fill<T, F>(&self, dst: &mut Mat<T>, f: F)
    where
        T: Copy + Send + Sync,
        F: Fn(usize, usize) -> T + Sync + Send,
    {
        dst.as_mut().par_col_iter_mut().enumerate().for_each(|(j, col)| {
            for (i, v) in col.iter_mut().enumerate() {
                *v = f(i, j);
            }
        });
    }
}
