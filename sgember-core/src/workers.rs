//! Worker-pool resolution.
//!
//! The pool, not the user, is the source of truth for achievable
//! parallelism: a requested size may be clamped or ignored by the runtime.
//! Resolution therefore follows a set-then-re-read protocol, and the value
//! read back is what gets recorded into [`Params`]. An unsatisfiable
//! request degrades to whatever the pool reports; it never aborts the run.

use rayon::ThreadPool;
use tracing::{debug, warn};

use crate::{error::WorkerPoolError, params::Params};

/// Service boundary around a process-wide worker pool.
///
/// Production code uses [`RayonPool`]; tests substitute fakes to assert
/// the resolution protocol without touching OS threads.
pub trait WorkerPool {
    /// The worker count the pool is actually running with.
    fn effective(&self) -> usize;

    /// Asks the pool to resize. The pool may clamp or ignore the request.
    fn request(&mut self, workers: usize);

    /// Runs `op` inside the pool so nested parallelism uses its workers.
    ///
    /// The default implementation runs `op` on the calling thread.
    fn scope<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        op()
    }
}

/// Reconciles the requested worker count against the pool.
///
/// Records the pool's reported size into `params` regardless of whether a
/// resize was requested or honoured.
///
/// # Examples
/// ```
/// use sgember_core::{ParamsBuilder, RayonPool, resolve_workers};
///
/// let mut pool = RayonPool::new().expect("pool must build");
/// let mut params = ParamsBuilder::new().build().expect("defaults are valid");
/// resolve_workers(&mut pool, &mut params);
/// assert!(params.effective_workers() >= 1);
/// ```
pub fn resolve_workers<P: WorkerPool + ?Sized>(pool: &mut P, params: &mut Params) {
    let requested = params.requested_workers();
    if requested > 0 && requested != pool.effective() {
        pool.request(requested);
    }
    let effective = pool.effective();
    debug!(requested, effective, "worker pool resolved");
    params.record_workers(effective);
}

/// Dedicated rayon thread pool owned by the driver.
///
/// Rayon's global pool cannot be resized once started, so the driver owns
/// a private pool and rebuilds it on resize requests. A failed rebuild
/// keeps the previous pool.
pub struct RayonPool {
    pool: ThreadPool,
}

impl RayonPool {
    /// Builds a pool sized by rayon's default heuristics.
    ///
    /// # Errors
    /// Returns [`WorkerPoolError::Build`] when the pool cannot be
    /// constructed.
    pub fn new() -> Result<Self, WorkerPoolError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .build()
            .map_err(|error| WorkerPoolError::Build {
                message: error.to_string(),
            })?;
        Ok(Self { pool })
    }
}

impl WorkerPool for RayonPool {
    fn effective(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn request(&mut self, workers: usize) {
        match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => self.pool = pool,
            Err(error) => {
                warn!(workers, %error, "worker pool resize failed, keeping current pool");
            }
        }
    }

    fn scope<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        self.pool.install(op)
    }
}

impl std::fmt::Debug for RayonPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RayonPool")
            .field("effective", &self.effective())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::params::ParamsBuilder;
    use rstest::rstest;

    /// Pool that clamps every request to a fixed ceiling, standing in for a
    /// runtime that ignores oversized requests.
    struct ClampedPool {
        size: usize,
        ceiling: usize,
    }

    impl WorkerPool for ClampedPool {
        fn effective(&self) -> usize {
            self.size
        }

        fn request(&mut self, workers: usize) {
            self.size = workers.min(self.ceiling);
        }
    }

    fn params_with_request(workers: usize) -> Params {
        ParamsBuilder::new()
            .with_requested_workers(workers)
            .build()
            .expect("configuration is valid")
    }

    #[rstest]
    #[case::honoured(2, 2)]
    #[case::clamped(16, 4)]
    fn effective_workers_match_pool_report(#[case] requested: usize, #[case] expected: usize) {
        let mut pool = ClampedPool { size: 1, ceiling: 4 };
        let mut params = params_with_request(requested);
        resolve_workers(&mut pool, &mut params);
        assert_eq!(params.effective_workers(), expected);
        assert_eq!(params.effective_workers(), pool.effective());
    }

    #[rstest]
    fn zero_request_leaves_pool_untouched() {
        let mut pool = ClampedPool { size: 3, ceiling: 4 };
        let mut params = params_with_request(0);
        resolve_workers(&mut pool, &mut params);
        assert_eq!(pool.effective(), 3);
        assert_eq!(params.effective_workers(), 3);
    }

    #[rstest]
    fn resolution_is_idempotent() {
        let mut pool = ClampedPool { size: 1, ceiling: 4 };
        let mut first = params_with_request(8);
        resolve_workers(&mut pool, &mut first);
        let mut second = params_with_request(8);
        resolve_workers(&mut pool, &mut second);
        assert_eq!(first.effective_workers(), second.effective_workers());
    }

    #[rstest]
    fn rayon_pool_honours_small_requests() {
        let mut pool = RayonPool::new().expect("pool must build");
        pool.request(2);
        assert_eq!(pool.effective(), 2);
        let sum: usize = pool.scope(|| (0..10).sum());
        assert_eq!(sum, 45);
    }
}
