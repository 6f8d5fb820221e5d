// src/core/context.rs — Run-scoped execution context
//
// Owns the worker pool and the live-process registry for exactly one
// discovery run. Components receive what they need from here instead of
// reaching for process-wide state, and `shutdown` ends the pool's threads
// when the run is over.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};

use crate::infra::errors::{DiscoveryError, Result};
use crate::runner::registry::ProcessRegistry;
use crate::runner::BoundedProcessRunner;

/// Time given to in-flight tasks to wind down at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

pub struct RunContext {
    runtime: Runtime,
    registry: ProcessRegistry,
    pool_size: usize,
}

impl RunContext {
    /// Build a pool of `pool_size` OS worker threads.
    pub fn new(pool_size: usize) -> Result<Self> {
        let pool_size = pool_size.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(pool_size)
            .max_blocking_threads(pool_size)
            .thread_name("flagprobe-worker")
            .enable_all()
            .build()
            .map_err(|e| DiscoveryError::Runtime(e.to_string()))?;

        tracing::debug!("Worker pool started with {} threads", pool_size);

        Ok(Self {
            runtime,
            registry: ProcessRegistry::new(),
            pool_size,
        })
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// A process runner bound to this run's registry.
    pub fn runner(&self, memory_limit: Option<u64>) -> BoundedProcessRunner {
        BoundedProcessRunner::new(self.registry.clone()).with_memory_limit(memory_limit)
    }

    /// Drive `future` to completion on the pool.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Kill anything still running and stop the worker threads.
    pub fn shutdown(self) {
        let killed = self.registry.kill_all();
        if killed > 0 {
            tracing::debug!("Shutdown killed {} leftover process group(s)", killed);
        }
        self.runtime.shutdown_timeout(SHUTDOWN_GRACE);
        tracing::debug!("Worker pool stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_size_floor() {
        let ctx = RunContext::new(0).unwrap();
        assert_eq!(ctx.pool_size(), 1);
        ctx.shutdown();
    }

    #[test]
    fn test_block_on_runs_spawned_tasks() {
        let ctx = RunContext::new(2).unwrap();
        let total = ctx.block_on(async {
            let mut set = tokio::task::JoinSet::new();
            for i in 0..10u32 {
                set.spawn(async move { i * 2 });
            }
            let mut sum = 0;
            while let Some(v) = set.join_next().await {
                sum += v.unwrap();
            }
            sum
        });
        assert_eq!(total, 90);
        assert!(ctx.registry().is_empty());
        ctx.shutdown();
    }

    #[test]
    fn test_runner_shares_registry() {
        let ctx = RunContext::new(1).unwrap();
        let runner = ctx.runner(None);
        runner.registry().register(424_242);
        assert!(ctx.registry().contains(424_242));
        ctx.registry().unregister(424_242);
        ctx.shutdown();
    }
}
