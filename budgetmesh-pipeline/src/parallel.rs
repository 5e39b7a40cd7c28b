//! Worker pool construction
//!
//! Every optimizer owns its own rayon pool; nothing is shared between
//! optimizers and nothing is kept in global state.

use budgetmesh_core::{Error, OptimizerConfig, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Thread pool configuration for optimization workers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Number of threads to use (None = automatic)
    pub num_threads: Option<usize>,
    /// Thread stack size in bytes
    pub stack_size: Option<usize>,
    /// Thread name prefix
    pub thread_name_prefix: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            stack_size: Some(8 * 1024 * 1024), // 8MB stack
            thread_name_prefix: "budgetmesh-worker".to_string(),
        }
    }
}

impl WorkerPoolConfig {
    /// Pool settings taken from an optimizer configuration
    pub fn from_optimizer(config: &OptimizerConfig) -> Self {
        Self {
            num_threads: config.worker_threads,
            ..Self::default()
        }
    }

    /// Set number of threads
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Set stack size
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Build a dedicated pool with these settings
    pub fn build(&self) -> Result<ThreadPool> {
        let mut builder = ThreadPoolBuilder::new();

        if let Some(num_threads) = self.num_threads {
            if num_threads == 0 {
                return Err(Error::InvalidConfig(
                    "worker pool needs at least one thread".to_string(),
                ));
            }
            builder = builder.num_threads(num_threads);
        }

        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }

        if !self.thread_name_prefix.is_empty() {
            let prefix = self.thread_name_prefix.clone();
            builder = builder.thread_name(move |index| format!("{}-{}", prefix, index));
        }

        builder
            .build()
            .map_err(|e| Error::Worker(format!("Failed to create thread pool: {}", e)))
    }
}
