//! Background optimization of meshes against a triangle budget
//!
//! [`Optimizer::submit`] hands a mesh to a worker and returns at once. The
//! worker loads the mesh, reports its counts, decimates it if it is over
//! budget and sends the result back over the handle's event channel.

use crate::parallel::WorkerPoolConfig;
use budgetmesh_core::{Error, OptimizerConfig, Result, TriangleMesh};
use budgetmesh_simplification::{
    decimate_loaded, CancellationToken, DecimationStatus, Mesh, ProgressUpdate,
};
use rayon::ThreadPool;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

/// Summary of one optimization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizationReport {
    pub initial_triangle_count: usize,
    pub final_triangle_count: usize,
    /// Vertices referenced by the output triangles
    pub vertex_count: usize,
    pub status: DecimationStatus,
    pub collapses: usize,
    pub rejected_collapses: usize,
    /// Wall-clock time spent on the worker
    pub elapsed: Duration,
}

/// Optimized mesh and its report
#[derive(Debug, Clone)]
pub struct OptimizationOutput {
    pub mesh: TriangleMesh,
    pub report: OptimizationReport,
}

/// Messages sent by a worker, in order: `Loaded`, any number of `Progress`,
/// then exactly one of `Finished` or `Failed`. A mesh that cannot be loaded
/// skips straight to `Failed`.
#[derive(Debug)]
pub enum PipelineEvent {
    /// Counts of the loaded input; `vertex_count` only includes vertices
    /// referenced by a triangle
    Loaded {
        triangle_count: usize,
        vertex_count: usize,
    },
    Progress(ProgressUpdate),
    Finished(OptimizationOutput),
    Failed(Error),
}

impl PipelineEvent {
    /// Whether no further events follow this one
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineEvent::Finished(_) | PipelineEvent::Failed(_))
    }
}

/// Runs optimizations on its own worker pool
pub struct Optimizer {
    config: OptimizerConfig,
    pool: ThreadPool,
}

impl Optimizer {
    /// Validate `config` and start a worker pool sized by `worker_threads`
    pub fn new(config: OptimizerConfig) -> Result<Self> {
        let pool_config = WorkerPoolConfig::from_optimizer(&config);
        Self::with_pool(config, &pool_config)
    }

    pub fn with_pool(config: OptimizerConfig, pool_config: &WorkerPoolConfig) -> Result<Self> {
        config.validate()?;
        let pool = pool_config.build()?;
        log::debug!(
            "optimizer ready: budget {}, {} worker threads",
            config.target_triangle_budget,
            pool.current_num_threads()
        );
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Start optimizing `mesh` in the background
    pub fn submit(&self, mesh: TriangleMesh) -> OptimizationHandle {
        let (sender, receiver) = mpsc::channel();
        let cancel = CancellationToken::new();

        let worker_cancel = cancel.clone();
        let config = self.config.clone();
        self.pool
            .spawn(move || run_job(mesh, config, worker_cancel, sender));

        OptimizationHandle {
            events: receiver,
            cancel,
        }
    }

    /// Optimize `mesh` and block until the result is ready
    pub fn optimize(&self, mesh: TriangleMesh) -> Result<OptimizationOutput> {
        self.submit(mesh).wait()
    }
}

/// Caller's side of a submitted optimization.
///
/// Dropping the handle cancels the run.
pub struct OptimizationHandle {
    events: Receiver<PipelineEvent>,
    cancel: CancellationToken,
}

impl OptimizationHandle {
    /// Ask the worker to stop; it finishes with status `Cancelled`
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Next event if one is already waiting
    pub fn try_next_event(&self) -> Option<PipelineEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block for the next event; `None` once the worker is done
    pub fn next_event(&self) -> Option<PipelineEvent> {
        self.events.recv().ok()
    }

    /// Blocking iterator over the remaining events
    pub fn events(&self) -> impl Iterator<Item = PipelineEvent> + '_ {
        self.events.iter()
    }

    /// Block until the worker reports its result, skipping progress events
    pub fn wait(self) -> Result<OptimizationOutput> {
        for event in self.events.iter() {
            match event {
                PipelineEvent::Finished(output) => return Ok(output),
                PipelineEvent::Failed(err) => return Err(err),
                PipelineEvent::Loaded { .. } | PipelineEvent::Progress(_) => {}
            }
        }
        Err(worker_gone())
    }

    /// Like [`wait`](Self::wait), but cancel the run once `timeout` has
    /// elapsed and return the mesh as it stood then
    pub fn wait_timeout(self, timeout: Duration) -> Result<OptimizationOutput> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(remaining) {
                Ok(PipelineEvent::Finished(output)) => return Ok(output),
                Ok(PipelineEvent::Failed(err)) => return Err(err),
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) => {
                    log::debug!("optimization timed out after {:?}, cancelling", timeout);
                    self.cancel();
                    return self.wait();
                }
                Err(RecvTimeoutError::Disconnected) => return Err(worker_gone()),
            }
        }
    }
}

impl Drop for OptimizationHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn worker_gone() -> Error {
    Error::Worker("worker exited without reporting a result".to_string())
}

fn run_job(
    mesh: TriangleMesh,
    config: OptimizerConfig,
    cancel: CancellationToken,
    events: Sender<PipelineEvent>,
) {
    let event = match optimize_mesh(&mesh, &config, &cancel, &events) {
        Ok(output) => PipelineEvent::Finished(output),
        Err(err) => {
            log::warn!("optimization failed: {}", err);
            PipelineEvent::Failed(err)
        }
    };
    if events.send(event).is_err() {
        log::warn!("optimization result dropped: the handle is gone");
    }
}

fn optimize_mesh(
    input: &TriangleMesh,
    config: &OptimizerConfig,
    cancel: &CancellationToken,
    events: &Sender<PipelineEvent>,
) -> Result<OptimizationOutput> {
    let start = Instant::now();
    let mesh = Mesh::load(input)?;

    let loaded = PipelineEvent::Loaded {
        triangle_count: mesh.triangle_count(),
        vertex_count: mesh.vertex_count(),
    };
    if events.send(loaded).is_err() {
        log::debug!("handle dropped before the run started, cancelling");
        cancel.cancel();
    }

    let cancel = match config.time_limit {
        Some(limit) => cancel.with_deadline(start + limit),
        None => cancel.clone(),
    };

    let simplified = decimate_loaded(input, mesh, config, &cancel, &mut |update| {
        if events.send(PipelineEvent::Progress(update)).is_err() {
            cancel.cancel();
        }
    })?;

    let decimation = simplified.report;
    let report = OptimizationReport {
        initial_triangle_count: decimation.initial_triangle_count,
        final_triangle_count: decimation.final_triangle_count,
        vertex_count: decimation.final_vertex_count,
        status: decimation.status,
        collapses: decimation.collapses,
        rejected_collapses: decimation.rejected,
        elapsed: start.elapsed(),
    };
    log::info!(
        "optimization {} in {:?}: {} -> {} triangles, {} vertices",
        report.status,
        report.elapsed,
        report.initial_triangle_count,
        report.final_triangle_count,
        report.vertex_count
    );
    Ok(OptimizationOutput {
        mesh: simplified.mesh,
        report,
    })
}
