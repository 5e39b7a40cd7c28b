//! Budget-driven decimation
//!
//! The engine repeatedly collapses the cheapest valid edge until the mesh fits
//! the triangle budget, the queue runs dry, or the caller cancels.

use crate::control::{CancellationToken, ProgressUpdate};
use crate::mesh::{Mesh, VertexId};
use crate::quadric::QuadricMetric;
use crate::scheduler::{Candidate, CollapseScheduler};
use crate::validator::Validator;
use budgetmesh_core::{OptimizerConfig, Result};
use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

/// How a decimation run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecimationStatus {
    /// The mesh fits the budget
    Completed,
    /// No acceptable collapse is left and the mesh is still over budget
    BudgetUnreachable,
    /// Stopped on request; the mesh is in its last valid state
    Cancelled,
}

impl fmt::Display for DecimationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecimationStatus::Completed => "completed",
            DecimationStatus::BudgetUnreachable => "budget unreachable",
            DecimationStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Finished(DecimationStatus),
}

/// Outcome of [`DecimationEngine::run`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimationReport {
    pub status: DecimationStatus,
    pub initial_triangle_count: usize,
    pub final_triangle_count: usize,
    /// Live vertices referenced by at least one triangle
    pub final_vertex_count: usize,
    pub collapses: usize,
    /// Candidates refused by the validator
    pub rejected: usize,
    /// Queue entries discarded because an endpoint had changed
    pub stale_skipped: usize,
}

/// Quadric edge-collapse decimation of one mesh towards a triangle budget.
///
/// A pair the validator refuses is never queued again during the run.
pub struct DecimationEngine {
    mesh: Mesh,
    metric: QuadricMetric,
    validator: Validator,
    scheduler: CollapseScheduler,
    budget: usize,
    max_error: Option<f64>,
    progress_interval: usize,
    state: EngineState,
    initial_triangle_count: usize,
    collapses: usize,
    rejected: usize,
    /// Only queried for membership, never iterated
    rejected_pairs: HashSet<(VertexId, VertexId)>,
}

impl DecimationEngine {
    /// Build quadrics and queue every collapsible edge.
    ///
    /// Edges touching a locked vertex are never queued.
    pub fn new(mesh: Mesh, config: &OptimizerConfig) -> Result<Self> {
        config.validate()?;

        let metric = QuadricMetric::new(&mesh, config.boundary_weight);
        let mut scheduler = CollapseScheduler::new(mesh.vertex_capacity());
        for (a, b) in mesh.edges() {
            if mesh.is_locked(a) || mesh.is_locked(b) {
                continue;
            }
            scheduler.push(metric.evaluate(&mesh, a, b));
        }
        log::debug!(
            "queued {} collapse candidates for {} triangles (budget {})",
            scheduler.len(),
            mesh.triangle_count(),
            config.target_triangle_budget
        );

        Ok(Self {
            initial_triangle_count: mesh.triangle_count(),
            validator: Validator::new(config),
            metric,
            scheduler,
            mesh,
            budget: config.target_triangle_budget,
            max_error: config.max_error,
            progress_interval: config.progress_interval_collapses,
            state: EngineState::Idle,
            collapses: 0,
            rejected: 0,
            rejected_pairs: HashSet::new(),
        })
    }

    /// Collapse edges until the budget is met, nothing acceptable is left,
    /// or `cancel` fires.
    ///
    /// `progress` is called every `progress_interval_collapses` collapses.
    /// Calling `run` on a finished engine returns the same report again.
    pub fn run(
        &mut self,
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> DecimationReport {
        if let EngineState::Finished(status) = self.state {
            return self.report(status);
        }

        self.state = EngineState::Running;
        let start = Instant::now();
        log::info!(
            "decimating {} triangles to a budget of {}",
            self.initial_triangle_count,
            self.budget
        );

        let status = self.collapse_until_done(cancel, progress);
        self.state = EngineState::Finished(status);

        let report = self.report(status);
        log::info!(
            "decimation {} after {:?}: {} -> {} triangles, {} collapses, {} rejected",
            status,
            start.elapsed(),
            report.initial_triangle_count,
            report.final_triangle_count,
            report.collapses,
            report.rejected
        );
        report
    }

    /// [`run`](Self::run) without cancellation or progress reporting
    pub fn run_to_completion(&mut self) -> DecimationReport {
        self.run(&CancellationToken::new(), &mut |_| {})
    }

    fn collapse_until_done(
        &mut self,
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> DecimationStatus {
        while self.mesh.triangle_count() > self.budget {
            if cancel.is_cancelled() {
                return DecimationStatus::Cancelled;
            }

            let Some(candidate) = self.scheduler.pop_cheapest() else {
                return DecimationStatus::BudgetUnreachable;
            };
            if let Some(max_error) = self.max_error {
                if candidate.cost > max_error {
                    log::trace!(
                        "collapse ({}, {}) costs {:.3e}, above the limit of {:.3e}",
                        candidate.a,
                        candidate.b,
                        candidate.cost,
                        max_error
                    );
                    continue;
                }
            }

            if !self.try_collapse(&candidate) {
                continue;
            }

            self.collapses += 1;
            if self.collapses % self.progress_interval == 0 {
                let update = self.progress_update();
                log::debug!(
                    "{} collapses, {} triangles left",
                    update.collapses,
                    update.triangle_count
                );
                progress(update);
            }
        }
        DecimationStatus::Completed
    }

    fn try_collapse(&mut self, candidate: &Candidate) -> bool {
        let Candidate { a, b, target, .. } = *candidate;

        let outcome = self
            .validator
            .check_geometry(&self.mesh, a, b, &target)
            .map_err(Into::into)
            .and_then(|()| self.mesh.collapse_edge(a, b, target));
        if let Err(err) = outcome {
            log::trace!("collapse ({}, {}) refused: {}", a, b, err);
            self.rejected += 1;
            self.rejected_pairs.insert(candidate.pair());
            return false;
        }

        self.metric.merge(a, b);
        self.scheduler.invalidate(a);
        self.scheduler.invalidate(b);
        self.requeue_edges_of(a);
        true
    }

    fn requeue_edges_of(&mut self, v: VertexId) {
        for n in self.mesh.neighbors(v) {
            if self.mesh.is_locked(n) || self.rejected_pairs.contains(&(v.min(n), v.max(n))) {
                continue;
            }
            let candidate = self.metric.evaluate(&self.mesh, v, n);
            self.scheduler.push(candidate);
        }
    }

    fn progress_update(&self) -> ProgressUpdate {
        ProgressUpdate {
            collapses: self.collapses,
            triangle_count: self.mesh.triangle_count(),
            initial_triangle_count: self.initial_triangle_count,
            target_triangle_count: self.budget,
        }
    }

    fn report(&self, status: DecimationStatus) -> DecimationReport {
        DecimationReport {
            status,
            initial_triangle_count: self.initial_triangle_count,
            final_triangle_count: self.mesh.triangle_count(),
            final_vertex_count: self.mesh.vertex_count(),
            collapses: self.collapses,
            rejected: self.rejected,
            stale_skipped: self.scheduler.stale_skipped(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn into_mesh(self) -> Mesh {
        self.mesh
    }
}
