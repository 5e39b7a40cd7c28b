//! Optimizer configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration shared by the decimation engine and the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Maximum number of triangles the output may contain
    pub target_triangle_budget: usize,
    /// Largest allowed rotation of a triangle normal caused by one collapse
    pub normal_flip_threshold_degrees: f64,
    /// Triangles whose area falls below this after a collapse count as folded
    pub area_epsilon: f64,
    /// Emit a progress event every this many collapses
    pub progress_interval_collapses: usize,
    /// Weight of the constraint planes that keep open borders in place
    pub boundary_weight: f64,
    /// Collapses costing more than this are never applied
    pub max_error: Option<f64>,
    /// Wall-clock limit after which a run is cancelled
    pub time_limit: Option<Duration>,
    /// Worker threads for the pipeline (None = automatic)
    pub worker_threads: Option<usize>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            target_triangle_budget: 50_000,
            normal_flip_threshold_degrees: 60.0,
            area_epsilon: 1e-9,
            progress_interval_collapses: 500,
            boundary_weight: 100.0,
            max_error: None,
            time_limit: None,
            worker_threads: None,
        }
    }
}

impl OptimizerConfig {
    /// Create a default configuration with the given triangle budget
    pub fn with_budget(budget: usize) -> Self {
        Self {
            target_triangle_budget: budget,
            ..Self::default()
        }
    }

    /// Set the normal flip threshold in degrees
    pub fn with_normal_flip_threshold(mut self, degrees: f64) -> Self {
        self.normal_flip_threshold_degrees = degrees;
        self
    }

    /// Set the degenerate-area threshold
    pub fn with_area_epsilon(mut self, epsilon: f64) -> Self {
        self.area_epsilon = epsilon;
        self
    }

    /// Set how many collapses separate two progress events
    pub fn with_progress_interval(mut self, collapses: usize) -> Self {
        self.progress_interval_collapses = collapses;
        self
    }

    /// Set the boundary constraint weight
    pub fn with_boundary_weight(mut self, weight: f64) -> Self {
        self.boundary_weight = weight;
        self
    }

    /// Set the maximum accepted collapse cost
    pub fn with_max_error(mut self, max_error: f64) -> Self {
        self.max_error = Some(max_error);
        self
    }

    /// Set the wall-clock limit for a run
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Set the number of pipeline worker threads
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    /// Cosine of the normal flip threshold
    pub fn min_normal_cosine(&self) -> f64 {
        self.normal_flip_threshold_degrees.to_radians().cos()
    }

    /// Check every field against its allowed range
    pub fn validate(&self) -> Result<()> {
        if self.target_triangle_budget == 0 {
            return Err(Error::InvalidConfig(
                "target_triangle_budget must be positive".to_string(),
            ));
        }
        let threshold = self.normal_flip_threshold_degrees;
        if !threshold.is_finite() || threshold <= 0.0 || threshold > 180.0 {
            return Err(Error::InvalidConfig(format!(
                "normal_flip_threshold_degrees must be in (0, 180], got {}",
                threshold
            )));
        }
        if !self.area_epsilon.is_finite() || self.area_epsilon < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "area_epsilon must be finite and non-negative, got {}",
                self.area_epsilon
            )));
        }
        if self.progress_interval_collapses == 0 {
            return Err(Error::InvalidConfig(
                "progress_interval_collapses must be positive".to_string(),
            ));
        }
        if !self.boundary_weight.is_finite() || self.boundary_weight < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "boundary_weight must be finite and non-negative, got {}",
                self.boundary_weight
            )));
        }
        if let Some(max_error) = self.max_error {
            if max_error.is_nan() || max_error < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "max_error must be non-negative, got {}",
                    max_error
                )));
            }
        }
        if self.worker_threads == Some(0) {
            return Err(Error::InvalidConfig(
                "worker_threads must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}
