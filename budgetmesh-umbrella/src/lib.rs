//! # budgetmesh
//!
//! Reduce triangle meshes to a fixed triangle budget.
//!
//! This is the umbrella crate that provides convenient access to all budgetmesh
//! functionality. You can use this crate to get everything in one place, or use
//! individual crates for more granular control over dependencies.
//!
//! ## Features
//!
//! - **Core**: Mesh buffers, configuration and errors
//! - **Simplification**: Quadric error edge-collapse decimation
//! - **Pipeline**: Background optimization with progress and cancellation
//!
//! ## Quick Start
//!
//! ```rust
//! use budgetmesh::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let positions = [
//!     0.0, 0.0, 0.0, //
//!     1.0, 0.0, 0.0, //
//!     1.0, 1.0, 0.0, //
//!     0.0, 1.0, 0.0,
//! ];
//! let mesh = TriangleMesh::from_buffers(&positions, &[0, 1, 2, 0, 2, 3])?;
//!
//! let optimizer = Optimizer::new(OptimizerConfig::with_budget(1))?;
//! let output = optimizer.optimize(mesh)?;
//! assert!(output.report.final_triangle_count <= output.report.initial_triangle_count);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables simplification and pipeline
//! - `simplification`: The decimation engine and its parts
//! - `pipeline`: The background optimizer (implies `simplification`)
//! - `all`: Enables all features

// Re-export core functionality
pub use budgetmesh_core::*;

// Re-export sub-crates
#[cfg(feature = "simplification")]
pub use budgetmesh_simplification as simplification;

#[cfg(feature = "pipeline")]
pub use budgetmesh_pipeline as pipeline;

/// Convenient imports for common use cases
pub mod prelude {
    pub use budgetmesh_core::{
        Error, OptimizerConfig, Point3f, Result, TriangleMesh, Vector3f,
    };

    #[cfg(feature = "simplification")]
    pub use budgetmesh_simplification::{
        CancellationToken, DecimationStatus, MeshSimplifier, ProgressUpdate, QuadricSimplifier,
    };

    #[cfg(feature = "pipeline")]
    pub use budgetmesh_pipeline::{
        OptimizationHandle, OptimizationOutput, OptimizationReport, Optimizer, PipelineEvent,
    };
}
