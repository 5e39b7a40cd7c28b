//! Mesh simplification to a triangle budget
//!
//! Quadric error edge-collapse decimation built from small parts:
//! - [`Mesh`]: arena mesh that supports in-place edge collapses
//! - [`QuadricMetric`]: per-vertex quadrics and collapse costs
//! - [`CollapseScheduler`]: priority queue with lazy invalidation
//! - [`Validator`]: manifold and fold checks
//! - [`DecimationEngine`]: the collapse loop
//!
//! [`QuadricSimplifier`] and [`decimate`] wrap them for one-shot use.

pub mod control;
pub mod engine;
pub mod mesh;
pub mod quadric;
pub mod scheduler;
pub mod simplifier;
pub mod validator;

#[cfg(test)]
mod test_meshes;

pub use control::*;
pub use engine::*;
pub use mesh::*;
pub use quadric::*;
pub use scheduler::*;
pub use simplifier::*;
pub use validator::*;
