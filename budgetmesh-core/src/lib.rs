//! Core data structures and traits for budgetmesh
//!
//! This crate provides the types every other budgetmesh crate speaks:
//! the vertex/index buffer pair exchanged with callers, point aliases,
//! the optimizer configuration and the error taxonomy.

pub mod config;
pub mod error;
pub mod mesh;
pub mod point;
pub mod traits;

pub use config::*;
pub use error::*;
pub use mesh::*;
pub use point::*;
pub use traits::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix3, Matrix4, Point3, Vector3, Vector4};
