//! # budgetmesh pipeline
//!
//! Runs mesh optimizations on a background worker pool. A submitted mesh is
//! loaded, counted, decimated when it exceeds the triangle budget and handed
//! back, with progress and the final result delivered over a channel.

pub mod parallel;
pub mod pipeline;

pub use parallel::*;
pub use pipeline::*;
