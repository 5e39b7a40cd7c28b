//! Cooperative cancellation and progress reporting

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared cancellation flag with an optional wall-clock deadline.
///
/// Clones share the flag, so a caller can keep one half and hand the other to
/// a running engine. The engine polls it once per iteration.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation for every clone of this token
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// True once cancelled or once the deadline has passed
    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::Acquire) {
            return true;
        }
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }

    /// A clone sharing this flag that also expires at `deadline`
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        };
        Self {
            flag: Arc::clone(&self.flag),
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Snapshot handed to the progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub collapses: usize,
    pub triangle_count: usize,
    pub initial_triangle_count: usize,
    pub target_triangle_count: usize,
}

impl ProgressUpdate {
    /// Share of the triangles to remove that are already gone, in [0, 1]
    pub fn fraction(&self) -> f32 {
        let to_remove = self
            .initial_triangle_count
            .saturating_sub(self.target_triangle_count);
        if to_remove == 0 {
            return 1.0;
        }
        let removed = self
            .initial_triangle_count
            .saturating_sub(self.triangle_count);
        (removed as f32 / to_remove as f32).min(1.0)
    }
}
