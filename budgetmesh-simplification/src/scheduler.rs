//! Collapse scheduling
//!
//! Candidates are ordered by priority, lowest first. Invalidation is lazy: a candidate
//! remembers the versions of its endpoints when it was pushed, and bumping a
//! vertex version turns every queued candidate touching that vertex stale.
//! Stale entries are dropped when they reach the top of the queue, so an
//! update never walks the whole queue.

use crate::mesh::VertexId;
use budgetmesh_core::Point3f;
use priority_queue::PriorityQueue;
use std::cmp::Ordering;

/// A proposed edge collapse: `b` merges into `a` at `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub a: VertexId,
    pub b: VertexId,
    pub target: Point3f,
    /// Geometric error of the collapse
    pub cost: f64,
    /// Queue key: the cost plus a small bias towards short edges
    pub priority: f64,
}

impl Candidate {
    /// Endpoint pair with the lower id first
    pub fn pair(&self) -> (VertexId, VertexId) {
        (self.a.min(self.b), self.a.max(self.b))
    }
}

#[derive(Debug, Clone)]
struct Entry {
    candidate: Candidate,
    stamp: (u32, u32),
    ticket: u64,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // The queue pops its greatest entry, so every key is reversed:
        // lowest priority, then lowest vertex pair, then oldest ticket.
        other
            .candidate
            .priority
            .total_cmp(&self.candidate.priority)
            .then_with(|| other.candidate.pair().cmp(&self.candidate.pair()))
            .then_with(|| other.ticket.cmp(&self.ticket))
    }
}

/// Min-priority queue of collapse candidates with lazy invalidation.
#[derive(Debug)]
pub struct CollapseScheduler {
    queue: PriorityQueue<u64, Entry>,
    versions: Vec<u32>,
    next_ticket: u64,
    stale_skipped: usize,
}

impl CollapseScheduler {
    pub fn new(vertex_count: usize) -> Self {
        Self {
            queue: PriorityQueue::new(),
            versions: vec![0; vertex_count],
            next_ticket: 0,
            stale_skipped: 0,
        }
    }

    /// Queue a candidate, stamped with its endpoints' current versions
    pub fn push(&mut self, candidate: Candidate) {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let stamp = (self.versions[candidate.a], self.versions[candidate.b]);
        self.queue.push(
            ticket,
            Entry {
                candidate,
                stamp,
                ticket,
            },
        );
    }

    /// Remove and return the lowest-priority candidate that is still current
    pub fn pop_cheapest(&mut self) -> Option<Candidate> {
        while let Some((_, entry)) = self.queue.pop() {
            if self.is_current(&entry) {
                return Some(entry.candidate);
            }
            self.stale_skipped += 1;
        }
        None
    }

    /// Mark every queued candidate touching `v` as stale
    pub fn invalidate(&mut self, v: VertexId) {
        self.versions[v] = self.versions[v].wrapping_add(1);
    }

    fn is_current(&self, entry: &Entry) -> bool {
        let c = &entry.candidate;
        entry.stamp == (self.versions[c.a], self.versions[c.b])
    }

    /// Queued entries, stale ones included
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of stale entries discarded so far
    pub fn stale_skipped(&self) -> usize {
        self.stale_skipped
    }
}
