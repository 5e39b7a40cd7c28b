//! Collapse validation
//!
//! A collapse is only committed when it keeps the mesh edge-manifold and does
//! not fold or visibly flip any surviving triangle.

use crate::mesh::{is_finite, Mesh, VertexId};
use budgetmesh_core::{to_f64, OptimizerConfig, Point3f};
use thiserror::Error;

/// Why a collapse was refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    #[error("common neighbours differ from the edge's opposite vertices")]
    LinkCondition,

    #[error("collapse would duplicate an existing triangle")]
    DuplicateTriangle,

    #[error("collapse would merge two boundary loops")]
    BoundaryLoops,

    #[error("vertex lies on a non-manifold source edge")]
    LockedVertex,

    #[error("a triangle would fold to zero area")]
    Degenerate,

    #[error("a triangle normal would rotate past the flip threshold")]
    NormalFlip,

    #[error("collapse target is not a finite position")]
    NonFiniteTarget,
}

/// Failure of [`Mesh::collapse_edge`]. Never leaves the engine; a failed
/// collapse only discards its candidate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollapseError {
    #[error("edge ({a}, {b}) does not exist")]
    MissingEdge { a: VertexId, b: VertexId },

    #[error("vertex {0} has been removed")]
    DeadVertex(VertexId),

    #[error("collapse rejected: {0}")]
    Rejected(#[from] Rejection),
}

/// Checks a proposed collapse against manifoldness and geometric thresholds.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    min_normal_cosine: f64,
    area_epsilon: f64,
}

impl Validator {
    pub fn new(config: &OptimizerConfig) -> Self {
        Self {
            min_normal_cosine: config.min_normal_cosine(),
            area_epsilon: config.area_epsilon,
        }
    }

    /// Whether collapsing `b` into `a` at `target` is allowed
    pub fn can_collapse(&self, mesh: &Mesh, a: VertexId, b: VertexId, target: &Point3f) -> bool {
        self.check(mesh, a, b, target).is_ok()
    }

    /// Full check: topology first, then geometry
    pub fn check(
        &self,
        mesh: &Mesh,
        a: VertexId,
        b: VertexId,
        target: &Point3f,
    ) -> Result<(), CollapseError> {
        Self::check_topology(mesh, a, b)?;
        self.check_geometry(mesh, a, b, target)?;
        Ok(())
    }

    /// Topological part of the check; needs no thresholds.
    pub fn check_topology(mesh: &Mesh, a: VertexId, b: VertexId) -> Result<(), CollapseError> {
        if a == b {
            return Err(CollapseError::MissingEdge { a, b });
        }
        for v in [a, b] {
            if !mesh.is_vertex_alive(v) {
                return Err(CollapseError::DeadVertex(v));
            }
        }

        let shared = mesh.edge_triangles(a, b);
        if shared.is_empty() {
            return Err(CollapseError::MissingEdge { a, b });
        }
        if mesh.is_locked(a) || mesh.is_locked(b) {
            return Err(Rejection::LockedVertex.into());
        }
        if shared.len() > 2 {
            return Err(Rejection::LinkCondition.into());
        }

        // Link condition
        let mut apices: Vec<VertexId> = shared
            .iter()
            .flat_map(|&t| mesh.triangle(t))
            .filter(|&v| v != a && v != b)
            .collect();
        apices.sort_unstable();
        let common = sorted_intersection(&mesh.neighbors(a), &mesh.neighbors(b));
        if common != apices {
            return Err(Rejection::LinkCondition.into());
        }

        if shared.len() == 2 && mesh.is_boundary_vertex(a) && mesh.is_boundary_vertex(b) {
            return Err(Rejection::BoundaryLoops.into());
        }

        // b's surviving triangles become (a, x, y); a must not own one already
        for &tb in mesh.vertex_triangles(b) {
            if shared.contains(&tb) {
                continue;
            }
            let others: Vec<VertexId> = mesh
                .triangle(tb)
                .into_iter()
                .filter(|&v| v != b)
                .collect();
            let duplicate = mesh.vertex_triangles(a).iter().any(|&ta| {
                !shared.contains(&ta) && others.iter().all(|v| mesh.triangle(ta).contains(v))
            });
            if duplicate {
                return Err(Rejection::DuplicateTriangle.into());
            }
        }

        Ok(())
    }

    /// Geometric part of the check: the target must be finite, and every
    /// triangle that survives the collapse and moves must keep a non-zero
    /// area and roughly its orientation.
    ///
    /// Triangles that were already degenerate are not judged.
    pub fn check_geometry(
        &self,
        mesh: &Mesh,
        a: VertexId,
        b: VertexId,
        target: &Point3f,
    ) -> Result<(), Rejection> {
        if !is_finite(target) {
            return Err(Rejection::NonFiniteTarget);
        }
        let target = to_f64(target);

        for (moving, other) in [(a, b), (b, a)] {
            for &t in mesh.vertex_triangles(moving) {
                let tri = mesh.triangle(t);
                if tri.contains(&other) || mesh.triangle_area(t) < self.area_epsilon {
                    continue;
                }

                let mut after = tri.map(|v| to_f64(mesh.position(v)));
                for (slot, &v) in after.iter_mut().zip(tri.iter()) {
                    if v == moving {
                        *slot = target;
                    }
                }

                let n_before = mesh.triangle_normal(t);
                let n_after = (after[1] - after[0]).cross(&(after[2] - after[0]));
                let len_after = n_after.norm();

                // NaN compares false, so it is refused explicitly
                let area_after = len_after * 0.5;
                if area_after.is_nan() || area_after < self.area_epsilon {
                    return Err(Rejection::Degenerate);
                }
                let cosine = n_before.dot(&n_after) / (n_before.norm() * len_after);
                if cosine.is_nan() || cosine < self.min_normal_cosine {
                    return Err(Rejection::NormalFlip);
                }
            }
        }

        Ok(())
    }

    /// No live edge, apart from non-manifold edges inherited from the source,
    /// is shared by more than two triangles.
    pub fn is_manifold(mesh: &Mesh) -> bool {
        mesh.edges().into_iter().all(|(a, b)| {
            mesh.edge_triangles(a, b).len() <= 2 || (mesh.is_locked(a) && mesh.is_locked(b))
        })
    }
}

fn sorted_intersection(left: &[VertexId], right: &[VertexId]) -> Vec<VertexId> {
    let mut result = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match left[i].cmp(&right[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                result.push(left[i]);
                i += 1;
                j += 1;
            }
        }
    }
    result
}
