//! Synchronous simplification entry points

use crate::control::{CancellationToken, ProgressUpdate};
use crate::engine::{DecimationEngine, DecimationReport, DecimationStatus};
use crate::mesh::Mesh;
use budgetmesh_core::{Error, OptimizerConfig, Result, TriangleMesh};

/// A simplified mesh together with how it was obtained
#[derive(Debug, Clone)]
pub struct Simplified {
    pub mesh: TriangleMesh,
    pub report: DecimationReport,
}

/// Reduce a mesh to a triangle budget
pub trait MeshSimplifier {
    /// Simplify `mesh` until it has at most `budget` triangles, or as close
    /// as the topology allows
    fn simplify(&self, mesh: &TriangleMesh, budget: usize) -> Result<Simplified>;

    /// Simplify with a target reduction ratio (0.0 = no reduction, 1.0 = maximum reduction)
    fn simplify_by_ratio(&self, mesh: &TriangleMesh, reduction_ratio: f32) -> Result<Simplified> {
        if mesh.is_empty() {
            return Err(Error::malformed("mesh is empty"));
        }
        if !(0.0..=1.0).contains(&reduction_ratio) {
            return Err(Error::InvalidConfig(format!(
                "reduction ratio must be between 0.0 and 1.0, got {}",
                reduction_ratio
            )));
        }
        let budget = ((1.0 - reduction_ratio) * mesh.face_count() as f32) as usize;
        self.simplify(mesh, budget.max(1))
    }
}

/// Quadric error metric edge-collapse simplifier
#[derive(Debug, Clone, Default)]
pub struct QuadricSimplifier {
    config: OptimizerConfig,
}

impl QuadricSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` for every setting except the budget
    pub fn with_config(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}

impl MeshSimplifier for QuadricSimplifier {
    fn simplify(&self, mesh: &TriangleMesh, budget: usize) -> Result<Simplified> {
        let config = OptimizerConfig {
            target_triangle_budget: budget,
            ..self.config.clone()
        };
        decimate(mesh, &config, &CancellationToken::new(), &mut |_| {})
    }
}

/// Load, decimate and export one mesh.
///
/// A mesh that already fits the budget comes back unchanged with zero
/// collapses. Fails with [`Error::MalformedMesh`] or [`Error::InvalidConfig`]
/// before any work is done.
pub fn decimate(
    input: &TriangleMesh,
    config: &OptimizerConfig,
    cancel: &CancellationToken,
    progress: &mut dyn FnMut(ProgressUpdate),
) -> Result<Simplified> {
    config.validate()?;
    let mesh = Mesh::load(input)?;
    decimate_loaded(input, mesh, config, cancel, progress)
}

/// [`decimate`] for a `mesh` already loaded from `input`.
///
/// A run cancelled before it starts also returns `input` unchanged, with
/// status `Cancelled`.
pub fn decimate_loaded(
    input: &TriangleMesh,
    mesh: Mesh,
    config: &OptimizerConfig,
    cancel: &CancellationToken,
    progress: &mut dyn FnMut(ProgressUpdate),
) -> Result<Simplified> {
    config.validate()?;

    if mesh.triangle_count() <= config.target_triangle_budget {
        log::debug!(
            "{} triangles already within the budget of {}",
            mesh.triangle_count(),
            config.target_triangle_budget
        );
        return Ok(unchanged(input, &mesh, DecimationStatus::Completed));
    }
    if cancel.is_cancelled() {
        return Ok(unchanged(input, &mesh, DecimationStatus::Cancelled));
    }

    let mut engine = DecimationEngine::new(mesh, config)?;
    let report = engine.run(cancel, progress);
    Ok(Simplified {
        mesh: engine.into_mesh().to_triangle_mesh(),
        report,
    })
}

fn unchanged(input: &TriangleMesh, mesh: &Mesh, status: DecimationStatus) -> Simplified {
    let triangle_count = mesh.triangle_count();
    Simplified {
        mesh: input.clone(),
        report: DecimationReport {
            status,
            initial_triangle_count: triangle_count,
            final_triangle_count: triangle_count,
            final_vertex_count: mesh.vertex_count(),
            collapses: 0,
            rejected: 0,
            stale_skipped: 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_meshes::*;
    use crate::validator::Validator;
    use budgetmesh_core::{Point3f, Vector3f};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_simplify_to_budget() {
        let s = QuadricSimplifier::new();
        let mesh = curved_surface(12);
        let result = s.simplify(&mesh, 100).unwrap();
        assert_eq!(result.report.status, DecimationStatus::Completed);
        assert!(result.mesh.face_count() <= 100);
        assert_eq!(result.report.final_triangle_count, result.mesh.face_count());
        assert!(result.mesh.vertex_count() < mesh.vertex_count());
    }

    #[test]
    fn test_within_budget_returns_input() {
        let s = QuadricSimplifier::new();
        let mesh = tetrahedron();
        let result = s.simplify(&mesh, 4).unwrap();
        assert_eq!(result.mesh, mesh);
        assert_eq!(result.report.collapses, 0);
        assert_eq!(result.report.status, DecimationStatus::Completed);
    }

    #[test]
    fn test_empty_mesh() {
        let s = QuadricSimplifier::new();
        let mesh = TriangleMesh::new();
        assert!(s.simplify_by_ratio(&mesh, 0.5).is_err());
        assert_eq!(s.simplify(&mesh, 10).unwrap().mesh, mesh);
    }

    #[test]
    fn test_invalid_reduction_ratio() {
        let s = QuadricSimplifier::new();
        let mesh = single_triangle();
        assert!(s.simplify_by_ratio(&mesh, -0.1).is_err());
        assert!(s.simplify_by_ratio(&mesh, 1.1).is_err());
    }

    #[test]
    fn test_reduction_ratio() {
        let s = QuadricSimplifier::new();
        let mesh = plane_grid(9);
        assert_eq!(s.simplify_by_ratio(&mesh, 0.0).unwrap().mesh, mesh);

        let half = s.simplify_by_ratio(&mesh, 0.5).unwrap();
        assert!(half.mesh.face_count() <= 64);
        assert_eq!(half.report.status, DecimationStatus::Completed);
    }

    #[test]
    fn test_cancelled_before_start_returns_input() {
        let mesh = plane_grid(8);
        let token = CancellationToken::new();
        token.cancel();
        let config = OptimizerConfig::with_budget(10);
        let result = decimate(&mesh, &config, &token, &mut |_| {}).unwrap();
        assert_eq!(result.report.status, DecimationStatus::Cancelled);
        assert_eq!(result.report.collapses, 0);
        assert_eq!(result.report.final_vertex_count, 64);
        assert_eq!(result.mesh, mesh);
    }

    #[test]
    fn test_vertex_count_ignores_unreferenced_vertices() {
        let mut mesh = single_triangle();
        mesh.vertices.push(Point3f::new(9.0, 9.0, 9.0));
        let result = QuadricSimplifier::new().simplify(&mesh, 1).unwrap();
        assert_eq!(result.mesh, mesh);
        assert_eq!(result.report.final_vertex_count, 3);
    }

    #[test]
    fn test_zero_budget_rejected() {
        let s = QuadricSimplifier::new();
        assert!(s.simplify(&plane_grid(4), 0).is_err());
    }

    #[test]
    fn test_malformed_input() {
        let mut mesh = single_triangle();
        mesh.faces.push([0, 1, 7]);
        let err = QuadricSimplifier::new().simplify(&mesh, 1).unwrap_err();
        assert!(matches!(err, Error::MalformedMesh(_)));
    }

    #[test]
    fn test_attributes_carried_through() {
        let mut mesh = curved_surface(8);
        let n = mesh.vertex_count();
        mesh.set_normals(vec![Vector3f::z(); n]);
        mesh.set_uvs((0..n).map(|i| [i as f32, 0.0]).collect());

        let result = QuadricSimplifier::new().simplify(&mesh, 40).unwrap();
        let out = result.mesh;
        let normals = out.normals.as_ref().unwrap();
        let uvs = out.uvs.as_ref().unwrap();
        assert_eq!(normals.len(), out.vertex_count());
        assert_eq!(uvs.len(), out.vertex_count());
        assert!(normals.iter().all(|n| (n.norm() - 1.0).abs() < 1e-5));
        assert!(uvs.iter().all(|uv| uv[0] >= 0.0 && uv[0] <= (n - 1) as f32));
    }

    #[test]
    fn test_noisy_surface_stays_manifold() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut mesh = curved_surface(16);
        for v in mesh.vertices.iter_mut() {
            *v += Point3f::new(0.0, 0.0, rng.gen_range(-0.05..0.05)).coords;
        }

        let result = QuadricSimplifier::new().simplify(&mesh, 120).unwrap();
        assert!(result.report.final_triangle_count <= result.report.initial_triangle_count);
        let reloaded = Mesh::load(&result.mesh).unwrap();
        assert!(Validator::is_manifold(&reloaded));
        assert_eq!(reloaded.triangle_count(), result.mesh.face_count());
    }
}
