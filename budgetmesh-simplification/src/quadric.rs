//! Quadric error metric
//!
//! Every vertex carries a symmetric 4x4 form summing the squared distances to
//! the planes of the triangles merged into it (Garland & Heckbert, 1997).
//! The cost of collapsing an edge is the value of the summed form at the
//! position that minimizes it.

use crate::mesh::{is_finite, Mesh, VertexId};
use crate::scheduler::Candidate;
use budgetmesh_core::{to_f32, to_f64, Point3d, Point3f, Vector3d};
use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};
use std::ops::{Add, AddAssign};

/// Determinant threshold, relative to the cube of the matrix norm, below
/// which the minimizing system counts as singular
const CONDITION_EPSILON: f64 = 1e-10;

/// Weight of the squared edge length added to a candidate's queue priority.
/// Keeps zero-cost regions from collapsing repeatedly into one survivor.
pub const EDGE_LENGTH_BIAS: f64 = 1e-6;

/// Symmetric 4x4 quadratic form
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadric(Matrix4<f64>);

impl Quadric {
    pub fn zero() -> Self {
        Self(Matrix4::zeros())
    }

    /// Quadric of the plane `ax + by + cz + d = 0` with unit normal
    pub fn from_plane(plane: &Vector4<f64>) -> Self {
        let (a, b, c, d) = (plane[0], plane[1], plane[2], plane[3]);
        let m = Matrix4::new(
            a * a, a * b, a * c, a * d,
            a * b, b * b, b * c, b * d,
            a * c, b * c, c * c, c * d,
            a * d, b * d, c * d, d * d,
        );
        Self(m)
    }

    /// Quadric of a triangle's supporting plane; zero for degenerate triangles
    pub fn from_triangle(p0: &Point3d, p1: &Point3d, p2: &Point3d) -> Self {
        match plane_through(p0, &(p1 - p0).cross(&(p2 - p0))) {
            Some(plane) => Self::from_plane(&plane),
            None => Self::zero(),
        }
    }

    pub fn scaled(self, weight: f64) -> Self {
        Self(self.0 * weight)
    }

    /// Value of the form at `p`, clamped to be non-negative.
    /// Infinite when the value is not a number.
    pub fn evaluate(&self, p: &Point3d) -> f64 {
        let v = Vector4::new(p.x, p.y, p.z, 1.0);
        let value = (v.transpose() * self.0 * v)[0];
        if value.is_nan() {
            f64::INFINITY
        } else {
            value.max(0.0)
        }
    }

    /// Position minimizing the form, if the linear system is well conditioned
    pub fn minimizer(&self) -> Option<Point3d> {
        let a: Matrix3<f64> = self.0.fixed_view::<3, 3>(0, 0).into_owned();
        let b: Vector3<f64> = self.0.fixed_view::<3, 1>(0, 3).into_owned();

        let scale = a.norm();
        if scale <= f64::EPSILON {
            return None;
        }
        if a.determinant().abs() <= CONDITION_EPSILON * scale * scale * scale {
            return None;
        }

        let x = a.lu().solve(&(-b))?;
        if x.iter().all(|c| c.is_finite()) {
            Some(Point3d::from(x))
        } else {
            None
        }
    }
}

impl Default for Quadric {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for Quadric {
    type Output = Quadric;

    fn add(self, rhs: Quadric) -> Quadric {
        Quadric(self.0 + rhs.0)
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, rhs: Quadric) {
        self.0 += rhs.0;
    }
}

/// Plane through `origin` with the given (unnormalized) normal
fn plane_through(origin: &Point3d, normal: &Vector3d) -> Option<Vector4<f64>> {
    let n = normal.try_normalize(f64::EPSILON)?;
    let d = -n.dot(&origin.coords);
    Some(Vector4::new(n.x, n.y, n.z, d))
}

/// Minimizer of `q` rounded to `f32`, or the midpoint of `pa` and `pb`
fn placement(q: &Quadric, pa: &Point3d, pb: &Point3d) -> Point3f {
    q.minimizer()
        .map(|p| to_f32(&p))
        .filter(is_finite)
        .unwrap_or_else(|| to_f32(&Point3d::from((pa.coords + pb.coords) * 0.5)))
}

/// Per-vertex quadrics and the collapse cost derived from them.
#[derive(Debug, Clone)]
pub struct QuadricMetric {
    quadrics: Vec<Quadric>,
}

impl QuadricMetric {
    /// Accumulate the initial quadrics of every vertex.
    ///
    /// Boundary edges additionally contribute a constraint plane that contains
    /// the edge and stands perpendicular to its triangle, weighted by
    /// `boundary_weight`.
    pub fn new(mesh: &Mesh, boundary_weight: f64) -> Self {
        let mut quadrics = vec![Quadric::zero(); mesh.vertex_capacity()];

        for t in mesh.triangle_ids() {
            let tri = mesh.triangle(t);
            let p = tri.map(|v| to_f64(mesh.position(v)));
            let q = Quadric::from_triangle(&p[0], &p[1], &p[2]);
            for v in tri {
                quadrics[v] += q;
            }

            if boundary_weight <= 0.0 {
                continue;
            }
            let face_normal = (p[1] - p[0]).cross(&(p[2] - p[0]));
            for j in 0..3 {
                let (u, v) = (tri[j], tri[(j + 1) % 3]);
                if !mesh.is_boundary_edge(u, v) {
                    continue;
                }
                let edge = p[(j + 1) % 3] - p[j];
                if let Some(plane) = plane_through(&p[j], &edge.cross(&face_normal)) {
                    let q = Quadric::from_plane(&plane).scaled(boundary_weight);
                    quadrics[u] += q;
                    quadrics[v] += q;
                }
            }
        }

        Self { quadrics }
    }

    pub fn quadric(&self, v: VertexId) -> &Quadric {
        &self.quadrics[v]
    }

    /// Price the collapse of edge `(a, b)`.
    ///
    /// The candidate is normalized so that the lower id survives. The target is
    /// the minimizer of the summed quadric, or the edge midpoint when that
    /// system is singular or its solution does not fit in an `f32`. The queue
    /// priority adds [`EDGE_LENGTH_BIAS`] times the squared edge length to the
    /// cost.
    pub fn evaluate(&self, mesh: &Mesh, a: VertexId, b: VertexId) -> Candidate {
        let (a, b) = (a.min(b), a.max(b));
        let q = self.quadrics[a] + self.quadrics[b];
        let pa = to_f64(mesh.position(a));
        let pb = to_f64(mesh.position(b));

        // Price the position that will actually be stored
        let target = placement(&q, &pa, &pb);
        let cost = q.evaluate(&to_f64(&target));
        let priority = cost + EDGE_LENGTH_BIAS * (pb - pa).norm_squared();

        Candidate {
            a,
            b,
            target,
            cost,
            priority,
        }
    }

    /// Fold the removed vertex's quadric into the survivor
    pub fn merge(&mut self, survivor: VertexId, removed: VertexId) {
        let q = self.quadrics[removed];
        self.quadrics[survivor] += q;
        self.quadrics[removed] = Quadric::zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_meshes::*;
    use approx::assert_relative_eq;

    fn axis_plane(axis: usize, offset: f64) -> Quadric {
        let mut plane = Vector4::zeros();
        plane[axis] = 1.0;
        plane[3] = -offset;
        Quadric::from_plane(&plane)
    }

    #[test]
    fn test_plane_distance() {
        let q = axis_plane(2, 1.0);
        assert_relative_eq!(q.evaluate(&Point3d::new(5.0, -3.0, 1.0)), 0.0);
        assert_relative_eq!(q.evaluate(&Point3d::new(0.0, 0.0, 3.0)), 4.0);
    }

    #[test]
    fn test_corner_minimizer() {
        let q = axis_plane(0, 1.0) + axis_plane(1, 2.0) + axis_plane(2, 3.0);
        let p = q.minimizer().unwrap();
        assert_relative_eq!(p, Point3d::new(1.0, 2.0, 3.0), epsilon = 1e-9);
        assert_relative_eq!(q.evaluate(&p), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_nan_cost_is_infinite() {
        let q = axis_plane(0, 1.0);
        assert_eq!(q.evaluate(&Point3d::new(f64::NAN, 0.0, 0.0)), f64::INFINITY);
    }

    #[test]
    fn test_out_of_range_minimizer_falls_back_to_midpoint() {
        // Solvable in f64, but the solution overflows an f32
        let q = axis_plane(0, 1e39) + axis_plane(1, 0.0) + axis_plane(2, 0.0);
        assert!(q.minimizer().is_some());
        let target = placement(&q, &Point3d::new(0.0, 0.0, 0.0), &Point3d::new(2.0, 0.0, 0.0));
        assert_eq!(target, Point3f::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_priority_prefers_short_edges() {
        let mesh = Mesh::load(&plane_grid(4)).unwrap();
        let metric = QuadricMetric::new(&mesh, 0.0);
        let axis = metric.evaluate(&mesh, 5, 6);
        let diagonal = metric.evaluate(&mesh, 6, 9);
        assert_eq!(mesh.edge_triangles(6, 9).len(), 2);
        assert_relative_eq!(axis.cost, diagonal.cost, epsilon = 1e-12);
        assert_relative_eq!(axis.priority, axis.cost + EDGE_LENGTH_BIAS);
        assert!(axis.priority < diagonal.priority);
    }

    #[test]
    fn test_singular_system() {
        // Two parallel planes leave a whole plane of minimizers
        let q = axis_plane(2, 0.0) + axis_plane(2, 1.0);
        assert!(q.minimizer().is_none());
        assert!(Quadric::zero().minimizer().is_none());
    }

    #[test]
    fn test_degenerate_triangle_contributes_nothing() {
        let p = Point3d::new(1.0, 1.0, 1.0);
        let q = Quadric::from_triangle(
            &p,
            &Point3d::new(2.0, 2.0, 2.0),
            &Point3d::new(3.0, 3.0, 3.0),
        );
        assert_eq!(q, Quadric::zero());
    }

    #[test]
    fn test_flat_interior_edge_is_free() {
        let mesh = Mesh::load(&plane_grid(4)).unwrap();
        let metric = QuadricMetric::new(&mesh, 100.0);
        let c = metric.evaluate(&mesh, 6, 5);
        assert_eq!((c.a, c.b), (5, 6));
        assert_relative_eq!(c.cost, 0.0, epsilon = 1e-12);
        // Flat neighbourhood is singular, so the midpoint is used
        assert_relative_eq!(c.target, Point3f::new(1.5, 1.0, 0.0));
    }

    #[test]
    fn test_boundary_edges_are_expensive() {
        let mesh = Mesh::load(&plane_grid(4)).unwrap();
        let metric = QuadricMetric::new(&mesh, 100.0);
        // Border vertex 1 pulled inward pays for its constraint planes
        let border_to_inside = metric.evaluate(&mesh, 1, 5);
        let inside = metric.evaluate(&mesh, 5, 6);
        assert!(border_to_inside.cost >= inside.cost);

        let unweighted = QuadricMetric::new(&mesh, 0.0);
        assert_relative_eq!(unweighted.evaluate(&mesh, 1, 5).cost, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_curved_surface_costs_positive() {
        let mesh = Mesh::load(&curved_surface(8)).unwrap();
        let metric = QuadricMetric::new(&mesh, 0.0);
        let mut positive = 0;
        for (a, b) in mesh.edges() {
            let c = metric.evaluate(&mesh, a, b);
            assert!(c.cost >= 0.0);
            assert!(c.target.coords.iter().all(|x| x.is_finite()));
            if c.cost > 1e-9 {
                positive += 1;
            }
        }
        assert!(positive > 0);
    }

    #[test]
    fn test_merge() {
        let mesh = Mesh::load(&tetrahedron()).unwrap();
        let mut metric = QuadricMetric::new(&mesh, 0.0);
        let expected = *metric.quadric(0) + *metric.quadric(1);
        metric.merge(0, 1);
        assert_eq!(*metric.quadric(0), expected);
        assert_eq!(*metric.quadric(1), Quadric::zero());
    }

    #[test]
    fn test_evaluate_deterministic() {
        let mesh = Mesh::load(&curved_surface(6)).unwrap();
        let metric = QuadricMetric::new(&mesh, 100.0);
        for (a, b) in mesh.edges() {
            let first = metric.evaluate(&mesh, a, b);
            let second = metric.evaluate(&mesh, b, a);
            assert_eq!(first.cost.to_bits(), second.cost.to_bits());
            assert_eq!(first.target, second.target);
        }
    }
}
