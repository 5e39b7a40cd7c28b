//! Collapsible mesh model
//!
//! Vertices and triangles live in flat arenas addressed by their index, which
//! doubles as their id. Adjacency is kept as one list of incident triangle ids
//! per vertex; vertex neighbourhoods are derived from it on demand. Removed
//! elements are flagged, never reused, so ids stay stable for the whole run.

use crate::validator::{CollapseError, Rejection, Validator};
use budgetmesh_core::{
    bounding_box_of, to_f64, Bounded, Error, Point3f, Result, TriangleMesh, Uv, Vector3d,
    Vector3f,
};
use std::collections::HashMap;

/// Index of a vertex in the mesh arena
pub type VertexId = usize;

/// Index of a triangle in the mesh arena
pub type TriangleId = usize;

/// Triangle mesh that supports in-place edge collapses.
#[derive(Debug, Clone)]
pub struct Mesh {
    positions: Vec<Point3f>,
    normals: Option<Vec<Vector3f>>,
    uvs: Option<Vec<Uv>>,
    vertex_removed: Vec<bool>,
    /// Endpoints of source edges shared by more than two triangles
    locked: Vec<bool>,
    triangles: Vec<[VertexId; 3]>,
    triangle_removed: Vec<bool>,
    /// Live incident triangles per vertex
    vertex_triangles: Vec<Vec<TriangleId>>,
    live_triangles: usize,
    non_manifold_edges: usize,
}

impl Mesh {
    /// Build the model from caller buffers.
    ///
    /// Fails with [`Error::MalformedMesh`] when a triangle references a vertex
    /// out of range or the same vertex twice, when a position is not finite,
    /// or when an attribute buffer does not match the vertex count.
    pub fn load(input: &TriangleMesh) -> Result<Self> {
        let nv = input.vertices.len();

        if let Some(normals) = &input.normals {
            if normals.len() != nv {
                return Err(Error::malformed(format!(
                    "{} normals for {} vertices",
                    normals.len(),
                    nv
                )));
            }
        }
        if let Some(uvs) = &input.uvs {
            if uvs.len() != nv {
                return Err(Error::malformed(format!(
                    "{} texture coordinates for {} vertices",
                    uvs.len(),
                    nv
                )));
            }
        }
        if let Some(vi) = input
            .vertices
            .iter()
            .position(|p| !is_finite(p))
        {
            return Err(Error::malformed(format!(
                "vertex {} has a non-finite position",
                vi
            )));
        }

        let mut vertex_triangles = vec![Vec::new(); nv];
        for (fi, face) in input.faces.iter().enumerate() {
            for &vi in face {
                if vi >= nv {
                    return Err(Error::malformed(format!(
                        "triangle {} references vertex {} but only {} vertices exist",
                        fi, vi, nv
                    )));
                }
            }
            if face[0] == face[1] || face[1] == face[2] || face[2] == face[0] {
                return Err(Error::malformed(format!(
                    "triangle {} references vertex {:?} more than once",
                    fi, face
                )));
            }
            for &vi in face {
                vertex_triangles[vi].push(fi);
            }
        }

        // Source edges with more than two triangles are left untouched
        let mut edge_use: HashMap<(VertexId, VertexId), u32> =
            HashMap::with_capacity(input.faces.len() * 3);
        for face in &input.faces {
            for j in 0..3 {
                let (u, v) = (face[j], face[(j + 1) % 3]);
                *edge_use.entry((u.min(v), u.max(v))).or_insert(0) += 1;
            }
        }
        let mut locked = vec![false; nv];
        let mut non_manifold_edges = 0;
        for (&(u, v), &count) in &edge_use {
            if count > 2 {
                locked[u] = true;
                locked[v] = true;
                non_manifold_edges += 1;
            }
        }
        if non_manifold_edges > 0 {
            log::warn!(
                "source mesh has {} non-manifold edges; their vertices are locked",
                non_manifold_edges
            );
        }

        Ok(Self {
            positions: input.vertices.clone(),
            normals: input.normals.clone(),
            uvs: input.uvs.clone(),
            vertex_removed: vec![false; nv],
            locked,
            triangles: input.faces.clone(),
            triangle_removed: vec![false; input.faces.len()],
            vertex_triangles,
            live_triangles: input.faces.len(),
            non_manifold_edges,
        })
    }

    /// Number of live triangles
    pub fn triangle_count(&self) -> usize {
        self.live_triangles
    }

    /// Number of live vertices referenced by at least one live triangle
    pub fn vertex_count(&self) -> usize {
        (0..self.positions.len())
            .filter(|&v| self.is_referenced(v))
            .count()
    }

    /// Size of the vertex arena, removed vertices included
    pub fn vertex_capacity(&self) -> usize {
        self.positions.len()
    }

    /// Number of non-manifold edges found in the source
    pub fn source_non_manifold_edges(&self) -> usize {
        self.non_manifold_edges
    }

    pub fn position(&self, v: VertexId) -> &Point3f {
        &self.positions[v]
    }

    pub fn normal(&self, v: VertexId) -> Option<&Vector3f> {
        self.normals.as_ref().map(|n| &n[v])
    }

    pub fn uv(&self, v: VertexId) -> Option<&Uv> {
        self.uvs.as_ref().map(|uv| &uv[v])
    }

    pub fn is_vertex_alive(&self, v: VertexId) -> bool {
        v < self.vertex_removed.len() && !self.vertex_removed[v]
    }

    pub fn is_triangle_alive(&self, t: TriangleId) -> bool {
        t < self.triangle_removed.len() && !self.triangle_removed[t]
    }

    /// Whether the vertex sits on a non-manifold source edge
    pub fn is_locked(&self, v: VertexId) -> bool {
        self.locked[v]
    }

    fn is_referenced(&self, v: VertexId) -> bool {
        !self.vertex_removed[v] && !self.vertex_triangles[v].is_empty()
    }

    /// Vertex ids of a triangle, in winding order
    pub fn triangle(&self, t: TriangleId) -> [VertexId; 3] {
        self.triangles[t]
    }

    /// Ids of all live triangles, ascending
    pub fn triangle_ids(&self) -> impl Iterator<Item = TriangleId> + '_ {
        (0..self.triangles.len()).filter(move |&t| !self.triangle_removed[t])
    }

    /// Live triangles incident to a vertex
    pub fn vertex_triangles(&self, v: VertexId) -> &[TriangleId] {
        &self.vertex_triangles[v]
    }

    /// Neighbouring vertices, sorted and unique
    pub fn neighbors(&self, v: VertexId) -> Vec<VertexId> {
        let mut result: Vec<VertexId> = self.vertex_triangles[v]
            .iter()
            .flat_map(|&t| self.triangles[t])
            .filter(|&u| u != v)
            .collect();
        result.sort_unstable();
        result.dedup();
        result
    }

    /// Live triangles containing both endpoints of an edge
    pub fn edge_triangles(&self, a: VertexId, b: VertexId) -> Vec<TriangleId> {
        self.vertex_triangles[a]
            .iter()
            .copied()
            .filter(|&t| self.triangles[t].contains(&b))
            .collect()
    }

    pub fn has_edge(&self, a: VertexId, b: VertexId) -> bool {
        a != b
            && self.vertex_triangles[a]
                .iter()
                .any(|&t| self.triangles[t].contains(&b))
    }

    /// An edge used by exactly one triangle
    pub fn is_boundary_edge(&self, a: VertexId, b: VertexId) -> bool {
        self.edge_triangles(a, b).len() == 1
    }

    /// A vertex with at least one incident boundary edge
    pub fn is_boundary_vertex(&self, v: VertexId) -> bool {
        let mut around: Vec<VertexId> = self.vertex_triangles[v]
            .iter()
            .flat_map(|&t| self.triangles[t])
            .filter(|&u| u != v)
            .collect();
        around.sort_unstable();

        // Each neighbour appears once per triangle on the shared edge
        let mut i = 0;
        while i < around.len() {
            let mut j = i + 1;
            while j < around.len() && around[j] == around[i] {
                j += 1;
            }
            if j - i == 1 {
                return true;
            }
            i = j;
        }
        false
    }

    /// All live edges as `(a, b)` with `a < b`, in ascending order
    pub fn edges(&self) -> Vec<(VertexId, VertexId)> {
        let mut result = Vec::new();
        for v in 0..self.positions.len() {
            if !self.is_referenced(v) {
                continue;
            }
            for n in self.neighbors(v) {
                if v < n {
                    result.push((v, n));
                }
            }
        }
        result
    }

    /// Unnormalized face normal in double precision; its length is twice the area
    pub fn triangle_normal(&self, t: TriangleId) -> Vector3d {
        let [i0, i1, i2] = self.triangles[t];
        let p0 = to_f64(&self.positions[i0]);
        let p1 = to_f64(&self.positions[i1]);
        let p2 = to_f64(&self.positions[i2]);
        (p1 - p0).cross(&(p2 - p0))
    }

    pub fn triangle_area(&self, t: TriangleId) -> f64 {
        self.triangle_normal(t).norm() * 0.5
    }

    /// Collapse the edge `(a, b)`, merging `b` into `a` at `new_position`.
    ///
    /// The topology part of the [`Validator`] runs first; a collapse that would
    /// leave the mesh non-manifold, or move `a` to a non-finite position, is
    /// refused with [`CollapseError`] and the mesh is left untouched. Returns
    /// the ids of the removed triangles.
    pub fn collapse_edge(
        &mut self,
        a: VertexId,
        b: VertexId,
        new_position: Point3f,
    ) -> std::result::Result<Vec<TriangleId>, CollapseError> {
        Validator::check_topology(self, a, b)?;
        if !is_finite(&new_position) {
            return Err(Rejection::NonFiniteTarget.into());
        }
        Ok(self.apply_collapse(a, b, new_position))
    }

    /// Commit a collapse that has already been validated.
    pub(crate) fn apply_collapse(
        &mut self,
        a: VertexId,
        b: VertexId,
        new_position: Point3f,
    ) -> Vec<TriangleId> {
        let removed = self.edge_triangles(a, b);

        for &t in &removed {
            self.triangle_removed[t] = true;
            self.live_triangles -= 1;
            for v in self.triangles[t] {
                if v != b {
                    self.vertex_triangles[v].retain(|&x| x != t);
                }
            }
        }

        let moved = std::mem::take(&mut self.vertex_triangles[b]);
        for t in moved {
            if self.triangle_removed[t] {
                continue;
            }
            for slot in self.triangles[t].iter_mut() {
                if *slot == b {
                    *slot = a;
                }
            }
            self.vertex_triangles[a].push(t);
        }

        let s = edge_parameter(&self.positions[a], &self.positions[b], &new_position);

        if let Some(normals) = self.normals.as_mut() {
            let blended = normals[a] * (1.0 - s) + normals[b] * s;
            let blended = blended.normalize();
            if blended.iter().all(|x| x.is_finite()) {
                normals[a] = blended;
            }
        }

        if let Some(uvs) = self.uvs.as_mut() {
            let (ua, ub) = (uvs[a], uvs[b]);
            uvs[a] = [
                ua[0] * (1.0 - s) + ub[0] * s,
                ua[1] * (1.0 - s) + ub[1] * s,
            ];
        }

        self.positions[a] = new_position;
        self.vertex_removed[b] = true;

        removed
    }

    /// Compact the live part of the mesh back into caller buffers.
    ///
    /// Vertices keep their relative id order, as do triangles.
    pub fn to_triangle_mesh(&self) -> TriangleMesh {
        let mut old_to_new = vec![usize::MAX; self.positions.len()];
        let mut new_positions = Vec::new();
        let mut new_normals = self.normals.as_ref().map(|_| Vec::new());
        let mut new_uvs = self.uvs.as_ref().map(|_| Vec::new());

        for v in 0..self.positions.len() {
            if !self.is_referenced(v) {
                continue;
            }
            old_to_new[v] = new_positions.len();
            new_positions.push(self.positions[v]);
            if let (Some(out), Some(normals)) = (new_normals.as_mut(), self.normals.as_ref()) {
                out.push(normals[v]);
            }
            if let (Some(out), Some(uvs)) = (new_uvs.as_mut(), self.uvs.as_ref()) {
                out.push(uvs[v]);
            }
        }

        let new_faces = self
            .triangle_ids()
            .map(|t| self.triangles[t].map(|v| old_to_new[v]))
            .collect();

        let mut mesh = TriangleMesh::from_vertices_and_faces(new_positions, new_faces);
        if let Some(normals) = new_normals {
            mesh.set_normals(normals);
        }
        if let Some(uvs) = new_uvs {
            mesh.set_uvs(uvs);
        }
        mesh
    }

    /// Verify that triangles and adjacency lists agree with each other.
    pub fn check_integrity(&self) -> std::result::Result<(), String> {
        let mut live = 0;
        for t in self.triangle_ids() {
            live += 1;
            let tri = self.triangles[t];
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[2] == tri[0] {
                return Err(format!("triangle {} repeats a vertex: {:?}", t, tri));
            }
            for v in tri {
                if self.vertex_removed[v] {
                    return Err(format!("triangle {} references removed vertex {}", t, v));
                }
                if !self.vertex_triangles[v].contains(&t) {
                    return Err(format!("vertex {} does not list triangle {}", v, t));
                }
            }
        }
        if live != self.live_triangles {
            return Err(format!(
                "live triangle count {} disagrees with {} live triangles",
                self.live_triangles, live
            ));
        }

        for (v, list) in self.vertex_triangles.iter().enumerate() {
            if self.vertex_removed[v] && !list.is_empty() {
                return Err(format!("removed vertex {} still lists triangles", v));
            }
            for (i, &t) in list.iter().enumerate() {
                if self.triangle_removed[t] {
                    return Err(format!("vertex {} lists removed triangle {}", v, t));
                }
                if !self.triangles[t].contains(&v) {
                    return Err(format!("vertex {} lists foreign triangle {}", v, t));
                }
                if list[..i].contains(&t) {
                    return Err(format!("vertex {} lists triangle {} twice", v, t));
                }
            }
        }
        Ok(())
    }
}

impl Bounded for Mesh {
    fn bounding_box(&self) -> (Point3f, Point3f) {
        bounding_box_of(
            (0..self.positions.len())
                .filter(|&v| self.is_referenced(v))
                .map(|v| &self.positions[v]),
        )
    }
}

pub(crate) fn is_finite(p: &Point3f) -> bool {
    p.coords.iter().all(|c| c.is_finite())
}

/// Position of `p` projected onto the segment `a -> b`, as a parameter in [0, 1]
fn edge_parameter(a: &Point3f, b: &Point3f, p: &Point3f) -> f32 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 <= f32::EPSILON {
        return 0.5;
    }
    ((p - a).dot(&ab) / len2).clamp(0.0, 1.0)
}
