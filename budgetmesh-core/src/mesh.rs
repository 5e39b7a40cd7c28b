//! Vertex/index buffer pair exchanged with the outside world

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};

/// A triangle mesh with vertices and faces
///
/// This is the shape every external collaborator hands to the optimizer and
/// receives back: a vertex buffer with optional per-vertex normals and UVs,
/// and an index buffer of triangles. No topology is derived here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
    pub uvs: Option<Vec<Uv>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
            uvs: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
            uvs: None,
        }
    }

    /// Create a mesh from flat buffers: `positions` holds `x, y, z` triples and
    /// `indices` holds one vertex index triple per triangle.
    ///
    /// Only the buffer shapes are checked here; index ranges are validated when
    /// the mesh is loaded for simplification.
    pub fn from_buffers(positions: &[f32], indices: &[u32]) -> Result<Self> {
        if positions.len() % 3 != 0 {
            return Err(Error::malformed(format!(
                "position buffer length {} is not a multiple of 3",
                positions.len()
            )));
        }
        if indices.len() % 3 != 0 {
            return Err(Error::malformed(format!(
                "index buffer length {} is not a multiple of 3",
                indices.len()
            )));
        }

        let vertices = positions
            .chunks_exact(3)
            .map(|p| Point3f::new(p[0], p[1], p[2]))
            .collect();
        let faces = indices
            .chunks_exact(3)
            .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
            .collect();

        Ok(Self::from_vertices_and_faces(vertices, faces))
    }

    /// Flatten the mesh into a position buffer and an index buffer
    pub fn to_buffers(&self) -> Result<(Vec<f32>, Vec<u32>)> {
        let mut positions = Vec::with_capacity(self.vertices.len() * 3);
        for v in &self.vertices {
            positions.extend_from_slice(&[v.x, v.y, v.z]);
        }

        let mut indices = Vec::with_capacity(self.faces.len() * 3);
        for (fi, face) in self.faces.iter().enumerate() {
            for &vi in face {
                let index = u32::try_from(vi).map_err(|_| {
                    Error::malformed(format!("face {} index {} does not fit in 32 bits", fi, vi))
                })?;
                indices.push(index);
            }
        }

        Ok((positions, indices))
    }

    /// Raw bytes of the flattened buffers, in native endianness
    pub fn to_byte_buffers(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        let (positions, indices) = self.to_buffers()?;
        Ok((
            bytemuck::cast_slice(&positions).to_vec(),
            bytemuck::cast_slice(&indices).to_vec(),
        ))
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Calculate face normals
    pub fn calculate_face_normals(&self) -> Vec<Vector3f> {
        self.faces
            .iter()
            .map(|face| {
                let v0 = self.vertices[face[0]];
                let v1 = self.vertices[face[1]];
                let v2 = self.vertices[face[2]];

                let edge1 = v1 - v0;
                let edge2 = v2 - v0;

                edge1.cross(&edge2).normalize()
            })
            .collect()
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Set vertex texture coordinates
    pub fn set_uvs(&mut self, uvs: Vec<Uv>) {
        if uvs.len() == self.vertices.len() {
            self.uvs = Some(uvs);
        }
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quad() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn test_buffers_roundtrip() {
        let mesh = quad();
        let (positions, indices) = mesh.to_buffers().unwrap();
        assert_eq!(positions.len(), 12);
        assert_eq!(indices, vec![0, 1, 2, 0, 2, 3]);

        let back = TriangleMesh::from_buffers(&positions, &indices).unwrap();
        assert_eq!(back, mesh);
    }

    #[test]
    fn test_from_buffers_rejects_ragged_input() {
        assert!(matches!(
            TriangleMesh::from_buffers(&[0.0, 1.0], &[]),
            Err(Error::MalformedMesh(_))
        ));
        assert!(matches!(
            TriangleMesh::from_buffers(&[0.0; 9], &[0, 1]),
            Err(Error::MalformedMesh(_))
        ));
    }

    #[test]
    fn test_byte_buffers() {
        let (pos_bytes, idx_bytes) = quad().to_byte_buffers().unwrap();
        assert_eq!(pos_bytes.len(), 12 * 4);
        assert_eq!(idx_bytes.len(), 6 * 4);
    }

    #[test]
    fn test_attribute_length_mismatch_ignored() {
        let mut mesh = quad();
        mesh.set_normals(vec![Vector3f::z(); 3]);
        assert!(mesh.normals.is_none());
        mesh.set_uvs(vec![[0.0, 0.0]; 4]);
        assert_eq!(mesh.uvs.as_ref().map(Vec::len), Some(4));
    }

    #[test]
    fn test_face_normals() {
        let normals = quad().calculate_face_normals();
        assert_eq!(normals.len(), 2);
        for n in normals {
            assert_relative_eq!(n.z, 1.0);
        }
    }
}
