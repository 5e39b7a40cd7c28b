//! Small meshes shared by the unit tests

use budgetmesh_core::{Point3f, TriangleMesh};
use std::f32::consts::PI;

pub fn single_triangle() -> TriangleMesh {
    TriangleMesh::from_vertices_and_faces(
        vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.5, 1.0, 0.0),
        ],
        vec![[0, 1, 2]],
    )
}

pub fn tetrahedron() -> TriangleMesh {
    // Consistently wound: each shared edge appears in opposite directions
    TriangleMesh::from_vertices_and_faces(
        vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.5, 1.0, 0.0),
            Point3f::new(0.5, 0.5, 1.0),
        ],
        vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
    )
}

pub fn octahedron() -> TriangleMesh {
    TriangleMesh::from_vertices_and_faces(
        vec![
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(-1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
            Point3f::new(0.0, -1.0, 0.0),
            Point3f::new(0.0, 0.0, 1.0),
            Point3f::new(0.0, 0.0, -1.0),
        ],
        vec![
            [0, 2, 4],
            [2, 1, 4],
            [1, 3, 4],
            [3, 0, 4],
            [2, 0, 5],
            [1, 2, 5],
            [3, 1, 5],
            [0, 3, 5],
        ],
    )
}

/// Flat `size` x `size` grid in the z = 0 plane, vertex `y * size + x` at `(x, y)`
pub fn plane_grid(size: usize) -> TriangleMesh {
    height_field(size, size, |_, _| 0.0)
}

/// Flat grid two vertices tall, so every vertex lies on the boundary
pub fn plane_strip(width: usize) -> TriangleMesh {
    height_field(width, 2, |_, _| 0.0)
}

pub fn curved_surface(size: usize) -> TriangleMesh {
    height_field(size, size, |x, y| {
        let fx = x as f32 / (size - 1) as f32 * PI;
        let fy = y as f32 / (size - 1) as f32 * PI;
        (fx.sin() * fy.sin()) * 2.0
    })
}

fn height_field(width: usize, height: usize, z: impl Fn(usize, usize) -> f32) -> TriangleMesh {
    let mut vertices = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            vertices.push(Point3f::new(x as f32, y as f32, z(x, y)));
        }
    }
    let mut faces = Vec::new();
    for y in 0..(height - 1) {
        for x in 0..(width - 1) {
            let tl = y * width + x;
            let tr = tl + 1;
            let bl = (y + 1) * width + x;
            let br = bl + 1;
            faces.push([tl, bl, tr]);
            faces.push([tr, bl, br]);
        }
    }
    TriangleMesh::from_vertices_and_faces(vertices, faces)
}

/// Closed latitude/longitude sphere with `2 * slices * (stacks - 1)` triangles
pub fn uv_sphere(slices: usize, stacks: usize) -> TriangleMesh {
    let mut vertices = vec![Point3f::new(0.0, 0.0, 1.0)];
    for i in 1..stacks {
        let phi = PI * i as f32 / stacks as f32;
        for j in 0..slices {
            let theta = 2.0 * PI * j as f32 / slices as f32;
            vertices.push(Point3f::new(
                phi.sin() * theta.cos(),
                phi.sin() * theta.sin(),
                phi.cos(),
            ));
        }
    }
    let south = vertices.len();
    vertices.push(Point3f::new(0.0, 0.0, -1.0));

    let ring = |i: usize, j: usize| 1 + (i - 1) * slices + j % slices;
    let mut faces = Vec::new();
    for j in 0..slices {
        faces.push([0, ring(1, j), ring(1, j + 1)]);
    }
    for i in 1..(stacks - 1) {
        for j in 0..slices {
            let (a, b) = (ring(i, j), ring(i, j + 1));
            let (c, d) = (ring(i + 1, j), ring(i + 1, j + 1));
            faces.push([a, c, d]);
            faces.push([a, d, b]);
        }
    }
    for j in 0..slices {
        faces.push([south, ring(stacks - 1, j + 1), ring(stacks - 1, j)]);
    }
    TriangleMesh::from_vertices_and_faces(vertices, faces)
}
