// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Collision shapes: a tagged union over sphere and convex polyhedron.
//!
//! The source this crate is grounded on dispatches shapes through virtual
//! calls on a `Collider` base class. Here a `Shape` is a plain enum with a
//! `support` operation, so SAT and GJK can both be written generically over
//! either variant without a vtable.

use crate::math::Vec3;

/// A single planar face of a convex polyhedron, in local (object) space.
#[derive(Debug, Clone)]
pub struct Face {
    /// Indices into the owning `Shape::Convex`'s `vertices`, wound so that
    /// `normal` points outward.
    pub indices: Vec<usize>,
    /// The outward-facing unit normal of this face, in local space.
    pub normal: Vec3,
}

/// An edge of a convex polyhedron, referencing the two faces it borders.
///
/// Retained for the edge-edge SAT extension (see `narrowphase::sat`); the
/// default convex/convex dispatch only tests face axes.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    /// Index of the edge's first vertex.
    pub v0: usize,
    /// Index of the edge's second vertex.
    pub v1: usize,
    /// Index of one of the two faces this edge borders.
    pub face: usize,
}

/// A collision shape in local (object) space.
#[derive(Debug, Clone)]
pub enum Shape {
    /// A sphere of unit local radius; the effective world radius is the
    /// owning collider's scale (see `Collider::world_radius`).
    Sphere,
    /// A convex polyhedron described by its vertices, faces, and edges, all
    /// in local (object) space.
    Convex {
        /// Vertices in local space.
        vertices: Vec<Vec3>,
        /// Planar faces, each with an outward local-space normal.
        faces: Vec<Face>,
        /// Edges, each tagged with a bordering face.
        edges: Vec<Edge>,
    },
}

impl Shape {
    /// Builds the canonical unit cube: 8 vertices at `(±1, ±1, ±1)`, 6 axis-aligned
    /// faces, and 12 edges. This is the shape OBB colliders are expressed as — an
    /// OBB is not a distinct shape variant, it is a convex hull of 8 vertices
    /// routed through the same SAT/clipping path as any other convex.
    pub fn unit_cube() -> Self {
        let v = [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
        ];

        let faces = vec![
            Face {
                indices: vec![0, 3, 2, 1],
                normal: Vec3::new(0.0, 0.0, -1.0),
            },
            Face {
                indices: vec![4, 5, 6, 7],
                normal: Vec3::new(0.0, 0.0, 1.0),
            },
            Face {
                indices: vec![0, 1, 5, 4],
                normal: Vec3::new(0.0, -1.0, 0.0),
            },
            Face {
                indices: vec![3, 7, 6, 2],
                normal: Vec3::new(0.0, 1.0, 0.0),
            },
            Face {
                indices: vec![0, 4, 7, 3],
                normal: Vec3::new(-1.0, 0.0, 0.0),
            },
            Face {
                indices: vec![1, 2, 6, 5],
                normal: Vec3::new(1.0, 0.0, 0.0),
            },
        ];

        let edges = vec![
            Edge { v0: 0, v1: 1, face: 0 },
            Edge { v0: 1, v1: 2, face: 0 },
            Edge { v0: 2, v1: 3, face: 0 },
            Edge { v0: 3, v1: 0, face: 0 },
            Edge { v0: 4, v1: 5, face: 1 },
            Edge { v0: 5, v1: 6, face: 1 },
            Edge { v0: 6, v1: 7, face: 1 },
            Edge { v0: 7, v1: 4, face: 1 },
            Edge { v0: 0, v1: 4, face: 4 },
            Edge { v0: 1, v1: 5, face: 2 },
            Edge { v0: 2, v1: 6, face: 5 },
            Edge { v0: 3, v1: 7, face: 3 },
        ];

        Shape::Convex {
            vertices: v.to_vec(),
            faces,
            edges,
        }
    }

    /// Returns the index of the local-space vertex furthest along `direction`,
    /// i.e. the support point of the Minkowski-difference operand.
    ///
    /// # Panics
    /// Panics if called on `Shape::Sphere` (a sphere's support is a scalar
    /// radius along `direction`, computed by the caller via `Collider::world_radius`).
    pub fn support_vertex(&self, direction: Vec3) -> usize {
        match self {
            Shape::Sphere => panic!("support_vertex is not defined for Shape::Sphere"),
            Shape::Convex { vertices, .. } => {
                let mut best_index = 0;
                let mut best_dot = f32::NEG_INFINITY;
                for (i, v) in vertices.iter().enumerate() {
                    let d = v.dot(direction);
                    if d > best_dot {
                        best_dot = d;
                        best_index = i;
                    }
                }
                best_index
            }
        }
    }

    /// Returns true if this shape has degenerate geometry: a convex hull with
    /// fewer than 4 vertices or no faces. Spheres are never degenerate (their
    /// radius is validated separately by the owning `Collider`).
    pub fn is_degenerate(&self) -> bool {
        match self {
            Shape::Sphere => false,
            Shape::Convex { vertices, faces, .. } => vertices.len() < 4 || faces.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_cube_has_eight_vertices_six_faces_twelve_edges() {
        let cube = Shape::unit_cube();
        match cube {
            Shape::Convex { vertices, faces, edges } => {
                assert_eq!(vertices.len(), 8);
                assert_eq!(faces.len(), 6);
                assert_eq!(edges.len(), 12);
            }
            Shape::Sphere => unreachable!(),
        }
    }

    #[test]
    fn unit_cube_support_picks_extremal_vertex() {
        let cube = Shape::unit_cube();
        let idx = cube.support_vertex(Vec3::new(1.0, 1.0, 1.0));
        if let Shape::Convex { vertices, .. } = &cube {
            assert_eq!(vertices[idx], Vec3::new(1.0, 1.0, 1.0));
        }
    }

    #[test]
    fn sphere_is_never_degenerate() {
        assert!(!Shape::Sphere.is_degenerate());
    }

    #[test]
    fn too_few_vertices_is_degenerate() {
        let tetra_missing_point = Shape::Convex {
            vertices: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            faces: vec![],
            edges: vec![],
        };
        assert!(tetra_missing_point.is_degenerate());
    }
}
