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

//! World-space collider state: pose, scale, and cached derived geometry.

use crate::math::{Aabb, Mat4, Quaternion, Vec3};
use crate::physics::shape::Shape;

/// A world-space face, cached from a `Shape::Convex` face after a refit.
#[derive(Debug, Clone)]
pub struct WorldFace {
    /// World-space vertices of this face, in the same winding as the local face.
    pub vertices: Vec<Vec3>,
    /// The outward-facing unit normal, rotated into world space.
    pub normal: Vec3,
}

/// Owns a shape's local description plus the world-space pose and caches
/// derived from it: the object-to-world transform, the transformed vertex
/// and face-normal cache, and the current world AABB.
#[derive(Debug, Clone)]
pub struct Collider {
    /// Immutable local-space shape description.
    pub shape: Shape,
    /// World-space position of the shape's local origin.
    pub position: Vec3,
    /// World-space orientation; kept normalized.
    pub rotation: Quaternion,
    /// Non-uniform local-space scale.
    pub scale: Vec3,

    /// Cached object-to-world transform, rebuilt on every refit.
    pub transform: Mat4,
    /// World-space vertex cache (`Shape::Convex` only; empty for spheres).
    pub world_vertices: Vec<Vec3>,
    /// World-space face cache (`Shape::Convex` only; empty for spheres).
    pub world_faces: Vec<WorldFace>,
    /// Current tight world AABB (not fattened; the BVH fattens separately).
    pub aabb: Aabb,
}

impl Collider {
    /// Creates a collider at the given pose, performing an initial refit so
    /// its caches and AABB are valid before the first step.
    pub fn new(shape: Shape, position: Vec3, rotation: Quaternion, scale: Vec3) -> Self {
        let mut collider = Self {
            shape,
            position,
            rotation: rotation.normalize(),
            scale,
            transform: Mat4::IDENTITY,
            world_vertices: Vec::new(),
            world_faces: Vec::new(),
            aabb: Aabb::INVALID,
        };
        collider.refit();
        collider
    }

    /// The effective world-space radius of a sphere collider.
    ///
    /// The source uses `scale.x` as the sole radius driver rather than the
    /// largest scale component; preserved here for parity.
    pub fn world_radius(&self) -> f32 {
        self.scale.x
    }

    /// Recomputes the object-to-world transform, the world-space vertex/face
    /// caches, and the world AABB from the current position/rotation/scale.
    ///
    /// For convex shapes, vertices are `M · v_local`. The AABB is computed
    /// from the rotated local half-extents (Möller's method) rather than by
    /// re-deriving min/max from the transformed vertex cache, which is
    /// equivalent but cheaper for axis-aligned local geometry.
    pub fn refit(&mut self) {
        self.rotation = self.rotation.normalize();
        self.transform = Mat4::from_translation(self.position)
            * Mat4::from_quat(self.rotation)
            * Mat4::from_scale(self.scale);

        match &self.shape {
            Shape::Sphere => {
                let r = self.world_radius();
                self.aabb = Aabb::from_center_half_extents(self.position, Vec3::new(r, r, r));
            }
            Shape::Convex { vertices, faces, .. } => {
                self.world_vertices.clear();
                self.world_vertices.extend(
                    vertices
                        .iter()
                        .map(|v| self.rotation.rotate_vec3(*v * self.scale) + self.position),
                );

                self.world_faces.clear();
                for face in faces {
                    let world_verts = face
                        .indices
                        .iter()
                        .map(|&i| self.world_vertices[i])
                        .collect();
                    self.world_faces.push(WorldFace {
                        vertices: world_verts,
                        normal: self.rotation.rotate_vec3(face.normal).normalize(),
                    });
                }

                let local_half_extents = local_half_extents(vertices) * self.scale;
                let rotation_matrix = Mat4::from_quat(self.rotation);
                let x_abs = Vec3::new(
                    rotation_matrix.cols[0].x.abs(),
                    rotation_matrix.cols[0].y.abs(),
                    rotation_matrix.cols[0].z.abs(),
                );
                let y_abs = Vec3::new(
                    rotation_matrix.cols[1].x.abs(),
                    rotation_matrix.cols[1].y.abs(),
                    rotation_matrix.cols[1].z.abs(),
                );
                let z_abs = Vec3::new(
                    rotation_matrix.cols[2].x.abs(),
                    rotation_matrix.cols[2].y.abs(),
                    rotation_matrix.cols[2].z.abs(),
                );
                let world_half_extents = x_abs * local_half_extents.x
                    + y_abs * local_half_extents.y
                    + z_abs * local_half_extents.z;

                self.aabb = Aabb::from_center_half_extents(self.position, world_half_extents);
            }
        }
    }
}

/// Half-extents of the local-space bounding box of a vertex set, about the origin.
fn local_half_extents(vertices: &[Vec3]) -> Vec3 {
    let mut max = Vec3::ZERO;
    for v in vertices {
        max = max.max(v.abs());
    }
    max
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::approx_eq;

    #[test]
    fn sphere_aabb_is_centered_on_position_with_radius_extent() {
        let collider = Collider::new(
            Shape::Sphere,
            Vec3::new(1.0, 2.0, 3.0),
            Quaternion::IDENTITY,
            Vec3::new(2.0, 2.0, 2.0),
        );
        assert!(approx_eq(collider.world_radius(), 2.0));
        assert_eq!(collider.aabb.min, Vec3::new(-1.0, 0.0, 1.0));
        assert_eq!(collider.aabb.max, Vec3::new(3.0, 4.0, 5.0));
    }

    #[test]
    fn cube_refit_populates_world_vertex_and_face_caches() {
        let collider = Collider::new(
            Shape::unit_cube(),
            Vec3::ZERO,
            Quaternion::IDENTITY,
            Vec3::ONE,
        );
        assert_eq!(collider.world_vertices.len(), 8);
        assert_eq!(collider.world_faces.len(), 6);
        assert!(collider.aabb.contains_point(Vec3::new(0.99, 0.99, 0.99)));
        assert!(!collider.aabb.contains_point(Vec3::new(1.01, 0.0, 0.0)));
    }

    #[test]
    fn rotated_cube_aabb_grows_to_bound_diagonal() {
        let collider = Collider::new(
            Shape::unit_cube(),
            Vec3::ZERO,
            Quaternion::from_axis_angle(Vec3::Y, std::f32::consts::FRAC_PI_4),
            Vec3::ONE,
        );
        let half = collider.aabb.half_extents();
        assert!(half.x > 1.0 && half.z > 1.0);
        assert!(approx_eq(half.y, 1.0));
    }
}
