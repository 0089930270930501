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

//! Convex/convex detection: face-normal SAT to find the separating axis of
//! least penetration, then Sutherland-Hodgman clipping of the incident face
//! against the reference face to build the contact manifold.
//!
//! Edge-edge axes are enumerated by the shape data (`Shape::Convex::edges`)
//! but, matching the production path this is grounded on, are not tested
//! here; face axes alone are sufficient for the box-on-box and box-on-sphere
//! scenes this core targets. See the crate's design notes for the known
//! edge-contact degeneracy this leaves open.

use crate::math::Vec3;
use crate::physics::collider::{Collider, WorldFace};
use crate::physics::manifold::NewContact;

/// Best (least-penetrating, i.e. minimum positive depth) face axis of
/// `reference`'s faces against `other`, or `None` if some face is a
/// separating axis (the shapes don't overlap).
fn best_face_axis(reference: &Collider, other: &Collider) -> Option<(usize, f32)> {
    let mut best_index = 0;
    let mut best_depth = f32::INFINITY;

    for (i, face) in reference.world_faces.iter().enumerate() {
        let n = face.normal;
        let support = support_point(other, -n);
        let d = (face.vertices[0] - support).dot(n);
        if d <= 0.0 {
            return None;
        }
        if d < best_depth {
            best_depth = d;
            best_index = i;
        }
    }

    Some((best_index, best_depth))
}

/// The world-space vertex of `collider` extreme along `direction`.
fn support_point(collider: &Collider, direction: Vec3) -> Vec3 {
    let mut best = collider.world_vertices[0];
    let mut best_dot = best.dot(direction);
    for &v in &collider.world_vertices[1..] {
        let d = v.dot(direction);
        if d > best_dot {
            best_dot = d;
            best = v;
        }
    }
    best
}

/// Runs SAT between two convex colliders. On overlap, returns `(swap,
/// contacts)` where `swap = true` means `b` is the reference body (so the
/// caller should present `b` first in the ordered pair); contacts are always
/// expressed with `point_a` on the reference body and `point_b` on the
/// incident body, normal pointing from reference to incident.
pub fn convex_convex(a: &Collider, b: &Collider) -> Option<(bool, Vec<NewContact>)> {
    let (face_a, depth_a) = best_face_axis(a, b)?;
    let (face_b, depth_b) = best_face_axis(b, a)?;

    let biased_depth_a = depth_a * 1.002 + 0.0005;
    let (reference, incident, ref_face_idx, swap) = if biased_depth_a >= depth_b {
        (a, b, face_a, false)
    } else {
        (b, a, face_b, true)
    };

    let ref_face = &reference.world_faces[ref_face_idx];
    let n = ref_face.normal;

    let incident_face_idx = incident
        .world_faces
        .iter()
        .enumerate()
        .min_by(|(_, f1), (_, f2)| f1.normal.dot(n).partial_cmp(&f2.normal.dot(n)).unwrap())
        .map(|(i, _)| i)?;

    let clipped = clip_against_reference_face(&incident.world_faces[incident_face_idx].vertices, ref_face, n);

    let ref_point = ref_face.vertices[0];
    let mut survivors: Vec<Vec3> = clipped
        .into_iter()
        .filter(|&p| (ref_point - p).dot(n) > 0.0)
        .collect();

    if survivors.is_empty() {
        return None;
    }
    if survivors.len() > 4 {
        survivors = reduce_to_four(&survivors, n);
    }

    let contacts = survivors
        .into_iter()
        .map(|p_incident| {
            let depth = (ref_point - p_incident).dot(n);
            let p_reference = p_incident + n * depth;
            NewContact {
                point_a: p_reference,
                point_b: p_incident,
                normal: n,
                penetration: depth,
                restitution: 0.0,
            }
        })
        .collect();

    Some((swap, contacts))
}

/// Clips `polygon` against every edge plane of `reference_face`, in order:
/// for edge `(v_i, v_{i+1})`, the side plane has normal `n x edge_dir`
/// through `v_i`, and the polygon is kept on the positive-dot side.
fn clip_against_reference_face(polygon: &[Vec3], reference_face: &WorldFace, n: Vec3) -> Vec<Vec3> {
    let verts = &reference_face.vertices;
    let mut output = polygon.to_vec();

    for i in 0..verts.len() {
        if output.is_empty() {
            break;
        }
        let edge_start = verts[i];
        let edge_end = verts[(i + 1) % verts.len()];
        let edge_dir = edge_end - edge_start;
        if edge_dir.length_squared() <= crate::math::EPSILON * crate::math::EPSILON {
            continue;
        }
        let side_normal = n.cross(edge_dir.normalize());
        output = clip_polygon_against_plane(&output, edge_start, side_normal);
    }

    output
}

/// One pass of Sutherland-Hodgman against the half-space `(p - plane_point) . plane_normal >= 0`.
fn clip_polygon_against_plane(polygon: &[Vec3], plane_point: Vec3, plane_normal: Vec3) -> Vec<Vec3> {
    let mut result = Vec::new();
    let count = polygon.len();
    if count == 0 {
        return result;
    }

    for i in 0..count {
        let current = polygon[i];
        let next = polygon[(i + 1) % count];
        let d_current = (current - plane_point).dot(plane_normal);
        let d_next = (next - plane_point).dot(plane_normal);

        if d_current >= 0.0 {
            result.push(current);
            if d_next < 0.0 {
                let t = d_current / (d_current - d_next);
                result.push(Vec3::lerp(current, next, t));
            }
        } else if d_next >= 0.0 {
            let t = d_current / (d_current - d_next);
            result.push(Vec3::lerp(current, next, t));
        }
    }

    result
}

/// Reduces a clipped polygon to at most 4 points: keeps the extremes along an
/// in-plane axis `u` (through the point farthest from the centroid) and
/// `v = u x n`, collapsing duplicates.
fn reduce_to_four(points: &[Vec3], n: Vec3) -> Vec<Vec3> {
    let centroid = points.iter().fold(Vec3::ZERO, |acc, &p| acc + p) * (1.0 / points.len() as f32);

    let far_index = points
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            (**a - centroid)
                .length_squared()
                .partial_cmp(&(**b - centroid).length_squared())
                .unwrap()
        })
        .map(|(i, _)| i)
        .unwrap();

    let u = (points[far_index] - centroid).normalize();
    let v = u.cross(n).normalize();

    let extreme = |score: &dyn Fn(Vec3) -> f32, want_max: bool| -> usize {
        points
            .iter()
            .enumerate()
            .map(|(i, &p)| (i, score(p)))
            .fold((0usize, if want_max { f32::NEG_INFINITY } else { f32::INFINITY }), |acc, (i, s)| {
                if (want_max && s > acc.1) || (!want_max && s < acc.1) {
                    (i, s)
                } else {
                    acc
                }
            })
            .0
    };

    let score_u = |p: Vec3| u.dot(p - centroid);
    let score_v = |p: Vec3| v.dot(p - centroid);

    let candidates = [
        extreme(&score_u, true),
        extreme(&score_u, false),
        extreme(&score_v, true),
        extreme(&score_v, false),
    ];

    let mut kept = Vec::with_capacity(4);
    for idx in candidates {
        if !kept.contains(&idx) {
            kept.push(idx);
        }
    }

    kept.into_iter().map(|i| points[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Quaternion;
    use crate::physics::shape::Shape;

    fn cube(position: Vec3, rotation: Quaternion) -> Collider {
        Collider::new(Shape::unit_cube(), position, rotation, Vec3::ONE)
    }

    #[test]
    fn stacked_cubes_produce_four_point_manifold_along_z() {
        let bottom = cube(Vec3::ZERO, Quaternion::IDENTITY);
        let top = cube(Vec3::new(0.0, 0.0, 1.8), Quaternion::IDENTITY);

        let (swap, contacts) = convex_convex(&bottom, &top).unwrap();
        assert!(!swap);
        assert_eq!(contacts.len(), 4);
        for c in &contacts {
            assert!((c.normal - Vec3::Z).length() < 1e-4);
            assert!((c.penetration - 0.2).abs() < 1e-3);
        }
    }

    #[test]
    fn separated_cubes_do_not_collide() {
        let a = cube(Vec3::ZERO, Quaternion::IDENTITY);
        let b = cube(Vec3::new(10.0, 0.0, 0.0), Quaternion::IDENTITY);
        assert!(convex_convex(&a, &b).is_none());
    }

    #[test]
    fn offset_cubes_penetration_matches_overlap_depth() {
        let a = cube(Vec3::ZERO, Quaternion::IDENTITY);
        let b = cube(Vec3::new(1.9, 0.0, 0.0), Quaternion::IDENTITY);

        let (_, contacts) = convex_convex(&a, &b).unwrap();
        assert!(!contacts.is_empty());
        for c in &contacts {
            assert!((c.normal - Vec3::X).length() < 1e-4);
            assert!((c.penetration - 0.1).abs() < 1e-3);
        }
    }
}
