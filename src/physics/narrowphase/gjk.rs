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

//! GJK + EPA: an alternative, Minkowski-difference-based penetration test,
//! provided as an explicit entry point separate from the SAT+clipping path
//! that [`super`] dispatches by default. Not wired into [`super::detect`];
//! callers that want it (or a future contact generator built on it) call
//! [`penetration`] directly.

use crate::math::Vec3;
use crate::physics::collider::Collider;

const MAX_EPA_ITERATIONS: usize = 32;
const EPA_TOLERANCE: f32 = 0.001;

/// A Minkowski-difference support point, keeping the two underlying supports
/// so a final contact can be reconstructed by barycentric combination.
#[derive(Debug, Clone, Copy)]
struct SupportPoint {
    point: Vec3,
    on_a: Vec3,
    on_b: Vec3,
}

fn support(a: &Collider, b: &Collider, direction: Vec3) -> SupportPoint {
    let on_a = farthest_point(a, direction);
    let on_b = farthest_point(b, -direction);
    SupportPoint {
        point: on_a - on_b,
        on_a,
        on_b,
    }
}

fn farthest_point(collider: &Collider, direction: Vec3) -> Vec3 {
    match &collider.shape {
        crate::physics::shape::Shape::Sphere => collider.position + direction.normalize() * collider.world_radius(),
        crate::physics::shape::Shape::Convex { .. } => {
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
    }
}

/// The result of an EPA penetration query: world-space contact points on
/// each body, the separating normal (from `a` toward `b`), and depth.
#[derive(Debug, Clone, Copy)]
pub struct Penetration {
    /// Contact point on `a`.
    pub point_a: Vec3,
    /// Contact point on `b`.
    pub point_b: Vec3,
    /// Unit normal pointing from `a` toward `b`.
    pub normal: Vec3,
    /// Penetration depth along `normal`.
    pub depth: f32,
}

/// Runs GJK to determine if `a` and `b` overlap and, if so, EPA to recover
/// the penetration depth, normal, and approximate contact points.
pub fn penetration(a: &Collider, b: &Collider) -> Option<Penetration> {
    let mut simplex = vec![support(a, b, Vec3::X)];
    let mut direction = -simplex[0].point;

    for _ in 0..64 {
        if direction.length_squared() <= crate::math::EPSILON * crate::math::EPSILON {
            direction = Vec3::X;
        }
        let candidate = support(a, b, direction);
        if candidate.point.dot(direction) < 0.0 {
            return None;
        }
        simplex.push(candidate);

        if let Some(contains_origin) = evolve_simplex(&mut simplex, &mut direction) {
            if contains_origin {
                return epa(a, b, simplex);
            }
        }
    }
    None
}

/// Advances the simplex one step, returning `Some(true)` once it encloses
/// the origin (tetrahedron case), `Some(false)` never (kept for symmetry
/// with a richer termination policy), or `None` to keep iterating.
fn evolve_simplex(simplex: &mut Vec<SupportPoint>, direction: &mut Vec3) -> Option<bool> {
    match simplex.len() {
        2 => {
            line_case(simplex, direction);
            None
        }
        3 => {
            triangle_case(simplex, direction);
            None
        }
        4 => tetrahedron_case(simplex, direction),
        _ => None,
    }
}

fn line_case(simplex: &mut [SupportPoint], direction: &mut Vec3) {
    let b = simplex[0].point;
    let a = simplex[1].point;
    let ab = b - a;
    let ao = -a;
    *direction = triple_cross(ab, ao, ab);
}

fn triangle_case(simplex: &mut Vec<SupportPoint>, direction: &mut Vec3) {
    let c = simplex[0].point;
    let b = simplex[1].point;
    let a = simplex[2].point;
    let ab = b - a;
    let ac = c - a;
    let ao = -a;
    let abc = ab.cross(ac);

    if abc.cross(ac).dot(ao) > 0.0 {
        if ac.dot(ao) > 0.0 {
            simplex.remove(1);
            *direction = triple_cross(ac, ao, ac);
        } else {
            simplex.remove(0);
            line_case(simplex, direction);
        }
    } else if ab.cross(abc).dot(ao) > 0.0 {
        simplex.remove(0);
        line_case(simplex, direction);
    } else if abc.dot(ao) > 0.0 {
        *direction = abc;
    } else {
        simplex.swap(0, 1);
        *direction = -abc;
    }
}

fn tetrahedron_case(simplex: &mut Vec<SupportPoint>, direction: &mut Vec3) -> Option<bool> {
    let d = simplex[0].point;
    let c = simplex[1].point;
    let b = simplex[2].point;
    let a = simplex[3].point;
    let ao = -a;

    let abc = (b - a).cross(c - a);
    let acd = (c - a).cross(d - a);
    let adb = (d - a).cross(b - a);

    if abc.dot(ao) > 0.0 {
        *simplex = vec![simplex[1], simplex[2], simplex[3]];
        triangle_case(simplex, direction);
        return None;
    }
    if acd.dot(ao) > 0.0 {
        *simplex = vec![simplex[0], simplex[1], simplex[3]];
        triangle_case(simplex, direction);
        return None;
    }
    if adb.dot(ao) > 0.0 {
        *simplex = vec![simplex[2], simplex[0], simplex[3]];
        triangle_case(simplex, direction);
        return None;
    }
    Some(true)
}

fn triple_cross(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    a.cross(b).cross(c)
}

#[derive(Debug, Clone, Copy)]
struct PolytopeFace {
    indices: [usize; 3],
    normal: Vec3,
    distance: f32,
}

fn make_face(points: &[SupportPoint], indices: [usize; 3]) -> PolytopeFace {
    let a = points[indices[0]].point;
    let b = points[indices[1]].point;
    let c = points[indices[2]].point;
    let mut normal = (b - a).cross(c - a).normalize();
    if normal.dot(a) < 0.0 {
        normal = -normal;
    }
    PolytopeFace {
        indices,
        normal,
        distance: normal.dot(a),
    }
}

/// Expands the GJK termination simplex (a tetrahedron enclosing the origin)
/// into a penetration depth and normal, then reconstructs contact points by
/// barycentric interpolation of the two underlying supports on the closest
/// face.
fn epa(a: &Collider, b: &Collider, simplex: Vec<SupportPoint>) -> Option<Penetration> {
    let mut points = simplex;
    let mut faces = vec![
        make_face(&points, [0, 1, 2]),
        make_face(&points, [0, 2, 3]),
        make_face(&points, [0, 3, 1]),
        make_face(&points, [1, 3, 2]),
    ];

    for _ in 0..MAX_EPA_ITERATIONS {
        let (closest_idx, closest) = faces
            .iter()
            .enumerate()
            .min_by(|(_, f1), (_, f2)| f1.distance.partial_cmp(&f2.distance).unwrap())
            .map(|(i, f)| (i, *f))?;

        let new_support = support(a, b, closest.normal);
        let new_distance = new_support.point.dot(closest.normal);

        if new_distance - closest.distance < EPA_TOLERANCE {
            return Some(reconstruct(&points, closest));
        }

        let new_index = points.len();
        points.push(new_support);

        let mut edges: Vec<[usize; 2]> = Vec::new();
        let mut keep = Vec::with_capacity(faces.len());
        for (i, face) in faces.iter().enumerate() {
            if i == closest_idx || face.normal.dot(new_support.point - points[face.indices[0]].point) > 0.0 {
                add_unique_edge(&mut edges, [face.indices[0], face.indices[1]]);
                add_unique_edge(&mut edges, [face.indices[1], face.indices[2]]);
                add_unique_edge(&mut edges, [face.indices[2], face.indices[0]]);
            } else {
                keep.push(*face);
            }
        }

        faces = keep;
        for edge in edges {
            faces.push(make_face(&points, [edge[0], edge[1], new_index]));
        }
    }

    faces
        .iter()
        .min_by(|f1, f2| f1.distance.partial_cmp(&f2.distance).unwrap())
        .map(|f| reconstruct(&points, *f))
}

fn add_unique_edge(edges: &mut Vec<[usize; 2]>, edge: [usize; 2]) {
    if let Some(pos) = edges.iter().position(|&e| e == [edge[1], edge[0]]) {
        edges.remove(pos);
    } else {
        edges.push(edge);
    }
}

fn reconstruct(points: &[SupportPoint], face: PolytopeFace) -> Penetration {
    let p0 = points[face.indices[0]];
    let p1 = points[face.indices[1]];
    let p2 = points[face.indices[2]];
    let origin_proj = face.normal * face.distance;

    let (u, v, w) = barycentric(origin_proj, p0.point, p1.point, p2.point);

    Penetration {
        point_a: p0.on_a * u + p1.on_a * v + p2.on_a * w,
        point_b: p0.on_b * u + p1.on_b * v + p2.on_b * w,
        normal: face.normal,
        depth: face.distance,
    }
}

fn barycentric(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> (f32, f32, f32) {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() <= crate::math::EPSILON {
        return (1.0, 0.0, 0.0);
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    let u = 1.0 - v - w;
    (u, v, w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Quaternion;
    use crate::physics::shape::Shape;

    fn sphere(position: Vec3, radius: f32) -> Collider {
        Collider::new(
            Shape::Sphere,
            position,
            Quaternion::IDENTITY,
            Vec3::new(radius, radius, radius),
        )
    }

    #[test]
    fn overlapping_spheres_report_penetration_along_center_line() {
        let a = sphere(Vec3::ZERO, 1.0);
        let b = sphere(Vec3::new(1.5, 0.0, 0.0), 1.0);
        let result = penetration(&a, &b).expect("spheres overlap");
        assert!((result.depth - 0.5).abs() < 1e-2);
        assert!(result.normal.dot(Vec3::X) > 0.9);
    }

    #[test]
    fn separated_spheres_report_no_penetration() {
        let a = sphere(Vec3::ZERO, 1.0);
        let b = sphere(Vec3::new(5.0, 0.0, 0.0), 1.0);
        assert!(penetration(&a, &b).is_none());
    }

    #[test]
    fn overlapping_cubes_report_positive_depth() {
        let a = Collider::new(Shape::unit_cube(), Vec3::ZERO, Quaternion::IDENTITY, Vec3::ONE);
        let b = Collider::new(
            Shape::unit_cube(),
            Vec3::new(1.8, 0.0, 0.0),
            Quaternion::IDENTITY,
            Vec3::ONE,
        );
        let result = penetration(&a, &b).expect("cubes overlap");
        assert!(result.depth > 0.0);
    }
}
