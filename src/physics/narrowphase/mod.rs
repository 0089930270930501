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

//! Narrow-phase collision detection: dispatch by shape-type pair to
//! sphere/sphere, sphere/convex, or convex/convex (SAT + clipping), producing
//! the contact points fed to a [`crate::physics::Manifold`].
//!
//! Grounded on the corpus's `collision.rs` dispatch-by-match style, with the
//! convex/convex path enriched from a reference-quality SAT + Sutherland-
//! Hodgman implementation (see [`gjk`] for the alternative Minkowski-based
//! entry point, not wired into this dispatch).

pub mod gjk;
mod sat;

use crate::physics::collider::Collider;
use crate::physics::handle::BodyHandle;
use crate::physics::manifold::NewContact;
use crate::physics::shape::Shape;

/// Runs narrow-phase detection on a candidate pair and, if they overlap,
/// returns the ordered pair `(reference, incident)` plus the contact points
/// generated against it. `restitution` is left at `0.0` on every returned
/// contact; the caller (the world) fills it in from the two bodies' material
/// properties, since a collider alone doesn't carry one.
pub fn detect(
    handle_a: BodyHandle,
    collider_a: &Collider,
    handle_b: BodyHandle,
    collider_b: &Collider,
) -> Option<(BodyHandle, BodyHandle, Vec<NewContact>)> {
    match (&collider_a.shape, &collider_b.shape) {
        (Shape::Sphere, Shape::Sphere) => {
            sphere_sphere(collider_a, collider_b).map(|c| (handle_a, handle_b, c))
        }
        (Shape::Sphere, Shape::Convex { .. }) => {
            sphere_convex(collider_b, collider_a).map(|c| (handle_b, handle_a, c))
        }
        (Shape::Convex { .. }, Shape::Sphere) => {
            sphere_convex(collider_a, collider_b).map(|c| (handle_a, handle_b, c))
        }
        (Shape::Convex { .. }, Shape::Convex { .. }) => {
            sat::convex_convex(collider_a, collider_b).map(|(swap, contacts)| {
                if swap {
                    (handle_b, handle_a, contacts)
                } else {
                    (handle_a, handle_b, contacts)
                }
            })
        }
    }
}

/// `|c_a - c_b| <= r_a + r_b`; normal from A to B, contact at the midpoint of
/// the two surface points.
fn sphere_sphere(a: &Collider, b: &Collider) -> Option<Vec<NewContact>> {
    let ra = a.world_radius();
    let rb = b.world_radius();
    let delta = b.position - a.position;
    let dist = delta.length();
    if dist > ra + rb {
        return None;
    }

    let n = if dist > crate::math::EPSILON {
        delta / dist
    } else {
        crate::math::Vec3::Y
    };
    let point_a = a.position + n * ra;
    let point_b = b.position - n * rb;
    let midpoint = (point_a + point_b) * 0.5;

    Some(vec![NewContact {
        point_a: midpoint,
        point_b: midpoint,
        normal: n,
        penetration: ra + rb - dist,
        restitution: 0.0,
    }])
}

/// Treats the convex as the reference: for every world-space face, the
/// signed distance `d = (v0 - c_sphere) . n + r` is the depth against that
/// face's plane offset by the sphere's radius. Any `d <= 0` separates the
/// pair; the minimum positive `d` is the penetration and its face normal is
/// the contact normal.
fn sphere_convex(convex: &Collider, sphere: &Collider) -> Option<Vec<NewContact>> {
    let c = sphere.position;
    let r = sphere.world_radius();

    let mut min_depth = f32::INFINITY;
    let mut best_normal = None;

    for face in &convex.world_faces {
        let v0 = face.vertices[0];
        let n = face.normal;
        let d = (v0 - c).dot(n) + r;
        if d <= 0.0 {
            return None;
        }
        if d < min_depth {
            min_depth = d;
            best_normal = Some(n);
        }
    }

    let n = best_normal?;
    let point_on_sphere = c - n * r;
    let point_on_convex = point_on_sphere + n * min_depth;

    Some(vec![NewContact {
        point_a: point_on_convex,
        point_b: point_on_sphere,
        normal: n,
        penetration: min_depth,
        restitution: 0.0,
    }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Quaternion, Vec3};
    use crate::physics::handle::BodyHandle;

    fn sphere(position: Vec3, radius: f32) -> Collider {
        Collider::new(
            Shape::Sphere,
            position,
            Quaternion::IDENTITY,
            Vec3::new(radius, radius, radius),
        )
    }

    fn handles() -> (BodyHandle, BodyHandle) {
        (BodyHandle::new(0, 0), BodyHandle::new(1, 0))
    }

    #[test]
    fn overlapping_spheres_produce_one_contact_with_normal_a_to_b() {
        let a = sphere(Vec3::ZERO, 1.0);
        let b = sphere(Vec3::new(1.5, 0.0, 0.0), 1.0);
        let contacts = sphere_sphere(&a, &b).unwrap();
        assert_eq!(contacts.len(), 1);
        assert!((contacts[0].penetration - 0.5).abs() < 1e-5);
        assert!((contacts[0].normal - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn separated_spheres_do_not_collide() {
        let a = sphere(Vec3::ZERO, 1.0);
        let b = sphere(Vec3::new(5.0, 0.0, 0.0), 1.0);
        assert!(sphere_sphere(&a, &b).is_none());
    }

    #[test]
    fn sphere_resting_on_cube_face_collides_along_face_normal() {
        let cube = Collider::new(
            Shape::unit_cube(),
            Vec3::ZERO,
            Quaternion::IDENTITY,
            Vec3::ONE,
        );
        let ball = sphere(Vec3::new(0.0, 0.0, 1.5), 1.0);
        let contacts = sphere_convex(&cube, &ball).unwrap();
        assert_eq!(contacts.len(), 1);
        assert!((contacts[0].normal - Vec3::Z).length() < 1e-4);
        assert!((contacts[0].penetration - 0.5).abs() < 1e-4);
    }

    #[test]
    fn sphere_far_from_cube_does_not_collide() {
        let cube = Collider::new(
            Shape::unit_cube(),
            Vec3::ZERO,
            Quaternion::IDENTITY,
            Vec3::ONE,
        );
        let ball = sphere(Vec3::new(0.0, 0.0, 10.0), 1.0);
        assert!(sphere_convex(&cube, &ball).is_none());
    }

    #[test]
    fn dispatch_orders_convex_first_for_sphere_convex_pairs() {
        let cube = Collider::new(
            Shape::unit_cube(),
            Vec3::ZERO,
            Quaternion::IDENTITY,
            Vec3::ONE,
        );
        let ball = sphere(Vec3::new(0.0, 0.0, 1.5), 1.0);
        let (ha, hb) = handles();

        let (ref_handle, inc_handle, contacts) = detect(ha, &ball, hb, &cube).unwrap();
        assert_eq!(ref_handle, hb);
        assert_eq!(inc_handle, ha);
        assert_eq!(contacts.len(), 1);
    }
}
