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

//! Persistent contact manifolds: up to four contact points per colliding
//! body pair, carried across steps so the solver can warm-start.

use crate::math::Vec3;
use crate::physics::handle::BodyHandle;

/// Maximum simultaneous contact points a manifold tracks.
pub const MAX_POINTS: usize = 4;

/// A single contact between two colliders, as reported by the narrow phase
/// for one frame, before it has been merged into a persistent manifold.
#[derive(Debug, Clone, Copy)]
pub struct NewContact {
    /// Contact point on body A, world space.
    pub point_a: Vec3,
    /// Contact point on body B, world space.
    pub point_b: Vec3,
    /// Unit normal pointing from body A toward body B.
    pub normal: Vec3,
    /// Penetration depth along `normal` (positive when overlapping).
    pub penetration: f32,
    /// Combined restitution for this contact (see `World`'s combine rule).
    pub restitution: f32,
}

/// One point of a persistent contact manifold.
#[derive(Debug, Clone, Copy)]
pub struct ContactPoint {
    /// Contact point on body A, world space.
    pub point_a: Vec3,
    /// Contact point on body B, world space.
    pub point_b: Vec3,
    /// Unit normal pointing from body A toward body B.
    pub normal: Vec3,
    /// Penetration depth along `normal`.
    pub penetration: f32,
    /// Combined restitution for this contact.
    pub restitution: f32,
    /// Accumulated normal impulse magnitude, carried across steps for warm starting.
    pub normal_impulse: f32,
    /// Restitution velocity bias computed during solver preparation.
    pub velocity_bias: f32,
    /// Effective normal mass (`1/K_n`) computed during solver preparation.
    pub normal_mass: f32,
    /// True if this point matched a point from the previous step (eligible for warm start).
    pub resting: bool,
}

impl ContactPoint {
    fn fresh(new: NewContact) -> Self {
        Self {
            point_a: new.point_a,
            point_b: new.point_b,
            normal: new.normal,
            penetration: new.penetration,
            restitution: new.restitution,
            normal_impulse: 0.0,
            velocity_bias: 0.0,
            normal_mass: 0.0,
            resting: false,
        }
    }

    fn refresh_geometry(&mut self, new: NewContact) {
        self.point_a = new.point_a;
        self.point_b = new.point_b;
        self.normal = new.normal;
        self.penetration = new.penetration;
        self.restitution = new.restitution;
        self.resting = true;
    }
}

/// A persistent manifold between an ordered pair of bodies `(body_a, body_b)`.
#[derive(Debug, Clone)]
pub struct Manifold {
    /// Reference body of the pair (as chosen by the narrow phase's SAT hysteresis).
    pub body_a: BodyHandle,
    /// Incident body of the pair.
    pub body_b: BodyHandle,
    /// Up to [`MAX_POINTS`] persistent contact points.
    pub points: Vec<ContactPoint>,
    /// Whether the narrow phase reported an overlap for this pair this step.
    pub colliding: bool,
}

impl Manifold {
    /// Creates an empty manifold for the given ordered pair.
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            points: Vec::with_capacity(MAX_POINTS),
            colliding: false,
        }
    }

    /// Merges this step's narrow-phase contacts into the persistent point
    /// set: bit-exact or near-feature matches keep (and mark `resting`) the
    /// existing slot so its accumulated impulse survives; otherwise the point
    /// is appended (below `MAX_POINTS`) or replaces the shallowest point.
    pub fn merge(&mut self, new_points: &[NewContact]) {
        for p in &mut self.points {
            p.resting = false;
        }

        for &new in new_points {
            if let Some(existing) = self
                .points
                .iter_mut()
                .find(|p| p.point_a == new.point_a && p.point_b == new.point_b)
            {
                existing.refresh_geometry(new);
                continue;
            }

            if let Some(existing) = self.points.iter_mut().find(|p| {
                p.point_a.distance(new.point_a) < 1e-3 && p.point_b.distance(new.point_b) < 1e-3
            }) {
                existing.refresh_geometry(new);
                continue;
            }

            if self.points.len() < MAX_POINTS {
                self.points.push(ContactPoint::fresh(new));
            } else {
                let (idx, _) = self
                    .points
                    .iter()
                    .enumerate()
                    .min_by(|a, b| a.1.penetration.partial_cmp(&b.1.penetration).unwrap())
                    .expect("manifold at capacity has points");
                self.points[idx] = ContactPoint::fresh(new);
            }
        }

        self.colliding = !new_points.is_empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handles() -> (BodyHandle, BodyHandle) {
        (BodyHandle::new(0, 0), BodyHandle::new(1, 0))
    }

    fn contact(x: f32, penetration: f32) -> NewContact {
        NewContact {
            point_a: Vec3::new(x, 0.0, 0.0),
            point_b: Vec3::new(x, 0.0, 0.1),
            normal: Vec3::Z,
            penetration,
            restitution: 0.3,
        }
    }

    #[test]
    fn first_merge_is_never_resting() {
        let (a, b) = handles();
        let mut m = Manifold::new(a, b);
        m.merge(&[contact(0.0, 0.01)]);
        assert_eq!(m.points.len(), 1);
        assert!(!m.points[0].resting);
        assert!(m.colliding);
    }

    #[test]
    fn matching_point_next_frame_is_marked_resting_and_keeps_impulse() {
        let (a, b) = handles();
        let mut m = Manifold::new(a, b);
        m.merge(&[contact(0.0, 0.01)]);
        m.points[0].normal_impulse = 4.2;

        m.merge(&[contact(0.0, 0.012)]);
        assert_eq!(m.points.len(), 1);
        assert!(m.points[0].resting);
        assert_eq!(m.points[0].normal_impulse, 4.2);
        assert!((m.points[0].penetration - 0.012).abs() < 1e-6);
    }

    #[test]
    fn fifth_point_replaces_shallowest() {
        let (a, b) = handles();
        let mut m = Manifold::new(a, b);
        m.merge(&[
            contact(0.0, 0.10),
            contact(1.0, 0.02),
            contact(2.0, 0.20),
            contact(3.0, 0.05),
        ]);
        assert_eq!(m.points.len(), 4);

        m.merge(&[contact(9.0, 0.30)]);
        assert_eq!(m.points.len(), 4);
        assert!(m.points.iter().any(|p| p.point_a.x == 9.0));
        assert!(!m.points.iter().any(|p| p.point_a.x == 1.0));
    }

    #[test]
    fn no_contacts_marks_not_colliding() {
        let (a, b) = handles();
        let mut m = Manifold::new(a, b);
        m.merge(&[contact(0.0, 0.01)]);
        m.merge(&[]);
        assert!(!m.colliding);
    }
}
