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

//! Sequential-impulse velocity solver: normal-only (no friction), with
//! Baumgarte positional bias and warm starting from the previous step's
//! accumulated impulses.
//!
//! Grounded on the corpus's `ImpulseSolver` (linear-only, single contact),
//! generalized to multi-point manifolds with angular terms per a standard
//! sequential-impulse formulation.

use crate::math::Vec3;
use crate::physics::body::RigidBody;
use crate::physics::manifold::Manifold;

/// Per-body kinematic state the solver reads and writes; avoids borrowing
/// both bodies of a pair mutably at once when they may be the same index in
/// a caller's storage (never true for a real pair, but keeps the solver's
/// API independent of how the world stores bodies).
pub struct BodyState {
    /// Inverse mass (0 for static bodies).
    pub inverse_mass: f32,
    /// World-space inverse inertia tensor (zero for static bodies).
    pub inverse_inertia_world: crate::math::Mat3,
    /// Current linear velocity.
    pub linear_velocity: Vec3,
    /// Current angular velocity.
    pub angular_velocity: Vec3,
    /// Current world-space position, used to compute contact arms.
    pub position: Vec3,
}

impl BodyState {
    /// Snapshots the solver-relevant state out of a body.
    pub fn from_body(body: &RigidBody) -> Self {
        Self {
            inverse_mass: body.inverse_mass,
            inverse_inertia_world: body.inverse_inertia_world,
            linear_velocity: body.linear_velocity,
            angular_velocity: body.angular_velocity,
            position: body.collider.position,
        }
    }

    /// Writes the solved velocities back onto the owning body.
    pub fn write_back(&self, body: &mut RigidBody) {
        body.linear_velocity = self.linear_velocity;
        body.angular_velocity = self.angular_velocity;
    }
}

/// Computes `K_n`, `normal_mass`, and the restitution velocity bias for
/// every contact in `manifold`, given the current velocities of its two
/// bodies. Called once per manifold per step, before warm start.
pub fn prepare(manifold: &mut Manifold, body_a: &BodyState, body_b: &BodyState, restitution_threshold: f32) {
    for contact in &mut manifold.points {
        let r_a = contact.point_a - body_a.position;
        let r_b = contact.point_b - body_b.position;
        let n = contact.normal;

        let angular_a = n.dot((body_a.inverse_inertia_world * r_a.cross(n)).cross(r_a));
        let angular_b = n.dot((body_b.inverse_inertia_world * r_b.cross(n)).cross(r_b));
        let k_n = body_a.inverse_mass + body_b.inverse_mass + angular_a + angular_b;
        contact.normal_mass = if k_n > 0.0 { 1.0 / k_n } else { 0.0 };

        let relative_velocity = n.dot(
            body_b.linear_velocity + body_b.angular_velocity.cross(r_b)
                - body_a.linear_velocity
                - body_a.angular_velocity.cross(r_a),
        );

        contact.velocity_bias = if relative_velocity < restitution_threshold {
            -contact.restitution * relative_velocity
        } else {
            0.0
        };
    }
}

/// Re-applies every `resting` contact's stored `normal_impulse`, updating
/// both bodies' linear and angular velocities. Non-resting contacts start
/// from zero impulse, matching a fresh contact's initial state.
pub fn warm_start(manifold: &Manifold, body_a: &mut BodyState, body_b: &mut BodyState) {
    for contact in &manifold.points {
        if !contact.resting || contact.normal_impulse == 0.0 {
            continue;
        }
        let r_a = contact.point_a - body_a.position;
        let r_b = contact.point_b - body_b.position;
        let impulse = contact.normal * contact.normal_impulse;
        apply_impulse(body_a, body_b, impulse, r_a, r_b);
    }
}

/// One velocity-iteration pass over every contact in `manifold`: recomputes
/// the relative velocity, the Baumgarte position bias, solves for the
/// incremental impulse, clamps the accumulated impulse to be non-negative,
/// and applies the incremental part.
pub fn iterate(
    manifold: &mut Manifold,
    body_a: &mut BodyState,
    body_b: &mut BodyState,
    dt: f32,
    bias_factor: f32,
    slop: f32,
) {
    for contact in &mut manifold.points {
        if contact.normal_mass <= 0.0 {
            continue;
        }
        let r_a = contact.point_a - body_a.position;
        let r_b = contact.point_b - body_b.position;
        let n = contact.normal;

        let relative_velocity = n.dot(
            body_b.linear_velocity + body_b.angular_velocity.cross(r_b)
                - body_a.linear_velocity
                - body_a.angular_velocity.cross(r_a),
        );

        let position_bias = (bias_factor / dt) * (contact.penetration - slop).max(0.0);
        let lambda = -(relative_velocity - (position_bias + contact.velocity_bias)) * contact.normal_mass;

        let new_impulse = (contact.normal_impulse + lambda).max(0.0);
        let applied = new_impulse - contact.normal_impulse;
        contact.normal_impulse = new_impulse;

        let impulse = n * applied;
        apply_impulse(body_a, body_b, impulse, r_a, r_b);
    }
}

fn apply_impulse(body_a: &mut BodyState, body_b: &mut BodyState, impulse: Vec3, r_a: Vec3, r_b: Vec3) {
    body_a.linear_velocity = body_a.linear_velocity - impulse * body_a.inverse_mass;
    body_a.angular_velocity = body_a.angular_velocity - (body_a.inverse_inertia_world * r_a.cross(impulse));

    body_b.linear_velocity = body_b.linear_velocity + impulse * body_b.inverse_mass;
    body_b.angular_velocity = body_b.angular_velocity + (body_b.inverse_inertia_world * r_b.cross(impulse));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Mat3;
    use crate::physics::handle::BodyHandle;
    use crate::physics::manifold::NewContact;

    fn unit_state(inverse_mass: f32, position: Vec3) -> BodyState {
        BodyState {
            inverse_mass,
            inverse_inertia_world: Mat3::ZERO,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            position,
        }
    }

    fn contact(penetration: f32) -> NewContact {
        NewContact {
            point_a: Vec3::new(0.0, 0.0, 0.5),
            point_b: Vec3::new(0.0, 0.0, 0.5),
            normal: Vec3::Z,
            penetration,
            restitution: 0.0,
        }
    }

    #[test]
    fn prepare_computes_positive_normal_mass_for_two_dynamic_bodies() {
        let mut manifold = Manifold::new(BodyHandle::new(0, 0), BodyHandle::new(1, 0));
        manifold.merge(&[contact(0.1)]);
        let a = unit_state(1.0, Vec3::new(0.0, 0.0, -0.5));
        let b = unit_state(1.0, Vec3::new(0.0, 0.0, 1.5));

        prepare(&mut manifold, &a, &b, -0.5);
        assert!((manifold.points[0].normal_mass - 0.5).abs() < 1e-5);
    }

    #[test]
    fn iterate_pushes_approaching_bodies_apart() {
        let mut manifold = Manifold::new(BodyHandle::new(0, 0), BodyHandle::new(1, 0));
        manifold.merge(&[contact(0.1)]);

        let mut a = unit_state(1.0, Vec3::new(0.0, 0.0, -0.5));
        let mut b = unit_state(1.0, Vec3::new(0.0, 0.0, 1.5));
        b.linear_velocity = Vec3::new(0.0, 0.0, -1.0);

        prepare(&mut manifold, &a, &b, -0.5);
        for _ in 0..20 {
            iterate(&mut manifold, &mut a, &mut b, 1.0 / 60.0, 0.1, 0.005);
        }

        assert!(manifold.points[0].normal_impulse > 0.0);
        assert!(b.linear_velocity.z > -1.0);
    }

    #[test]
    fn impulse_never_goes_negative() {
        let mut manifold = Manifold::new(BodyHandle::new(0, 0), BodyHandle::new(1, 0));
        manifold.merge(&[contact(0.1)]);

        let mut a = unit_state(1.0, Vec3::new(0.0, 0.0, -0.5));
        let mut b = unit_state(1.0, Vec3::new(0.0, 0.0, 1.5));
        b.linear_velocity = Vec3::new(0.0, 0.0, 5.0);

        prepare(&mut manifold, &a, &b, -0.5);
        for _ in 0..20 {
            iterate(&mut manifold, &mut a, &mut b, 1.0 / 60.0, 0.1, 0.005);
        }
        assert_eq!(manifold.points[0].normal_impulse, 0.0);
    }

    #[test]
    fn warm_start_skips_non_resting_contacts() {
        let mut manifold = Manifold::new(BodyHandle::new(0, 0), BodyHandle::new(1, 0));
        manifold.merge(&[contact(0.1)]);
        manifold.points[0].normal_impulse = 10.0;

        let mut a = unit_state(1.0, Vec3::new(0.0, 0.0, -0.5));
        let mut b = unit_state(1.0, Vec3::new(0.0, 0.0, 1.5));
        warm_start(&manifold, &mut a, &mut b);

        assert_eq!(a.linear_velocity, Vec3::ZERO);
        assert_eq!(b.linear_velocity, Vec3::ZERO);
    }
}
