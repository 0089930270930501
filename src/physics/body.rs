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

//! Rigid bodies: mass properties, velocities, force accumulators, and the
//! semi-implicit Euler integration step.

use crate::math::{Mat3, Quaternion, Vec3};
use crate::physics::collider::Collider;
use crate::physics::shape::Shape;

/// Whether a body is simulated or treated as immovable scenery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Responds to forces, torques, and collisions.
    Dynamic,
    /// Infinite mass; only its collider's pose caches are refreshed per step.
    Static,
}

/// Everything needed to add a body to a [`crate::physics::World`].
///
/// Mirrors the corpus's `*Desc` convention (e.g. `RigidBodyDesc`): a plain,
/// `Default`-able struct the caller fills in rather than a long constructor
/// argument list.
#[derive(Debug, Clone)]
pub struct BodySpec {
    /// Local-space shape description.
    pub shape: Shape,
    /// Initial world-space position.
    pub position: Vec3,
    /// Initial world-space orientation.
    pub rotation: Quaternion,
    /// Non-uniform local-space scale; drives a sphere's effective radius.
    pub scale: Vec3,
    /// Dynamic or static.
    pub kind: BodyKind,
    /// Mass in kilograms; ignored for static bodies.
    pub mass: f32,
    /// Coefficient of restitution used by the solver's velocity bias.
    pub restitution: f32,
    /// Whether gravity is applied to this body when the world has gravity enabled.
    pub takes_gravity: bool,
}

impl Default for BodySpec {
    fn default() -> Self {
        Self {
            shape: Shape::Sphere,
            position: Vec3::ZERO,
            rotation: Quaternion::IDENTITY,
            scale: Vec3::ONE,
            kind: BodyKind::Dynamic,
            mass: 1.0,
            restitution: 0.3,
            takes_gravity: true,
        }
    }
}

/// A simulated rigid body: mass properties, velocities, force accumulators,
/// and an owned [`Collider`].
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub(crate) kind: BodyKind,
    pub(crate) inverse_mass: f32,
    /// Body-space inertia tensor; zero for static bodies.
    pub(crate) inertia_local: Mat3,
    /// Inverse of `inertia_local`; zero for static bodies.
    pub(crate) inverse_inertia_local: Mat3,
    /// World-space inverse inertia tensor, refreshed every integration step.
    pub(crate) inverse_inertia_world: Mat3,

    pub(crate) linear_velocity: Vec3,
    pub(crate) angular_velocity: Vec3,

    pub(crate) net_force: Vec3,
    pub(crate) net_torque: Vec3,
    pub(crate) gravity_force: Vec3,
    pub(crate) takes_gravity: bool,

    pub(crate) restitution: f32,
    pub(crate) fat_extent: f32,

    pub(crate) prev_position: Vec3,
    pub(crate) prev_rotation: Quaternion,

    /// Owned world-space collider and its cached derived geometry.
    pub collider: Collider,
}

impl RigidBody {
    /// Builds a body from a [`BodySpec`], computing mass properties from the
    /// shape's local extents. Returns `None` if the shape is degenerate (the
    /// caller turns this into `PhysicsError::DegenerateShape`).
    pub fn new(spec: BodySpec, fat_extent: f32) -> Option<Self> {
        if spec.shape.is_degenerate() || spec.mass <= 0.0 {
            return None;
        }

        let collider = Collider::new(spec.shape, spec.position, spec.rotation, spec.scale);
        if matches!(collider.shape, Shape::Sphere) && collider.world_radius() <= 0.0 {
            return None;
        }

        let is_dynamic = matches!(spec.kind, BodyKind::Dynamic);
        let inverse_mass = if is_dynamic { 1.0 / spec.mass } else { 0.0 };

        let inertia_local = if is_dynamic {
            local_inertia_tensor(&collider, spec.mass)
        } else {
            Mat3::ZERO
        };
        let inverse_inertia_local = if is_dynamic {
            inertia_local.inverse().unwrap_or(Mat3::ZERO)
        } else {
            Mat3::ZERO
        };
        let inverse_inertia_world = if is_dynamic {
            world_inverse_inertia(&inverse_inertia_local, collider.rotation.normalize())
        } else {
            Mat3::ZERO
        };

        Some(Self {
            kind: spec.kind,
            inverse_mass,
            inertia_local,
            inverse_inertia_local,
            inverse_inertia_world,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            net_force: Vec3::ZERO,
            net_torque: Vec3::ZERO,
            gravity_force: Vec3::ZERO,
            takes_gravity: spec.takes_gravity,
            restitution: spec.restitution,
            fat_extent,
            prev_position: collider.position,
            prev_rotation: collider.rotation,
            collider,
        })
    }

    /// True for bodies the solver and integrator treat as movable.
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        matches!(self.kind, BodyKind::Dynamic)
    }

    /// Current linear velocity.
    #[inline]
    pub fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    /// Current angular velocity.
    #[inline]
    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    /// Accumulates a force for the next integration step (world space, applied
    /// at the center of mass).
    pub fn apply_force(&mut self, force: Vec3) {
        if self.is_dynamic() {
            self.net_force = self.net_force + force;
        }
    }

    /// Accumulates a torque for the next integration step (world space).
    pub fn apply_torque(&mut self, torque: Vec3) {
        if self.is_dynamic() {
            self.net_torque = self.net_torque + torque;
        }
    }

    /// Directly sets linear and angular velocity, bypassing force accumulation.
    pub fn set_velocity(&mut self, linear: Vec3, angular: Vec3) {
        if self.is_dynamic() {
            self.linear_velocity = linear;
            self.angular_velocity = angular;
        }
    }

    /// Advances a dynamic body one step with semi-implicit (symplectic) Euler
    /// integration, or, for a static body, only refreshes its collider caches.
    ///
    /// Order: gravity accumulation, velocity integration, position/orientation
    /// integration, world-space inverse-inertia refresh, accumulator reset,
    /// collider refit. See the module docs on `World::step` for why this
    /// ordering matters for warm starting.
    pub fn integrate(&mut self, dt: f32, gravity: Vec3, gravity_enabled: bool) {
        if !self.is_dynamic() {
            self.collider.refit();
            return;
        }

        self.prev_position = self.collider.position;
        self.prev_rotation = self.collider.rotation;

        self.gravity_force = if gravity_enabled && self.takes_gravity {
            gravity * (1.0 / self.inverse_mass)
        } else {
            Vec3::ZERO
        };
        let total_force = self.net_force + self.gravity_force;

        self.linear_velocity = self.linear_velocity + total_force * self.inverse_mass * dt;
        self.angular_velocity = self.angular_velocity + self.net_torque * dt;

        self.collider.position = self.collider.position + self.linear_velocity * dt;
        self.rotate_by(dt);

        self.inverse_inertia_world =
            world_inverse_inertia(&self.inverse_inertia_local, self.collider.rotation);

        self.net_force = Vec3::ZERO;
        self.net_torque = Vec3::ZERO;

        self.collider.refit();
    }

    fn rotate_by(&mut self, dt: f32) {
        let spin = Quaternion::new(
            self.angular_velocity.x,
            self.angular_velocity.y,
            self.angular_velocity.z,
            0.0,
        );
        let delta = (spin * self.collider.rotation) * (0.5 * dt);
        let integrated = self.collider.rotation + delta;
        self.collider.rotation = if integrated.magnitude_squared() > crate::math::EPSILON {
            integrated.normalize()
        } else {
            self.prev_rotation
        };
    }
}

/// Rotates a body-space inverse inertia tensor into world space: `R I⁻¹ Rᵀ`.
/// Equivalent to inverting `R I Rᵀ` since `R` is orthonormal, but avoids a
/// per-step 3x3 inverse.
fn world_inverse_inertia(inverse_inertia_local: &Mat3, rotation: Quaternion) -> Mat3 {
    let r = Mat3::from_quat(rotation);
    r * (*inverse_inertia_local) * r.transpose()
}

/// Computes a diagonal box-inertia-tensor approximation from the collider's
/// local half-extents, used for both sphere and convex shapes.
///
/// A true inertia tensor for an arbitrary convex hull requires integrating
/// over its volume; the source this crate is grounded on only ever spawns
/// spheres and boxes, so it gets away with closed-form formulas keyed on
/// shape type. Here every convex is approximated by the box its local
/// vertices bound, which is exact for the canonical cube and a reasonable
/// approximation for other hulls.
fn local_inertia_tensor(collider: &Collider, mass: f32) -> Mat3 {
    match &collider.shape {
        Shape::Sphere => {
            let r = collider.world_radius();
            let i = 0.4 * mass * r * r;
            Mat3::from_cols(
                Vec3::new(i, 0.0, 0.0),
                Vec3::new(0.0, i, 0.0),
                Vec3::new(0.0, 0.0, i),
            )
        }
        Shape::Convex { vertices, .. } => {
            let mut half = Vec3::ZERO;
            for v in vertices {
                half = half.max(v.abs());
            }
            let half = half * collider.scale;
            let full = half * 2.0;
            let k = mass / 12.0;
            Mat3::from_cols(
                Vec3::new(k * (full.y * full.y + full.z * full.z), 0.0, 0.0),
                Vec3::new(0.0, k * (full.x * full.x + full.z * full.z), 0.0),
                Vec3::new(0.0, 0.0, k * (full.x * full.x + full.y * full.y)),
            )
        }
    }
}
