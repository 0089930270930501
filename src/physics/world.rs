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

//! The simulation entry point: owns every body, the broad-phase tree, and
//! the manifold store, and advances the whole simulation one fixed step at a
//! time.
//!
//! `World::step` runs, per tick: integrate dynamic bodies, refit the BVH,
//! collect broad-phase candidate pairs, dispatch narrow phase per pair,
//! merge contacts into persistent manifolds, run the sequential-impulse
//! solver, then cull manifolds that stopped colliding.
//!
//! A note on position integration: [`crate::physics::body::RigidBody::integrate`]
//! advances both velocity and position in one call (semi-implicit Euler),
//! invoked once per step before collision detection. The solver below only
//! corrects velocities; it does not re-advance position a second time. A
//! resolved velocity therefore takes effect on the *next* step's integrate
//! call, one frame later than the impulse that produced it. See `DESIGN.md`
//! for why this reading was chosen over a second post-solve position
//! integration.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use crate::math::{Aabb, Quaternion, Vec3};
use crate::physics::body::{BodySpec, RigidBody};
use crate::physics::bvh::DynamicBvh;
use crate::physics::config::WorldConfig;
use crate::physics::error::PhysicsError;
use crate::physics::handle::BodyHandle;
use crate::physics::manifold::{ContactPoint, Manifold};
use crate::physics::narrowphase;
use crate::physics::solver;

struct Slot {
    body: Option<RigidBody>,
    generation: u32,
    leaf: usize,
}

/// A read-only view onto a live body's pose, velocity, and bounding volume.
pub struct BodyView<'a> {
    body: &'a RigidBody,
}

impl<'a> BodyView<'a> {
    /// World-space position.
    pub fn position(&self) -> Vec3 {
        self.body.collider.position
    }

    /// World-space orientation.
    pub fn rotation(&self) -> Quaternion {
        self.body.collider.rotation
    }

    /// Current linear velocity.
    pub fn linear_velocity(&self) -> Vec3 {
        self.body.linear_velocity()
    }

    /// Current angular velocity.
    pub fn angular_velocity(&self) -> Vec3 {
        self.body.angular_velocity()
    }

    /// Current (tight, not fattened) world AABB.
    pub fn aabb(&self) -> Aabb {
        self.body.collider.aabb
    }

    /// Whether the body is simulated (vs. static scenery).
    pub fn is_dynamic(&self) -> bool {
        self.body.is_dynamic()
    }
}

/// Owns every rigid body, the broad-phase tree, and the persistent manifold
/// store, and advances the simulation one fixed step at a time.
pub struct World {
    config: WorldConfig,
    gravity_enabled: bool,
    slots: Vec<Slot>,
    free_indices: Vec<u32>,
    tree: DynamicBvh<BodyHandle>,
    manifolds: HashMap<(BodyHandle, BodyHandle), Manifold>,
}

impl World {
    /// Creates an empty world with the given tunables.
    pub fn new(config: WorldConfig) -> Self {
        Self {
            config,
            gravity_enabled: true,
            slots: Vec::new(),
            free_indices: Vec::new(),
            tree: DynamicBvh::new(),
            manifolds: HashMap::new(),
        }
    }

    /// Enables or disables gravity for every body with `takes_gravity` set.
    pub fn set_gravity_enabled(&mut self, enabled: bool) {
        self.gravity_enabled = enabled;
    }

    /// Adds a body, registering a leaf in the broad-phase tree.
    ///
    /// Rejects a degenerate shape or non-positive mass (`DegenerateShape`) and
    /// any NaN/infinite pose or scale component (`NonFiniteInput`).
    pub fn add_body(&mut self, spec: BodySpec) -> Result<BodyHandle, PhysicsError> {
        if !vec3_finite(spec.position) || !quat_finite(spec.rotation) || !vec3_finite(spec.scale) {
            warn!("add_body rejected: non-finite pose or scale");
            return Err(PhysicsError::NonFiniteInput(
                "body spec pose/scale must be finite".into(),
            ));
        }

        let body = RigidBody::new(spec, self.config.fat_extent).ok_or_else(|| {
            warn!("add_body rejected: degenerate shape or non-positive mass");
            PhysicsError::DegenerateShape("shape has fewer than 4 vertices, no faces, or non-positive extent".into())
        })?;

        let fat = fatten(&body.collider.aabb, self.config.fat_extent);

        let index = if let Some(index) = self.free_indices.pop() {
            index
        } else {
            self.slots.push(Slot {
                body: None,
                generation: 0,
                leaf: 0,
            });
            (self.slots.len() - 1) as u32
        };

        let generation = self.slots[index as usize].generation;
        let handle = BodyHandle::new(index, generation);
        let leaf = self.tree.insert(fat, handle);

        self.slots[index as usize].body = Some(body);
        self.slots[index as usize].leaf = leaf;

        debug!("add_body: {:?}", handle);
        Ok(handle)
    }

    /// Removes a body, freeing its slot (generation bumped so stale handles
    /// are rejected) and every manifold referencing it.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<(), PhysicsError> {
        self.check_live(handle)?;
        let idx = handle.index as usize;

        self.tree.remove(self.slots[idx].leaf);
        self.slots[idx].body = None;
        self.slots[idx].generation = self.slots[idx].generation.wrapping_add(1);
        self.free_indices.push(handle.index);
        self.manifolds.retain(|_, m| m.body_a != handle && m.body_b != handle);

        debug!("remove_body: {:?}", handle);
        Ok(())
    }

    /// A read-only view of a live body.
    pub fn body(&self, handle: BodyHandle) -> Result<BodyView<'_>, PhysicsError> {
        self.check_live(handle).map(|body| BodyView { body })
    }

    /// Directly sets a dynamic body's velocity, bypassing force accumulation.
    pub fn set_velocity(&mut self, handle: BodyHandle, linear: Vec3, angular: Vec3) -> Result<(), PhysicsError> {
        if !vec3_finite(linear) || !vec3_finite(angular) {
            warn!("set_velocity rejected: non-finite input for {:?}", handle);
            return Err(PhysicsError::NonFiniteInput("velocity must be finite".into()));
        }
        self.body_mut(handle)?.set_velocity(linear, angular);
        Ok(())
    }

    /// Accumulates a force for the next integration step.
    pub fn apply_force(&mut self, handle: BodyHandle, force: Vec3) -> Result<(), PhysicsError> {
        if !vec3_finite(force) {
            warn!("apply_force rejected: non-finite input for {:?}", handle);
            return Err(PhysicsError::NonFiniteInput("force must be finite".into()));
        }
        self.body_mut(handle)?.apply_force(force);
        Ok(())
    }

    /// Accumulates a torque for the next integration step.
    pub fn apply_torque(&mut self, handle: BodyHandle, torque: Vec3) -> Result<(), PhysicsError> {
        if !vec3_finite(torque) {
            warn!("apply_torque rejected: non-finite input for {:?}", handle);
            return Err(PhysicsError::NonFiniteInput("torque must be finite".into()));
        }
        self.body_mut(handle)?.apply_torque(torque);
        Ok(())
    }

    /// Every currently-colliding pair and its contact points, for observation/debug.
    pub fn contacts(&self) -> impl Iterator<Item = (BodyHandle, BodyHandle, &[ContactPoint])> {
        self.manifolds
            .values()
            .filter(|m| m.colliding)
            .map(|m| (m.body_a, m.body_b, m.points.as_slice()))
    }

    /// Advances the simulation by `dt` seconds: integrate, refit, broad
    /// phase, narrow phase, solve, cull.
    pub fn step(&mut self, dt: f32) -> Result<(), PhysicsError> {
        if !dt.is_finite() {
            warn!("step rejected: non-finite dt");
            return Err(PhysicsError::NonFiniteInput("dt must be finite".into()));
        }

        for slot in &mut self.slots {
            if let Some(body) = slot.body.as_mut() {
                body.integrate(dt, self.config.gravity, self.gravity_enabled);
            }
        }

        for slot in &mut self.slots {
            if let Some(body) = &slot.body {
                let displacement = body.linear_velocity() * dt;
                self.tree.update(slot.leaf, body.collider.aabb, displacement, self.config.fat_extent);
            }
        }

        let pairs = self.candidate_pairs();
        debug!("broad phase: {} candidate pairs", pairs.len());

        let mut touched = HashSet::new();
        for (h1, h2) in pairs {
            let body1_dynamic = self.slots[h1.index as usize].body.as_ref().unwrap().is_dynamic();
            let body2_dynamic = self.slots[h2.index as usize].body.as_ref().unwrap().is_dynamic();
            if !body1_dynamic && !body2_dynamic {
                continue;
            }

            let collider1 = self.slots[h1.index as usize].body.as_ref().unwrap().collider.clone();
            let collider2 = self.slots[h2.index as usize].body.as_ref().unwrap().collider.clone();

            let Some((reference, incident, mut contacts)) = narrowphase::detect(h1, &collider1, h2, &collider2) else {
                continue;
            };

            let restitution_ref = self.slots[reference.index as usize].body.as_ref().unwrap().restitution;
            let restitution_inc = self.slots[incident.index as usize].body.as_ref().unwrap().restitution;
            let combined_restitution = restitution_ref.max(restitution_inc);
            for c in &mut contacts {
                c.restitution = combined_restitution;
            }

            let key = canonical_key(reference, incident);
            touched.insert(key);

            let manifold = self
                .manifolds
                .entry(key)
                .or_insert_with(|| Manifold::new(reference, incident));
            manifold.body_a = reference;
            manifold.body_b = incident;
            manifold.merge(&contacts);
        }

        for (key, manifold) in self.manifolds.iter_mut() {
            if !touched.contains(key) {
                manifold.merge(&[]);
            }
        }
        self.manifolds.retain(|_, m| m.colliding);
        debug!("narrow phase: {} active manifolds", self.manifolds.len());

        for manifold in self.manifolds.values_mut() {
            let idx_a = manifold.body_a.index as usize;
            let idx_b = manifold.body_b.index as usize;

            let mut state_a = solver::BodyState::from_body(self.slots[idx_a].body.as_ref().unwrap());
            let mut state_b = solver::BodyState::from_body(self.slots[idx_b].body.as_ref().unwrap());

            solver::prepare(manifold, &state_a, &state_b, self.config.restitution_threshold);
            solver::warm_start(manifold, &mut state_a, &mut state_b);
            for _ in 0..self.config.velocity_iterations {
                solver::iterate(manifold, &mut state_a, &mut state_b, dt, self.config.bias_factor, self.config.slop);
            }

            if let Some(body) = self.slots[idx_a].body.as_mut() {
                state_a.write_back(body);
            }
            if let Some(body) = self.slots[idx_b].body.as_mut() {
                state_b.write_back(body);
            }
        }

        Ok(())
    }

    fn candidate_pairs(&self) -> Vec<(BodyHandle, BodyHandle)> {
        let mut seen = HashSet::new();
        let mut pairs = Vec::new();
        for (a, b) in self.tree.collect_pairs() {
            if a == b {
                continue;
            }
            let key = canonical_key(a, b);
            if seen.insert(key) {
                pairs.push(key);
            }
        }
        pairs
    }

    fn check_live(&self, handle: BodyHandle) -> Result<&RigidBody, PhysicsError> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.body.as_ref())
            .ok_or(PhysicsError::UnknownHandle { handle })
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut RigidBody, PhysicsError> {
        let idx = handle.index as usize;
        match self.slots.get(idx) {
            Some(slot) if slot.generation == handle.generation && slot.body.is_some() => {
                Ok(self.slots[idx].body.as_mut().unwrap())
            }
            _ => Err(PhysicsError::UnknownHandle { handle }),
        }
    }
}

fn canonical_key(a: BodyHandle, b: BodyHandle) -> (BodyHandle, BodyHandle) {
    if a.index < b.index || (a.index == b.index && a.generation <= b.generation) {
        (a, b)
    } else {
        (b, a)
    }
}

fn fatten(aabb: &Aabb, extent: f32) -> Aabb {
    let margin = Vec3::new(extent, extent, extent);
    Aabb::from_min_max(aabb.min - margin, aabb.max + margin)
}

fn vec3_finite(v: Vec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

fn quat_finite(q: Quaternion) -> bool {
    q.x.is_finite() && q.y.is_finite() && q.z.is_finite() && q.w.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body::BodyKind;
    use crate::physics::shape::Shape;

    fn falling_sphere_spec(z: f32) -> BodySpec {
        BodySpec {
            shape: Shape::Sphere,
            position: Vec3::new(0.0, 0.0, z),
            scale: Vec3::ONE,
            ..Default::default()
        }
    }

    #[test]
    fn add_and_remove_body_round_trips() {
        let mut world = World::new(WorldConfig::default());
        let handle = world.add_body(falling_sphere_spec(5.0)).unwrap();
        assert!(world.body(handle).is_ok());
        world.remove_body(handle).unwrap();
        assert!(world.body(handle).is_err());
    }

    #[test]
    fn stale_handle_after_removal_is_rejected() {
        let mut world = World::new(WorldConfig::default());
        let handle = world.add_body(falling_sphere_spec(5.0)).unwrap();
        world.remove_body(handle).unwrap();
        let reused = world.add_body(falling_sphere_spec(3.0)).unwrap();
        assert_ne!(handle, reused);
        assert!(world.body(handle).is_err());
        assert!(world.body(reused).is_ok());
    }

    #[test]
    fn non_finite_step_input_is_rejected() {
        let mut world = World::new(WorldConfig::default());
        assert!(world.step(f32::NAN).is_err());
    }

    #[test]
    fn degenerate_shape_is_rejected_with_typed_error() {
        let mut world = World::new(WorldConfig::default());
        let spec = BodySpec {
            shape: Shape::Convex {
                vertices: vec![Vec3::ZERO, Vec3::X],
                faces: vec![],
                edges: vec![],
            },
            ..Default::default()
        };
        assert!(matches!(
            world.add_body(spec),
            Err(PhysicsError::DegenerateShape(_))
        ));
    }

    #[test]
    fn falling_sphere_gains_downward_velocity_over_several_steps() {
        let mut world = World::new(WorldConfig::default());
        let handle = world.add_body(falling_sphere_spec(50.0)).unwrap();
        for _ in 0..10 {
            world.step(1.0 / 60.0).unwrap();
        }
        assert!(world.body(handle).unwrap().linear_velocity().z < 0.0);
    }

    #[test]
    fn two_spheres_on_collision_course_produce_a_contact() {
        let mut world = World::new(WorldConfig::default());
        world.set_gravity_enabled(false);
        let a = world
            .add_body(BodySpec {
                shape: Shape::Sphere,
                position: Vec3::new(-2.0, 0.0, 0.0),
                scale: Vec3::ONE,
                ..Default::default()
            })
            .unwrap();
        let b = world
            .add_body(BodySpec {
                shape: Shape::Sphere,
                position: Vec3::new(2.0, 0.0, 0.0),
                scale: Vec3::ONE,
                ..Default::default()
            })
            .unwrap();
        world.set_velocity(a, Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO).unwrap();
        world.set_velocity(b, Vec3::new(-5.0, 0.0, 0.0), Vec3::ZERO).unwrap();

        let mut saw_contact = false;
        for _ in 0..30 {
            world.step(1.0 / 60.0).unwrap();
            if world.contacts().next().is_some() {
                saw_contact = true;
                break;
            }
        }
        assert!(saw_contact);
    }

    #[test]
    fn static_body_never_falls_and_never_pairs_with_another_static_body() {
        let mut world = World::new(WorldConfig::default());
        let ground = world
            .add_body(BodySpec {
                shape: Shape::unit_cube(),
                position: Vec3::ZERO,
                scale: Vec3::new(20.0, 20.0, 0.5),
                kind: BodyKind::Static,
                ..Default::default()
            })
            .unwrap();
        let ground_b = world
            .add_body(BodySpec {
                shape: Shape::unit_cube(),
                position: Vec3::new(0.0, 0.0, 0.4),
                scale: Vec3::new(20.0, 20.0, 0.5),
                kind: BodyKind::Static,
                ..Default::default()
            })
            .unwrap();

        world.step(1.0 / 60.0).unwrap();
        assert_eq!(world.body(ground).unwrap().linear_velocity(), Vec3::ZERO);
        assert_eq!(world.body(ground_b).unwrap().linear_velocity(), Vec3::ZERO);
        assert!(world.contacts().next().is_none());
    }
}
