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

//! End-to-end scenarios driving the simulation entirely through the public
//! `World` API (no internal module access), one scene per test.

use anyhow::Result;
use impulse3d::math::{Quaternion, Vec3};
use impulse3d::physics::{BodyKind, BodySpec, Shape, World, WorldConfig};

const DT: f32 = 1.0 / 60.0;

/// Initializes the `env_logger` subscriber once per test binary so a failing
/// scenario's `trace!`/`debug!` output from the solver and narrow phase is
/// visible when run with `RUST_LOG` set; harmless to call more than once.
fn init_logging() {
    let _ = env_logger::try_init();
}

fn unit_sphere(position: Vec3) -> BodySpec {
    BodySpec {
        shape: Shape::Sphere,
        position,
        scale: Vec3::ONE,
        ..Default::default()
    }
}

fn static_floor(half_extents: Vec3, position: Vec3) -> BodySpec {
    BodySpec {
        shape: Shape::unit_cube(),
        position,
        scale: half_extents,
        kind: BodyKind::Static,
        ..Default::default()
    }
}

fn unit_cube(position: Vec3) -> BodySpec {
    BodySpec {
        shape: Shape::unit_cube(),
        position,
        scale: Vec3::ONE,
        ..Default::default()
    }
}

/// S1: a unit sphere dropped onto a static floor settles near the resting
/// height with near-zero velocity instead of sinking through.
#[test]
fn falling_sphere_settles_on_floor() -> Result<()> {
    init_logging();
    let mut world = World::new(WorldConfig::default());
    let floor = world.add_body(static_floor(Vec3::new(30.0, 30.0, 1.0), Vec3::ZERO))?;
    let ball = world.add_body(unit_sphere(Vec3::new(0.0, 0.0, 2.0)))?;

    for _ in 0..120 {
        world.step(DT)?;
    }

    let resting_z = world.body(floor)?.position().z + 1.0 + 1.0;
    let final_z = world.body(ball)?.position().z;
    assert!(
        (final_z - resting_z).abs() < 0.05,
        "expected sphere to settle near z={resting_z}, got {final_z}"
    );
    assert!(world.body(ball)?.linear_velocity().length() < 0.1);
    Ok(())
}

/// S2: two equal-mass spheres on a head-on collision course conserve
/// momentum along the collision axis and separate after the solve.
#[test]
fn head_on_spheres_conserve_momentum_and_separate() -> Result<()> {
    init_logging();
    let mut world = World::new(WorldConfig::default());
    world.set_gravity_enabled(false);

    let a = world.add_body(BodySpec {
        shape: Shape::Sphere,
        position: Vec3::new(-2.0, 0.0, 0.0),
        scale: Vec3::ONE,
        restitution: 1.0,
        ..Default::default()
    })?;
    let b = world.add_body(BodySpec {
        shape: Shape::Sphere,
        position: Vec3::new(2.0, 0.0, 0.0),
        scale: Vec3::ONE,
        restitution: 1.0,
        ..Default::default()
    })?;
    world.set_velocity(a, Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO)?;
    world.set_velocity(b, Vec3::new(-5.0, 0.0, 0.0), Vec3::ZERO)?;

    let mut contacted = false;
    for _ in 0..60 {
        world.step(DT)?;
        if world.contacts().next().is_some() {
            contacted = true;
            break;
        }
    }
    assert!(contacted, "spheres never collided");

    let (_, _, points) = world.contacts().next().expect("contact this step");
    let normal = points[0].normal;

    let va = world.body(a)?.linear_velocity();
    let vb = world.body(b)?.linear_velocity();

    assert!(
        (va.x + vb.x).abs() <= 0.2,
        "momentum along x should be ~conserved, got va={va:?} vb={vb:?}"
    );
    assert!(
        (vb - va).dot(normal) > 0.0,
        "bodies should be separating along the contact normal after the solve"
    );
    Ok(())
}

/// S3: two unit cubes stacked on a static floor come to rest with bounded
/// penetration instead of sinking or exploding apart.
#[test]
fn box_on_box_stack_settles_with_bounded_penetration() -> Result<()> {
    init_logging();
    let config = WorldConfig::default();
    let mut world = World::new(config);

    world.add_body(static_floor(Vec3::new(30.0, 30.0, 1.0), Vec3::new(0.0, 0.0, -1.0)))?;
    let bottom = world.add_body(unit_cube(Vec3::new(0.0, 0.0, 1.0)))?;
    let top = world.add_body(unit_cube(Vec3::new(0.0, 0.0, 3.0)))?;

    for _ in 0..180 {
        world.step(DT)?;
    }

    assert!(world.body(bottom)?.linear_velocity().length() < 0.05);
    assert!(world.body(top)?.linear_velocity().length() < 0.05);

    let max_penetration = world
        .contacts()
        .flat_map(|(_, _, points)| points.iter().map(|p| p.penetration))
        .fold(0.0_f32, f32::max);
    assert!(
        max_penetration <= config.slop + 0.02,
        "max penetration {max_penetration} exceeds slop + 0.02"
    );
    Ok(())
}

/// S5: a sustained box-on-floor contact keeps a manifold (with a non-zero,
/// bounded accumulated impulse) alive across many steps, and drops it the
/// first step the pair stops overlapping.
#[test]
fn manifold_persists_while_touching_and_is_culled_on_separation() -> Result<()> {
    init_logging();
    let mut world = World::new(WorldConfig::default());
    world.add_body(static_floor(Vec3::new(10.0, 10.0, 1.0), Vec3::new(0.0, 0.0, -1.0)))?;
    let box_handle = world.add_body(unit_cube(Vec3::new(0.0, 0.0, 1.0)))?;

    for _ in 0..60 {
        world.step(DT)?;
        let (_, _, points) = world.contacts().next().expect("manifold should persist while resting");
        for p in points {
            assert!(p.normal_impulse > 0.0, "resting contact should carry a positive impulse");
            assert!(p.normal_impulse < 1000.0, "impulse should stay bounded");
        }
    }

    world.set_velocity(box_handle, Vec3::new(0.0, 0.0, 50.0), Vec3::ZERO)?;
    world.step(DT)?;
    assert!(
        world.contacts().next().is_none(),
        "manifold should be culled the first step the pair no longer overlaps"
    );
    Ok(())
}

/// S6: a sphere grazing a tilted cube face produces a single contact whose
/// normal matches the cube face's world-space normal.
#[test]
fn sphere_grazes_tilted_cube_face_with_matching_normal() -> Result<()> {
    init_logging();
    let mut world = World::new(WorldConfig::default());
    world.set_gravity_enabled(false);

    let tilt = Quaternion::from_axis_angle(Vec3::Y, 0.3);
    let expected_normal = tilt.rotate_vec3(Vec3::Z).normalize();

    world.add_body(BodySpec {
        shape: Shape::unit_cube(),
        position: Vec3::ZERO,
        rotation: tilt,
        scale: Vec3::ONE,
        kind: BodyKind::Static,
        ..Default::default()
    })?;

    let sphere_center = expected_normal * (1.0 + 1.0 - 0.01);
    world.add_body(unit_sphere(sphere_center))?;

    world.step(DT)?;

    let (_, _, points) = world.contacts().next().expect("sphere should graze the tilted face");
    assert_eq!(points.len(), 1);
    assert!(
        (points[0].normal - expected_normal).length() < 1e-3,
        "contact normal {:?} should match face normal {:?}",
        points[0].normal,
        expected_normal
    );
    Ok(())
}

/// Invariant 4: a manifold never reports zero points while `colliding`, and
/// never exceeds the four-point cap, across a full stacking run.
#[test]
fn manifold_point_count_stays_within_bounds() -> Result<()> {
    init_logging();
    let mut world = World::new(WorldConfig::default());
    world.add_body(static_floor(Vec3::new(30.0, 30.0, 1.0), Vec3::new(0.0, 0.0, -1.0)))?;
    world.add_body(unit_cube(Vec3::new(0.0, 0.0, 1.0)))?;

    for _ in 0..120 {
        world.step(DT)?;
        for (_, _, points) in world.contacts() {
            assert!(!points.is_empty());
            assert!(points.len() <= 4);
        }
    }
    Ok(())
}

/// Invariant 6: with gravity disabled and no initial velocity, a body's
/// kinetic energy stays at zero over a long run.
#[test]
fn energy_sanity_with_gravity_disabled() -> Result<()> {
    init_logging();
    let mut world = World::new(WorldConfig::default());
    world.set_gravity_enabled(false);
    let handle = world.add_body(unit_sphere(Vec3::new(0.0, 0.0, 10.0)))?;

    for _ in 0..1000 {
        world.step(DT)?;
    }

    let v = world.body(handle)?.linear_velocity();
    let omega = world.body(handle)?.angular_velocity();
    assert!(v.length_squared() < 1e-6);
    assert!(omega.length_squared() < 1e-6);
    Ok(())
}

/// Invariant 7: swapping which sphere is added first produces contact
/// normals equal in magnitude and opposite in sign.
#[test]
fn sphere_sphere_contact_normal_is_symmetric_under_swap() -> Result<()> {
    init_logging();
    let mut forward = World::new(WorldConfig::default());
    forward.set_gravity_enabled(false);
    forward.add_body(BodySpec {
        shape: Shape::Sphere,
        position: Vec3::new(-1.0, 0.0, 0.0),
        scale: Vec3::ONE,
        ..Default::default()
    })?;
    forward.add_body(BodySpec {
        shape: Shape::Sphere,
        position: Vec3::new(1.0, 0.0, 0.0),
        scale: Vec3::ONE,
        ..Default::default()
    })?;
    forward.step(DT)?;
    let (_, _, fwd_points) = forward.contacts().next().expect("spheres overlap");
    let fwd_normal = fwd_points[0].normal;

    let mut swapped = World::new(WorldConfig::default());
    swapped.set_gravity_enabled(false);
    swapped.add_body(BodySpec {
        shape: Shape::Sphere,
        position: Vec3::new(1.0, 0.0, 0.0),
        scale: Vec3::ONE,
        ..Default::default()
    })?;
    swapped.add_body(BodySpec {
        shape: Shape::Sphere,
        position: Vec3::new(-1.0, 0.0, 0.0),
        scale: Vec3::ONE,
        ..Default::default()
    })?;
    swapped.step(DT)?;
    let (_, _, swap_points) = swapped.contacts().next().expect("spheres overlap");
    let swap_normal = swap_points[0].normal;

    assert!((fwd_normal.length() - swap_normal.length()).abs() < 1e-5);
    assert!((fwd_normal + swap_normal).length() < 1e-4, "normals should be opposite");
    Ok(())
}

/// Invariant 8 (proxy): a resting stack's maximum per-contact impulse
/// converges to a stable, bounded value rather than growing without limit
/// once warm starting has kicked in.
#[test]
fn warm_started_stack_impulses_converge() -> Result<()> {
    init_logging();
    let mut world = World::new(WorldConfig::default());
    world.add_body(static_floor(Vec3::new(30.0, 30.0, 1.0), Vec3::new(0.0, 0.0, -1.0)))?;
    for i in 0..4 {
        world.add_body(unit_cube(Vec3::new(0.0, 0.0, 1.0 + 2.0 * i as f32)))?;
    }

    let mut last_max_impulse = f32::INFINITY;
    for step in 0..300 {
        world.step(DT)?;
        if step >= 200 {
            let max_impulse = world
                .contacts()
                .flat_map(|(_, _, points)| points.iter().map(|p| p.normal_impulse))
                .fold(0.0_f32, f32::max);
            assert!(max_impulse.is_finite());
            assert!(max_impulse < 10_000.0, "impulse should stay bounded, got {max_impulse}");
            last_max_impulse = max_impulse;
        }
    }
    assert!(last_max_impulse.is_finite());
    Ok(())
}
