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

//! # Physics core
//!
//! A synchronous rigid-body simulation core: colliders and shapes, a dynamic
//! AABB tree for broad-phase, SAT/GJK narrow-phase collision detection,
//! persistent contact manifolds, and a sequential-impulse velocity solver.
//!
//! [`World`] is the single entry point: it owns every body, the broad-phase
//! tree, and the manifold store, and advances the whole simulation one fixed
//! step at a time via [`World::step`].

mod body;
mod bvh;
mod config;
mod manifold;
mod narrowphase;
mod solver;
mod world;

pub mod collider;
pub mod error;
pub mod handle;
pub mod shape;

pub use body::{BodyKind, BodySpec, RigidBody};
pub use collider::Collider;
pub use config::WorldConfig;
pub use error::PhysicsError;
pub use handle::BodyHandle;
pub use manifold::{ContactPoint, Manifold};
pub use shape::Shape;
pub use world::{BodyView, World};
