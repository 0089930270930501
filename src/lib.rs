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

//! # impulse3d
//!
//! A synchronous, single-threaded 3D rigid-body simulation core: a dynamic
//! AABB tree for broad-phase, SAT/GJK narrow-phase collision detection,
//! persistent contact manifolds, and a sequential-impulse velocity solver
//! integrated with semi-implicit Euler.
//!
//! The crate has no rendering, scene-graph, or asset-loading surface; it
//! exposes a [`physics::World`] that owns every body and collider and steps
//! the simulation forward in discrete time increments.

#![warn(missing_docs)]

pub mod math;
pub mod physics;

pub use physics::World;
