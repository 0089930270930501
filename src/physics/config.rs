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

//! World tunables, mirroring the corpus's `*Desc`/`*Options` convention: a
//! plain, `Default`-implementing struct a caller fills in rather than a long
//! constructor argument list.

use crate::math::Vec3;

/// Tunable parameters for a [`crate::physics::World`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldConfig {
    /// Acceleration applied to dynamic bodies with `takes_gravity` set, when
    /// gravity is enabled.
    pub gravity: Vec3,
    /// Number of sequential-impulse velocity iterations per step.
    pub velocity_iterations: u32,
    /// Baumgarte positional-bias factor.
    pub bias_factor: f32,
    /// Penetration ignored by the positional bias, stabilizes resting contact.
    pub slop: f32,
    /// Constant extent a tight AABB is fattened by before insertion into the BVH.
    pub fat_extent: f32,
    /// Relative-velocity cutoff below which the restitution bias applies; keeps
    /// resting contacts from bouncing.
    pub restitution_threshold: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, 0.0, -9.8),
            velocity_iterations: 20,
            bias_factor: 0.1,
            slop: 0.005,
            fat_extent: 0.2,
            restitution_threshold: -0.5,
        }
    }
}
