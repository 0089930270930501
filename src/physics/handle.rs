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

//! Generational handles identifying live bodies in a [`crate::physics::World`].

use std::fmt;

/// A unique identifier for a rigid body owned by a [`crate::physics::World`].
///
/// It combines a slot index with a generation count to solve the "ABA problem":
/// when a body is removed, its slot can be recycled for a new body, but the
/// generation is incremented. A stale `BodyHandle` pointing at a recycled slot
/// then fails to compare equal to the live handle and is rejected as unknown.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl BodyHandle {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Debug for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BodyHandle({}#{})", self.index, self.generation)
    }
}
