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

//! Error types returned by the physics core's public API.

use crate::physics::handle::BodyHandle;
use thiserror::Error;

/// Errors the physics core can report.
///
/// Every input here has total, defined numerical behavior (see the module
/// docs on `World::step`); this enum exists to reject misuse at the API
/// boundary, not to recover from internal arithmetic failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    /// The handle was never returned by `add_body`, or its body has since been removed.
    #[error("unknown body handle: {handle:?}")]
    UnknownHandle {
        /// The handle that failed to resolve.
        handle: BodyHandle,
    },

    /// The supplied shape has no meaningful volume (a convex hull with fewer
    /// than 4 vertices, or a sphere with non-positive radius).
    #[error("degenerate shape: {0}")]
    DegenerateShape(String),

    /// A NaN or infinite value reached an API that requires finite input.
    #[error("non-finite input: {0}")]
    NonFiniteInput(String),
}
