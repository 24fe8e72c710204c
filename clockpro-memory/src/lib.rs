// Copyright 2026 clockpro Project Authors
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

//! In-memory CLOCK-Pro cache.
//!
//! The cache keeps at most `capacity` resident values. Resident entries are split into hot and cold ones, and the
//! keys of recently evicted cold entries are remembered without their values so that a quick re-access can be
//! recognized. The hot/cold split adapts to the workload from those re-accesses.

mod cache;
mod clock_pro;

/// Key to record lookup table.
pub mod indexer;
/// Cache records and their replacement state.
pub mod record;
/// Circular lists with a CLOCK hand.
pub mod ring;

/// Public API of the in-memory cache.
pub mod prelude;
pub use prelude::*;
