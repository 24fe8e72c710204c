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

//! A thread-safe, capacity-bounded key/value cache with the CLOCK-Pro replacement policy.
//!
//! ```
//! use clockpro::Cache;
//!
//! let cache: Cache<String, u64> = Cache::new(2);
//! cache.insert("a".to_string(), 1);
//! assert_eq!(cache.get("a"), Some(1));
//! ```

pub use clockpro_common as common;
pub use clockpro_memory as memory;

/// Commonly used types.
pub mod prelude;
pub use prelude::*;
