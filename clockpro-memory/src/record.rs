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

use std::fmt::Debug;

use bitflags::bitflags;
use clockpro_common::slab::Token;

use crate::ring::{Link, Linked};

/// Replacement state of a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Resident and part of the frequently reused working set.
    Hot,
    /// Resident, kept for recency and not proven hot yet.
    ColdResident,
    /// Evicted. Only the key is kept as metadata to detect a re-access.
    ColdNonResident,
}

bitflags! {
    /// Per-record flags of the CLOCK-Pro algorithm.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u8 {
        /// Accessed since the last hand sweep.
        const REFERENCED = 0b00000001;
        /// In its test period.
        ///
        /// For a newly admitted record it means "not proven hot yet". For a record demoted from the hot ring it
        /// marks a probe used to detect an undersized hot capacity.
        const TEST = 0b00000010;
    }
}

/// [`Record`] holds the information of a cached entry.
///
/// A record is mutated in place for its whole lifetime, its token never changes while it moves between rings.
pub struct Record<K, V> {
    key: K,
    value: Option<V>,
    hash: u64,
    state: State,
    flags: Flags,
    link: Link,
}

impl<K, V> Debug for Record<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("hash", &self.hash)
            .field("state", &self.state)
            .field("flags", &self.flags)
            .field("resident", &self.value.is_some())
            .field("link", &self.link)
            .finish()
    }
}

impl<K, V> Record<K, V> {
    /// Create a new cold resident record in its test period, stored under `token`.
    pub fn new(token: Token, key: K, value: V, hash: u64) -> Self {
        Self {
            key,
            value: Some(value),
            hash,
            state: State::ColdResident,
            flags: Flags::TEST,
            link: Link::new(token),
        }
    }

    /// Get the record key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Get the record value, `None` if the payload has been dropped.
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    /// Replace the record value, returns the previous payload.
    pub fn set_value(&mut self, value: V) -> Option<V> {
        self.value.replace(value)
    }

    /// Drop the payload of the record, returns it.
    pub fn take_value(&mut self) -> Option<V> {
        self.value.take()
    }

    /// Get the record hash.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Get the record state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Set the record state.
    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }

    /// Get the record flags.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Set or clear the given flags.
    pub fn set_flags(&mut self, flags: Flags, val: bool) {
        self.flags.set(flags, val);
    }

    /// Check if all the given flags are set.
    pub fn has_flags(&self, flags: Flags) -> bool {
        self.flags.contains(flags)
    }

    /// Check if the reference flag is set.
    pub fn is_referenced(&self) -> bool {
        self.has_flags(Flags::REFERENCED)
    }

    /// Check if the test flag is set.
    pub fn is_test(&self) -> bool {
        self.has_flags(Flags::TEST)
    }

    /// Decompose the record into its key and payload.
    pub fn into_parts(self) -> (K, Option<V>) {
        (self.key, self.value)
    }
}

impl<K, V> Linked for Record<K, V> {
    fn link(&self) -> &Link {
        &self.link
    }

    fn link_mut(&mut self) -> &mut Link {
        &mut self.link
    }
}
