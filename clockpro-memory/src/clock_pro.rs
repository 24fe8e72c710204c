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

//! The CLOCK-Pro replacement engine.
//!
//! Resident records are split into a hot ring and a cold ring. Keys of recently evicted cold records in their test
//! period are kept in a third, non-resident ring. An access to such a key reveals that the hot set is too small and
//! grows the hot capacity, the split between hot and cold capacity adapts to the workload this way.
//!
//! Reference: Song Jiang, Feng Chen, Xiaodong Zhang. "CLOCK-Pro: An Effective Improvement of the CLOCK
//! Replacement", USENIX ATC 2005.

use std::{
    hash::{BuildHasher, Hash},
    sync::Arc,
};

use clockpro_common::{
    code::{Key, Value},
    error::{Error, Result},
    event::{Event, EventListener},
    slab::{Slab, Token},
    strict_assert, strict_assert_eq, strict_assert_ne,
};
use equivalent::Equivalent;
use serde::{Deserialize, Serialize};

use crate::{
    indexer::Indexer,
    record::{Flags, Record, State},
    ring::{Linked, Ring, RingId},
};

const HOT: RingId = RingId(0);
const COLD: RingId = RingId(1);
const META: RingId = RingId(2);

/// Clock-Pro eviction algorithm config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockProConfig {
    /// The initial ratio of the capacity reserved for hot records.
    ///
    /// The ratio only seeds the hot/cold split, which adapts to the workload afterwards. The hot capacity is always
    /// clamped into `[1, capacity - 1]`.
    ///
    /// Must be in [0, 1.0].
    pub hot_ratio: f64,
}

impl Default for ClockProConfig {
    fn default() -> Self {
        Self { hot_ratio: 0.5 }
    }
}

impl ClockProConfig {
    /// Check the config.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.hot_ratio) {
            return Err(Error::config(format!(
                "hot_ratio must be in 0.0..=1.0, given: {}",
                self.hot_ratio
            )));
        }
        Ok(())
    }
}

/// What happened to the record picked by a hand sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Victim {
    /// Payload dropped, key kept as non-resident metadata.
    Ghost,
    /// Moved from the hot ring to the cold ring, still resident.
    Demoted,
    /// Dropped entirely.
    Removed,
}

/// Shared event listener.
pub type Listener<K, V> = Arc<dyn EventListener<Key = K, Value = V>>;

/// The CLOCK-Pro engine.
///
/// A plain sequential state machine, see [`crate::Cache`] for the thread-safe facade.
pub struct ClockPro<K, V, S = ahash::RandomState> {
    slab: Slab<Record<K, V>>,
    indexer: Indexer,

    hot: Ring,
    cold: Ring,
    meta: Ring,

    capacity: usize,
    hot_capacity: usize,
    cold_capacity: usize,
    meta_capacity: usize,

    config: ClockProConfig,
    hash_builder: S,
    listener: Option<Listener<K, V>>,
}

impl<K, V, S> ClockPro<K, V, S>
where
    K: Key,
    V: Value,
    S: BuildHasher,
{
    /// Create an engine holding at most `capacity` resident records. A zero capacity is clamped to 1.
    ///
    /// # Panics
    ///
    /// Panics if the config is invalid.
    pub fn new(capacity: usize, config: &ClockProConfig, hash_builder: S) -> Self {
        assert!(
            (0.0..=1.0).contains(&config.hot_ratio),
            "hot_ratio must be in 0.0..=1.0, given: {}",
            config.hot_ratio
        );

        let capacity = capacity.max(1);
        let hot_capacity = clamp_hot(capacity, (capacity as f64 * config.hot_ratio) as usize);

        Self {
            slab: Slab::with_capacity(capacity),
            indexer: Indexer::default(),
            hot: Ring::new(HOT),
            cold: Ring::new(COLD),
            meta: Ring::new(META),
            capacity,
            hot_capacity,
            cold_capacity: capacity - hot_capacity,
            meta_capacity: capacity,
            config: config.clone(),
            hash_builder,
            listener: None,
        }
    }

    /// Set the listener notified whenever a payload leaves the engine.
    pub fn with_listener(mut self, listener: Listener<K, V>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Total capacity of resident records.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current capacity of the hot ring.
    pub fn hot_capacity(&self) -> usize {
        self.hot_capacity
    }

    /// Current capacity of the cold ring.
    pub fn cold_capacity(&self) -> usize {
        self.cold_capacity
    }

    /// Count of resident records.
    pub fn len(&self) -> usize {
        self.hot.len() + self.cold.len()
    }

    /// Check if there is no resident record.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the config.
    pub fn config(&self) -> &ClockProConfig {
        &self.config
    }

    /// Look up a key and account the access.
    ///
    /// Returns `None` on a miss. An access to a non-resident key is a miss as well, but it is recorded: the hot
    /// capacity grows if the key was a probe, and the next insertion of the key is admitted as hot.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        let hash = self.hash_builder.hash_one(key);
        let token = self.indexer.get(&self.slab, hash, key)?;

        if self.slab[token].state() == State::ColdNonResident {
            self.ghost_hit(token);
            return None;
        }

        self.touch(token);
        self.slab[token].value()
    }

    /// Insert or update a key.
    ///
    /// An update counts as an access. A new key evicts first if the engine is full, then joins the cold ring in its
    /// test period.
    pub fn insert(&mut self, key: K, value: V) {
        let hash = self.hash_builder.hash_one(&key);

        if let Some(token) = self.indexer.get(&self.slab, hash, &key) {
            if let Some(old) = self.slab[token].set_value(value) {
                Self::notify(&self.listener, Event::Replace, self.slab[token].key(), &old);
            }
            self.touch(token);
            return;
        }

        self.make_space();

        let token = self
            .slab
            .insert_with(|token| Record::new(token, key, value, hash));
        self.indexer.insert(&self.slab, token);
        self.cold.insert(&mut self.slab, token);
    }

    /// Change the capacity. A zero capacity is clamped to 1.
    ///
    /// The hot/cold split keeps its ratio. Shrinking evicts until the resident records fit, growing never evicts.
    pub fn resize(&mut self, capacity: usize) {
        let capacity = capacity.max(1);
        let old = self.capacity;

        let hot = (self.hot_capacity as u128 * capacity as u128 / old as u128) as usize;
        self.split(capacity, hot);
        self.meta_capacity = capacity;

        while self.len() > capacity {
            if self.evict().is_none() {
                break;
            }
        }
        self.trim_meta();

        tracing::debug!(
            "[clockpro]: resize {} => {}, hot capacity: {}, cold capacity: {}",
            old,
            capacity,
            self.hot_capacity,
            self.cold_capacity
        );
    }

    /// Apply a new config if given, then resize.
    ///
    /// A given config resets the hot/cold split from its ratio. An invalid config is rejected and nothing changes.
    pub fn update(&mut self, capacity: usize, config: Option<&ClockProConfig>) -> Result<()> {
        if let Some(config) = config {
            if let Err(e) = config.validate() {
                tracing::warn!("[clockpro]: update config failed, new configuration ignored: {e}");
                return Err(e);
            }
            self.config = config.clone();
            let hot = (self.capacity as f64 * config.hot_ratio) as usize;
            self.split(self.capacity, hot);
            tracing::debug!("[clockpro]: update config: {:?}", self.config);
        }
        self.resize(capacity);
        Ok(())
    }

    fn split(&mut self, capacity: usize, hot: usize) {
        self.capacity = capacity;
        self.hot_capacity = clamp_hot(capacity, hot);
        self.cold_capacity = capacity - self.hot_capacity;
    }

    /// Account an access to an existing record.
    fn touch(&mut self, token: Token) {
        match self.slab[token].state() {
            State::Hot => self.slab[token].set_flags(Flags::REFERENCED, true),
            State::ColdResident if self.slab[token].is_test() => {
                // Re-accessed within its test period: proven hot.
                self.cold.remove(&mut self.slab, token);
                let record = &mut self.slab[token];
                record.set_flags(Flags::TEST, false);
                record.set_flags(Flags::REFERENCED, true);
                record.set_state(State::Hot);
                self.hot.insert(&mut self.slab, token);

                if self.hot.len() > self.hot_capacity {
                    self.adapt_hot(false);
                }

                tracing::trace!("[clockpro]: promote record (hash: {}) to hot", self.slab[token].hash());
            }
            State::ColdResident => self.slab[token].set_flags(Flags::REFERENCED, true),
            State::ColdNonResident => {
                if self.slab[token].is_test() {
                    self.adapt_hot(true);
                }

                let newest = self.meta.current() == Some(token);
                self.meta.remove(&mut self.slab, token);
                if newest {
                    // Keep the hand at the newest metadata, see `trim_meta`.
                    self.meta.retreat(&self.slab);
                }
                self.make_space();

                let record = &mut self.slab[token];
                record.set_flags(Flags::TEST, false);
                record.set_flags(Flags::REFERENCED, true);
                record.set_state(State::Hot);
                self.hot.insert(&mut self.slab, token);

                tracing::trace!(
                    "[clockpro]: admit non-resident record (hash: {}) as hot",
                    self.slab[token].hash()
                );
            }
        }
    }

    /// A lookup hit a non-resident record. There is no payload to admit, only the bookkeeping is updated.
    fn ghost_hit(&mut self, token: Token) {
        let record = &mut self.slab[token];
        let probe = record.is_test();
        record.set_flags(Flags::TEST, false);
        record.set_flags(Flags::REFERENCED, true);
        if probe {
            self.adapt_hot(true);
        }

        tracing::trace!(
            "[clockpro]: ghost hit on record (hash: {}), probe: {}, hot capacity: {}",
            self.slab[token].hash(),
            probe,
            self.hot_capacity
        );
    }

    /// Move one unit of capacity between the hot and the cold share, within `[1, capacity - 1]`.
    fn adapt_hot(&mut self, increase: bool) {
        if increase && self.hot_capacity + 1 < self.capacity {
            self.hot_capacity += 1;
            self.cold_capacity -= 1;
        } else if !increase && self.hot_capacity > 1 {
            self.hot_capacity -= 1;
            self.cold_capacity += 1;
        }
    }

    /// Evict until there is room for one more resident record.
    fn make_space(&mut self) {
        while self.len() >= self.capacity {
            if self.evict().is_none() {
                break;
            }
        }
    }

    /// One eviction step, cold ring first.
    fn evict(&mut self) -> Option<Victim> {
        if !self.cold.is_empty() {
            // A cold sweep yields nothing if it promoted every record, fall back to the hot ring then.
            if let Some(victim) = self.evict_cold() {
                return Some(victim);
            }
        }
        self.evict_hot()
    }

    fn evict_cold(&mut self) -> Option<Victim> {
        // A second lap is the most a sweep needs.
        let steps = self.cold.len() * 2;

        for _ in 0..steps {
            let token = self.cold.current()?;
            strict_assert_eq!(self.slab[token].state(), State::ColdResident);
            self.cold.advance(&self.slab);
            self.cold.remove(&mut self.slab, token);

            if self.slab[token].is_referenced() {
                let record = &mut self.slab[token];
                record.set_flags(Flags::REFERENCED | Flags::TEST, false);
                record.set_state(State::Hot);
                self.hot.insert(&mut self.slab, token);

                tracing::trace!(
                    "[clockpro]: cold hand promotes record (hash: {}) to hot",
                    self.slab[token].hash()
                );
                continue;
            }

            if !self.slab[token].is_test() {
                self.forget(token);
                return Some(Victim::Removed);
            }

            let record = &mut self.slab[token];
            record.set_state(State::ColdNonResident);
            if let Some(value) = record.take_value() {
                Self::notify(&self.listener, Event::Evict, self.slab[token].key(), &value);
            }
            self.meta.insert(&mut self.slab, token);
            // Keep the hand at the newest metadata, so its successor is the oldest.
            self.meta.advance(&self.slab);
            self.trim_meta();

            tracing::trace!(
                "[clockpro]: evict record (hash: {}) to non-resident",
                self.slab[token].hash()
            );
            return Some(Victim::Ghost);
        }

        None
    }

    fn evict_hot(&mut self) -> Option<Victim> {
        let steps = self.hot.len() * 2;

        for _ in 0..steps {
            let token = self.hot.current()?;
            strict_assert_eq!(self.slab[token].state(), State::Hot);
            self.hot.advance(&self.slab);

            if self.slab[token].is_referenced() {
                self.slab[token].set_flags(Flags::REFERENCED, false);
                continue;
            }

            self.hot.remove(&mut self.slab, token);

            if self.cold.len() >= self.cold_capacity {
                self.forget(token);
                return Some(Victim::Removed);
            }

            let record = &mut self.slab[token];
            record.set_state(State::ColdResident);
            record.set_flags(Flags::TEST, true);
            record.set_flags(Flags::REFERENCED, false);
            self.cold.insert(&mut self.slab, token);
            self.adapt_hot(true);

            tracing::trace!("[clockpro]: demote record (hash: {}) to cold", self.slab[token].hash());
            return Some(Victim::Demoted);
        }

        None
    }

    /// Drop the oldest non-resident metadata until it fits.
    fn trim_meta(&mut self) {
        while self.meta.len() > self.meta_capacity {
            let Some(hand) = self.meta.current() else {
                break;
            };
            let oldest = self.slab[hand].link().next();
            strict_assert_ne!(oldest, hand);
            self.meta.remove(&mut self.slab, oldest);
            self.forget(oldest);
        }
    }

    /// Drop an unlinked record from the indexer and the slab.
    fn forget(&mut self, token: Token) {
        strict_assert!(!self.slab[token].link().is_linked());

        let indexed = self.indexer.remove(&self.slab, token);
        strict_assert!(indexed);

        let Some(record) = self.slab.remove(token) else {
            unreachable!("forget vacant record {token:?}");
        };
        let (key, value) = record.into_parts();
        if let Some(value) = value {
            Self::notify(&self.listener, Event::Evict, &key, &value);
        }
    }

    fn notify(listener: &Option<Listener<K, V>>, reason: Event, key: &K, value: &V) {
        if let Some(listener) = listener {
            listener.on_leave(reason, key, value);
        }
    }
}

/// Clamp the hot capacity into `[1, capacity - 1]`, or to 1 if the capacity is 1.
fn clamp_hot(capacity: usize, hot: usize) -> usize {
    hot.clamp(1, capacity.saturating_sub(1).max(1))
}

/// Capacities and ring sizes of a [`ClockPro`] engine.
#[cfg(any(test, feature = "test_utils"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Total capacity.
    pub capacity: usize,
    /// Capacity of the hot ring.
    pub hot_capacity: usize,
    /// Capacity of the cold ring.
    pub cold_capacity: usize,
    /// Capacity of the non-resident ring.
    pub meta_capacity: usize,
    /// Count of hot records.
    pub hot: usize,
    /// Count of cold resident records.
    pub cold: usize,
    /// Count of non-resident records.
    pub meta: usize,
    /// Count of indexed keys.
    pub indexed: usize,
}

#[cfg(any(test, feature = "test_utils"))]
impl<K, V, S> ClockPro<K, V, S>
where
    K: Key,
    V: Value,
    S: BuildHasher,
{
    /// Capacities and ring sizes.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            capacity: self.capacity,
            hot_capacity: self.hot_capacity,
            cold_capacity: self.cold_capacity,
            meta_capacity: self.meta_capacity,
            hot: self.hot.len(),
            cold: self.cold.len(),
            meta: self.meta.len(),
            indexed: self.indexer.len(),
        }
    }

    /// State and flags of the record of the key, without accounting an access.
    pub fn probe<Q>(&self, key: &Q) -> Option<(State, Flags)>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        let hash = self.hash_builder.hash_one(key);
        let token = self.indexer.get(&self.slab, hash, key)?;
        let record = &self.slab[token];
        Some((record.state(), record.flags()))
    }

    /// Panics if any bookkeeping invariant is violated.
    pub fn check_invariants(&self) {
        assert!(
            self.len() <= self.capacity,
            "resident {} exceeds capacity {}",
            self.len(),
            self.capacity
        );
        assert_eq!(self.hot_capacity + self.cold_capacity, self.capacity);
        if self.capacity > 1 {
            assert!(
                (1..self.capacity).contains(&self.hot_capacity),
                "hot capacity {} out of [1, {})",
                self.hot_capacity,
                self.capacity
            );
        }
        assert_eq!(self.meta_capacity, self.capacity);
        assert!(self.meta.len() <= self.meta_capacity);

        assert_eq!(self.indexer.len(), self.hot.len() + self.cold.len() + self.meta.len());
        assert_eq!(self.slab.len(), self.indexer.len());

        for (ring, state) in [
            (&self.hot, State::Hot),
            (&self.cold, State::ColdResident),
            (&self.meta, State::ColdNonResident),
        ] {
            let mut count = 0;
            for token in ring.iter(&self.slab) {
                let record = &self.slab[token];
                assert_eq!(record.state(), state, "record {record:?} in {:?}", ring.id());
                assert_eq!(record.link().ring(), Some(ring.id()));
                assert_eq!(self.slab[record.link().next()].link().prev(), token);
                assert_eq!(
                    record.value().is_some(),
                    state != State::ColdNonResident,
                    "record {record:?} payload does not match its residency"
                );
                assert!(self.indexer.contains(&self.slab, token));
                count += 1;
            }
            assert_eq!(count, ring.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use parking_lot::Mutex;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    use super::*;

    type TestClockPro = ClockPro<u64, u64>;

    fn clock_pro(capacity: usize) -> TestClockPro {
        ClockPro::new(capacity, &ClockProConfig::default(), ahash::RandomState::default())
    }

    fn state(engine: &TestClockPro, key: u64) -> Option<State> {
        engine.probe(&key).map(|(state, _)| state)
    }

    fn keys(engine: &TestClockPro, ring: &Ring) -> Vec<u64> {
        ring.iter(&engine.slab).map(|t| *engine.slab[t].key()).collect_vec()
    }

    /// Non-resident keys, oldest first.
    fn meta_keys(engine: &TestClockPro) -> Vec<u64> {
        // The hand is at the newest entry, its successor is the oldest.
        let mut keys = keys(engine, &engine.meta);
        keys.rotate_left(1);
        keys
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(Event, u64, u64)>>,
    }

    impl EventListener for Recorder {
        type Key = u64;
        type Value = u64;

        fn on_leave(&self, reason: Event, key: &u64, value: &u64) {
            self.events.lock().push((reason, *key, *value));
        }
    }

    #[test]
    fn test_initial_split() {
        let cases = [(0, 1, 0), (1, 1, 0), (2, 1, 1), (3, 1, 2), (10, 5, 5), (101, 50, 51)];
        for (capacity, hot, cold) in cases {
            let s = clock_pro(capacity).snapshot();
            assert_eq!((s.hot_capacity, s.cold_capacity), (hot, cold), "capacity: {capacity}");
            assert_eq!(s.meta_capacity, s.capacity);
        }

        let config = ClockProConfig { hot_ratio: 1.0 };
        let s = TestClockPro::new(10, &config, Default::default()).snapshot();
        assert_eq!((s.hot_capacity, s.cold_capacity), (9, 1));

        let config = ClockProConfig { hot_ratio: 0.0 };
        let s = TestClockPro::new(10, &config, Default::default()).snapshot();
        assert_eq!((s.hot_capacity, s.cold_capacity), (1, 9));
    }

    #[test]
    #[should_panic(expected = "hot_ratio must be in 0.0..=1.0")]
    fn test_invalid_config() {
        let config = ClockProConfig { hot_ratio: 1.5 };
        let _ = TestClockPro::new(10, &config, Default::default());
    }

    #[test]
    fn test_new_record_is_cold_probe() {
        let mut engine = clock_pro(4);
        engine.insert(1, 1);
        assert_eq!(engine.probe(&1), Some((State::ColdResident, Flags::TEST)));
        engine.check_invariants();
    }

    #[test]
    fn test_promote_on_test_period_hit() {
        let mut engine = clock_pro(4);
        engine.insert(1, 10);
        engine.insert(2, 20);

        assert_eq!(engine.get(&1), Some(&10));
        assert_eq!(engine.probe(&1), Some((State::Hot, Flags::REFERENCED)));
        assert_eq!(state(&engine, 2), Some(State::ColdResident));
        assert_eq!(keys(&engine, &engine.hot), vec![1]);
        assert_eq!(keys(&engine, &engine.cold), vec![2]);

        // Hot hit only sets the reference flag.
        assert_eq!(engine.get(&1), Some(&10));
        assert_eq!(engine.snapshot().hot, 1);
        engine.check_invariants();
    }

    #[test]
    fn test_promotion_beyond_hot_capacity_shrinks_hot() {
        let mut engine = clock_pro(4);
        for i in 0..3 {
            engine.insert(i, i);
        }
        // hot capacity 2
        engine.get(&0);
        engine.get(&1);
        assert_eq!(engine.hot_capacity(), 2);
        engine.get(&2);
        assert_eq!(engine.snapshot().hot, 3);
        assert_eq!((engine.hot_capacity(), engine.cold_capacity()), (1, 3));

        // Floor at 1.
        engine.insert(3, 3);
        engine.get(&3);
        assert_eq!((engine.hot_capacity(), engine.cold_capacity()), (1, 3));
        engine.check_invariants();
    }

    #[test]
    fn test_cold_eviction_keeps_probe_as_ghost() {
        let mut engine = clock_pro(4);
        for i in 0..4 {
            engine.insert(i, i);
        }
        // cold: 0, 3, 2, 1
        assert_eq!(keys(&engine, &engine.cold), vec![0, 3, 2, 1]);

        engine.insert(4, 4);
        assert_eq!(engine.probe(&0), Some((State::ColdNonResident, Flags::TEST)));
        assert_eq!(keys(&engine, &engine.meta), vec![0]);
        assert_eq!(engine.len(), 4);
        assert_eq!(engine.snapshot().indexed, 5);
        engine.check_invariants();
    }

    #[test]
    fn test_ghost_hit_grows_hot_and_admits_on_insert() {
        let mut engine = clock_pro(4);
        for i in 0..5 {
            engine.insert(i, i);
        }
        assert_eq!(state(&engine, 0), Some(State::ColdNonResident));
        assert_eq!(engine.hot_capacity(), 2);

        // Miss, but the probe reveals an undersized hot capacity.
        assert_eq!(engine.get(&0), None);
        assert_eq!((engine.hot_capacity(), engine.cold_capacity()), (3, 1));
        assert_eq!(engine.probe(&0), Some((State::ColdNonResident, Flags::REFERENCED)));
        engine.check_invariants();

        // The flag is consumed, another lookup does not grow it again.
        assert_eq!(engine.get(&0), None);
        assert_eq!(engine.hot_capacity(), 3);

        // Reload after the miss: admitted as hot right away.
        engine.insert(0, 100);
        assert_eq!(engine.probe(&0), Some((State::Hot, Flags::REFERENCED)));
        assert_eq!(engine.get(&0), Some(&100));
        assert_eq!(engine.len(), 4);
        engine.check_invariants();
    }

    #[test]
    fn test_insert_on_ghost_grows_hot() {
        let mut engine = clock_pro(4);
        for i in 0..5 {
            engine.insert(i, i);
        }
        engine.insert(0, 100);
        assert_eq!(engine.hot_capacity(), 3);
        assert_eq!(state(&engine, 0), Some(State::Hot));
        assert_eq!(engine.get(&0), Some(&100));
        engine.check_invariants();
    }

    #[test]
    fn test_evict_cold_second_chance_promotes() {
        let mut engine = clock_pro(4);
        for i in 0..3 {
            engine.insert(i, i);
        }
        let tokens = engine.cold.iter(&engine.slab).collect_vec();
        for &token in &tokens {
            engine.slab[token].set_flags(Flags::REFERENCED, true);
        }

        // Every cold record is referenced: all of them move to hot and the sweep ends without a victim.
        assert_eq!(engine.evict_cold(), None);
        assert!(engine.cold.is_empty());
        assert_eq!(engine.snapshot().hot, 3);
        for i in 0..3 {
            assert_eq!(engine.probe(&i), Some((State::Hot, Flags::empty())));
        }
        engine.check_invariants();
    }

    #[test]
    fn test_evict_hot_second_chance_and_demote() {
        let mut engine = clock_pro(4);
        engine.insert(1, 1);
        engine.insert(2, 2);
        engine.get(&1);
        engine.get(&2);
        // hot: 1, 2, both referenced
        assert_eq!(keys(&engine, &engine.hot), vec![1, 2]);

        // First lap clears the flags, second lap demotes 1.
        assert_eq!(engine.evict_hot(), Some(Victim::Demoted));
        assert_eq!(engine.probe(&1), Some((State::ColdResident, Flags::TEST)));
        assert_eq!(engine.probe(&2), Some((State::Hot, Flags::empty())));
        assert_eq!((engine.hot_capacity(), engine.cold_capacity()), (3, 1));

        // The demoted probe is evicted to non-resident.
        assert_eq!(engine.evict_cold(), Some(Victim::Ghost));
        assert_eq!(state(&engine, 1), Some(State::ColdNonResident));
        engine.check_invariants();
    }

    #[test]
    fn test_evict_hot_removes_when_cold_full() {
        let mut engine = clock_pro(4);
        engine.insert(1, 1);
        engine.get(&1);
        engine.insert(2, 2);
        engine.insert(3, 3);
        // cold capacity 2 is full
        assert_eq!(engine.snapshot().cold, 2);

        assert_eq!(engine.evict_hot(), Some(Victim::Removed));
        assert_eq!(engine.probe(&1), None);
        assert_eq!(engine.snapshot().hot, 0);
        engine.check_invariants();
    }

    #[test]
    fn test_evict_empty_rings() {
        let mut engine = clock_pro(4);
        assert_eq!(engine.evict_cold(), None);
        assert_eq!(engine.evict_hot(), None);
        assert_eq!(engine.evict(), None);
    }

    #[test]
    fn test_cold_non_probe_removed() {
        let mut engine = clock_pro(4);
        engine.insert(1, 1);
        engine.get(&1);
        engine.insert(2, 2);
        // Demote 1 and drop its test flag by hand to get a resident cold record outside its test period.
        engine.evict_hot();
        engine.evict_hot();
        let token = engine.cold.iter(&engine.slab).find(|&t| *engine.slab[t].key() == 1).unwrap();
        engine.slab[token].set_flags(Flags::TEST, false);

        // Referenced cold record outside its test period stays cold.
        engine.get(&1);
        assert_eq!(engine.probe(&1), Some((State::ColdResident, Flags::REFERENCED)));
        engine.slab[token].set_flags(Flags::REFERENCED, false);

        while state(&engine, 1).is_some() {
            assert!(engine.evict_cold().is_some());
        }
        assert_eq!(engine.probe(&1), None);
        engine.check_invariants();
    }

    #[test]
    fn test_meta_trim_fifo() {
        let mut engine = clock_pro(2);
        // Every insertion of a new key evicts the oldest cold probe into non-resident.
        for i in 0..6 {
            engine.insert(i, i);
        }
        assert_eq!(meta_keys(&engine), vec![2, 3]);
        assert_eq!(engine.probe(&0), None);
        assert_eq!(engine.probe(&1), None);
        engine.check_invariants();
    }

    #[test]
    fn test_meta_trim_fifo_after_readmission() {
        let mut engine = clock_pro(3);
        for i in 0..6 {
            engine.insert(i, i);
        }
        assert_eq!(meta_keys(&engine), vec![0, 2, 3]);

        // Re-admit the newest non-resident key, the cold hand turns 4 into non-resident meanwhile.
        engine.insert(3, 100);
        assert_eq!(state(&engine, 3), Some(State::Hot));
        assert_eq!(meta_keys(&engine), vec![0, 2, 4]);

        engine.insert(10, 10);
        assert_eq!(meta_keys(&engine), vec![2, 4, 5]);
        assert_eq!(engine.probe(&0), None);

        engine.insert(11, 11);
        assert_eq!(meta_keys(&engine), vec![4, 5, 1]);
        assert_eq!(engine.probe(&2), None);
        engine.check_invariants();
    }

    #[test]
    fn test_capacity_one() {
        let mut engine = clock_pro(1);
        engine.insert(1, 1);
        engine.insert(2, 2);
        assert_eq!(engine.get(&1), None);
        assert_eq!(engine.get(&2), Some(&2));
        engine.check_invariants();

        engine.insert(3, 3);
        assert_eq!(engine.get(&3), Some(&3));
        assert_eq!(engine.len(), 1);
        engine.check_invariants();
    }

    #[test]
    fn test_resize() {
        let mut engine = clock_pro(2);
        engine.insert(1, 1);
        engine.insert(2, 2);
        engine.resize(5);
        assert_eq!(engine.snapshot().capacity, 5);
        assert_eq!((engine.hot_capacity(), engine.cold_capacity()), (2, 3));
        assert_eq!(engine.get(&1), Some(&1));
        assert_eq!(engine.get(&2), Some(&2));
        engine.check_invariants();

        for i in 3..8 {
            engine.insert(i, i);
        }
        engine.resize(2);
        assert!(engine.len() <= 2);
        assert_eq!((engine.hot_capacity(), engine.cold_capacity()), (1, 1));
        engine.check_invariants();

        engine.resize(0);
        assert_eq!(engine.snapshot().capacity, 1);
        assert!(engine.len() <= 1);
        engine.check_invariants();
    }

    #[test]
    fn test_update_config() {
        let mut engine = clock_pro(10);
        engine.update(10, Some(&ClockProConfig { hot_ratio: 0.8 })).unwrap();
        assert_eq!((engine.hot_capacity(), engine.cold_capacity()), (8, 2));

        let err = engine
            .update(20, Some(&ClockProConfig { hot_ratio: -0.1 }))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(engine.capacity(), 10);
        assert_eq!(engine.config().hot_ratio, 0.8);

        engine.update(20, None).unwrap();
        assert_eq!((engine.hot_capacity(), engine.cold_capacity()), (16, 4));
    }

    #[test]
    fn test_listener() {
        let recorder = Arc::new(Recorder::default());
        let mut engine = clock_pro(2).with_listener(recorder.clone());

        engine.insert(1, 10);
        engine.insert(1, 11);
        engine.insert(2, 20);
        engine.insert(3, 30);

        let events = recorder.events.lock().clone();
        assert_eq!(events, vec![(Event::Replace, 1, 10), (Event::Evict, 2, 20)]);
    }

    #[test]
    fn test_random_ops_keep_invariants() {
        let mut rng = SmallRng::seed_from_u64(114514);
        for capacity in [1, 2, 3, 8, 64] {
            let mut engine = clock_pro(capacity);
            for _ in 0..4000 {
                let key = rng.random_range(0..capacity as u64 * 4);
                match rng.random_range(0..100) {
                    0..45 => {
                        engine.get(&key);
                    }
                    45..98 => engine.insert(key, key),
                    _ => engine.resize(rng.random_range(0..capacity * 2)),
                }
                engine.check_invariants();
            }
        }
    }
}
