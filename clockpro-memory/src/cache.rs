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

use std::{
    fmt::Debug,
    hash::{BuildHasher, Hash},
    sync::Arc,
};

use ahash::RandomState;
use clockpro_common::{
    code::{Key, Value},
    error::Result,
    event::EventListener,
};
use equivalent::Equivalent;
use parking_lot::Mutex;

use crate::clock_pro::{ClockPro, ClockProConfig, Listener};

/// In-memory cache builder.
pub struct CacheBuilder<K, V, S = RandomState>
where
    K: Key,
    V: Value,
    S: BuildHasher + Send + Sync + 'static,
{
    capacity: usize,
    config: ClockProConfig,
    listener: Option<Listener<K, V>>,
    hash_builder: S,
}

impl<K, V> CacheBuilder<K, V, RandomState>
where
    K: Key,
    V: Value,
{
    /// Create a cache builder with the capacity of resident entries. A zero capacity is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            config: ClockProConfig::default(),
            listener: None,
            hash_builder: RandomState::default(),
        }
    }
}

impl<K, V, S> CacheBuilder<K, V, S>
where
    K: Key,
    V: Value,
    S: BuildHasher + Send + Sync + 'static,
{
    /// Set the CLOCK-Pro config.
    pub fn with_config(mut self, config: ClockProConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the initial ratio of the capacity reserved for hot entries.
    ///
    /// The default value is 0.5.
    pub fn with_hot_ratio(mut self, hot_ratio: f64) -> Self {
        self.config.hot_ratio = hot_ratio;
        self
    }

    /// Set the event listener, notified whenever a payload leaves the cache.
    pub fn with_event_listener(mut self, listener: Arc<dyn EventListener<Key = K, Value = V>>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Set the hash builder of the lookup table.
    pub fn with_hash_builder<OS>(self, hash_builder: OS) -> CacheBuilder<K, V, OS>
    where
        OS: BuildHasher + Send + Sync + 'static,
    {
        CacheBuilder {
            capacity: self.capacity,
            config: self.config,
            listener: self.listener,
            hash_builder,
        }
    }

    /// Build the cache.
    ///
    /// # Panics
    ///
    /// Panics if the config is invalid.
    pub fn build(self) -> Cache<K, V, S> {
        let mut engine = ClockPro::new(self.capacity, &self.config, self.hash_builder);
        if let Some(listener) = self.listener {
            engine = engine.with_listener(listener);
        }
        tracing::debug!(
            "[clockpro]: build cache, capacity: {}, config: {:?}",
            engine.capacity(),
            self.config
        );
        Cache {
            inner: Arc::new(Mutex::new(engine)),
        }
    }
}

/// Thread-safe CLOCK-Pro cache.
///
/// Every operation, lookups included, mutates the replacement state, so all of them are serialized by a single
/// exclusive lock held for the whole call. Clones share the same cache.
pub struct Cache<K, V, S = RandomState>
where
    K: Key,
    V: Value,
    S: BuildHasher + Send + Sync + 'static,
{
    inner: Arc<Mutex<ClockPro<K, V, S>>>,
}

impl<K, V, S> Clone for Cache<K, V, S>
where
    K: Key,
    V: Value,
    S: BuildHasher + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V, S> Debug for Cache<K, V, S>
where
    K: Key,
    V: Value,
    S: BuildHasher + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let engine = self.inner.lock();
        f.debug_struct("Cache")
            .field("capacity", &engine.capacity())
            .field("len", &engine.len())
            .field("hot_capacity", &engine.hot_capacity())
            .field("cold_capacity", &engine.cold_capacity())
            .finish()
    }
}

impl<K, V> Cache<K, V, RandomState>
where
    K: Key,
    V: Value,
{
    /// Create a cache with the default config. A zero capacity is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        CacheBuilder::new(capacity).build()
    }
}

impl<K, V, S> Cache<K, V, S>
where
    K: Key,
    V: Value,
    S: BuildHasher + Send + Sync + 'static,
{
    /// Get the cached value of the key.
    ///
    /// Returns `None` on a miss, including an access to a key whose payload has been evicted but is still tracked.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
        V: Clone,
    {
        self.inner.lock().get(key).cloned()
    }

    /// Insert or update a cache entry.
    pub fn insert(&self, key: K, value: V) {
        self.inner.lock().insert(key, value)
    }

    /// Change the capacity of resident entries. A zero capacity is clamped to 1.
    ///
    /// Entries evicted by a shrink are gone for good, a later growth does not bring them back.
    pub fn resize(&self, capacity: usize) {
        self.inner.lock().resize(capacity)
    }

    /// Apply a new CLOCK-Pro config. The hot/cold split restarts from the new ratio.
    pub fn update_config(&self, config: ClockProConfig) -> Result<()> {
        let mut engine = self.inner.lock();
        let capacity = engine.capacity();
        engine.update(capacity, Some(&config))
    }

    /// Count of resident entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if there is no resident entry.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Capacity of resident entries.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }
}

#[cfg(any(test, feature = "test_utils"))]
impl<K, V, S> Cache<K, V, S>
where
    K: Key,
    V: Value,
    S: BuildHasher + Send + Sync + 'static,
{
    /// Capacities and ring sizes of the engine.
    pub fn snapshot(&self) -> crate::clock_pro::Snapshot {
        self.inner.lock().snapshot()
    }

    /// State and flags of the entry of the key, without accounting an access.
    pub fn probe<Q>(&self, key: &Q) -> Option<(crate::record::State, crate::record::Flags)>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.inner.lock().probe(key)
    }

    /// Panics if any bookkeeping invariant is violated.
    pub fn check_invariants(&self) {
        self.inner.lock().check_invariants()
    }
}

#[cfg(test)]
mod tests {
    use clockpro_common::{error::Error, event::Event};

    use super::*;
    use crate::record::State;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(Event, String, u64)>>,
    }

    impl EventListener for Recorder {
        type Key = String;
        type Value = u64;

        fn on_leave(&self, reason: Event, key: &String, value: &u64) {
            self.events.lock().push((reason, key.clone(), *value));
        }
    }

    #[test_log::test]
    fn test_cache_basic() {
        let cache: Cache<String, String> = Cache::new(3);
        assert!(cache.is_empty());
        assert_eq!(cache.get("key1"), None);

        cache.insert("key1".to_string(), "value1".to_string());
        assert_eq!(cache.get("key1"), Some("value1".to_string()));

        cache.insert("key1".to_string(), "value2".to_string());
        assert_eq!(cache.get("key1"), Some("value2".to_string()));
        assert_eq!(cache.len(), 1);
        cache.check_invariants();
    }

    #[test_log::test]
    fn test_cache_clamp_zero_capacity() {
        let cache: Cache<u64, u64> = Cache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.resize(0);
        assert_eq!(cache.capacity(), 1);
    }

    #[test_log::test]
    fn test_cache_builder() {
        let recorder = Arc::new(Recorder::default());
        let cache = CacheBuilder::<String, u64>::new(2)
            .with_hot_ratio(0.5)
            .with_event_listener(recorder.clone())
            .with_hash_builder(std::hash::RandomState::new())
            .build();

        cache.insert("a".to_string(), 1);
        cache.insert("a".to_string(), 2);
        cache.insert("b".to_string(), 3);
        cache.insert("c".to_string(), 4);

        assert_eq!(cache.get("a"), Some(2));
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.probe("b").map(|(state, _)| state), Some(State::ColdNonResident));
        assert_eq!(
            recorder.events.lock().clone(),
            vec![(Event::Replace, "a".to_string(), 1), (Event::Evict, "b".to_string(), 3)]
        );
        cache.check_invariants();
    }

    #[test_log::test]
    #[should_panic(expected = "hot_ratio must be in 0.0..=1.0")]
    fn test_cache_builder_invalid_ratio() {
        let _: Cache<u64, u64> = CacheBuilder::new(8).with_hot_ratio(2.0).build();
    }

    #[test_log::test]
    fn test_cache_update_config() {
        let cache: Cache<u64, u64> = Cache::new(10);
        cache.update_config(ClockProConfig { hot_ratio: 0.2 }).unwrap();
        let snapshot = cache.snapshot();
        assert_eq!((snapshot.hot_capacity, snapshot.cold_capacity), (2, 8));

        let err = cache.update_config(ClockProConfig { hot_ratio: f64::NAN }).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(cache.snapshot(), snapshot);
    }

    #[test_log::test]
    fn test_cache_clone_shares_state() {
        let cache: Cache<u64, u64> = Cache::new(4);
        let other = cache.clone();
        cache.insert(1, 1);
        assert_eq!(other.get(&1), Some(1));
        assert!(format!("{other:?}").contains("len: 1"));
    }
}
