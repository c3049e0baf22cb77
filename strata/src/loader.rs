// Copyright 2025 strata Project Authors
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

//! Asynchronous cache fill on misses.
//!
//! Foreground readers that miss the cache push the key here and serve the read from the backing store. A single
//! worker thread drains the queue in batches, reading each key from the backing store under its record lock and
//! filling the cache. Pushes never block: a full queue drops the key.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::JoinHandle,
    time::Duration,
};

use ordered_hash_map::OrderedHashMap;
use parking_lot::{Condvar, Mutex};
use strata_common::{
    code::DataType,
    error::{Error, ErrorKind, Result},
    rate::Throttle,
};
use strata_memory::EngineBuilder;

use crate::{coordinator::Coordinator, lock::RecordLockManager, store::Store};

/// Max count of queued and in-flight keys.
pub const LOAD_QUEUE_MAX_SIZE: usize = 2048;
/// Collections larger than this are not cached.
pub const LOAD_VALUE_ITEM_MAX_SIZE: u64 = 2048;
/// Max count of keys taken by the worker at once.
pub const LOAD_BATCH_SIZE: usize = 256;

const DROP_WARN_INTERVAL: Duration = Duration::from_secs(5);

/// Insertion-ordered load queue with O(1) membership test.
///
/// The first `inflight` entries are being loaded by the worker. They stay in the map until finished so that pushes
/// of in-flight keys are deduplicated too.
#[derive(Debug)]
pub struct LoadQueue {
    entries: OrderedHashMap<Vec<u8>, DataType>,
    inflight: usize,
}

impl Default for LoadQueue {
    fn default() -> Self {
        Self {
            entries: OrderedHashMap::with_capacity(LOAD_QUEUE_MAX_SIZE),
            inflight: 0,
        }
    }
}

impl LoadQueue {
    /// Enqueue a key. Returns false if the key is queued or in flight, or the queue is full.
    pub fn push(&mut self, data_type: DataType, key: &[u8]) -> bool {
        if self.entries.len() >= LOAD_QUEUE_MAX_SIZE || self.entries.contains_key(key) {
            return false;
        }
        self.entries.insert(key.to_vec(), data_type);
        true
    }

    /// Returns true if the key is queued or in flight.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// Mark up to `max` of the oldest queued entries as in flight and return them.
    pub fn take_batch(&mut self, max: usize) -> Vec<(Vec<u8>, DataType)> {
        strata_common::strict_assert_eq!(self.inflight, 0);
        let batch: Vec<_> = self
            .entries
            .iter()
            .take(max)
            .map(|(key, data_type)| (key.clone(), *data_type))
            .collect();
        self.inflight = batch.len();
        batch
    }

    /// Remove an in-flight entry.
    pub fn finish(&mut self, key: &[u8]) {
        if self.entries.remove(key).is_some() {
            self.inflight = self.inflight.saturating_sub(1);
        }
    }

    /// Count of queued and in-flight entries.
    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    /// Count of entries not taken by the worker yet.
    pub fn waiting(&self) -> usize {
        self.entries.len() - self.inflight
    }
}

#[derive(Debug)]
struct Shared {
    queue: Mutex<LoadQueue>,
    cond: Condvar,
    shutdown: AtomicBool,
    loaded: AtomicU64,
    dropped: Throttle,
}

/// The load pipeline: a bounded deduplicating queue and its worker thread.
#[derive(Debug)]
pub struct Loader {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Loader {
    /// Start the worker thread.
    pub fn open<S, B>(coordinator: Arc<Coordinator<B>>, store: Arc<S>, locks: Arc<RecordLockManager>) -> Result<Self>
    where
        S: Store,
        B: EngineBuilder,
    {
        let shared = Arc::new(Shared {
            queue: Mutex::new(LoadQueue::default()),
            cond: Condvar::new(),
            shutdown: AtomicBool::new(false),
            loaded: AtomicU64::new(0),
            dropped: Throttle::new(DROP_WARN_INTERVAL),
        });
        let worker = Worker {
            shared: shared.clone(),
            coordinator,
            store,
            locks,
        };
        let handle = std::thread::Builder::new()
            .name("strata-cache-loader".to_string())
            .spawn(move || worker.run())
            .map_err(|e| Error::new(ErrorKind::External, "spawn cache loader failed").with_source(e))?;
        tracing::info!("[cache loader]: started");
        Ok(Self {
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Queue a key for loading. Returns false if the key is dropped.
    ///
    /// Keys are always dropped once the loader is shut down.
    pub fn push(&self, data_type: DataType, key: &[u8]) -> bool {
        let mut queue = self.shared.queue.lock();
        if self.shared.shutdown.load(Ordering::Acquire) {
            return false;
        }
        if queue.pending() >= LOAD_QUEUE_MAX_SIZE {
            drop(queue);
            if self.shared.dropped.check() {
                tracing::warn!(
                    "[cache loader]: load queue is full, dropping keys, max size: {LOAD_QUEUE_MAX_SIZE}"
                );
            }
            return false;
        }
        if !queue.push(data_type, key) {
            return false;
        }
        drop(queue);
        self.shared.cond.notify_one();
        true
    }

    /// Count of keys loaded so far.
    pub fn loaded(&self) -> u64 {
        self.shared.loaded.load(Ordering::Relaxed)
    }

    /// Count of keys waiting to be taken by the worker.
    pub fn waiting(&self) -> u64 {
        self.shared.queue.lock().waiting() as u64
    }

    /// Count of queued and in-flight keys.
    pub fn pending(&self) -> u64 {
        self.shared.queue.lock().pending() as u64
    }

    /// Stop the worker. It finishes its current batch, remaining keys are abandoned.
    pub fn shutdown(&self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        {
            let _queue = self.shared.queue.lock();
            self.shared.shutdown.store(true, Ordering::Release);
        }
        self.shared.cond.notify_all();
        if handle.join().is_err() {
            tracing::error!("[cache loader]: worker panicked");
        }
        tracing::info!("[cache loader]: stopped, abandoned keys: {}", self.pending());
    }
}

impl Drop for Loader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker<S, B>
where
    S: Store,
    B: EngineBuilder,
{
    shared: Arc<Shared>,
    coordinator: Arc<Coordinator<B>>,
    store: Arc<S>,
    locks: Arc<RecordLockManager>,
}

impl<S, B> Worker<S, B>
where
    S: Store,
    B: EngineBuilder,
{
    fn run(self) {
        loop {
            let batch = {
                let mut queue = self.shared.queue.lock();
                while queue.waiting() == 0 && !self.shared.shutdown.load(Ordering::Acquire) {
                    self.shared.cond.wait(&mut queue);
                }
                if self.shared.shutdown.load(Ordering::Acquire) {
                    return;
                }
                queue.take_batch(LOAD_BATCH_SIZE)
            };

            for (key, data_type) in batch {
                let res = {
                    let _guard = self.locks.lock(&key);
                    self.load(data_type, &key)
                };
                match res {
                    Ok(true) => {
                        self.shared.loaded.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(false) => {}
                    Err(e) if e.is_not_found() || e.is_already_exists() => {
                        tracing::debug!("[cache loader]: skip {data_type} key {:?}: {e}", String::from_utf8_lossy(&key));
                    }
                    Err(e) => {
                        tracing::warn!(
                            "[cache loader]: load {data_type} key {:?} failed: {e}",
                            String::from_utf8_lossy(&key)
                        );
                    }
                }
                self.shared.queue.lock().finish(&key);
            }
        }
    }

    /// Load one key. Returns false if the key is skipped.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "strata::loader::load"))]
    fn load(&self, data_type: DataType, key: &[u8]) -> Result<bool> {
        let (store, coordinator) = (&self.store, &self.coordinator);
        match data_type {
            DataType::String => {
                let (value, ttl) = store.get_with_ttl(key)?;
                coordinator.write_kv_to_cache(key, &value, ttl)?;
            }
            DataType::Hash => {
                if !self.fits(data_type, key, store.hlen(key)?) {
                    return Ok(false);
                }
                let (fvs, ttl) = store.hgetall_with_ttl(key)?;
                coordinator.write_hash_to_cache(key, &fvs, ttl)?;
            }
            DataType::List => {
                if !self.fits(data_type, key, store.llen(key)?) {
                    return Ok(false);
                }
                let (values, ttl) = store.lrange_with_ttl(key, 0, -1)?;
                coordinator.write_list_to_cache(key, &values, ttl)?;
            }
            DataType::Set => {
                if !self.fits(data_type, key, store.scard(key)?) {
                    return Ok(false);
                }
                let (members, ttl) = store.smembers_with_ttl(key)?;
                coordinator.write_set_to_cache(key, &members, ttl)?;
            }
            DataType::ZSet => {
                if !self.fits(data_type, key, store.zcard(key)?) {
                    return Ok(false);
                }
                let config = coordinator.config();
                let (start, stop) = config.zset_window();
                let (score_members, ttl) = store.zrange_with_ttl(key, start, stop)?;
                coordinator.write_zset_to_cache(key, &score_members, ttl)?;
            }
        }
        Ok(true)
    }

    fn fits(&self, data_type: DataType, key: &[u8], len: u64) -> bool {
        if len == 0 || len > LOAD_VALUE_ITEM_MAX_SIZE {
            tracing::debug!(
                "[cache loader]: skip {data_type} key {:?} with {len} items",
                String::from_utf8_lossy(key)
            );
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use strata_common::{
        code::{FieldValue, ScoreMember},
        config::{CacheConfig, StartPos},
        ttl::TTL_NONE,
    };

    use super::*;
    use crate::test_utils::MockStore;

    fn wait_until(mut f: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !f() {
            assert!(Instant::now() < deadline, "timed out");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn setup(config: CacheConfig) -> (Arc<Coordinator>, Arc<MockStore>, Loader) {
        let coordinator = Arc::new(Coordinator::default());
        coordinator.init(4, Some(&config)).unwrap();
        let store = Arc::new(MockStore::default());
        let loader = Loader::open(coordinator.clone(), store.clone(), Arc::default()).unwrap();
        (coordinator, store, loader)
    }

    #[test]
    fn test_queue_dedup() {
        let mut queue = LoadQueue::default();
        assert!(queue.push(DataType::String, b"a"));
        assert!(!queue.push(DataType::Hash, b"a"));
        assert!(queue.push(DataType::Set, b"b"));

        let batch = queue.take_batch(1);
        assert_eq!(batch, vec![(b"a".to_vec(), DataType::String)]);
        assert_eq!(queue.waiting(), 1);
        // In flight keys are still deduplicated.
        assert!(!queue.push(DataType::String, b"a"));
        queue.finish(b"a");
        assert!(!queue.contains(b"a"));
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.take_batch(LOAD_BATCH_SIZE).len(), 1);
        queue.finish(b"b");
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_queue_capacity() {
        let mut queue = LoadQueue::default();
        for i in 0..LOAD_QUEUE_MAX_SIZE {
            assert!(queue.push(DataType::String, format!("k{i}").as_bytes()));
        }
        assert!(!queue.push(DataType::String, b"overflow"));
        assert_eq!(queue.pending(), LOAD_QUEUE_MAX_SIZE);
    }

    #[test_log::test]
    fn test_load_every_type() {
        let (coordinator, store, loader) = setup(CacheConfig::default());
        store.insert_string(b"k", b"v", TTL_NONE);
        store.insert_hash(b"h", vec![FieldValue::new("f", "v")], 100);
        store.insert_list(b"l", vec![b"a".to_vec(), b"b".to_vec()], TTL_NONE);
        store.insert_set(b"s", vec![b"a".to_vec()], TTL_NONE);
        store.insert_zset(b"z", vec![ScoreMember::new(1.0, "a")], TTL_NONE);

        for (data_type, key) in [
            (DataType::String, &b"k"[..]),
            (DataType::Hash, b"h"),
            (DataType::List, b"l"),
            (DataType::Set, b"s"),
            (DataType::ZSet, b"z"),
        ] {
            assert!(loader.push(data_type, key));
        }
        wait_until(|| loader.loaded() == 5);
        assert_eq!(loader.pending(), 0);

        assert_eq!(coordinator.get(b"k").unwrap(), b"v");
        assert!(coordinator.ttl(b"h").unwrap() > 0);
        assert_eq!(coordinator.llen(b"l").unwrap(), 2);
        assert!(coordinator.sismember(b"s", b"a").unwrap());
        assert_eq!(coordinator.zscore(b"z", b"a").unwrap(), 1.0);
    }

    #[test_log::test]
    fn test_skip_failed_loads() {
        let (coordinator, store, loader) = setup(CacheConfig::default());
        let big = (0..LOAD_VALUE_ITEM_MAX_SIZE + 1).map(|i| i.to_string().into_bytes()).collect();
        store.insert_set(b"big", big, TTL_NONE);
        store.insert_string(b"expired", b"v", 0);
        store.insert_string(b"wrong", b"v", TTL_NONE);
        coordinator.set(b"expired", b"stale", 0).unwrap();

        assert!(loader.push(DataType::Set, b"big"));
        assert!(loader.push(DataType::String, b"absent"));
        assert!(loader.push(DataType::Hash, b"wrong"));
        assert!(loader.push(DataType::String, b"expired"));
        wait_until(|| loader.pending() == 0);

        // Only the removal of the stale entry counts.
        assert_eq!(loader.loaded(), 1);
        for key in [&b"big"[..], b"absent", b"wrong", b"expired"] {
            assert!(!coordinator.exists(key));
        }
    }

    #[test]
    fn test_zset_window_load() {
        let config = CacheConfig {
            zset_cache_items_per_key: 3,
            zset_cache_start_pos: StartPos::FromEnd,
            ..Default::default()
        };
        let (coordinator, store, loader) = setup(config);
        store.insert_zset(
            b"z",
            (0..10).map(|i| ScoreMember::new(i as f64, format!("m{i}"))).collect(),
            TTL_NONE,
        );
        assert!(loader.push(DataType::ZSet, b"z"));
        wait_until(|| loader.loaded() == 1);
        assert_eq!(coordinator.zcard(b"z").unwrap(), 3);
        assert_eq!(coordinator.zrange(b"z", 0, 0).unwrap()[0].member, b"m7");
    }

    #[test]
    fn test_shutdown() {
        let (_coordinator, _store, loader) = setup(CacheConfig::default());
        assert!(loader.push(DataType::String, b"queued"));
        loader.shutdown();
        loader.shutdown();
        assert!(!loader.push(DataType::String, b"k"));
        assert!(!loader.push(DataType::Hash, b"h"));
        assert!(loader.pending() <= 1);
    }
}
