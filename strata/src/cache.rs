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

use std::{ops::Deref, sync::Arc};

use strata_common::{
    code::{DataType, ScoreMember},
    config::{sanitize_cache_num, CacheConfig, DEFAULT_CACHE_NUM},
    error::Result,
};
use strata_memory::{EngineBuilder, MemoryEngineBuilder};

use crate::{
    admin::CacheInfo,
    coordinator::Coordinator,
    loader::Loader,
    lock::RecordLockManager,
    range::score_members_consistent,
    store::Store,
};

/// Cache builder.
#[derive(Debug)]
pub struct CacheBuilder<B = MemoryEngineBuilder> {
    cache_num: usize,
    config: CacheConfig,
    locks: Option<Arc<RecordLockManager>>,
    engine_builder: B,
}

impl Default for CacheBuilder<MemoryEngineBuilder> {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBuilder<MemoryEngineBuilder> {
    /// Create a cache builder with in-memory shard engines.
    pub fn new() -> Self {
        Self {
            cache_num: DEFAULT_CACHE_NUM,
            config: CacheConfig::default(),
            locks: None,
            engine_builder: MemoryEngineBuilder,
        }
    }
}

impl<B> CacheBuilder<B>
where
    B: EngineBuilder,
{
    /// Set the count of shards. Counts outside `1..=48` fall back to the default.
    ///
    /// Default: `16`.
    pub fn with_shards(mut self, cache_num: usize) -> Self {
        self.cache_num = sanitize_cache_num(cache_num);
        self
    }

    /// Set the cache config.
    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Share the record locks of the backing store write path.
    ///
    /// Default: a private lock manager, which only serializes the load pipeline with itself.
    pub fn with_record_locks(mut self, locks: Arc<RecordLockManager>) -> Self {
        self.locks = Some(locks);
        self
    }

    /// Replace the shard engine.
    pub fn with_engine_builder<E>(self, engine_builder: E) -> CacheBuilder<E>
    where
        E: EngineBuilder,
    {
        CacheBuilder {
            cache_num: self.cache_num,
            config: self.config,
            locks: self.locks,
            engine_builder,
        }
    }

    /// Build the shard pool and start the load pipeline over `store`.
    pub fn build<S>(self, store: Arc<S>) -> Result<Cache<S, B>>
    where
        S: Store,
    {
        let coordinator = Arc::new(Coordinator::new(self.engine_builder));
        coordinator.init(self.cache_num, Some(&self.config))?;
        let locks = self.locks.unwrap_or_default();
        let loader = Loader::open(coordinator.clone(), store.clone(), locks.clone())?;
        Ok(Cache {
            coordinator,
            loader,
            store,
            locks,
        })
    }
}

/// Sharded side cache in front of a backing store.
///
/// Dereferences to the [`Coordinator`] for every cache operation. Misses can be handed to the load pipeline with
/// [`Cache::push_key_to_async_load_queue`].
pub struct Cache<S, B = MemoryEngineBuilder>
where
    S: Store,
    B: EngineBuilder,
{
    coordinator: Arc<Coordinator<B>>,
    loader: Loader,
    store: Arc<S>,
    locks: Arc<RecordLockManager>,
}

impl<S, B> std::fmt::Debug for Cache<S, B>
where
    S: Store,
    B: EngineBuilder,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("coordinator", &self.coordinator)
            .field("loader", &self.loader)
            .finish()
    }
}

impl<S, B> Deref for Cache<S, B>
where
    S: Store,
    B: EngineBuilder,
{
    type Target = Coordinator<B>;

    fn deref(&self) -> &Self::Target {
        &self.coordinator
    }
}

impl<S, B> Cache<S, B>
where
    S: Store,
    B: EngineBuilder,
{
    /// The coordinator shared with the load pipeline.
    pub fn coordinator(&self) -> &Arc<Coordinator<B>> {
        &self.coordinator
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The record locks held by the load pipeline.
    pub fn record_locks(&self) -> &Arc<RecordLockManager> {
        &self.locks
    }

    /// Queue a key for a background fill. `tag` is one of `k`, `h`, `l`, `s` or `z`.
    ///
    /// Returns false if the key is already queued or the queue is full.
    pub fn push_key_to_async_load_queue(&self, tag: char, key: &[u8]) -> Result<bool> {
        let data_type = DataType::try_from(tag)?;
        Ok(self.loader.push(data_type, key))
    }

    /// Snapshot of the pool and the load pipeline.
    pub fn info(&self) -> CacheInfo {
        CacheInfo {
            async_load_keys_num: self.loader.loaded(),
            waiting_load_keys_num: self.loader.waiting(),
            ..self.coordinator.info()
        }
    }

    /// Rank range of a sorted set, served from the cached window when it covers the range.
    ///
    /// Returns `NotFound` when the caller has to read the backing store. A cached window that is shorter than both
    /// the window size and the backing set is stale, it is dropped and queued for reload.
    pub fn zrange(&self, key: &[u8], start: i64, stop: i64) -> Result<Vec<ScoreMember>> {
        let db_len = self.store.zcard(key)?;
        self.coordinator
            .zrange_windowed(key, start, stop, db_len)
            .inspect_err(|e| self.on_window_miss(e, key, db_len))
    }

    /// Reverse rank range of a sorted set, served from the cached window when it covers the range.
    pub fn zrevrange(&self, key: &[u8], start: i64, stop: i64) -> Result<Vec<ScoreMember>> {
        let db_len = self.store.zcard(key)?;
        self.coordinator
            .zrevrange_windowed(key, start, stop, db_len)
            .inspect_err(|e| self.on_window_miss(e, key, db_len))
    }

    /// Score range of a sorted set, served from the cached window when it covers the bounds.
    pub fn zrangebyscore(&self, key: &[u8], min: &[u8], max: &[u8]) -> Result<Vec<ScoreMember>> {
        let db_len = self.store.zcard(key)?;
        self.coordinator
            .zrangebyscore_windowed(key, min, max, db_len)
            .inspect_err(|e| self.on_window_miss(e, key, db_len))
    }

    /// Reverse score range of a sorted set, served from the cached window when it covers the bounds.
    pub fn zrevrangebyscore(&self, key: &[u8], min: &[u8], max: &[u8]) -> Result<Vec<ScoreMember>> {
        let db_len = self.store.zcard(key)?;
        self.coordinator
            .zrevrangebyscore_windowed(key, min, max, db_len)
            .inspect_err(|e| self.on_window_miss(e, key, db_len))
    }

    /// Compare the cached window of a sorted set with the backing store under the record lock of the key.
    ///
    /// A window that differs is dropped and queued for reload, and false is returned. A key that is not cached
    /// always matches.
    pub fn verify_zset_window(&self, key: &[u8]) -> Result<bool> {
        let _guard = self.locks.lock(key);
        let cached = match self.coordinator.zrange(key, 0, -1) {
            Ok(cached) => cached,
            Err(e) if e.is_not_found() => return Ok(true),
            Err(e) => return Err(e),
        };
        let (start, stop) = self.coordinator.config().zset_window();
        let db = match self.store.zrange_with_ttl(key, start, stop) {
            Ok((db, _)) => db,
            Err(e) if e.is_not_found() => vec![],
            Err(e) => return Err(e),
        };
        if score_members_consistent(&cached, &db) {
            return Ok(true);
        }
        self.drop_window(key);
        self.loader.push(DataType::ZSet, key);
        Ok(false)
    }

    fn on_window_miss(&self, e: &strata_common::error::Error, key: &[u8], db_len: u64) {
        if !e.is_not_found() {
            return;
        }
        let items = self.coordinator.config().zset_cache_items_per_key as u64;
        let cache_len = match self.coordinator.cache_zcard(key) {
            Ok(len) => len,
            Err(e) => {
                tracing::warn!("[cache]: check sorted set window failed: {e}");
                return;
            }
        };
        if cache_len < items && cache_len < db_len {
            self.drop_window(key);
            self.loader.push(DataType::ZSet, key);
        }
    }

    fn drop_window(&self, key: &[u8]) {
        if let Err(e) = self.coordinator.del(key) {
            if !e.is_not_found() {
                tracing::warn!("[cache]: drop sorted set window failed: {e}");
            }
        }
    }
}

impl<S, B> Drop for Cache<S, B>
where
    S: Store,
    B: EngineBuilder,
{
    fn drop(&mut self) {
        self.loader.shutdown();
    }
}
