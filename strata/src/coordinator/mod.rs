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

//! The cache coordinator: shard routing, locking discipline and lifecycle of the shard pool.

mod fill;
mod hashes;
mod lists;
mod sets;
mod strings;
mod zsets;

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use rand::Rng as _;
use strata_common::{
    code::DataType,
    config::CacheConfig,
    error::{Error, Result},
    hasher::shard_index,
    stats::Stats,
};
use strata_memory::{Engine, EngineBuilder, EngineContext, KeyOps, MemoryEngineBuilder};

use crate::{
    admin::CacheInfo,
    status::{AtomicCacheStatus, CacheStatus},
};

/// Expiration to apply for a raw TTL given to a plain or conditional write.
///
/// Only a positive TTL sets an expiration.
fn expire_secs(ttl: i64) -> Option<u64> {
    (ttl > 0).then_some(ttl as u64)
}

/// Single point of entry for every cache operation.
///
/// Keys are routed to one of the shards of the pool by the CRC-32 of their bytes. Key operations take the read side
/// of the pool lock and the mutex of the selected shard, so operations on different shards run in parallel.
/// Lifecycle operations take the write side of the pool lock and block every key operation until they complete.
///
/// Key operations on an uninitialized pool return [`ErrorKind::NotReady`].
///
/// [`ErrorKind::NotReady`]: strata_common::error::ErrorKind::NotReady
pub struct Coordinator<B = MemoryEngineBuilder>
where
    B: EngineBuilder,
{
    builder: B,
    shards: RwLock<Vec<Mutex<B::Engine>>>,
    config: Arc<ArcSwap<CacheConfig>>,
    stats: Arc<Stats>,
    status: AtomicCacheStatus,
}

impl<B> std::fmt::Debug for Coordinator<B>
where
    B: EngineBuilder,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("status", &self.status.load())
            .field("config", &self.config.load_full())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Default for Coordinator<MemoryEngineBuilder> {
    fn default() -> Self {
        Self::new(MemoryEngineBuilder)
    }
}

impl<B> Coordinator<B>
where
    B: EngineBuilder,
{
    /// Create a coordinator without shards. Call [`Coordinator::init`] before use.
    pub fn new(builder: B) -> Self {
        Self {
            builder,
            shards: RwLock::new(vec![]),
            config: Arc::new(ArcSwap::from_pointee(CacheConfig::default())),
            stats: Arc::new(Stats::default()),
            status: AtomicCacheStatus::default(),
        }
    }

    /// Lifecycle status of the shard pool.
    pub fn status(&self) -> CacheStatus {
        self.status.load()
    }

    /// The current config.
    pub fn config(&self) -> Arc<CacheConfig> {
        self.config.load_full()
    }

    /// Pool-wide statistics.
    pub fn stats(&self) -> &Arc<Stats> {
        &self.stats
    }

    /// Count of shards.
    pub fn cache_num(&self) -> usize {
        self.shards.read().len()
    }

    /// Index of the shard serving `key`.
    pub fn shard_index(&self, key: &[u8]) -> Result<usize> {
        let shards = self.shards.read();
        if shards.is_empty() {
            return Err(Error::not_ready());
        }
        Ok(shard_index(key, shards.len()))
    }

    /// Run `f` against the shard serving `key`, holding the pool read lock and the shard mutex.
    fn with_shard<T>(&self, key: &[u8], f: impl FnOnce(&mut B::Engine) -> Result<T>) -> Result<T> {
        let shards = self.shards.read();
        if shards.is_empty() {
            return Err(Error::not_ready());
        }
        let mut shard = shards[shard_index(key, shards.len())].lock();
        f(&mut shard)
    }

    /// Run `f` only if the shard already caches `key`. Otherwise returns `NotFound`.
    fn if_key_exist<T>(&self, key: &[u8], f: impl FnOnce(&mut B::Engine) -> Result<T>) -> Result<T> {
        self.with_shard(key, |engine| {
            if !engine.exists(key) {
                return Err(Error::not_found("key not exist"));
            }
            f(engine)
        })
    }

    /// Run `f` only if the shard does not cache `key` yet, then apply the expiration. Otherwise returns
    /// `AlreadyExists`.
    fn if_key_absent(
        &self,
        key: &[u8],
        ttl: Option<u64>,
        f: impl FnOnce(&mut B::Engine) -> Result<()>,
    ) -> Result<()> {
        self.with_shard(key, |engine| {
            if engine.exists(key) {
                return Err(Error::already_exists("key exist"));
            }
            f(engine)?;
            if let Some(ttl) = ttl {
                engine.expire(key, ttl as i64)?;
            }
            Ok(())
        })
    }

    /// Build `cache_num` shards with `config`.
    ///
    /// A missing config or a shard that fails to open tears the whole pool down, leaves the status at
    /// [`CacheStatus::None`] and returns a `Corruption` error.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "strata::coordinator::init"))]
    pub fn init(&self, cache_num: usize, config: Option<&CacheConfig>) -> Result<()> {
        let mut shards = self.shards.write();
        self.init_locked(&mut shards, cache_num, config)
    }

    fn init_locked(
        &self,
        shards: &mut Vec<Mutex<B::Engine>>,
        cache_num: usize,
        config: Option<&CacheConfig>,
    ) -> Result<()> {
        let config = match config {
            Some(config) if cache_num > 0 => config,
            _ => {
                self.status.store(CacheStatus::None);
                return Err(Error::corruption("invalid arguments").with_context("cache_num", cache_num));
            }
        };

        self.status.store(CacheStatus::Init);
        self.config.store(Arc::new(config.clone().sanitized()));
        self.stats.clear();

        for shard in 0..cache_num {
            let ctx = EngineContext {
                shard,
                config: self.config.clone(),
                stats: self.stats.clone(),
            };
            match self.builder.open(ctx) {
                Ok(engine) => shards.push(Mutex::new(engine)),
                Err(e) => {
                    tracing::error!("[cache]: open shard {shard} failed: {e}");
                    self.destroy_locked(shards);
                    return Err(Error::corruption("open cache failed")
                        .with_context("shard", shard)
                        .with_source(e));
                }
            }
        }

        strata_common::strict_assert_eq!(shards.len(), cache_num);
        self.status.store(CacheStatus::Ok);
        tracing::info!("[cache]: initialized {cache_num} shards, config: {:?}", self.config.load_full());
        Ok(())
    }

    /// Rebuild the pool under a single write lock acquisition.
    ///
    /// Readers observe either the old or the new shard array. Without a config the current one is kept.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "strata::coordinator::reset"))]
    pub fn reset(&self, cache_num: usize, config: Option<CacheConfig>) -> Result<()> {
        let mut shards = self.shards.write();
        let config = config.unwrap_or_else(|| CacheConfig::clone(&self.config.load()));
        self.status.store(CacheStatus::Reset);
        self.destroy_locked(&mut shards);
        tracing::info!("[cache]: reset to {cache_num} shards");
        self.init_locked(&mut shards, cache_num, Some(&config))
    }

    /// Tear down every shard and clear the statistics.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "strata::coordinator::destroy"))]
    pub fn destroy(&self) {
        let mut shards = self.shards.write();
        self.destroy_locked(&mut shards);
        tracing::info!("[cache]: destroyed");
    }

    fn destroy_locked(&self, shards: &mut Vec<Mutex<B::Engine>>) {
        self.status.store(CacheStatus::Destroy);
        for shard in shards.iter_mut() {
            shard.get_mut().close();
        }
        shards.clear();
        self.stats.clear();
        self.status.store(CacheStatus::None);
    }

    /// Hot reload the config shared by every shard.
    pub fn reset_config(&self, config: &CacheConfig) {
        let _shards = self.shards.write();
        self.config.store(Arc::new(config.clone().sanitized()));
        tracing::info!("[cache]: config reloaded: {config:?}");
    }

    /// Run the active expiration sweep of every shard in turn. Returns the count of expired keys.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "strata::coordinator::process_cron_task"))]
    pub fn process_cron_task(&self) -> usize {
        let shards = self.shards.read();
        let expired = shards.iter().map(|shard| shard.lock().active_expire_cycle()).sum();
        if expired > 0 {
            tracing::debug!("[cache]: cron task expired {expired} keys");
        }
        expired
    }

    /// Snapshot of the pool. Load pipeline counters are left at zero.
    pub fn info(&self) -> CacheInfo {
        let shards = self.shards.read();
        CacheInfo {
            status: self.status.load(),
            cache_num: shards.len(),
            keys_num: shards.iter().map(|shard| shard.lock().db_size()).sum(),
            used_memory: self.stats.used_memory(),
            hits: self.stats.hits(),
            misses: self.stats.misses(),
            async_load_keys_num: 0,
            waiting_load_keys_num: 0,
        }
    }

    /// Hits over lookups, `0` if nothing has been looked up.
    pub fn hit_ratio(&self) -> f64 {
        self.stats.hit_ratio()
    }

    /// Zero the hit and miss counters.
    pub fn clear_hit_ratio(&self) {
        self.stats.clear_hit_ratio();
    }

    /// Count of keys over every shard.
    pub fn db_size(&self) -> u64 {
        self.shards.read().iter().map(|shard| shard.lock().db_size()).sum()
    }

    /// Remove every key of every shard.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "strata::coordinator::flush_db"))]
    pub fn flush_db(&self) {
        let shards = self.shards.read();
        let status = self.status.load();
        self.status.store(CacheStatus::Clear);
        for shard in shards.iter() {
            shard.lock().flush_db();
        }
        self.status.store(status);
        tracing::info!("[cache]: flushed {} shards", shards.len());
    }

    /// Returns true if the key is cached. Does not count as a hit or miss.
    pub fn exists(&self, key: &[u8]) -> bool {
        self.with_shard(key, |engine| Ok(engine.exists(key))).unwrap_or(false)
    }

    /// Remove a key.
    pub fn del(&self, key: &[u8]) -> Result<()> {
        self.with_shard(key, |engine| engine.del(key))
    }

    /// Set a relative expiration in seconds. A non-positive ttl removes the key.
    pub fn expire(&self, key: &[u8], ttl: i64) -> Result<()> {
        self.with_shard(key, |engine| engine.expire(key, ttl))
    }

    /// Set an absolute expiration as a unix timestamp in seconds.
    pub fn expireat(&self, key: &[u8], timestamp: i64) -> Result<()> {
        self.with_shard(key, |engine| engine.expireat(key, timestamp))
    }

    /// Remaining seconds to live, or `TTL_NONE`.
    pub fn ttl(&self, key: &[u8]) -> Result<i64> {
        self.with_shard(key, |engine| engine.ttl(key))
    }

    /// Remove the expiration of a key.
    pub fn persist(&self, key: &[u8]) -> Result<()> {
        self.with_shard(key, |engine| engine.persist(key))
    }

    /// Type of the value held by a key.
    pub fn type_of(&self, key: &[u8]) -> Result<DataType> {
        self.with_shard(key, |engine| engine.type_of(key))
    }

    /// A random key.
    ///
    /// Starts from a random shard and probes the following ones, wrapping around, until a shard yields a key.
    pub fn random_key(&self) -> Result<Vec<u8>> {
        let shards = self.shards.read();
        if shards.is_empty() {
            return Err(Error::not_ready());
        }
        let start = rand::rng().random_range(0..shards.len());
        for i in 0..shards.len() {
            let index = (start + i) % shards.len();
            if let Ok(key) = shards[index].lock().random_key() {
                return Ok(key);
            }
        }
        Err(Error::not_found("cache is empty"))
    }
}

impl<B> Drop for Coordinator<B>
where
    B: EngineBuilder,
{
    fn drop(&mut self) {
        let shards = self.shards.get_mut();
        for shard in shards.iter_mut() {
            shard.get_mut().close();
        }
        shards.clear();
    }
}
