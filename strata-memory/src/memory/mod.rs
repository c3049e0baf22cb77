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

//! The default in-memory shard engine.

mod eviction;
mod hashes;
mod lists;
mod sets;
mod strings;
mod zsets;

use indexmap::IndexMap;
use rand::Rng as _;
use strata_common::{
    code::DataType,
    error::{Error, Result},
    ttl::{deadline_ms, now_ms, Ttl},
};

use crate::{
    engine::{Engine, EngineBuilder, EngineContext, KeyOps},
    object::{charge, Entry, Object},
};

/// Keys examined per round of the active expiration sweep.
const ACTIVE_EXPIRE_SAMPLES: usize = 20;
/// Max rounds of one active expiration sweep.
const ACTIVE_EXPIRE_ROUNDS: usize = 16;

/// Opens [`MemoryEngine`]s.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngineBuilder;

impl EngineBuilder for MemoryEngineBuilder {
    type Engine = MemoryEngine;

    fn open(&self, ctx: EngineContext) -> Result<MemoryEngine> {
        Ok(MemoryEngine::new(ctx))
    }
}

/// In-memory engine of one shard.
///
/// Expired keys are removed lazily on access and by [`KeyOps::active_expire_cycle`]. Every write that may grow the
/// keyspace first makes room according to the configured eviction policy.
#[derive(Debug)]
pub struct MemoryEngine {
    ctx: EngineContext,
    keys: IndexMap<Vec<u8>, Entry>,
    used: usize,
    clock: u64,
}

impl MemoryEngine {
    /// Create an empty engine.
    pub fn new(ctx: EngineContext) -> Self {
        Self {
            ctx,
            keys: IndexMap::new(),
            used: 0,
            clock: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn account(&mut self, old: usize, new: usize) {
        if new >= old {
            self.used += new - old;
            self.ctx.stats.add_memory((new - old) as u64);
        } else {
            strata_common::strict_assert!(self.used >= old - new);
            self.used -= old - new;
            self.ctx.stats.sub_memory((old - new) as u64);
        }
    }

    /// Index of the key if it is cached and not expired. An expired key is removed.
    fn live_index(&mut self, key: &[u8]) -> Option<usize> {
        let index = self.keys.get_index_of(key)?;
        if self.keys[index].is_expired(now_ms()) {
            self.remove_index(index);
            return None;
        }
        Some(index)
    }

    fn remove_index(&mut self, index: usize) {
        if let Some((_, entry)) = self.keys.swap_remove_index(index) {
            self.account(entry.charge, 0);
        }
    }

    fn insert(&mut self, key: &[u8], object: Object, expire_at_ms: Option<u64>) -> usize {
        let lru = self.tick();
        let charge = charge(key, &object);
        let entry = Entry {
            object,
            expire_at_ms,
            lru,
            freq: eviction::LFU_INIT_VAL,
            lfu_decr_at: eviction::now_minutes(),
            charge,
        };
        let (index, old) = self.keys.insert_full(key.to_vec(), entry);
        self.account(old.map(|e| e.charge).unwrap_or_default(), charge);
        index
    }

    /// Look up a key for reading, counting a keyspace hit or miss.
    fn read<T>(&mut self, key: &[u8], f: impl FnOnce(&Object) -> Result<T>) -> Result<T> {
        let Some(index) = self.live_index(key) else {
            self.ctx.stats.miss();
            return Err(Error::not_found("key not found"));
        };
        self.ctx.stats.hit();
        self.touch(index);
        f(&self.keys[index].object)
    }

    fn touch(&mut self, index: usize) {
        let clock = self.tick();
        let config = self.ctx.config.load();
        let entry = &mut self.keys[index];
        entry.lru = clock;
        if eviction::is_lfu(config.maxmemory_policy) {
            eviction::lfu_touch(entry, config.lfu_decay_time);
        }
    }

    /// Mutate a cached key. Missing keys yield `NotFound`.
    fn update<T>(&mut self, key: &[u8], f: impl FnOnce(&mut Object) -> Result<T>) -> Result<T> {
        match self.live_index(key) {
            Some(index) => self.modify(index, f),
            None => Err(Error::not_found("key not found")),
        }
    }

    /// Mutate a key, creating it from `empty` if it is missing. Makes room first.
    fn upsert<T>(
        &mut self,
        key: &[u8],
        empty: impl FnOnce() -> Object,
        f: impl FnOnce(&mut Object) -> Result<T>,
    ) -> Result<T> {
        self.reserve()?;
        let index = match self.live_index(key) {
            Some(index) => index,
            None => self.insert(key, empty(), None),
        };
        self.modify(index, f)
    }

    fn modify<T>(&mut self, index: usize, f: impl FnOnce(&mut Object) -> Result<T>) -> Result<T> {
        self.touch(index);
        let (key, entry) = self
            .keys
            .get_index_mut(index)
            .ok_or_else(|| Error::corruption("keyspace index out of bounds"))?;
        let res = f(&mut entry.object);
        if entry.object.is_empty_collection() {
            self.remove_index(index);
        } else {
            let old = entry.charge;
            let new = charge(key, &entry.object);
            entry.charge = new;
            self.account(old, new);
        }
        res
    }

    /// Replace the value of a key, dropping its expiration unless a new one is given.
    fn put(&mut self, key: &[u8], object: Object, ttl: Option<u64>) -> Result<()> {
        self.reserve()?;
        let expire_at_ms = ttl.map(deadline_ms);
        self.insert(key, object, expire_at_ms);
        Ok(())
    }

    /// Evict keys while the pool is over its memory limit.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "strata::memory::engine::reserve"))]
    fn reserve(&mut self) -> Result<()> {
        let config = self.ctx.config.load_full();
        let mut evicted = 0;
        while self.ctx.stats.used_memory() > config.maxmemory {
            match self.pick_victim(&config) {
                Some(index) => {
                    self.remove_index(index);
                    evicted += 1;
                }
                None => {
                    tracing::debug!(
                        "[memory engine]: shard {} cannot evict under policy {:?}, evicted {evicted}",
                        self.ctx.shard,
                        config.maxmemory_policy,
                    );
                    return Err(Error::out_of_memory(config.maxmemory, self.ctx.stats.used_memory())
                        .with_context("shard", self.ctx.shard));
                }
            }
        }
        if evicted > 0 {
            tracing::debug!("[memory engine]: shard {} evicted {evicted} keys", self.ctx.shard);
        }
        Ok(())
    }
}

impl KeyOps for MemoryEngine {
    fn exists(&mut self, key: &[u8]) -> bool {
        self.live_index(key).is_some()
    }

    fn del(&mut self, key: &[u8]) -> Result<()> {
        match self.live_index(key) {
            Some(index) => {
                self.remove_index(index);
                Ok(())
            }
            None => Err(Error::not_found("key not found")),
        }
    }

    fn expire(&mut self, key: &[u8], ttl: i64) -> Result<()> {
        let Some(index) = self.live_index(key) else {
            return Err(Error::not_found("key not found"));
        };
        if ttl <= 0 {
            self.remove_index(index);
        } else {
            self.keys[index].expire_at_ms = Some(deadline_ms(ttl as u64));
        }
        Ok(())
    }

    fn expireat(&mut self, key: &[u8], timestamp: i64) -> Result<()> {
        let Some(index) = self.live_index(key) else {
            return Err(Error::not_found("key not found"));
        };
        let at = (timestamp.max(0) as u64).saturating_mul(1000);
        if at <= now_ms() {
            self.remove_index(index);
        } else {
            self.keys[index].expire_at_ms = Some(at);
        }
        Ok(())
    }

    fn ttl(&mut self, key: &[u8]) -> Result<i64> {
        let index = self
            .live_index(key)
            .ok_or_else(|| Error::not_found("key not found"))?;
        let now = now_ms();
        let remaining = self.keys[index].expire_at_ms.map(|at| at.saturating_sub(now));
        Ok(Ttl::raw_remaining_secs(remaining))
    }

    fn persist(&mut self, key: &[u8]) -> Result<()> {
        let index = self
            .live_index(key)
            .ok_or_else(|| Error::not_found("key not found"))?;
        self.keys[index].expire_at_ms = None;
        Ok(())
    }

    fn type_of(&mut self, key: &[u8]) -> Result<DataType> {
        let index = self
            .live_index(key)
            .ok_or_else(|| Error::not_found("key not found"))?;
        Ok(self.keys[index].object.data_type())
    }

    fn random_key(&mut self) -> Result<Vec<u8>> {
        let mut rng = rand::rng();
        let now = now_ms();
        // Every expired pick is removed, so the loop ends.
        while !self.keys.is_empty() {
            let index = rng.random_range(0..self.keys.len());
            if self.keys[index].is_expired(now) {
                self.remove_index(index);
                continue;
            }
            if let Some((key, _)) = self.keys.get_index(index) {
                return Ok(key.clone());
            }
        }
        Err(Error::not_found("keyspace is empty"))
    }

    fn db_size(&self) -> u64 {
        self.keys.len() as u64
    }

    fn flush_db(&mut self) {
        self.keys.clear();
        let used = self.used;
        self.account(used, 0);
    }

    #[cfg_attr(feature = "tracing", fastrace::trace(name = "strata::memory::engine::active_expire_cycle"))]
    fn active_expire_cycle(&mut self) -> usize {
        let mut rng = rand::rng();
        let now = now_ms();
        let mut removed = 0;

        for _ in 0..ACTIVE_EXPIRE_ROUNDS {
            if self.keys.is_empty() {
                break;
            }

            if self.keys.len() <= ACTIVE_EXPIRE_SAMPLES {
                let before = self.keys.len();
                let mut index = 0;
                while index < self.keys.len() {
                    if self.keys[index].is_expired(now) {
                        self.remove_index(index);
                    } else {
                        index += 1;
                    }
                }
                removed += before - self.keys.len();
                // The whole keyspace has been examined.
                break;
            }

            let mut volatile = 0;
            let mut expired = 0;
            for _ in 0..ACTIVE_EXPIRE_SAMPLES {
                if self.keys.is_empty() {
                    break;
                }
                let index = rng.random_range(0..self.keys.len());
                let entry = &self.keys[index];
                if entry.expire_at_ms.is_none() {
                    continue;
                }
                volatile += 1;
                if entry.is_expired(now) {
                    self.remove_index(index);
                    expired += 1;
                }
            }
            removed += expired;

            if volatile == 0 || expired * 4 <= volatile {
                break;
            }
        }

        if removed > 0 {
            tracing::debug!(
                "[memory engine]: shard {} expired {removed} keys actively",
                self.ctx.shard
            );
        }
        removed
    }

    fn used_memory(&self) -> u64 {
        self.used as u64
    }
}

impl Engine for MemoryEngine {
    fn close(&mut self) {
        self.flush_db();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use arc_swap::ArcSwap;
    use strata_common::{config::CacheConfig, stats::Stats, ttl::TTL_NONE};

    use super::*;
    use crate::engine::StringOps;

    pub fn engine_with(config: CacheConfig) -> MemoryEngine {
        MemoryEngineBuilder
            .open(EngineContext {
                shard: 0,
                config: Arc::new(ArcSwap::from_pointee(config)),
                stats: Arc::new(Stats::default()),
            })
            .unwrap()
    }

    pub fn engine() -> MemoryEngine {
        engine_with(CacheConfig::default())
    }

    #[test]
    fn test_lazy_expire() {
        let mut e = engine();
        e.set(b"k", b"v", Some(100)).unwrap();
        assert!(e.exists(b"k"));
        e.keys[0].expire_at_ms = Some(now_ms() - 1);
        assert!(!e.exists(b"k"));
        assert_eq!(e.db_size(), 0);
        assert_eq!(e.used_memory(), 0);
    }

    #[test]
    fn test_ttl_and_persist() {
        let mut e = engine();
        e.set(b"k", b"v", None).unwrap();
        assert_eq!(e.ttl(b"k").unwrap(), TTL_NONE);
        e.expire(b"k", 100).unwrap();
        assert_eq!(e.ttl(b"k").unwrap(), 100);
        e.persist(b"k").unwrap();
        assert_eq!(e.ttl(b"k").unwrap(), TTL_NONE);
        e.expire(b"k", 0).unwrap();
        assert!(e.ttl(b"k").unwrap_err().is_not_found());

        e.set(b"k", b"v", None).unwrap();
        e.expireat(b"k", 1).unwrap();
        assert!(!e.exists(b"k"));
    }

    #[test]
    fn test_huge_ttl() {
        let mut e = engine();
        e.set(b"k", b"v", Some(i64::MAX as u64)).unwrap();
        assert!(e.ttl(b"k").unwrap() > 0);

        e.expire(b"k", i64::MAX).unwrap();
        assert!(e.ttl(b"k").unwrap() > 0);

        e.expireat(b"k", i64::MAX).unwrap();
        assert!(e.exists(b"k"));
        assert_eq!(e.active_expire_cycle(), 0);
        assert!(e.exists(b"k"));
    }

    #[test]
    fn test_hits_and_misses() {
        let mut e = engine();
        e.set(b"k", b"v", None).unwrap();
        e.get(b"k").unwrap();
        e.get(b"x").unwrap_err();
        assert!(e.exists(b"k"));
        assert!(!e.exists(b"x"));
        assert_eq!(e.ctx.stats.hits(), 1);
        assert_eq!(e.ctx.stats.misses(), 1);
    }

    #[test_log::test]
    fn test_active_expire_cycle() {
        let mut e = engine();
        for i in 0..100u32 {
            e.set(&i.to_be_bytes(), b"v", Some(100)).unwrap();
        }
        e.set(b"persist", b"v", None).unwrap();
        let now = now_ms();
        for entry in e.keys.values_mut() {
            if entry.expire_at_ms.is_some() {
                entry.expire_at_ms = Some(now - 1);
            }
        }
        let mut removed = 0;
        for _ in 0..1000 {
            removed += e.active_expire_cycle();
            if e.db_size() == 1 {
                break;
            }
        }
        assert_eq!(removed, 100);
        assert_eq!(e.db_size(), 1);
        assert!(e.exists(b"persist"));
    }

    #[test]
    fn test_random_key_and_flush() {
        let mut e = engine();
        assert!(e.random_key().unwrap_err().is_not_found());
        e.set(b"a", b"1", None).unwrap();
        e.set(b"b", b"2", None).unwrap();
        let key = e.random_key().unwrap();
        assert!(key == b"a" || key == b"b");
        assert!(e.used_memory() > 0);
        assert_eq!(e.used_memory(), e.ctx.stats.used_memory());
        e.flush_db();
        assert_eq!(e.db_size(), 0);
        assert_eq!(e.ctx.stats.used_memory(), 0);
    }

    #[test]
    fn test_type_of() {
        let mut e = engine();
        e.set(b"k", b"v", None).unwrap();
        assert_eq!(e.type_of(b"k").unwrap(), DataType::String);
        assert!(e.type_of(b"x").unwrap_err().is_not_found());
        assert!(e.del(b"x").unwrap_err().is_not_found());
        e.del(b"k").unwrap();
    }
}
