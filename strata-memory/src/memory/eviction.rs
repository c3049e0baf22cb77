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

//! Sampled approximations of the eviction policies.
//!
//! Each eviction draws `maxmemory_samples` random candidates from the shard and evicts the best one, the same
//! trade-off Redis makes instead of keeping exact LRU/LFU order.

use rand::Rng as _;
use strata_common::{
    config::{CacheConfig, EvictionPolicy},
    ttl::now_ms,
};

use super::MemoryEngine;
use crate::object::Entry;

/// Initial LFU counter of new keys, so that they are not evicted before they get a chance to be accessed.
pub const LFU_INIT_VAL: u8 = 5;
const LFU_LOG_FACTOR: f64 = 10.0;

/// Draws per sample slot while looking for keys with an expiration.
const VOLATILE_DRAWS_PER_SAMPLE: usize = 10;

pub fn is_lfu(policy: EvictionPolicy) -> bool {
    matches!(policy, EvictionPolicy::AllkeysLfu | EvictionPolicy::VolatileLfu)
}

pub fn now_minutes() -> u64 {
    now_ms() / 60_000
}

/// Decay the counter by one per elapsed `decay_time` minutes.
fn lfu_decayed(entry: &Entry, decay_time: u32) -> u8 {
    if decay_time == 0 {
        return entry.freq;
    }
    let periods = now_minutes().saturating_sub(entry.lfu_decr_at) / decay_time as u64;
    entry.freq.saturating_sub(periods.min(u8::MAX as u64) as u8)
}

/// Logarithmic increment: the higher the counter, the less likely it grows.
fn lfu_log_incr(counter: u8) -> u8 {
    if counter == u8::MAX {
        return counter;
    }
    let base = counter.saturating_sub(LFU_INIT_VAL) as f64;
    let p = 1.0 / (base * LFU_LOG_FACTOR + 1.0);
    if rand::rng().random::<f64>() < p {
        counter + 1
    } else {
        counter
    }
}

pub fn lfu_touch(entry: &mut Entry, decay_time: u32) {
    let freq = lfu_decayed(entry, decay_time);
    entry.freq = lfu_log_incr(freq);
    entry.lfu_decr_at = now_minutes();
}

impl MemoryEngine {
    /// Pick the index of the key to evict, or `None` if the policy forbids eviction or finds no candidate.
    pub(super) fn pick_victim(&mut self, config: &CacheConfig) -> Option<usize> {
        let policy = config.maxmemory_policy;
        if policy == EvictionPolicy::NoEviction || self.keys.is_empty() {
            return None;
        }

        let samples = self.sample(config.maxmemory_samples.max(1) as usize, policy.is_volatile());
        if samples.is_empty() {
            return None;
        }

        let best = match policy {
            EvictionPolicy::NoEviction => return None,
            EvictionPolicy::AllkeysRandom | EvictionPolicy::VolatileRandom => {
                Some(samples[rand::rng().random_range(0..samples.len())])
            }
            EvictionPolicy::AllkeysLru | EvictionPolicy::VolatileLru => {
                samples.iter().copied().min_by_key(|&i| self.keys[i].lru)
            }
            EvictionPolicy::AllkeysLfu | EvictionPolicy::VolatileLfu => samples
                .iter()
                .copied()
                .min_by_key(|&i| (lfu_decayed(&self.keys[i], config.lfu_decay_time), self.keys[i].lru)),
            EvictionPolicy::VolatileTtl => samples
                .iter()
                .copied()
                .min_by_key(|&i| self.keys[i].expire_at_ms.unwrap_or(u64::MAX)),
        };

        if let Some(index) = best {
            tracing::trace!(
                "[memory engine]: shard {} evicts {:?} under {policy:?}",
                self.ctx.shard,
                String::from_utf8_lossy(self.keys.get_index(index).map(|(k, _)| k.as_slice()).unwrap_or_default()),
            );
        }
        best
    }

    /// Draw up to `count` random candidate indexes.
    fn sample(&self, count: usize, volatile: bool) -> Vec<usize> {
        let mut rng = rand::rng();
        let len = self.keys.len();

        if len <= count {
            return self
                .keys
                .values()
                .enumerate()
                .filter(|(_, e)| !volatile || e.expire_at_ms.is_some())
                .map(|(i, _)| i)
                .collect();
        }

        if !volatile {
            return (0..count).map(|_| rng.random_range(0..len)).collect();
        }

        let mut samples = Vec::with_capacity(count);
        for _ in 0..(count * VOLATILE_DRAWS_PER_SAMPLE).min(len * 2) {
            let index = rng.random_range(0..len);
            if self.keys[index].expire_at_ms.is_some() {
                samples.push(index);
                if samples.len() == count {
                    return samples;
                }
            }
        }

        if samples.is_empty() {
            // Keys with an expiration are rare, fall back to a scan.
            samples.extend(
                self.keys
                    .values()
                    .enumerate()
                    .filter(|(_, e)| e.expire_at_ms.is_some())
                    .map(|(i, _)| i)
                    .take(count),
            );
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use strata_common::config::CacheConfig;

    use super::*;
    use crate::{
        engine::{KeyOps, StringOps},
        memory::tests::engine_with,
    };

    fn config(policy: EvictionPolicy, maxmemory: u64) -> CacheConfig {
        CacheConfig {
            maxmemory,
            maxmemory_policy: policy,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_eviction_rejects_writes() {
        let mut e = engine_with(config(EvictionPolicy::NoEviction, 256));
        let mut res = Ok(());
        for i in 0..100u32 {
            res = e.set(&i.to_be_bytes(), &[0; 64], None);
            if res.is_err() {
                break;
            }
        }
        let err = res.unwrap_err();
        assert_eq!(err.kind(), strata_common::error::ErrorKind::OutOfMemory);
        // Reads keep working.
        assert!(e.get(&0u32.to_be_bytes()).is_ok());
    }

    #[test_log::test]
    fn test_allkeys_lru_keeps_memory_bounded() {
        let mut e = engine_with(config(EvictionPolicy::AllkeysLru, 4096));
        for i in 0..1000u32 {
            e.set(&i.to_be_bytes(), &[0; 64], None).unwrap();
        }
        assert!(e.db_size() < 1000);
        // One write may overshoot the limit before the next one evicts.
        assert!(e.used_memory() <= 4096 + 256);
    }

    #[test]
    fn test_volatile_policy_only_evicts_volatile_keys() {
        let mut e = engine_with(config(EvictionPolicy::VolatileLru, 1024));
        for i in 0..8u32 {
            e.set(&i.to_be_bytes(), &[0; 64], None).unwrap();
        }
        e.set(b"volatile", &[0; 64], Some(100)).unwrap();
        let mut res = Ok(());
        for i in 100..200u32 {
            res = e.set(&i.to_be_bytes(), &[0; 64], None);
            if res.is_err() {
                break;
            }
        }
        assert!(res.is_err());
        assert!(!e.exists(b"volatile"));
        assert!(e.exists(&0u32.to_be_bytes()));
    }

    #[test]
    fn test_volatile_ttl_evicts_nearest_expiration() {
        let mut e = engine_with(config(EvictionPolicy::VolatileTtl, u64::MAX));
        e.set(b"near", b"v", Some(10)).unwrap();
        e.set(b"far", b"v", Some(10_000)).unwrap();
        let mut cfg = config(EvictionPolicy::VolatileTtl, 0);
        cfg.maxmemory_samples = 16;
        let victim = e.pick_victim(&cfg).unwrap();
        assert_eq!(e.keys.get_index(victim).unwrap().0, b"near");
    }

    #[test]
    fn test_lfu_counter() {
        let mut freq = LFU_INIT_VAL;
        for _ in 0..1000 {
            freq = lfu_log_incr(freq);
        }
        assert!(freq > LFU_INIT_VAL);
        assert_eq!(lfu_log_incr(u8::MAX), u8::MAX);
    }
}
