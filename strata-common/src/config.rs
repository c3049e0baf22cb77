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

use serde::{Deserialize, Serialize};

/// Default memory limit of the cache, 10 GiB.
pub const DEFAULT_MAXMEMORY: u64 = 10 * 1024 * 1024 * 1024;
/// Default sampling precision of the eviction policy.
pub const DEFAULT_MAXMEMORY_SAMPLES: u32 = 5;
/// Default LFU counter decay period in minutes.
pub const DEFAULT_LFU_DECAY_TIME: u32 = 1;
/// Default count of sorted set members mirrored in the cache per key.
pub const DEFAULT_ZSET_CACHE_ITEMS_PER_KEY: u32 = 512;
/// Default shard count.
pub const DEFAULT_CACHE_NUM: usize = 16;
/// Max shard count.
pub const MAX_CACHE_NUM: usize = 48;

/// Key eviction policy applied by each shard when the memory limit is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EvictionPolicy {
    /// Approximated LRU among keys with an expiration.
    VolatileLru,
    /// Approximated LRU among all keys.
    AllkeysLru,
    /// Approximated LFU among keys with an expiration.
    VolatileLfu,
    /// Approximated LFU among all keys.
    AllkeysLfu,
    /// Random keys with an expiration.
    VolatileRandom,
    /// Random keys.
    AllkeysRandom,
    /// Keys with the nearest expiration.
    VolatileTtl,
    /// Reject writes when the memory limit is reached.
    #[default]
    NoEviction,
}

impl EvictionPolicy {
    /// Returns true if the policy only evicts keys with an expiration.
    pub fn is_volatile(self) -> bool {
        matches!(
            self,
            EvictionPolicy::VolatileLru
                | EvictionPolicy::VolatileLfu
                | EvictionPolicy::VolatileRandom
                | EvictionPolicy::VolatileTtl
        )
    }
}

/// Which end of a sorted set is mirrored in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StartPos {
    /// The lowest scores are cached.
    #[default]
    FromBegin,
    /// The highest scores are cached.
    FromEnd,
}

/// Cache config shared by every shard.
///
/// Hot reloadable through `reset_config` without rebuilding the shards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Max memory in bytes used by all shards together.
    pub maxmemory: u64,
    /// Key eviction policy.
    pub maxmemory_policy: EvictionPolicy,
    /// Count of keys sampled per eviction.
    pub maxmemory_samples: u32,
    /// LFU counter decay period in minutes.
    pub lfu_decay_time: u32,
    /// Which end of a sorted set is cached.
    pub zset_cache_start_pos: StartPos,
    /// Max count of sorted set members cached per key.
    pub zset_cache_items_per_key: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            maxmemory: DEFAULT_MAXMEMORY,
            maxmemory_policy: EvictionPolicy::default(),
            maxmemory_samples: DEFAULT_MAXMEMORY_SAMPLES,
            lfu_decay_time: DEFAULT_LFU_DECAY_TIME,
            zset_cache_start_pos: StartPos::default(),
            zset_cache_items_per_key: DEFAULT_ZSET_CACHE_ITEMS_PER_KEY,
        }
    }
}

impl CacheConfig {
    /// Replace out-of-range values with their defaults.
    pub fn sanitized(mut self) -> Self {
        if self.maxmemory_samples == 0 {
            self.maxmemory_samples = DEFAULT_MAXMEMORY_SAMPLES;
        }
        if self.zset_cache_items_per_key == 0 {
            self.zset_cache_items_per_key = DEFAULT_ZSET_CACHE_ITEMS_PER_KEY;
        }
        self
    }

    /// Inclusive rank range of a sorted set mirrored in the cache.
    pub fn zset_window(&self) -> (i64, i64) {
        let items = self.zset_cache_items_per_key as i64;
        match self.zset_cache_start_pos {
            StartPos::FromBegin => (0, items - 1),
            StartPos::FromEnd => (-items, -1),
        }
    }
}

/// Normalize a shard count, out-of-range values fall back to [`DEFAULT_CACHE_NUM`].
pub fn sanitize_cache_num(cache_num: usize) -> usize {
    if cache_num == 0 || cache_num > MAX_CACHE_NUM {
        DEFAULT_CACHE_NUM
    } else {
        cache_num
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde() {
        let config: CacheConfig =
            serde_json::from_str(r#"{ "maxmemory": 1024, "maxmemory_policy": "allkeys-lru" }"#).unwrap();
        assert_eq!(config.maxmemory, 1024);
        assert_eq!(config.maxmemory_policy, EvictionPolicy::AllkeysLru);
        assert_eq!(config.maxmemory_samples, DEFAULT_MAXMEMORY_SAMPLES);
        assert_eq!(config.zset_cache_start_pos, StartPos::FromBegin);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_cache_num(0), DEFAULT_CACHE_NUM);
        assert_eq!(sanitize_cache_num(49), DEFAULT_CACHE_NUM);
        assert_eq!(sanitize_cache_num(8), 8);

        let config = CacheConfig {
            maxmemory_samples: 0,
            zset_cache_items_per_key: 0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(config.maxmemory_samples, DEFAULT_MAXMEMORY_SAMPLES);
        assert_eq!(config.zset_cache_items_per_key, DEFAULT_ZSET_CACHE_ITEMS_PER_KEY);
    }

    #[test]
    fn test_zset_window() {
        let mut config = CacheConfig {
            zset_cache_items_per_key: 3,
            ..Default::default()
        };
        assert_eq!(config.zset_window(), (0, 2));
        config.zset_cache_start_pos = StartPos::FromEnd;
        assert_eq!(config.zset_window(), (-3, -1));
    }
}
