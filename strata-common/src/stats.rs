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

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide cache statistics shared by the shard pool and every shard engine.
///
/// Reset when the pool is initialized and cleared when it is destroyed.
#[derive(Debug, Default)]
pub struct Stats {
    hits: AtomicU64,
    misses: AtomicU64,
    used_memory: AtomicU64,
}

impl Stats {
    /// Record a keyspace hit.
    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a keyspace miss.
    pub fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Keyspace hits.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Keyspace misses.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// `hits / (hits + misses)`, or `0.0` if nothing has been recorded.
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits();
        let all = hits + self.misses();
        if all == 0 {
            return 0.0;
        }
        hits as f64 / all as f64
    }

    /// Zero the hit and miss counters.
    pub fn clear_hit_ratio(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Bytes used by all shards.
    pub fn used_memory(&self) -> u64 {
        self.used_memory.load(Ordering::Relaxed)
    }

    /// Account `bytes` more memory.
    pub fn add_memory(&self, bytes: u64) {
        self.used_memory.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Release `bytes` of accounted memory.
    pub fn sub_memory(&self, bytes: u64) {
        let _ = self
            .used_memory
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(bytes)));
    }

    /// Zero all counters.
    pub fn clear(&self) {
        self.clear_hit_ratio();
        self.used_memory.store(0, Ordering::Relaxed);
    }
}
