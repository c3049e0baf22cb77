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

//! Observability of the shard pool.

use std::time::Instant;

use serde::Serialize;

use crate::status::CacheStatus;

/// Point-in-time snapshot of the shard pool and the load pipeline.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    /// Lifecycle status.
    pub status: CacheStatus,
    /// Count of shards.
    pub cache_num: usize,
    /// Count of cached keys over every shard.
    pub keys_num: u64,
    /// Bytes charged over every shard.
    pub used_memory: u64,
    /// Keyspace hits.
    pub hits: u64,
    /// Keyspace misses.
    pub misses: u64,
    /// Keys loaded by the load pipeline so far.
    pub async_load_keys_num: u64,
    /// Keys waiting in the load queue.
    pub waiting_load_keys_num: u64,
}

/// [`CacheInfo`] enriched with rates derived from the previous snapshot.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DisplayCacheInfo {
    /// The latest snapshot.
    #[serde(flatten)]
    pub info: CacheInfo,
    /// Hits per second since the previous snapshot.
    pub hits_per_sec: u64,
    /// Lookups per second since the previous snapshot.
    pub read_cmd_per_sec: u64,
    /// Hit ratio in percent since the previous snapshot.
    pub hitratio_per_sec: f64,
    /// Hit ratio in percent since the statistics were last cleared.
    pub hitratio_all: f64,
    /// Loaded keys per second since the previous snapshot.
    pub load_keys_per_sec: u64,
}

/// Derives [`DisplayCacheInfo`] from periodic [`CacheInfo`] snapshots.
#[derive(Debug, Default)]
pub struct InfoTracker {
    last: Option<(Instant, CacheInfo)>,
    display: DisplayCacheInfo,
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

impl InfoTracker {
    /// Feed a snapshot taken now.
    pub fn update(&mut self, info: &CacheInfo) -> &DisplayCacheInfo {
        self.update_at(info, Instant::now())
    }

    /// Feed a snapshot taken at `now`.
    ///
    /// Rates are zero on the first snapshot. Counters that went backwards, e.g. after a reset of the pool, count as
    /// zero progress.
    pub fn update_at(&mut self, info: &CacheInfo, now: Instant) -> &DisplayCacheInfo {
        let (hits_per_sec, read_cmd_per_sec, hitratio_per_sec, load_keys_per_sec) = match &self.last {
            Some((at, last)) => {
                let secs = now.saturating_duration_since(*at).as_secs_f64();
                let hits = info.hits.saturating_sub(last.hits);
                let reads = (info.hits + info.misses).saturating_sub(last.hits + last.misses);
                let loads = info.async_load_keys_num.saturating_sub(last.async_load_keys_num);
                let rate = |delta: u64| if secs > 0.0 { (delta as f64 / secs) as u64 } else { 0 };
                (rate(hits), rate(reads), percent(hits, reads), rate(loads))
            }
            None => (0, 0, 0.0, 0),
        };

        self.display = DisplayCacheInfo {
            info: info.clone(),
            hits_per_sec,
            read_cmd_per_sec,
            hitratio_per_sec,
            hitratio_all: percent(info.hits, info.hits + info.misses),
            load_keys_per_sec,
        };
        self.last = Some((now, info.clone()));
        &self.display
    }

    /// The latest display info.
    pub fn display(&self) -> &DisplayCacheInfo {
        &self.display
    }

    /// Forget the previous snapshot, e.g. after the pool has been rebuilt.
    pub fn reset(&mut self, status: CacheStatus) {
        self.last = None;
        self.display = DisplayCacheInfo {
            info: CacheInfo {
                status,
                ..Default::default()
            },
            ..Default::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn info(hits: u64, misses: u64, loaded: u64) -> CacheInfo {
        CacheInfo {
            status: CacheStatus::Ok,
            cache_num: 16,
            hits,
            misses,
            async_load_keys_num: loaded,
            ..Default::default()
        }
    }

    #[test]
    fn test_first_update() {
        let mut tracker = InfoTracker::default();
        let display = tracker.update(&info(30, 10, 5));
        assert_eq!(display.hits_per_sec, 0);
        assert_eq!(display.read_cmd_per_sec, 0);
        assert_eq!(display.load_keys_per_sec, 0);
        assert_eq!(display.hitratio_all, 75.0);
    }

    #[test]
    fn test_rates() {
        let mut tracker = InfoTracker::default();
        let t0 = Instant::now();
        tracker.update_at(&info(0, 0, 0), t0);
        let display = tracker.update_at(&info(100, 100, 20), t0 + Duration::from_secs(2));
        assert_eq!(display.hits_per_sec, 50);
        assert_eq!(display.read_cmd_per_sec, 100);
        assert_eq!(display.hitratio_per_sec, 50.0);
        assert_eq!(display.load_keys_per_sec, 10);

        // Counters cleared in between.
        let display = tracker.update_at(&info(1, 0, 0), t0 + Duration::from_secs(3));
        assert_eq!(display.hits_per_sec, 0);
        assert_eq!(display.load_keys_per_sec, 0);
        assert_eq!(display.hitratio_per_sec, 0.0);
        assert_eq!(display.hitratio_all, 100.0);

        tracker.reset(CacheStatus::None);
        assert_eq!(tracker.display().info.status, CacheStatus::None);
        assert_eq!(tracker.update(&info(5, 5, 0)).hits_per_sec, 0);
    }

    #[test]
    fn test_serialize() {
        let mut tracker = InfoTracker::default();
        let json = serde_json::to_value(tracker.update(&info(1, 1, 0))).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["hitratio_all"], 50.0);
    }
}
