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

//! Containment checks of requested sorted set ranges against the cached window.
//!
//! Only a bounded window of each sorted set is cached, either the lowest or the highest scores depending on
//! [`StartPos`]. Given the cached length and the backing store length, a request is either served by the cache
//! ([`RangeStatus::Hit`]), must fall back to the backing store ([`RangeStatus::Miss`]), or selects nothing at all
//! ([`RangeStatus::Error`]).

use strata_common::{code::ScoreMember, config::StartPos};
use strata_memory::bound::ScoreBound;

/// Outcome of a range check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeStatus {
    /// The request is covered by the cached window. Carries the bounds translated to cache-local indexes.
    Hit {
        /// First cache-local index.
        start: i64,
        /// Last cache-local index, inclusive.
        stop: i64,
    },
    /// The request reaches beyond the cached window.
    Miss,
    /// The request is empty or entirely out of range.
    Error,
}

/// Resolve `[start, stop]` against `db_len`, clamped to the valid index space. `None` if nothing is selected.
fn resolve(start: i64, stop: i64, db_len: i64) -> Option<(i64, i64)> {
    let start = if start >= 0 { start } else { db_len + start }.max(0);
    let stop = if stop >= 0 { stop } else { db_len + stop }.min(db_len - 1);
    if start > stop || start >= db_len || stop < 0 {
        return None;
    }
    Some((start, stop))
}

/// Translate resolved backing store indexes into the cached window, if the window covers them.
fn locate(start: i64, stop: i64, cache_len: i64, db_len: i64, start_pos: StartPos) -> Option<(i64, i64)> {
    match start_pos {
        StartPos::FromBegin => (start < cache_len && stop < cache_len).then_some((start, stop)),
        StartPos::FromEnd => {
            let offset = db_len - cache_len;
            (start >= offset && stop >= offset).then_some((start - offset, stop - offset))
        }
    }
}

/// Check a forward index range.
///
/// Negative indexes are resolved against the backing store length first.
pub fn check_cache_range(cache_len: u64, db_len: u64, start: i64, stop: i64, start_pos: StartPos) -> RangeStatus {
    let (cache_len, db_len) = (cache_len as i64, db_len as i64);
    let Some((start, stop)) = resolve(start, stop, db_len) else {
        return RangeStatus::Error;
    };
    match locate(start, stop, cache_len, db_len, start_pos) {
        Some((start, stop)) => RangeStatus::Hit { start, stop },
        None => RangeStatus::Miss,
    }
}

/// Check a reverse index range, where index `0` is the highest score.
///
/// The hit bounds are reverse indexes into the cached window.
pub fn check_cache_rev_range(
    cache_len: u64,
    db_len: u64,
    start: i64,
    stop: i64,
    start_pos: StartPos,
) -> RangeStatus {
    let (cache_len, db_len) = (cache_len as i64, db_len as i64);
    let forward_start = if stop >= 0 { db_len - stop - 1 } else { -stop - 1 };
    let forward_stop = if start >= 0 { db_len - start - 1 } else { -start - 1 };
    let forward_start = forward_start.max(0);
    let forward_stop = forward_stop.min(db_len - 1);
    if forward_start > forward_stop || forward_start >= db_len || forward_stop < 0 {
        return RangeStatus::Error;
    }
    match locate(forward_start, forward_stop, cache_len, db_len, start_pos) {
        Some((cache_start, cache_stop)) => RangeStatus::Hit {
            start: cache_len - cache_stop - 1,
            stop: cache_len - cache_start - 1,
        },
        None => RangeStatus::Miss,
    }
}

/// Check a score range against a cached window spanning `[cache_min, cache_max]` of a sorted set of `db_len`
/// members.
///
/// Only a window holding all `db_len` members is the whole set. Any other window may be missing members that tie
/// with its open edge score, so a bound landing exactly on that edge is a miss unless it is exclusive. A window
/// longer than the backing set is stale and always misses.
pub fn check_cache_range_by_score(
    cache_len: u64,
    db_len: u64,
    cache_min: f64,
    cache_max: f64,
    min: &ScoreBound,
    max: &ScoreBound,
    start_pos: StartPos,
) -> RangeStatus {
    let hit = RangeStatus::Hit {
        start: 0,
        stop: cache_len as i64 - 1,
    };
    let below_window = !max.above(cache_min);
    let above_window = !min.below(cache_max);

    if cache_len > db_len {
        return RangeStatus::Miss;
    }
    if cache_len == db_len {
        return if below_window || above_window {
            RangeStatus::Error
        } else {
            hit
        };
    }

    match start_pos {
        StartPos::FromBegin => {
            if below_window {
                RangeStatus::Error
            } else if max.value < cache_max || (max.exclusive && max.value == cache_max) {
                hit
            } else {
                RangeStatus::Miss
            }
        }
        StartPos::FromEnd => {
            if above_window {
                RangeStatus::Error
            } else if min.value > cache_min || (min.exclusive && min.value == cache_min) {
                hit
            } else {
                RangeStatus::Miss
            }
        }
    }
}

/// Compare a cached score-member window with the authoritative one. Logs the first mismatch.
pub fn score_members_consistent(cache: &[ScoreMember], db: &[ScoreMember]) -> bool {
    if cache.len() != db.len() {
        tracing::warn!(
            "[cache]: sorted set window length mismatch, cache: {}, db: {}",
            cache.len(),
            db.len()
        );
        return false;
    }
    match cache.iter().zip(db.iter()).position(|(c, d)| c != d) {
        Some(i) => {
            tracing::warn!(
                "[cache]: sorted set window mismatch at {i}, cache: ({}, {:?}), db: ({}, {:?})",
                cache[i].score,
                String::from_utf8_lossy(&cache[i].member),
                db[i].score,
                String::from_utf8_lossy(&db[i].member),
            );
            false
        }
        None => true,
    }
}
