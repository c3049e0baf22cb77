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

use strata_common::{
    code::ScoreMember,
    config::{CacheConfig, StartPos},
    error::{Error, Result},
};
use strata_memory::{bound::ScoreBound, EngineBuilder, ZSetOps};

use super::{expire_secs, Coordinator};
use crate::range::{check_cache_range, check_cache_range_by_score, check_cache_rev_range, RangeStatus};

/// Trim the cached sorted set to the configured window.
fn trim_window<E: ZSetOps>(engine: &mut E, key: &[u8], config: &CacheConfig) -> Result<()> {
    let items = config.zset_cache_items_per_key as i64;
    let removed = match config.zset_cache_start_pos {
        StartPos::FromBegin => engine.zremrangebyrank(key, items, -1),
        StartPos::FromEnd => engine.zremrangebyrank(key, 0, -(items + 1)),
    };
    match removed {
        Ok(0) => Ok(()),
        Ok(removed) => {
            tracing::debug!("[cache]: trimmed {removed} members out of the sorted set window");
            Ok(())
        }
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Lowest and highest cached scores.
fn score_span<E: ZSetOps>(engine: &mut E, key: &[u8]) -> Result<(f64, f64)> {
    let first = engine.zrange(key, 0, 0)?;
    let last = engine.zrange(key, -1, -1)?;
    match (first.first(), last.first()) {
        (Some(first), Some(last)) => Ok((first.score, last.score)),
        _ => Err(Error::not_found("key not found")),
    }
}

fn range_miss() -> Error {
    Error::not_found("range not cached")
}

impl<B> Coordinator<B>
where
    B: EngineBuilder,
{
    /// Add or update members, then trim the window. Returns the count of new members.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "strata::coordinator::zadd"))]
    pub fn zadd(&self, key: &[u8], score_members: &[ScoreMember]) -> Result<u64> {
        let config = self.config.load_full();
        self.with_shard(key, |engine| {
            let added = engine.zadd(key, score_members)?;
            trim_window(engine, key, &config)?;
            Ok(added)
        })
    }

    /// Add or update members of a cached sorted set.
    pub fn zadd_if_key_exist(&self, key: &[u8], score_members: &[ScoreMember]) -> Result<u64> {
        let config = self.config.load_full();
        self.if_key_exist(key, |engine| {
            let added = engine.zadd(key, score_members)?;
            trim_window(engine, key, &config)?;
            Ok(added)
        })
    }

    /// Cache the sorted set if the key is not cached, with an expiration if `ttl` is positive.
    pub fn zaddnx(&self, key: &[u8], score_members: &[ScoreMember], ttl: i64) -> Result<()> {
        let config = self.config.load_full();
        self.if_key_absent(key, expire_secs(ttl), |engine| {
            engine.zadd(key, score_members)?;
            trim_window(engine, key, &config)
        })
    }

    /// Cache the sorted set if the key is not cached, without expiration.
    pub fn zaddnx_without_ttl(&self, key: &[u8], score_members: &[ScoreMember]) -> Result<()> {
        let config = self.config.load_full();
        self.if_key_absent(key, None, |engine| {
            engine.zadd(key, score_members)?;
            trim_window(engine, key, &config)
        })
    }

    /// Count of cached members.
    pub fn zcard(&self, key: &[u8]) -> Result<u64> {
        self.with_shard(key, |engine| engine.zcard(key))
    }

    /// Count of cached members, `0` if the key is not cached.
    pub fn cache_zcard(&self, key: &[u8]) -> Result<u64> {
        match self.zcard(key) {
            Err(e) if e.is_not_found() => Ok(0),
            res => res,
        }
    }

    /// Count of members within the score bounds.
    pub fn zcount(&self, key: &[u8], min: &[u8], max: &[u8]) -> Result<u64> {
        self.with_shard(key, |engine| engine.zcount(key, min, max))
    }

    /// Increment the score of a member, then trim the window. Returns the new score.
    pub fn zincrby(&self, key: &[u8], member: &[u8], increment: f64) -> Result<f64> {
        let config = self.config.load_full();
        self.with_shard(key, |engine| {
            let score = engine.zincrby(key, member, increment)?;
            trim_window(engine, key, &config)?;
            Ok(score)
        })
    }

    /// Increment the score of a member of a cached sorted set.
    pub fn zincrby_if_key_exist(&self, key: &[u8], member: &[u8], increment: f64) -> Result<f64> {
        let config = self.config.load_full();
        self.if_key_exist(key, |engine| {
            let score = engine.zincrby(key, member, increment)?;
            trim_window(engine, key, &config)?;
            Ok(score)
        })
    }

    /// Members in the inclusive rank range of the cached window.
    pub fn zrange(&self, key: &[u8], start: i64, stop: i64) -> Result<Vec<ScoreMember>> {
        self.with_shard(key, |engine| engine.zrange(key, start, stop))
    }

    /// Members within the score bounds.
    pub fn zrangebyscore(&self, key: &[u8], min: &[u8], max: &[u8]) -> Result<Vec<ScoreMember>> {
        self.with_shard(key, |engine| engine.zrangebyscore(key, min, max))
    }

    /// Rank of a member, lowest score first.
    pub fn zrank(&self, key: &[u8], member: &[u8]) -> Result<u64> {
        self.with_shard(key, |engine| engine.zrank(key, member))
    }

    /// Remove members. Returns the count of removed members.
    pub fn zrem(&self, key: &[u8], members: &[Vec<u8>]) -> Result<u64> {
        self.with_shard(key, |engine| engine.zrem(key, members))
    }

    /// Remove members in the inclusive rank range.
    pub fn zremrangebyrank(&self, key: &[u8], start: i64, stop: i64) -> Result<u64> {
        self.with_shard(key, |engine| engine.zremrangebyrank(key, start, stop))
    }

    /// Remove members within the score bounds.
    pub fn zremrangebyscore(&self, key: &[u8], min: &[u8], max: &[u8]) -> Result<u64> {
        self.with_shard(key, |engine| engine.zremrangebyscore(key, min, max))
    }

    /// Members in the inclusive rank range, highest score first.
    pub fn zrevrange(&self, key: &[u8], start: i64, stop: i64) -> Result<Vec<ScoreMember>> {
        self.with_shard(key, |engine| engine.zrevrange(key, start, stop))
    }

    /// Members within the score bounds, highest score first.
    pub fn zrevrangebyscore(&self, key: &[u8], min: &[u8], max: &[u8]) -> Result<Vec<ScoreMember>> {
        self.with_shard(key, |engine| engine.zrevrangebyscore(key, min, max))
    }

    /// Members within the lex bounds, in reverse order.
    pub fn zrevrangebylex(&self, key: &[u8], min: &[u8], max: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.with_shard(key, |engine| engine.zrevrangebylex(key, min, max))
    }

    /// Rank of a member, highest score first.
    pub fn zrevrank(&self, key: &[u8], member: &[u8]) -> Result<u64> {
        self.with_shard(key, |engine| engine.zrevrank(key, member))
    }

    /// Score of a member.
    pub fn zscore(&self, key: &[u8], member: &[u8]) -> Result<f64> {
        self.with_shard(key, |engine| engine.zscore(key, member))
    }

    /// Members within the lex bounds.
    pub fn zrangebylex(&self, key: &[u8], min: &[u8], max: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.with_shard(key, |engine| engine.zrangebylex(key, min, max))
    }

    /// Count of members within the lex bounds.
    pub fn zlexcount(&self, key: &[u8], min: &[u8], max: &[u8]) -> Result<u64> {
        self.with_shard(key, |engine| engine.zlexcount(key, min, max))
    }

    /// Remove members within the lex bounds.
    pub fn zremrangebylex(&self, key: &[u8], min: &[u8], max: &[u8]) -> Result<u64> {
        self.with_shard(key, |engine| engine.zremrangebylex(key, min, max))
    }

    /// Serve a rank range of the full sorted set of `db_len` members from the cached window.
    ///
    /// Returns `NotFound` if the key is not cached or the range reaches beyond the window, and an empty result if
    /// the range selects nothing.
    pub fn zrange_windowed(&self, key: &[u8], start: i64, stop: i64, db_len: u64) -> Result<Vec<ScoreMember>> {
        let start_pos = self.config.load().zset_cache_start_pos;
        self.with_shard(key, |engine| {
            let cache_len = engine.zcard(key)?;
            match check_cache_range(cache_len, db_len, start, stop, start_pos) {
                RangeStatus::Hit { start, stop } => engine.zrange(key, start, stop),
                RangeStatus::Miss => Err(range_miss()),
                RangeStatus::Error => Ok(vec![]),
            }
        })
    }

    /// Serve a reverse rank range of the full sorted set of `db_len` members from the cached window.
    pub fn zrevrange_windowed(&self, key: &[u8], start: i64, stop: i64, db_len: u64) -> Result<Vec<ScoreMember>> {
        let start_pos = self.config.load().zset_cache_start_pos;
        self.with_shard(key, |engine| {
            let cache_len = engine.zcard(key)?;
            match check_cache_rev_range(cache_len, db_len, start, stop, start_pos) {
                RangeStatus::Hit { start, stop } => engine.zrevrange(key, start, stop),
                RangeStatus::Miss => Err(range_miss()),
                RangeStatus::Error => Ok(vec![]),
            }
        })
    }

    /// Serve a score range of the full sorted set of `db_len` members from the cached window.
    ///
    /// Returns `NotFound` if the key is not cached or the bounds reach beyond the window, and an empty result if
    /// the bounds select nothing.
    pub fn zrangebyscore_windowed(
        &self,
        key: &[u8],
        min: &[u8],
        max: &[u8],
        db_len: u64,
    ) -> Result<Vec<ScoreMember>> {
        let bounds = (ScoreBound::parse(min)?, ScoreBound::parse(max)?);
        let start_pos = self.config.load().zset_cache_start_pos;
        self.with_shard(key, |engine| {
            match check_score_window(engine, key, &bounds, db_len, start_pos)? {
                RangeStatus::Hit { .. } => engine.zrangebyscore(key, min, max),
                RangeStatus::Miss => Err(range_miss()),
                RangeStatus::Error => Ok(vec![]),
            }
        })
    }

    /// Serve a reverse score range of the full sorted set of `db_len` members from the cached window.
    pub fn zrevrangebyscore_windowed(
        &self,
        key: &[u8],
        min: &[u8],
        max: &[u8],
        db_len: u64,
    ) -> Result<Vec<ScoreMember>> {
        let bounds = (ScoreBound::parse(min)?, ScoreBound::parse(max)?);
        let start_pos = self.config.load().zset_cache_start_pos;
        self.with_shard(key, |engine| {
            match check_score_window(engine, key, &bounds, db_len, start_pos)? {
                RangeStatus::Hit { .. } => engine.zrevrangebyscore(key, min, max),
                RangeStatus::Miss => Err(range_miss()),
                RangeStatus::Error => Ok(vec![]),
            }
        })
    }
}

fn check_score_window<E: ZSetOps>(
    engine: &mut E,
    key: &[u8],
    (min, max): &(ScoreBound, ScoreBound),
    db_len: u64,
    start_pos: StartPos,
) -> Result<RangeStatus> {
    let cache_len = engine.zcard(key)?;
    let (cache_min, cache_max) = score_span(engine, key)?;
    Ok(check_cache_range_by_score(
        cache_len, db_len, cache_min, cache_max, min, max, start_pos,
    ))
}

#[cfg(test)]
mod tests {
    use strata_common::{
        code::ScoreMember,
        config::{CacheConfig, StartPos},
    };

    use crate::coordinator::tests::{coordinator, coordinator_with};

    fn score_members(n: usize) -> Vec<ScoreMember> {
        (0..n).map(|i| ScoreMember::new(i as f64, format!("m{i}"))).collect()
    }

    fn window(items: u32, start_pos: StartPos) -> CacheConfig {
        CacheConfig {
            zset_cache_items_per_key: items,
            zset_cache_start_pos: start_pos,
            ..Default::default()
        }
    }

    #[test]
    fn test_zset_families() {
        let coordinator = coordinator(4);
        assert!(coordinator
            .zadd_if_key_exist(b"z", &score_members(1))
            .unwrap_err()
            .is_not_found());
        assert_eq!(coordinator.cache_zcard(b"z").unwrap(), 0);

        coordinator.zaddnx(b"z", &score_members(5), 30).unwrap();
        assert!(coordinator
            .zaddnx_without_ttl(b"z", &score_members(5))
            .unwrap_err()
            .is_already_exists());
        assert!(coordinator.ttl(b"z").unwrap() > 0);
        assert_eq!(coordinator.zcard(b"z").unwrap(), 5);
        assert_eq!(coordinator.zcount(b"z", b"(1", b"3").unwrap(), 2);
        assert_eq!(coordinator.zincrby_if_key_exist(b"z", b"m0", 10.0).unwrap(), 10.0);
        assert_eq!(coordinator.zrevrank(b"z", b"m0").unwrap(), 0);
        assert_eq!(coordinator.zrank(b"z", b"m1").unwrap(), 0);
        assert_eq!(coordinator.zscore(b"z", b"m4").unwrap(), 4.0);
        assert_eq!(coordinator.zrem(b"z", &[b"m4".to_vec()]).unwrap(), 1);
        assert_eq!(coordinator.zremrangebyscore(b"z", b"-inf", b"1").unwrap(), 1);
        assert_eq!(coordinator.zremrangebyrank(b"z", -1, -1).unwrap(), 1);
        assert_eq!(coordinator.zrange(b"z", 0, -1).unwrap(), vec![
            ScoreMember::new(2.0, "m2"),
            ScoreMember::new(3.0, "m3")
        ]);
        assert_eq!(coordinator.zrangebylex(b"z", b"-", b"+").unwrap().len(), 2);
        assert_eq!(coordinator.zlexcount(b"z", b"[m3", b"+").unwrap(), 1);
        assert_eq!(coordinator.zrevrangebylex(b"z", b"-", b"+").unwrap()[0], b"m3");
        assert_eq!(coordinator.zremrangebylex(b"z", b"-", b"+").unwrap(), 2);
        assert!(!coordinator.exists(b"z"));
    }

    #[test]
    fn test_window_trim_from_begin() {
        let coordinator = coordinator_with(2, window(3, StartPos::FromBegin));
        assert_eq!(coordinator.zadd(b"z", &score_members(5)).unwrap(), 5);
        assert_eq!(coordinator.zcard(b"z").unwrap(), 3);
        assert_eq!(coordinator.zrange(b"z", -1, -1).unwrap()[0].member, b"m2");

        coordinator.zadd(b"z", &[ScoreMember::new(-1.0, "low")]).unwrap();
        assert_eq!(coordinator.zrange(b"z", 0, 0).unwrap()[0].member, b"low");
        assert_eq!(coordinator.zcard(b"z").unwrap(), 3);
    }

    #[test]
    fn test_window_trim_from_end() {
        let coordinator = coordinator_with(2, window(3, StartPos::FromEnd));
        coordinator.zaddnx_without_ttl(b"z", &score_members(5)).unwrap();
        let members = coordinator
            .zrange(b"z", 0, -1)
            .unwrap()
            .into_iter()
            .map(|sm| sm.member)
            .collect::<Vec<_>>();
        assert_eq!(members, vec![b"m2".to_vec(), b"m3".to_vec(), b"m4".to_vec()]);

        coordinator.zincrby(b"z", b"new", 100.0).unwrap();
        assert_eq!(coordinator.zcard(b"z").unwrap(), 3);
        assert!(coordinator.zscore(b"z", b"m2").unwrap_err().is_not_found());
    }

    #[test]
    fn test_windowed_reads() {
        let coordinator = coordinator_with(2, window(3, StartPos::FromBegin));
        assert!(coordinator.zrange_windowed(b"z", 0, 1, 10).unwrap_err().is_not_found());

        // Backing store holds m0..m9, the cache holds m0..m2.
        coordinator.zadd(b"z", &score_members(10)).unwrap();
        assert_eq!(coordinator.zrange_windowed(b"z", 0, 2, 10).unwrap().len(), 3);
        assert!(coordinator.zrange_windowed(b"z", 0, 3, 10).unwrap_err().is_not_found());
        assert!(coordinator.zrange_windowed(b"z", 20, 30, 10).unwrap().is_empty());
        assert_eq!(
            coordinator.zrevrange_windowed(b"z", -1, -1, 10).unwrap(),
            vec![ScoreMember::new(0.0, "m0")]
        );
        assert!(coordinator.zrevrange_windowed(b"z", 0, 0, 10).unwrap_err().is_not_found());

        assert_eq!(coordinator.zrangebyscore_windowed(b"z", b"0", b"(2", 10).unwrap().len(), 2);
        assert!(coordinator
            .zrangebyscore_windowed(b"z", b"0", b"2", 10)
            .unwrap_err()
            .is_not_found());
        assert!(coordinator
            .zrangebyscore_windowed(b"z", b"-10", b"(0", 10)
            .unwrap()
            .is_empty());
        assert_eq!(
            coordinator.zrevrangebyscore_windowed(b"z", b"-inf", b"1", 10).unwrap()[0].member,
            b"m1"
        );
        assert!(coordinator
            .zrangebyscore_windowed(b"z", b"nan-ish", b"1", 10)
            .is_err());
    }

    #[test]
    fn test_windowed_score_reads_on_shrunk_window() {
        let coordinator = coordinator_with(2, window(4, StartPos::FromBegin));
        coordinator.zadd(b"z", &score_members(10)).unwrap();
        // Removed from the backing store and the cache alike, nine members remain behind three cached.
        coordinator.zrem(b"z", &[b"m3".to_vec()]).unwrap();
        assert_eq!(coordinator.cache_zcard(b"z").unwrap(), 3);

        assert!(coordinator
            .zrangebyscore_windowed(b"z", b"-inf", b"+inf", 9)
            .unwrap_err()
            .is_not_found());
        assert!(coordinator
            .zrevrangebyscore_windowed(b"z", b"-inf", b"+inf", 9)
            .unwrap_err()
            .is_not_found());
        assert_eq!(coordinator.zrangebyscore_windowed(b"z", b"-inf", b"(2", 9).unwrap().len(), 2);

        // The same three members are the whole set once the backing store holds no more.
        assert_eq!(
            coordinator.zrangebyscore_windowed(b"z", b"-inf", b"+inf", 3).unwrap(),
            score_members(3)
        );
    }
}
