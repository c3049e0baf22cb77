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

use itertools::Itertools;
use strata_common::{
    code::ScoreMember,
    error::{Error, Result},
};

use super::MemoryEngine;
use crate::{
    bound::{normalize_range, LexBound, ScoreBound},
    engine::ZSetOps,
    object::Object,
    zset::ZSet,
};

fn empty() -> Object {
    Object::ZSet(ZSet::default())
}

fn to_score_members<'a>(iter: impl Iterator<Item = (f64, &'a [u8])>) -> Vec<ScoreMember> {
    iter.map(|(s, m)| ScoreMember::new(s, m)).collect()
}

fn score_bounds(min: &[u8], max: &[u8]) -> Result<(ScoreBound, ScoreBound)> {
    Ok((ScoreBound::parse(min)?, ScoreBound::parse(max)?))
}

fn lex_bounds(min: &[u8], max: &[u8]) -> Result<(LexBound, LexBound)> {
    Ok((LexBound::parse(min)?, LexBound::parse(max)?))
}

impl ZSetOps for MemoryEngine {
    fn zadd(&mut self, key: &[u8], score_members: &[ScoreMember]) -> Result<u64> {
        if score_members.iter().any(|sm| sm.score.is_nan()) {
            return Err(Error::not_float());
        }
        self.upsert(key, empty, |obj| {
            let zset = obj.as_zset_mut()?;
            Ok(score_members
                .iter()
                .filter(|sm| zset.insert(&sm.member, sm.score))
                .count() as u64)
        })
    }

    fn zcard(&mut self, key: &[u8]) -> Result<u64> {
        self.read(key, |obj| Ok(obj.as_zset()?.len() as u64))
    }

    fn zcount(&mut self, key: &[u8], min: &[u8], max: &[u8]) -> Result<u64> {
        let (min, max) = score_bounds(min, max)?;
        self.read(key, |obj| Ok(obj.as_zset()?.range_by_score(&min, &max).count() as u64))
    }

    fn zincrby(&mut self, key: &[u8], member: &[u8], increment: f64) -> Result<f64> {
        if increment.is_nan() {
            return Err(Error::not_float());
        }
        self.upsert(key, empty, |obj| {
            let zset = obj.as_zset_mut()?;
            let score = zset.score(member).unwrap_or(0.0) + increment;
            if score.is_nan() {
                return Err(Error::invalid_argument("resulting score is not a number (NaN)"));
            }
            zset.insert(member, score);
            Ok(score)
        })
    }

    fn zrange(&mut self, key: &[u8], start: i64, stop: i64) -> Result<Vec<ScoreMember>> {
        self.read(key, |obj| {
            let zset = obj.as_zset()?;
            Ok(normalize_range(start, stop, zset.len())
                .map(|(start, stop)| zset.range_by_rank(start, stop))
                .unwrap_or_default())
        })
    }

    fn zrangebyscore(&mut self, key: &[u8], min: &[u8], max: &[u8]) -> Result<Vec<ScoreMember>> {
        let (min, max) = score_bounds(min, max)?;
        self.read(key, |obj| Ok(to_score_members(obj.as_zset()?.range_by_score(&min, &max))))
    }

    fn zrank(&mut self, key: &[u8], member: &[u8]) -> Result<u64> {
        self.read(key, |obj| {
            obj.as_zset()?
                .rank(member)
                .map(|r| r as u64)
                .ok_or_else(|| Error::not_found("member not found"))
        })
    }

    fn zrem(&mut self, key: &[u8], members: &[Vec<u8>]) -> Result<u64> {
        self.update(key, |obj| {
            Ok(obj.as_zset_mut()?.remove_all(members.iter().map(|m| m.as_slice())))
        })
    }

    fn zremrangebyrank(&mut self, key: &[u8], start: i64, stop: i64) -> Result<u64> {
        self.update(key, |obj| {
            let zset = obj.as_zset_mut()?;
            let Some((start, stop)) = normalize_range(start, stop, zset.len()) else {
                return Ok(0);
            };
            let doomed = zset
                .iter()
                .skip(start)
                .take(stop + 1 - start)
                .map(|(_, m)| m.to_vec())
                .collect_vec();
            Ok(zset.remove_all(doomed.iter().map(|m| m.as_slice())))
        })
    }

    fn zremrangebyscore(&mut self, key: &[u8], min: &[u8], max: &[u8]) -> Result<u64> {
        let (min, max) = score_bounds(min, max)?;
        self.update(key, |obj| {
            let zset = obj.as_zset_mut()?;
            let doomed = zset
                .range_by_score(&min, &max)
                .map(|(_, m)| m.to_vec())
                .collect_vec();
            Ok(zset.remove_all(doomed.iter().map(|m| m.as_slice())))
        })
    }

    fn zrevrange(&mut self, key: &[u8], start: i64, stop: i64) -> Result<Vec<ScoreMember>> {
        self.read(key, |obj| {
            let zset = obj.as_zset()?;
            Ok(normalize_range(start, stop, zset.len())
                .map(|(start, stop)| {
                    to_score_members(zset.iter().rev().skip(start).take(stop + 1 - start))
                })
                .unwrap_or_default())
        })
    }

    fn zrevrangebyscore(&mut self, key: &[u8], min: &[u8], max: &[u8]) -> Result<Vec<ScoreMember>> {
        let (min, max) = score_bounds(min, max)?;
        self.read(key, |obj| {
            Ok(to_score_members(obj.as_zset()?.range_by_score(&min, &max).rev()))
        })
    }

    fn zrevrangebylex(&mut self, key: &[u8], min: &[u8], max: &[u8]) -> Result<Vec<Vec<u8>>> {
        let (min, max) = lex_bounds(min, max)?;
        self.read(key, |obj| {
            Ok(obj
                .as_zset()?
                .range_by_lex(&min, &max)
                .rev()
                .map(|(_, m)| m.to_vec())
                .collect())
        })
    }

    fn zrevrank(&mut self, key: &[u8], member: &[u8]) -> Result<u64> {
        self.read(key, |obj| {
            let zset = obj.as_zset()?;
            zset.rank(member)
                .map(|r| (zset.len() - 1 - r) as u64)
                .ok_or_else(|| Error::not_found("member not found"))
        })
    }

    fn zscore(&mut self, key: &[u8], member: &[u8]) -> Result<f64> {
        self.read(key, |obj| {
            obj.as_zset()?
                .score(member)
                .ok_or_else(|| Error::not_found("member not found"))
        })
    }

    fn zrangebylex(&mut self, key: &[u8], min: &[u8], max: &[u8]) -> Result<Vec<Vec<u8>>> {
        let (min, max) = lex_bounds(min, max)?;
        self.read(key, |obj| {
            Ok(obj
                .as_zset()?
                .range_by_lex(&min, &max)
                .map(|(_, m)| m.to_vec())
                .collect())
        })
    }

    fn zlexcount(&mut self, key: &[u8], min: &[u8], max: &[u8]) -> Result<u64> {
        let (min, max) = lex_bounds(min, max)?;
        self.read(key, |obj| Ok(obj.as_zset()?.range_by_lex(&min, &max).count() as u64))
    }

    fn zremrangebylex(&mut self, key: &[u8], min: &[u8], max: &[u8]) -> Result<u64> {
        let (min, max) = lex_bounds(min, max)?;
        self.update(key, |obj| {
            let zset = obj.as_zset_mut()?;
            let doomed = zset
                .range_by_lex(&min, &max)
                .map(|(_, m)| m.to_vec())
                .collect_vec();
            Ok(zset.remove_all(doomed.iter().map(|m| m.as_slice())))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{engine::KeyOps, memory::tests::engine};

    fn seed(e: &mut MemoryEngine) {
        let sms = [(1.0, "a"), (2.0, "b"), (3.0, "c"), (4.0, "d"), (5.0, "e")]
            .into_iter()
            .map(|(s, m)| ScoreMember::new(s, m))
            .collect_vec();
        assert_eq!(e.zadd(b"z", &sms).unwrap(), 5);
    }

    fn members(sms: Vec<ScoreMember>) -> Vec<Vec<u8>> {
        sms.into_iter().map(|sm| sm.member).collect()
    }

    #[test]
    fn test_zset_reads() {
        let mut e = engine();
        seed(&mut e);
        assert_eq!(e.zcard(b"z").unwrap(), 5);
        assert_eq!(members(e.zrange(b"z", 0, 1).unwrap()), vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(members(e.zrevrange(b"z", 0, 1).unwrap()), vec![b"e".to_vec(), b"d".to_vec()]);
        assert_eq!(e.zcount(b"z", b"(1", b"3").unwrap(), 2);
        assert_eq!(
            members(e.zrevrangebyscore(b"z", b"-inf", b"(3").unwrap()),
            vec![b"b".to_vec(), b"a".to_vec()]
        );
        assert_eq!(e.zrank(b"z", b"c").unwrap(), 2);
        assert_eq!(e.zrevrank(b"z", b"c").unwrap(), 2);
        assert_eq!(e.zrevrank(b"z", b"e").unwrap(), 0);
        assert_eq!(e.zscore(b"z", b"d").unwrap(), 4.0);
        assert!(e.zscore(b"z", b"x").unwrap_err().is_not_found());
        assert!(e.zcount(b"z", b"abc", b"1").is_err());
    }

    #[test]
    fn test_zset_lex() {
        let mut e = engine();
        let sms = ["a", "b", "c", "d"].map(|m| ScoreMember::new(0.0, m));
        e.zadd(b"z", &sms).unwrap();
        assert_eq!(e.zrangebylex(b"z", b"[b", b"(d").unwrap(), vec![b"b".to_vec(), b"c".to_vec()]);
        assert_eq!(e.zrevrangebylex(b"z", b"-", b"+").unwrap().first().unwrap(), b"d");
        assert_eq!(e.zlexcount(b"z", b"(a", b"+").unwrap(), 3);
        assert_eq!(e.zremrangebylex(b"z", b"-", b"[b").unwrap(), 2);
        assert_eq!(e.zcard(b"z").unwrap(), 2);
    }

    #[test]
    fn test_zset_writes() {
        let mut e = engine();
        seed(&mut e);
        assert_eq!(e.zincrby(b"z", b"a", 10.0).unwrap(), 11.0);
        assert_eq!(e.zrevrank(b"z", b"a").unwrap(), 0);
        assert_eq!(e.zremrangebyrank(b"z", 0, 1).unwrap(), 2);
        assert_eq!(members(e.zrange(b"z", 0, -1).unwrap()), vec![b"d".to_vec(), b"e".to_vec(), b"a".to_vec()]);
        assert_eq!(e.zremrangebyscore(b"z", b"4", b"5").unwrap(), 2);
        assert_eq!(e.zrem(b"z", &[b"a".to_vec()]).unwrap(), 1);
        assert!(!e.exists(b"z"));
        assert!(e.zadd(b"z", &[ScoreMember::new(f64::NAN, "x")]).is_err());
    }
}
