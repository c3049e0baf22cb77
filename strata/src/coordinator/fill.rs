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

//! Cache fill from backing store reads.
//!
//! Every fill takes the TTL reported by the backing store:
//!
//! - a positive TTL caches the value with that expiration if the key is not cached yet;
//! - [`TTL_NONE`](strata_common::ttl::TTL_NONE) caches the value without expiration if the key is not cached yet;
//! - any other TTL means the value is already expired, and a stale cached entry is removed.
//!
//! A key that is already cached is never overwritten and yields `AlreadyExists`.

use strata_common::{
    code::{FieldValue, ScoreMember},
    error::Result,
    ttl::Ttl,
};
use strata_memory::EngineBuilder;

use super::Coordinator;

impl<B> Coordinator<B>
where
    B: EngineBuilder,
{
    fn drop_stale(&self, key: &[u8]) -> Result<()> {
        match self.del(key) {
            Err(e) if e.is_not_found() => Ok(()),
            res => res,
        }
    }

    /// Fill a string value.
    pub fn write_kv_to_cache(&self, key: &[u8], value: &[u8], ttl: i64) -> Result<()> {
        match Ttl::from_raw(ttl) {
            Ttl::Expire(secs) => self.setnx(key, value, secs as i64),
            Ttl::Persist => self.setnx_without_ttl(key, value),
            Ttl::Expired => self.drop_stale(key),
        }
    }

    /// Fill a hash.
    pub fn write_hash_to_cache(&self, key: &[u8], fvs: &[FieldValue], ttl: i64) -> Result<()> {
        match Ttl::from_raw(ttl) {
            Ttl::Expire(secs) => self.hmsetnx(key, fvs, secs as i64),
            Ttl::Persist => self.hmsetnx_without_ttl(key, fvs),
            Ttl::Expired => self.drop_stale(key),
        }
    }

    /// Fill a list.
    pub fn write_list_to_cache(&self, key: &[u8], values: &[Vec<u8>], ttl: i64) -> Result<()> {
        match Ttl::from_raw(ttl) {
            Ttl::Expire(secs) => self.rpushnx(key, values, secs as i64),
            Ttl::Persist => self.rpushnx_without_ttl(key, values),
            Ttl::Expired => self.drop_stale(key),
        }
    }

    /// Fill a set.
    pub fn write_set_to_cache(&self, key: &[u8], members: &[Vec<u8>], ttl: i64) -> Result<()> {
        match Ttl::from_raw(ttl) {
            Ttl::Expire(secs) => self.saddnx(key, members, secs as i64),
            Ttl::Persist => self.saddnx_without_ttl(key, members),
            Ttl::Expired => self.drop_stale(key),
        }
    }

    /// Fill a sorted set. Only the configured window is kept.
    pub fn write_zset_to_cache(&self, key: &[u8], score_members: &[ScoreMember], ttl: i64) -> Result<()> {
        match Ttl::from_raw(ttl) {
            Ttl::Expire(secs) => self.zaddnx(key, score_members, secs as i64),
            Ttl::Persist => self.zaddnx_without_ttl(key, score_members),
            Ttl::Expired => self.drop_stale(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use strata_common::{
        code::{FieldValue, ScoreMember},
        ttl::TTL_NONE,
    };

    use crate::coordinator::tests::coordinator;

    #[test]
    fn test_kv_fill() {
        let coordinator = coordinator(4);

        coordinator.write_kv_to_cache(b"k", b"v1", TTL_NONE).unwrap();
        assert_eq!(coordinator.get(b"k").unwrap(), b"v1");
        assert_eq!(coordinator.ttl(b"k").unwrap(), TTL_NONE);

        // The first fill wins.
        assert!(coordinator
            .write_kv_to_cache(b"k", b"v2", 100)
            .unwrap_err()
            .is_already_exists());
        assert_eq!(coordinator.get(b"k").unwrap(), b"v1");

        coordinator.write_kv_to_cache(b"k", b"v3", 0).unwrap();
        assert!(!coordinator.exists(b"k"));
        coordinator.write_kv_to_cache(b"absent", b"v", -2).unwrap();

        coordinator.write_kv_to_cache(b"t", b"v", 100).unwrap();
        let ttl = coordinator.ttl(b"t").unwrap();
        assert!(ttl > 0 && ttl <= 100);
    }

    #[test]
    fn test_fill_with_huge_ttl() {
        let coordinator = coordinator(4);

        coordinator.write_kv_to_cache(b"k", b"v", i64::MAX).unwrap();
        assert_eq!(coordinator.get(b"k").unwrap(), b"v");
        assert!(coordinator.ttl(b"k").unwrap() > 0);

        let fvs = vec![FieldValue::new("f", "v")];
        coordinator.write_hash_to_cache(b"h", &fvs, i64::MAX).unwrap();
        assert!(coordinator.ttl(b"h").unwrap() > 0);

        // The shard is still usable afterwards.
        coordinator.process_cron_task();
        assert!(coordinator.expire(b"k", i64::MAX).is_ok());
        assert_eq!(coordinator.db_size(), 2);
    }

    #[test]
    fn test_collection_fill() {
        let coordinator = coordinator(4);

        let fvs = vec![FieldValue::new("f", "v")];
        coordinator.write_hash_to_cache(b"h", &fvs, 3600).unwrap();
        assert_eq!(coordinator.hgetall(b"h").unwrap(), fvs);

        let values = vec![b"a".to_vec(), b"b".to_vec()];
        coordinator.write_list_to_cache(b"l", &values, TTL_NONE).unwrap();
        assert_eq!(coordinator.lrange(b"l", 0, -1).unwrap(), values);

        coordinator.write_set_to_cache(b"s", &values, TTL_NONE).unwrap();
        assert_eq!(coordinator.scard(b"s").unwrap(), 2);

        let sms = vec![ScoreMember::new(1.0, "a")];
        coordinator.write_zset_to_cache(b"z", &sms, 10).unwrap();
        assert_eq!(coordinator.zrange(b"z", 0, -1).unwrap(), sms);

        for key in [&b"h"[..], b"l", b"s", b"z"] {
            assert!(coordinator.exists(key));
        }
        coordinator.write_hash_to_cache(b"h", &fvs, -5).unwrap();
        coordinator.write_list_to_cache(b"l", &values, 0).unwrap();
        coordinator.write_set_to_cache(b"s", &values, -3).unwrap();
        coordinator.write_zset_to_cache(b"z", &sms, 0).unwrap();
        for key in [&b"h"[..], b"l", b"s", b"z"] {
            assert!(!coordinator.exists(key));
        }
    }
}
