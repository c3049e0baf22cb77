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

use strata_common::{code::FieldValue, error::Result};
use strata_memory::{EngineBuilder, HashOps};

use super::{expire_secs, Coordinator};

impl<B> Coordinator<B>
where
    B: EngineBuilder,
{
    /// Remove fields. Returns the count of removed fields.
    pub fn hdel(&self, key: &[u8], fields: &[Vec<u8>]) -> Result<u64> {
        self.with_shard(key, |engine| engine.hdel(key, fields))
    }

    /// Set a field. Returns true if the field is new.
    pub fn hset(&self, key: &[u8], field: &[u8], value: &[u8]) -> Result<bool> {
        self.with_shard(key, |engine| engine.hset(key, field, value))
    }

    /// Set a field of a cached hash.
    pub fn hset_if_key_exist(&self, key: &[u8], field: &[u8], value: &[u8]) -> Result<bool> {
        self.if_key_exist(key, |engine| engine.hset(key, field, value))
    }

    /// Set a field of a cached hash only if the field is absent.
    pub fn hset_if_key_exist_and_field_not_exist(&self, key: &[u8], field: &[u8], value: &[u8]) -> Result<bool> {
        self.if_key_exist(key, |engine| engine.hsetnx(key, field, value))
    }

    /// Set multiple fields.
    pub fn hmset(&self, key: &[u8], fvs: &[FieldValue]) -> Result<()> {
        self.with_shard(key, |engine| engine.hmset(key, fvs))
    }

    /// Cache the hash if the key is not cached, with an expiration if `ttl` is positive.
    pub fn hmsetnx(&self, key: &[u8], fvs: &[FieldValue], ttl: i64) -> Result<()> {
        self.if_key_absent(key, expire_secs(ttl), |engine| engine.hmset(key, fvs))
    }

    /// Cache the hash if the key is not cached, without expiration.
    pub fn hmsetnx_without_ttl(&self, key: &[u8], fvs: &[FieldValue]) -> Result<()> {
        self.if_key_absent(key, None, |engine| engine.hmset(key, fvs))
    }

    /// Set multiple fields of a cached hash.
    pub fn hmsetxx(&self, key: &[u8], fvs: &[FieldValue]) -> Result<()> {
        self.if_key_exist(key, |engine| engine.hmset(key, fvs))
    }

    /// Get a field.
    pub fn hget(&self, key: &[u8], field: &[u8]) -> Result<Vec<u8>> {
        self.with_shard(key, |engine| engine.hget(key, field))
    }

    /// Get multiple fields.
    pub fn hmget(&self, key: &[u8], fields: &[Vec<u8>]) -> Result<Vec<Option<Vec<u8>>>> {
        self.with_shard(key, |engine| engine.hmget(key, fields))
    }

    /// All fields and values.
    pub fn hgetall(&self, key: &[u8]) -> Result<Vec<FieldValue>> {
        self.with_shard(key, |engine| engine.hgetall(key))
    }

    /// All fields.
    pub fn hkeys(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.with_shard(key, |engine| engine.hkeys(key))
    }

    /// All values.
    pub fn hvals(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.with_shard(key, |engine| engine.hvals(key))
    }

    /// Returns true if the field exists.
    pub fn hexists(&self, key: &[u8], field: &[u8]) -> Result<bool> {
        self.with_shard(key, |engine| engine.hexists(key, field))
    }

    /// Increment an integer field of a cached hash.
    pub fn hincrbyxx(&self, key: &[u8], field: &[u8], incr: i64) -> Result<i64> {
        self.if_key_exist(key, |engine| engine.hincrby(key, field, incr))
    }

    /// Increment a float field of a cached hash.
    pub fn hincrbyfloatxx(&self, key: &[u8], field: &[u8], incr: f64) -> Result<f64> {
        self.if_key_exist(key, |engine| engine.hincrbyfloat(key, field, incr))
    }

    /// Count of fields.
    pub fn hlen(&self, key: &[u8]) -> Result<u64> {
        self.with_shard(key, |engine| engine.hlen(key))
    }

    /// Length of the value of a field.
    pub fn hstrlen(&self, key: &[u8], field: &[u8]) -> Result<u64> {
        self.with_shard(key, |engine| engine.hstrlen(key, field))
    }
}

#[cfg(test)]
mod tests {
    use strata_common::{code::FieldValue, ttl::TTL_NONE};

    use crate::coordinator::tests::coordinator;

    fn fvs(n: usize) -> Vec<FieldValue> {
        (0..n).map(|i| FieldValue::new(format!("f{i}"), format!("v{i}"))).collect()
    }

    #[test]
    fn test_hash_families() {
        let coordinator = coordinator(4);
        assert!(coordinator.hset_if_key_exist(b"h", b"f", b"v").unwrap_err().is_not_found());
        assert!(coordinator.hmsetxx(b"h", &fvs(1)).unwrap_err().is_not_found());
        assert!(coordinator.hincrbyxx(b"h", b"n", 1).unwrap_err().is_not_found());

        coordinator.hmsetnx(b"h", &fvs(3), 100).unwrap();
        assert!(coordinator.hmsetnx(b"h", &fvs(5), 100).unwrap_err().is_already_exists());
        assert_eq!(coordinator.hlen(b"h").unwrap(), 3);
        assert!(coordinator.ttl(b"h").unwrap() > 0);

        assert!(!coordinator.hset_if_key_exist_and_field_not_exist(b"h", b"f0", b"x").unwrap());
        assert!(coordinator.hset_if_key_exist_and_field_not_exist(b"h", b"new", b"x").unwrap());
        assert_eq!(coordinator.hget(b"h", b"f0").unwrap(), b"v0");
        assert_eq!(coordinator.hincrbyxx(b"h", b"n", 2).unwrap(), 2);
        assert_eq!(coordinator.hincrbyfloatxx(b"h", b"n", 0.5).unwrap(), 2.5);
        assert!(coordinator.hexists(b"h", b"n").unwrap());
        assert_eq!(coordinator.hdel(b"h", &[b"n".to_vec()]).unwrap(), 1);
        assert_eq!(coordinator.hkeys(b"h").unwrap().len(), 4);
        assert_eq!(coordinator.hvals(b"h").unwrap().len(), 4);
        assert_eq!(coordinator.hstrlen(b"h", b"f1").unwrap(), 2);
        assert_eq!(coordinator.hmget(b"h", &[b"f2".to_vec(), b"zz".to_vec()]).unwrap()[1], None);

        coordinator.hmsetnx_without_ttl(b"p", &fvs(2)).unwrap();
        assert_eq!(coordinator.ttl(b"p").unwrap(), TTL_NONE);
        assert_eq!(coordinator.hgetall(b"p").unwrap().len(), 2);
    }
}
