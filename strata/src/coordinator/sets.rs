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

use strata_common::error::Result;
use strata_memory::{EngineBuilder, SetOps};

use super::{expire_secs, Coordinator};

impl<B> Coordinator<B>
where
    B: EngineBuilder,
{
    /// Add members. Returns the count of new members.
    pub fn sadd(&self, key: &[u8], members: &[Vec<u8>]) -> Result<u64> {
        self.with_shard(key, |engine| engine.sadd(key, members))
    }

    /// Add members to a cached set.
    pub fn sadd_if_key_exist(&self, key: &[u8], members: &[Vec<u8>]) -> Result<u64> {
        self.if_key_exist(key, |engine| engine.sadd(key, members))
    }

    /// Cache the set if the key is not cached, with an expiration if `ttl` is positive.
    pub fn saddnx(&self, key: &[u8], members: &[Vec<u8>], ttl: i64) -> Result<()> {
        self.if_key_absent(key, expire_secs(ttl), |engine| engine.sadd(key, members).map(|_| ()))
    }

    /// Cache the set if the key is not cached, without expiration.
    pub fn saddnx_without_ttl(&self, key: &[u8], members: &[Vec<u8>]) -> Result<()> {
        self.if_key_absent(key, None, |engine| engine.sadd(key, members).map(|_| ()))
    }

    /// Count of members.
    pub fn scard(&self, key: &[u8]) -> Result<u64> {
        self.with_shard(key, |engine| engine.scard(key))
    }

    /// Returns true if `member` belongs to the set.
    pub fn sismember(&self, key: &[u8], member: &[u8]) -> Result<bool> {
        self.with_shard(key, |engine| engine.sismember(key, member))
    }

    /// All members.
    pub fn smembers(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.with_shard(key, |engine| engine.smembers(key))
    }

    /// Remove members. Returns the count of removed members.
    pub fn srem(&self, key: &[u8], members: &[Vec<u8>]) -> Result<u64> {
        self.with_shard(key, |engine| engine.srem(key, members))
    }

    /// Random members. A negative `count` allows repeats.
    pub fn srandmember(&self, key: &[u8], count: i64) -> Result<Vec<Vec<u8>>> {
        self.with_shard(key, |engine| engine.srandmember(key, count))
    }
}

#[cfg(test)]
mod tests {
    use crate::coordinator::tests::coordinator;

    #[test]
    fn test_set_families() {
        let coordinator = coordinator(4);
        let members: Vec<Vec<u8>> = vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()];

        assert!(coordinator.sadd_if_key_exist(b"s", &members).unwrap_err().is_not_found());
        coordinator.saddnx(b"s", &members, 10).unwrap();
        assert!(coordinator.saddnx_without_ttl(b"s", &members).unwrap_err().is_already_exists());
        assert_eq!(coordinator.sadd_if_key_exist(b"s", &[b"d".to_vec()]).unwrap(), 1);
        assert_eq!(coordinator.scard(b"s").unwrap(), 4);
        assert!(coordinator.sismember(b"s", b"d").unwrap());
        assert_eq!(coordinator.srem(b"s", &[b"d".to_vec(), b"x".to_vec()]).unwrap(), 1);
        assert_eq!(coordinator.smembers(b"s").unwrap().len(), 3);
        assert_eq!(coordinator.srandmember(b"s", 2).unwrap().len(), 2);
        assert_eq!(coordinator.srandmember(b"s", -5).unwrap().len(), 5);
        assert_eq!(coordinator.sadd(b"t", &members).unwrap(), 3);
    }
}
