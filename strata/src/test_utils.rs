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

//! In-memory backing store for tests and benchmarks.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use parking_lot::Mutex;
use strata_common::{
    code::{FieldValue, ScoreMember},
    error::{Error, Result},
};
use strata_memory::bound::normalize_range;

use crate::store::Store;

#[derive(Debug, Clone)]
enum MockValue {
    String(Vec<u8>),
    Hash(Vec<FieldValue>),
    List(Vec<Vec<u8>>),
    Set(Vec<Vec<u8>>),
    ZSet(Vec<ScoreMember>),
}

/// A [`Store`] backed by a hash map, with a read counter and an optional read latency.
#[derive(Debug, Default)]
pub struct MockStore {
    data: Mutex<HashMap<Vec<u8>, (MockValue, i64)>>,
    reads: AtomicU64,
    latency: Option<Duration>,
}

fn slice<T: Clone>(items: &[T], start: i64, stop: i64) -> Vec<T> {
    normalize_range(start, stop, items.len())
        .map(|(start, stop)| items[start..=stop].to_vec())
        .unwrap_or_default()
}

impl MockStore {
    /// Sleep for `latency` on every read.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Count of reads served.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Store a string.
    pub fn insert_string(&self, key: &[u8], value: &[u8], ttl: i64) {
        self.insert(key, MockValue::String(value.to_vec()), ttl);
    }

    /// Store a hash.
    pub fn insert_hash(&self, key: &[u8], fvs: Vec<FieldValue>, ttl: i64) {
        self.insert(key, MockValue::Hash(fvs), ttl);
    }

    /// Store a list.
    pub fn insert_list(&self, key: &[u8], values: Vec<Vec<u8>>, ttl: i64) {
        self.insert(key, MockValue::List(values), ttl);
    }

    /// Store a set.
    pub fn insert_set(&self, key: &[u8], members: Vec<Vec<u8>>, ttl: i64) {
        self.insert(key, MockValue::Set(members), ttl);
    }

    /// Store a sorted set.
    pub fn insert_zset(&self, key: &[u8], mut score_members: Vec<ScoreMember>, ttl: i64) {
        score_members.sort_by(|a, b| a.score.total_cmp(&b.score).then_with(|| a.member.cmp(&b.member)));
        self.insert(key, MockValue::ZSet(score_members), ttl);
    }

    /// Remove a key.
    pub fn remove(&self, key: &[u8]) {
        self.data.lock().remove(key);
    }

    fn insert(&self, key: &[u8], value: MockValue, ttl: i64) {
        self.data.lock().insert(key.to_vec(), (value, ttl));
    }

    fn read(&self, key: &[u8]) -> Result<(MockValue, i64)> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        self.data
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found("key not found"))
    }
}

impl Store for MockStore {
    fn get_with_ttl(&self, key: &[u8]) -> Result<(Vec<u8>, i64)> {
        match self.read(key)? {
            (MockValue::String(v), ttl) => Ok((v, ttl)),
            _ => Err(Error::wrong_type()),
        }
    }

    fn hlen(&self, key: &[u8]) -> Result<u64> {
        self.hgetall_with_ttl(key).map(|(fvs, _)| fvs.len() as u64)
    }

    fn hgetall_with_ttl(&self, key: &[u8]) -> Result<(Vec<FieldValue>, i64)> {
        match self.read(key)? {
            (MockValue::Hash(fvs), ttl) => Ok((fvs, ttl)),
            _ => Err(Error::wrong_type()),
        }
    }

    fn llen(&self, key: &[u8]) -> Result<u64> {
        self.lrange_with_ttl(key, 0, -1).map(|(values, _)| values.len() as u64)
    }

    fn lrange_with_ttl(&self, key: &[u8], start: i64, stop: i64) -> Result<(Vec<Vec<u8>>, i64)> {
        match self.read(key)? {
            (MockValue::List(values), ttl) => Ok((slice(&values, start, stop), ttl)),
            _ => Err(Error::wrong_type()),
        }
    }

    fn scard(&self, key: &[u8]) -> Result<u64> {
        self.smembers_with_ttl(key).map(|(members, _)| members.len() as u64)
    }

    fn smembers_with_ttl(&self, key: &[u8]) -> Result<(Vec<Vec<u8>>, i64)> {
        match self.read(key)? {
            (MockValue::Set(members), ttl) => Ok((members, ttl)),
            _ => Err(Error::wrong_type()),
        }
    }

    fn zcard(&self, key: &[u8]) -> Result<u64> {
        self.zrange_with_ttl(key, 0, -1).map(|(sms, _)| sms.len() as u64)
    }

    fn zrange_with_ttl(&self, key: &[u8], start: i64, stop: i64) -> Result<(Vec<ScoreMember>, i64)> {
        match self.read(key)? {
            (MockValue::ZSet(sms), ttl) => Ok((slice(&sms, start, stop), ttl)),
            _ => Err(Error::wrong_type()),
        }
    }
}

#[cfg(test)]
mod tests {
    use strata_common::ttl::TTL_NONE;

    use super::*;

    #[test]
    fn test_mock_store() {
        let store = MockStore::default();
        store.insert_zset(
            b"z",
            vec![ScoreMember::new(2.0, "b"), ScoreMember::new(1.0, "a")],
            TTL_NONE,
        );
        assert_eq!(store.zcard(b"z").unwrap(), 2);
        assert_eq!(store.zrange_with_ttl(b"z", -1, -1).unwrap().0[0].member, b"b");
        assert!(store.get_with_ttl(b"z").unwrap_err().kind() == strata_common::error::ErrorKind::WrongType);
        store.remove(b"z");
        assert!(store.hlen(b"z").unwrap_err().is_not_found());
        assert_eq!(store.reads(), 4);
    }
}
