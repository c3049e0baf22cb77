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

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use strata::{Error, FieldValue, Result, ScoreMember, Store};

/// Backing store holding strings and hashes.
#[derive(Debug, Default)]
pub struct HashStore {
    strings: Mutex<HashMap<Vec<u8>, (Vec<u8>, i64)>>,
    hashes: Mutex<HashMap<Vec<u8>, (Vec<FieldValue>, i64)>>,
    reads: AtomicU64,
}

impl HashStore {
    pub fn put_string(&self, key: &[u8], value: &[u8], ttl: i64) {
        self.strings.lock().insert(key.to_vec(), (value.to_vec(), ttl));
    }

    pub fn put_hash(&self, key: &[u8], fvs: Vec<FieldValue>, ttl: i64) {
        self.hashes.lock().insert(key.to_vec(), (fvs, ttl));
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    fn hash(&self, key: &[u8]) -> Result<(Vec<FieldValue>, i64)> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.hashes
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found("key not found"))
    }
}

impl Store for HashStore {
    fn get_with_ttl(&self, key: &[u8]) -> Result<(Vec<u8>, i64)> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.strings
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found("key not found"))
    }

    fn hlen(&self, key: &[u8]) -> Result<u64> {
        self.hash(key).map(|(fvs, _)| fvs.len() as u64)
    }

    fn hgetall_with_ttl(&self, key: &[u8]) -> Result<(Vec<FieldValue>, i64)> {
        self.hash(key)
    }

    fn llen(&self, _: &[u8]) -> Result<u64> {
        Err(Error::not_found("key not found"))
    }

    fn lrange_with_ttl(&self, _: &[u8], _: i64, _: i64) -> Result<(Vec<Vec<u8>>, i64)> {
        Err(Error::not_found("key not found"))
    }

    fn scard(&self, _: &[u8]) -> Result<u64> {
        Err(Error::not_found("key not found"))
    }

    fn smembers_with_ttl(&self, _: &[u8]) -> Result<(Vec<Vec<u8>>, i64)> {
        Err(Error::not_found("key not found"))
    }

    fn zcard(&self, _: &[u8]) -> Result<u64> {
        Err(Error::not_found("key not found"))
    }

    fn zrange_with_ttl(&self, _: &[u8], _: i64, _: i64) -> Result<(Vec<ScoreMember>, i64)> {
        Err(Error::not_found("key not found"))
    }
}

pub fn wait_until(mut f: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !f() {
        assert!(Instant::now() < deadline, "timed out");
        std::thread::sleep(Duration::from_millis(5));
    }
}
