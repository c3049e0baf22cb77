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

use strata_common::{code::BeforeOrAfter, error::Result};
use strata_memory::{EngineBuilder, ListOps};

use super::{expire_secs, Coordinator};

impl<B> Coordinator<B>
where
    B: EngineBuilder,
{
    /// Element at `index`, negative counting from the tail.
    pub fn lindex(&self, key: &[u8], index: i64) -> Result<Vec<u8>> {
        self.with_shard(key, |engine| engine.lindex(key, index))
    }

    /// Insert `value` before or after the first `pivot`. Returns the new length, or `-1` without a pivot.
    pub fn linsert(&self, key: &[u8], position: BeforeOrAfter, pivot: &[u8], value: &[u8]) -> Result<i64> {
        self.with_shard(key, |engine| engine.linsert(key, position, pivot, value))
    }

    /// Length of the list.
    pub fn llen(&self, key: &[u8]) -> Result<u64> {
        self.with_shard(key, |engine| engine.llen(key))
    }

    /// Pop the head.
    pub fn lpop(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.with_shard(key, |engine| engine.lpop(key))
    }

    /// Push to the head. Returns the new length.
    pub fn lpush(&self, key: &[u8], values: &[Vec<u8>]) -> Result<u64> {
        self.with_shard(key, |engine| engine.lpush(key, values))
    }

    /// Push to the head of a cached list.
    pub fn lpushx(&self, key: &[u8], values: &[Vec<u8>]) -> Result<u64> {
        self.with_shard(key, |engine| engine.lpushx(key, values))
    }

    /// Elements in the inclusive index range.
    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> Result<Vec<Vec<u8>>> {
        self.with_shard(key, |engine| engine.lrange(key, start, stop))
    }

    /// Remove up to `count` occurrences of `value`.
    pub fn lrem(&self, key: &[u8], count: i64, value: &[u8]) -> Result<u64> {
        self.with_shard(key, |engine| engine.lrem(key, count, value))
    }

    /// Overwrite the element at `index`.
    pub fn lset(&self, key: &[u8], index: i64, value: &[u8]) -> Result<()> {
        self.with_shard(key, |engine| engine.lset(key, index, value))
    }

    /// Keep only the inclusive index range.
    pub fn ltrim(&self, key: &[u8], start: i64, stop: i64) -> Result<()> {
        self.with_shard(key, |engine| engine.ltrim(key, start, stop))
    }

    /// Pop the tail.
    pub fn rpop(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.with_shard(key, |engine| engine.rpop(key))
    }

    /// Push to the tail. Returns the new length.
    pub fn rpush(&self, key: &[u8], values: &[Vec<u8>]) -> Result<u64> {
        self.with_shard(key, |engine| engine.rpush(key, values))
    }

    /// Push to the tail of a cached list.
    pub fn rpushx(&self, key: &[u8], values: &[Vec<u8>]) -> Result<u64> {
        self.with_shard(key, |engine| engine.rpushx(key, values))
    }

    /// Cache the list if the key is not cached, with an expiration if `ttl` is positive.
    pub fn rpushnx(&self, key: &[u8], values: &[Vec<u8>], ttl: i64) -> Result<()> {
        self.if_key_absent(key, expire_secs(ttl), |engine| engine.rpush(key, values).map(|_| ()))
    }

    /// Cache the list if the key is not cached, without expiration.
    pub fn rpushnx_without_ttl(&self, key: &[u8], values: &[Vec<u8>]) -> Result<()> {
        self.if_key_absent(key, None, |engine| engine.rpush(key, values).map(|_| ()))
    }
}
