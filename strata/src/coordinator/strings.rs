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
use strata_memory::{EngineBuilder, StringOps};

use super::{expire_secs, Coordinator};

impl<B> Coordinator<B>
where
    B: EngineBuilder,
{
    /// Set the value. A positive `ttl` sets an expiration in seconds.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "strata::coordinator::set"))]
    pub fn set(&self, key: &[u8], value: &[u8], ttl: i64) -> Result<()> {
        self.with_shard(key, |engine| engine.set(key, value, expire_secs(ttl)))
    }

    /// Set the value if the key is not cached, with an expiration if `ttl` is positive.
    pub fn setnx(&self, key: &[u8], value: &[u8], ttl: i64) -> Result<()> {
        self.with_shard(key, |engine| engine.setnx(key, value, expire_secs(ttl)))
    }

    /// Set the value if the key is not cached, without expiration.
    pub fn setnx_without_ttl(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.with_shard(key, |engine| engine.setnx(key, value, None))
    }

    /// Set the value if the key is cached, with an expiration if `ttl` is positive.
    pub fn setxx(&self, key: &[u8], value: &[u8], ttl: i64) -> Result<()> {
        self.with_shard(key, |engine| engine.setxx(key, value, expire_secs(ttl)))
    }

    /// Set the value if the key is cached, without expiration.
    pub fn setxx_without_ttl(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.with_shard(key, |engine| engine.setxx(key, value, None))
    }

    /// Get the value.
    #[cfg_attr(feature = "tracing", fastrace::trace(name = "strata::coordinator::get"))]
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.with_shard(key, |engine| engine.get(key))
    }

    /// Increment a cached integer by one.
    pub fn incrxx(&self, key: &[u8]) -> Result<i64> {
        self.incrbyxx(key, 1)
    }

    /// Decrement a cached integer by one.
    pub fn decrxx(&self, key: &[u8]) -> Result<i64> {
        self.decrbyxx(key, 1)
    }

    /// Increment a cached integer.
    pub fn incrbyxx(&self, key: &[u8], incr: i64) -> Result<i64> {
        self.if_key_exist(key, |engine| engine.incr_by(key, incr))
    }

    /// Decrement a cached integer.
    pub fn decrbyxx(&self, key: &[u8], decr: i64) -> Result<i64> {
        self.if_key_exist(key, |engine| {
            let incr = decr.checked_neg().ok_or_else(strata_common::error::Error::not_integer)?;
            engine.incr_by(key, incr)
        })
    }

    /// Increment a cached float.
    pub fn incrbyfloatxx(&self, key: &[u8], incr: f64) -> Result<f64> {
        self.if_key_exist(key, |engine| engine.incr_by_float(key, incr))
    }

    /// Append to a cached value. Returns the new length.
    pub fn appendxx(&self, key: &[u8], value: &[u8]) -> Result<u64> {
        self.if_key_exist(key, |engine| engine.append(key, value))
    }

    /// Substring between two inclusive offsets.
    pub fn get_range(&self, key: &[u8], start: i64, end: i64) -> Result<Vec<u8>> {
        self.with_shard(key, |engine| engine.get_range(key, start, end))
    }

    /// Overwrite part of a cached value. Returns the new length.
    pub fn set_rangexx(&self, key: &[u8], offset: u64, value: &[u8]) -> Result<u64> {
        self.if_key_exist(key, |engine| engine.set_range(key, offset, value))
    }

    /// Length of the value.
    pub fn strlen(&self, key: &[u8]) -> Result<u64> {
        self.with_shard(key, |engine| engine.strlen(key))
    }

    /// Set or clear a bit. Returns the previous bit.
    pub fn set_bit(&self, key: &[u8], offset: u64, bit: u8) -> Result<u8> {
        self.with_shard(key, |engine| engine.set_bit(key, offset, bit))
    }

    /// Set or clear a bit of a cached value. Returns the previous bit.
    pub fn set_bit_if_key_exist(&self, key: &[u8], offset: u64, bit: u8) -> Result<u8> {
        self.if_key_exist(key, |engine| engine.set_bit(key, offset, bit))
    }

    /// Bit at `offset`.
    pub fn get_bit(&self, key: &[u8], offset: u64) -> Result<u8> {
        self.with_shard(key, |engine| engine.get_bit(key, offset))
    }

    /// Count set bits, optionally within an inclusive byte range.
    pub fn bit_count(&self, key: &[u8], range: Option<(i64, i64)>) -> Result<u64> {
        self.with_shard(key, |engine| engine.bit_count(key, range))
    }

    /// Position of the first bit set to `bit`, optionally within an inclusive byte range.
    pub fn bit_pos(&self, key: &[u8], bit: u8, start: Option<i64>, end: Option<i64>) -> Result<i64> {
        self.with_shard(key, |engine| engine.bit_pos(key, bit, start, end))
    }
}
