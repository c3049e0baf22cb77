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

//! The capability interface of a shard engine.
//!
//! The shard pool only depends on the traits in this module, so any in-memory engine can back a shard. The
//! commands follow Redis semantics. A missing key is reported as [`ErrorKind::NotFound`], which the coordinator
//! treats as a cache miss.
//!
//! [`ErrorKind::NotFound`]: strata_common::error::ErrorKind::NotFound

use std::sync::Arc;

use arc_swap::ArcSwap;
use strata_common::{
    code::{BeforeOrAfter, DataType, FieldValue, ScoreMember},
    config::CacheConfig,
    error::Result,
    stats::Stats,
};

/// Shared state handed to every engine of a shard pool.
#[derive(Debug, Clone)]
pub struct EngineContext {
    /// Index of the shard the engine serves.
    pub shard: usize,
    /// Engine config, shared by all shards and hot reloadable.
    pub config: Arc<ArcSwap<CacheConfig>>,
    /// Pool-wide statistics.
    pub stats: Arc<Stats>,
}

/// Opens shard engines.
pub trait EngineBuilder: Send + Sync + 'static {
    /// The engine type.
    type Engine: Engine;

    /// Open an engine for the shard described by `ctx`.
    fn open(&self, ctx: EngineContext) -> Result<Self::Engine>;
}

/// Generic key commands and engine maintenance.
pub trait KeyOps {
    /// Returns true if the key is cached and not expired. Does not count as a hit or miss.
    fn exists(&mut self, key: &[u8]) -> bool;
    /// Remove the key.
    fn del(&mut self, key: &[u8]) -> Result<()>;
    /// Set a relative expiration in seconds. A non-positive ttl removes the key.
    fn expire(&mut self, key: &[u8], ttl: i64) -> Result<()>;
    /// Set an absolute expiration as a unix timestamp in seconds. A timestamp in the past removes the key.
    fn expireat(&mut self, key: &[u8], timestamp: i64) -> Result<()>;
    /// Remaining seconds to live, or `TTL_NONE` if the key has no expiration.
    fn ttl(&mut self, key: &[u8]) -> Result<i64>;
    /// Remove the expiration of the key.
    fn persist(&mut self, key: &[u8]) -> Result<()>;
    /// Type of the value held by the key.
    fn type_of(&mut self, key: &[u8]) -> Result<DataType>;
    /// A random key.
    fn random_key(&mut self) -> Result<Vec<u8>>;
    /// Count of keys, including expired keys that are not swept yet.
    fn db_size(&self) -> u64;
    /// Remove all keys.
    fn flush_db(&mut self);
    /// Proactively remove expired keys. Returns the count of removed keys.
    fn active_expire_cycle(&mut self) -> usize;
    /// Bytes accounted by this engine.
    fn used_memory(&self) -> u64;
}

/// String commands.
pub trait StringOps {
    /// Set the value, with an optional expiration in seconds.
    fn set(&mut self, key: &[u8], value: &[u8], ttl: Option<u64>) -> Result<()>;
    /// Set the value only if the key is absent. Returns `AlreadyExists` otherwise.
    fn setnx(&mut self, key: &[u8], value: &[u8], ttl: Option<u64>) -> Result<()>;
    /// Set the value only if the key is present. Returns `NotFound` otherwise.
    fn setxx(&mut self, key: &[u8], value: &[u8], ttl: Option<u64>) -> Result<()>;
    /// Get the value.
    fn get(&mut self, key: &[u8]) -> Result<Vec<u8>>;
    /// Increment the integer value.
    fn incr_by(&mut self, key: &[u8], incr: i64) -> Result<i64>;
    /// Increment the float value.
    fn incr_by_float(&mut self, key: &[u8], incr: f64) -> Result<f64>;
    /// Append to the value. Returns the new length.
    fn append(&mut self, key: &[u8], value: &[u8]) -> Result<u64>;
    /// Substring between two inclusive offsets, negative offsets count from the end.
    fn get_range(&mut self, key: &[u8], start: i64, end: i64) -> Result<Vec<u8>>;
    /// Overwrite part of the value at `offset`. Returns the new length.
    fn set_range(&mut self, key: &[u8], offset: u64, value: &[u8]) -> Result<u64>;
    /// Length of the value.
    fn strlen(&mut self, key: &[u8]) -> Result<u64>;
    /// Set or clear the bit at `offset`. Returns the previous bit.
    fn set_bit(&mut self, key: &[u8], offset: u64, bit: u8) -> Result<u8>;
    /// Bit at `offset`.
    fn get_bit(&mut self, key: &[u8], offset: u64) -> Result<u8>;
    /// Count set bits, optionally within an inclusive byte range.
    fn bit_count(&mut self, key: &[u8], range: Option<(i64, i64)>) -> Result<u64>;
    /// Position of the first bit set to `bit`, optionally within an inclusive byte range.
    fn bit_pos(&mut self, key: &[u8], bit: u8, start: Option<i64>, end: Option<i64>) -> Result<i64>;
}

/// Hash commands.
pub trait HashOps {
    /// Remove fields. Returns the count of removed fields.
    fn hdel(&mut self, key: &[u8], fields: &[Vec<u8>]) -> Result<u64>;
    /// Set a field. Returns true if the field is new.
    fn hset(&mut self, key: &[u8], field: &[u8], value: &[u8]) -> Result<bool>;
    /// Set a field only if it is absent. Returns true if the field has been set.
    fn hsetnx(&mut self, key: &[u8], field: &[u8], value: &[u8]) -> Result<bool>;
    /// Set multiple fields.
    fn hmset(&mut self, key: &[u8], fvs: &[FieldValue]) -> Result<()>;
    /// Get a field.
    fn hget(&mut self, key: &[u8], field: &[u8]) -> Result<Vec<u8>>;
    /// Get multiple fields, absent fields are `None`.
    fn hmget(&mut self, key: &[u8], fields: &[Vec<u8>]) -> Result<Vec<Option<Vec<u8>>>>;
    /// All fields and values.
    fn hgetall(&mut self, key: &[u8]) -> Result<Vec<FieldValue>>;
    /// All fields.
    fn hkeys(&mut self, key: &[u8]) -> Result<Vec<Vec<u8>>>;
    /// All values.
    fn hvals(&mut self, key: &[u8]) -> Result<Vec<Vec<u8>>>;
    /// Returns true if the field exists.
    fn hexists(&mut self, key: &[u8], field: &[u8]) -> Result<bool>;
    /// Increment the integer value of a field.
    fn hincrby(&mut self, key: &[u8], field: &[u8], incr: i64) -> Result<i64>;
    /// Increment the float value of a field.
    fn hincrbyfloat(&mut self, key: &[u8], field: &[u8], incr: f64) -> Result<f64>;
    /// Count of fields.
    fn hlen(&mut self, key: &[u8]) -> Result<u64>;
    /// Length of the value of a field, `0` if the field is absent.
    fn hstrlen(&mut self, key: &[u8], field: &[u8]) -> Result<u64>;
}

/// List commands.
pub trait ListOps {
    /// Element at `index`.
    fn lindex(&mut self, key: &[u8], index: i64) -> Result<Vec<u8>>;
    /// Insert `value` next to `pivot`. Returns the new length, or `-1` if the pivot is absent.
    fn linsert(&mut self, key: &[u8], position: BeforeOrAfter, pivot: &[u8], value: &[u8]) -> Result<i64>;
    /// Length of the list.
    fn llen(&mut self, key: &[u8]) -> Result<u64>;
    /// Pop the head.
    fn lpop(&mut self, key: &[u8]) -> Result<Vec<u8>>;
    /// Push to the head. Returns the new length.
    fn lpush(&mut self, key: &[u8], values: &[Vec<u8>]) -> Result<u64>;
    /// Push to the head only if the list exists.
    fn lpushx(&mut self, key: &[u8], values: &[Vec<u8>]) -> Result<u64>;
    /// Elements between two inclusive indexes.
    fn lrange(&mut self, key: &[u8], start: i64, stop: i64) -> Result<Vec<Vec<u8>>>;
    /// Remove `count` occurrences of `value`, from the tail if `count` is negative, all if zero.
    fn lrem(&mut self, key: &[u8], count: i64, value: &[u8]) -> Result<u64>;
    /// Overwrite the element at `index`.
    fn lset(&mut self, key: &[u8], index: i64, value: &[u8]) -> Result<()>;
    /// Keep only the elements between two inclusive indexes.
    fn ltrim(&mut self, key: &[u8], start: i64, stop: i64) -> Result<()>;
    /// Pop the tail.
    fn rpop(&mut self, key: &[u8]) -> Result<Vec<u8>>;
    /// Push to the tail. Returns the new length.
    fn rpush(&mut self, key: &[u8], values: &[Vec<u8>]) -> Result<u64>;
    /// Push to the tail only if the list exists.
    fn rpushx(&mut self, key: &[u8], values: &[Vec<u8>]) -> Result<u64>;
}

/// Set commands.
pub trait SetOps {
    /// Add members. Returns the count of new members.
    fn sadd(&mut self, key: &[u8], members: &[Vec<u8>]) -> Result<u64>;
    /// Count of members.
    fn scard(&mut self, key: &[u8]) -> Result<u64>;
    /// Returns true if `member` is in the set.
    fn sismember(&mut self, key: &[u8], member: &[u8]) -> Result<bool>;
    /// All members.
    fn smembers(&mut self, key: &[u8]) -> Result<Vec<Vec<u8>>>;
    /// Remove members. Returns the count of removed members.
    fn srem(&mut self, key: &[u8], members: &[Vec<u8>]) -> Result<u64>;
    /// Random members, distinct if `count` is positive, possibly repeated if negative.
    fn srandmember(&mut self, key: &[u8], count: i64) -> Result<Vec<Vec<u8>>>;
}

/// Sorted set commands.
///
/// Score bounds are raw Redis arguments such as `1.5`, `(1.5`, `-inf` and `+inf`. Lex bounds are `[a`, `(a`, `-`
/// and `+`.
pub trait ZSetOps {
    /// Add or update members. Returns the count of new members.
    fn zadd(&mut self, key: &[u8], score_members: &[ScoreMember]) -> Result<u64>;
    /// Count of members.
    fn zcard(&mut self, key: &[u8]) -> Result<u64>;
    /// Count of members with a score within the bounds.
    fn zcount(&mut self, key: &[u8], min: &[u8], max: &[u8]) -> Result<u64>;
    /// Increment the score of a member. Returns the new score.
    fn zincrby(&mut self, key: &[u8], member: &[u8], increment: f64) -> Result<f64>;
    /// Members between two inclusive ranks, ascending.
    fn zrange(&mut self, key: &[u8], start: i64, stop: i64) -> Result<Vec<ScoreMember>>;
    /// Members within the score bounds, ascending.
    fn zrangebyscore(&mut self, key: &[u8], min: &[u8], max: &[u8]) -> Result<Vec<ScoreMember>>;
    /// Ascending rank of a member.
    fn zrank(&mut self, key: &[u8], member: &[u8]) -> Result<u64>;
    /// Remove members. Returns the count of removed members.
    fn zrem(&mut self, key: &[u8], members: &[Vec<u8>]) -> Result<u64>;
    /// Remove members between two inclusive ranks.
    fn zremrangebyrank(&mut self, key: &[u8], start: i64, stop: i64) -> Result<u64>;
    /// Remove members within the score bounds.
    fn zremrangebyscore(&mut self, key: &[u8], min: &[u8], max: &[u8]) -> Result<u64>;
    /// Members between two inclusive ranks, descending.
    fn zrevrange(&mut self, key: &[u8], start: i64, stop: i64) -> Result<Vec<ScoreMember>>;
    /// Members within the score bounds, descending.
    fn zrevrangebyscore(&mut self, key: &[u8], min: &[u8], max: &[u8]) -> Result<Vec<ScoreMember>>;
    /// Members within the lex bounds, descending.
    fn zrevrangebylex(&mut self, key: &[u8], min: &[u8], max: &[u8]) -> Result<Vec<Vec<u8>>>;
    /// Descending rank of a member.
    fn zrevrank(&mut self, key: &[u8], member: &[u8]) -> Result<u64>;
    /// Score of a member.
    fn zscore(&mut self, key: &[u8], member: &[u8]) -> Result<f64>;
    /// Members within the lex bounds, ascending.
    fn zrangebylex(&mut self, key: &[u8], min: &[u8], max: &[u8]) -> Result<Vec<Vec<u8>>>;
    /// Count of members within the lex bounds.
    fn zlexcount(&mut self, key: &[u8], min: &[u8], max: &[u8]) -> Result<u64>;
    /// Remove members within the lex bounds.
    fn zremrangebylex(&mut self, key: &[u8], min: &[u8], max: &[u8]) -> Result<u64>;
}

/// A shard engine: the full per-type command surface plus lifecycle.
pub trait Engine: KeyOps + StringOps + HashOps + ListOps + SetOps + ZSetOps + Send + 'static {
    /// Release the resources held by the engine. Called once before the engine is dropped.
    fn close(&mut self) {}
}
