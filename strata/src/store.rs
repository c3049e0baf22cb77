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
    code::{FieldValue, ScoreMember},
    error::Result,
};

/// Read side of the authoritative backing store the cache is filled from.
///
/// TTLs follow the sentinel convention: a positive value is the remaining seconds to live, [`TTL_NONE`] means no
/// expiration, and any other value means the key is already expired. An absent key yields `NotFound`.
///
/// [`TTL_NONE`]: strata_common::ttl::TTL_NONE
pub trait Store: Send + Sync + 'static {
    /// String value and TTL.
    fn get_with_ttl(&self, key: &[u8]) -> Result<(Vec<u8>, i64)>;

    /// Count of hash fields.
    fn hlen(&self, key: &[u8]) -> Result<u64>;

    /// Every hash field and TTL.
    fn hgetall_with_ttl(&self, key: &[u8]) -> Result<(Vec<FieldValue>, i64)>;

    /// Length of a list.
    fn llen(&self, key: &[u8]) -> Result<u64>;

    /// List elements in the inclusive index range and TTL.
    fn lrange_with_ttl(&self, key: &[u8], start: i64, stop: i64) -> Result<(Vec<Vec<u8>>, i64)>;

    /// Count of set members.
    fn scard(&self, key: &[u8]) -> Result<u64>;

    /// Every set member and TTL.
    fn smembers_with_ttl(&self, key: &[u8]) -> Result<(Vec<Vec<u8>>, i64)>;

    /// Count of sorted set members.
    fn zcard(&self, key: &[u8]) -> Result<u64>;

    /// Sorted set members in the inclusive rank range and TTL.
    fn zrange_with_ttl(&self, key: &[u8], start: i64, stop: i64) -> Result<(Vec<ScoreMember>, i64)>;
}
