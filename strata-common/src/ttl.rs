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

//! Time-to-live convention shared by the cache and the backing store.
//!
//! TTLs travel as signed seconds. [`TTL_NONE`] means the key persists without expiration, any other non-positive
//! value means the key has already expired.

use std::time::{SystemTime, UNIX_EPOCH};

/// The TTL sentinel for keys without expiration.
pub const TTL_NONE: i64 = -1;

/// Classified TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Persist without expiration.
    Persist,
    /// Expire after the given seconds.
    Expire(u64),
    /// Already expired.
    Expired,
}

impl Ttl {
    /// Classify a raw TTL.
    pub fn from_raw(ttl: i64) -> Self {
        match ttl {
            TTL_NONE => Ttl::Persist,
            ttl if ttl > 0 => Ttl::Expire(ttl as u64),
            _ => Ttl::Expired,
        }
    }

    /// Raw TTL of a key with the given remaining lifetime, rounded up to whole seconds.
    pub fn raw_remaining_secs(remaining_ms: Option<u64>) -> i64 {
        match remaining_ms {
            None => TTL_NONE,
            Some(ms) => ms.div_ceil(1000) as i64,
        }
    }
}

impl From<i64> for Ttl {
    fn from(ttl: i64) -> Self {
        Self::from_raw(ttl)
    }
}

/// Milliseconds since the unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Unix timestamp in milliseconds at which a key expiring after `secs` expires.
///
/// Saturates at `u64::MAX`, which never expires in practice.
pub fn deadline_ms(secs: u64) -> u64 {
    now_ms().saturating_add(secs.saturating_mul(1000))
}
