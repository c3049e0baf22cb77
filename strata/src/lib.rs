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

//! strata - a sharded side cache for multi-type key-value stores.
//!
//! The cache holds strings, hashes, lists, sets and sorted sets in front of an authoritative backing store. Keys
//! are routed to independently locked shards by CRC-32. Reads that miss can be handed to a background load
//! pipeline that fills the cache from the backing store under a per-key record lock. Sorted sets are cached as a
//! bounded window of their lowest or highest scores.
//!
//! ```
//! use strata::{CacheConfig, Coordinator, TTL_NONE};
//!
//! let coordinator = Coordinator::default();
//! coordinator.init(4, Some(&CacheConfig::default())).unwrap();
//! coordinator.write_kv_to_cache(b"key", b"value", TTL_NONE).unwrap();
//! assert_eq!(coordinator.get(b"key").unwrap(), b"value");
//! ```

/// Observability.
pub mod admin;
/// The cache facade and its builder.
pub mod cache;
/// The cache coordinator.
pub mod coordinator;
/// The load pipeline.
pub mod loader;
/// Per-key record locks.
pub mod lock;
/// Sorted set window checks.
pub mod range;
/// Lifecycle status.
pub mod status;
/// The backing store interface.
pub mod store;
/// Test utilities.
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

mod prelude;
pub use prelude::*;
