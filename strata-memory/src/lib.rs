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

//! Shard engines for strata.
//!
//! A shard engine is a single-threaded in-memory key-value store speaking the string, hash, list, set and sorted
//! set commands. The shard pool of `strata` holds one engine per shard behind its own mutex.

/// Range arguments.
pub mod bound;
/// The engine capability traits.
pub mod engine;
/// The default in-memory engine.
pub mod memory;
/// Cached values.
pub mod object;
/// Sorted set.
pub mod zset;

mod prelude;
pub use prelude::*;
