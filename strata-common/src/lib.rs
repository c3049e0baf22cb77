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

//! Shared components for strata.

/// Assertion helpers.
pub mod assert;
/// Value types shared by the cache and the backing store.
pub mod code;
/// Cache configuration.
pub mod config;
/// Error and result types.
pub mod error;
/// Shard routing.
pub mod hasher;
/// Throttles.
pub mod rate;
/// Process-wide cache statistics.
pub mod stats;
/// TTL convention.
pub mod ttl;
