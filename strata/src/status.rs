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
    fmt::Display,
    sync::atomic::{AtomicU8, Ordering},
};

use serde::Serialize;

/// Lifecycle status of the shard pool.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CacheStatus {
    /// No shard pool.
    #[default]
    None = 0,
    /// The shard pool is being built.
    Init = 1,
    /// The shard pool is serving.
    Ok = 2,
    /// The shard pool is being rebuilt.
    Reset = 3,
    /// The shard pool is being torn down.
    Destroy = 4,
    /// Every shard is being flushed.
    Clear = 5,
}

impl CacheStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => CacheStatus::Init,
            2 => CacheStatus::Ok,
            3 => CacheStatus::Reset,
            4 => CacheStatus::Destroy,
            5 => CacheStatus::Clear,
            _ => CacheStatus::None,
        }
    }
}

impl Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CacheStatus::None => "none",
            CacheStatus::Init => "init",
            CacheStatus::Ok => "ok",
            CacheStatus::Reset => "reset",
            CacheStatus::Destroy => "destroy",
            CacheStatus::Clear => "clear",
        };
        write!(f, "{s}")
    }
}

/// Atomic cell holding a [`CacheStatus`].
#[derive(Debug)]
pub struct AtomicCacheStatus(AtomicU8);

impl Default for AtomicCacheStatus {
    fn default() -> Self {
        Self(AtomicU8::new(CacheStatus::None as u8))
    }
}

impl AtomicCacheStatus {
    /// Load the status.
    pub fn load(&self) -> CacheStatus {
        CacheStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Store the status.
    pub fn store(&self, status: CacheStatus) {
        self.0.store(status as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        let status = AtomicCacheStatus::default();
        assert_eq!(status.load(), CacheStatus::None);
        for s in [
            CacheStatus::Init,
            CacheStatus::Ok,
            CacheStatus::Reset,
            CacheStatus::Destroy,
            CacheStatus::Clear,
            CacheStatus::None,
        ] {
            status.store(s);
            assert_eq!(status.load(), s);
        }
        assert_eq!(CacheStatus::Ok.to_string(), "ok");
    }
}
