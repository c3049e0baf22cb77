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

//! Per-key record locks shared by the backing store write path and the load pipeline.

use std::collections::HashSet;

use parking_lot::{Condvar, Mutex};
use strata_common::hasher::shard_index;

/// Default count of lock shards.
pub const DEFAULT_RECORD_LOCK_SHARDS: usize = 64;

#[derive(Debug, Default)]
struct LockShard {
    locked: Mutex<HashSet<Vec<u8>>>,
    cond: Condvar,
}

/// Scoped mutual exclusion keyed by raw key bytes.
///
/// Holding the lock of a key across "read the backing store, then fill the cache" keeps a load from landing after
/// a fresher write of the same key.
#[derive(Debug)]
pub struct RecordLockManager {
    shards: Vec<LockShard>,
}

impl Default for RecordLockManager {
    fn default() -> Self {
        Self::new(DEFAULT_RECORD_LOCK_SHARDS)
    }
}

impl RecordLockManager {
    /// Create a lock manager with `shards` lock shards.
    pub fn new(shards: usize) -> Self {
        Self {
            shards: (0..shards.max(1)).map(|_| LockShard::default()).collect(),
        }
    }

    fn shard(&self, key: &[u8]) -> &LockShard {
        &self.shards[shard_index(key, self.shards.len())]
    }

    /// Lock `key`, blocking while another guard holds it.
    pub fn lock(&self, key: &[u8]) -> RecordGuard<'_> {
        let shard = self.shard(key);
        let mut locked = shard.locked.lock();
        while locked.contains(key) {
            shard.cond.wait(&mut locked);
        }
        locked.insert(key.to_vec());
        RecordGuard {
            shard,
            key: key.to_vec(),
        }
    }

    /// Lock `key` if no other guard holds it.
    pub fn try_lock(&self, key: &[u8]) -> Option<RecordGuard<'_>> {
        let shard = self.shard(key);
        let mut locked = shard.locked.lock();
        if locked.contains(key) {
            return None;
        }
        locked.insert(key.to_vec());
        Some(RecordGuard {
            shard,
            key: key.to_vec(),
        })
    }

    /// Returns true if a guard holds `key`.
    pub fn is_locked(&self, key: &[u8]) -> bool {
        self.shard(key).locked.lock().contains(key)
    }
}

/// Holds the record lock of a key until dropped.
#[must_use]
#[derive(Debug)]
pub struct RecordGuard<'a> {
    shard: &'a LockShard,
    key: Vec<u8>,
}

impl RecordGuard<'_> {
    /// The locked key.
    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

impl Drop for RecordGuard<'_> {
    fn drop(&mut self) {
        self.shard.locked.lock().remove(&self.key);
        self.shard.cond.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        thread,
        time::Duration,
    };

    use super::*;

    #[test]
    fn test_lock_unlock() {
        let locks = RecordLockManager::new(4);
        let guard = locks.lock(b"k");
        assert_eq!(guard.key(), b"k");
        assert!(locks.is_locked(b"k"));
        assert!(locks.try_lock(b"k").is_none());
        assert!(locks.try_lock(b"other").is_some());
        drop(guard);
        assert!(!locks.is_locked(b"k"));
        assert!(locks.try_lock(b"k").is_some());
    }

    #[test]
    fn test_mutual_exclusion() {
        let locks = Arc::new(RecordLockManager::new(1));
        let inside = Arc::new(AtomicUsize::new(0));
        let handles = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let inside = inside.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        let _guard = locks.lock(b"hot");
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        thread::sleep(Duration::from_micros(10));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(!locks.is_locked(b"hot"));
    }
}
