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

mod common;

use std::sync::Arc;

use common::{wait_until, HashStore};
use strata::{CacheBuilder, DataType, FieldValue, RecordLockManager, LOAD_QUEUE_MAX_SIZE};

#[test_log::test]
fn test_load_hash_end_to_end() {
    let store = Arc::new(HashStore::default());
    let fvs = (0..5)
        .map(|i| FieldValue::new(format!("field{i}"), format!("value{i}")))
        .collect::<Vec<_>>();
    store.put_hash(b"user:1", fvs.clone(), 3600);

    let cache = CacheBuilder::new().with_shards(8).build(store).unwrap();
    assert!(cache.hgetall(b"user:1").unwrap_err().is_not_found());
    assert!(cache.push_key_to_async_load_queue(DataType::Hash.tag(), b"user:1").unwrap());
    wait_until(|| cache.info().async_load_keys_num == 1);

    let mut cached = cache.hgetall(b"user:1").unwrap();
    cached.sort_by(|a, b| a.field.cmp(&b.field));
    assert_eq!(cached, fvs);
    let ttl = cache.ttl(b"user:1").unwrap();
    assert!(ttl > 0 && ttl <= 3600, "ttl: {ttl}");
}

#[test_log::test]
fn test_push_dedup() {
    let store = Arc::new(HashStore::default());
    store.put_string(b"k", b"v", -1);
    let locks = Arc::new(RecordLockManager::default());
    let cache = CacheBuilder::new()
        .with_shards(2)
        .with_record_locks(locks.clone())
        .build(store.clone())
        .unwrap();

    {
        // Hold the record lock so the worker cannot finish the key.
        let _guard = locks.lock(b"k");
        assert!(cache.push_key_to_async_load_queue('k', b"k").unwrap());
        assert!(!cache.push_key_to_async_load_queue('k', b"k").unwrap());
        assert!(!cache.push_key_to_async_load_queue('h', b"k").unwrap());
    }

    wait_until(|| cache.info().async_load_keys_num == 1);
    wait_until(|| cache.info().waiting_load_keys_num == 0);
    assert_eq!(store.reads(), 1);
    assert_eq!(cache.get(b"k").unwrap(), b"v");

    // Back to the pre-push state, the key can be queued again.
    wait_until(|| cache.push_key_to_async_load_queue('k', b"k").unwrap());
}

#[test_log::test]
fn test_push_over_capacity() {
    let store = Arc::new(HashStore::default());
    let locks = Arc::new(RecordLockManager::default());
    let cache = CacheBuilder::new()
        .with_shards(2)
        .with_record_locks(locks.clone())
        .build(store)
        .unwrap();

    let guard = locks.lock(b"key0");
    assert!(cache.push_key_to_async_load_queue('k', b"key0").unwrap());
    for i in 1..LOAD_QUEUE_MAX_SIZE {
        assert!(cache
            .push_key_to_async_load_queue('k', format!("key{i}").as_bytes())
            .unwrap());
    }
    assert!(!cache.push_key_to_async_load_queue('k', b"overflow").unwrap());
    assert!(!cache.push_key_to_async_load_queue('k', b"overflow2").unwrap());
    drop(guard);

    // Every queued key is absent from the store, the queue drains without loads.
    wait_until(|| cache.info().waiting_load_keys_num == 0);
    assert_eq!(cache.info().async_load_keys_num, 0);
}
