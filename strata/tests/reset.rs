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
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use rand::Rng as _;
use strata::{CacheConfig, CacheStatus, Coordinator, ErrorKind};

#[test_log::test]
fn test_reset_under_load() {
    let coordinator = Arc::new(Coordinator::default());
    coordinator.init(8, Some(&CacheConfig::default())).unwrap();
    let stop = Arc::new(AtomicBool::new(false));

    let handles = (0..4)
        .map(|_| {
            let coordinator = coordinator.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                let mut rng = rand::rng();
                let mut ops = 0u64;
                while !stop.load(Ordering::Relaxed) {
                    let key = format!("key{}", rng.random_range(0..1000));
                    coordinator.set(key.as_bytes(), b"v", -1).unwrap();
                    match coordinator.get(key.as_bytes()) {
                        Ok(v) => assert_eq!(v, b"v"),
                        // The pool may have been rebuilt in between.
                        Err(e) => assert_eq!(e.kind(), ErrorKind::NotFound),
                    }
                    assert!(coordinator.shard_index(key.as_bytes()).is_ok());
                    ops += 1;
                }
                ops
            })
        })
        .collect::<Vec<_>>();

    for cache_num in [4, 16, 1, 48, 8] {
        coordinator.reset(cache_num, None).unwrap();
        assert_eq!(coordinator.status(), CacheStatus::Ok);
        thread::sleep(std::time::Duration::from_millis(10));
    }

    stop.store(true, Ordering::Relaxed);
    for handle in handles {
        assert!(handle.join().unwrap() > 0);
    }
    assert_eq!(coordinator.cache_num(), 8);
}
