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

#[cfg(any(test, feature = "test_utils"))]
pub use crate::test_utils::MockStore;
pub use crate::{
    admin::{CacheInfo, DisplayCacheInfo, InfoTracker},
    cache::{Cache, CacheBuilder},
    coordinator::Coordinator,
    loader::{Loader, LOAD_BATCH_SIZE, LOAD_QUEUE_MAX_SIZE, LOAD_VALUE_ITEM_MAX_SIZE},
    lock::{RecordGuard, RecordLockManager},
    range::{check_cache_range, check_cache_range_by_score, check_cache_rev_range, RangeStatus},
    status::CacheStatus,
    store::Store,
};
pub use strata_common::{
    code::{BeforeOrAfter, DataType, FieldValue, ScoreMember},
    config::{CacheConfig, EvictionPolicy, StartPos},
    error::{Error, ErrorKind, Result},
    ttl::TTL_NONE,
};
pub use strata_memory::{Engine, EngineBuilder, EngineContext, MemoryEngine, MemoryEngineBuilder};
