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

use indexmap::IndexSet;
use rand::Rng as _;
use strata_common::error::Result;

use super::MemoryEngine;
use crate::{engine::SetOps, object::Object};

impl SetOps for MemoryEngine {
    fn sadd(&mut self, key: &[u8], members: &[Vec<u8>]) -> Result<u64> {
        self.upsert(
            key,
            || Object::Set(IndexSet::new()),
            |obj| {
                let set = obj.as_set_mut()?;
                Ok(members.iter().filter(|m| set.insert((*m).clone())).count() as u64)
            },
        )
    }

    fn scard(&mut self, key: &[u8]) -> Result<u64> {
        self.read(key, |obj| Ok(obj.as_set()?.len() as u64))
    }

    fn sismember(&mut self, key: &[u8], member: &[u8]) -> Result<bool> {
        self.read(key, |obj| Ok(obj.as_set()?.contains(member)))
    }

    fn smembers(&mut self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.read(key, |obj| Ok(obj.as_set()?.iter().cloned().collect()))
    }

    fn srem(&mut self, key: &[u8], members: &[Vec<u8>]) -> Result<u64> {
        self.update(key, |obj| {
            let set = obj.as_set_mut()?;
            Ok(members.iter().filter(|m| set.swap_remove(m.as_slice())).count() as u64)
        })
    }

    fn srandmember(&mut self, key: &[u8], count: i64) -> Result<Vec<Vec<u8>>> {
        self.read(key, |obj| {
            let set = obj.as_set()?;
            let mut rng = rand::rng();
            let members = if count >= 0 {
                let amount = (count as usize).min(set.len());
                rand::seq::index::sample(&mut rng, set.len(), amount)
                    .into_iter()
                    .filter_map(|i| set.get_index(i).cloned())
                    .collect()
            } else {
                (0..count.unsigned_abs())
                    .filter_map(|_| set.get_index(rng.random_range(0..set.len())).cloned())
                    .collect()
            };
            Ok(members)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{engine::KeyOps, memory::tests::engine};

    fn members(items: &[&str]) -> Vec<Vec<u8>> {
        items.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn test_set_basic() {
        let mut e = engine();
        assert_eq!(e.sadd(b"s", &members(&["a", "b", "a"])).unwrap(), 2);
        assert_eq!(e.sadd(b"s", &members(&["b", "c"])).unwrap(), 1);
        assert_eq!(e.scard(b"s").unwrap(), 3);
        assert!(e.sismember(b"s", b"a").unwrap());
        assert!(!e.sismember(b"s", b"x").unwrap());
        assert!(e.sismember(b"x", b"a").unwrap_err().is_not_found());
        assert_eq!(e.srem(b"s", &members(&["a", "x"])).unwrap(), 1);
        let all = e.smembers(b"s").unwrap().into_iter().collect::<HashSet<_>>();
        assert_eq!(all, members(&["b", "c"]).into_iter().collect());
        assert_eq!(e.srem(b"s", &members(&["b", "c"])).unwrap(), 2);
        assert!(!e.exists(b"s"));
    }

    #[test]
    fn test_srandmember() {
        let mut e = engine();
        e.sadd(b"s", &members(&["a", "b", "c"])).unwrap();
        let distinct = e.srandmember(b"s", 5).unwrap();
        assert_eq!(distinct.iter().collect::<HashSet<_>>().len(), 3);
        assert_eq!(e.srandmember(b"s", 2).unwrap().len(), 2);
        assert_eq!(e.srandmember(b"s", -7).unwrap().len(), 7);
        assert!(e.srandmember(b"s", 0).unwrap().is_empty());
    }
}
