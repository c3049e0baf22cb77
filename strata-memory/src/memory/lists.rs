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

use std::collections::VecDeque;

use strata_common::{
    code::BeforeOrAfter,
    error::{Error, Result},
};

use super::MemoryEngine;
use crate::{
    bound::{normalize_index, normalize_range},
    engine::ListOps,
    object::Object,
};

fn empty() -> Object {
    Object::List(VecDeque::new())
}

impl ListOps for MemoryEngine {
    fn lindex(&mut self, key: &[u8], index: i64) -> Result<Vec<u8>> {
        self.read(key, |obj| {
            let list = obj.as_list()?;
            normalize_index(index, list.len())
                .map(|i| list[i].clone())
                .ok_or_else(|| Error::not_found("index out of range"))
        })
    }

    fn linsert(&mut self, key: &[u8], position: BeforeOrAfter, pivot: &[u8], value: &[u8]) -> Result<i64> {
        self.reserve()?;
        self.update(key, |obj| {
            let list = obj.as_list_mut()?;
            let Some(at) = list.iter().position(|v| v == pivot) else {
                return Ok(-1);
            };
            let at = match position {
                BeforeOrAfter::Before => at,
                BeforeOrAfter::After => at + 1,
            };
            list.insert(at, value.to_vec());
            Ok(list.len() as i64)
        })
    }

    fn llen(&mut self, key: &[u8]) -> Result<u64> {
        self.read(key, |obj| Ok(obj.as_list()?.len() as u64))
    }

    fn lpop(&mut self, key: &[u8]) -> Result<Vec<u8>> {
        self.update(key, |obj| {
            obj.as_list_mut()?
                .pop_front()
                .ok_or_else(|| Error::not_found("list is empty"))
        })
    }

    fn lpush(&mut self, key: &[u8], values: &[Vec<u8>]) -> Result<u64> {
        self.upsert(key, empty, |obj| {
            let list = obj.as_list_mut()?;
            for v in values {
                list.push_front(v.clone());
            }
            Ok(list.len() as u64)
        })
    }

    fn lpushx(&mut self, key: &[u8], values: &[Vec<u8>]) -> Result<u64> {
        self.reserve()?;
        self.update(key, |obj| {
            let list = obj.as_list_mut()?;
            for v in values {
                list.push_front(v.clone());
            }
            Ok(list.len() as u64)
        })
    }

    fn lrange(&mut self, key: &[u8], start: i64, stop: i64) -> Result<Vec<Vec<u8>>> {
        self.read(key, |obj| {
            let list = obj.as_list()?;
            Ok(match normalize_range(start, stop, list.len()) {
                Some((start, stop)) => list.range(start..=stop).cloned().collect(),
                None => Vec::new(),
            })
        })
    }

    fn lrem(&mut self, key: &[u8], count: i64, value: &[u8]) -> Result<u64> {
        self.update(key, |obj| {
            let list = obj.as_list_mut()?;
            let limit = if count == 0 { usize::MAX } else { count.unsigned_abs() as usize };
            let mut removed = 0;
            if count >= 0 {
                let mut i = 0;
                while i < list.len() && removed < limit {
                    if list[i] == value {
                        list.remove(i);
                        removed += 1;
                    } else {
                        i += 1;
                    }
                }
            } else {
                let mut i = list.len();
                while i > 0 && removed < limit {
                    i -= 1;
                    if list[i] == value {
                        list.remove(i);
                        removed += 1;
                    }
                }
            }
            Ok(removed as u64)
        })
    }

    fn lset(&mut self, key: &[u8], index: i64, value: &[u8]) -> Result<()> {
        self.reserve()?;
        self.update(key, |obj| {
            let list = obj.as_list_mut()?;
            let i = normalize_index(index, list.len()).ok_or_else(Error::out_of_range)?;
            list[i] = value.to_vec();
            Ok(())
        })
    }

    fn ltrim(&mut self, key: &[u8], start: i64, stop: i64) -> Result<()> {
        self.update(key, |obj| {
            let list = obj.as_list_mut()?;
            match normalize_range(start, stop, list.len()) {
                Some((start, stop)) => {
                    list.truncate(stop + 1);
                    list.drain(..start);
                }
                None => list.clear(),
            }
            Ok(())
        })
    }

    fn rpop(&mut self, key: &[u8]) -> Result<Vec<u8>> {
        self.update(key, |obj| {
            obj.as_list_mut()?
                .pop_back()
                .ok_or_else(|| Error::not_found("list is empty"))
        })
    }

    fn rpush(&mut self, key: &[u8], values: &[Vec<u8>]) -> Result<u64> {
        self.upsert(key, empty, |obj| {
            let list = obj.as_list_mut()?;
            list.extend(values.iter().cloned());
            Ok(list.len() as u64)
        })
    }

    fn rpushx(&mut self, key: &[u8], values: &[Vec<u8>]) -> Result<u64> {
        self.reserve()?;
        self.update(key, |obj| {
            let list = obj.as_list_mut()?;
            list.extend(values.iter().cloned());
            Ok(list.len() as u64)
        })
    }
}
