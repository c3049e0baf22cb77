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

use indexmap::{IndexMap, IndexSet};
use strata_common::{
    code::DataType,
    error::{Error, Result},
};

use crate::zset::ZSet;

/// Fixed bookkeeping cost accounted per key.
pub const ENTRY_OVERHEAD: usize = 48;
/// Fixed bookkeeping cost accounted per collection element.
pub const ELEMENT_OVERHEAD: usize = 16;

/// A cached value.
#[derive(Debug, Clone)]
pub enum Object {
    /// String value.
    String(Vec<u8>),
    /// Hash value.
    Hash(IndexMap<Vec<u8>, Vec<u8>>),
    /// List value.
    List(VecDeque<Vec<u8>>),
    /// Set value.
    Set(IndexSet<Vec<u8>>),
    /// Sorted set value.
    ZSet(ZSet),
}

impl Object {
    /// Type of the value.
    pub fn data_type(&self) -> DataType {
        match self {
            Object::String(_) => DataType::String,
            Object::Hash(_) => DataType::Hash,
            Object::List(_) => DataType::List,
            Object::Set(_) => DataType::Set,
            Object::ZSet(_) => DataType::ZSet,
        }
    }

    /// Returns true for a collection without elements.
    ///
    /// Empty collections are never kept in the keyspace.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            Object::String(_) => false,
            Object::Hash(h) => h.is_empty(),
            Object::List(l) => l.is_empty(),
            Object::Set(s) => s.is_empty(),
            Object::ZSet(z) => z.is_empty(),
        }
    }

    /// Estimated bytes held by the value.
    pub fn bytes(&self) -> usize {
        match self {
            Object::String(v) => v.len(),
            Object::Hash(h) => h.iter().map(|(f, v)| f.len() + v.len() + ELEMENT_OVERHEAD).sum(),
            Object::List(l) => l.iter().map(|v| v.len() + ELEMENT_OVERHEAD).sum(),
            Object::Set(s) => s.iter().map(|v| v.len() + ELEMENT_OVERHEAD).sum(),
            Object::ZSet(z) => z.bytes() + z.len() * ELEMENT_OVERHEAD,
        }
    }
}

macro_rules! accessors {
    ($( $variant:ident, $ty:ty, $get:ident, $get_mut:ident; )*) => {
        impl Object {
            $(
                #[doc = concat!("Borrow the value as `", stringify!($variant), "`, or fail with `WrongType`.")]
                pub fn $get(&self) -> Result<&$ty> {
                    match self {
                        Object::$variant(v) => Ok(v),
                        _ => Err(Error::wrong_type()),
                    }
                }

                #[doc = concat!("Mutably borrow the value as `", stringify!($variant), "`, or fail with `WrongType`.")]
                pub fn $get_mut(&mut self) -> Result<&mut $ty> {
                    match self {
                        Object::$variant(v) => Ok(v),
                        _ => Err(Error::wrong_type()),
                    }
                }
            )*
        }
    };
}

accessors! {
    String, Vec<u8>, as_string, as_string_mut;
    Hash, IndexMap<Vec<u8>, Vec<u8>>, as_hash, as_hash_mut;
    List, VecDeque<Vec<u8>>, as_list, as_list_mut;
    Set, IndexSet<Vec<u8>>, as_set, as_set_mut;
    ZSet, ZSet, as_zset, as_zset_mut;
}

/// A keyspace entry.
#[derive(Debug)]
pub struct Entry {
    /// The value.
    pub object: Object,
    /// Absolute expiration in unix milliseconds.
    pub expire_at_ms: Option<u64>,
    /// LRU clock of the last access.
    pub lru: u64,
    /// Logarithmic LFU counter.
    pub freq: u8,
    /// Minute of the last LFU decay.
    pub lfu_decr_at: u64,
    /// Accounted bytes.
    pub charge: usize,
}

impl Entry {
    /// Returns true if the entry is expired at `now_ms`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expire_at_ms.is_some_and(|at| at <= now_ms)
    }
}

/// Bytes accounted for a key holding `object`.
pub fn charge(key: &[u8], object: &Object) -> usize {
    key.len() + object.bytes() + ENTRY_OVERHEAD
}
