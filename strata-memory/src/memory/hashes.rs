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

use indexmap::IndexMap;
use strata_common::{
    code::FieldValue,
    error::{Error, Result},
};

use super::{
    strings::{format_f64, parse_f64, parse_i64},
    MemoryEngine,
};
use crate::{engine::HashOps, object::Object};

fn empty() -> Object {
    Object::Hash(IndexMap::new())
}

impl HashOps for MemoryEngine {
    fn hdel(&mut self, key: &[u8], fields: &[Vec<u8>]) -> Result<u64> {
        self.update(key, |obj| {
            let hash = obj.as_hash_mut()?;
            Ok(fields.iter().filter(|f| hash.swap_remove(f.as_slice()).is_some()).count() as u64)
        })
    }

    fn hset(&mut self, key: &[u8], field: &[u8], value: &[u8]) -> Result<bool> {
        self.upsert(key, empty, |obj| {
            Ok(obj.as_hash_mut()?.insert(field.to_vec(), value.to_vec()).is_none())
        })
    }

    fn hsetnx(&mut self, key: &[u8], field: &[u8], value: &[u8]) -> Result<bool> {
        self.upsert(key, empty, |obj| {
            let hash = obj.as_hash_mut()?;
            if hash.contains_key(field) {
                return Ok(false);
            }
            hash.insert(field.to_vec(), value.to_vec());
            Ok(true)
        })
    }

    fn hmset(&mut self, key: &[u8], fvs: &[FieldValue]) -> Result<()> {
        self.upsert(key, empty, |obj| {
            let hash = obj.as_hash_mut()?;
            for fv in fvs {
                hash.insert(fv.field.clone(), fv.value.clone());
            }
            Ok(())
        })
    }

    fn hget(&mut self, key: &[u8], field: &[u8]) -> Result<Vec<u8>> {
        self.read(key, |obj| {
            obj.as_hash()?
                .get(field)
                .cloned()
                .ok_or_else(|| Error::not_found("field not found"))
        })
    }

    fn hmget(&mut self, key: &[u8], fields: &[Vec<u8>]) -> Result<Vec<Option<Vec<u8>>>> {
        self.read(key, |obj| {
            let hash = obj.as_hash()?;
            Ok(fields.iter().map(|f| hash.get(f.as_slice()).cloned()).collect())
        })
    }

    fn hgetall(&mut self, key: &[u8]) -> Result<Vec<FieldValue>> {
        self.read(key, |obj| {
            Ok(obj
                .as_hash()?
                .iter()
                .map(|(f, v)| FieldValue::new(f.clone(), v.clone()))
                .collect())
        })
    }

    fn hkeys(&mut self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.read(key, |obj| Ok(obj.as_hash()?.keys().cloned().collect()))
    }

    fn hvals(&mut self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.read(key, |obj| Ok(obj.as_hash()?.values().cloned().collect()))
    }

    fn hexists(&mut self, key: &[u8], field: &[u8]) -> Result<bool> {
        self.read(key, |obj| Ok(obj.as_hash()?.contains_key(field)))
    }

    fn hincrby(&mut self, key: &[u8], field: &[u8], incr: i64) -> Result<i64> {
        self.upsert(key, empty, |obj| {
            let hash = obj.as_hash_mut()?;
            let old = match hash.get(field) {
                Some(v) => parse_i64(v).map_err(|_| Error::invalid_argument("hash value is not an integer"))?,
                None => 0,
            };
            let new = old
                .checked_add(incr)
                .ok_or_else(|| Error::invalid_argument("increment or decrement would overflow"))?;
            hash.insert(field.to_vec(), new.to_string().into_bytes());
            Ok(new)
        })
    }

    fn hincrbyfloat(&mut self, key: &[u8], field: &[u8], incr: f64) -> Result<f64> {
        self.upsert(key, empty, |obj| {
            let hash = obj.as_hash_mut()?;
            let old = match hash.get(field) {
                Some(v) => parse_f64(v).map_err(|_| Error::invalid_argument("hash value is not a float"))?,
                None => 0.0,
            };
            let new = old + incr;
            if !new.is_finite() {
                return Err(Error::invalid_argument("increment would produce NaN or Infinity"));
            }
            hash.insert(field.to_vec(), format_f64(new));
            Ok(new)
        })
    }

    fn hlen(&mut self, key: &[u8]) -> Result<u64> {
        self.read(key, |obj| Ok(obj.as_hash()?.len() as u64))
    }

    fn hstrlen(&mut self, key: &[u8], field: &[u8]) -> Result<u64> {
        self.read(key, |obj| Ok(obj.as_hash()?.get(field).map(|v| v.len() as u64).unwrap_or(0)))
    }
}

#[cfg(test)]
mod tests {
    use strata_common::error::ErrorKind;

    use super::*;
    use crate::{
        engine::{KeyOps, StringOps},
        memory::tests::engine,
    };

    #[test]
    fn test_hash_basic() {
        let mut e = engine();
        assert!(e.hset(b"h", b"f1", b"v1").unwrap());
        assert!(!e.hset(b"h", b"f1", b"v2").unwrap());
        assert!(!e.hsetnx(b"h", b"f1", b"v3").unwrap());
        assert!(e.hsetnx(b"h", b"f2", b"v3").unwrap());
        assert_eq!(e.hget(b"h", b"f1").unwrap(), b"v2");
        assert!(e.hget(b"h", b"nope").unwrap_err().is_not_found());
        assert_eq!(
            e.hmget(b"h", &[b"f1".to_vec(), b"x".to_vec()]).unwrap(),
            vec![Some(b"v2".to_vec()), None]
        );
        assert_eq!(e.hlen(b"h").unwrap(), 2);
        assert_eq!(e.hstrlen(b"h", b"f2").unwrap(), 2);
        assert!(e.hexists(b"h", b"f2").unwrap());
        assert!(e.hexists(b"missing", b"f2").unwrap_err().is_not_found());
        assert_eq!(e.hkeys(b"h").unwrap().len(), 2);
        assert_eq!(e.hvals(b"h").unwrap().len(), 2);
    }

    #[test]
    fn test_hash_removed_when_empty() {
        let mut e = engine();
        e.hmset(b"h", &[FieldValue::new("a", "1"), FieldValue::new("b", "2")]).unwrap();
        assert_eq!(e.hgetall(b"h").unwrap().len(), 2);
        assert_eq!(e.hdel(b"h", &[b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]).unwrap(), 2);
        assert!(!e.exists(b"h"));
        assert_eq!(e.used_memory(), 0);
    }

    #[test]
    fn test_hash_incr() {
        let mut e = engine();
        assert_eq!(e.hincrby(b"h", b"n", 3).unwrap(), 3);
        assert_eq!(e.hincrby(b"h", b"n", -1).unwrap(), 2);
        assert_eq!(e.hincrbyfloat(b"h", b"f", 1.5).unwrap(), 1.5);
        e.hset(b"h", b"s", b"abc").unwrap();
        assert!(e.hincrby(b"h", b"s", 1).is_err());

        e.set(b"str", b"v", None).unwrap();
        assert_eq!(e.hset(b"str", b"f", b"v").unwrap_err().kind(), ErrorKind::WrongType);
    }
}
