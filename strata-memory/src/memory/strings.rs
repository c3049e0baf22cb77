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

use strata_common::error::{Error, Result};

use super::MemoryEngine;
use crate::{
    engine::{KeyOps, StringOps},
    object::Object,
};

/// Max length of a string value, 512 MiB.
const MAX_STRING_LEN: u64 = 512 * 1024 * 1024;

pub(crate) fn parse_i64(value: &[u8]) -> Result<i64> {
    std::str::from_utf8(value)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(Error::not_integer)
}

pub(crate) fn parse_f64(value: &[u8]) -> Result<f64> {
    std::str::from_utf8(value)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|f| f.is_finite())
        .ok_or_else(Error::not_float)
}

pub(crate) fn format_f64(value: f64) -> Vec<u8> {
    format!("{value}").into_bytes()
}

/// Resolve an inclusive byte range of `GETRANGE`/`BITCOUNT` against a value of `len` bytes.
fn byte_range(start: i64, end: i64, len: usize) -> Option<(usize, usize)> {
    let len = len as i64;
    let mut start = if start < 0 { len + start } else { start };
    let mut end = if end < 0 { len + end } else { end };
    start = start.max(0);
    end = end.max(0);
    if end >= len {
        end = len - 1;
    }
    if len == 0 || start > end {
        return None;
    }
    Some((start as usize, end as usize))
}

fn check_bit(bit: u8) -> Result<()> {
    if bit > 1 {
        return Err(Error::invalid_argument("bit is not an integer or out of range"));
    }
    Ok(())
}

fn check_len(len: u64) -> Result<()> {
    if len > MAX_STRING_LEN {
        return Err(Error::invalid_argument("string exceeds maximum allowed size"));
    }
    Ok(())
}

impl StringOps for MemoryEngine {
    fn set(&mut self, key: &[u8], value: &[u8], ttl: Option<u64>) -> Result<()> {
        self.put(key, Object::String(value.to_vec()), ttl)
    }

    fn setnx(&mut self, key: &[u8], value: &[u8], ttl: Option<u64>) -> Result<()> {
        if self.exists(key) {
            return Err(Error::already_exists("key exist"));
        }
        self.set(key, value, ttl)
    }

    fn setxx(&mut self, key: &[u8], value: &[u8], ttl: Option<u64>) -> Result<()> {
        if !self.exists(key) {
            return Err(Error::not_found("key not found"));
        }
        self.set(key, value, ttl)
    }

    fn get(&mut self, key: &[u8]) -> Result<Vec<u8>> {
        self.read(key, |obj| Ok(obj.as_string()?.clone()))
    }

    fn incr_by(&mut self, key: &[u8], incr: i64) -> Result<i64> {
        self.upsert(
            key,
            || Object::String(b"0".to_vec()),
            |obj| {
                let value = obj.as_string_mut()?;
                let new = parse_i64(value)?
                    .checked_add(incr)
                    .ok_or_else(|| Error::invalid_argument("increment or decrement would overflow"))?;
                *value = new.to_string().into_bytes();
                Ok(new)
            },
        )
    }

    fn incr_by_float(&mut self, key: &[u8], incr: f64) -> Result<f64> {
        self.upsert(
            key,
            || Object::String(b"0".to_vec()),
            |obj| {
                let value = obj.as_string_mut()?;
                let new = parse_f64(value)? + incr;
                if !new.is_finite() {
                    return Err(Error::invalid_argument("increment would produce NaN or Infinity"));
                }
                *value = format_f64(new);
                Ok(new)
            },
        )
    }

    fn append(&mut self, key: &[u8], value: &[u8]) -> Result<u64> {
        self.upsert(
            key,
            || Object::String(Vec::new()),
            |obj| {
                let s = obj.as_string_mut()?;
                check_len((s.len() + value.len()) as u64)?;
                s.extend_from_slice(value);
                Ok(s.len() as u64)
            },
        )
    }

    fn get_range(&mut self, key: &[u8], start: i64, end: i64) -> Result<Vec<u8>> {
        self.read(key, |obj| {
            let s = obj.as_string()?;
            Ok(byte_range(start, end, s.len())
                .map(|(start, end)| s[start..=end].to_vec())
                .unwrap_or_default())
        })
    }

    fn set_range(&mut self, key: &[u8], offset: u64, value: &[u8]) -> Result<u64> {
        if value.is_empty() {
            return match self.live_index(key) {
                Some(index) => Ok(self.keys[index].object.as_string()?.len() as u64),
                None => Ok(0),
            };
        }
        check_len(offset + value.len() as u64)?;
        self.upsert(
            key,
            || Object::String(Vec::new()),
            |obj| {
                let s = obj.as_string_mut()?;
                let offset = offset as usize;
                if s.len() < offset + value.len() {
                    s.resize(offset + value.len(), 0);
                }
                s[offset..offset + value.len()].copy_from_slice(value);
                Ok(s.len() as u64)
            },
        )
    }

    fn strlen(&mut self, key: &[u8]) -> Result<u64> {
        self.read(key, |obj| Ok(obj.as_string()?.len() as u64))
    }

    fn set_bit(&mut self, key: &[u8], offset: u64, bit: u8) -> Result<u8> {
        check_bit(bit)?;
        check_len((offset >> 3) + 1)?;
        self.upsert(
            key,
            || Object::String(Vec::new()),
            |obj| {
                let s = obj.as_string_mut()?;
                let byte = (offset >> 3) as usize;
                if s.len() <= byte {
                    s.resize(byte + 1, 0);
                }
                let mask = 1u8 << (7 - (offset & 7));
                let old = (s[byte] & mask != 0) as u8;
                if bit == 1 {
                    s[byte] |= mask;
                } else {
                    s[byte] &= !mask;
                }
                Ok(old)
            },
        )
    }

    fn get_bit(&mut self, key: &[u8], offset: u64) -> Result<u8> {
        self.read(key, |obj| {
            let s = obj.as_string()?;
            let byte = (offset >> 3) as usize;
            let bit = s.get(byte).map(|b| (b >> (7 - (offset & 7))) & 1).unwrap_or(0);
            Ok(bit)
        })
    }

    fn bit_count(&mut self, key: &[u8], range: Option<(i64, i64)>) -> Result<u64> {
        self.read(key, |obj| {
            let s = obj.as_string()?;
            let (start, end) = range.unwrap_or((0, -1));
            Ok(byte_range(start, end, s.len())
                .map(|(start, end)| s[start..=end].iter().map(|b| b.count_ones() as u64).sum())
                .unwrap_or(0))
        })
    }

    fn bit_pos(&mut self, key: &[u8], bit: u8, start: Option<i64>, end: Option<i64>) -> Result<i64> {
        check_bit(bit)?;
        self.read(key, |obj| {
            let s = obj.as_string()?;
            let end_given = end.is_some();
            let Some((start, end)) = byte_range(start.unwrap_or(0), end.unwrap_or(-1), s.len()) else {
                return Ok(-1);
            };
            for (i, byte) in s[start..=end].iter().enumerate() {
                // Flip the byte so that the wanted bit always reads as 1.
                let b = if bit == 1 { *byte } else { !*byte };
                if b != 0 {
                    return Ok(((start + i) * 8 + b.leading_zeros() as usize) as i64);
                }
            }
            // Clear bits are assumed past the end of the value unless the range was bounded explicitly.
            if bit == 0 && !end_given {
                return Ok(((end + 1) * 8) as i64);
            }
            Ok(-1)
        })
    }
}
