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

//! Range arguments of list and sorted set commands.

use std::ops::Bound;

use strata_common::error::{Error, Result};

/// Resolve an inclusive `[start, stop]` index range with Redis rules against a sequence of `len` items.
///
/// Negative indexes count from the end. Returns `None` if the resolved range is empty.
pub fn normalize_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    let len = len as i64;
    let mut start = if start < 0 { len + start } else { start };
    let mut stop = if stop < 0 { len + stop } else { stop };
    if start < 0 {
        start = 0;
    }
    if stop >= len {
        stop = len - 1;
    }
    if start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

/// Resolve a single index, negative counting from the end.
pub fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let index = if index < 0 { len + index } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

/// A score bound of `ZRANGEBYSCORE`-like commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBound {
    /// The score.
    pub value: f64,
    /// True if the bound is exclusive.
    pub exclusive: bool,
}

impl ScoreBound {
    /// Parse a raw bound such as `1.5`, `(1.5`, `-inf` or `+inf`.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let (exclusive, digits) = match raw.first() {
            Some(b'(') => (true, &raw[1..]),
            _ => (false, raw),
        };
        let value = parse_score(digits).map_err(|e| e.with_context("bound", String::from_utf8_lossy(raw)))?;
        Ok(Self { value, exclusive })
    }

    /// Returns true if `score` is not below this bound used as a lower bound.
    pub fn below(&self, score: f64) -> bool {
        if self.exclusive {
            self.value < score
        } else {
            self.value <= score
        }
    }

    /// Returns true if `score` is not above this bound used as an upper bound.
    pub fn above(&self, score: f64) -> bool {
        if self.exclusive {
            score < self.value
        } else {
            score <= self.value
        }
    }
}

/// A lex bound of `ZRANGEBYLEX`-like commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexBound {
    /// `-`
    Min,
    /// `+`
    Max,
    /// `[member`
    Inclusive(Vec<u8>),
    /// `(member`
    Exclusive(Vec<u8>),
}

impl LexBound {
    /// Parse a raw lex bound.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        match raw {
            b"-" => Ok(LexBound::Min),
            b"+" => Ok(LexBound::Max),
            [b'[', rest @ ..] => Ok(LexBound::Inclusive(rest.to_vec())),
            [b'(', rest @ ..] => Ok(LexBound::Exclusive(rest.to_vec())),
            _ => Err(Error::invalid_argument("min or max not valid string range item")
                .with_context("bound", String::from_utf8_lossy(raw))),
        }
    }

    /// As a lower bound of a byte range.
    pub fn as_lower(&self) -> Option<Bound<&[u8]>> {
        match self {
            LexBound::Min => Some(Bound::Unbounded),
            LexBound::Max => None,
            LexBound::Inclusive(m) => Some(Bound::Included(m.as_slice())),
            LexBound::Exclusive(m) => Some(Bound::Excluded(m.as_slice())),
        }
    }

    /// As an upper bound of a byte range.
    pub fn as_upper(&self) -> Option<Bound<&[u8]>> {
        match self {
            LexBound::Min => None,
            LexBound::Max => Some(Bound::Unbounded),
            LexBound::Inclusive(m) => Some(Bound::Included(m.as_slice())),
            LexBound::Exclusive(m) => Some(Bound::Excluded(m.as_slice())),
        }
    }
}

/// Returns true if `member` lies within the lex range `[min, max]`.
pub fn lex_contains(min: &LexBound, max: &LexBound, member: &[u8]) -> bool {
    let lower = match min.as_lower() {
        None => return false,
        Some(Bound::Unbounded) => true,
        Some(Bound::Included(m)) => member >= m,
        Some(Bound::Excluded(m)) => member > m,
    };
    let upper = match max.as_upper() {
        None => return false,
        Some(Bound::Unbounded) => true,
        Some(Bound::Included(m)) => member <= m,
        Some(Bound::Excluded(m)) => member < m,
    };
    lower && upper
}

/// Parse a float score. `NaN` is rejected.
pub fn parse_score(raw: &[u8]) -> Result<f64> {
    let s = std::str::from_utf8(raw).map_err(|_| Error::not_float())?;
    let value = match s.to_ascii_lowercase().as_str() {
        "inf" | "+inf" => f64::INFINITY,
        "-inf" => f64::NEG_INFINITY,
        s => s.parse::<f64>().map_err(|_| Error::not_float())?,
    };
    if value.is_nan() {
        return Err(Error::not_float());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_range() {
        assert_eq!(normalize_range(0, -1, 5), Some((0, 4)));
        assert_eq!(normalize_range(-2, -1, 5), Some((3, 4)));
        assert_eq!(normalize_range(-100, 100, 5), Some((0, 4)));
        assert_eq!(normalize_range(3, 1, 5), None);
        assert_eq!(normalize_range(5, 10, 5), None);
        assert_eq!(normalize_range(0, -1, 0), None);
    }

    #[test]
    fn test_normalize_index() {
        assert_eq!(normalize_index(-1, 3), Some(2));
        assert_eq!(normalize_index(3, 3), None);
        assert_eq!(normalize_index(-4, 3), None);
    }

    #[test]
    fn test_score_bound() {
        let b = ScoreBound::parse(b"(1.5").unwrap();
        assert!(b.exclusive);
        assert!(!b.below(1.5));
        assert!(b.below(2.0));

        let b = ScoreBound::parse(b"-inf").unwrap();
        assert!(b.below(f64::MIN));

        let b = ScoreBound::parse(b"+inf").unwrap();
        assert!(b.above(f64::MAX));

        assert!(ScoreBound::parse(b"abc").is_err());
        assert!(ScoreBound::parse(b"nan").is_err());
    }

    #[test]
    fn test_lex_bound() {
        let min = LexBound::parse(b"[b").unwrap();
        let max = LexBound::parse(b"(d").unwrap();
        assert!(!lex_contains(&min, &max, b"a"));
        assert!(lex_contains(&min, &max, b"b"));
        assert!(lex_contains(&min, &max, b"c"));
        assert!(!lex_contains(&min, &max, b"d"));

        assert!(lex_contains(&LexBound::Min, &LexBound::Max, b"anything"));
        assert!(!lex_contains(&LexBound::Max, &LexBound::Max, b"anything"));
        assert!(LexBound::parse(b"b").is_err());
    }
}
