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

use std::{cmp::Ordering, collections::BTreeSet};

use hashbrown::HashMap;
use strata_common::code::ScoreMember;

use crate::bound::{lex_contains, LexBound, ScoreBound};

/// A totally ordered score.
#[derive(Debug, Clone, Copy)]
pub struct Score(f64);

impl Score {
    fn new(score: f64) -> Self {
        // `-0.0` and `0.0` must compare equal.
        if score == 0.0 {
            Self(0.0)
        } else {
            Self(score)
        }
    }

    /// The score.
    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Sorted set ordered by `(score, member)`.
///
/// The member dict answers score lookups, the ordered tree answers range queries.
#[derive(Debug, Default, Clone)]
pub struct ZSet {
    dict: HashMap<Vec<u8>, f64>,
    tree: BTreeSet<(Score, Vec<u8>)>,
    bytes: usize,
}

impl ZSet {
    /// Count of members.
    pub fn len(&self) -> usize {
        self.dict.len()
    }

    /// Returns true if the set has no members.
    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    /// Bytes held by the members.
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Insert or update a member. Returns true if the member is new.
    pub fn insert(&mut self, member: &[u8], score: f64) -> bool {
        let score = Score::new(score);
        match self.dict.get_mut(member) {
            Some(old) => {
                if Score::new(*old) != score {
                    self.tree.remove(&(Score::new(*old), member.to_vec()));
                    self.tree.insert((score, member.to_vec()));
                    *old = score.get();
                }
                false
            }
            None => {
                self.dict.insert(member.to_vec(), score.get());
                self.tree.insert((score, member.to_vec()));
                self.bytes += 2 * member.len() + 2 * std::mem::size_of::<f64>();
                true
            }
        }
    }

    /// Remove a member. Returns true if the member existed.
    pub fn remove(&mut self, member: &[u8]) -> bool {
        match self.dict.remove(member) {
            Some(score) => {
                self.tree.remove(&(Score::new(score), member.to_vec()));
                self.bytes -= 2 * member.len() + 2 * std::mem::size_of::<f64>();
                true
            }
            None => false,
        }
    }

    /// Score of a member.
    pub fn score(&self, member: &[u8]) -> Option<f64> {
        self.dict.get(member).copied()
    }

    /// Ascending rank of a member.
    pub fn rank(&self, member: &[u8]) -> Option<usize> {
        let score = Score::new(self.score(member)?);
        let key = (score, member.to_vec());
        Some(self.tree.range(..&key).count())
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (f64, &[u8])> + '_ {
        self.tree.iter().map(|(s, m)| (s.get(), m.as_slice()))
    }

    /// Members between two resolved inclusive ranks, ascending.
    pub fn range_by_rank(&self, start: usize, stop: usize) -> Vec<ScoreMember> {
        self.iter()
            .skip(start)
            .take(stop + 1 - start)
            .map(|(s, m)| ScoreMember::new(s, m))
            .collect()
    }

    /// Members within the score bounds, ascending.
    pub fn range_by_score<'a>(
        &'a self,
        min: &'a ScoreBound,
        max: &'a ScoreBound,
    ) -> impl DoubleEndedIterator<Item = (f64, &'a [u8])> + 'a {
        self.iter().filter(move |(s, _)| min.below(*s) && max.above(*s))
    }

    /// Members within the lex bounds, ascending.
    pub fn range_by_lex<'a>(
        &'a self,
        min: &'a LexBound,
        max: &'a LexBound,
    ) -> impl DoubleEndedIterator<Item = (f64, &'a [u8])> + 'a {
        self.iter().filter(move |(_, m)| lex_contains(min, max, m))
    }

    /// Remove the given members. Returns the count of removed members.
    pub fn remove_all<'a>(&mut self, members: impl IntoIterator<Item = &'a [u8]>) -> u64 {
        members.into_iter().filter(|m| self.remove(m)).count() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zset(pairs: &[(f64, &str)]) -> ZSet {
        let mut z = ZSet::default();
        for (s, m) in pairs {
            z.insert(m.as_bytes(), *s);
        }
        z
    }

    #[test]
    fn test_zset_order_and_rank() {
        let mut z = zset(&[(3.0, "c"), (1.0, "a"), (2.0, "b"), (2.0, "a2")]);
        let members = z.iter().map(|(_, m)| m.to_vec()).collect::<Vec<_>>();
        assert_eq!(members, vec![b"a".to_vec(), b"a2".to_vec(), b"b".to_vec(), b"c".to_vec()]);
        assert_eq!(z.rank(b"b"), Some(2));
        assert_eq!(z.rank(b"x"), None);

        assert!(!z.insert(b"a", 10.0));
        assert_eq!(z.rank(b"a"), Some(3));
        assert_eq!(z.score(b"a"), Some(10.0));
        assert_eq!(z.len(), 4);
    }

    #[test]
    fn test_zset_ranges() {
        let z = zset(&[(1.0, "a"), (2.0, "b"), (3.0, "c"), (4.0, "d")]);
        let r = z.range_by_rank(1, 2);
        assert_eq!(r, vec![ScoreMember::new(2.0, "b"), ScoreMember::new(3.0, "c")]);

        let min = ScoreBound::parse(b"(1").unwrap();
        let max = ScoreBound::parse(b"3").unwrap();
        assert_eq!(z.range_by_score(&min, &max).count(), 2);
        assert_eq!(z.range_by_score(&min, &max).next_back().map(|(s, _)| s), Some(3.0));
    }

    #[test]
    fn test_zset_remove_accounting() {
        let mut z = zset(&[(1.0, "a"), (2.0, "bb")]);
        let bytes = z.bytes();
        assert!(z.remove(b"bb"));
        assert!(!z.remove(b"bb"));
        assert!(z.bytes() < bytes);
        assert_eq!(z.remove_all([b"a".as_slice(), b"x".as_slice()]), 1);
        assert!(z.is_empty());
        assert_eq!(z.bytes(), 0);
    }

    #[test]
    fn test_zset_negative_zero() {
        let mut z = ZSet::default();
        z.insert(b"a", -0.0);
        assert!(!z.insert(b"a", 0.0));
        assert_eq!(z.rank(b"a"), Some(0));
    }
}
