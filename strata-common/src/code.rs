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

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The five value types held by the cache and the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Scalar value, tag `'k'`.
    String,
    /// Field-value map, tag `'h'`.
    Hash,
    /// Ordered sequence, tag `'l'`.
    List,
    /// Unordered unique members, tag `'s'`.
    Set,
    /// Members ordered by score, tag `'z'`.
    ZSet,
}

impl DataType {
    /// All data types.
    pub const ALL: [DataType; 5] = [
        DataType::String,
        DataType::Hash,
        DataType::List,
        DataType::Set,
        DataType::ZSet,
    ];

    /// Single character tag used by the load queue.
    pub fn tag(self) -> char {
        match self {
            DataType::String => 'k',
            DataType::Hash => 'h',
            DataType::List => 'l',
            DataType::Set => 's',
            DataType::ZSet => 'z',
        }
    }

    /// Name reported by `TYPE`.
    pub fn name(self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Hash => "hash",
            DataType::List => "list",
            DataType::Set => "set",
            DataType::ZSet => "zset",
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<char> for DataType {
    type Error = Error;

    fn try_from(tag: char) -> Result<Self, Self::Error> {
        match tag {
            'k' => Ok(DataType::String),
            'h' => Ok(DataType::Hash),
            'l' => Ok(DataType::List),
            's' => Ok(DataType::Set),
            'z' => Ok(DataType::ZSet),
            _ => Err(Error::invalid_argument("invalid key type").with_context("tag", tag)),
        }
    }
}

/// A field-value pair of a hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldValue {
    /// Field.
    pub field: Vec<u8>,
    /// Value.
    pub value: Vec<u8>,
}

impl FieldValue {
    /// Create a field-value pair.
    pub fn new(field: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// A score-member pair of a sorted set.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMember {
    /// Score.
    pub score: f64,
    /// Member.
    pub member: Vec<u8>,
}

impl ScoreMember {
    /// Create a score-member pair.
    pub fn new(score: f64, member: impl Into<Vec<u8>>) -> Self {
        Self {
            score,
            member: member.into(),
        }
    }
}

/// Where `LINSERT` places the new element relative to the pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeforeOrAfter {
    /// Insert before the pivot.
    Before,
    /// Insert after the pivot.
    After,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_tags() {
        for ty in DataType::ALL {
            assert_eq!(DataType::try_from(ty.tag()).unwrap(), ty);
        }
        assert!(DataType::try_from('x').is_err());
    }
}
