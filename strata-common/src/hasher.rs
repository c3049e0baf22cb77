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

//! Shard routing by the IEEE CRC-32 checksum of the raw key bytes.

/// IEEE CRC-32 of `bytes`, starting from an all-zero state.
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Shard index of `key` among `shards` shards.
///
/// A pure function of the key bytes, so a key maps to the same shard for as long as the shard count is unchanged.
///
/// # Panics
///
/// Panics if `shards` is zero.
pub fn shard_index(key: &[u8], shards: usize) -> usize {
    crc32(key) as usize % shards
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_check_value() {
        // The standard check value of CRC-32/ISO-HDLC.
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn test_shard_index_stable() {
        for i in 0..1000u32 {
            let key = format!("key-{i}");
            let index = shard_index(key.as_bytes(), 16);
            assert!(index < 16);
            assert_eq!(index, shard_index(key.as_bytes(), 16));
            assert_eq!(index, crc32(key.as_bytes()) as usize % 16);
        }
    }
}
