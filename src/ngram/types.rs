// src/ngram/types.rs

use serde::{Serialize, Deserialize};

/// Padding unit used for begin/end markers and short-string padding.
/// Byte values and Unicode scalar values never reach this value.
pub const MARKER_UNIT: u32 = u32::MAX;

/// One numbered n-gram: `n` code units plus the occurrence index of this
/// unit sequence within its string (1 for the first occurrence).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NGram {
    pub units: Vec<u32>,
    pub occurrence: u32,
}

impl NGram {
    pub fn new(units: Vec<u32>, occurrence: u32) -> Self {
        Self { units, occurrence }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Append the fixed-width index key for this n-gram to `out`.
    ///
    /// Units and the occurrence number are written big-endian so that
    /// byte order of keys follows the order of their unit sequences.
    pub fn encode_key_into(&self, out: &mut Vec<u8>) {
        out.reserve(key_width(self.units.len()));
        for unit in &self.units {
            out.extend_from_slice(&unit.to_be_bytes());
        }
        out.extend_from_slice(&self.occurrence.to_be_bytes());
    }

    pub fn key(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(key_width(self.units.len()));
        self.encode_key_into(&mut out);
        out
    }
}

/// Width in bytes of the index key of an n-gram of size `ngram_size`.
pub fn key_width(ngram_size: usize) -> usize {
    4 * (ngram_size + 1)
}
