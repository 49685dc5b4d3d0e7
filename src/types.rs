use serde::{Serialize, Deserialize};

use crate::config::subsystems::generator::EncodingMode;

/// Dense insertion index of a stored string.
pub type EntryId = u32;

/// Summary of an opened index, read from its header and directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub version: u32,
    pub ngram_size: usize,
    pub use_markers: bool,
    pub encoding: EncodingMode,
    pub num_entries: u64,
    pub num_buckets: usize,
    /// Largest n-gram count of any stored string.
    pub max_size: usize,
    pub file_size: u64,
}
