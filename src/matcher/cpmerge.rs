// src/matcher/cpmerge.rs

use log::trace;

use crate::error::Result;
use crate::types::EntryId;
use super::similarity::SimilarityCalculator;

/// Sorted list of entry ids stored as little-endian `u32`s.
///
/// Lists handed to the engine must be strictly ascending.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostingList<'a> {
    bytes: &'a [u8],
}

impl<'a> PostingList<'a> {
    pub const EMPTY: PostingList<'static> = PostingList { bytes: &[] };

    /// Wrap raw bytes; the length must be a multiple of four.
    pub fn from_le_bytes(bytes: &'a [u8]) -> Self {
        debug_assert!(bytes.len() % 4 == 0);
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.len() < 4
    }

    #[inline]
    pub fn get(&self, index: usize) -> EntryId {
        let at = index * 4;
        u32::from_le_bytes([self.bytes[at], self.bytes[at + 1], self.bytes[at + 2], self.bytes[at + 3]])
    }

    pub fn iter(&self) -> impl Iterator<Item = EntryId> + 'a {
        self.bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
    }

    /// Binary search for `id`.
    pub fn contains(&self, id: EntryId) -> bool {
        let (mut lo, mut hi) = (0usize, self.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let value = self.get(mid);
            if value == id {
                return true;
            }
            if value < id {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        false
    }

    pub fn is_strictly_ascending(&self) -> bool {
        let mut prev: Option<EntryId> = None;
        for id in self.iter() {
            if prev.map_or(false, |p| p >= id) {
                return false;
            }
            prev = Some(id);
        }
        true
    }
}

/// One bucket of the index as seen by the retrieval engine.
pub trait PostingSource {
    /// N-gram count shared by every entry in the bucket.
    fn cardinality(&self) -> usize;

    /// Every entry id in the bucket, ascending.
    fn entries(&self) -> Result<PostingList<'_>>;

    /// Posting list of an n-gram key; empty when the bucket lacks the key.
    fn postings(&self, key: &[u8]) -> Result<PostingList<'_>>;
}

/// Work done and matches found in a single bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketOutcome {
    pub candidates: usize,
    pub verified: usize,
    pub matches: Vec<EntryId>,
}

/// CPMerge search over one bucket at a time.
pub struct CpMerge<'c> {
    calc: &'c SimilarityCalculator,
}

impl<'c> CpMerge<'c> {
    pub fn new(calc: &'c SimilarityCalculator) -> Self {
        Self { calc }
    }

    /// Search one bucket for entries matching the query whose sorted,
    /// unique n-gram keys are `query_keys`.
    ///
    /// Returns `None` when no entry of this cardinality can reach the
    /// threshold, so the bucket was never touched.
    pub fn search<S: PostingSource + ?Sized>(
        &self,
        query_keys: &[Vec<u8>],
        bucket: &S,
    ) -> Result<Option<BucketOutcome>> {
        let q = query_keys.len();
        let y = bucket.cardinality();
        let tau = self.calc.min_overlap(q, y);

        if tau > q.min(y) {
            trace!("Skipping bucket {}: needs overlap {} > {}", y, tau, q.min(y));
            return Ok(None);
        }

        if tau == 0 {
            let matches: Vec<EntryId> = bucket.entries()?.iter().collect();
            return Ok(Some(BucketOutcome {
                candidates: matches.len(),
                verified: matches.len(),
                matches,
            }));
        }

        let mut lists = query_keys
            .iter()
            .map(|key| bucket.postings(key))
            .collect::<Result<Vec<_>>>()?;
        lists.sort_by_key(|list| list.len());

        // Any entry sharing at least tau n-grams appears in one of the
        // q - tau + 1 shortest lists.
        let prune = q - tau + 1;
        let mut candidates: Vec<(EntryId, usize)> = Vec::new();
        for list in &lists[..prune] {
            candidates = merge_counts(&candidates, list);
        }
        let candidate_count = candidates.len();

        for (i, list) in lists.iter().enumerate().skip(prune) {
            if candidates.is_empty() {
                break;
            }
            let remaining = q - i - 1;
            candidates.retain_mut(|(id, count)| {
                if list.contains(*id) {
                    *count += 1;
                }
                *count + remaining >= tau
            });
        }

        let verified = candidates.len();
        let matches = candidates
            .into_iter()
            .filter(|&(_, overlap)| self.calc.accepts(q, y, overlap))
            .map(|(id, _)| id)
            .collect::<Vec<_>>();

        trace!("Bucket {}: tau={} candidates={} verified={} matched={}",
            y, tau, candidate_count, verified, matches.len());

        Ok(Some(BucketOutcome {
            candidates: candidate_count,
            verified,
            matches,
        }))
    }
}

// Merge a sorted posting list into sorted (id, count) pairs.
fn merge_counts(current: &[(EntryId, usize)], list: &PostingList<'_>) -> Vec<(EntryId, usize)> {
    let mut merged = Vec::with_capacity(current.len() + list.len());
    let mut existing = current.iter().copied().peekable();

    for id in list.iter() {
        while let Some(&(prev, count)) = existing.peek() {
            if prev >= id {
                break;
            }
            merged.push((prev, count));
            existing.next();
        }
        match existing.peek() {
            Some(&(prev, count)) if prev == id => {
                merged.push((id, count + 1));
                existing.next();
            }
            _ => merged.push((id, 1)),
        }
    }
    merged.extend(existing);
    merged
}
