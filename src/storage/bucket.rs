// src/storage/bucket.rs

use ahash::AHashMap;
use log::trace;

use crate::error::{Error, Result};
use crate::types::EntryId;
use crate::matcher::cpmerge::{PostingList, PostingSource};
use crate::utils::mmap::{read_u32_le, slice_at};

// cardinality, num_entries, num_keys, key_width
const BUCKET_HEADER_LEN: usize = 16;
// postings_start, postings_len
const RECORD_TAIL_LEN: usize = 8;

/// In-memory inverted index of all strings sharing one n-gram count.
#[derive(Debug)]
pub struct BucketBuilder {
    cardinality: usize,
    entries: Vec<EntryId>,
    postings: AHashMap<Vec<u8>, Vec<EntryId>>,
}

impl BucketBuilder {
    pub fn new(cardinality: usize) -> Self {
        Self {
            cardinality,
            entries: Vec::new(),
            postings: AHashMap::new(),
        }
    }

    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    pub fn num_keys(&self) -> usize {
        self.postings.len()
    }

    /// Register entry `id` under each of its n-gram keys. Ids must arrive
    /// in ascending order.
    pub fn add(&mut self, id: EntryId, keys: &[Vec<u8>]) {
        self.entries.push(id);
        for key in keys {
            self.postings.entry(key.clone()).or_default().push(id);
        }
    }

    /// Serialize the bucket section with keys in byte order.
    pub fn encode(&self, key_width: usize) -> Result<Vec<u8>> {
        let mut keys: Vec<(&Vec<u8>, &Vec<EntryId>)> = self.postings.iter().collect();
        keys.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let total_postings: usize = keys.iter().map(|(_, ids)| ids.len()).sum();
        let mut out = Vec::with_capacity(
            BUCKET_HEADER_LEN
                + self.entries.len() * 4
                + keys.len() * (key_width + RECORD_TAIL_LEN)
                + total_postings * 4,
        );

        for field in [self.cardinality, self.entries.len(), keys.len(), key_width] {
            out.extend_from_slice(&to_u32(field)?.to_le_bytes());
        }
        for id in &self.entries {
            out.extend_from_slice(&id.to_le_bytes());
        }

        let mut start = 0usize;
        for (key, ids) in &keys {
            if key.len() != key_width {
                return Err(Error::config(format!(
                    "n-gram key of {} bytes in an index of width {}", key.len(), key_width
                )));
            }
            out.extend_from_slice(key);
            out.extend_from_slice(&to_u32(start)?.to_le_bytes());
            out.extend_from_slice(&to_u32(ids.len())?.to_le_bytes());
            start += ids.len();
        }

        for (_, ids) in &keys {
            let mut sorted = (*ids).clone();
            sorted.sort_unstable();
            sorted.dedup();
            debug_assert_eq!(sorted.len(), ids.len());
            for id in sorted {
                out.extend_from_slice(&id.to_le_bytes());
            }
        }

        trace!("Encoded bucket {}: {} entries, {} keys, {} postings",
            self.cardinality, self.entries.len(), keys.len(), total_postings);
        Ok(out)
    }
}

fn ids_below(list: &PostingList<'_>, limit: u64) -> bool {
    list.iter().all(|id| (id as u64) < limit)
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::config(format!("bucket field {} exceeds u32", value)))
}

/// Offsets of a validated bucket section within its section bytes.
#[derive(Debug, Clone)]
pub struct BucketLayout {
    cardinality: usize,
    num_entries: usize,
    num_keys: usize,
    key_width: usize,
    records_at: usize,
    postings_at: usize,
    total_postings: usize,
}

impl BucketLayout {
    /// Check every structural invariant of a bucket section so lookups on
    /// it can index without further checks.
    pub fn parse(
        section: &[u8],
        cardinality: usize,
        expected_entries: usize,
        key_width: usize,
        total_entries: u64,
    ) -> Result<Self> {
        let stored_cardinality = read_u32_le(section, 0)? as usize;
        let num_entries = read_u32_le(section, 4)? as usize;
        let num_keys = read_u32_le(section, 8)? as usize;
        let stored_width = read_u32_le(section, 12)? as usize;

        if stored_cardinality != cardinality || num_entries != expected_entries {
            return Err(Error::corruption(format!(
                "bucket {} header disagrees with directory", cardinality
            )));
        }
        if stored_width != key_width {
            return Err(Error::corruption(format!(
                "bucket {} has key width {}, expected {}", cardinality, stored_width, key_width
            )));
        }

        let record_len = key_width + RECORD_TAIL_LEN;
        let records_at = BUCKET_HEADER_LEN + num_entries * 4;
        let postings_at = num_keys
            .checked_mul(record_len)
            .and_then(|len| len.checked_add(records_at))
            .ok_or_else(|| Error::corruption("bucket key table overflows"))?;
        if postings_at > section.len() || (section.len() - postings_at) % 4 != 0 {
            return Err(Error::corruption(format!("bucket {} has a malformed size", cardinality)));
        }
        let total_postings = (section.len() - postings_at) / 4;

        let layout = Self {
            cardinality,
            num_entries,
            num_keys,
            key_width,
            records_at,
            postings_at,
            total_postings,
        };
        layout.validate(section, total_entries)?;
        Ok(layout)
    }

    fn validate(&self, section: &[u8], total_entries: u64) -> Result<()> {
        let view = BucketView::new(self, section);

        let entries = view.entry_list()?;
        if !entries.is_strictly_ascending() || !ids_below(&entries, total_entries) {
            return Err(Error::corruption(format!("bucket {} entry list is invalid", self.cardinality)));
        }

        let mut expected_start = 0usize;
        let mut prev_key: Option<&[u8]> = None;
        for index in 0..self.num_keys {
            let (key, start, len) = view.record(index)?;
            if prev_key.map_or(false, |prev| prev >= key) {
                return Err(Error::corruption(format!("bucket {} keys are not sorted", self.cardinality)));
            }
            if start != expected_start || len == 0 {
                return Err(Error::corruption(format!("bucket {} posting ranges are not contiguous", self.cardinality)));
            }
            let list = view.list(start, len)?;
            if !list.is_strictly_ascending() || !list.iter().all(|id| entries.contains(id)) {
                return Err(Error::corruption(format!("bucket {} has an invalid posting list", self.cardinality)));
            }
            expected_start += len;
            prev_key = Some(key);
        }
        if expected_start != self.total_postings {
            return Err(Error::corruption(format!("bucket {} has trailing postings", self.cardinality)));
        }
        Ok(())
    }

    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    pub fn num_entries(&self) -> usize {
        self.num_entries
    }

    pub fn num_keys(&self) -> usize {
        self.num_keys
    }
}

/// A bucket layout paired with the section bytes it describes.
pub struct BucketView<'a> {
    layout: &'a BucketLayout,
    section: &'a [u8],
}

impl<'a> BucketView<'a> {
    pub fn new(layout: &'a BucketLayout, section: &'a [u8]) -> Self {
        Self { layout, section }
    }

    fn entry_list(&self) -> Result<PostingList<'a>> {
        let bytes = slice_at(self.section, BUCKET_HEADER_LEN as u64, (self.layout.num_entries * 4) as u64)?;
        Ok(PostingList::from_le_bytes(bytes))
    }

    fn record(&self, index: usize) -> Result<(&'a [u8], usize, usize)> {
        let record_len = self.layout.key_width + RECORD_TAIL_LEN;
        let at = self.layout.records_at + index * record_len;
        let key = slice_at(self.section, at as u64, self.layout.key_width as u64)?;
        let start = read_u32_le(self.section, at + self.layout.key_width)? as usize;
        let len = read_u32_le(self.section, at + self.layout.key_width + 4)? as usize;
        Ok((key, start, len))
    }

    fn list(&self, start: usize, len: usize) -> Result<PostingList<'a>> {
        let at = self.layout.postings_at + start * 4;
        let bytes = slice_at(self.section, at as u64, (len * 4) as u64)?;
        Ok(PostingList::from_le_bytes(bytes))
    }

    /// Binary search the sorted key records.
    pub fn lookup(&self, key: &[u8]) -> Result<PostingList<'a>> {
        if key.len() != self.layout.key_width {
            return Ok(PostingList::EMPTY);
        }
        let (mut lo, mut hi) = (0usize, self.layout.num_keys);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let (probe, start, len) = self.record(mid)?;
            match probe.cmp(key) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return self.list(start, len),
            }
        }
        Ok(PostingList::EMPTY)
    }
}

impl PostingSource for BucketView<'_> {
    fn cardinality(&self) -> usize {
        self.layout.cardinality
    }

    fn entries(&self) -> Result<PostingList<'_>> {
        self.entry_list()
    }

    fn postings(&self, key: &[u8]) -> Result<PostingList<'_>> {
        self.lookup(key)
    }
}
