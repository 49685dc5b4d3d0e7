// src/storage/reader.rs

use std::path::Path;
use std::sync::Arc;
use ahash::AHashSet;
use log::{info, debug, trace};
use once_cell::sync::OnceCell;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::config::subsystems::generator::GeneratorConfig;
use crate::config::subsystems::storage::StorageConfig;
use crate::matcher::{CpMerge, QueryParams, SimilarityCalculator, SimilarityMetric};
use crate::ngram::NGramGenerator;
use crate::types::{EntryId, IndexInfo};
use crate::utils::mmap::MmapFileHandler;

use super::bucket::{BucketLayout, BucketView};
use super::format::{crc32, Directory, Header, SectionRef, HEADER_LEN};
use super::metrics::{QueryMetrics, QueryMetricsStats};
use super::strings::StringTable;

/// Read-only handle on an index file.
///
/// Clones share one memory map and one set of lazily validated buckets;
/// closing a handle only detaches that handle.
#[derive(Debug, Clone)]
pub struct Reader {
    inner: Option<Arc<ReaderInner>>,
}

#[derive(Debug)]
struct ReaderInner {
    file: MmapFileHandler,
    header: Header,
    directory: Directory,
    strings: StringTable,
    buckets: Vec<OnceCell<BucketLayout>>,
    generator: NGramGenerator,
    storage: StorageConfig,
    metrics: QueryMetrics,
}

impl Reader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_config(path, &StorageConfig::default())
    }

    pub fn with_config<P: AsRef<Path>>(path: P, storage: &StorageConfig) -> Result<Self> {
        storage.validate()?;
        let file = MmapFileHandler::open(&path, HEADER_LEN)?;
        let data = file.content();

        let header = Header::decode(data)?;
        let directory_bytes = file.region(header.directory_offset, header.directory_len)?;
        if crc32(directory_bytes) != header.directory_crc {
            return Err(Error::corruption("directory checksum mismatch"));
        }
        let directory = Directory::decode(directory_bytes)?;
        directory.validate(&header, file.size() as u64)?;

        let string_bytes = section_bytes(&file, &directory.strings, storage.verify_checksums, "string table")?;
        let strings = StringTable::parse(string_bytes, header.num_entries)?;

        let generator = NGramGenerator::from_config(GeneratorConfig {
            ngram_size: header.ngram_size as usize,
            use_markers: header.use_markers,
            encoding: header.encoding,
        })?;
        let buckets = directory.buckets.iter().map(|_| OnceCell::new()).collect();

        info!("Opened index {:?}: {} entries in {} buckets (n={}, markers={}, encoding={})",
            file.path(), header.num_entries, header.num_buckets,
            header.ngram_size, header.use_markers, header.encoding.as_str());

        Ok(Self {
            inner: Some(Arc::new(ReaderInner {
                file,
                header,
                directory,
                strings,
                buckets,
                generator,
                storage: storage.clone(),
                metrics: QueryMetrics::new(),
            })),
        })
    }

    fn inner(&self) -> Result<&ReaderInner> {
        self.inner.as_deref().ok_or(Error::DatabaseNotOpen)
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// Every stored string whose similarity to `query` reaches the threshold,
    /// ordered by n-gram count and then insertion order.
    ///
    /// Results are decoded lossily: a byte-mode entry stored through
    /// [`Writer::insert_bytes`](crate::Writer::insert_bytes) that is not valid
    /// UTF-8 comes back with replacement characters. Use
    /// [`Reader::retrieve_bytes`] to get such entries exactly as inserted.
    pub fn retrieve(&self, query: &str, params: &QueryParams) -> Result<Vec<String>> {
        Ok(self.retrieve_bytes(query.as_bytes(), params)?
            .into_iter()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .collect())
    }

    pub fn retrieve_bytes(&self, query: &[u8], params: &QueryParams) -> Result<Vec<Vec<u8>>> {
        let inner = self.inner()?;
        let ids = inner.track(inner.search(query, params, false))?;
        let strings = inner.unique_strings(&ids)?;
        inner.metrics.record_emitted(strings.len());
        Ok(strings.into_iter().map(<[u8]>::to_vec).collect())
    }

    /// Whether any stored string matches, stopping at the first bucket
    /// that produces a match.
    pub fn check(&self, query: &str, params: &QueryParams) -> Result<bool> {
        let inner = self.inner()?;
        let ids = inner.track(inner.search(query.as_bytes(), params, true))?;
        Ok(!ids.is_empty())
    }

    /// Run `retrieve` for many queries in parallel over this handle.
    pub fn retrieve_batch<S: AsRef<str> + Sync>(&self, queries: &[S], params: &QueryParams) -> Result<Vec<Vec<String>>> {
        self.inner()?;
        debug!("Running batch of {} queries ({} >= {})", queries.len(), params.measure, params.threshold);
        queries
            .par_iter()
            .map(|query| self.retrieve(query.as_ref(), params))
            .collect()
    }

    pub fn info(&self) -> Result<IndexInfo> {
        let inner = self.inner()?;
        Ok(IndexInfo {
            version: inner.header.version,
            ngram_size: inner.header.ngram_size as usize,
            use_markers: inner.header.use_markers,
            encoding: inner.header.encoding,
            num_entries: inner.header.num_entries,
            num_buckets: inner.directory.buckets.len(),
            max_size: inner.header.max_size as usize,
            file_size: inner.file.size() as u64,
        })
    }

    pub fn metrics(&self) -> Result<QueryMetricsStats> {
        Ok(self.inner()?.metrics.get_stats())
    }

    /// The stored string with insertion index `id`.
    pub fn get(&self, id: EntryId) -> Result<Vec<u8>> {
        let inner = self.inner()?;
        Ok(inner.string(id)?.to_vec())
    }

    pub fn close(&mut self) -> Result<()> {
        match self.inner.take() {
            Some(inner) => {
                debug!("Closed reader handle on {:?} ({} handles remain)",
                    inner.file.path(), Arc::strong_count(&inner) - 1);
                Ok(())
            },
            None => Err(Error::DatabaseAlreadyClosed),
        }
    }
}

fn section_bytes<'a>(file: &'a MmapFileHandler, section: &SectionRef, verify: bool, what: &str) -> Result<&'a [u8]> {
    let bytes = file.region(section.offset, section.len)?;
    if verify && crc32(bytes) != section.crc32 {
        return Err(Error::corruption(format!("{} checksum mismatch", what)));
    }
    Ok(bytes)
}

impl ReaderInner {
    fn track<T>(&self, result: Result<T>) -> Result<T> {
        self.metrics.increment_queries();
        if result.is_err() {
            self.metrics.increment_failed_queries();
        }
        result
    }

    fn string_section(&self) -> Result<&[u8]> {
        self.file.region(self.directory.strings.offset, self.directory.strings.len)
    }

    fn string(&self, id: EntryId) -> Result<&[u8]> {
        self.strings.get(self.string_section()?, id)
    }

    /// Validate bucket `index` on first use.
    fn bucket(&self, index: usize) -> Result<BucketView<'_>> {
        let entry = &self.directory.buckets[index];
        let section = self.file.region(entry.section.offset, entry.section.len)?;
        let layout = self.buckets[index].get_or_try_init(|| {
            if self.storage.verify_checksums && crc32(section) != entry.section.crc32 {
                return Err(Error::corruption(format!("bucket {} checksum mismatch", entry.cardinality)));
            }
            let layout = BucketLayout::parse(
                section,
                entry.cardinality as usize,
                entry.num_entries as usize,
                self.generator.key_width(),
                self.header.num_entries,
            )?;
            debug!("Loaded bucket {} ({} entries, {} keys)",
                entry.cardinality, layout.num_entries(), layout.num_keys());
            Ok(layout)
        })?;
        Ok(BucketView::new(layout, section))
    }

    fn search(&self, query: &[u8], params: &QueryParams, first_only: bool) -> Result<Vec<EntryId>> {
        let calc = SimilarityCalculator::new(*params)?;
        let keys = self.generator.extract_keys(query)?;
        let q = keys.len();
        let range = calc.size_range(q, self.header.max_size as usize);
        let engine = CpMerge::new(&calc);

        let mut ids = Vec::new();
        if range.is_empty() {
            trace!("No bucket sizes fit query of {} ngrams", q);
            return Ok(ids);
        }

        for (index, entry) in self.directory.buckets.iter().enumerate() {
            let size = entry.cardinality as usize;
            if size < range.min {
                continue;
            }
            if size > range.max {
                break;
            }

            let view = self.bucket(index)?;
            let Some(outcome) = engine.search(&keys, &view)? else {
                self.metrics.record_bucket_skipped();
                continue;
            };
            self.metrics.record_bucket_visit(outcome.candidates, outcome.verified);

            for id in outcome.matches {
                if calc.measure() == SimilarityMetric::Exact && self.string(id)? != query {
                    continue;
                }
                ids.push(id);
                if first_only {
                    return Ok(ids);
                }
            }
        }
        Ok(ids)
    }

    /// Resolve ids to strings, dropping byte-identical repeats.
    fn unique_strings(&self, ids: &[EntryId]) -> Result<Vec<&[u8]>> {
        let mut seen = AHashSet::with_capacity(ids.len());
        let mut out = Vec::with_capacity(ids.len());
        for &id in ids {
            let text = self.string(id)?;
            if seen.insert(text) {
                out.push(text);
            }
        }
        Ok(out)
    }
}
