// src/storage/writer.rs

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use ahash::AHashMap;
use log::{info, debug, trace, warn};

use crate::error::{Error, Result};
use crate::config::subsystems::generator::GeneratorConfig;
use crate::config::subsystems::storage::StorageConfig;
use crate::ngram::NGramGenerator;
use crate::types::EntryId;

use super::bucket::BucketBuilder;
use super::format::{crc32, BucketDirEntry, Directory, Header, SectionRef, HEADER_LEN};
use super::strings::StringTableBuilder;

/// Append-only builder of an index file.
///
/// Strings are indexed in memory and the file is laid out on [`Writer::close`].
/// Dropping an open writer closes it, logging any failure.
#[derive(Debug)]
pub struct Writer {
    path: PathBuf,
    state: Option<WriterState>,
}

#[derive(Debug)]
struct WriterState {
    file: File,
    generator: NGramGenerator,
    storage: StorageConfig,
    strings: StringTableBuilder,
    buckets: AHashMap<usize, BucketBuilder>,
}

impl Writer {
    /// Create a new index at `path`.
    pub fn open<P: AsRef<Path>>(path: P, ngram_size: usize, use_markers: bool, unicode_mode: bool) -> Result<Self> {
        let generator = GeneratorConfig::new(ngram_size, use_markers, unicode_mode);
        Self::with_config(path, &generator, &StorageConfig::default())
    }

    pub fn with_config<P: AsRef<Path>>(path: P, generator: &GeneratorConfig, storage: &StorageConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        storage.validate()?;
        let generator = NGramGenerator::from_config(generator.clone())?;

        let mut options = OpenOptions::new();
        options.write(true);
        if storage.overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let mut file = options.open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => Error::DatabaseExists(path.clone()),
            _ => Error::Io(e),
        })?;

        // Zeroed placeholder; a file whose writer never finished has no magic.
        file.write_all(&[0u8; HEADER_LEN])?;

        info!("Opened index writer at {:?} (n={}, markers={}, encoding={})",
            path, generator.ngram_size(), generator.use_markers(), generator.encoding().as_str());

        Ok(Self {
            path,
            state: Some(WriterState {
                file,
                generator,
                storage: storage.clone(),
                strings: StringTableBuilder::new(),
                buckets: AHashMap::new(),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Number of strings inserted so far.
    pub fn len(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.strings.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert(&mut self, text: &str) -> Result<EntryId> {
        self.insert_bytes(text.as_bytes())
    }

    /// Index raw bytes. In unicode mode they must be valid UTF-8.
    pub fn insert_bytes(&mut self, text: &[u8]) -> Result<EntryId> {
        let state = self.state.as_mut().ok_or(Error::DatabaseAlreadyClosed)?;

        let keys = state.generator.extract_keys(text)?;
        let id = state.strings.push(text)?;
        let cardinality = keys.len();
        state.buckets
            .entry(cardinality)
            .or_insert_with(|| BucketBuilder::new(cardinality))
            .add(id, &keys);

        trace!("Inserted entry {} with {} ngrams", id, cardinality);
        Ok(id)
    }

    /// Write the index and release the file.
    pub fn close(&mut self) -> Result<()> {
        let state = self.state.take().ok_or(Error::DatabaseAlreadyClosed)?;
        state.finish(&self.path)
    }
}

impl WriterState {
    fn finish(self, path: &Path) -> Result<()> {
        let WriterState { file, generator, storage, strings, buckets } = self;
        let mut out = BufWriter::new(file);
        out.seek(SeekFrom::Start(HEADER_LEN as u64))?;
        let mut offset = HEADER_LEN as u64;

        let mut write_section = |out: &mut BufWriter<File>, bytes: &[u8]| -> Result<SectionRef> {
            out.write_all(bytes)?;
            let section = SectionRef { offset, len: bytes.len() as u64, crc32: crc32(bytes) };
            offset += bytes.len() as u64;
            Ok(section)
        };

        let string_section = write_section(&mut out, &strings.encode())?;

        let mut ordered: Vec<BucketBuilder> = buckets.into_iter().map(|(_, bucket)| bucket).collect();
        ordered.sort_unstable_by_key(|b| b.cardinality());

        let key_width = generator.key_width();
        let mut bucket_entries = Vec::with_capacity(ordered.len());
        for bucket in &ordered {
            let section = write_section(&mut out, &bucket.encode(key_width)?)?;
            debug!("Wrote bucket {} ({} entries, {} keys, {} bytes)",
                bucket.cardinality(), bucket.num_entries(), bucket.num_keys(), section.len);
            bucket_entries.push(BucketDirEntry {
                cardinality: bucket.cardinality() as u32,
                num_entries: bucket.num_entries() as u32,
                num_keys: bucket.num_keys() as u32,
                section,
            });
        }

        let directory = Directory { strings: string_section, buckets: bucket_entries };
        let directory_bytes = directory.encode()?;
        let directory_section = write_section(&mut out, &directory_bytes)?;

        let header = Header {
            num_entries: strings.len() as u64,
            max_size: ordered.last().map_or(0, |b| b.cardinality() as u32),
            num_buckets: ordered.len() as u32,
            directory_offset: directory_section.offset,
            directory_len: directory_section.len,
            directory_crc: directory_section.crc32,
            ..Header::new(generator.ngram_size(), generator.use_markers(), generator.encoding())
        };
        out.seek(SeekFrom::Start(0))?;
        out.write_all(&header.encode())?;
        out.flush()?;

        let file = out.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        if storage.sync_on_close {
            file.sync_all()?;
        }

        info!("Closed index writer at {:?}: {} entries in {} buckets ({} bytes)",
            path, header.num_entries, header.num_buckets, directory_section.offset + directory_section.len);
        Ok(())
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            if let Err(e) = state.finish(&self.path) {
                warn!("Failed to finalize index {:?} on drop: {}", self.path, e);
            }
        }
    }
}
