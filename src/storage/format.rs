// src/storage/format.rs

use bincode::Options;
use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::config::subsystems::generator::{EncodingMode, MAX_NGRAM_SIZE};
use crate::utils::mmap::{read_u32_le, read_u64_le};

pub const MAGIC: [u8; 4] = *b"SGDB";
pub const BYTE_ORDER_CHECK: u32 = 0x6244_5371;
pub const FORMAT_VERSION: u32 = 1;
pub const HEADER_LEN: usize = 72;

// Header bytes covered by header_crc
const HEADER_CRC_SPAN: usize = 64;

const FLAG_MARKERS: u32 = 1 << 0;
const FLAG_UNICODE: u32 = 1 << 1;
const KNOWN_FLAGS: u32 = FLAG_MARKERS | FLAG_UNICODE;

pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Fixed-size file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub ngram_size: u32,
    pub use_markers: bool,
    pub encoding: EncodingMode,
    pub num_entries: u64,
    pub max_size: u32,
    pub num_buckets: u32,
    pub directory_offset: u64,
    pub directory_len: u64,
    pub directory_crc: u32,
}

impl Header {
    pub fn new(ngram_size: usize, use_markers: bool, encoding: EncodingMode) -> Self {
        Self {
            version: FORMAT_VERSION,
            ngram_size: ngram_size as u32,
            use_markers,
            encoding,
            num_entries: 0,
            max_size: 0,
            num_buckets: 0,
            directory_offset: 0,
            directory_len: 0,
            directory_crc: 0,
        }
    }

    fn flags(&self) -> u32 {
        let mut flags = 0;
        if self.use_markers {
            flags |= FLAG_MARKERS;
        }
        if self.encoding.is_unicode() {
            flags |= FLAG_UNICODE;
        }
        flags
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..8].copy_from_slice(&BYTE_ORDER_CHECK.to_le_bytes());
        buf[8..12].copy_from_slice(&self.version.to_le_bytes());
        buf[12..16].copy_from_slice(&(HEADER_LEN as u32).to_le_bytes());
        buf[16..20].copy_from_slice(&self.ngram_size.to_le_bytes());
        buf[20..24].copy_from_slice(&self.flags().to_le_bytes());
        buf[24..32].copy_from_slice(&self.num_entries.to_le_bytes());
        buf[32..36].copy_from_slice(&self.max_size.to_le_bytes());
        buf[36..40].copy_from_slice(&self.num_buckets.to_le_bytes());
        buf[40..48].copy_from_slice(&self.directory_offset.to_le_bytes());
        buf[48..56].copy_from_slice(&self.directory_len.to_le_bytes());
        buf[56..60].copy_from_slice(&self.directory_crc.to_le_bytes());
        // 60..64 reserved
        let header_crc = crc32(&buf[..HEADER_CRC_SPAN]);
        buf[64..68].copy_from_slice(&header_crc.to_le_bytes());
        // 68..72 reserved
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::corruption(format!("header truncated ({} bytes)", bytes.len())));
        }
        if bytes[0..4] != MAGIC {
            return Err(Error::corruption("not a simgram index (magic mismatch)"));
        }
        let order = read_u32_le(bytes, 4)?;
        if order != BYTE_ORDER_CHECK {
            return Err(Error::corruption(format!("byte order check failed: {:#010x}", order)));
        }
        let version = read_u32_le(bytes, 8)?;
        if version != FORMAT_VERSION {
            return Err(Error::corruption(format!(
                "unsupported format version {} (expected {})", version, FORMAT_VERSION
            )));
        }
        let header_len = read_u32_le(bytes, 12)?;
        if header_len as usize != HEADER_LEN {
            return Err(Error::corruption(format!("unexpected header length {}", header_len)));
        }
        let stored_crc = read_u32_le(bytes, 64)?;
        if crc32(&bytes[..HEADER_CRC_SPAN]) != stored_crc {
            return Err(Error::corruption("header checksum mismatch"));
        }

        let ngram_size = read_u32_le(bytes, 16)?;
        if ngram_size == 0 || ngram_size as usize > MAX_NGRAM_SIZE {
            return Err(Error::corruption(format!("invalid ngram size {}", ngram_size)));
        }
        let flags = read_u32_le(bytes, 20)?;
        if flags & !KNOWN_FLAGS != 0 {
            return Err(Error::corruption(format!("unknown header flags {:#x}", flags)));
        }

        Ok(Self {
            version,
            ngram_size,
            use_markers: flags & FLAG_MARKERS != 0,
            encoding: EncodingMode::from_flag(flags & FLAG_UNICODE != 0),
            num_entries: read_u64_le(bytes, 24)?,
            max_size: read_u32_le(bytes, 32)?,
            num_buckets: read_u32_le(bytes, 36)?,
            directory_offset: read_u64_le(bytes, 40)?,
            directory_len: read_u64_le(bytes, 48)?,
            directory_crc: read_u32_le(bytes, 56)?,
        })
    }
}

/// Location and checksum of a section of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRef {
    pub offset: u64,
    pub len: u64,
    pub crc32: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketDirEntry {
    pub cardinality: u32,
    pub num_entries: u32,
    pub num_keys: u32,
    pub section: SectionRef,
}

/// Trailing table of contents, serialized with bincode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    pub strings: SectionRef,
    pub buckets: Vec<BucketDirEntry>,
}

fn directory_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
}

impl Directory {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(directory_options().serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        directory_options()
            .with_limit(bytes.len() as u64)
            .deserialize(bytes)
            .map_err(|e| Error::corruption(format!("directory is unreadable: {}", e)))
    }

    /// Structural checks against the header and the file length.
    pub fn validate(&self, header: &Header, file_len: u64) -> Result<()> {
        let in_file = |s: &SectionRef| {
            s.offset >= HEADER_LEN as u64
                && s.offset.checked_add(s.len).map_or(false, |end| end <= header.directory_offset)
        };

        if !in_file(&self.strings) {
            return Err(Error::corruption("string table lies outside the data area"));
        }
        if header.directory_offset.checked_add(header.directory_len).map_or(true, |end| end > file_len) {
            return Err(Error::corruption("directory lies outside the file"));
        }
        if self.buckets.len() != header.num_buckets as usize {
            return Err(Error::corruption(format!(
                "header lists {} buckets, directory has {}", header.num_buckets, self.buckets.len()
            )));
        }

        let mut total = 0u64;
        let mut prev = 0u32;
        for bucket in &self.buckets {
            if bucket.cardinality <= prev {
                return Err(Error::corruption("bucket directory is not strictly ordered by size"));
            }
            if !in_file(&bucket.section) {
                return Err(Error::corruption(format!("bucket {} lies outside the data area", bucket.cardinality)));
            }
            prev = bucket.cardinality;
            total += bucket.num_entries as u64;
        }
        if total != header.num_entries {
            return Err(Error::corruption(format!(
                "buckets hold {} entries, header says {}", total, header.num_entries
            )));
        }
        if prev != header.max_size {
            return Err(Error::corruption(format!(
                "largest bucket is {}, header says {}", prev, header.max_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        Header {
            num_entries: 3,
            max_size: 9,
            num_buckets: 2,
            directory_offset: 300,
            directory_len: 40,
            directory_crc: 0xDEAD_BEEF,
            ..Header::new(3, true, EncodingMode::Unicode)
        }
    }

    #[test]
    fn header_round_trip() {
        let header = sample_header();
        let bytes = header.encode();
        assert_eq!(&bytes[0..4], b"SGDB");
        assert_eq!(Header::decode(&bytes).unwrap(), header);
    }

    #[test]
    fn header_rejects_damage() {
        let good = sample_header().encode();

        let mut bad_magic = good;
        bad_magic[0] = b'X';
        assert!(Header::decode(&bad_magic).unwrap_err().is_corruption());

        let mut swapped = good;
        swapped[4..8].copy_from_slice(&BYTE_ORDER_CHECK.to_be_bytes());
        assert!(Header::decode(&swapped).unwrap_err().is_corruption());

        let mut future = good;
        future[8..12].copy_from_slice(&2u32.to_le_bytes());
        assert!(Header::decode(&future).unwrap_err().is_corruption());

        let mut flipped = good;
        flipped[30] ^= 0x01;
        assert!(Header::decode(&flipped).unwrap_err().is_corruption());

        assert!(Header::decode(&good[..40]).unwrap_err().is_corruption());
    }

    #[test]
    fn directory_validation() {
        let header = sample_header();
        let section = |offset| SectionRef { offset, len: 20, crc32: 0 };
        let dir = Directory {
            strings: section(72),
            buckets: vec![
                BucketDirEntry { cardinality: 4, num_entries: 2, num_keys: 6, section: section(100) },
                BucketDirEntry { cardinality: 9, num_entries: 1, num_keys: 9, section: section(200) },
            ],
        };
        dir.validate(&header, 400).unwrap();
        assert_eq!(Directory::decode(&dir.encode().unwrap()).unwrap(), dir);

        let mut unordered = dir.clone();
        unordered.buckets.swap(0, 1);
        assert!(unordered.validate(&header, 400).unwrap_err().is_corruption());

        let mut escaped = dir.clone();
        escaped.buckets[1].section.offset = 290;
        assert!(escaped.validate(&header, 400).unwrap_err().is_corruption());

        assert!(dir.validate(&header, 320).unwrap_err().is_corruption());
        assert!(Directory::decode(&[0xFF; 3]).unwrap_err().is_corruption());
    }
}
