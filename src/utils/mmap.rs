use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use memmap2::Mmap;
use log::debug;
use crate::error::{Error, Result};

/// Read-only memory map of a whole file, cheap to clone.
#[derive(Clone)]
pub struct MmapFileHandler {
    mapped_file: Arc<Mmap>,
    file_size: usize,
    file_path: PathBuf,
}

impl std::fmt::Debug for MmapFileHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapFileHandler")
            .field("file_path", &self.file_path)
            .field("file_size", &self.file_size)
            .finish()
    }
}

impl MmapFileHandler {
    /// Map `path`, refusing files shorter than `min_len` bytes.
    pub fn open<P: AsRef<Path>>(path: P, min_len: usize) -> Result<Self> {
        let file_path = path.as_ref().to_path_buf();
        let file = File::open(&file_path)?;
        let file_size = file.metadata()?.len() as usize;
        if file_size < min_len {
            return Err(Error::corruption(format!(
                "{:?} is {} bytes, expected at least {}", file_path, file_size, min_len
            )));
        }

        // The file is opened read-only and never resized while mapped.
        let mapped_file = unsafe { Mmap::map(&file)? };

        debug!("Created memory-mapped file handler for {:?} ({} bytes)", file_path, file_size);

        Ok(Self {
            mapped_file: Arc::new(mapped_file),
            file_size,
            file_path,
        })
    }

    /// Get a reference to the entire file content
    pub fn content(&self) -> &[u8] {
        &self.mapped_file[..self.file_size]
    }

    pub fn size(&self) -> usize {
        self.file_size
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Bounds-checked slice `[offset, offset + len)` of the file.
    pub fn region(&self, offset: u64, len: u64) -> Result<&[u8]> {
        slice_at(self.content(), offset, len)
    }
}

/// Bounds-checked sub-slice; overflow and out-of-range requests are
/// reported as index corruption.
pub fn slice_at(data: &[u8], offset: u64, len: u64) -> Result<&[u8]> {
    let start = usize::try_from(offset).ok();
    let end = offset.checked_add(len).and_then(|e| usize::try_from(e).ok());
    match (start, end) {
        (Some(start), Some(end)) if end <= data.len() => Ok(&data[start..end]),
        _ => Err(Error::corruption(format!(
            "region {}+{} lies outside {} bytes", offset, len, data.len()
        ))),
    }
}

pub fn read_u32_le(data: &[u8], at: usize) -> Result<u32> {
    let bytes = slice_at(data, at as u64, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub fn read_u64_le(data: &[u8], at: usize) -> Result<u64> {
    let bytes = slice_at(data, at as u64, 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(buf))
}
