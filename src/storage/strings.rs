// src/storage/strings.rs

use crate::error::{Error, Result};
use crate::types::EntryId;
use crate::utils::mmap::{read_u32_le, read_u64_le, slice_at};

/// Accumulates inserted strings in insertion order.
#[derive(Debug)]
pub struct StringTableBuilder {
    offsets: Vec<u64>,
    payload: Vec<u8>,
}

impl Default for StringTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StringTableBuilder {
    pub fn new() -> Self {
        Self { offsets: vec![0], payload: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `text`, returning its entry id.
    pub fn push(&mut self, text: &[u8]) -> Result<EntryId> {
        let id = EntryId::try_from(self.len())
            .map_err(|_| Error::config("index cannot hold more than u32::MAX strings"))?;
        self.payload.extend_from_slice(text);
        self.offsets.push(self.payload.len() as u64);
        Ok(id)
    }

    /// `count u32 | (count + 1) x u64 offsets | payload`
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.offsets.len() * 8 + self.payload.len());
        out.extend_from_slice(&(self.len() as u32).to_le_bytes());
        for offset in &self.offsets {
            out.extend_from_slice(&offset.to_le_bytes());
        }
        out.extend_from_slice(&self.payload);
        out
    }
}

/// Validated layout of an encoded string table; slices borrow from the
/// section bytes passed to [`StringTable::get`].
#[derive(Debug, Clone)]
pub struct StringTable {
    count: usize,
    payload_at: usize,
}

impl StringTable {
    pub fn parse(section: &[u8], expected: u64) -> Result<Self> {
        let count = read_u32_le(section, 0)? as usize;
        if count as u64 != expected {
            return Err(Error::corruption(format!(
                "string table holds {} strings, header says {}", count, expected
            )));
        }
        let payload_at = 4 + (count + 1) * 8;
        if section.len() < payload_at {
            return Err(Error::corruption("string table offsets are truncated"));
        }
        let payload_len = (section.len() - payload_at) as u64;

        let mut prev = read_u64_le(section, 4)?;
        if prev != 0 {
            return Err(Error::corruption("string table does not start at offset 0"));
        }
        for i in 1..=count {
            let next = read_u64_le(section, 4 + i * 8)?;
            if next < prev {
                return Err(Error::corruption(format!("string offsets decrease at entry {}", i)));
            }
            prev = next;
        }
        if prev != payload_len {
            return Err(Error::corruption(format!(
                "string payload is {} bytes, offsets end at {}", payload_len, prev
            )));
        }

        Ok(Self { count, payload_at })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn get<'a>(&self, section: &'a [u8], id: EntryId) -> Result<&'a [u8]> {
        let index = id as usize;
        if index >= self.count {
            return Err(Error::corruption(format!("entry id {} out of range", id)));
        }
        let start = read_u64_le(section, 4 + index * 8)?;
        let end = read_u64_le(section, 4 + (index + 1) * 8)?;
        slice_at(section, self.payload_at as u64 + start, end - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_strings_in_insertion_order() {
        let mut builder = StringTableBuilder::new();
        assert_eq!(builder.push(b"alpha").unwrap(), 0);
        assert_eq!(builder.push(b"").unwrap(), 1);
        assert_eq!(builder.push(&[0xFF, 0x00]).unwrap(), 2);
        let bytes = builder.encode();

        let table = StringTable::parse(&bytes, 3).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(&bytes, 0).unwrap(), b"alpha");
        assert_eq!(table.get(&bytes, 1).unwrap(), b"");
        assert_eq!(table.get(&bytes, 2).unwrap(), &[0xFF, 0x00]);
        assert!(table.get(&bytes, 3).unwrap_err().is_corruption());
    }

    #[test]
    fn default_builder_is_empty_and_usable() {
        let mut builder = StringTableBuilder::default();
        assert_eq!(builder.len(), 0);
        assert!(builder.is_empty());
        assert_eq!(builder.push(b"x").unwrap(), 0);

        let bytes = builder.encode();
        let table = StringTable::parse(&bytes, 1).unwrap();
        assert_eq!(table.get(&bytes, 0).unwrap(), b"x");
    }

    #[test]
    fn rejects_inconsistent_tables() {
        let mut builder = StringTableBuilder::new();
        builder.push(b"abc").unwrap();
        let bytes = builder.encode();

        assert!(StringTable::parse(&bytes, 2).unwrap_err().is_corruption());
        assert!(StringTable::parse(&bytes[..bytes.len() - 1], 1).unwrap_err().is_corruption());

        let mut bent = bytes.clone();
        bent[12] = 5;
        assert!(StringTable::parse(&bent, 1).unwrap_err().is_corruption());
    }
}
