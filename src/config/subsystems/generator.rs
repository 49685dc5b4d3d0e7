// src/config/subsystems/generator.rs

use serde::{Serialize, Deserialize};
use crate::error::{Error, Result};
use crate::config::FromIni;

/// Largest n-gram size accepted by the generator.
pub const MAX_NGRAM_SIZE: usize = 32;

/// How input text is split into code units before n-gram extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncodingMode {
    /// One unit per byte.
    Bytes,
    /// One unit per Unicode scalar value; input must be UTF-8.
    Unicode,
}

impl EncodingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncodingMode::Bytes => "bytes",
            EncodingMode::Unicode => "unicode",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().trim_matches('"').to_lowercase().as_str() {
            "bytes" | "byte" => Some(Self::Bytes),
            "unicode" | "utf8" | "utf-8" => Some(Self::Unicode),
            _ => None,
        }
    }

    pub fn from_flag(unicode: bool) -> Self {
        if unicode { Self::Unicode } else { Self::Bytes }
    }

    pub fn is_unicode(&self) -> bool {
        matches!(self, EncodingMode::Unicode)
    }
}

impl Default for EncodingMode {
    fn default() -> Self {
        Self::Bytes
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    // Number of code units per n-gram
    pub ngram_size: usize,

    // Pad both ends with n-1 marker units
    pub use_markers: bool,

    pub encoding: EncodingMode,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            ngram_size: 3,
            use_markers: false,
            encoding: EncodingMode::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn new(ngram_size: usize, use_markers: bool, unicode_mode: bool) -> Self {
        Self {
            ngram_size,
            use_markers,
            encoding: EncodingMode::from_flag(unicode_mode),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ngram_size == 0 {
            return Err(Error::Config(
                "ngram_size must be greater than 0".to_string()
            ));
        }
        if self.ngram_size > MAX_NGRAM_SIZE {
            return Err(Error::Config(
                format!("ngram_size must not exceed {} (got {})", MAX_NGRAM_SIZE, self.ngram_size)
            ));
        }
        Ok(())
    }
}

impl FromIni for GeneratorConfig {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        if section_name != "generator" {
            return None;
        }

        match key {
            "ngram_size" => {
                match value.parse() {
                    Ok(size) if size > 0 && size <= MAX_NGRAM_SIZE => {
                        self.ngram_size = size;
                        Some(Ok(()))
                    },
                    _ => Some(Err(Error::Config(
                        format!("Invalid ngram_size (must be 1..={}): {}", MAX_NGRAM_SIZE, value)
                    ))),
                }
            },
            "use_markers" => {
                match value.parse() {
                    Ok(flag) => {
                        self.use_markers = flag;
                        Some(Ok(()))
                    },
                    Err(_) => Some(Err(Error::Config(
                        format!("Invalid use_markers value (must be true/false): {}", value)
                    ))),
                }
            },
            "encoding" => {
                match EncodingMode::from_str(value) {
                    Some(mode) => {
                        self.encoding = mode;
                        Some(Ok(()))
                    },
                    None => Some(Err(Error::Config(
                        format!("Invalid encoding (must be 'bytes' or 'unicode'): {}", value)
                    ))),
                }
            },
            _ => None,
        }
    }
}
