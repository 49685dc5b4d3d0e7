// src/config/subsystems/storage.rs

use serde::{Serialize, Deserialize};
use crate::error::{Error, Result};
use crate::config::FromIni;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    // Check section CRCs when a reader opens the file and loads buckets
    pub verify_checksums: bool,

    // fsync the index file when a writer is closed
    pub sync_on_close: bool,

    // Replace an existing file instead of refusing to open a writer
    pub overwrite: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            verify_checksums: true,
            sync_on_close: true,
            overwrite: false,
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    value.trim().parse().map_err(|_| Error::Config(
        format!("Invalid {} value (must be true/false): {}", key, value)
    ))
}

impl FromIni for StorageConfig {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        if section_name != "storage" {
            return None;
        }

        let target = match key {
            "verify_checksums" => &mut self.verify_checksums,
            "sync_on_close" | "use_fsync" => &mut self.sync_on_close,
            "overwrite" => &mut self.overwrite,
            _ => return None,
        };

        Some(parse_flag(key, value).map(|flag| *target = flag))
    }
}
