pub mod subsystems;

use serde::{Serialize, Deserialize};
use std::path::Path;
use std::fs;
use crate::error::{Error, Result};
use log::{warn, trace};

pub trait FromIni {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimgramConfig {
    pub generator: subsystems::GeneratorConfig,
    pub matcher: subsystems::MatcherConfig,
    pub storage: subsystems::StorageConfig,
}

impl SimgramConfig {
    pub fn validate(&self) -> Result<()> {
        self.generator.validate()?;
        self.matcher.validate()?;
        self.storage.validate()?;
        Ok(())
    }

    pub fn from_ini<P: AsRef<Path>>(path: P) -> Result<Self> {
        trace!("Loading configuration from: {:?}", path.as_ref());
        let content = fs::read_to_string(&path)?;
        Self::from_ini_str(&content)
    }

    /// Parse INI text. Unknown sections and keys are logged and skipped;
    /// malformed values are errors.
    pub fn from_ini_str(content: &str) -> Result<Self> {
        let mut config = Self::default();
        let mut current_section = String::new();

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                current_section = line[1..line.len()-1].trim().to_string();
                trace!("  Line {}: Found section: [{}]", line_num + 1, current_section);
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(Error::Config(
                    format!("Line {}: expected key = value, found '{}'", line_num + 1, line)
                ));
            };
            let key = key.trim();
            let value = value.trim();

            let handled = match current_section.as_str() {
                "generator" => config.generator.from_ini_section(&current_section, key, value),
                "matcher" => config.matcher.from_ini_section(&current_section, key, value),
                "storage" => config.storage.from_ini_section(&current_section, key, value),
                _ => None,
            };

            match handled {
                Some(Ok(())) => {},
                Some(Err(e)) => {
                    return Err(Error::Config(format!("Line {}: {}", line_num + 1, e)));
                },
                None => {
                    warn!("Unrecognized config key: {}={} in section [{}]", key, value, current_section);
                },
            }
        }

        config.validate()?;
        Ok(config)
    }
}
