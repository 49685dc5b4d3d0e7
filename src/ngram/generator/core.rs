// src/ngram/generator/core.rs

use log::debug;

use crate::error::Result;
use crate::parser::{CodeUnitParser, TextParser};
use crate::config::subsystems::generator::{GeneratorConfig, EncodingMode};
use crate::ngram::types::{NGram, key_width};

/// Turns strings into numbered n-gram sets.
///
/// The generator is pure: the same input always yields the same n-grams in
/// the same order, so writers and readers built from the same configuration
/// agree on every key.
#[derive(Debug, Clone)]
pub struct NGramGenerator<P: TextParser = CodeUnitParser> {
   pub(crate) parser: P,
   pub(crate) config: GeneratorConfig,
}

impl NGramGenerator<CodeUnitParser> {
    /// Build a generator whose parser matches the configured encoding.
    pub fn from_config(config: GeneratorConfig) -> Result<Self> {
        let parser = CodeUnitParser::for_mode(config.encoding);
        Self::new(parser, config)
    }
}

impl<P: TextParser> NGramGenerator<P> {
    pub fn new(parser: P, config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        if parser.mode() != config.encoding {
            debug!("Parser mode {} overrides configured encoding {}",
                parser.mode().as_str(), config.encoding.as_str());
        }
        let config = GeneratorConfig { encoding: parser.mode(), ..config };
        Ok(Self { parser, config })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn ngram_size(&self) -> usize {
        self.config.ngram_size
    }

    pub fn use_markers(&self) -> bool {
        self.config.use_markers
    }

    pub fn encoding(&self) -> EncodingMode {
        self.config.encoding
    }

    pub fn key_width(&self) -> usize {
        key_width(self.config.ngram_size)
    }

    /// Extract the numbered n-grams of `text`.
    pub fn extract(&self, text: &[u8]) -> Result<Vec<NGram>> {
        let units = self.parser.code_units(text)?;
        Ok(self.ngrams_from_units(&units))
    }

    /// Extract n-grams and encode each as its index key, sorted and unique.
    pub fn extract_keys(&self, text: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut keys: Vec<Vec<u8>> = self.extract(text)?
            .iter()
            .map(NGram::key)
            .collect();
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }

    /// Number of n-grams `text` produces, without materialising them.
    pub fn count(&self, text: &[u8]) -> Result<usize> {
        let units = self.parser.code_units(text)?;
        Ok(self.padded_len(units.len()) + 1 - self.config.ngram_size)
    }
}
