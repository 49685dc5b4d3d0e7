use super::{Result, TextParser};
use crate::config::subsystems::generator::EncodingMode;

/// Byte-oriented parser: every byte is one code unit, any input is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteParser;

impl TextParser for ByteParser {
    fn code_units(&self, text: &[u8]) -> Result<Vec<u32>> {
        Ok(text.iter().map(|&b| b as u32).collect())
    }

    fn validate(&self, _text: &[u8]) -> Result<()> {
        Ok(())
    }

    fn mode(&self) -> EncodingMode {
        EncodingMode::Bytes
    }
}
