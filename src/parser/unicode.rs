use log::trace;

use super::{ParserError, Result, TextParser};
use crate::config::subsystems::generator::EncodingMode;

/// Codepoint-oriented parser for UTF-8 input.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeParser;

impl UnicodeParser {
    fn decode(text: &[u8]) -> Result<&str> {
        std::str::from_utf8(text).map_err(|e| {
            trace!("Rejecting malformed UTF-8 input of {} bytes", text.len());
            ParserError::InvalidUtf8 {
                position: e.valid_up_to(),
                reason: e.to_string(),
            }
        })
    }
}

impl TextParser for UnicodeParser {
    fn code_units(&self, text: &[u8]) -> Result<Vec<u32>> {
        let decoded = Self::decode(text)?;
        Ok(decoded.chars().map(|c| c as u32).collect())
    }

    fn validate(&self, text: &[u8]) -> Result<()> {
        Self::decode(text).map(|_| ())
    }

    fn mode(&self) -> EncodingMode {
        EncodingMode::Unicode
    }
}
