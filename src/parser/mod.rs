pub mod bytes;
pub mod unicode;

use thiserror::Error;
use crate::config::subsystems::generator::EncodingMode;

#[derive(Debug, Error)]
pub enum ParserError {
   #[error("Invalid UTF-8 at byte {position}: {reason}")]
   InvalidUtf8 { position: usize, reason: String },

   #[error("Invalid text: {0}")]
   InvalidText(String),
}

pub type Result<T> = std::result::Result<T, ParserError>;

/// Splits raw input into the code units n-grams are built from.
pub trait TextParser: Sync + Send {
    /// Decode `text` into code units. Byte values and Unicode scalar values
    /// both fit in a `u32`.
    fn code_units(&self, text: &[u8]) -> Result<Vec<u32>>;

    /// Validate `text` without producing units.
    fn validate(&self, text: &[u8]) -> Result<()> {
        self.code_units(text).map(|_| ())
    }

    /// The encoding this parser implements.
    fn mode(&self) -> EncodingMode;
}

/// Runtime-selected parser, chosen from the persisted encoding mode.
#[derive(Debug, Clone, Copy)]
pub enum CodeUnitParser {
    Bytes(ByteParser),
    Unicode(UnicodeParser),
}

impl CodeUnitParser {
    pub fn for_mode(mode: EncodingMode) -> Self {
        match mode {
            EncodingMode::Bytes => CodeUnitParser::Bytes(ByteParser),
            EncodingMode::Unicode => CodeUnitParser::Unicode(UnicodeParser),
        }
    }
}

impl TextParser for CodeUnitParser {
    fn code_units(&self, text: &[u8]) -> Result<Vec<u32>> {
        match self {
            CodeUnitParser::Bytes(p) => p.code_units(text),
            CodeUnitParser::Unicode(p) => p.code_units(text),
        }
    }

    fn validate(&self, text: &[u8]) -> Result<()> {
        match self {
            CodeUnitParser::Bytes(p) => p.validate(text),
            CodeUnitParser::Unicode(p) => p.validate(text),
        }
    }

    fn mode(&self) -> EncodingMode {
        match self {
            CodeUnitParser::Bytes(p) => p.mode(),
            CodeUnitParser::Unicode(p) => p.mode(),
        }
    }
}

pub use self::bytes::ByteParser;
pub use self::unicode::UnicodeParser;
