use thiserror::Error;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Database is not open")]
    DatabaseNotOpen,

    #[error("Database is already closed")]
    DatabaseAlreadyClosed,

    #[error("Database already exists: {0:?}")]
    DatabaseExists(PathBuf),

    #[error("Index corruption: {0}")]
    IndexCorruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

// Type alias for Result
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error conversions
impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn encoding<S: Into<String>>(msg: S) -> Self {
        Error::Encoding(msg.into())
    }

    pub fn corruption<S: Into<String>>(msg: S) -> Self {
        Error::IndexCorruption(msg.into())
    }

    /// True for failures caused by a damaged or incompatible index file.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::IndexCorruption(_))
    }
}

impl From<crate::parser::ParserError> for Error {
    fn from(err: crate::parser::ParserError) -> Self {
        Error::Encoding(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
