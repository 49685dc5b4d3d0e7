//! simgram is an approximate string matching database.
//!
//! A [`Writer`] indexes strings by their n-grams into a single file; a
//! [`Reader`] memory-maps that file and returns every stored string whose
//! cosine, dice, jaccard or overlap similarity to a query reaches a
//! threshold, using CPMerge to avoid scanning the whole collection.
//!
//! ```no_run
//! use simgram::{QueryParams, Reader, SimilarityMetric, Writer};
//!
//! # fn main() -> simgram::Result<()> {
//! let mut writer = Writer::open("names.db", 3, false, false)?;
//! writer.insert("Barack Hussein Obama II")?;
//! writer.insert("James Gordon Brown")?;
//! writer.close()?;
//!
//! let reader = Reader::open("names.db")?;
//! let params = QueryParams::new(SimilarityMetric::Cosine, 0.6)?;
//! assert_eq!(reader.retrieve("Barack Obama", &params)?, vec!["Barack Hussein Obama II"]);
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod error;
pub mod parser;
pub mod storage;
pub mod ngram;
pub mod matcher;
pub mod utils;
pub mod config;
pub mod types;

// Re-exports
pub use error::{Error, Result};
pub use matcher::{QueryParams, SimilarityMetric, SimilarityCalculator};
pub use ngram::NGramGenerator;
pub use storage::{Reader, Writer, QueryMetricsStats};
pub use types::{EntryId, IndexInfo};

// Re-export the config from config module
pub use config::SimgramConfig;
pub use config::subsystems::{GeneratorConfig, EncodingMode, MatcherConfig, StorageConfig};
