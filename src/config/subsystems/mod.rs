pub mod generator;
pub mod matcher;
pub mod storage;

pub use generator::{GeneratorConfig, EncodingMode};
pub use matcher::{MatcherConfig, SimilarityMetric};
pub use storage::StorageConfig;
