pub mod algorithms;
pub mod similarity;
pub mod cpmerge;
pub mod types;

// Re-export the main types
pub use self::algorithms::{SimilarityAlgorithm, algorithm_for};
pub use self::similarity::SimilarityCalculator;
pub use self::cpmerge::{CpMerge, PostingList, PostingSource, BucketOutcome};
pub use self::types::{QueryParams, SimilarityMetric, SizeRange};
