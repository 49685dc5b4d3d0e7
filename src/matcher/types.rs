// src/matcher/types.rs
use serde::{Serialize, Deserialize};
use crate::error::{Error, Result};
pub use crate::config::subsystems::matcher::SimilarityMetric;

/// Measure and threshold of a retrieval query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    pub measure: SimilarityMetric,
    pub threshold: f64,
}

impl QueryParams {
    pub fn new(measure: SimilarityMetric, threshold: f64) -> Result<Self> {
        let params = Self { measure, threshold };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::Config(
                format!("Threshold for {} must be within [0, 1], got {}", self.measure, self.threshold)
            ));
        }
        Ok(())
    }

    pub fn cosine(threshold: f64) -> Result<Self> {
        Self::new(SimilarityMetric::Cosine, threshold)
    }

    pub fn dice(threshold: f64) -> Result<Self> {
        Self::new(SimilarityMetric::Dice, threshold)
    }

    pub fn jaccard(threshold: f64) -> Result<Self> {
        Self::new(SimilarityMetric::Jaccard, threshold)
    }

    pub fn overlap(threshold: f64) -> Result<Self> {
        Self::new(SimilarityMetric::Overlap, threshold)
    }

    pub fn exact() -> Self {
        Self { measure: SimilarityMetric::Exact, threshold: 1.0 }
    }
}

impl Default for QueryParams {
    fn default() -> Self {
        Self { measure: SimilarityMetric::Cosine, threshold: 0.7 }
    }
}

/// Inclusive range of bucket cardinalities worth visiting for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeRange {
    pub min: usize,
    pub max: usize,
}

impl SizeRange {
    pub fn contains(&self, size: usize) -> bool {
        self.min <= size && size <= self.max
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }
}
