use log::trace;
use crate::error::Result;

use super::algorithms::{algorithm_for, SimilarityAlgorithm};
use super::types::{QueryParams, SimilarityMetric, SizeRange};

// Slack applied to real-valued size bounds before rounding.
const SIZE_EPSILON: f64 = 1e-9;

/// Per-query arithmetic: candidate sizes, minimum overlaps and the final
/// accept test, all driven by one measure and threshold.
pub struct SimilarityCalculator {
    params: QueryParams,
    algorithm: &'static dyn SimilarityAlgorithm,
}

impl SimilarityCalculator {
    pub fn new(params: QueryParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            algorithm: algorithm_for(params.measure),
        })
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn measure(&self) -> SimilarityMetric {
        self.params.measure
    }

    pub fn similarity(&self, x: usize, y: usize, c: usize) -> f64 {
        self.algorithm.similarity(x, y, c)
    }

    /// Whether an entry of size `y` sharing `c` n-grams with a query of
    /// size `q` satisfies the query.
    ///
    /// The exact measure ignores the threshold and accepts identical
    /// multisets only.
    pub fn accepts(&self, q: usize, y: usize, c: usize) -> bool {
        match self.params.measure {
            SimilarityMetric::Exact => q == y && y == c,
            _ => self.algorithm.similarity(q, y, c) >= self.params.threshold,
        }
    }

    /// Bucket cardinalities that may hold matches for a query of size `q`,
    /// clamped to `[1, max_size]`.
    pub fn size_range(&self, q: usize, max_size: usize) -> SizeRange {
        let t = self.params.threshold;
        let lower = self.algorithm.min_size(q, t) - SIZE_EPSILON;
        let upper = self.algorithm.max_size(q, t) + SIZE_EPSILON;

        let min = if lower <= 1.0 { 1 } else { lower.ceil() as usize };
        let max = if upper >= max_size as f64 { max_size } else { upper.floor() as usize };

        trace!("Candidate sizes for q={} ({} >= {}): {}..={}", q, self.params.measure, t, min, max);
        SizeRange { min, max }
    }

    /// Smallest overlap `c` with which an entry of size `y` is accepted.
    /// A result above `min(q, y)` means no entry of that size can match.
    pub fn min_overlap(&self, q: usize, y: usize) -> usize {
        let upper = q.min(y);

        if self.params.measure == SimilarityMetric::Exact {
            return if q == y { q } else { upper + 1 };
        }

        let estimate = self.algorithm.min_match(q, y, self.params.threshold);
        let mut c = if estimate.is_nan() || estimate <= 0.0 {
            0
        } else {
            (estimate.ceil() as usize).min(upper + 1)
        };

        // The closed form can be off by one under rounding; settle on the
        // exact boundary using the measure itself.
        while c > 0 && self.accepts(q, y, c - 1) {
            c -= 1;
        }
        while c <= upper && !self.accepts(q, y, c) {
            c += 1;
        }
        c
    }
}
