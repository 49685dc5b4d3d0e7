use super::types::SimilarityMetric;

/// Interface every similarity measure implements.
///
/// Measures are defined on n-gram counts only: `x` and `y` are the sizes of
/// the two n-gram multisets and `c` the size of their intersection. The
/// bound methods return real-valued estimates; [`SimilarityCalculator`]
/// rounds and corrects them.
///
/// [`SimilarityCalculator`]: super::similarity::SimilarityCalculator
pub trait SimilarityAlgorithm: Send + Sync {
    /// Returns the type of similarity metric this algorithm implements
    fn name(&self) -> SimilarityMetric;

    /// Similarity of two multisets of sizes `x` and `y` sharing `c` n-grams.
    fn similarity(&self, x: usize, y: usize, c: usize) -> f64;

    /// Smallest candidate size that can reach `threshold` against a query of size `q`.
    fn min_size(&self, q: usize, threshold: f64) -> f64;

    /// Largest candidate size that can reach `threshold`; may be infinite.
    fn max_size(&self, q: usize, threshold: f64) -> f64;

    /// Estimated overlap needed between sizes `q` and `y` to reach `threshold`.
    fn min_match(&self, q: usize, y: usize, threshold: f64) -> f64;
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator <= 0.0 { 0.0 } else { numerator / denominator }
}

/// Identical n-gram multisets only.
pub struct ExactMatcher;

impl SimilarityAlgorithm for ExactMatcher {
    fn name(&self) -> SimilarityMetric {
        SimilarityMetric::Exact
    }

    fn similarity(&self, x: usize, y: usize, c: usize) -> f64 {
        if x == y && y == c { 1.0 } else { 0.0 }
    }

    fn min_size(&self, q: usize, _threshold: f64) -> f64 {
        q as f64
    }

    fn max_size(&self, q: usize, _threshold: f64) -> f64 {
        q as f64
    }

    fn min_match(&self, q: usize, _y: usize, _threshold: f64) -> f64 {
        q as f64
    }
}

/// `2c / (|X| + |Y|)`
pub struct DiceMatcher;

impl SimilarityAlgorithm for DiceMatcher {
    fn name(&self) -> SimilarityMetric {
        SimilarityMetric::Dice
    }

    fn similarity(&self, x: usize, y: usize, c: usize) -> f64 {
        ratio(2.0 * c as f64, (x + y) as f64)
    }

    fn min_size(&self, q: usize, threshold: f64) -> f64 {
        threshold * q as f64 / (2.0 - threshold)
    }

    fn max_size(&self, q: usize, threshold: f64) -> f64 {
        if threshold <= 0.0 {
            return f64::INFINITY;
        }
        (2.0 - threshold) * q as f64 / threshold
    }

    fn min_match(&self, q: usize, y: usize, threshold: f64) -> f64 {
        0.5 * threshold * (q + y) as f64
    }
}

/// `c / sqrt(|X| * |Y|)`
pub struct CosineMatcher;

impl SimilarityAlgorithm for CosineMatcher {
    fn name(&self) -> SimilarityMetric {
        SimilarityMetric::Cosine
    }

    fn similarity(&self, x: usize, y: usize, c: usize) -> f64 {
        ratio(c as f64, ((x as f64) * (y as f64)).sqrt())
    }

    fn min_size(&self, q: usize, threshold: f64) -> f64 {
        threshold * threshold * q as f64
    }

    fn max_size(&self, q: usize, threshold: f64) -> f64 {
        if threshold <= 0.0 {
            return f64::INFINITY;
        }
        q as f64 / (threshold * threshold)
    }

    fn min_match(&self, q: usize, y: usize, threshold: f64) -> f64 {
        threshold * ((q as f64) * (y as f64)).sqrt()
    }
}

/// `c / (|X| + |Y| - c)`
pub struct JaccardMatcher;

impl SimilarityAlgorithm for JaccardMatcher {
    fn name(&self) -> SimilarityMetric {
        SimilarityMetric::Jaccard
    }

    fn similarity(&self, x: usize, y: usize, c: usize) -> f64 {
        ratio(c as f64, (x + y).saturating_sub(c) as f64)
    }

    fn min_size(&self, q: usize, threshold: f64) -> f64 {
        threshold * q as f64
    }

    fn max_size(&self, q: usize, threshold: f64) -> f64 {
        if threshold <= 0.0 {
            return f64::INFINITY;
        }
        q as f64 / threshold
    }

    fn min_match(&self, q: usize, y: usize, threshold: f64) -> f64 {
        threshold * (q + y) as f64 / (1.0 + threshold)
    }
}

/// `c / min(|X|, |Y|)`
pub struct OverlapMatcher;

impl SimilarityAlgorithm for OverlapMatcher {
    fn name(&self) -> SimilarityMetric {
        SimilarityMetric::Overlap
    }

    fn similarity(&self, x: usize, y: usize, c: usize) -> f64 {
        ratio(c as f64, x.min(y) as f64)
    }

    fn min_size(&self, _q: usize, _threshold: f64) -> f64 {
        1.0
    }

    fn max_size(&self, _q: usize, _threshold: f64) -> f64 {
        f64::INFINITY
    }

    fn min_match(&self, q: usize, y: usize, threshold: f64) -> f64 {
        threshold * q.min(y) as f64
    }
}

/// Returns the algorithm implementing `metric`.
pub fn algorithm_for(metric: SimilarityMetric) -> &'static dyn SimilarityAlgorithm {
    match metric {
        SimilarityMetric::Exact => &ExactMatcher,
        SimilarityMetric::Dice => &DiceMatcher,
        SimilarityMetric::Cosine => &CosineMatcher,
        SimilarityMetric::Jaccard => &JaccardMatcher,
        SimilarityMetric::Overlap => &OverlapMatcher,
    }
}
