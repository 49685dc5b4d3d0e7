// src/config/subsystems/matcher.rs

use serde::{Serialize, Deserialize};
use crate::error::{Error, Result};
use crate::config::FromIni;
use crate::matcher::types::QueryParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimilarityMetric {
    Exact,
    Dice,
    Cosine,
    Jaccard,
    Overlap,
}

impl SimilarityMetric {
    pub const ALL: [SimilarityMetric; 5] = [
        SimilarityMetric::Exact,
        SimilarityMetric::Dice,
        SimilarityMetric::Cosine,
        SimilarityMetric::Jaccard,
        SimilarityMetric::Overlap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityMetric::Exact => "exact",
            SimilarityMetric::Dice => "dice",
            SimilarityMetric::Cosine => "cosine",
            SimilarityMetric::Jaccard => "jaccard",
            SimilarityMetric::Overlap => "overlap",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().trim_matches('"').to_lowercase().as_str() {
            "exact" => Some(Self::Exact),
            "dice" => Some(Self::Dice),
            "cosine" => Some(Self::Cosine),
            "jaccard" => Some(Self::Jaccard),
            "overlap" => Some(Self::Overlap),
            _ => None,
        }
    }

    /// Parse a measure name, reporting unknown names as a configuration error.
    pub fn parse(s: &str) -> Result<Self> {
        Self::from_str(s).ok_or_else(|| Error::Config(
            format!("Invalid similarity measure '{}' (expected exact, dice, cosine, jaccard or overlap)", s)
        ))
    }
}

impl Default for SimilarityMetric {
    fn default() -> Self {
        Self::Cosine
    }
}

impl std::fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default query parameters used when a caller does not supply its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    pub measure: SimilarityMetric,
    pub threshold: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            measure: SimilarityMetric::Cosine,
            threshold: 0.7,
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<()> {
        self.query_params().map(|_| ())
    }

    pub fn query_params(&self) -> Result<QueryParams> {
        QueryParams::new(self.measure, self.threshold)
    }
}

impl FromIni for MatcherConfig {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        if section_name != "matcher" {
            return None;
        }

        match key {
            "measure" | "similarity" => {
                match SimilarityMetric::parse(value) {
                    Ok(metric) => {
                        self.measure = metric;
                        Some(Ok(()))
                    },
                    Err(e) => Some(Err(e)),
                }
            },
            "threshold" => {
                match value.parse::<f64>() {
                    Ok(threshold) if (0.0..=1.0).contains(&threshold) => {
                        self.threshold = threshold;
                        Some(Ok(()))
                    },
                    _ => Some(Err(Error::Config(
                        format!("Invalid threshold (must be between 0 and 1): {}", value)
                    ))),
                }
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_round_trip() {
        for metric in SimilarityMetric::ALL {
            assert_eq!(SimilarityMetric::from_str(metric.as_str()), Some(metric));
        }
        assert_eq!(SimilarityMetric::from_str(" \"Cosine\" "), Some(SimilarityMetric::Cosine));
        assert!(matches!(SimilarityMetric::parse("levenshtein"), Err(Error::Config(_))));
    }

    #[test]
    fn threshold_outside_unit_interval_is_rejected() {
        let mut config = MatcherConfig::default();
        assert!(config.from_ini_section("matcher", "threshold", "1.5").unwrap().is_err());
        assert!(config.from_ini_section("matcher", "threshold", "0.25").unwrap().is_ok());
        assert_eq!(config.threshold, 0.25);
    }
}
