use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Crowd level used when a region has no entry in any table.
pub const DEFAULT_CROWD_LEVEL: f64 = 50.0;

/// Built-in region -> crowd level table (0 = empty, 100 = packed).
const BUILTIN_CROWD_LEVELS: &[(&str, f64)] = &[
    ("seoul", 80.0),
    ("busan", 70.0),
    ("gyeonggi", 65.0),
    ("incheon", 60.0),
    ("jeju", 60.0),
    ("daegu", 55.0),
    ("daejeon", 50.0),
    ("gwangju", 45.0),
    ("ulsan", 40.0),
    ("gyeongnam", 40.0),
    ("sejong", 35.0),
    ("gangwon", 35.0),
    ("chungnam", 35.0),
    ("chungbuk", 30.0),
    ("jeonbuk", 30.0),
    ("jeonnam", 30.0),
    ("gyeongbuk", 30.0),
];

/// Weights of the five O-Dog sub-scores. Valid configurations sum to 1.0.
///
/// Read from YAML in snake_case (`reviewTrust` is accepted too); written to
/// JSON in camelCase alongside the breakdown.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all(serialize = "camelCase"))]
pub struct ScoringWeights {
    pub rating: f64,
    pub recency: f64,
    pub safety: f64,
    #[serde(alias = "reviewTrust")]
    pub review_trust: f64,
    pub variance: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            rating: 0.30,
            recency: 0.20,
            safety: 0.20,
            review_trust: 0.15,
            variance: 0.15,
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.rating + self.recency + self.safety + self.review_trust + self.variance
    }

    /// Weights in breakdown order: rating, recency, safety, review trust, variance
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.rating,
            self.recency,
            self.safety,
            self.review_trust,
            self.variance,
        ]
    }
}

/// Main scoring configuration.
///
/// Every field is optional; missing fields fall back to the built-in values.
///
/// Example YAML:
/// ```yaml
/// scoring:
///   weights:
///     rating: 0.4
///     recency: 0.2
///     safety: 0.2
///     review_trust: 0.1
///     variance: 0.1
///   crowd_levels:
///     seoul: 90
///     yangyang: 20
///   default_crowd_level: 50
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Sub-score weights (default: 0.30 / 0.20 / 0.20 / 0.15 / 0.15)
    #[serde(default)]
    pub weights: Option<ScoringWeights>,

    /// Region crowd levels layered over the built-in table
    #[serde(default)]
    pub crowd_levels: Option<BTreeMap<String, f64>>,

    /// Crowd level for regions found in neither table (default: 50)
    #[serde(default)]
    pub default_crowd_level: Option<f64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: Some(ScoringWeights::default()),
            crowd_levels: None,
            default_crowd_level: Some(DEFAULT_CROWD_LEVEL),
        }
    }
}

impl ScoringConfig {
    pub fn effective_weights(&self) -> ScoringWeights {
        self.weights.unwrap_or_default()
    }

    /// Look up the crowd level for a region code, case-insensitively.
    /// Configured levels win over the built-in table.
    pub fn crowd_level(&self, region_code: &str) -> f64 {
        let region = region_code.trim().to_lowercase();

        if let Some(overrides) = &self.crowd_levels {
            if let Some(level) = overrides
                .iter()
                .find(|(name, _)| name.to_lowercase() == region)
                .map(|(_, level)| *level)
            {
                return level;
            }
        }

        BUILTIN_CROWD_LEVELS
            .iter()
            .find(|(name, _)| *name == region)
            .map(|(_, level)| *level)
            .unwrap_or_else(|| self.default_crowd_level.unwrap_or(DEFAULT_CROWD_LEVEL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let weights = ScoringWeights::default();
        assert!((weights.total() - 1.0).abs() < 1e-9);
        assert_eq!(weights.as_array(), [0.30, 0.20, 0.20, 0.15, 0.15]);
    }

    #[test]
    fn test_builtin_crowd_levels() {
        let config = ScoringConfig::default();
        assert_eq!(config.crowd_level("seoul"), 80.0);
        assert_eq!(config.crowd_level("Jeju"), 60.0);
        assert_eq!(config.crowd_level(" busan "), 70.0);
    }

    #[test]
    fn test_unknown_region_uses_default() {
        let config = ScoringConfig::default();
        assert_eq!(config.crowd_level("atlantis"), 50.0);
        assert_eq!(config.crowd_level(""), 50.0);

        let config = ScoringConfig {
            default_crowd_level: Some(20.0),
            ..ScoringConfig::default()
        };
        assert_eq!(config.crowd_level("atlantis"), 20.0);
    }

    #[test]
    fn test_configured_crowd_level_overrides_builtin() {
        let mut levels = BTreeMap::new();
        levels.insert("Seoul".to_string(), 95.0);
        levels.insert("yangyang".to_string(), 15.0);
        let config = ScoringConfig {
            crowd_levels: Some(levels),
            ..ScoringConfig::default()
        };
        assert_eq!(config.crowd_level("seoul"), 95.0);
        assert_eq!(config.crowd_level("yangyang"), 15.0);
        assert_eq!(config.crowd_level("busan"), 70.0);
    }

    #[test]
    fn test_scoring_config_serde_roundtrip() {
        let config = ScoringConfig::default();
        let yaml = serde_saphyr::to_string(&config).unwrap();
        let parsed: ScoringConfig = serde_saphyr::from_str(&yaml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_weights_fill_defaults() {
        let yaml = r#"
weights:
  rating: 0.5
"#;
        let config: ScoringConfig = serde_saphyr::from_str(yaml).unwrap();
        let weights = config.effective_weights();
        assert_eq!(weights.rating, 0.5);
        assert_eq!(weights.recency, 0.20);
        assert!(config.crowd_levels.is_none());
    }

    #[test]
    fn test_empty_scoring_config_parse() {
        let config: ScoringConfig = serde_saphyr::from_str("{}").unwrap();
        assert!(config.weights.is_none());
        assert!(config.crowd_levels.is_none());
        assert!(config.default_crowd_level.is_none());
        assert_eq!(config.effective_weights(), ScoringWeights::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = "base_score: 100";
        assert!(serde_saphyr::from_str::<ScoringConfig>(yaml).is_err());
    }

    #[test]
    fn test_weights_yaml_snake_case_and_json_camel_case() {
        let yaml = r#"
rating: 0.3
recency: 0.2
safety: 0.2
review_trust: 0.1
variance: 0.2
"#;
        let weights: ScoringWeights = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(weights.review_trust, 0.1);

        let aliased: ScoringWeights = serde_saphyr::from_str("reviewTrust: 0.1").unwrap();
        assert_eq!(aliased.review_trust, 0.1);

        let json = serde_json::to_value(weights).unwrap();
        assert_eq!(json["reviewTrust"], 0.1);
        assert!(json.get("review_trust").is_none());
    }
}
