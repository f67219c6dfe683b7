use chrono::{DateTime, Utc};
use serde::Serialize;

use super::config::{ScoringConfig, ScoringWeights};
use super::factors::{
    rating_factor, recency_factor, review_trust_factor, safety_factor, variance_factor,
};
use crate::place::{PlaceSignal, WeatherSignal};

#[derive(Debug, Clone)]
pub struct FactorContribution {
    pub label: &'static str, // e.g. "Rating", "Recency"
    pub subscore: u8,        // 0-100
    pub weight: f64,
    pub contribution: f64, // subscore * weight
}

/// The five sub-scores, each an integer in 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub rating: u8,
    pub recency: u8,
    pub safety: u8,
    pub review_trust: u8,
    pub variance: u8,
}

impl ScoreBreakdown {
    /// Sub-scores in weight order: rating, recency, safety, review trust, variance
    pub fn as_array(&self) -> [u8; 5] {
        [
            self.rating,
            self.recency,
            self.safety,
            self.review_trust,
            self.variance,
        ]
    }

    /// Weighted sum before rounding
    pub fn weighted_sum(&self, weights: &ScoringWeights) -> f64 {
        self.as_array()
            .iter()
            .zip(weights.as_array())
            .map(|(subscore, weight)| *subscore as f64 * weight)
            .sum()
    }

    pub fn contributions(&self, weights: &ScoringWeights) -> Vec<FactorContribution> {
        const LABELS: [&str; 5] = ["Rating", "Recency", "Safety", "Review trust", "Variance"];
        LABELS
            .into_iter()
            .zip(self.as_array())
            .zip(weights.as_array())
            .map(|((label, subscore), weight)| FactorContribution {
                label,
                subscore,
                weight,
                contribution: subscore as f64 * weight,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub score: u8,
    pub breakdown: ScoreBreakdown,
    pub factors: ScoringWeights,
}

/// Round to the nearest integer and clamp into 0..=100. NaN maps to 0.
fn to_subscore(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

/// O-Dog score with the built-in weights and region table, evaluated now.
pub fn compute_score(place: &PlaceSignal, weather: Option<&WeatherSignal>) -> ScoreResult {
    calculate_score(place, weather, &ScoringConfig::default(), Utc::now())
}

/// O-Dog score for `place` as of `now`.
///
/// Never fails: out-of-range inputs are clamped, unknown regions use the
/// default crowd level and a missing weather reading falls back to the
/// policy-only safety score. The final score is derived from the rounded
/// breakdown, so `score == round(Σ breakdown[i] * factors[i])` always holds.
pub fn calculate_score(
    place: &PlaceSignal,
    weather: Option<&WeatherSignal>,
    config: &ScoringConfig,
    now: DateTime<Utc>,
) -> ScoreResult {
    let weights = config.effective_weights();
    let crowd_level = config.crowd_level(&place.region_code);

    let breakdown = ScoreBreakdown {
        rating: to_subscore(rating_factor(place.rating)),
        recency: to_subscore(recency_factor(place.updated_at, now)),
        safety: to_subscore(safety_factor(place.policy_level, weather)),
        review_trust: to_subscore(review_trust_factor(place.review_count, place.rating)),
        variance: to_subscore(variance_factor(place.feature_count(), crowd_level)),
    };

    ScoreResult {
        score: to_subscore(breakdown.weighted_sum(&weights)),
        breakdown,
        factors: weights,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::PolicyLevel;
    use chrono::Duration;
    use std::collections::BTreeSet;

    fn sample_place(now: DateTime<Utc>) -> PlaceSignal {
        PlaceSignal {
            rating: 4.6,
            review_count: 120,
            updated_at: now - Duration::days(3),
            created_at: now - Duration::days(400),
            policy_level: PolicyLevel::Safe,
            features: ["대형견가능", "주차가능", "실내", "놀이터"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            region_code: "seoul".to_string(),
        }
    }

    fn assert_invariant(result: &ScoreResult) {
        let expected = to_subscore(result.breakdown.weighted_sum(&result.factors));
        assert_eq!(result.score, expected);
        assert!(result.score <= 100);
        for subscore in result.breakdown.as_array() {
            assert!(subscore <= 100);
        }
    }

    #[test]
    fn test_full_scoring_flow() {
        let now = Utc::now();
        let result = calculate_score(&sample_place(now), None, &ScoringConfig::default(), now);

        assert_eq!(
            result.breakdown,
            ScoreBreakdown {
                rating: 92,
                recency: 100,
                safety: 90,
                review_trust: 100,
                variance: 32,
            }
        );
        // 27.6 + 20 + 18 + 15 + 4.8 = 85.4
        assert_eq!(result.score, 85);
        assert_invariant(&result);
    }

    #[test]
    fn test_weather_raises_safety() {
        let now = Utc::now();
        let weather = WeatherSignal {
            temperature: 22.5,
            air_quality: 10.0,
            humidity: 40.0,
        };
        let result = calculate_score(
            &sample_place(now),
            Some(&weather),
            &ScoringConfig::default(),
            now,
        );
        assert_eq!(result.breakdown.safety, 94);
        // 27.6 + 20 + 18.8 + 15 + 4.8 = 86.2
        assert_eq!(result.score, 86);
        assert_invariant(&result);
    }

    #[test]
    fn test_factors_are_the_weights_used() {
        let now = Utc::now();
        let result = calculate_score(&sample_place(now), None, &ScoringConfig::default(), now);
        let total: f64 = result.factors.as_array().iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(result.factors, ScoringWeights::default());
    }

    #[test]
    fn test_custom_weights() {
        let now = Utc::now();
        let config = ScoringConfig {
            weights: Some(ScoringWeights {
                rating: 1.0,
                recency: 0.0,
                safety: 0.0,
                review_trust: 0.0,
                variance: 0.0,
            }),
            ..ScoringConfig::default()
        };
        let result = calculate_score(&sample_place(now), None, &config, now);
        assert_eq!(result.score, 92);
        assert_invariant(&result);
    }

    #[test]
    fn test_adversarial_inputs_stay_in_range() {
        let now = Utc::now();
        let place = PlaceSignal {
            rating: -1.0,
            review_count: -5,
            updated_at: now - Duration::days(5000),
            created_at: now,
            policy_level: PolicyLevel::Warning,
            features: BTreeSet::new(),
            region_code: "nowhere".to_string(),
        };
        let weather = WeatherSignal {
            temperature: 60.0,
            air_quality: 999.0,
            humidity: 100.0,
        };
        let result = calculate_score(&place, Some(&weather), &ScoringConfig::default(), now);
        assert_eq!(result.breakdown.rating, 0);
        assert_eq!(result.breakdown.recency, 10);
        assert_eq!(result.breakdown.safety, 18);
        assert_eq!(result.breakdown.review_trust, 13);
        assert_eq!(result.breakdown.variance, 20);
        assert_invariant(&result);
    }

    #[test]
    fn test_non_finite_rating_does_not_panic() {
        let now = Utc::now();
        let mut place = sample_place(now);
        place.rating = f64::NAN;
        let result = calculate_score(&place, None, &ScoringConfig::default(), now);
        assert_eq!(result.breakdown.rating, 0);
        assert_invariant(&result);

        place.rating = f64::INFINITY;
        let result = calculate_score(&place, None, &ScoringConfig::default(), now);
        assert_eq!(result.breakdown.rating, 100);
        assert_invariant(&result);
    }

    #[test]
    fn test_rating_above_scale_is_capped() {
        let now = Utc::now();
        let mut place = sample_place(now);
        place.rating = 5.5;
        let result = calculate_score(&place, None, &ScoringConfig::default(), now);
        assert_eq!(result.breakdown.rating, 100);
    }

    #[test]
    fn test_created_at_does_not_affect_score() {
        let now = Utc::now();
        let mut newer = sample_place(now);
        newer.created_at = now - Duration::days(1);
        let older = sample_place(now);

        let config = ScoringConfig::default();
        assert_eq!(
            calculate_score(&newer, None, &config, now),
            calculate_score(&older, None, &config, now)
        );
    }

    #[test]
    fn test_recency_boundaries_in_breakdown() {
        let now = Utc::now();
        let config = ScoringConfig::default();
        let mut place = sample_place(now);

        place.updated_at = now - Duration::days(7);
        assert_eq!(calculate_score(&place, None, &config, now).breakdown.recency, 100);

        place.updated_at = now - Duration::days(8);
        assert_eq!(calculate_score(&place, None, &config, now).breakdown.recency, 80);

        place.updated_at = now - Duration::days(366);
        assert_eq!(calculate_score(&place, None, &config, now).breakdown.recency, 10);
    }

    #[test]
    fn test_contributions_match_breakdown() {
        let now = Utc::now();
        let result = calculate_score(&sample_place(now), None, &ScoringConfig::default(), now);
        let contributions = result.breakdown.contributions(&result.factors);

        assert_eq!(contributions.len(), 5);
        assert_eq!(contributions[0].label, "Rating");
        assert_eq!(contributions[0].subscore, 92);
        assert!((contributions[0].contribution - 27.6).abs() < 1e-9);
        let sum: f64 = contributions.iter().map(|c| c.contribution).sum();
        assert!((sum - result.breakdown.weighted_sum(&result.factors)).abs() < 1e-9);
    }

    #[test]
    fn test_compute_score_uses_defaults() {
        let place = sample_place(Utc::now());
        let result = compute_score(&place, None);
        assert_eq!(result.factors, ScoringWeights::default());
        assert_eq!(result.score, 85);
    }

    #[test]
    fn test_result_json_is_camel_case() {
        let now = Utc::now();
        let result = calculate_score(&sample_place(now), None, &ScoringConfig::default(), now);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["score"], 85);
        assert_eq!(json["breakdown"]["rating"], 92);
        assert_eq!(json["factors"]["reviewTrust"], 0.15);

        let keys = |field: &str| -> Vec<String> {
            let mut keys: Vec<String> = json[field].as_object().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        };
        let expected = vec!["rating", "recency", "reviewTrust", "safety", "variance"];
        assert_eq!(keys("breakdown"), expected);
        assert_eq!(keys("factors"), expected);
    }
}
