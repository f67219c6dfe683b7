use chrono::{DateTime, Utc};

use crate::place::{PolicyLevel, WeatherSignal};

/// Temperature (°C) at which the weather penalty is zero
pub const OPTIMAL_TEMPERATURE: f64 = 22.5;
/// PM2.5 index up to which air quality is considered clean
pub const CLEAN_AIR_LIMIT: f64 = 35.0;

#[derive(Debug, Clone, Copy)]
pub enum RangeOp {
    AtMost(f64),
    AtLeast(f64),
    Between(f64, f64), // Inclusive range: N-M
}

impl RangeOp {
    pub fn matches(&self, value: f64) -> bool {
        match self {
            RangeOp::AtMost(n) => value <= *n,
            RangeOp::AtLeast(n) => value >= *n,
            RangeOp::Between(low, high) => value >= *low && value <= *high,
        }
    }
}

/// Maps a range of input values to a sub-score.
#[derive(Debug, Clone, Copy)]
pub struct Bucket {
    pub range: RangeOp,
    pub score: f64,
}

const fn bucket(range: RangeOp, score: f64) -> Bucket {
    Bucket { range, score }
}

/// Days since last update
const RECENCY_BUCKETS: &[Bucket] = &[
    bucket(RangeOp::AtMost(7.0), 100.0),
    bucket(RangeOp::AtMost(30.0), 80.0),
    bucket(RangeOp::AtMost(90.0), 60.0),
    bucket(RangeOp::AtMost(180.0), 40.0),
    bucket(RangeOp::AtMost(365.0), 20.0),
];
const RECENCY_FLOOR: f64 = 10.0;

const REVIEW_COUNT_BUCKETS: &[Bucket] = &[
    bucket(RangeOp::AtLeast(100.0), 100.0),
    bucket(RangeOp::AtLeast(50.0), 80.0),
    bucket(RangeOp::AtLeast(20.0), 60.0),
    bucket(RangeOp::AtLeast(10.0), 40.0),
    bucket(RangeOp::AtLeast(5.0), 20.0),
];
const REVIEW_COUNT_FLOOR: f64 = 10.0;

// Bands overlap. Order matters: 4.2 must land in the 4.0-4.9 band, not 3.5-5.0.
const RATING_PLAUSIBILITY_BANDS: &[Bucket] = &[
    bucket(RangeOp::Between(4.5, 4.8), 100.0),
    bucket(RangeOp::Between(4.0, 4.9), 80.0),
    bucket(RangeOp::Between(3.5, 5.0), 60.0),
    bucket(RangeOp::AtLeast(3.0), 40.0),
];
const RATING_PLAUSIBILITY_FLOOR: f64 = 20.0;

/// Score of the first bucket whose range matches, or `fallback`.
pub fn first_match(value: f64, buckets: &[Bucket], fallback: f64) -> f64 {
    buckets
        .iter()
        .find(|b| b.range.matches(value))
        .map(|b| b.score)
        .unwrap_or(fallback)
}

/// Linear map of the 5-point rating onto 0-100, capped at 100.
pub fn rating_factor(rating: f64) -> f64 {
    (rating * 20.0).min(100.0)
}

/// Step function over whole days since `updated_at`.
/// Timestamps in the future count as updated today.
pub fn recency_factor(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days = (now - updated_at).num_days().max(0);
    first_match(days as f64, RECENCY_BUCKETS, RECENCY_FLOOR)
}

pub fn temperature_factor(temperature: f64) -> f64 {
    (100.0 - (temperature - OPTIMAL_TEMPERATURE).abs() * 4.0).max(0.0)
}

pub fn air_quality_factor(air_quality: f64) -> f64 {
    if air_quality <= CLEAN_AIR_LIMIT {
        100.0
    } else {
        (100.0 - (air_quality - CLEAN_AIR_LIMIT) * 2.0).max(0.0)
    }
}

/// Policy base score, blended 60/20/20 with temperature and air quality
/// when a weather reading is available. Not rounded here.
pub fn safety_factor(policy: PolicyLevel, weather: Option<&WeatherSignal>) -> f64 {
    let base = policy.base_safety();
    match weather {
        Some(w) => {
            base * 0.6
                + temperature_factor(w.temperature) * 0.2
                + air_quality_factor(w.air_quality) * 0.2
        }
        None => base,
    }
}

pub fn review_count_factor(review_count: i64) -> f64 {
    first_match(review_count as f64, REVIEW_COUNT_BUCKETS, REVIEW_COUNT_FLOOR)
}

pub fn rating_plausibility_factor(rating: f64) -> f64 {
    first_match(rating, RATING_PLAUSIBILITY_BANDS, RATING_PLAUSIBILITY_FLOOR)
}

/// Review volume (70%) blended with how believable the rating looks (30%).
pub fn review_trust_factor(review_count: i64, rating: f64) -> f64 {
    review_count_factor(review_count) * 0.7 + rating_plausibility_factor(rating) * 0.3
}

/// Feature richness (60%) blended with how uncrowded the region is (40%).
pub fn variance_factor(feature_count: usize, crowd_level: f64) -> f64 {
    let feature_score = (feature_count as f64 * 10.0).min(100.0);
    feature_score * 0.6 + (100.0 - crowd_level) * 0.4
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_range_at_most() {
        let range = RangeOp::AtMost(7.0);
        assert!(range.matches(0.0));
        assert!(range.matches(7.0));
        assert!(!range.matches(8.0));
    }

    #[test]
    fn test_range_between_inclusive() {
        let range = RangeOp::Between(4.0, 4.9);
        assert!(!range.matches(3.9));
        assert!(range.matches(4.0));
        assert!(range.matches(4.9));
        assert!(!range.matches(4.95));
    }

    #[test]
    fn test_first_match_wins() {
        let buckets = [
            bucket(RangeOp::AtLeast(10.0), 1.0),
            bucket(RangeOp::AtLeast(5.0), 2.0),
        ];
        assert_eq!(first_match(12.0, &buckets, 0.0), 1.0);
        assert_eq!(first_match(7.0, &buckets, 0.0), 2.0);
        assert_eq!(first_match(1.0, &buckets, 0.0), 0.0);
    }

    #[test]
    fn test_rating_factor_boundaries() {
        assert_eq!(rating_factor(0.0), 0.0);
        assert_eq!(rating_factor(2.5), 50.0);
        assert_eq!(rating_factor(5.0), 100.0);
        assert_eq!(rating_factor(5.5), 100.0);
    }

    #[test]
    fn test_recency_boundaries() {
        let now = Utc::now();
        assert_eq!(recency_factor(now, now), 100.0);
        assert_eq!(recency_factor(now - Duration::days(7), now), 100.0);
        assert_eq!(recency_factor(now - Duration::days(8), now), 80.0);
        assert_eq!(recency_factor(now - Duration::days(30), now), 80.0);
        assert_eq!(recency_factor(now - Duration::days(31), now), 60.0);
        assert_eq!(recency_factor(now - Duration::days(90), now), 60.0);
        assert_eq!(recency_factor(now - Duration::days(180), now), 40.0);
        assert_eq!(recency_factor(now - Duration::days(365), now), 20.0);
        assert_eq!(recency_factor(now - Duration::days(366), now), 10.0);
    }

    #[test]
    fn test_recency_partial_days_truncate() {
        let now = Utc::now();
        let updated = now - Duration::days(7) - Duration::hours(23);
        assert_eq!(recency_factor(updated, now), 100.0);
    }

    #[test]
    fn test_recency_future_update_counts_as_fresh() {
        let now = Utc::now();
        assert_eq!(recency_factor(now + Duration::days(3), now), 100.0);
    }

    #[test]
    fn test_temperature_factor_symmetric() {
        assert_eq!(temperature_factor(22.5), 100.0);
        assert_eq!(temperature_factor(12.5), 60.0);
        assert_eq!(temperature_factor(32.5), 60.0);
        assert_eq!(temperature_factor(-10.0), 0.0);
    }

    #[test]
    fn test_air_quality_factor() {
        assert_eq!(air_quality_factor(10.0), 100.0);
        assert_eq!(air_quality_factor(35.0), 100.0);
        assert_eq!(air_quality_factor(45.0), 80.0);
        assert_eq!(air_quality_factor(200.0), 0.0);
    }

    #[test]
    fn test_safety_without_weather_is_policy_only() {
        assert_eq!(safety_factor(PolicyLevel::Safe, None), 90.0);
        assert_eq!(safety_factor(PolicyLevel::Caution, None), 60.0);
        assert_eq!(safety_factor(PolicyLevel::Warning, None), 30.0);
    }

    #[test]
    fn test_safety_with_ideal_weather() {
        let weather = WeatherSignal {
            temperature: 22.5,
            air_quality: 10.0,
            humidity: 55.0,
        };
        // 90*0.6 + 100*0.2 + 100*0.2
        assert!((safety_factor(PolicyLevel::Safe, Some(&weather)) - 94.0).abs() < 1e-9);
    }

    #[test]
    fn test_safety_with_poor_weather() {
        let weather = WeatherSignal {
            temperature: 35.0,
            air_quality: 60.0,
            humidity: 80.0,
        };
        // 30*0.6 + 50*0.2 + 50*0.2
        assert!((safety_factor(PolicyLevel::Warning, Some(&weather)) - 38.0).abs() < 1e-9);
    }

    #[test]
    fn test_review_count_buckets() {
        assert_eq!(review_count_factor(150), 100.0);
        assert_eq!(review_count_factor(100), 100.0);
        assert_eq!(review_count_factor(99), 80.0);
        assert_eq!(review_count_factor(50), 80.0);
        assert_eq!(review_count_factor(20), 60.0);
        assert_eq!(review_count_factor(10), 40.0);
        assert_eq!(review_count_factor(5), 20.0);
        assert_eq!(review_count_factor(4), 10.0);
        assert_eq!(review_count_factor(-5), 10.0);
    }

    #[test]
    fn test_rating_plausibility_order() {
        assert_eq!(rating_plausibility_factor(4.6), 100.0);
        assert_eq!(rating_plausibility_factor(4.8), 100.0);
        assert_eq!(rating_plausibility_factor(4.2), 80.0);
        assert_eq!(rating_plausibility_factor(4.9), 80.0);
        assert_eq!(rating_plausibility_factor(5.0), 60.0);
        assert_eq!(rating_plausibility_factor(3.7), 60.0);
        assert_eq!(rating_plausibility_factor(3.2), 40.0);
        // Above 5.0 falls past every bounded band to the open one
        assert_eq!(rating_plausibility_factor(5.5), 40.0);
        assert_eq!(rating_plausibility_factor(2.9), 20.0);
        assert_eq!(rating_plausibility_factor(-1.0), 20.0);
    }

    #[test]
    fn test_review_trust_blend() {
        // 100*0.7 + 100*0.3
        assert!((review_trust_factor(120, 4.6) - 100.0).abs() < 1e-9);
        // 10*0.7 + 20*0.3
        assert!((review_trust_factor(0, 0.0) - 13.0).abs() < 1e-9);
        // 60*0.7 + 80*0.3
        assert!((review_trust_factor(25, 4.2) - 66.0).abs() < 1e-9);
    }

    #[test]
    fn test_variance_blend() {
        // 30*0.6 + (100-80)*0.4
        assert!((variance_factor(3, 80.0) - 26.0).abs() < 1e-9);
        // Features cap at 100
        assert!((variance_factor(25, 50.0) - 80.0).abs() < 1e-9);
        assert!((variance_factor(0, 50.0) - 20.0).abs() < 1e-9);
    }
}
