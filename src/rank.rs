use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::place::{PlaceRecord, WeatherSignal};
use crate::scoring::{calculate_score, ScoreResult, ScoringConfig};

/// A place with the score it was ranked by
#[derive(Debug, Clone)]
pub struct RankedPlace {
    pub place: PlaceRecord,
    pub result: ScoreResult,
    pub weather_applied: bool,
}

/// Index weather readings by lowercased region code.
pub fn weather_index(readings: HashMap<String, WeatherSignal>) -> HashMap<String, WeatherSignal> {
    readings
        .into_iter()
        .map(|(region, weather)| (region.trim().to_lowercase(), weather))
        .collect()
}

/// Score every place and sort for listing.
///
/// Weather is looked up by region code; places in regions without a reading
/// are scored on policy alone. Order is score descending, then review count
/// descending (better-established places first), then id ascending.
pub fn rank_places(
    places: Vec<PlaceRecord>,
    weather_by_region: &HashMap<String, WeatherSignal>,
    config: &ScoringConfig,
    now: DateTime<Utc>,
) -> Vec<RankedPlace> {
    let mut ranked: Vec<_> = places
        .into_iter()
        .map(|place| {
            let region = place.signal.region_code.trim().to_lowercase();
            let weather = weather_by_region.get(&region);
            let result = calculate_score(&place.signal, weather, config, now);
            RankedPlace {
                place,
                result,
                weather_applied: weather.is_some(),
            }
        })
        .collect();

    ranked.sort_by(compare_ranked);
    ranked
}

fn compare_ranked(a: &RankedPlace, b: &RankedPlace) -> Ordering {
    // Primary: score descending
    b.result
        .score
        .cmp(&a.result.score)
        // Tie-breaker: more reviews first
        .then_with(|| b.place.signal.review_count.cmp(&a.place.signal.review_count))
        .then_with(|| a.place.id.cmp(&b.place.id))
}
