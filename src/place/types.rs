use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Pet policy level assigned to a place by the admin review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyLevel {
    Safe,
    Caution,
    Warning,
}

impl PolicyLevel {
    /// Base safety score before any weather blending
    pub fn base_safety(self) -> f64 {
        match self {
            PolicyLevel::Safe => 90.0,
            PolicyLevel::Caution => 60.0,
            PolicyLevel::Warning => 30.0,
        }
    }
}

/// Snapshot of the stored attributes the O-Dog score is computed from.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceSignal {
    pub rating: f64,
    #[serde(default)]
    pub review_count: i64,
    pub updated_at: DateTime<Utc>,
    // Not read by the recency factor; kept so stored rows deserialize as-is.
    pub created_at: DateTime<Utc>,
    pub policy_level: PolicyLevel,
    #[serde(default)]
    pub features: BTreeSet<String>,
    pub region_code: String,
}

impl PlaceSignal {
    /// Number of distinct feature labels
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Time since the last update, measured at `now`
    pub fn staleness(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.updated_at
    }
}

/// Live weather reading for the region a place is in.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSignal {
    /// Degrees Celsius
    pub temperature: f64,
    /// PM2.5 index
    pub air_quality: f64,
    #[serde(default)]
    pub humidity: f64,
}

/// A listed place: identity and display name plus its scoring signal.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRecord {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub signal: PlaceSignal,
}
