use super::config::ScoringConfig;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Validate scoring configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_scoring(config: &ScoringConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if let Some(ref weights) = config.weights {
        let named = [
            ("rating", weights.rating),
            ("recency", weights.recency),
            ("safety", weights.safety),
            ("review_trust", weights.review_trust),
            ("variance", weights.variance),
        ];

        let mut all_finite = true;
        for (name, value) in named {
            if !value.is_finite() {
                all_finite = false;
                errors.push(format!("scoring.weights.{}: must be a finite number", name));
            } else if value < 0.0 {
                errors.push(format!("scoring.weights.{}: must be non-negative", name));
            }
        }

        if all_finite && (weights.total() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            errors.push(format!(
                "scoring.weights: must sum to 1.0 (got {:.4})",
                weights.total()
            ));
        }
    }

    if let Some(ref levels) = config.crowd_levels {
        for (region, level) in levels {
            if region.trim().is_empty() {
                errors.push("scoring.crowd_levels: region code must not be empty".to_string());
            }
            if !(0.0..=100.0).contains(level) {
                errors.push(format!(
                    "scoring.crowd_levels.{}: must be between 0 and 100 (got {})",
                    region, level
                ));
            }
        }
    }

    if let Some(level) = config.default_crowd_level {
        if !(0.0..=100.0).contains(&level) {
            errors.push(format!(
                "scoring.default_crowd_level: must be between 0 and 100 (got {})",
                level
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
