// src/matching/confidence.rs
//
// Combines the name, distance, and locality signals into a single integer
// confidence with a human-readable reason trail. Every classification
// decision carries its reasons so a reviewer never has to infer why a
// score was produced.

use crate::config::{
    MIN_CANDIDATE_CONFIDENCE, NAME_MATCH_POINTS, NAME_MATCH_THRESHOLD,
    NAME_PARTIAL_POINTS, NAME_PARTIAL_THRESHOLD, NAME_SIMILAR_POINTS, NAME_SIMILAR_THRESHOLD,
    NAME_STATE_ESCAPE_MIN_NAME_SCORE, NEARBY_KM, NEARBY_POINTS, SAME_CITY_POINTS,
    SAME_LOCATION_KM, SAME_LOCATION_POINTS, SAME_STATE_POINTS,
};

#[derive(Debug, Clone, Default)]
pub struct ConfidenceScore {
    pub confidence: u32,
    pub reasons: Vec<String>,
}

/// Apply the scoring table. Name and distance tiers are mutually exclusive
/// within their axis: only the single highest tier contributes.
pub fn aggregate(
    name_score: u32,
    distance_km: Option<f64>,
    same_city: bool,
    same_state: bool,
) -> ConfidenceScore {
    let mut confidence = 0u32;
    let mut reasons = Vec::new();

    if name_score >= NAME_MATCH_THRESHOLD {
        confidence += NAME_MATCH_POINTS;
        reasons.push(format!("Name match: {}%", name_score));
    } else if name_score >= NAME_SIMILAR_THRESHOLD {
        confidence += NAME_SIMILAR_POINTS;
        reasons.push(format!("Name similar: {}%", name_score));
    } else if name_score >= NAME_PARTIAL_THRESHOLD {
        confidence += NAME_PARTIAL_POINTS;
        reasons.push(format!("Name partial: {}%", name_score));
    }

    if let Some(d) = distance_km {
        if d < SAME_LOCATION_KM {
            confidence += SAME_LOCATION_POINTS;
            reasons.push(format!("Same location: {:.2}km", d));
        } else if d <= NEARBY_KM {
            confidence += NEARBY_POINTS;
            reasons.push(format!("Nearby: {:.2}km", d));
        }
    }

    if same_state {
        confidence += SAME_STATE_POINTS;
        reasons.push("Same state".to_string());
    }
    if same_city {
        confidence += SAME_CITY_POINTS;
        reasons.push("Same city".to_string());
    }

    ConfidenceScore { confidence, reasons }
}

/// Admission gate for ranking: a confidence floor, or a strong name match
/// within the same state. The escape clause exists because a very strong
/// name in the right state is meaningful evidence even when addresses are
/// noisy or coordinates are missing.
pub fn is_admissible(confidence: u32, name_score: u32, same_state: bool) -> bool {
    confidence >= MIN_CANDIDATE_CONFIDENCE
        || (name_score >= NAME_STATE_ESCAPE_MIN_NAME_SCORE && same_state)
}
