// src/config.rs

use log::debug;
use std::env;

/// Name score at or above which a candidate counts as a full name match.
pub const NAME_MATCH_THRESHOLD: u32 = 90;
/// Name score tier for clearly similar but not identical names.
pub const NAME_SIMILAR_THRESHOLD: u32 = 75;
/// Lowest name score tier that still contributes to confidence.
pub const NAME_PARTIAL_THRESHOLD: u32 = 60;

pub const NAME_MATCH_POINTS: u32 = 50;
pub const NAME_SIMILAR_POINTS: u32 = 30;
pub const NAME_PARTIAL_POINTS: u32 = 15;

/// Distance below which two records are treated as the same physical location.
pub const SAME_LOCATION_KM: f64 = 0.5;
/// Upper bound of the "nearby" distance tier.
pub const NEARBY_KM: f64 = 5.0;

pub const SAME_LOCATION_POINTS: u32 = 40;
pub const NEARBY_POINTS: u32 = 20;
pub const SAME_STATE_POINTS: u32 = 10;
pub const SAME_CITY_POINTS: u32 = 10;

/// Confidence floor for a candidate to be retained for ranking.
pub const MIN_CANDIDATE_CONFIDENCE: u32 = 40;
/// A name score at or above this, combined with a state match, admits a
/// candidate even when its confidence is below the floor. Strong names in
/// the same state are meaningful evidence when addresses are noisy or
/// coordinates are missing.
pub const NAME_STATE_ESCAPE_MIN_NAME_SCORE: u32 = 70;

/// How many runner-up candidates are kept on a match for reviewer context.
pub const MAX_ALTERNATE_MATCHES: usize = 2;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Minimum name similarity for accepting a text-search hit from the places
/// provider when resolving coordinates.
pub const GEOCODE_MIN_NAME_SIMILARITY: f64 = 0.8;

/// Settings for the coordinate enrichment pass against the places provider.
#[derive(Debug, Clone)]
pub struct GeocodeConfig {
    /// Requests dispatched per batch.
    pub concurrency: usize,
    /// Mandatory pause between batches, in milliseconds.
    pub batch_delay_ms: u64,
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Base delay for exponential backoff between retries.
    pub backoff_base_ms: u64,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            batch_delay_ms: 1000,
            max_attempts: 3,
            backoff_base_ms: 500,
        }
    }
}

impl GeocodeConfig {
    /// Create configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            concurrency: env_parse("GEOCODE_CONCURRENCY", defaults.concurrency),
            batch_delay_ms: env_parse("GEOCODE_BATCH_DELAY_MS", defaults.batch_delay_ms),
            max_attempts: env_parse("GEOCODE_MAX_ATTEMPTS", defaults.max_attempts),
            backoff_base_ms: env_parse("GEOCODE_BACKOFF_BASE_MS", defaults.backoff_base_ms),
        };
        debug!("Geocode config: {:?}", config);
        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geocode_config() {
        let config = GeocodeConfig::default();
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.batch_delay_ms, 1000);
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_geocode_config_from_env() {
        std::env::set_var("GEOCODE_CONCURRENCY", "10");
        std::env::set_var("GEOCODE_BATCH_DELAY_MS", "250");
        let config = GeocodeConfig::from_env();
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.batch_delay_ms, 250);
        std::env::remove_var("GEOCODE_CONCURRENCY");
        std::env::remove_var("GEOCODE_BATCH_DELAY_MS");
    }

    #[test]
    fn test_env_parse_bad_value_falls_back() {
        std::env::set_var("GEOCODE_MAX_ATTEMPTS", "not-a-number");
        let config = GeocodeConfig::from_env();
        assert_eq!(config.max_attempts, 3);
        std::env::remove_var("GEOCODE_MAX_ATTEMPTS");
    }
}
