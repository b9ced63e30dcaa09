// src/enrichment/places_client.rs
//
// Thin client for the external places/geocoding provider. The provider is
// consumed only through two operations: fetch-by-identifier and
// search-by-text. Transient failures are retried with exponential backoff
// and jitter; permanent failures (not found, invalid request, access
// denied) are never retried.

use log::{debug, warn};
use rand::Rng;
use serde::Deserialize;
use std::env;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::config::GeocodeConfig;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum PlacesError {
    #[error("place not found: {0}")]
    NotFound(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("access denied by places provider")]
    AccessDenied,
    #[error("rate limited by places provider")]
    RateLimited,
    #[error("places provider unavailable (status {0})")]
    Unavailable(u16),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed places response: {0}")]
    Decode(String),
    #[error("places client not configured: {0}")]
    NotConfigured(String),
}

impl PlacesError {
    /// Transient errors are worth retrying; everything else propagates
    /// immediately and excludes the record from distance enrichment.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlacesError::RateLimited | PlacesError::Unavailable(_) | PlacesError::Transport(_)
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDetails {
    pub place_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl PlaceDetails {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some((lat, lng)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    results: Vec<PlaceDetails>,
}

pub struct PlacesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PlacesClient {
    /// Build a client from `PLACES_API_BASE_URL` and `PLACES_API_KEY`.
    pub fn from_env() -> Result<Self, PlacesError> {
        let base_url = env::var("PLACES_API_BASE_URL")
            .map_err(|_| PlacesError::NotConfigured("PLACES_API_BASE_URL is unset".to_string()))?;
        let api_key = env::var("PLACES_API_KEY")
            .map_err(|_| PlacesError::NotConfigured("PLACES_API_KEY is unset".to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Fetch one place by its provider identifier.
    pub async fn fetch_place(&self, place_id: &str) -> Result<PlaceDetails, PlacesError> {
        let url = format!("{}/places/{}", self.base_url, place_id);
        let response = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(error_for_status(status.as_u16(), place_id));
        }
        response
            .json::<PlaceDetails>()
            .await
            .map_err(|e| PlacesError::Decode(e.to_string()))
    }

    /// Free-text search; returns the provider's candidate places.
    pub async fn search_text(&self, query: &str) -> Result<Vec<PlaceDetails>, PlacesError> {
        let url = format!("{}/places/search", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("query", query), ("key", self.api_key.as_str())])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(error_for_status(status.as_u16(), query));
        }
        let parsed = response
            .json::<SearchResponse>()
            .await
            .map_err(|e| PlacesError::Decode(e.to_string()))?;
        Ok(parsed.results)
    }

    pub async fn fetch_place_with_retries(
        &self,
        config: &GeocodeConfig,
        place_id: &str,
    ) -> Result<PlaceDetails, PlacesError> {
        with_retries(config, || self.fetch_place(place_id)).await
    }

    pub async fn search_text_with_retries(
        &self,
        config: &GeocodeConfig,
        query: &str,
    ) -> Result<Vec<PlaceDetails>, PlacesError> {
        with_retries(config, || self.search_text(query)).await
    }
}

fn error_for_status(status: u16, detail: &str) -> PlacesError {
    match status {
        400 => PlacesError::InvalidRequest(detail.to_string()),
        401 | 403 => PlacesError::AccessDenied,
        404 => PlacesError::NotFound(detail.to_string()),
        429 => PlacesError::RateLimited,
        s => PlacesError::Unavailable(s),
    }
}

/// Retry a request on transient failures, up to the configured attempt
/// cap, with exponential backoff and jitter between attempts.
pub async fn with_retries<T, F, Fut>(
    config: &GeocodeConfig,
    mut operation: F,
) -> Result<T, PlacesError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PlacesError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < config.max_attempts => {
                let delay = backoff_delay(config.backoff_base_ms, attempt);
                warn!(
                    "[PLACES] Transient error (attempt {}/{}): {}. Retrying in {:?}",
                    attempt + 1,
                    config.max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if !e.is_transient() {
                    debug!("[PLACES] Permanent error, not retrying: {}", e);
                }
                return Err(e);
            }
        }
    }
}

/// Exponential backoff with up to 25% jitter on top.
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let exp = base_ms.saturating_mul(1u64 << attempt.min(6));
    let jitter = rand::thread_rng().gen_range(0..=exp / 4);
    Duration::from_millis(exp.saturating_add(jitter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(PlacesError::RateLimited.is_transient());
        assert!(PlacesError::Unavailable(503).is_transient());
        assert!(!PlacesError::NotFound("plc_1".to_string()).is_transient());
        assert!(!PlacesError::InvalidRequest("bad".to_string()).is_transient());
        assert!(!PlacesError::AccessDenied.is_transient());
        assert!(!PlacesError::Decode("truncated".to_string()).is_transient());
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(error_for_status(404, "x"), PlacesError::NotFound(_)));
        assert!(matches!(
            error_for_status(400, "x"),
            PlacesError::InvalidRequest(_)
        ));
        assert!(matches!(error_for_status(401, "x"), PlacesError::AccessDenied));
        assert!(matches!(error_for_status(429, "x"), PlacesError::RateLimited));
        assert!(matches!(
            error_for_status(502, "x"),
            PlacesError::Unavailable(502)
        ));
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        // Jitter adds at most 25%, so consecutive tiers cannot overlap.
        let d0 = backoff_delay(500, 0);
        let d2 = backoff_delay(500, 2);
        assert!(d0.as_millis() >= 500 && d0.as_millis() <= 625);
        assert!(d2.as_millis() >= 2000 && d2.as_millis() <= 2500);
    }

    #[test]
    fn test_place_details_coordinates_guard() {
        let mut details = PlaceDetails {
            place_id: "plc_1".to_string(),
            name: None,
            formatted_address: None,
            latitude: Some(25.0),
            longitude: Some(-80.0),
        };
        assert_eq!(details.coordinates(), Some((25.0, -80.0)));
        details.longitude = Some(f64::NAN);
        assert_eq!(details.coordinates(), None);
    }

    #[tokio::test]
    async fn test_with_retries_gives_up_on_permanent_errors() {
        let config = GeocodeConfig {
            max_attempts: 3,
            backoff_base_ms: 1,
            ..GeocodeConfig::default()
        };
        let mut calls = 0u32;
        let result: Result<(), PlacesError> = with_retries(&config, || {
            calls += 1;
            async { Err(PlacesError::AccessDenied) }
        })
        .await;
        assert!(matches!(result, Err(PlacesError::AccessDenied)));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_with_retries_retries_transient_then_succeeds() {
        let config = GeocodeConfig {
            max_attempts: 3,
            backoff_base_ms: 1,
            ..GeocodeConfig::default()
        };
        let mut calls = 0u32;
        let result = with_retries(&config, || {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt < 3 {
                    Err(PlacesError::RateLimited)
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_with_retries_respects_attempt_cap() {
        let config = GeocodeConfig {
            max_attempts: 2,
            backoff_base_ms: 1,
            ..GeocodeConfig::default()
        };
        let mut calls = 0u32;
        let result: Result<(), PlacesError> = with_retries(&config, || {
            calls += 1;
            async { Err(PlacesError::Unavailable(503)) }
        })
        .await;
        assert!(matches!(result, Err(PlacesError::Unavailable(503))));
        assert_eq!(calls, 2);
    }
}
