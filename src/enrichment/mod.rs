// src/enrichment/mod.rs
//
// Coordinate enrichment for source rows that arrive without a usable
// lat/lng. Requests are dispatched in fixed-size batches with a mandatory
// delay between batches to respect upstream rate limits; within a batch,
// failures are isolated per request. A row that cannot be resolved simply
// keeps an unknown distance signal.

pub mod places_client;

use futures::future::join_all;
use log::{debug, info, warn};
use std::time::{Duration, Instant};
use strsim::jaro_winkler;

use crate::config::{GeocodeConfig, GEOCODE_MIN_NAME_SIMILARITY};
use crate::matching::normalize::normalize;
use crate::models::core::SourceRecord;
use self::places_client::{PlaceDetails, PlacesClient, PlacesError};

#[derive(Debug, Default, Clone)]
pub struct EnrichmentStats {
    pub rows_missing_coordinates: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub failed: usize,
}

struct LookupRequest {
    index: usize,
    name: String,
    address: Option<String>,
    place_id: Option<String>,
}

/// Fill in coordinates for rows that lack them, batch by batch.
pub async fn enrich_missing_coordinates(
    client: &PlacesClient,
    config: &GeocodeConfig,
    sources: &mut [SourceRecord],
) -> EnrichmentStats {
    let start = Instant::now();
    let requests: Vec<LookupRequest> = sources
        .iter()
        .enumerate()
        .filter(|(_, s)| s.coordinates().is_none())
        .map(|(index, s)| LookupRequest {
            index,
            name: s.business_name.clone(),
            address: s.full_address.clone(),
            place_id: s.place_id.clone(),
        })
        .collect();

    let mut stats = EnrichmentStats {
        rows_missing_coordinates: requests.len(),
        ..Default::default()
    };
    if requests.is_empty() {
        info!("[GEOCODE] 🌐 All source rows already carry coordinates");
        return stats;
    }

    info!(
        "[GEOCODE] 🌐 Resolving coordinates for {} rows ({} per batch, {}ms between batches)",
        requests.len(),
        config.concurrency,
        config.batch_delay_ms
    );

    let concurrency = config.concurrency.max(1);
    let total_batches = (requests.len() + concurrency - 1) / concurrency;
    for (batch_num, batch) in requests.chunks(concurrency).enumerate() {
        debug!(
            "[GEOCODE] Batch {}/{} ({} requests)",
            batch_num + 1,
            total_batches,
            batch.len()
        );
        let lookups = batch
            .iter()
            .map(|req| async move { (req.index, resolve_coordinates(client, config, req).await) });
        for (index, result) in join_all(lookups).await {
            match result {
                Ok(Some((lat, lng))) => {
                    sources[index].latitude = Some(lat);
                    sources[index].longitude = Some(lng);
                    stats.resolved += 1;
                }
                Ok(None) => {
                    debug!(
                        "[GEOCODE] No confident hit for '{}'",
                        sources[index].business_name
                    );
                    stats.unresolved += 1;
                }
                Err(e) => {
                    // One failing request never cancels its siblings; the
                    // row just loses its distance signal.
                    warn!(
                        "[GEOCODE] Lookup failed for '{}': {}",
                        sources[index].business_name, e
                    );
                    stats.failed += 1;
                }
            }
        }
        if batch_num + 1 < total_batches {
            tokio::time::sleep(Duration::from_millis(config.batch_delay_ms)).await;
        }
    }

    info!(
        "[GEOCODE] ✅ Enrichment complete in {:.2?}: {} resolved, {} unresolved, {} failed",
        start.elapsed(),
        stats.resolved,
        stats.unresolved,
        stats.failed
    );
    stats
}

/// Resolve one row: prefer a direct fetch by place identifier, fall back
/// to text search with a name-similarity guard on the best hit.
async fn resolve_coordinates(
    client: &PlacesClient,
    config: &GeocodeConfig,
    req: &LookupRequest,
) -> Result<Option<(f64, f64)>, PlacesError> {
    if let Some(place_id) = &req.place_id {
        match client.fetch_place_with_retries(config, place_id).await {
            Ok(details) => {
                if let Some(coords) = details.coordinates() {
                    return Ok(Some(coords));
                }
            }
            Err(e) if e.is_transient() => return Err(e),
            Err(e) => {
                // Permanent errors exclude only this lookup path; the text
                // search below may still resolve the row.
                debug!(
                    "[GEOCODE] Fetch by place id '{}' failed permanently: {}",
                    place_id, e
                );
            }
        }
    }

    let query = match &req.address {
        Some(address) => format!("{}, {}", req.name, address),
        None => req.name.clone(),
    };
    let hits = client.search_text_with_retries(config, &query).await?;
    Ok(pick_best_hit(&req.name, &hits).and_then(|h| h.coordinates()))
}

/// Choose the search hit whose name is closest to the source name,
/// requiring a minimum similarity so a loose text match cannot attach the
/// wrong place's coordinates.
fn pick_best_hit<'a>(source_name: &str, hits: &'a [PlaceDetails]) -> Option<&'a PlaceDetails> {
    let normalized_source = normalize(Some(source_name));
    if normalized_source.is_empty() {
        return None;
    }
    hits.iter()
        .filter_map(|hit| {
            let hit_name = normalize(hit.name.as_deref());
            if hit_name.is_empty() {
                return None;
            }
            Some((jaro_winkler(&normalized_source, &hit_name), hit))
        })
        .filter(|(similarity, _)| *similarity >= GEOCODE_MIN_NAME_SIMILARITY)
        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(_, hit)| hit)
}
