// src/models/core.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Strongly typed identifier for canonical clinic records.
///
/// Identifiers are monotonically assigned and permanent: once issued, an id
/// is never reused, even after logical deletion of the record it named.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ClinicId(pub i64);

impl fmt::Display for ClinicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One externally supplied candidate clinic from the bulk spreadsheet
/// ingestion. Immutable once loaded for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    pub business_name: String,
    #[serde(default)]
    pub full_address: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub profile_links: Vec<String>,
}

impl SourceRecord {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}

/// One existing canonical clinic from the persistent store. Read-only
/// during matching; mutated only by the correction applier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicRecord {
    pub id: ClinicId,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

impl ClinicRecord {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    /// Build a new clinic row from a source record under a freshly
    /// allocated identifier. Used when a source turns out to be an
    /// independent clinic rather than a duplicate.
    pub fn from_source(id: ClinicId, source: &SourceRecord) -> Self {
        Self {
            id,
            name: source.business_name.clone(),
            address: source.full_address.clone(),
            latitude: source.latitude,
            longitude: source.longitude,
            place_id: source.place_id.clone(),
            phone: source.phone.clone(),
            website: source.website.clone(),
        }
    }
}
