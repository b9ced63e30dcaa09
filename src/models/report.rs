// src/models/report.rs
//
// Boundary types for the review artifacts. These are the only place where
// the wire shape (camelCase) is spelled out; everything internal stays on
// the canonical snake_case structs and converts here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::core::{ClinicId, ClinicRecord, SourceRecord};
use crate::models::matching::MatchCandidate;

/// Bumped whenever the artifact shape changes incompatibly. Consumers
/// should refuse versions they do not understand.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// The durable artifact for one reconciliation run. This is the sole
/// medium by which a human reviewer inspects and approves/rejects matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub schema_version: u32,
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub summary: ReportSummary,
    pub matches: Vec<MatchEntry>,
    pub no_matches: Vec<NoMatchEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    /// Source rows that were not already linked by place identifier and
    /// therefore went through the candidate scan.
    pub total_unmatched: usize,
    pub duplicates_found: usize,
    pub new_clinics: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEntry {
    pub source_record: SourceRecord,
    pub source_name: String,
    pub best_match: CandidateEntry,
    pub alternate_matches: Vec<CandidateEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateEntry {
    pub target_record: ClinicRecord,
    pub confidence: u32,
    pub name_score: u32,
    pub distance_km: Option<f64>,
    pub reasons: Vec<String>,
}

impl From<MatchCandidate> for CandidateEntry {
    fn from(candidate: MatchCandidate) -> Self {
        Self {
            target_record: candidate.clinic,
            confidence: candidate.confidence,
            name_score: candidate.name_score,
            distance_km: candidate.distance_km,
            reasons: candidate.reasons,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoMatchEntry {
    pub source_record: SourceRecord,
    pub source_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
}

/// One line of the append-only run log kept next to the per-run reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunLogRecord {
    pub schema_version: u32,
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub summary: ReportSummary,
    pub report_file: String,
}

/// Human-confirmed list of wrong matches, produced out of band from the
/// report artifact and consumed by the correction applier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionInput {
    pub definitely_wrong: Vec<CorrectionEntry>,
}

/// One confirmed-wrong pairing to reverse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionEntry {
    pub source_record: SourceRecord,
    pub source_name: String,
    pub wrong_target_id: ClinicId,
    pub wrong_target_name: String,
    #[serde(default)]
    pub distance_km: Option<f64>,
}
