// src/models/matching.rs

use serde::{Deserialize, Serialize};

use crate::models::core::{ClinicRecord, SourceRecord};

/// One scored (source, clinic) pairing. Ephemeral: produced per
/// classification pass, never persisted on its own. Confidence is fully
/// determined by the four scoring inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub clinic: ClinicRecord,
    pub name_score: u32,
    pub distance_km: Option<f64>,
    pub same_city: bool,
    pub same_state: bool,
    pub confidence: u32,
    pub reasons: Vec<String>,
}

/// Outcome for one source record.
#[derive(Debug, Clone)]
pub enum MatchDecision {
    /// The best admissible candidate, plus up to two admissible runners-up
    /// retained so the reviewer can see disagreement.
    Matched {
        best: MatchCandidate,
        alternates: Vec<MatchCandidate>,
    },
    /// No admissible candidate exists; the source is a creation candidate.
    Unmatched,
}

#[derive(Debug, Clone)]
pub struct SourceDecision {
    pub source: SourceRecord,
    pub decision: MatchDecision,
}

/// Counters for one classification run.
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    /// Source rows loaded from the bulk input.
    pub sources_total: usize,
    /// Rows short-circuited by an exact place-identifier link.
    pub already_linked: usize,
    /// Rows that went through the exhaustive candidate scan.
    pub scanned: usize,
    pub matched: usize,
    pub unmatched: usize,
}

/// Everything one classification pass produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub decisions: Vec<SourceDecision>,
    pub stats: RunStats,
}
