// src/report/mod.rs
//
// Serializes one matching run into the durable review artifact. Each run
// writes a new, independently timestamped file, so repeated runs never
// clobber each other; a one-line record per run is also appended to a run
// log in the same directory. The artifact is the sole medium by which a
// human reviewer inspects and approves/rejects matches.

use chrono::{DateTime, Utc};
use log::info;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::matching::classifier::source_location;
use crate::models::matching::{MatchDecision, RunOutcome};
use crate::models::report::{
    MatchEntry, NoMatchEntry, ReportSummary, RunLogRecord, RunReport, REPORT_SCHEMA_VERSION,
};

pub const RUN_LOG_FILE: &str = "reconciliation_runs.jsonl";

#[derive(Debug, Error)]
pub enum ReportError {
    /// Fatal for the run: with no source rows there is nothing to review,
    /// and no correction step may proceed from an empty artifact.
    #[error("no source rows were scanned; refusing to write an empty report")]
    NoSourceRows,
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write report artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// Convert a run's decisions into the boundary artifact shape.
pub fn build_report(
    run_id: &str,
    timestamp: DateTime<Utc>,
    outcome: &RunOutcome,
) -> Result<RunReport, ReportError> {
    if outcome.stats.sources_total == 0 {
        return Err(ReportError::NoSourceRows);
    }

    let mut matches = Vec::new();
    let mut no_matches = Vec::new();
    for entry in &outcome.decisions {
        match &entry.decision {
            MatchDecision::Matched { best, alternates } => {
                matches.push(MatchEntry {
                    source_record: entry.source.clone(),
                    source_name: entry.source.business_name.clone(),
                    best_match: best.clone().into(),
                    alternate_matches: alternates.iter().cloned().map(Into::into).collect(),
                });
            }
            MatchDecision::Unmatched => {
                let location = source_location(&entry.source);
                no_matches.push(NoMatchEntry {
                    source_record: entry.source.clone(),
                    source_name: entry.source.business_name.clone(),
                    address: entry.source.full_address.clone().unwrap_or_default(),
                    city: location.city,
                    state: location.state,
                });
            }
        }
    }

    Ok(RunReport {
        schema_version: REPORT_SCHEMA_VERSION,
        run_id: run_id.to_string(),
        timestamp,
        summary: ReportSummary {
            total_unmatched: outcome.stats.scanned,
            duplicates_found: outcome.stats.matched,
            new_clinics: outcome.stats.unmatched,
        },
        matches,
        no_matches,
    })
}

/// Write the per-run artifact and append the run-log line. Returns the
/// path of the new artifact.
pub fn write_report(dir: &Path, report: &RunReport) -> Result<PathBuf, ReportError> {
    fs::create_dir_all(dir)?;

    let file_name = format!(
        "reconciliation_report_{}.json",
        report.timestamp.format("%Y%m%d_%H%M%S")
    );
    let path = dir.join(&file_name);
    let body = serde_json::to_string_pretty(report)?;
    fs::write(&path, body)?;

    let log_record = RunLogRecord {
        schema_version: report.schema_version,
        run_id: report.run_id.clone(),
        timestamp: report.timestamp,
        summary: report.summary.clone(),
        report_file: file_name,
    };
    let mut log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(RUN_LOG_FILE))?;
    writeln!(log_file, "{}", serde_json::to_string(&log_record)?)?;

    info!(
        "[REPORT] 📝 Wrote {} ({} duplicates, {} creation candidates)",
        path.display(),
        report.summary.duplicates_found,
        report.summary.new_clinics
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::core::{ClinicId, ClinicRecord, SourceRecord};
    use crate::models::matching::{MatchCandidate, RunStats, SourceDecision};

    fn sample_source(name: &str) -> SourceRecord {
        SourceRecord {
            business_name: name.to_string(),
            full_address: Some("1 Ocean Dr, Miami, FL 33139".to_string()),
            street: None,
            city: None,
            state: None,
            postal_code: None,
            place_id: None,
            latitude: None,
            longitude: None,
            phone: None,
            website: None,
            profile_links: vec![],
        }
    }

    fn sample_outcome() -> RunOutcome {
        let clinic = ClinicRecord {
            id: ClinicId(7),
            name: "Miami Skin Solutions".to_string(),
            address: None,
            latitude: None,
            longitude: None,
            place_id: None,
            phone: None,
            website: None,
        };
        let candidate = MatchCandidate {
            clinic,
            name_score: 100,
            distance_km: Some(0.2),
            same_city: false,
            same_state: false,
            confidence: 90,
            reasons: vec!["Name match: 100%".to_string(), "Same location: 0.20km".to_string()],
        };
        RunOutcome {
            decisions: vec![
                SourceDecision {
                    source: sample_source("Miami Skin Solutions"),
                    decision: MatchDecision::Matched {
                        best: candidate,
                        alternates: vec![],
                    },
                },
                SourceDecision {
                    source: sample_source("Brand New Clinic"),
                    decision: MatchDecision::Unmatched,
                },
            ],
            stats: RunStats {
                sources_total: 2,
                already_linked: 0,
                scanned: 2,
                matched: 1,
                unmatched: 1,
            },
        }
    }

    #[test]
    fn test_build_report_counts_and_entries() {
        let report = build_report("run-1", Utc::now(), &sample_outcome()).unwrap();
        assert_eq!(report.schema_version, REPORT_SCHEMA_VERSION);
        assert_eq!(report.summary.total_unmatched, 2);
        assert_eq!(report.summary.duplicates_found, 1);
        assert_eq!(report.summary.new_clinics, 1);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.no_matches.len(), 1);
        assert_eq!(report.matches[0].best_match.target_record.id, ClinicId(7));
        // The no-match entry carries the extracted city/state for review.
        assert_eq!(report.no_matches[0].city, "Miami");
        assert_eq!(report.no_matches[0].state, "FL");
    }

    #[test]
    fn test_build_report_fails_fast_on_empty_run() {
        let outcome = RunOutcome {
            decisions: vec![],
            stats: RunStats::default(),
        };
        assert!(matches!(
            build_report("run-1", Utc::now(), &outcome),
            Err(ReportError::NoSourceRows)
        ));
    }

    #[test]
    fn test_write_report_creates_artifact_and_log() {
        let dir = std::env::temp_dir().join(format!("recon_report_test_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);

        let report = build_report("run-1", Utc::now(), &sample_outcome()).unwrap();
        let path = write_report(&dir, &report).unwrap();
        assert!(path.exists());

        let body = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["schemaVersion"], 1);
        assert_eq!(parsed["summary"]["duplicatesFound"], 1);

        let log = fs::read_to_string(dir.join(RUN_LOG_FILE)).unwrap();
        assert_eq!(log.lines().count(), 1);
        let record: serde_json::Value = serde_json::from_str(log.lines().next().unwrap()).unwrap();
        assert_eq!(record["runId"], "run-1");

        let _ = fs::remove_dir_all(&dir);
    }
}
