// src/matching/classifier.rs
//
// Per-source orchestration: every source row that is not already linked by
// an exact place-identifier match is scored against the full ordered
// clinic set, admissible candidates are ranked, and the row is classified
// as a duplicate of an existing clinic or a creation candidate. The scan
// is O(sources x targets) on purpose: at the scale this system targets
// (low thousands on each side) simplicity and auditability beat asymptotic
// efficiency.

use indicatif::ProgressBar;
use log::{debug, info};
use std::collections::HashMap;
use std::time::Instant;

use crate::config::MAX_ALTERNATE_MATCHES;
use crate::matching::confidence::{aggregate, is_admissible};
use crate::matching::geo::distance_km;
use crate::matching::location::{extract_city_state, AddressLocation};
use crate::matching::normalize::normalize;
use crate::matching::similarity::best_name_score;
use crate::models::core::{ClinicId, ClinicRecord, SourceRecord};
use crate::models::matching::{
    MatchCandidate, MatchDecision, RunOutcome, RunStats, SourceDecision,
};

/// City/state for a source row: structured components from the ingestion
/// when present, otherwise the address heuristic.
pub fn source_location(source: &SourceRecord) -> AddressLocation {
    let derived = extract_city_state(source.full_address.as_deref());
    AddressLocation {
        city: source
            .city
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or(derived.city),
        state: source
            .state
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or(derived.state),
    }
}

fn same_city(a: &str, b: &str) -> bool {
    let na = normalize(Some(a));
    let nb = normalize(Some(b));
    !na.is_empty() && !nb.is_empty() && (na.contains(&nb) || nb.contains(&na))
}

fn same_state(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && a.eq_ignore_ascii_case(b)
}

/// Score one source row against every clinic, keep the admissible
/// candidates, and rank them. Ties are broken by the earlier-scanned
/// clinic (stable sort over the id-ordered set), so the outcome is
/// deterministic for a fixed clinic ordering.
pub fn classify_source(source: &SourceRecord, clinics: &[ClinicRecord]) -> MatchDecision {
    let source_loc = source_location(source);
    let source_coords = source.coordinates();

    let mut candidates: Vec<MatchCandidate> = Vec::new();
    for clinic in clinics {
        let name_score = best_name_score(&source.business_name, &clinic.name);
        let dist = distance_km(source_coords, clinic.coordinates());
        let clinic_loc = extract_city_state(clinic.address.as_deref());
        let state_match = same_state(&source_loc.state, &clinic_loc.state);
        let city_match = same_city(&source_loc.city, &clinic_loc.city);

        let score = aggregate(name_score, dist, city_match, state_match);
        if is_admissible(score.confidence, name_score, state_match) {
            candidates.push(MatchCandidate {
                clinic: clinic.clone(),
                name_score,
                distance_km: dist,
                same_city: city_match,
                same_state: state_match,
                confidence: score.confidence,
                reasons: score.reasons,
            });
        }
    }

    candidates.sort_by(|a, b| b.confidence.cmp(&a.confidence));
    let mut ranked = candidates.into_iter();
    match ranked.next() {
        Some(best) => MatchDecision::Matched {
            best,
            alternates: ranked.take(MAX_ALTERNATE_MATCHES).collect(),
        },
        None => MatchDecision::Unmatched,
    }
}

/// Run the full classification pass. Sequential, so tie-breaks are
/// reproducible; the clinic snapshot is treated as immutable for the
/// duration of the run.
pub fn classify_all(
    sources: &[SourceRecord],
    clinics: &[ClinicRecord],
    progress: Option<&ProgressBar>,
) -> RunOutcome {
    let start = Instant::now();
    info!(
        "[CLASSIFY] 🎯 Scanning {} source rows against {} canonical clinics",
        sources.len(),
        clinics.len()
    );

    let place_index: HashMap<&str, ClinicId> = clinics
        .iter()
        .filter_map(|c| c.place_id.as_deref().map(|p| (p, c.id)))
        .collect();

    let mut stats = RunStats {
        sources_total: sources.len(),
        ..Default::default()
    };
    let mut decisions = Vec::new();

    for source in sources {
        if let Some(pb) = progress {
            pb.inc(1);
        }
        if let Some(id) = source
            .place_id
            .as_deref()
            .and_then(|p| place_index.get(p))
        {
            stats.already_linked += 1;
            debug!(
                "[CLASSIFY] '{}' already linked to clinic {} by place id, skipping",
                source.business_name, id
            );
            continue;
        }

        stats.scanned += 1;
        let decision = classify_source(source, clinics);
        match &decision {
            MatchDecision::Matched { best, alternates } => {
                stats.matched += 1;
                debug!(
                    "[CLASSIFY] '{}' -> clinic {} '{}' (confidence {}, {} alternates)",
                    source.business_name,
                    best.clinic.id,
                    best.clinic.name,
                    best.confidence,
                    alternates.len()
                );
            }
            MatchDecision::Unmatched => {
                stats.unmatched += 1;
                debug!(
                    "[CLASSIFY] '{}' has no admissible candidate, creation candidate",
                    source.business_name
                );
            }
        }
        decisions.push(SourceDecision {
            source: source.clone(),
            decision,
        });
    }

    info!(
        "[CLASSIFY] ✅ Scan complete in {:.2?}: {} scanned, {} duplicates, {} creation candidates, {} already linked",
        start.elapsed(),
        stats.scanned,
        stats.matched,
        stats.unmatched,
        stats.already_linked
    );

    RunOutcome { decisions, stats }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, lat: Option<f64>, lng: Option<f64>) -> SourceRecord {
        SourceRecord {
            business_name: name.to_string(),
            full_address: None,
            street: None,
            city: None,
            state: None,
            postal_code: None,
            place_id: None,
            latitude: lat,
            longitude: lng,
            phone: None,
            website: None,
            profile_links: vec![],
        }
    }

    fn clinic(id: i64, name: &str, lat: Option<f64>, lng: Option<f64>) -> ClinicRecord {
        ClinicRecord {
            id: ClinicId(id),
            name: name.to_string(),
            address: None,
            latitude: lat,
            longitude: lng,
            place_id: None,
            phone: None,
            website: None,
        }
    }

    #[test]
    fn test_skin_solutions_match() {
        // Token-sort pushes the name into the top tier; 0.1 km adds the
        // same-location points.
        let src = source("Skin Solutions Miami", Some(25.7900), Some(-80.1300));
        let clinics = vec![clinic(
            1,
            "Skin Solutions of Miami",
            Some(25.7909),
            Some(-80.1300),
        )];
        match classify_source(&src, &clinics) {
            MatchDecision::Matched { best, .. } => {
                assert!(best.confidence >= 90, "confidence {}", best.confidence);
                assert_eq!(best.clinic.id, ClinicId(1));
                assert!(best.reasons.iter().any(|r| r.starts_with("Name match")));
                assert!(best.reasons.iter().any(|r| r.starts_with("Same location")));
            }
            MatchDecision::Unmatched => panic!("expected a match"),
        }
    }

    #[test]
    fn test_identical_name_close_by_is_high_confidence() {
        let src = source("Harbor Dermatology", Some(27.9500), Some(-82.4600));
        let clinics = vec![clinic(3, "Harbor Dermatology", Some(27.9510), Some(-82.4600))];
        match classify_source(&src, &clinics) {
            MatchDecision::Matched { best, .. } => {
                assert_eq!(best.name_score, 100);
                assert!(best.confidence >= 90);
            }
            MatchDecision::Unmatched => panic!("expected a match"),
        }
    }

    #[test]
    fn test_weak_name_far_away_is_unmatched() {
        // Nothing within 50 km and a weak name: no admissible candidate,
        // so the source is a creation candidate.
        let src = source("ABC Wellness Clinic", Some(25.7617), Some(-80.1918));
        let clinics = vec![clinic(
            5,
            "Gulf Coast Oncology Partners",
            Some(27.9500),
            Some(-82.4600),
        )];
        assert!(matches!(
            classify_source(&src, &clinics),
            MatchDecision::Unmatched
        ));
    }

    #[test]
    fn test_partial_name_same_state_is_excluded_below_escape() {
        // Name lands in the partial tier (<70), distance unknown: 15 + 10
        // = 25 is below the floor and the escape clause needs a 70+ name.
        let mut src = source("Harbor Clinic", None, None);
        src.state = Some("FL".to_string());
        let mut target = clinic(7, "Harbor Dental", None, None);
        target.address = Some("12 Bay St, Tampa, FL 33601".to_string());
        assert!(matches!(
            classify_source(&src, &clinics_vec(target)),
            MatchDecision::Unmatched
        ));
    }

    #[test]
    fn test_strong_name_same_state_admitted_via_escape() {
        // Name in the 70s with a state match: confidence 25 stays below
        // the floor but the escape clause admits the candidate.
        let mut src = source("Harbor Point Clinic", None, None);
        src.state = Some("FL".to_string());
        let mut target = clinic(8, "Harbor Point Dental", None, None);
        target.address = Some("12 Bay St, Tampa, FL 33601".to_string());
        match classify_source(&src, &clinics_vec(target)) {
            MatchDecision::Matched { best, .. } => {
                assert!(best.name_score >= 70 && best.name_score < 75);
                assert!(best.confidence < 40);
                assert!(best.same_state);
            }
            MatchDecision::Unmatched => panic!("escape clause should admit this"),
        }
    }

    #[test]
    fn test_tie_break_prefers_earlier_clinic() {
        let src = source("Lakeside Counseling", None, None);
        let mut a = source_clinic_same_state(11, "Lakeside Counseling");
        let mut b = source_clinic_same_state(12, "Lakeside Counseling");
        a.address = None;
        b.address = None;
        let clinics = vec![a, b];
        match classify_source(&src, &clinics) {
            MatchDecision::Matched { best, alternates } => {
                assert_eq!(best.clinic.id, ClinicId(11));
                assert_eq!(alternates[0].clinic.id, ClinicId(12));
            }
            MatchDecision::Unmatched => panic!("expected a match"),
        }
    }

    #[test]
    fn test_alternates_are_capped_at_two() {
        let src = source("Lakeside Counseling", None, None);
        let clinics: Vec<ClinicRecord> = (1..=4)
            .map(|i| clinic(i, "Lakeside Counseling", None, None))
            .collect();
        match classify_source(&src, &clinics) {
            MatchDecision::Matched { best, alternates } => {
                assert_eq!(best.clinic.id, ClinicId(1));
                assert_eq!(alternates.len(), 2);
                assert_eq!(alternates[0].clinic.id, ClinicId(2));
                assert_eq!(alternates[1].clinic.id, ClinicId(3));
            }
            MatchDecision::Unmatched => panic!("expected a match"),
        }
    }

    #[test]
    fn test_place_id_pre_link_short_circuits() {
        let mut src = source("Harbor Dermatology", None, None);
        src.place_id = Some("plc_1".to_string());
        let mut target = clinic(9, "Harbor Dermatology", None, None);
        target.place_id = Some("plc_1".to_string());
        let outcome = classify_all(&[src], &[target], None);
        assert_eq!(outcome.stats.already_linked, 1);
        assert_eq!(outcome.stats.scanned, 0);
        assert!(outcome.decisions.is_empty());
    }

    #[test]
    fn test_run_stats_add_up() {
        let sources = vec![
            source("Harbor Dermatology", Some(27.9500), Some(-82.4600)),
            source("Totally Unrelated Name Qz", None, None),
        ];
        let clinics = vec![clinic(1, "Harbor Dermatology", Some(27.9501), Some(-82.4600))];
        let outcome = classify_all(&sources, &clinics, None);
        assert_eq!(outcome.stats.sources_total, 2);
        assert_eq!(outcome.stats.scanned, 2);
        assert_eq!(outcome.stats.matched, 1);
        assert_eq!(outcome.stats.unmatched, 1);
    }

    fn clinics_vec(c: ClinicRecord) -> Vec<ClinicRecord> {
        vec![c]
    }

    fn source_clinic_same_state(id: i64, name: &str) -> ClinicRecord {
        clinic(id, name, None, None)
    }
}
