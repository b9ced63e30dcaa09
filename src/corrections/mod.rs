// src/corrections/mod.rs
//
// Applies human-confirmed wrong-match reversals. Each action is a small
// state machine: Pending -> ReversalDone -> Created -> Complete, or
// Pending -> Failed on a step error. The identifier allocator is seeded
// once per batch and passed through every step, so ids stay strictly
// increasing across the whole batch and are never derived from a stale
// maximum.

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::time::Instant;

use crate::models::core::{ClinicId, ClinicRecord};
use crate::models::report::{CorrectionEntry, CorrectionInput};
use crate::store;
use crate::utils::db_connect::PgPool;

/// Hands out clinic identifiers for one correction batch. Identifiers are
/// strictly greater than everything issued before the batch started and
/// everything reserved earlier in the batch; a reserved id is consumed
/// even if the insert it was reserved for later fails, so ids are never
/// reused.
#[derive(Debug)]
pub struct IdAllocator {
    next: i64,
}

impl IdAllocator {
    pub fn starting_after(max_issued: i64) -> Self {
        Self { next: max_issued + 1 }
    }

    pub fn reserve(&mut self) -> ClinicId {
        let id = ClinicId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionState {
    Pending,
    ReversalDone,
    /// The new clinic row exists but its enrichment insert failed; the
    /// action needs manual follow-up. The clinic row must survive: it is
    /// now the sole representation of that clinic.
    Created,
    Complete,
    Failed,
}

#[derive(Debug)]
pub struct CorrectionOutcome {
    pub source_name: String,
    pub old_id: ClinicId,
    pub new_id: Option<ClinicId>,
    pub state: CorrectionState,
}

#[derive(Debug, Default)]
pub struct CorrectionSummary {
    pub completed: usize,
    pub needs_follow_up: usize,
    pub failed: usize,
    pub outcomes: Vec<CorrectionOutcome>,
}

/// Apply every confirmed-wrong action in order. Per-record store failures
/// are logged and the batch continues; nothing is rolled back.
pub async fn apply_corrections(
    pool: &PgPool,
    input: &CorrectionInput,
) -> Result<CorrectionSummary> {
    let start = Instant::now();
    let total = input.definitely_wrong.len();
    info!("[CORRECT] 🔧 Applying {} confirmed wrong matches", total);

    let conn = pool
        .get()
        .await
        .context("Corrections: failed to get DB connection")?;

    let max_id = store::max_clinic_id(&*conn)
        .await
        .context("Corrections: failed to read max clinic id")?;
    let mut allocator = IdAllocator::starting_after(max_id);
    debug!("[CORRECT] Allocator seeded after id {}", max_id);

    let mut summary = CorrectionSummary::default();
    for entry in &input.definitely_wrong {
        let outcome = apply_one(&*conn, &mut allocator, entry).await;
        match outcome.state {
            CorrectionState::Complete => summary.completed += 1,
            CorrectionState::Created => summary.needs_follow_up += 1,
            _ => summary.failed += 1,
        }
        summary.outcomes.push(outcome);
    }

    info!(
        "[CORRECT] ✅ Batch complete in {:.2?}: {} complete, {} need follow-up, {} failed",
        start.elapsed(),
        summary.completed,
        summary.needs_follow_up,
        summary.failed
    );
    Ok(summary)
}

async fn apply_one(
    conn: &impl tokio_postgres::GenericClient,
    allocator: &mut IdAllocator,
    entry: &CorrectionEntry,
) -> CorrectionOutcome {
    let old_id = entry.wrong_target_id;

    // Step 1: reverse the erroneous linkage. Deleting an already-removed
    // row is a no-op, not an error, so a prior partial run can be replayed
    // safely. Either way the action advances to ReversalDone.
    match entry.source_record.place_id.as_deref() {
        Some(place_id) => match store::delete_enrichment(conn, place_id, old_id).await {
            Ok(0) => {
                debug!(
                    "[CORRECT] '{}': linkage (place {}, clinic {}) already removed",
                    entry.source_name, place_id, old_id
                );
            }
            Ok(_) => {}
            Err(e) => {
                error!(
                    "[CORRECT] '{}': reversal failed for (place {}, clinic {}): {}",
                    entry.source_name, place_id, old_id, e
                );
                return CorrectionOutcome {
                    source_name: entry.source_name.clone(),
                    old_id,
                    new_id: None,
                    state: CorrectionState::Failed,
                };
            }
        },
        None => {
            // No place identifier means no enrichment row can exist.
            debug!(
                "[CORRECT] '{}': no place id on source, nothing to reverse",
                entry.source_name
            );
        }
    }

    // Step 2: re-create the source as an independent clinic under a fresh
    // identifier, then attach its enrichment payload.
    let new_id = allocator.reserve();
    let clinic = ClinicRecord::from_source(new_id, &entry.source_record);
    if let Err(e) = store::insert_clinic(conn, &clinic).await {
        error!(
            "[CORRECT] '{}': clinic insert failed for new id {}: {}",
            entry.source_name, new_id, e
        );
        return CorrectionOutcome {
            source_name: entry.source_name.clone(),
            old_id,
            new_id: None,
            state: CorrectionState::Failed,
        };
    }
    if let Err(e) = store::insert_enrichment(conn, new_id, &entry.source_record).await {
        // The clinic row survives; only the enrichment payload is missing.
        warn!(
            "[CORRECT] '{}': enrichment insert failed for clinic {}; left in Created, needs manual follow-up: {}",
            entry.source_name, new_id, e
        );
        return CorrectionOutcome {
            source_name: entry.source_name.clone(),
            old_id,
            new_id: Some(new_id),
            state: CorrectionState::Created,
        };
    }

    info!(
        "[CORRECT] 🔁 '{}': clinic {} -> {} (wrong match '{}' reversed)",
        entry.source_name, old_id, new_id, entry.wrong_target_name
    );
    CorrectionOutcome {
        source_name: entry.source_name.clone(),
        old_id,
        new_id: Some(new_id),
        state: CorrectionState::Complete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_is_strictly_increasing() {
        let mut allocator = IdAllocator::starting_after(120);
        let ids: Vec<ClinicId> = (0..5).map(|_| allocator.reserve()).collect();
        assert_eq!(ids[0], ClinicId(121));
        for pair in ids.windows(2) {
            assert!(pair[1].0 > pair[0].0);
        }
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_allocator_never_reissues_after_empty_store() {
        let mut allocator = IdAllocator::starting_after(0);
        assert_eq!(allocator.reserve(), ClinicId(1));
        assert_eq!(allocator.reserve(), ClinicId(2));
    }

    #[test]
    fn test_n_actions_consume_n_ids() {
        // Every action reserves exactly one id, even hypothetically failed
        // ones, so a batch of N confirmed wrong matches yields N strictly
        // increasing, previously unused identifiers.
        let mut allocator = IdAllocator::starting_after(7);
        let batch: Vec<i64> = (0..3).map(|_| allocator.reserve().0).collect();
        assert_eq!(batch, vec![8, 9, 10]);
    }
}
