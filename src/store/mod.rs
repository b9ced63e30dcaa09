// src/store/mod.rs
//
// Read/write contract against the persistent clinic store. Reads feed the
// matching snapshot (treated as immutable for the duration of one run);
// writes are only ever performed by the correction applier.

use log::debug;
use thiserror::Error;
use tokio_postgres::GenericClient;

use crate::models::core::{ClinicId, ClinicRecord, SourceRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] tokio_postgres::Error),
}

/// Fetch the full canonical clinic set, ordered by identifier. The
/// ordering is what makes classification tie-breaks deterministic.
pub async fn fetch_all_clinics(
    conn: &impl GenericClient,
) -> Result<Vec<ClinicRecord>, StoreError> {
    let rows = conn
        .query(
            "SELECT id, name, address, latitude, longitude, place_id, phone, website
             FROM public.clinic
             ORDER BY id",
            &[],
        )
        .await?;
    let clinics = rows
        .iter()
        .map(|row| ClinicRecord {
            id: ClinicId(row.get("id")),
            name: row.get("name"),
            address: row.get("address"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
            place_id: row.get("place_id"),
            phone: row.get("phone"),
            website: row.get("website"),
        })
        .collect();
    Ok(clinics)
}

/// Highest clinic identifier issued so far, or 0 for an empty store. Used
/// exactly once per correction batch to seed the allocator.
pub async fn max_clinic_id(conn: &impl GenericClient) -> Result<i64, StoreError> {
    let row = conn
        .query_one("SELECT COALESCE(MAX(id), 0) AS max_id FROM public.clinic", &[])
        .await?;
    Ok(row.get("max_id"))
}

/// Delete the enrichment linkage row for a wrongly assigned pairing.
/// Returns the number of rows removed; zero means a prior partial run
/// already removed it, which callers treat as a successful no-op.
pub async fn delete_enrichment(
    conn: &impl GenericClient,
    place_id: &str,
    clinic_id: ClinicId,
) -> Result<u64, StoreError> {
    let deleted = conn
        .execute(
            "DELETE FROM public.clinic_enrichment WHERE place_id = $1 AND clinic_id = $2",
            &[&place_id, &clinic_id.0],
        )
        .await?;
    debug!(
        "[STORE] delete_enrichment(place_id={}, clinic_id={}) removed {} row(s)",
        place_id, clinic_id, deleted
    );
    Ok(deleted)
}

/// Insert a new canonical clinic row under an explicitly allocated
/// identifier.
pub async fn insert_clinic(
    conn: &impl GenericClient,
    clinic: &ClinicRecord,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO public.clinic
            (id, name, address, latitude, longitude, place_id, phone, website, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())",
        &[
            &clinic.id.0,
            &clinic.name,
            &clinic.address,
            &clinic.latitude,
            &clinic.longitude,
            &clinic.place_id,
            &clinic.phone,
            &clinic.website,
        ],
    )
    .await?;
    Ok(())
}

/// Insert the extended enrichment payload for a clinic. The full source
/// record rides along as JSON so no ingestion detail is lost.
pub async fn insert_enrichment(
    conn: &impl GenericClient,
    clinic_id: ClinicId,
    source: &SourceRecord,
) -> Result<(), StoreError> {
    let payload = serde_json::to_value(source)
        .unwrap_or_else(|_| serde_json::Value::Null);
    conn.execute(
        "INSERT INTO public.clinic_enrichment (clinic_id, place_id, payload, created_at)
         VALUES ($1, $2, $3, NOW())",
        &[&clinic_id.0, &source.place_id, &payload],
    )
    .await?;
    Ok(())
}
