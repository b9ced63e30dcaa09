// src/main.rs

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

use recon_lib::config::GeocodeConfig;
use recon_lib::enrichment::places_client::PlacesClient;
use recon_lib::enrichment::enrich_missing_coordinates;
use recon_lib::matching::classifier::classify_all;
use recon_lib::models::core::SourceRecord;
use recon_lib::report::{build_report, write_report};
use recon_lib::store;
use recon_lib::utils::db_connect;
use recon_lib::utils::env::load_env;

#[derive(Parser, Debug)]
#[command(
    name = "reconcile",
    about = "Reconcile bulk-sourced clinic rows against the canonical clinic set"
)]
struct Cli {
    /// Bulk source rows produced by the spreadsheet ingestion (JSON array).
    #[arg(long)]
    input: PathBuf,

    /// Directory the review artifacts are written to.
    #[arg(long, default_value = "reports")]
    report_dir: PathBuf,

    /// Skip coordinate enrichment through the places provider.
    #[arg(long)]
    skip_geocode: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    load_env();
    let cli = Cli::parse();

    let run_id = Uuid::new_v4().to_string();
    let run_timestamp = Utc::now();
    let total_start = Instant::now();
    info!("🚀 Starting clinic reconciliation run {}", run_id);

    // Phase 1: load the bulk source rows
    let phase_start = Instant::now();
    let mut sources = load_source_rows(&cli.input)
        .with_context(|| format!("Failed to load source rows from {}", cli.input.display()))?;
    info!(
        "📥 Loaded {} source rows in {:.2?}",
        sources.len(),
        phase_start.elapsed()
    );

    // Phase 2: snapshot the canonical clinic set
    let pool = db_connect::connect()
        .await
        .context("Failed to connect to database")?;
    let conn = pool.get().await.context("Failed to get DB connection")?;
    let clinics = store::fetch_all_clinics(&*conn)
        .await
        .context("Failed to fetch canonical clinics")?;
    drop(conn);
    info!("🏥 Snapshot of {} canonical clinics loaded", clinics.len());

    // Phase 3: coordinate enrichment for rows that arrived without lat/lng
    if cli.skip_geocode {
        info!("Skipping coordinate enrichment (--skip-geocode)");
    } else {
        match PlacesClient::from_env() {
            Ok(client) => {
                let geocode_config = GeocodeConfig::from_env();
                enrich_missing_coordinates(&client, &geocode_config, &mut sources).await;
            }
            Err(e) => warn!(
                "Places client unavailable ({}); rows without coordinates keep an unknown distance",
                e
            ),
        }
    }

    // Phase 4: classification scan
    let bar = ProgressBar::new(sources.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    bar.set_message("Scanning source rows");
    let outcome = classify_all(&sources, &clinics, Some(&bar));
    bar.finish_with_message("Scan complete");

    // Phase 5: write the review artifact
    let report = build_report(&run_id, run_timestamp, &outcome)
        .context("Failed to build reconciliation report")?;
    let report_path = write_report(&cli.report_dir, &report)
        .context("Failed to write reconciliation report")?;

    info!(
        "✅ Run {} complete in {:.2?}: {} scanned, {} duplicates, {} creation candidates, {} already linked. Report: {}",
        run_id,
        total_start.elapsed(),
        outcome.stats.scanned,
        outcome.stats.matched,
        outcome.stats.unmatched,
        outcome.stats.already_linked,
        report_path.display()
    );
    Ok(())
}

fn load_source_rows(path: &Path) -> Result<Vec<SourceRecord>> {
    let file = File::open(path).context("Failed to open input file")?;
    let reader = BufReader::new(file);
    let rows: Vec<SourceRecord> =
        serde_json::from_reader(reader).context("Input is not a valid source-row array")?;
    Ok(rows)
}
