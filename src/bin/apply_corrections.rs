// src/bin/apply_corrections.rs
//
// Consumes the human-confirmed wrong-match artifact and reverses each bad
// linkage, re-creating the source as an independent clinic under a fresh
// identifier.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use recon_lib::corrections::{apply_corrections, CorrectionState};
use recon_lib::models::report::CorrectionInput;
use recon_lib::utils::db_connect;
use recon_lib::utils::env::load_env;

#[derive(Parser, Debug)]
#[command(
    name = "apply_corrections",
    about = "Reverse confirmed wrong matches and re-create their sources as new clinics"
)]
struct Cli {
    /// Correction artifact with the reviewer's definitelyWrong list.
    #[arg(long)]
    input: PathBuf,

    /// Parse and list the actions without touching the store.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    load_env();
    let cli = Cli::parse();

    let file = File::open(&cli.input)
        .with_context(|| format!("Failed to open {}", cli.input.display()))?;
    let input: CorrectionInput = serde_json::from_reader(BufReader::new(file))
        .context("Correction artifact is not a valid definitelyWrong list")?;

    if input.definitely_wrong.is_empty() {
        info!("No confirmed wrong matches in {}; nothing to do", cli.input.display());
        return Ok(());
    }

    if cli.dry_run {
        info!("Dry run: {} actions would be applied", input.definitely_wrong.len());
        for entry in &input.definitely_wrong {
            info!(
                "  would reverse '{}' -> clinic {} '{}'",
                entry.source_name, entry.wrong_target_id, entry.wrong_target_name
            );
        }
        return Ok(());
    }

    let pool = db_connect::connect()
        .await
        .context("Failed to connect to database")?;
    let summary = apply_corrections(&pool, &input).await?;

    for outcome in &summary.outcomes {
        match (outcome.state, outcome.new_id) {
            (CorrectionState::Complete, Some(new_id)) => {
                info!("'{}': {} -> {}", outcome.source_name, outcome.old_id, new_id);
            }
            (CorrectionState::Created, Some(new_id)) => {
                warn!(
                    "'{}': {} -> {} created but missing enrichment payload; needs manual follow-up",
                    outcome.source_name, outcome.old_id, new_id
                );
            }
            _ => {
                warn!(
                    "'{}': correction for clinic {} failed; re-run after fixing the store",
                    outcome.source_name, outcome.old_id
                );
            }
        }
    }

    info!(
        "Corrections finished: {} complete, {} need follow-up, {} failed",
        summary.completed, summary.needs_follow_up, summary.failed
    );
    Ok(())
}
