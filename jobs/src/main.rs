//! Scheduled jobs for the phrase ranker.
//!
//! Replays the full comparison log and reports phrases whose stored rating
//! has drifted from what the log says it should be.

#![warn(clippy::all, clippy::pedantic)]

use anyhow::{Context, Result, bail};
use clap::Parser;
use phrase_ranker_common::RatingUpdate;
use phrase_ranker_common::db_util::{self, PgStore};
use phrase_ranker_common::error::RankerError;
use phrase_ranker_common::replay::{RatingDrift, find_drift, replay_ratings};
use phrase_ranker_common::store::PhraseStore;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Rewrite drifted ratings with their replayed values
    #[arg(long)]
    apply: bool,

    /// Largest difference between stored and replayed ratings that is ignored
    #[arg(long, default_value_t = 1e-6)]
    tolerance: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let database_url = db_util::get_database_url()?;
    let store = PgStore::connect(&database_url, 1)
        .context("Could not connect to the database")?;
    println!("Database connection established. Scheduled jobs started.");

    let snapshot = store.load_snapshot()?;
    println!(
        "=== RATING REPLAY: {} phrases, {} comparisons ===",
        snapshot.phrases.len(),
        snapshot.comparisons.len()
    );

    let report = replay_ratings(&snapshot.phrases, &snapshot.comparisons)?;
    if !report.skipped.is_empty() {
        println!(
            "WARNING: {} comparisons could not be scored and were skipped: {:?}",
            report.skipped.len(),
            report.skipped
        );
    }

    let drift = find_drift(&snapshot.phrases, &report.ratings, cli.tolerance);
    if drift.is_empty() {
        println!("All ratings match the comparison log.");
        return Ok(());
    }

    for d in &drift {
        println!(
            "Phrase #{}: stored {:.4}, replayed {:.4} (off by {:+.4})",
            d.phrase_id,
            d.stored_rating,
            d.replayed_rating,
            d.difference()
        );
    }

    if cli.apply {
        let corrections: Vec<RatingUpdate> = drift.iter().map(RatingDrift::correction).collect();
        match store.overwrite_ratings(&corrections) {
            Ok(()) => {
                log::info!("Overwrote {} drifted ratings", corrections.len());
                println!("Updated {} ratings.", corrections.len());
            }
            Err(RankerError::StaleRating { phrase_id }) => {
                bail!(
                    "Phrase #{phrase_id} was voted on while the job ran; nothing was updated. Run the job again."
                );
            }
            Err(err) => return Err(err.into()),
        }
    } else {
        println!(
            "{} ratings drifted. Run again with --apply to correct them.",
            drift.len()
        );
    }

    Ok(())
}
