//! An api for ranking phrases by head-to-head comparison.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use phrase_ranker_api::build_rocket;
use phrase_ranker_api::config::ApiConfig;
use phrase_ranker_common::db_util::PgStore;
use phrase_ranker_common::memory_store::MemoryStore;
use phrase_ranker_common::store::PhraseStore;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Keep phrases in memory instead of connecting to a database (nothing is persisted)
    #[arg(long, env = "PHRASE_RANKER_IN_MEMORY")]
    in_memory: bool,
}

#[rocket::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ApiConfig::from_env();
    config.log_summary();

    let store: Arc<dyn PhraseStore> = if cli.in_memory {
        tracing::warn!("Running with an in-memory store, phrases will be lost on shutdown");
        Arc::new(MemoryStore::new())
    } else {
        let database_url = config
            .database_url
            .clone()
            .context("DATABASE_URL environment variable is not set")?;
        let store = PgStore::connect(&database_url, config.pool_size)
            .context("Could not connect to the database")?;
        tracing::info!("Database connected successfully");
        Arc::new(store)
    };

    if let Err(e) = build_rocket(store, config).launch().await {
        return Err(anyhow!("Server failed: {e}"));
    }
    Ok(())
}
