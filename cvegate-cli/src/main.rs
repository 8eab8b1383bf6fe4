//! cvegate -- map CPE inventories to the CVEs that apply to them
//!
//! Loads NVD JSON feeds into an in-memory dictionary, then streams
//! delimited records from stdin through a parallel matching pipeline,
//! emitting one output record per (input record, matching CVE) pair on
//! stdout.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod columns;
mod error;
mod processor;

use cli::Cli;
use cvegate_cvefeed::{Dictionary, MatchCache, ProductIndex};
use error::CliError;
use processor::Processor;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is the data stream.
    let log_level = cli.log_level.as_deref().unwrap_or("warn");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.processor_config()?;

    let mut dict = Dictionary::load_json_files(&cli.feeds)?;
    tracing::info!(records = dict.len(), "loaded vulnerability dictionary");

    for path in &cli.overrides {
        let overlay = Dictionary::load_json_files(std::slice::from_ref(path))?;
        dict.apply_overrides(&overlay);
    }

    let dict = Arc::new(dict);
    let mut cache = MatchCache::new(Arc::clone(&dict))
        .with_require_version(cli.require_version)
        .with_max_size(cli.cache_size);
    if cli.idxd {
        let index = ProductIndex::build(&dict);
        let (named, total) = index.coverage();
        tracing::info!(named, total, "indexed the dictionary");
        cache = cache.with_index(index);
    }

    let cache = Arc::new(cache);
    let processor = Processor::new(Arc::clone(&cache), config);
    let (_stdout, _stats) = processor
        .run(tokio::io::stdin(), tokio::io::stdout())
        .await?;

    let stats = cache.stats();
    tracing::info!(
        lookups = stats.lookups,
        computations = stats.computations,
        hits = stats.hits(),
        "cache utilization"
    );
    Ok(())
}
