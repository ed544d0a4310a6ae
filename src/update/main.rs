//! Amap center reconciliation.
//!
//! Queries every province (subdistrict=2) and prefecture (subdistrict=1)
//! through the Amap district API, merges the returned centers into the
//! region tree and saves the result as the next checkpoint.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use xzqh::amap::AmapClient;
use xzqh::center::{normalize, QueryDepths, Reconciler};
use xzqh::config::{Config, AMAP_KEY_ENV};
use xzqh::models::forest_size;
use xzqh::source::{load_tree, save_tree, select_source};

#[derive(Parser, Debug)]
#[command(name = "update")]
#[command(about = "Update region centers from the Amap district API")]
struct Args {
    /// Reload from the original tree, discarding earlier results
    #[arg(long)]
    force: bool,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Amap API key (overrides config and AMAP_API_KEY)
    #[arg(long)]
    key: Option<String>,

    /// Pristine hierarchy file
    #[arg(long)]
    original: Option<PathBuf>,

    /// Checkpoint to resume from and write to
    #[arg(long)]
    output: Option<PathBuf>,

    /// Minimum milliseconds between requests
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Number of missing regions to list in the summary
    #[arg(long, default_value = "5")]
    show_missing: usize,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(key) = args.key.clone() {
        config.amap.key = Some(key);
    }
    if let Some(interval) = args.interval_ms {
        config.amap.interval_ms = interval;
    }
    let original = args.original.clone().unwrap_or_else(|| config.files.original.clone());
    let output = args.output.clone().unwrap_or_else(|| config.files.checkpoint.clone());

    info!("Region center update via Amap district API");
    if args.force {
        warn!("Force mode: reloading from {}", original.display());
    }

    // Fail before touching any data when the provider cannot be used
    let key = config.amap.resolve_key().with_context(|| {
        format!("No Amap API key: pass --key, set [amap].key or {}", AMAP_KEY_ENV)
    })?;
    let client = AmapClient::new(&key, &config.amap).context("Failed to create Amap client")?;
    info!("Pacing requests {} ms apart", client.interval().as_millis());

    let source = select_source(args.force, &original, &output)?;
    info!(
        "Loading {} ({})",
        source.path().display(),
        if source.is_resume() { "resuming" } else { "original" }
    );
    let mut roots = load_tree(source.path())?;
    info!("Loaded {} regions", forest_size(&roots));

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )?
            .progress_chars("#>-"),
    );

    let depths = QueryDepths {
        province: config.amap.province_depth,
        prefecture: config.amap.prefecture_depth,
    };
    let mut reconciler = Reconciler::new(client)
        .with_depths(depths)
        .with_progress(pb);
    let outcome = reconciler.run(&mut roots).await;
    let stats = &outcome.stats;

    info!(
        "Requests sent: {} | targets: {} | matched: {} | node updates: {} | child updates: {}",
        reconciler.provider().request_count(),
        stats.targets,
        stats.succeeded,
        stats.nodes_updated,
        stats.children_updated
    );
    if stats.query_failures + stats.match_failures > 0 {
        warn!(
            "{} query failures, {} match failures",
            stats.query_failures, stats.match_failures
        );
        for failure in stats.failures.iter().take(args.show_missing) {
            warn!(
                "  {:?} failure: {} ({}, {})",
                failure.kind, failure.name, failure.code, failure.level
            );
        }
    }

    let coverage = &outcome.coverage;
    if coverage.is_complete() {
        info!("All {} regions have coordinates", coverage.total);
    } else {
        warn!(
            "{} of {} regions still missing coordinates ({:.2}% covered)",
            coverage.missing.len(),
            coverage.total,
            coverage.ratio() * 100.0
        );
        for missing in coverage.missing.iter().take(args.show_missing) {
            warn!("  Missing: {} ({})", missing.display_path(), missing.code);
        }
    }

    let cleaned = normalize(&roots);
    save_tree(&output, &cleaned).context("Failed to save checkpoint")?;

    Ok(())
}
