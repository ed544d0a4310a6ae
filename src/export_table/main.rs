//! Binary table export of the finished hierarchy.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use xzqh::center::{audit, normalize};
use xzqh::export::write_table;
use xzqh::source::load_tree;

#[derive(Parser, Debug)]
#[command(name = "export")]
#[command(about = "Write the annotated tree as a binary region table")]
struct Args {
    /// Annotated tree
    #[arg(short, long, default_value = "xzqh_with_amap_coordinates.json")]
    input: PathBuf,

    /// Binary table output
    #[arg(short, long, default_value = "xzqh.bin")]
    output: PathBuf,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Reading {}", args.input.display());
    // The table writer does not validate, so hand it a normalized tree
    let roots = normalize(&load_tree(&args.input)?);

    let report = audit(&roots);
    if !report.is_complete() {
        warn!(
            "{} of {} regions have no center and are exported without one",
            report.missing.len(),
            report.total
        );
    }

    let size = write_table(&args.output, &roots).context("Failed to write region table")?;
    info!("Exported {} regions ({} bytes)", report.total, size);
    Ok(())
}
