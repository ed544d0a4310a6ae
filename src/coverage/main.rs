//! Coverage report for an annotated region tree.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use xzqh::center::{audit, CoverageComparison};
use xzqh::source::load_tree;
use xzqh::RegionLevel;

#[derive(Parser, Debug)]
#[command(name = "coverage")]
#[command(about = "List regions without centers and compare coverage")]
struct Args {
    /// Annotated tree to check
    #[arg(default_value = "xzqh_with_amap_coordinates.json")]
    file: PathBuf,

    /// Earlier result to compare against
    #[arg(long)]
    baseline: Option<PathBuf>,

    /// Print the report as JSON instead of a listing
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let roots = load_tree(&args.file)?;
    let report = audit(&roots);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Checked {}", args.file.display());
        println!(
            "{} regions, {} covered, {} missing\n",
            report.total,
            report.covered,
            report.missing.len()
        );
        for level in RegionLevel::all() {
            let count = report.missing.iter().filter(|m| m.level == *level).count();
            println!("  {:<10} {:>6} missing", level, count);
        }
        println!();
        for missing in &report.missing {
            println!("  [{:10}] {} - {}", missing.level, missing.code, missing.name);
            println!("               path: {}", missing.display_path());
        }
    }

    if let Some(baseline_path) = &args.baseline {
        let baseline = audit(&load_tree(baseline_path)?);
        let cmp = CoverageComparison::new(&baseline, &report);

        info!("Comparing against {}", baseline_path.display());
        println!("\n  {:<40} {:>8} {:>8} {:>10}", "source", "total", "covered", "ratio");
        println!("  {}", "-".repeat(70));
        println!(
            "  {:<40} {:>8} {:>8} {:>9.2}%",
            baseline_path.display().to_string(),
            baseline.total,
            baseline.covered,
            baseline.ratio() * 100.0
        );
        println!(
            "  {:<40} {:>8} {:>8} {:>9.2}%",
            args.file.display().to_string(),
            report.total,
            report.covered,
            report.ratio() * 100.0
        );
        println!("  {}", "-".repeat(70));
        println!(
            "  newly covered: {} | ratio change: {:+.2} pp | still missing: {}",
            cmp.newly_covered(),
            cmp.ratio_delta(),
            report.missing.len()
        );
    }

    Ok(())
}
