//! Offline center matching from an Amap district dump.
//!
//! Reads the region tree and one or more `region.json` dumps (each a nested
//! district root), attaches centers by name (or by code with `--by-code`) and
//! writes the cleaned tree. Later dumps win where they overlap. No network
//! access.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use xzqh::center::{annotate_all, audit, strip_markers, CenterIndex, CenterLookup, NameMap};
use xzqh::models::{ProviderDistrict, RegionNode};
use xzqh::source::{load_json, load_tree, save_tree};

#[derive(Parser, Debug)]
#[command(name = "annotate")]
#[command(about = "Attach centers from an offline Amap district dump")]
struct Args {
    /// Region tree to annotate
    #[arg(short, long, default_value = "xzqh_2023_tree.json")]
    tree: PathBuf,

    /// Amap district dumps, repeatable
    #[arg(short, long, default_value = "region.json", num_args = 1..)]
    region: Vec<PathBuf>,

    /// Output file
    #[arg(short, long, default_value = "xzqh_result.json")]
    output: PathBuf,

    /// Join on administrative code instead of name
    #[arg(long)]
    by_code: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Count regions whose code is in the index under a different name.
///
/// Codes get reassigned when divisions are merged or renamed, so a code join
/// across editions can attach a center that belongs to another place.
fn count_renamed(roots: &[RegionNode], index: &CenterIndex) -> usize {
    let mut renamed = 0;
    for root in roots {
        root.for_each_descendant(&mut |node, _| {
            let Some(entry) = index.get(&node.code) else {
                return;
            };
            if let Some(name) = entry.name.as_deref() {
                if name != strip_markers(&node.name) {
                    renamed += 1;
                    debug!(
                        "{}: {} in the tree, {} ({}) in the dump",
                        node.code,
                        node.name,
                        name,
                        entry.level.as_deref().unwrap_or("unknown level")
                    );
                }
            }
        });
    }
    renamed
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let roots = load_tree(&args.tree).context("Failed to load region tree")?;
    let mut dumps = Vec::with_capacity(args.region.len());
    for path in &args.region {
        let dump: ProviderDistrict = load_json(path)
            .with_context(|| format!("Failed to load district dump {}", path.display()))?;
        dumps.push(dump);
    }

    let lookup: Box<dyn CenterLookup> = if args.by_code {
        let index = CenterIndex::build_all(&dumps);
        info!(
            "Indexed {} codes from {} dump(s) ({} districts without usable center)",
            index.len(),
            dumps.len(),
            index.malformed()
        );
        let renamed = count_renamed(&roots, &index);
        if renamed > 0 {
            warn!("{} codes carry a different name in the dump", renamed);
        }
        Box::new(index)
    } else {
        let names = NameMap::build(&dumps);
        info!("Mapped {} names with centers from {} dump(s)", names.len(), dumps.len());
        Box::new(names)
    };

    let annotated = annotate_all(&roots, lookup.as_ref());

    let report = audit(&annotated);
    info!(
        "{} regions, {} with centers ({:.1}%)",
        report.total,
        report.covered,
        report.ratio() * 100.0
    );

    save_tree(&args.output, &annotated)?;
    Ok(())
}
