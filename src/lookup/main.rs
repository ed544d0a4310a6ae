//! Search the binary region table by name or code.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use xzqh::export::{find_by_code, find_by_name, read_table, DataTable, RegionHit};

#[derive(Parser, Debug)]
#[command(name = "lookup")]
#[command(about = "Find regions in a binary region table")]
struct Args {
    /// Binary table
    #[arg(short, long, default_value = "xzqh.bin")]
    table: PathBuf,

    /// Names or codes to search; reads stdin interactively when empty
    queries: Vec<String>,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let table = read_table(&args.table)
        .with_context(|| format!("Failed to read {}", args.table.display()))?;
    info!("Loaded {} top-level regions", table.root.len());

    if !args.queries.is_empty() {
        for query in &args.queries {
            search(&table, query);
        }
        return Ok(());
    }

    let stdin = io::stdin();
    loop {
        print!("\nEnter a region name or code (q to quit): ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let query = line.trim();
        if query == "q" {
            break;
        }
        if !query.is_empty() {
            search(&table, query);
        }
    }

    Ok(())
}

fn search(table: &DataTable, query: &str) {
    let hits: Vec<RegionHit> = if query.chars().all(|c| c.is_ascii_digit()) {
        find_by_code(table, query).into_iter().collect()
    } else {
        find_by_name(table, query)
    };

    if hits.is_empty() {
        println!("No region matches '{}'", query);
        return;
    }

    for hit in hits {
        println!("{}", hit.display_path());
        println!("  code: {}", hit.code);
        match hit.center {
            Some(c) => println!("  center: {}, {}", c.longitude, c.latitude),
            None => println!("  center: n/a"),
        }
    }
}
