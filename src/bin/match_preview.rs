//! Dry-run an import against an exported track catalog, offline.
//! Usage: cargo run --release --bin match-preview -- <catalog.json> <import.csv|txt>

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use plex_playlister::catalog::CatalogSearch;
use plex_playlister::config::{MatchConfig, DEFAULT_WORKERS};
use plex_playlister::input::read_import_file;
use plex_playlister::matcher::{CancelToken, ImportMatcher};
use plex_playlister::models::EntryStatus;
use plex_playlister::parse::{detect_format, parse_input};
use plex_playlister::progress::{
    create_progress_bar, format_duration, set_log_only, track_resolution,
};

#[derive(Parser)]
#[command(name = "match-preview")]
#[command(about = "Preview how an import list resolves against a JSON track catalog")]
struct Args {
    /// JSON array of tracks
    catalog: PathBuf,

    /// Import list (.txt, .csv or .tsv)
    input: PathBuf,

    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Keep accent-sensitive matching
    #[arg(long)]
    no_fold: bool,

    /// Examples to print per outcome
    #[arg(long, default_value = "10")]
    examples: usize,

    #[arg(long)]
    log_only: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    set_log_only(args.log_only);

    let start = Instant::now();
    eprintln!("Loading catalog...");
    let catalog = CatalogSearch::from_json_file(&args.catalog)?;
    eprintln!("  {} tracks", catalog.len());

    let source = read_import_file(&args.input)?;
    let parsed = parse_input(&source.text)?;
    let total = parsed.len() as u64;
    eprintln!("Parsed {} entries ({:?})", total, detect_format(&source.text));

    let config = MatchConfig {
        fold_diacritics: !args.no_fold,
        ..MatchConfig::default()
    }
    .with_workers(args.workers)?;
    let matcher = ImportMatcher::new(&catalog, config);

    let pb = create_progress_bar(total, "Resolving");
    let (tx, rx) = crossbeam_channel::unbounded();
    let cancel = CancelToken::new();
    let entries = std::thread::scope(|s| {
        s.spawn(|| track_resolution(&rx, &pb, total));
        let entries = matcher.resolve_all(parsed, &cancel, Some(&tx));
        drop(tx);
        entries
    })?;
    pb.finish_and_clear();

    let count = |status: EntryStatus| entries.iter().filter(|e| e.status() == status).count();
    let matched = count(EntryStatus::AutoMatched);
    let review = count(EntryStatus::NeedsSelection);
    let missing = count(EntryStatus::Missing);
    let pct = |n: usize| {
        if total > 0 {
            100.0 * n as f64 / total as f64
        } else {
            0.0
        }
    };

    println!("\n{:=<60}", "");
    println!("MATCH PREVIEW: {}", source.suggested_name);
    println!("{:=<60}", "");
    println!("Entries:       {}", total);
    println!("Auto-matched:  {} ({:.1}%)", matched, pct(matched));
    println!("Needs review:  {} ({:.1}%)", review, pct(review));
    println!("Missing:       {} ({:.1}%)", missing, pct(missing));
    println!("Elapsed:       {}", format_duration(start.elapsed()));

    println!("\n--- Needs review ---");
    let needs_review = entries
        .iter()
        .filter(|e| e.status() == EntryStatus::NeedsSelection);
    for entry in needs_review.take(args.examples) {
        println!("{} {}", entry.id, entry.original_text);
        for alt in entry.alternatives() {
            println!("      {}", alt);
        }
    }

    println!("\n--- Missing ---");
    let missing_entries = entries
        .iter()
        .filter(|e| e.status() == EntryStatus::Missing);
    for entry in missing_entries.take(args.examples) {
        println!("{} {}", entry.id, entry.original_text);
    }

    Ok(())
}
