use anyhow::{Context, Result};
use clap::Parser;
use mnemonic_finder::{CryptoEngine, SearchConfig, SearchEngine, SearchMonitor};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mnemonic-finder")]
#[command(version)]
#[command(about = "Parallel brute-force search for BIP39 mnemonic phrases matching known addresses")]
struct Cli {
    /// Path to the JSON search configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Override the configured number of checker workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Write a per-candidate trace record for every derivation
    #[arg(short, long)]
    verbose: bool,

    /// Suppress the progress bar
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut config = SearchConfig::from_file(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if cli.verbose {
        config.verbose = true;
    }

    println!("mnemonic-finder v{}", mnemonic_finder::VERSION);
    println!(
        "Candidate phrases:  {}",
        format_count(config.total_combinations())
    );
    println!(
        "Derivable addresses: {}",
        format_count(config.total_addresses())
    );
    println!(
        "Workers: {} | queue: {} | targets: {}",
        config.workers,
        config.work_queue_capacity,
        config.targets.len()
    );
    println!();

    let engine = SearchEngine::new(config.clone(), CryptoEngine::new())?;

    // Ctrl-C takes the same path as a found match: raise the flag, drain,
    // flush the log, exit.
    let stop = engine.stop_handle();
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        ctrlc::set_handler(move || {
            warn!("interrupt received, stopping search");
            interrupted.store(true, Ordering::SeqCst);
            stop.set();
        })
        .context("failed to install interrupt handler")?;
    }

    let monitor = Arc::new(SearchMonitor::new(config.total_combinations(), !cli.quiet));
    let outcome = engine.run(Arc::clone(&monitor))?;
    monitor.finish();

    match &outcome.evidence {
        Some(evidence) => {
            println!("Match found!");
            println!("  Mnemonic:   {}", evidence.phrase);
            println!("  Passphrase: {}", evidence.passphrase);
            println!("  Address:    {}", evidence.address);
        }
        None if interrupted.load(Ordering::SeqCst) => {
            println!("Search interrupted, no match found.");
        }
        None => {
            println!("Search space exhausted, no match found.");
        }
    }

    let snapshot = monitor.snapshot();
    println!();
    println!(
        "Checked {} of {} candidates ({:.0} candidates/sec)",
        format_count(outcome.candidates_checked),
        format_count(config.total_combinations()),
        snapshot.rate
    );
    println!(
        "Log records written: {} ({})",
        outcome.log_records,
        config.output.folder.display()
    );
    println!("Elapsed time: {:.2} sec", outcome.elapsed.as_secs_f64());

    Ok(())
}

/// Format a count with dot-grouped thousands
fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    grouped
}
