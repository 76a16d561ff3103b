//! CLI entry point: wires the library to a file on disk and a `CsvSink`.
//! Genuinely peripheral — see spec.md §1's "out of scope" list and
//! SPEC_FULL.md §5.2.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use hashbrown::HashSet;
use log::{error, info};

use itch_orderbook::csv_sink::CsvSink;
use itch_orderbook::decoder::{Decoder, Transport};
use itch_orderbook::registry::Registry;
use itch_orderbook::stop::StopSignal;
use itch_orderbook::Engine;

/// Reconstructs per-symbol limit order books from a NASDAQ TotalView-ITCH
/// 5.0 feed and writes snapshot and trade tables per symbol.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the ITCH 5.0 byte stream.
    #[arg(long)]
    input: PathBuf,

    /// Symbol to track (repeatable). Unknown symbols are silently ignored.
    #[arg(long = "symbol", required = true)]
    symbols: Vec<String>,

    /// Number of price levels to retain per side in each snapshot.
    #[arg(long, default_value_t = 10)]
    depth: u32,

    /// Directory to write per-symbol CSV tables into.
    #[arg(long, default_value = "out")]
    out_dir: PathBuf,

    /// Treat the input as length-prefixed (`[u16 len][tag][payload]`)
    /// instead of the default bare `[tag][payload]` framing.
    #[arg(long)]
    length_prefixed: bool,

    /// Log a progress line every N processed records (0 disables).
    #[arg(long, default_value_t = 1_000_000)]
    progress_every: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    info!("loaded config: {args:?}");

    if let Err(e) = run(&args) {
        error!("{e:#}");
        std::process::exit(1);
    }
    Ok(())
}

fn run(args: &Args) -> anyhow::Result<()> {
    let symbols: HashSet<String> = args.symbols.iter().map(|s| s.trim().to_string()).collect();
    let transport = if args.length_prefixed {
        Transport::LengthPrefixed
    } else {
        Transport::Unframed
    };

    let file = File::open(&args.input)
        .with_context(|| format!("opening input file {}", args.input.display()))?;
    let decoder = Decoder::new(BufReader::new(file), transport);
    let registry = Registry::new(symbols, args.depth as usize);
    let stop = Arc::new(StopSignal::default());
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.raise()).context("installing Ctrl-C handler")?;
    }

    let mut engine = Engine::new(decoder, registry, stop);
    let mut sink = CsvSink::new(&args.out_dir, args.depth as usize)
        .with_context(|| format!("creating output directory {}", args.out_dir.display()))?;

    let progress = ProgressReporter::new(args.progress_every);
    let summary = engine
        .run_with(&mut sink, |n| progress.tick(n))
        .map_err(|e| anyhow::anyhow!("{e} (byte offset {})", e.offset()))?;

    sink.finish().context("flushing CSV output")?;

    info!(
        "done: {} events processed, {} non-fatal errors ({} unknown-ref, {} duplicate-ref, {} invalid-shares)",
        summary.events_processed,
        summary.errors.total(),
        summary.errors.unknown_ref,
        summary.errors.duplicate_ref,
        summary.errors.invalid_shares,
    );
    Ok(())
}

/// Periodic `log::info!` progress line, the pack's lightweight substitute
/// for a progress-bar widget (original_source's `tqdm` counterpart — see
/// SPEC_FULL.md §5.2).
struct ProgressReporter {
    every: u64,
}

impl ProgressReporter {
    fn new(every: u64) -> Self {
        Self { every }
    }

    fn tick(&self, events_processed: u64) {
        if self.every > 0 && events_processed.is_multiple_of(self.every) {
            info!("progress: {events_processed} records processed");
        }
    }
}
