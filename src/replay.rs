//! Replay driver: streams a recorded event file through the engine and
//! persists the run's artifacts.
//!
//! Events are applied strictly in file order. Boundary rejections and
//! event-local engine errors are logged with their line number and skipped;
//! fatal invariant breaches halt the run after dumping book and registry
//! state. Once the stream is exhausted the outputs are frozen and the four
//! artifacts (trade log, market-snapshot log, book dump, closed-order log)
//! are written by concurrent scoped threads; concurrency begins only after
//! the data stops changing.

use crate::engine::MatchingEngine;
use crate::error::EngineError;
use crate::feed;
use crate::output::{MARKET_CSV_HEADER, TRADES_CSV_HEADER};
use crate::types::Event;
use log::{error, info, warn};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Driver configuration. Output file names mirror the recorded-run layout:
/// everything lands under `output_dir`.
#[derive(Clone, Debug)]
pub struct ReplayConfig {
    pub output_dir: PathBuf,
    pub trades_file: String,
    pub market_file: String,
    pub book_file: String,
    pub closed_file: String,
    /// Log progress every N lines; 0 disables.
    pub progress_every: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            trades_file: "trades.csv".into(),
            market_file: "market_data.csv".into(),
            book_file: "book_dump.json".into(),
            closed_file: "closed_orders.json".into(),
            progress_every: 1000,
        }
    }
}

/// Replay failure: I/O, serialization, or a fatal engine error.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("engine halted: {0}")]
    Engine(#[from] EngineError),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Counters for one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Lines read from the input (processed or not).
    pub lines: usize,
    /// Events applied successfully.
    pub events: usize,
    /// Lines rejected at the feed boundary.
    pub rejected: usize,
    /// Well-formed events the engine rejected (unknown id, duplicate, ...).
    pub skipped: usize,
    /// Trades produced across the run.
    pub trades: usize,
}

/// Applies a slice of already-validated events, skipping event-local
/// rejections and stopping on the first fatal error. Used by benchmarks and
/// property tests; [`run_with_file`] is the file-driven equivalent.
pub fn replay_events(
    engine: &mut MatchingEngine,
    events: &[Event],
) -> Result<ReplaySummary, EngineError> {
    let mut summary = ReplaySummary::default();
    for event in events {
        summary.lines += 1;
        match engine.process_event(event) {
            Ok(trades) => {
                summary.events += 1;
                summary.trades += trades.len();
            }
            Err(e) if !e.is_fatal() => {
                warn!("rejected event for order {}: {}", event.order_id(), e);
                summary.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(summary)
}

/// Replays one recorded event file and writes the run's artifacts.
pub fn run_with_file(input: &Path, config: &ReplayConfig) -> Result<ReplaySummary, ReplayError> {
    let total_lines = count_lines(input)?;
    info!("replaying {} ({} lines)", input.display(), total_lines);

    let (mut engine, trade_sink, snapshot_sink) = MatchingEngine::with_memory_sinks();
    let mut summary = ReplaySummary::default();
    let mut last_venue_time = 0;

    let reader = BufReader::new(File::open(input)?);
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        // a blank line marks end of input in recorded files
        if line.trim().is_empty() {
            info!("blank line at {}: end of input", i + 1);
            break;
        }
        if config.progress_every > 0 && i % config.progress_every == 0 && i > 0 {
            let percent = i as f64 / total_lines.max(1) as f64 * 100.0;
            info!("at line {} of {} ({:.1}%)", i + 1, total_lines, percent);
        }
        summary.lines += 1;

        let event = match feed::parse_line(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!("invalid event at line {}: {}", i + 1, e);
                summary.rejected += 1;
                continue;
            }
        };
        last_venue_time = event.venue_time();
        match engine.process_event(&event) {
            Ok(_) => summary.events += 1,
            Err(e) if !e.is_fatal() => {
                warn!("rejected event at line {}: {}", i + 1, e);
                summary.skipped += 1;
            }
            Err(e) => {
                error!("fatal error at line {}: {}", i + 1, e);
                error!("book state at halt:\n{}", engine);
                return Err(e.into());
            }
        }
    }

    // the run is over: freeze every output before any writer starts
    let trades = trade_sink.trades();
    let snapshots = snapshot_sink.snapshots();
    summary.trades = trades.len();
    let trade_rows: Vec<String> = trades.iter().map(|t| t.to_csv_row()).collect();
    let market_rows: Vec<String> = snapshots.iter().map(|s| s.to_csv_row()).collect();
    let book_json =
        serde_json::to_string_pretty(&engine.depth_snapshot(last_venue_time, usize::MAX))?;
    let closed_json = serde_json::to_string_pretty(engine.closed_orders())?;

    fs::create_dir_all(&config.output_dir)?;
    let trades_path = config.output_dir.join(&config.trades_file);
    let market_path = config.output_dir.join(&config.market_file);
    let book_path = config.output_dir.join(&config.book_file);
    let closed_path = config.output_dir.join(&config.closed_file);

    let results: Vec<io::Result<()>> = std::thread::scope(|s| {
        let writers = vec![
            s.spawn(|| write_csv(&trades_path, TRADES_CSV_HEADER, &trade_rows)),
            s.spawn(|| write_csv(&market_path, MARKET_CSV_HEADER, &market_rows)),
            s.spawn(|| write_text(&book_path, &book_json)),
            s.spawn(|| write_text(&closed_path, &closed_json)),
        ];
        writers
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(io::Error::new(
                        io::ErrorKind::Other,
                        "artifact writer panicked",
                    ))
                })
            })
            .collect()
    });
    for result in results {
        result?;
    }

    info!(
        "replay done: {} events, {} rejected, {} skipped, {} trades",
        summary.events, summary.rejected, summary.skipped, summary.trades
    );
    Ok(summary)
}

fn count_lines(path: &Path) -> io::Result<usize> {
    let reader = BufReader::new(File::open(path)?);
    let mut count = 0;
    for line in reader.lines() {
        line?;
        count += 1;
    }
    Ok(count)
}

fn write_csv(path: &Path, header: &str, rows: &[String]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{}", header)?;
    for row in rows {
        writeln!(out, "{}", row)?;
    }
    out.flush()
}

fn write_text(path: &Path, content: &str) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(content.as_bytes())?;
    out.flush()
}
