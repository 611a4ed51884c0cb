use lob_replay::replay::{self, ReplayConfig};
use std::path::PathBuf;
use std::process;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let input = match args.next() {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("usage: lob-replay <input-file> [output-dir]");
            process::exit(2);
        }
    };
    let mut config = ReplayConfig::default();
    if let Some(dir) = args.next() {
        config.output_dir = PathBuf::from(dir);
    }
    if let Ok(every) = std::env::var("PROGRESS_EVERY") {
        if let Ok(every) = every.parse() {
            config.progress_every = every;
        }
    }

    match replay::run_with_file(&input, &config) {
        Ok(summary) => {
            println!(
                "processed {} lines: {} events applied, {} rejected, {} skipped, {} trades",
                summary.lines, summary.events, summary.rejected, summary.skipped, summary.trades
            );
            println!("artifacts written to {}", config.output_dir.display());
        }
        Err(e) => {
            eprintln!("replay failed: {}", e);
            process::exit(1);
        }
    }
}
