use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use skyrun_core::config::SimConfig;
use skyrun_core::replay::{self, CSV_HEADER, ReplayError, ReplayScript};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: replay <script.json> [--final-state]";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let mut path = None;
    let mut final_state = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--final-state" => final_state = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                return ExitCode::SUCCESS;
            },
            _ => path = Some(PathBuf::from(arg)),
        }
    }
    let Some(path) = path else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    match run(&path, final_state) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("replay failed: {e}");
            eprintln!("replay: {e}");
            ExitCode::FAILURE
        },
    }
}

fn run(path: &Path, final_state: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = SimConfig::load()?;
    let raw = fs::read_to_string(path).map_err(ReplayError::from)?;
    let script = ReplayScript::from_json(&raw)?;
    tracing::info!(
        "Replaying {} ({} ticks, seed {})",
        path.display(),
        script.tick_count(),
        script.seed
    );

    let outcome = replay::run(config, &script);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    writeln!(out, "{CSV_HEADER}")?;
    for row in &outcome.trace {
        writeln!(out, "{}", row.to_csv())?;
    }
    out.flush()?;

    if final_state {
        let json = serde_json::to_string_pretty(&outcome.final_state)?;
        eprintln!("{json}");
    }
    Ok(())
}
