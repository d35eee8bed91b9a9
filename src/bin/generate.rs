//! `vsrg-chart generate <audio_path> [difficulty] [--config <path>]`
//!
//! Exit codes: 0 on success, 1 on missing file or decode failure, 2 when
//! the analyser is unavailable.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use vsrg_core::chart as chart_mod;
use vsrg_core::chart::CacheLookup;
use vsrg_core::config::{Config, Difficulty};
use vsrg_core::error::CoreError;
use vsrg_core::{analysis, Chart};

struct Args {
    audio_path: PathBuf,
    difficulty: Difficulty,
    config_path: Option<PathBuf>,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Option<Args> {
    let _argv0 = raw.next();
    let command = raw.next()?;
    if command != "generate" {
        return None;
    }

    let audio_path = PathBuf::from(raw.next()?);
    let mut difficulty = Difficulty::Hard;
    let mut config_path = None;

    let mut rest: Vec<String> = raw.collect();
    if let Some(idx) = rest.iter().position(|a| a == "--config") {
        rest.remove(idx);
        if idx < rest.len() {
            config_path = Some(PathBuf::from(rest.remove(idx)));
        }
    }
    if let Some(d) = rest.first() {
        difficulty = Difficulty::from_str(d).ok()?;
    }

    Some(Args { audio_path, difficulty, config_path })
}

fn main() -> ExitCode {
    unsafe {
        if std::env::var("RUST_LOG").is_err() {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();

    let Some(args) = parse_args(std::env::args()) else {
        eprintln!("usage: generate <audio_path> [difficulty] [--config <path>]");
        return ExitCode::from(1);
    };

    let config = args
        .config_path
        .as_deref()
        .map(Config::load)
        .unwrap_or_else(|| Ok(Config::default()))
        .unwrap_or_default();

    match run(&args.audio_path, args.difficulty, &config) {
        Ok(()) => ExitCode::from(0),
        Err(CoreError::NotFound(_)) | Err(CoreError::DecodeFailed { .. }) => ExitCode::from(1),
        Err(CoreError::AnalyserUnavailable(_)) => ExitCode::from(2),
        Err(e) => {
            log::error!("GENERATE: {e}");
            ExitCode::from(1)
        }
    }
}

fn run(audio_path: &Path, difficulty: Difficulty, config: &Config) -> Result<(), CoreError> {
    if let CacheLookup::Fresh(existing) = chart_mod::lookup(audio_path) {
        if existing.difficulty == difficulty.into() {
            log::info!("GENERATE: using fresh cache for {audio_path:?}");
            print_summary(&existing);
            return Ok(());
        }
    }

    log::info!("GENERATE: analysing {audio_path:?}");
    let analysis = analysis::analyse(audio_path)?;

    let name = audio_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_string());
    let file = audio_path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let seed = name.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
    let chart = chart_mod::build_chart(&analysis, difficulty, config, &name, &file, seed);

    chart_mod::save(audio_path, &chart).map_err(|e| CoreError::DecodeFailed {
        path: audio_path.to_path_buf(),
        reason: format!("failed to write chart cache: {e}"),
    })?;

    print_summary(&chart);
    Ok(())
}

fn print_summary(chart: &Chart) {
    println!(
        "{} [{:?}] {} notes, {} bpm, {:.2}s",
        chart.name,
        chart.difficulty,
        chart.notes.len(),
        chart.bpm,
        chart.duration
    );
}
