//! Asynchronous chart generation: runs the Analyser + Builder on a
//! worker thread and reports the finished [`Chart`] back over a bounded
//! channel, so the caller (CLI or runtime) never blocks on audio decode.

use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{bounded, Receiver};

use crate::analysis;
use crate::config::{Config, Difficulty};
use crate::error::{CoreError, Result};

use super::builder::build_chart;
use super::cache;
use super::note::Chart;

/// Handle to an in-flight chart generation request.
pub struct GenerationHandle {
    rx: Receiver<Result<Chart>>,
}

impl GenerationHandle {
    /// Polls for the result without blocking. Returns `None` while the
    /// worker is still running.
    pub fn try_recv(&self) -> Option<Result<Chart>> {
        self.rx.try_recv().ok()
    }

    /// Blocks until the worker finishes.
    pub fn join(self) -> Result<Chart> {
        self.rx
            .recv()
            .unwrap_or_else(|_| Err(CoreError::AnalyserUnavailable("generation worker died".into())))
    }
}

/// Spawns a worker thread that analyses `audio_path`, builds a chart at
/// `difficulty`, saves it to the cache, and reports the result. Mirrors
/// the audio worker's command-channel split: the caller never blocks on
/// decode or FFT work.
pub fn generate_async(audio_path: &Path, difficulty: Difficulty, config: Config, seed: u64) -> GenerationHandle {
    let (tx, rx) = bounded(1);
    let audio_path: PathBuf = audio_path.to_path_buf();

    thread::Builder::new()
        .name("chart-gen-worker".into())
        .spawn(move || {
            let result = generate_sync(&audio_path, difficulty, &config, seed);
            let _ = tx.send(result);
        })
        .expect("failed to spawn chart generation worker thread");

    GenerationHandle { rx }
}

/// The synchronous path `generate_async` runs on its worker thread:
/// analyse, build, and persist to the sibling cache.
fn generate_sync(audio_path: &Path, difficulty: Difficulty, config: &Config, seed: u64) -> Result<Chart> {
    let analysis = analysis::analyse(audio_path)?;

    let name = audio_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_string());
    let file = audio_path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let chart = build_chart(&analysis, difficulty, config, &name, &file, seed);

    cache::save(audio_path, &chart).map_err(|e| CoreError::DecodeFailed {
        path: audio_path.to_path_buf(),
        reason: format!("failed to write chart cache: {e}"),
    })?;

    Ok(chart)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reports_not_found_on_join() {
        let handle = generate_async(
            Path::new("/nonexistent/audio.wav"),
            Difficulty::Hard,
            Config::default(),
            1,
        );
        let result = handle.join();
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }
}
