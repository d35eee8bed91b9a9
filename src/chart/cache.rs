//! Chart cache persistence.
//!
//! Charts are written next to the audio file as a sibling document whose
//! path derives from the audio file name. On load, if the cache's mtime
//! is newer than the audio's, the cache is returned verbatim; otherwise
//! the caller should regenerate and overwrite. A corrupt or unreadable
//! cache also triggers regeneration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::note::Chart;

/// Derives the cache file path for an audio file: `song.mp3` -> `song_chart.json`.
pub fn cache_path_for(audio_path: &Path) -> PathBuf {
    let stem = audio_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = format!("{stem}_chart.json");
    audio_path
        .parent()
        .map(|p| p.join(&file_name))
        .unwrap_or_else(|| PathBuf::from(file_name))
}

/// Outcome of a cache lookup.
pub enum CacheLookup {
    /// A fresh, parseable cache exists and should be used as-is.
    Fresh(Chart),
    /// No usable cache exists (absent, stale, or corrupt); regenerate.
    Stale,
}

/// Looks up the cache for `audio_path`, comparing mtimes against
/// `cache_path_for(audio_path)`.
pub fn lookup(audio_path: &Path) -> CacheLookup {
    let cache_path = cache_path_for(audio_path);

    let audio_mtime = match fs::metadata(audio_path).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(_) => return CacheLookup::Stale,
    };

    let cache_meta = match fs::metadata(&cache_path) {
        Ok(m) => m,
        Err(_) => return CacheLookup::Stale,
    };

    let cache_mtime = match cache_meta.modified() {
        Ok(t) => t,
        Err(_) => return CacheLookup::Stale,
    };

    if !is_newer(cache_mtime, audio_mtime) {
        return CacheLookup::Stale;
    }

    match fs::read_to_string(&cache_path) {
        Ok(text) => match serde_json::from_str::<Chart>(&text) {
            Ok(chart) => CacheLookup::Fresh(chart),
            Err(e) => {
                log::warn!("CHART CACHE: corrupt cache at {cache_path:?}: {e}");
                CacheLookup::Stale
            }
        },
        Err(e) => {
            log::warn!("CHART CACHE: unreadable cache at {cache_path:?}: {e}");
            CacheLookup::Stale
        }
    }
}

fn is_newer(a: SystemTime, b: SystemTime) -> bool {
    a.duration_since(b).is_ok()
}

/// Writes `chart` to the cache path derived from `audio_path`, opening the
/// file write-then-close (never held open).
pub fn save(audio_path: &Path, chart: &Chart) -> std::io::Result<PathBuf> {
    let cache_path = cache_path_for(audio_path);
    let json = serde_json::to_string_pretty(chart)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    fs::write(&cache_path, json)?;
    Ok(cache_path)
}
