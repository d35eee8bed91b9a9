//! Tuning parameters for the runtime and chart generator.
//!
//! Mirrors the teacher's `GameSettings`/TOML settings pattern: a plain
//! struct with `Default`, optionally loaded from a TOML file on disk.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Difficulty levels accepted by the Chart Builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "expert" => Ok(Difficulty::Expert),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// All tuning parameters in one place, loaded from TOML with sane defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fall speed in pixels per second.
    pub fall_speed_px_s: f64,
    /// Judgment line height, in pixels from the bottom of the playfield.
    pub y_target: f64,
    /// Spawn height, in pixels from the bottom of the playfield.
    pub y_spawn: f64,
    /// Minimum gap between accepted onsets, in seconds.
    pub min_note_gap: f64,
    /// Fraction of mean onset strength an onset must clear to be accepted.
    pub onset_threshold: f64,
    /// Seconds subtracted from input timestamps to compensate for output latency.
    pub latency_comp_sec: f64,
    /// Seconds added to the Scheduler's spawn-position calculation only.
    pub visual_offset_sec: f64,
    /// Seconds between play start and the audio device actually starting.
    pub audio_start_delay: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fall_speed_px_s: 350.0,
            y_target: 100.0,
            y_spawn: 900.0,
            min_note_gap: 0.15,
            onset_threshold: 0.5,
            latency_comp_sec: 0.150,
            visual_offset_sec: 0.0,
            audio_start_delay: 0.05,
        }
    }
}

impl Config {
    /// The lead time, in seconds, a note needs to spawn before its chart
    /// time in order to reach `y_target` exactly on time.
    pub fn fall_time(&self) -> f64 {
        (self.y_spawn - self.y_target) / self.fall_speed_px_s
    }

    /// Loads configuration from a TOML file. A missing file is not an
    /// error: defaults are returned instead.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let cfg: Config = toml::from_str(&text).map_err(|e| {
                    log::warn!("CONFIG: failed to parse {path:?}: {e}, using defaults");
                    e
                }).unwrap_or_default();
                Ok(cfg)
            }
            Err(e) => {
                log::info!("CONFIG: no config file at {path:?} ({e}), using defaults");
                Ok(Config::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.fall_speed_px_s, 350.0);
        assert_eq!(cfg.min_note_gap, 0.15);
        assert_eq!(cfg.onset_threshold, 0.5);
        assert_eq!(cfg.latency_comp_sec, 0.150);
        assert_eq!(cfg.visual_offset_sec, 0.0);
        assert_eq!(cfg.audio_start_delay, 0.05);
    }

    #[test]
    fn fall_time_derivation() {
        let cfg = Config {
            y_spawn: 900.0,
            y_target: 100.0,
            fall_speed_px_s: 350.0,
            ..Default::default()
        };
        assert!((cfg.fall_time() - (800.0 / 350.0)).abs() < 1e-9);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = Config::load(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(cfg.fall_speed_px_s, Config::default().fall_speed_px_s);
    }
}
