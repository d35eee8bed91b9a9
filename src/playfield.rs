//! Playfield geometry: the per-player triple of target height, spawn
//! height, and fall speed the Scheduler projects LiveNotes onto.

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayfieldGeometry {
    pub y_target: f64,
    pub y_spawn: f64,
    pub v: f64,
    pub visual_offset_sec: f64,
}

impl PlayfieldGeometry {
    pub fn from_config(config: &Config) -> Self {
        Self {
            y_target: config.y_target,
            y_spawn: config.y_spawn,
            v: config.fall_speed_px_s,
            visual_offset_sec: config.visual_offset_sec,
        }
    }

    /// Lead time a note needs to spawn before its chart time so its head
    /// reaches `y_target` exactly on time.
    pub fn fall_time(&self) -> f64 {
        (self.y_spawn - self.y_target) / self.v
    }
}
