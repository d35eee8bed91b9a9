//! Calibrator: measures the user's input/audio latency by playing a
//! metronome click and matching taps to it.

use crate::chart::Lane;
use crate::error::{CoreError, Result};
use crate::playfield::PlayfieldGeometry;

pub const CLICK_HZ: f64 = 880.0;
pub const PERIOD_SEC: f64 = 0.75;
pub const TICK_COUNT: u32 = 12;
const TRIM_MIN_SAMPLES: usize = 5;
const MIN_TAPS: usize = 3;
pub const CALIBRATION_LANE: u8 = 1;

/// One synthesised click tick, and the game_time at which its visual
/// note reaches `y_target`.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationTick {
    pub index: u32,
    pub expected_t_sec: f64,
}

pub fn schedule() -> Vec<CalibrationTick> {
    (0..TICK_COUNT)
        .map(|i| CalibrationTick { index: i, expected_t_sec: i as f64 * PERIOD_SEC })
        .collect()
}

/// Runs the 12-tick calibration loop against a sequence of observed taps.
///
/// Each tap is matched to the closest visible note; its signed offset
/// `(y_note - y_target) / v` in seconds contributes to the average.
pub struct Calibrator {
    geometry: PlayfieldGeometry,
    offsets_sec: Vec<f64>,
}

impl Calibrator {
    pub fn new(geometry: PlayfieldGeometry) -> Self {
        Self { geometry, offsets_sec: Vec::new() }
    }

    /// Records one tap against the tick whose expected time is closest,
    /// converting the vertical miss distance into a signed seconds offset.
    pub fn record_tap(&mut self, tap_t_sec: f64) {
        let ticks = schedule();
        let closest = ticks
            .iter()
            .min_by(|a, b| {
                (a.expected_t_sec - tap_t_sec)
                    .abs()
                    .partial_cmp(&(b.expected_t_sec - tap_t_sec).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .expect("schedule is never empty");

        let y_note = self.geometry.y_spawn
            - self.geometry.v * (tap_t_sec - (closest.expected_t_sec - self.geometry.fall_time()));
        // A tap that lands `d` seconds after the expected tick catches the
        // note `d` seconds past `y_target`, i.e. `v*d` pixels further down
        // the fall; flipping the sign here turns "audio arrived late" into
        // a positive `audio_offset`.
        let offset_sec = (self.geometry.y_target - y_note) / self.geometry.v;
        self.offsets_sec.push(offset_sec);
    }

    /// Finalizes calibration: trims the high/low extremes when at least
    /// [`TRIM_MIN_SAMPLES`] taps were recorded, then averages the rest.
    pub fn finish(mut self) -> Result<f64> {
        if self.offsets_sec.len() < MIN_TAPS {
            return Err(CoreError::Insufficient);
        }

        self.offsets_sec.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let trimmed: &[f64] = if self.offsets_sec.len() >= TRIM_MIN_SAMPLES {
            &self.offsets_sec[1..self.offsets_sec.len() - 1]
        } else {
            &self.offsets_sec[..]
        };

        let sum: f64 = trimmed.iter().sum();
        Ok(sum / trimmed.len() as f64)
    }
}

pub fn calibration_lane() -> Lane {
    Lane::new(CALIBRATION_LANE).expect("lane 1 is always valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn geometry() -> PlayfieldGeometry {
        PlayfieldGeometry::from_config(&Config::default())
    }

    #[test]
    fn fewer_than_three_taps_is_insufficient() {
        let mut cal = Calibrator::new(geometry());
        cal.record_tap(0.0);
        cal.record_tap(0.75);
        assert!(matches!(cal.finish(), Err(CoreError::Insufficient)));
    }

    #[test]
    fn consistent_offset_is_recovered_after_trimming() {
        let geom = geometry();
        let mut cal = Calibrator::new(geom);
        let offset = 0.03;
        for tick in schedule() {
            cal.record_tap(tick.expected_t_sec + offset);
        }
        let measured = cal.finish().unwrap();
        assert!((measured - offset).abs() < 1e-6, "measured={measured}");
    }

    #[test]
    fn three_or_four_samples_skip_trimming() {
        let mut cal = Calibrator::new(geometry());
        cal.record_tap(0.0);
        cal.record_tap(0.75);
        cal.record_tap(1.50);
        let measured = cal.finish().unwrap();
        assert!(measured.abs() < 1e-6);
    }

    #[test]
    fn schedule_has_twelve_ticks_at_750ms_period() {
        let ticks = schedule();
        assert_eq!(ticks.len(), 12);
        assert!((ticks[1].expected_t_sec - PERIOD_SEC).abs() < 1e-9);
    }
}
