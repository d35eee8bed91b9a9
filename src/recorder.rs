//! Recorder: the inverse of the Scheduler — turns player input into a
//! persisted [`Chart`] instead of consuming one.

use std::collections::HashMap;
use std::path::Path;

use crate::chart as chart_mod;
use crate::chart::{Chart, ChartDifficulty, ChartNote, Lane};

const HOLD_THRESHOLD_SEC: f64 = 0.200;
const QUANTIZE_GAP_MIN_SEC: f64 = 0.1;
const QUANTIZE_GAP_MAX_SEC: f64 = 2.0;
const QUANTIZE_GAP_SAMPLE_CAP: usize = 20;

#[derive(Debug, Clone, Copy)]
struct RawPress {
    lane: Lane,
    t_press: f64,
}

/// Captures press/release events during a take and quantizes them into a
/// persisted Chart.
pub struct Recorder {
    open_presses: HashMap<Lane, RawPress>,
    notes: Vec<ChartNote>,
}

impl Recorder {
    pub fn new() -> Self {
        Self { open_presses: HashMap::new(), notes: Vec::new() }
    }

    pub fn on_press(&mut self, lane: Lane, t_sec: f64) {
        self.open_presses.insert(lane, RawPress { lane, t_press: t_sec });
    }

    pub fn on_release(&mut self, lane: Lane, t_sec: f64) {
        if let Some(press) = self.open_presses.remove(&lane) {
            self.notes.push(make_note(press.t_press, lane, t_sec));
        }
    }

    /// Flushes any still-held keys (called on stop) the same way a
    /// release would have.
    pub fn flush_held(&mut self, stop_t_sec: f64) {
        let held: Vec<RawPress> = self.open_presses.drain().map(|(_, p)| p).collect();
        for press in held {
            self.notes.push(make_note(press.t_press, press.lane, stop_t_sec));
        }
    }

    /// Quantizes recorded times to the nearest multiple of
    /// `median_inter_note_interval / 4`, deduplicating by
    /// `(round(t, 2), lane)`, and returns the resulting note list.
    pub fn finish(mut self) -> Vec<ChartNote> {
        self.notes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let step = quantization_step(&self.notes);
        quantize_and_dedup(&self.notes, step)
    }

    /// Persists the recording as a Chart document tagged `"custom"`,
    /// through the same cache writer the Chart Builder uses.
    pub fn save(self, audio_path: &Path, name: &str, file: &str, bpm: u32, duration: f64) -> std::io::Result<()> {
        let notes = self.finish();
        let chart = Chart {
            name: name.to_string(),
            file: file.to_string(),
            bpm,
            duration,
            difficulty: ChartDifficulty::Custom,
            notes,
        };
        chart_mod::save(audio_path, &chart)?;
        Ok(())
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

fn make_note(t_press: f64, lane: Lane, t_release: f64) -> ChartNote {
    let held_for = t_release - t_press;
    if held_for > HOLD_THRESHOLD_SEC {
        ChartNote::hold(t_press, lane, held_for)
    } else {
        ChartNote::tap(t_press, lane)
    }
}

/// Estimates `median_inter_note_interval / 4` from the first up-to-20
/// gaps between consecutive note times that fall in `(0.1s, 2.0s)`.
fn quantization_step(notes: &[ChartNote]) -> Option<f64> {
    let mut gaps: Vec<f64> = Vec::new();
    for pair in notes.windows(2) {
        let gap = pair[1].t_sec - pair[0].t_sec;
        if gap > QUANTIZE_GAP_MIN_SEC && gap < QUANTIZE_GAP_MAX_SEC {
            gaps.push(gap);
            if gaps.len() >= QUANTIZE_GAP_SAMPLE_CAP {
                break;
            }
        }
    }
    if gaps.is_empty() {
        return None;
    }
    gaps.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = gaps[gaps.len() / 2];
    Some(median / 4.0)
}

fn quantize_and_dedup(notes: &[ChartNote], step: Option<f64>) -> Vec<ChartNote> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for note in notes {
        let t = match step {
            Some(step) if step > 0.0 => (note.t_sec / step).round() * step,
            _ => note.t_sec,
        };
        let key = ((t * 100.0).round() as i64, note.lane.get());
        if seen.insert(key) {
            out.push(ChartNote { t_sec: t, lane: note.lane, dur_sec: note.dur_sec });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(n: u8) -> Lane {
        Lane::new(n).unwrap()
    }

    #[test]
    fn short_press_release_becomes_a_tap() {
        let mut recorder = Recorder::new();
        recorder.on_press(lane(0), 1.0);
        recorder.on_release(lane(0), 1.05);
        let notes = recorder.finish();
        assert_eq!(notes.len(), 1);
        assert!(!notes[0].is_hold());
    }

    #[test]
    fn long_press_release_becomes_a_hold() {
        let mut recorder = Recorder::new();
        recorder.on_press(lane(1), 1.0);
        recorder.on_release(lane(1), 1.5);
        let notes = recorder.finish();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].is_hold());
        assert!((notes[0].dur_sec - 0.5).abs() < 1e-9);
    }

    #[test]
    fn still_held_keys_flush_on_stop() {
        let mut recorder = Recorder::new();
        recorder.on_press(lane(2), 1.0);
        recorder.flush_held(1.8);
        let notes = recorder.finish();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].is_hold());
    }

    #[test]
    fn quantization_is_idempotent() {
        let mut recorder = Recorder::new();
        for i in 0..8 {
            recorder.on_press(lane(0), i as f64 * 0.5);
            recorder.on_release(lane(0), i as f64 * 0.5 + 0.05);
        }
        let once = recorder.finish();

        let mut second = Recorder::new();
        for note in &once {
            second.on_press(note.lane, note.t_sec);
            second.on_release(note.lane, note.t_sec + 0.05);
        }
        let twice = second.finish();

        assert_eq!(once, twice);
    }

    #[test]
    fn duplicate_rounded_time_and_lane_is_deduplicated() {
        let notes = vec![ChartNote::tap(1.001, lane(0)), ChartNote::tap(1.002, lane(0))];
        let deduped = quantize_and_dedup(&notes, None);
        assert_eq!(deduped.len(), 1);
    }
}
