//! Note Scheduler: spawns [`LiveNote`]s so their head reaches the
//! judgment line at chart-time, and drives hold-note state machines.
//!
//! LiveNotes carry only a `chart_index` back-reference rather than a
//! clone of the originating [`ChartNote`] (no cyclic note/chart graph,
//! per the design note on one-way references).

use crate::chart::{Chart, Lane};
use crate::playfield::PlayfieldGeometry;

/// Slop, in pixels, below `y_target` a Falling note's body must clear
/// before it is reaped as Missed.
const REAP_SLOP_PX: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    Falling,
    HeldByPlayer,
    Completed,
    Missed,
}

/// The runtime projection of a ChartNote for one player.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveNote {
    pub chart_index: usize,
    pub player_id: u32,
    pub lane: Lane,
    pub dur_sec: f64,
    /// `ChartNote.t_sec - fall_time`: the game-time the note's head must
    /// reach `y_target`, used to derive `y(t)` as a pure function.
    pub t_spawn_effective: f64,
    pub state: NoteState,
    /// Accumulates `dt / dur_sec` while Held; may exceed 1.0.
    pub hold_progress: f64,
}

impl LiveNote {
    /// The head's vertical position as a pure function of `game_time`,
    /// per the invariant `y(t) = y_spawn - v(t - t_spawn_effective) +
    /// visual_offset*v`.
    pub fn head_y(&self, game_time: f64, geometry: &PlayfieldGeometry) -> f64 {
        match self.state {
            NoteState::HeldByPlayer => geometry.y_target,
            _ => {
                geometry.y_spawn - geometry.v * (game_time - self.t_spawn_effective)
                    + geometry.visual_offset_sec * geometry.v
            }
        }
    }

    pub fn chart_time(&self, fall_time: f64) -> f64 {
        self.t_spawn_effective + fall_time
    }

    pub fn is_hold(&self) -> bool {
        self.dur_sec > 0.0
    }
}

/// Owns the spawn cursor and every LiveNote currently in flight, for one
/// or more players sharing the same Chart.
pub struct Scheduler {
    chart: Chart,
    geometry: PlayfieldGeometry,
    fall_time: f64,
    player_ids: Vec<u32>,
    cursor: usize,
    live_notes: Vec<LiveNote>,
}

impl Scheduler {
    pub fn new(chart: Chart, geometry: PlayfieldGeometry, player_ids: Vec<u32>) -> Self {
        let fall_time = geometry.fall_time();
        Self {
            chart,
            geometry,
            fall_time,
            player_ids,
            cursor: 0,
            live_notes: Vec::new(),
        }
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn live_notes(&self) -> &[LiveNote] {
        &self.live_notes
    }

    pub fn live_notes_mut(&mut self) -> &mut [LiveNote] {
        &mut self.live_notes
    }

    /// Moves a live note into `HeldByPlayer`, resetting its hold progress.
    pub fn begin_hold(&mut self, idx: usize) {
        self.live_notes[idx].state = NoteState::HeldByPlayer;
        self.live_notes[idx].hold_progress = 0.0;
    }

    /// Removes a live note outright (tap hit, or hold released/missed).
    pub fn remove_live_note(&mut self, idx: usize) -> LiveNote {
        self.live_notes.remove(idx)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.chart.notes.len()
            && !self
                .live_notes
                .iter()
                .any(|n| matches!(n.state, NoteState::Falling | NoteState::HeldByPlayer))
    }

    /// Advances the scheduler by `dt` seconds at the given `game_time`
    /// (post-advance): spawns any notes now due, advances hold progress,
    /// and reaps notes that fell below the judgment line unheld. Returns
    /// the notes that transitioned to Missed this tick, so the caller can
    /// reset the owning player's combo (§3: "combo resets to 0 on Miss").
    #[must_use = "Missed notes must be fed back to reset the owning player's combo"]
    pub fn tick(&mut self, game_time: f64, dt: f64) -> Vec<LiveNote> {
        self.spawn_due_notes(game_time);

        for note in &mut self.live_notes {
            if note.state == NoteState::HeldByPlayer && note.is_hold() {
                note.hold_progress += dt / note.dur_sec;
            }
        }

        self.reap_missed(game_time)
    }

    fn spawn_due_notes(&mut self, game_time: f64) {
        while self.cursor < self.chart.notes.len() {
            let chart_note = self.chart.notes[self.cursor];
            let t_spawn_effective = chart_note.t_sec - self.fall_time;
            if t_spawn_effective > game_time {
                break;
            }

            for &player_id in &self.player_ids {
                self.live_notes.push(LiveNote {
                    chart_index: self.cursor,
                    player_id,
                    lane: chart_note.lane,
                    dur_sec: chart_note.dur_sec,
                    t_spawn_effective,
                    state: NoteState::Falling,
                    hold_progress: 0.0,
                });
            }
            self.cursor += 1;
        }
    }

    /// Marks Falling notes that fell below the judgment line as Missed,
    /// removes them from `live_notes`, and returns them.
    fn reap_missed(&mut self, game_time: f64) -> Vec<LiveNote> {
        for note in &mut self.live_notes {
            if note.state != NoteState::Falling {
                continue;
            }
            let head_y = note.head_y(game_time, &self.geometry);
            let tail_y = head_y; // chart-generator path never emits holds with body length on screen beyond head
            if tail_y < self.geometry.y_target - REAP_SLOP_PX {
                note.state = NoteState::Missed;
            }
        }

        let missed: Vec<LiveNote> = self
            .live_notes
            .iter()
            .filter(|n| n.state == NoteState::Missed)
            .cloned()
            .collect();
        self.live_notes.retain(|n| n.state != NoteState::Missed);
        missed
    }

    pub fn fall_time(&self) -> f64 {
        self.fall_time
    }
}
