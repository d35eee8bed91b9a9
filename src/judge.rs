//! Judge: converts input events into rated hits and maintains per-player
//! score/combo.

use crate::chart::Lane;
use crate::playfield::PlayfieldGeometry;
use crate::scheduler::{LiveNote, NoteState, Scheduler};

const HEAD_RADIUS_PX: f64 = 10.0;
const TARGET_RADIUS_PX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Perfect,
    Great,
    Good,
    Ok,
    Miss,
}

impl Rating {
    fn base_points(self) -> u32 {
        match self {
            Rating::Perfect => 100,
            Rating::Great => 75,
            Rating::Good => 50,
            Rating::Ok => 25,
            Rating::Miss => 0,
        }
    }

    fn from_tap_distance_px(d: f64) -> Self {
        if d < 15.0 {
            Rating::Perfect
        } else if d < 30.0 {
            Rating::Great
        } else if d < 45.0 {
            Rating::Good
        } else {
            Rating::Ok
        }
    }

    fn from_hold_release_epsilon(eps: f64) -> Self {
        if eps < 0.05 {
            Rating::Perfect
        } else if eps < 0.10 {
            Rating::Great
        } else if eps < 0.20 {
            Rating::Good
        } else if eps < 0.35 {
            Rating::Ok
        } else {
            Rating::Miss
        }
    }
}

/// Per-player `{ score, combo }`. Score never decreases via Judge hits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreState {
    pub score: u64,
    pub combo: u32,
}

impl ScoreState {
    /// `base * (1 + min(combo, 10)/10)` rounded down, using the combo
    /// count *before* this hit's increment (so the first hit of a run
    /// scores its plain base value, matching the reference combo ladder).
    fn combo_bonus_points(&self, rating: Rating) -> u64 {
        let bonus_tenths = self.combo.min(10) as u64;
        rating.base_points() as u64 * (10 + bonus_tenths) / 10
    }

    /// Tap-hit award: always increments combo (a matched tap is never
    /// rated Miss).
    fn award(&mut self, rating: Rating) {
        let points = self.combo_bonus_points(rating);
        self.combo += 1;
        self.score += points;
    }

    /// Hold-note press award: half the tap formula's points, computed
    /// from the current combo. The combo itself only moves on release
    /// (per the hold-release rating table's `+1`/`<-0` column).
    fn award_half(&mut self, rating: Rating) {
        let points = self.combo_bonus_points(rating);
        self.score += points / 2;
    }

    /// Hold-release award, following §4.E step 6's combo column exactly:
    /// Perfect/Great/Good increment combo, Ok leaves it unchanged, Miss
    /// resets it to 0.
    fn award_release(&mut self, rating: Rating) {
        match rating {
            Rating::Miss => self.combo = 0,
            Rating::Ok => {
                let points = self.combo_bonus_points(rating);
                self.score += points;
            }
            Rating::Perfect | Rating::Great | Rating::Good => {
                let points = self.combo_bonus_points(rating);
                self.combo += 1;
                self.score += points;
            }
        }
    }
}

pub enum InputEvent {
    Press { player_id: u32, lane: Lane, t_sec: f64 },
    Release { player_id: u32, lane: Lane, t_sec: f64 },
}

pub struct GameOver {
    pub winner_ids: Vec<u32>,
    pub top_score: u64,
}

/// Finds the index of the Falling (or HeldByPlayer, for releases) note
/// for `(player_id, lane)` whose head is closest to `y_target`, breaking
/// ties by lowest chart index.
fn find_candidate(
    notes: &[LiveNote],
    player_id: u32,
    lane: Lane,
    game_time: f64,
    geometry: &PlayfieldGeometry,
    want_state: NoteState,
) -> Option<usize> {
    notes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.player_id == player_id && n.lane == lane && n.state == want_state)
        .map(|(idx, n)| {
            let d = (n.head_y(game_time, geometry) - geometry.y_target).abs();
            (idx, d, n.chart_index)
        })
        .min_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.2.cmp(&b.2))
        })
        .map(|(idx, _, _)| idx)
}

/// Applies one input event against the scheduler's live notes, updating
/// `score` in place. Returns the rating if a note was matched, or `None`
/// if the event was ignored (no candidate, or outside the hit window).
pub fn handle_input(
    scheduler: &mut Scheduler,
    score: &mut ScoreState,
    event: InputEvent,
    game_time: f64,
    geometry: &PlayfieldGeometry,
) -> Option<Rating> {
    match event {
        InputEvent::Press { player_id, lane, t_sec } => {
            handle_press(scheduler, score, player_id, lane, t_sec, game_time, geometry)
        }
        InputEvent::Release { player_id, lane, t_sec } => {
            handle_release(scheduler, score, player_id, lane, t_sec, geometry)
        }
    }
}

fn handle_press(
    scheduler: &mut Scheduler,
    score: &mut ScoreState,
    player_id: u32,
    lane: Lane,
    _t_sec: f64,
    game_time: f64,
    geometry: &PlayfieldGeometry,
) -> Option<Rating> {
    let idx = find_candidate(scheduler.live_notes(), player_id, lane, game_time, geometry, NoteState::Falling)?;

    let d = {
        let note = &scheduler.live_notes()[idx];
        (note.head_y(game_time, geometry) - geometry.y_target).abs()
    };
    if d > HEAD_RADIUS_PX + TARGET_RADIUS_PX {
        return None;
    }

    let rating = Rating::from_tap_distance_px(d);
    let is_hold = scheduler.live_notes()[idx].is_hold();

    if is_hold {
        score.award_half(rating);
        scheduler.begin_hold(idx);
    } else {
        score.award(rating);
        scheduler.remove_live_note(idx);
    }

    Some(rating)
}

fn handle_release(
    scheduler: &mut Scheduler,
    score: &mut ScoreState,
    player_id: u32,
    lane: Lane,
    _t_sec: f64,
    geometry: &PlayfieldGeometry,
) -> Option<Rating> {
    let idx = scheduler
        .live_notes()
        .iter()
        .position(|n| n.player_id == player_id && n.lane == lane && n.state == NoteState::HeldByPlayer)?;

    let eps = (scheduler.live_notes()[idx].hold_progress - 1.0).abs();
    let rating = Rating::from_hold_release_epsilon(eps);

    score.award_release(rating);
    scheduler.remove_live_note(idx);

    let _ = geometry;
    Some(rating)
}

/// Resets the owning player's combo for each note the Scheduler reaped
/// as Missed this tick (§3: "combo resets to 0 on Miss"; §4.D step 5).
/// Callers pass the `Vec<LiveNote>` returned by `Scheduler::tick` here.
pub fn apply_misses(scores: &mut [(u32, ScoreState)], missed: &[LiveNote]) {
    for note in missed {
        if let Some((_, score)) = scores.iter_mut().find(|(id, _)| *id == note.player_id) {
            score.combo = 0;
        }
    }
}

/// Emits `game_over` once the scheduler has reached the end of the chart
/// and no LiveNotes remain.
pub fn game_over(scheduler: &Scheduler, scores: &[(u32, ScoreState)]) -> Option<GameOver> {
    if !scheduler.is_finished() {
        return None;
    }
    let top_score = scores.iter().map(|(_, s)| s.score).max()?;
    let winner_ids = scores
        .iter()
        .filter(|(_, s)| s.score == top_score)
        .map(|(id, _)| *id)
        .collect();
    Some(GameOver { winner_ids, top_score })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartDifficulty, ChartNote};
    use crate::config::Config;
    use crate::scheduler::Scheduler;

    fn geometry() -> PlayfieldGeometry {
        PlayfieldGeometry::from_config(&Config::default())
    }

    fn chart(notes: Vec<ChartNote>) -> crate::chart::Chart {
        crate::chart::Chart {
            name: "t".into(),
            file: "t.wav".into(),
            bpm: 120,
            duration: 10.0,
            difficulty: ChartDifficulty::Hard,
            notes,
        }
    }

    #[test]
    fn perfect_timing_yields_the_combo_ladder_score() {
        let notes = vec![
            ChartNote::tap(1.0, Lane::new(1).unwrap()),
            ChartNote::tap(2.0, Lane::new(0).unwrap()),
            ChartNote::tap(3.0, Lane::new(2).unwrap()),
        ];
        let geom = geometry();
        let mut scheduler = Scheduler::new(chart(notes), geom, vec![0]);
        let mut score = ScoreState::default();

        for &(t, lane) in &[(1.0, 1u8), (2.0, 0), (3.0, 2)] {
            let _ = scheduler.tick(t, 1.0 / 60.0);
            let rating = handle_input(
                &mut scheduler,
                &mut score,
                InputEvent::Press { player_id: 0, lane: Lane::new(lane).unwrap(), t_sec: t },
                t,
                &geom,
            );
            assert_eq!(rating, Some(Rating::Perfect));
        }

        assert_eq!(score.combo, 3);
        assert_eq!(score.score, 100 + 110 + 120);
    }

    #[test]
    fn hold_note_release_windows_match_epsilon_table() {
        let notes = vec![ChartNote::hold(2.0, Lane::new(1).unwrap(), 1.0)];
        let geom = geometry();

        let run_release = |release_t: f64| {
            let mut scheduler = Scheduler::new(chart(notes.clone()), geom, vec![0]);
            let mut score = ScoreState::default();
            let _ = scheduler.tick(2.0, 1.0 / 60.0);
            handle_input(
                &mut scheduler,
                &mut score,
                InputEvent::Press { player_id: 0, lane: Lane::new(1).unwrap(), t_sec: 2.0 },
                2.0,
                &geom,
            );
            scheduler.live_notes_mut()[0].hold_progress = release_t - 2.0;
            handle_input(
                &mut scheduler,
                &mut score,
                InputEvent::Release { player_id: 0, lane: Lane::new(1).unwrap(), t_sec: release_t },
                release_t,
                &geom,
            )
        };

        assert_eq!(run_release(2.98), Some(Rating::Perfect));
        assert_eq!(run_release(3.30), Some(Rating::Good));
        assert_eq!(run_release(3.50), Some(Rating::Miss));
    }

    #[test]
    fn hold_release_ok_rating_keeps_combo_unchanged() {
        let mut score = ScoreState { score: 0, combo: 4 };
        score.award_release(Rating::Ok);
        assert_eq!(score.combo, 4, "Ok release must not move the combo column");
        assert!(score.score > 0, "Ok release still awards its 25-pt base");
    }

    #[test]
    fn hold_release_good_rating_increments_combo() {
        let mut score = ScoreState { score: 0, combo: 4 };
        score.award_release(Rating::Good);
        assert_eq!(score.combo, 5);
    }

    #[test]
    fn hold_release_miss_resets_combo_to_zero() {
        let mut score = ScoreState { score: 0, combo: 4 };
        score.award_release(Rating::Miss);
        assert_eq!(score.combo, 0);
    }

    #[test]
    fn an_unhit_falling_note_resets_the_owning_players_combo() {
        let notes = vec![
            ChartNote::tap(1.0, Lane::new(0).unwrap()),
            ChartNote::tap(2.0, Lane::new(1).unwrap()),
        ];
        let geom = geometry();
        let mut scheduler = Scheduler::new(chart(notes), geom, vec![0]);
        let mut scores = vec![(0u32, ScoreState::default())];

        let _ = scheduler.tick(1.0, 1.0 / 60.0);
        handle_input(
            &mut scheduler,
            &mut scores[0].1,
            InputEvent::Press { player_id: 0, lane: Lane::new(0).unwrap(), t_sec: 1.0 },
            1.0,
            &geom,
        );
        assert_eq!(scores[0].1.combo, 1);

        // Let the second note (lane 1, never pressed) fall clear of the
        // judgment line so the scheduler reaps it as Missed.
        let mut t = 1.0;
        let mut missed = Vec::new();
        while t < 5.0 && missed.is_empty() {
            missed = scheduler.tick(t, 1.0 / 60.0);
            t += 1.0 / 60.0;
        }

        assert_eq!(missed.len(), 1);
        apply_misses(&mut scores, &missed);
        assert_eq!(scores[0].1.combo, 0);
    }

    #[test]
    fn game_over_picks_the_highest_scorer_with_ties() {
        let scheduler = Scheduler::new(chart(vec![]), geometry(), vec![0, 1]);
        let scores = vec![
            (0, ScoreState { score: 500, combo: 0 }),
            (1, ScoreState { score: 500, combo: 0 }),
        ];
        let over = game_over(&scheduler, &scores).expect("finished chart");
        assert_eq!(over.top_score, 500);
        assert_eq!(over.winner_ids, vec![0, 1]);
    }
}
