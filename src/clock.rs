//! Clock/Sync Service: a single `game_time()` axis the Scheduler and
//! Judge read, kept within ±10ms of true audio playback once audio is
//! running.

use std::time::{Duration, Instant};

use crate::audio::AudioManager;
use crate::config::Config;

const SNAP_THRESHOLD_SEC: f64 = 0.100;
const BLEND_THRESHOLD_SEC: f64 = 0.010;
const BLEND_FACTOR: f64 = 0.1;
const DEGRADED_AFTER_SEC: f64 = 1.0;

struct AudioAnchor {
    g0: f64,
    audio_offset: f64,
}

/// Tracks how long drift has continuously exceeded [`SNAP_THRESHOLD_SEC`],
/// so a `TimingDegraded` advisory can be logged once it persists.
struct DriftEpisode {
    started_at: Option<Instant>,
    degraded_logged: bool,
}

impl DriftEpisode {
    fn new() -> Self {
        Self { started_at: None, degraded_logged: false }
    }

    fn observe(&mut self, drift_sec: f64, now: Instant) {
        if drift_sec.abs() > SNAP_THRESHOLD_SEC {
            let started = *self.started_at.get_or_insert(now);
            if !self.degraded_logged && now.duration_since(started).as_secs_f64() > DEGRADED_AFTER_SEC {
                log::warn!("CLOCK: timing degraded, drift exceeded 100ms for over 1s");
                self.degraded_logged = true;
            }
        } else {
            self.started_at = None;
            self.degraded_logged = false;
        }
    }
}

/// Owns the single audio output device and the `game_time` axis.
pub struct ClockService {
    audio: AudioManager,
    config: Config,
    game_time: f64,
    audio_offset: f64,
    anchor: Option<AudioAnchor>,
    play_started: bool,
    drift_episode: DriftEpisode,
    last_tick_at: Option<Instant>,
    /// Wall-clock instant at which the deferred `audio.play()` command
    /// should fire, set by `play()` to `now + audio_start_delay`.
    audio_start_at: Option<Instant>,
    /// Whether the deferred `audio.play()` command has been issued yet
    /// for the current play session.
    audio_started: bool,
}

impl ClockService {
    pub fn new(audio: AudioManager, config: Config) -> Self {
        let audio_offset_default = 0.0;
        Self {
            audio,
            config,
            game_time: 0.0,
            audio_offset: audio_offset_default,
            anchor: None,
            play_started: false,
            drift_episode: DriftEpisode::new(),
            last_tick_at: None,
            audio_start_at: None,
            audio_started: false,
        }
    }

    /// The user's measured latency offset from calibration, in seconds.
    pub fn set_audio_offset(&mut self, audio_offset: f64) {
        self.audio_offset = audio_offset;
    }

    pub fn audio_offset(&self) -> f64 {
        self.audio_offset
    }

    pub fn game_time(&self) -> f64 {
        self.game_time
    }

    /// Subtracts `latency_comp_sec` from a raw input timestamp to place
    /// it on the chart/game time axis.
    pub fn compensate(&self, raw_timestamp_sec: f64) -> f64 {
        raw_timestamp_sec - self.config.latency_comp_sec
    }

    /// Begins playback: starts the wall-clock advance immediately (notes
    /// spawn right away per §4.D) and schedules the actual `audio.play()`
    /// command for `audio_start_delay` from now, per §4.C's settle delay.
    pub fn play(&mut self) {
        let now = Instant::now();
        self.play_started = true;
        self.last_tick_at = Some(now);
        self.audio_start_at = Some(now + self.audio_start_delay());
        self.audio_started = false;
    }

    pub fn stop(&mut self) {
        self.audio.stop();
        self.play_started = false;
        self.anchor = None;
        self.last_tick_at = None;
        self.audio_start_at = None;
        self.audio_started = false;
    }

    /// True once the deferred `audio.play()` command has fired for the
    /// current play session.
    pub fn audio_started(&self) -> bool {
        self.audio_started
    }

    /// Advances `game_time` by wall-clock elapsed time; once the
    /// `audio_start_delay` settle has elapsed it issues the deferred
    /// `audio.play()` command, and once audio has started producing
    /// samples it blends `game_time` toward the audio-derived expectation.
    pub fn tick(&mut self) {
        let now = Instant::now();
        let dt = self
            .last_tick_at
            .map(|prev| now.duration_since(prev).as_secs_f64())
            .unwrap_or(0.0);
        self.last_tick_at = Some(now);

        if !self.play_started {
            return;
        }
        self.game_time += dt;

        if !self.audio_started {
            match self.audio_start_at {
                Some(start_at) if now >= start_at => {
                    self.audio.play();
                    self.audio_started = true;
                }
                _ => return,
            }
        }

        let audio_pos = self.audio.position_seconds();
        if audio_pos <= 0.0 {
            return;
        }

        let anchor = self.anchor.get_or_insert_with(|| AudioAnchor {
            g0: self.game_time,
            audio_offset: self.audio_offset,
        });

        let expected = anchor.g0 + audio_pos + anchor.audio_offset;
        let drift = expected - self.game_time;

        self.drift_episode.observe(drift, now);

        if drift.abs() > SNAP_THRESHOLD_SEC {
            self.game_time = expected;
        } else if drift.abs() > BLEND_THRESHOLD_SEC {
            self.game_time += BLEND_FACTOR * drift;
        }
    }

    /// The audio device's reported delay before playback actually begins,
    /// from §6's tuning parameters.
    pub fn audio_start_delay(&self) -> Duration {
        Duration::from_secs_f64(self.config.audio_start_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ClockService {
        ClockService::new(AudioManager::spawn(), Config::default())
    }

    #[test]
    fn compensate_subtracts_latency() {
        let service = service();
        assert!((service.compensate(1.0) - (1.0 - 0.150)).abs() < 1e-9);
    }

    #[test]
    fn game_time_is_zero_before_play() {
        let service = service();
        assert_eq!(service.game_time(), 0.0);
    }

    #[test]
    fn drift_episode_does_not_fire_before_one_second() {
        let mut episode = DriftEpisode::new();
        let t0 = Instant::now();
        episode.observe(0.2, t0);
        assert!(!episode.degraded_logged);
    }

    #[test]
    fn drift_episode_resets_on_recovery() {
        let mut episode = DriftEpisode::new();
        let t0 = Instant::now();
        episode.observe(0.2, t0);
        episode.observe(0.01, t0);
        assert!(episode.started_at.is_none());
    }

    #[test]
    fn audio_start_is_deferred_past_the_settle_delay() {
        let mut service = service();
        service.play();
        service.tick();
        assert!(
            !service.audio_started(),
            "audio.play() must not fire before audio_start_delay elapses"
        );
    }

    #[test]
    fn audio_start_fires_once_the_settle_delay_elapses() {
        let mut service = service();
        service.play();
        std::thread::sleep(service.audio_start_delay() + Duration::from_millis(10));
        service.tick();
        assert!(service.audio_started());
    }

    #[test]
    fn stop_clears_the_pending_audio_start_schedule() {
        let mut service = service();
        service.play();
        service.stop();
        assert!(!service.audio_started());
    }
}
