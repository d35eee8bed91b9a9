//! Audio playback facade.
//!
//! A dedicated worker thread (`worker::spawn`) owns the `rodio`
//! output stream and sink; this module only sends it commands over a
//! `crossbeam_channel` and reads back its published playback position
//! through atomics — mirroring the teacher's `AudioManager`/
//! `start_audio_thread` split so the hot path never blocks on audio I/O.

mod worker;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Sender};

/// Commands accepted by the audio worker thread.
#[derive(Debug, Clone)]
pub enum AudioCommand {
    Load { path: PathBuf },
    Play,
    Pause,
    Stop,
    Seek { position_secs: f32 },
    SetSpeed { speed: f32 },
    SetVolume { volume: f32 },
}

/// Shared, lock-free playback position state published by the worker and
/// read by the Clock Service.
#[derive(Clone)]
pub struct Position {
    samples: Arc<AtomicU64>,
    sample_rate: Arc<AtomicU64>,
    channels: Arc<AtomicU64>,
}

impl Position {
    fn advance_one_sample(&self) {
        self.samples.fetch_add(1, Ordering::Relaxed);
    }

    fn set_samples(&self, n: u64) {
        self.samples.store(n, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.samples.store(0, Ordering::Relaxed);
    }

    fn set_format(&self, sample_rate: u32, channels: u16) {
        self.sample_rate.store(sample_rate as u64, Ordering::Relaxed);
        self.channels.store(channels as u64, Ordering::Relaxed);
    }

    /// Current playback position in seconds.
    pub fn seconds(&self) -> f64 {
        let samples = self.samples.load(Ordering::Relaxed) as f64;
        let sample_rate = self.sample_rate.load(Ordering::Relaxed).max(1) as f64;
        let channels = self.channels.load(Ordering::Relaxed).max(1) as f64;
        samples / (sample_rate * channels)
    }
}

/// Non-blocking handle the hot path uses to control playback and read
/// position. Cloning shares the same underlying worker thread.
#[derive(Clone)]
pub struct AudioManager {
    cmd_tx: Sender<AudioCommand>,
    position: Position,
}

impl AudioManager {
    /// Spawns the worker thread and returns a handle to it.
    pub fn spawn() -> Self {
        let (cmd_tx, cmd_rx) = unbounded();
        let samples = Arc::new(AtomicU64::new(0));
        let sample_rate = Arc::new(AtomicU64::new(44_100));
        let channels = Arc::new(AtomicU64::new(2));
        let position = Position {
            samples: samples.clone(),
            sample_rate: sample_rate.clone(),
            channels: channels.clone(),
        };

        worker::spawn(cmd_rx, samples, sample_rate, channels);

        Self { cmd_tx, position }
    }

    pub fn load(&self, path: &Path) {
        let _ = self.cmd_tx.send(AudioCommand::Load { path: path.to_path_buf() });
    }

    pub fn play(&self) {
        let _ = self.cmd_tx.send(AudioCommand::Play);
    }

    pub fn pause(&self) {
        let _ = self.cmd_tx.send(AudioCommand::Pause);
    }

    pub fn stop(&self) {
        let _ = self.cmd_tx.send(AudioCommand::Stop);
    }

    pub fn seek(&self, position_secs: f32) {
        let _ = self.cmd_tx.send(AudioCommand::Seek { position_secs });
    }

    pub fn set_speed(&self, speed: f32) {
        let _ = self.cmd_tx.send(AudioCommand::SetSpeed { speed });
    }

    pub fn set_volume(&self, volume: f32) {
        let _ = self.cmd_tx.send(AudioCommand::SetVolume { volume });
    }

    /// Current playback position in seconds, read lock-free.
    pub fn position_seconds(&self) -> f64 {
        self.position.seconds()
    }
}
