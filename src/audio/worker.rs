//! Dedicated audio thread: owns the `rodio::OutputStream`/`Sink` pair and
//! publishes playback position through atomics so the Clock Service can
//! read it lock-free on the hot path.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use super::{AudioCommand, Position};

struct AudioWorker {
    _stream: Option<OutputStream>,
    stream_handle: Option<OutputStreamHandle>,
    sink: Option<Sink>,
    current_path: Option<PathBuf>,
    speed: f32,
    volume: f32,
    position: Position,
    has_audio: bool,
}

impl AudioWorker {
    fn new(position: Position) -> Self {
        match OutputStream::try_default() {
            Ok((stream, stream_handle)) => {
                log::info!("AUDIO: device found, audio enabled");
                Self {
                    _stream: Some(stream),
                    stream_handle: Some(stream_handle),
                    sink: None,
                    current_path: None,
                    speed: 1.0,
                    volume: 1.0,
                    position,
                    has_audio: true,
                }
            }
            Err(e) => {
                log::warn!("AUDIO: no output device ({e}), running in silent mode");
                Self {
                    _stream: None,
                    stream_handle: None,
                    sink: None,
                    current_path: None,
                    speed: 1.0,
                    volume: 1.0,
                    position,
                    has_audio: false,
                }
            }
        }
    }

    fn handle(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Load { path } => self.load(&path),
            AudioCommand::Play => {
                if let Some(sink) = &self.sink {
                    sink.play();
                }
            }
            AudioCommand::Pause => {
                if let Some(sink) = &self.sink {
                    sink.pause();
                }
            }
            AudioCommand::Stop => {
                if let Some(sink) = self.sink.take() {
                    sink.stop();
                }
                self.position.reset();
            }
            AudioCommand::Seek { position_secs } => self.seek(position_secs),
            AudioCommand::SetSpeed { speed } => {
                self.speed = speed;
                if let Some(sink) = &self.sink {
                    sink.set_speed(speed);
                }
            }
            AudioCommand::SetVolume { volume } => {
                self.volume = volume;
                if let Some(sink) = &self.sink {
                    sink.set_volume(volume);
                }
            }
        }
    }

    fn load(&mut self, path: &Path) {
        self.current_path = Some(path.to_path_buf());
        self.load_from(0.0);
    }

    fn load_from(&mut self, position_secs: f32) {
        if !self.has_audio {
            return;
        }
        let Some(path) = self.current_path.clone() else {
            return;
        };

        if let Some(sink) = self.sink.take() {
            sink.stop();
        }

        let Ok(file) = File::open(&path) else {
            log::error!("AUDIO: cannot open {path:?}");
            return;
        };
        let Ok(source) = Decoder::new(BufReader::new(file)) else {
            log::error!("AUDIO: cannot decode {path:?}");
            return;
        };

        let sample_rate = source.sample_rate();
        let channels = source.channels();
        self.position.set_format(sample_rate, channels);

        let skipped_samples =
            (position_secs.max(0.0) as f64 * sample_rate as f64 * channels as f64) as u64;
        self.position.set_samples(skipped_samples);

        let skip = Duration::from_secs_f32(position_secs.max(0.0));
        let monitored = PositionTrackingSource {
            inner: source.skip_duration(skip),
            position: self.position.clone(),
        };

        let Some(stream_handle) = &self.stream_handle else {
            return;
        };
        let Ok(sink) = Sink::try_new(stream_handle) else {
            log::error!("AUDIO: failed to create sink");
            return;
        };
        sink.set_speed(self.speed);
        sink.set_volume(self.volume);
        sink.append(monitored);
        sink.pause();
        self.sink = Some(sink);
    }

    fn seek(&mut self, position_secs: f32) {
        let was_playing = self.sink.as_ref().map(|s| !s.is_paused()).unwrap_or(false);
        self.load_from(position_secs);
        if was_playing {
            if let Some(sink) = &self.sink {
                sink.play();
            }
        }
    }
}

struct PositionTrackingSource<I> {
    inner: I,
    position: Position,
}

impl<I: Iterator> Iterator for PositionTrackingSource<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next();
        if item.is_some() {
            self.position.advance_one_sample();
        }
        item
    }
}

impl<I> Source for PositionTrackingSource<I>
where
    I: Source,
    I::Item: rodio::Sample,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.inner.current_frame_len()
    }
    fn channels(&self) -> u16 {
        self.inner.channels()
    }
    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }
    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}

/// Spawns the dedicated audio thread, consuming commands from `rx` until
/// the channel's senders are all dropped.
pub fn spawn(rx: Receiver<AudioCommand>, samples: Arc<AtomicU64>, sample_rate: Arc<AtomicU64>, channels: Arc<AtomicU64>) {
    thread::Builder::new()
        .name("audio-worker".into())
        .spawn(move || {
            log::info!("AUDIO: worker thread started");
            let position = Position { samples, sample_rate, channels };
            let mut worker = AudioWorker::new(position);
            while let Ok(cmd) = rx.recv() {
                worker.handle(cmd);
            }
            log::info!("AUDIO: worker thread stopped");
        })
        .expect("failed to spawn audio worker thread");
}
