//! Decodes an audio file to mono f32 samples at the analysis sample rate.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rodio::{Decoder, Source};

use crate::error::{CoreError, Result};

/// The sample rate all analysis operates at.
pub const ANALYSIS_SAMPLE_RATE: u32 = 22_050;

/// Decoded, downmixed-to-mono, resampled-to-[`ANALYSIS_SAMPLE_RATE`] audio.
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration_sec(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decodes `path` via rodio (which supports wav/mp3/flac/ogg), downmixes to
/// mono, and linearly resamples to [`ANALYSIS_SAMPLE_RATE`] Hz.
pub fn decode_to_mono_22050(path: &Path) -> Result<DecodedAudio> {
    if !path.exists() {
        return Err(CoreError::NotFound(path.to_path_buf()));
    }

    let file = File::open(path).map_err(|e| CoreError::DecodeFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let source = Decoder::new(BufReader::new(file)).map_err(|e| CoreError::DecodeFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let source_rate = source.sample_rate();
    let channels = source.channels().max(1) as usize;

    let raw: Vec<i16> = source.collect();
    if raw.is_empty() {
        return Err(CoreError::DecodeFailed {
            path: path.to_path_buf(),
            reason: "decoded zero samples".into(),
        });
    }

    let mono = downmix_to_mono(&raw, channels);
    let resampled = resample_linear(&mono, source_rate, ANALYSIS_SAMPLE_RATE);

    Ok(DecodedAudio {
        samples: resampled,
        sample_rate: ANALYSIS_SAMPLE_RATE,
    })
}

fn downmix_to_mono(samples: &[i16], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
    }
    samples
        .chunks(channels)
        .map(|frame| {
            let sum: f32 = frame.iter().map(|&s| s as f32 / i16::MAX as f32).sum();
            sum / frame.len() as f32
        })
        .collect()
}

fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;
        let a = samples.get(idx).copied().unwrap_or(0.0);
        let b = samples.get(idx + 1).copied().unwrap_or(a);
        out.push(a + (b - a) * frac);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_found() {
        let result = decode_to_mono_22050(Path::new("/nonexistent/file.wav"));
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[test]
    fn downmix_averages_channels() {
        let stereo = vec![0, 0, i16::MAX, i16::MAX];
        let mono = downmix_to_mono(&stereo, 2);
        assert!((mono[0] - 0.0).abs() < 1e-6);
        assert!((mono[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn resample_identity_when_rates_match() {
        let samples = vec![0.1, 0.2, 0.3];
        let out = resample_linear(&samples, 22_050, 22_050);
        assert_eq!(out, samples);
    }

    #[test]
    fn resample_halves_length_when_rate_halves() {
        let samples: Vec<f32> = (0..1000).map(|i| i as f32).collect();
        let out = resample_linear(&samples, 44_100, 22_050);
        assert!((out.len() as i64 - 500).abs() <= 1);
    }
}
