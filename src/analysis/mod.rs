//! Audio Analyser: decodes an audio file and extracts the raw features
//! the Chart Builder consumes — onset times, tempo, and a frame-wise
//! spectral centroid.
//!
//! Only a missing file or a failed decode is fatal. Each feature
//! subroutine degrades independently: if onset detection, tempo
//! estimation, or centroid computation fails to produce a usable
//! result, it logs a warning and substitutes an empty/default value
//! rather than aborting the whole analysis.

pub mod centroid;
pub mod decode;
pub mod onset;
pub mod tempo;

use std::path::Path;

use crate::error::Result;

/// Raw features extracted from one audio file.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub sample_rate: u32,
    pub duration_sec: f64,
    pub onset_times: Vec<f64>,
    pub onset_strengths: Vec<f32>,
    pub tempo_bpm: f64,
    pub spectral_centroid: Vec<f32>,
    pub hop_sec: f64,
}

impl AnalysisResult {
    pub fn mean_onset_strength(&self) -> f64 {
        if self.onset_strengths.is_empty() {
            return 0.0;
        }
        self.onset_strengths.iter().map(|&v| v as f64).sum::<f64>()
            / self.onset_strengths.len() as f64
    }

    pub fn centroid_at(&self, t_sec: f64) -> f32 {
        centroid::centroid_at(&self.spectral_centroid, t_sec, self.hop_sec)
    }
}

/// Runs the full Analyser pipeline on `path`.
pub fn analyse(path: &Path) -> Result<AnalysisResult> {
    let decoded = decode::decode_to_mono_22050(path)?;
    let duration_sec = decoded.duration_sec();
    let hop_sec = onset::hop_sec(decoded.sample_rate);

    let spectra = magnitude_spectra_or_empty(&decoded.samples);

    let envelope = if spectra.is_empty() {
        log::warn!("ANALYSER: onset envelope degraded for {path:?}: audio too short for one FFT frame");
        Vec::new()
    } else {
        onset::onset_strength_envelope(&spectra)
    };

    let peaks = onset::pick_peaks(&envelope, 1.0);
    let onset_times: Vec<f64> = peaks.iter().map(|&i| i as f64 * hop_sec).collect();
    let onset_strengths: Vec<f32> = peaks.iter().map(|&i| envelope[i]).collect();

    let tempo_bpm = if envelope.is_empty() {
        log::warn!("ANALYSER: tempo degraded for {path:?}: empty onset envelope, falling back to {}bpm", tempo::FALLBACK_BPM);
        tempo::FALLBACK_BPM
    } else {
        tempo::estimate_bpm(&envelope, hop_sec)
    };

    let spectral_centroid = if spectra.is_empty() {
        log::warn!("ANALYSER: spectral centroid degraded for {path:?}: audio too short for one FFT frame");
        Vec::new()
    } else {
        centroid::spectral_centroid_per_frame(&spectra, decoded.sample_rate, onset::FRAME_SIZE)
    };

    Ok(AnalysisResult {
        sample_rate: decoded.sample_rate,
        duration_sec,
        onset_times,
        onset_strengths,
        tempo_bpm,
        spectral_centroid,
        hop_sec,
    })
}

fn magnitude_spectra_or_empty(samples: &[f32]) -> Vec<Vec<f32>> {
    onset::magnitude_spectra(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn missing_file_is_fatal() {
        let result = analyse(Path::new("/nonexistent/audio.wav"));
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[test]
    fn mean_onset_strength_of_empty_is_zero() {
        let result = AnalysisResult {
            sample_rate: 22_050,
            duration_sec: 0.0,
            onset_times: vec![],
            onset_strengths: vec![],
            tempo_bpm: 120.0,
            spectral_centroid: vec![],
            hop_sec: 0.02,
        };
        assert_eq!(result.mean_onset_strength(), 0.0);
    }
}
