//! Onset-strength envelope and peak picking.

use rustfft::{num_complex::Complex32, FftPlanner};

pub const FRAME_SIZE: usize = 1024;
pub const HOP_SIZE: usize = 512;

/// Hop size expressed in seconds, given the analysis sample rate.
pub fn hop_sec(sample_rate: u32) -> f64 {
    HOP_SIZE as f64 / sample_rate as f64
}

/// Frame-to-frame positive spectral flux: for each frame after the first,
/// sums the positive part of (magnitude − previous magnitude) across bins.
pub fn onset_strength_envelope(spectra: &[Vec<f32>]) -> Vec<f32> {
    if spectra.len() < 2 {
        return vec![0.0; spectra.len()];
    }

    let mut envelope = Vec::with_capacity(spectra.len());
    envelope.push(0.0);

    for pair in spectra.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        let flux: f32 = prev
            .iter()
            .zip(cur.iter())
            .map(|(&p, &c)| (c - p).max(0.0))
            .sum();
        envelope.push(flux);
    }

    envelope
}

/// Picks local-maximum peaks in `envelope` that clear
/// `threshold * mean(envelope)`, returning their frame indices in order.
pub fn pick_peaks(envelope: &[f32], threshold: f64) -> Vec<usize> {
    if envelope.is_empty() {
        return Vec::new();
    }

    let mean = envelope.iter().map(|&v| v as f64).sum::<f64>() / envelope.len() as f64;
    let cutoff = threshold * mean;

    let mut peaks = Vec::new();
    for i in 0..envelope.len() {
        let v = envelope[i] as f64;
        if v < cutoff {
            continue;
        }
        let is_local_max = (i == 0 || envelope[i] >= envelope[i - 1])
            && (i == envelope.len() - 1 || envelope[i] >= envelope[i + 1]);
        if is_local_max {
            peaks.push(i);
        }
    }
    peaks
}

/// Computes the magnitude spectrum for each non-overlapping-by-`HOP_SIZE`
/// window of `samples`, Hann-windowed before the FFT.
pub fn magnitude_spectra(samples: &[f32]) -> Vec<Vec<f32>> {
    if samples.len() < FRAME_SIZE {
        return Vec::new();
    }

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FRAME_SIZE);
    let window = hann_window(FRAME_SIZE);

    let mut spectra = Vec::new();
    let mut start = 0;
    while start + FRAME_SIZE <= samples.len() {
        let mut buf: Vec<Complex32> = samples[start..start + FRAME_SIZE]
            .iter()
            .zip(window.iter())
            .map(|(&s, &w)| Complex32::new(s * w, 0.0))
            .collect();
        fft.process(&mut buf);
        let mags = buf[..FRAME_SIZE / 2]
            .iter()
            .map(|c| c.norm())
            .collect();
        spectra.push(mags);
        start += HOP_SIZE;
    }
    spectra
}

fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (len - 1) as f32).cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_is_zero_for_identical_frames() {
        let spectra = vec![vec![1.0, 2.0, 3.0]; 4];
        let env = onset_strength_envelope(&spectra);
        assert!(env.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn envelope_flags_an_increase() {
        let spectra = vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![0.5, 0.5]];
        let env = onset_strength_envelope(&spectra);
        assert_eq!(env.len(), 3);
        assert!(env[1] > 0.0);
        assert_eq!(env[2], 0.0);
    }

    #[test]
    fn pick_peaks_finds_local_maxima_above_threshold() {
        let envelope = vec![0.0, 0.1, 5.0, 0.1, 0.0, 4.0, 0.0];
        let peaks = pick_peaks(&envelope, 1.0);
        assert!(peaks.contains(&2));
        assert!(peaks.contains(&5));
    }

    #[test]
    fn pick_peaks_empty_envelope_yields_no_peaks() {
        assert!(pick_peaks(&[], 0.5).is_empty());
    }

    #[test]
    fn magnitude_spectra_hops_by_hop_size() {
        let samples = vec![0.0f32; FRAME_SIZE + HOP_SIZE * 3];
        let spectra = magnitude_spectra(&samples);
        assert_eq!(spectra.len(), 4);
        assert_eq!(spectra[0].len(), FRAME_SIZE / 2);
    }
}
