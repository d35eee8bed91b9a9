//! Frame-wise spectral centroid: the first moment of the magnitude
//! spectrum, used by the Chart Builder to bucket onsets into lanes.

/// Computes the spectral centroid (in Hz) of each frame's magnitude
/// spectrum. `spectra[i][k]` is the magnitude of bin `k` in frame `i`,
/// covering frequencies `k * sample_rate / fft_len`.
pub fn spectral_centroid_per_frame(spectra: &[Vec<f32>], sample_rate: u32, fft_len: usize) -> Vec<f32> {
    let bin_hz = sample_rate as f32 / fft_len as f32;
    spectra
        .iter()
        .map(|frame| centroid_of_frame(frame, bin_hz))
        .collect()
}

fn centroid_of_frame(frame: &[f32], bin_hz: f32) -> f32 {
    let mut weighted_sum = 0.0_f32;
    let mut total = 0.0_f32;
    for (k, &mag) in frame.iter().enumerate() {
        weighted_sum += mag * (k as f32 * bin_hz);
        total += mag;
    }
    if total > 0.0 {
        weighted_sum / total
    } else {
        0.0
    }
}

/// Looks up the centroid value for the frame containing time `t_sec`,
/// given the analysis hop duration.
pub fn centroid_at(centroids: &[f32], t_sec: f64, hop_sec: f64) -> f32 {
    if centroids.is_empty() || hop_sec <= 0.0 {
        return 0.0;
    }
    let idx = (t_sec / hop_sec).floor() as usize;
    centroids[idx.min(centroids.len() - 1)]
}
