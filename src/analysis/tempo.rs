//! Autocorrelation-based tempo estimation.

pub const FALLBACK_BPM: f64 = 120.0;
const MIN_BPM: f64 = 60.0;
const MAX_BPM: f64 = 200.0;

/// Estimates a single BPM from the onset-strength envelope via
/// autocorrelation, searching lags corresponding to 60-200 BPM and
/// falling back to [`FALLBACK_BPM`] when the envelope is too short or
/// degenerate (e.g. silent) to produce a usable peak.
pub fn estimate_bpm(envelope: &[f32], hop_sec: f64) -> f64 {
    if envelope.len() < 4 || hop_sec <= 0.0 {
        return FALLBACK_BPM;
    }

    let min_lag = ((60.0 / MAX_BPM) / hop_sec).floor().max(1.0) as usize;
    let max_lag = ((60.0 / MIN_BPM) / hop_sec).ceil() as usize;
    let max_lag = max_lag.min(envelope.len().saturating_sub(1));

    if min_lag >= max_lag {
        return FALLBACK_BPM;
    }

    let mut best_lag = None;
    let mut best_score = 0.0_f64;

    for lag in min_lag..=max_lag {
        let score = autocorrelation_at_lag(envelope, lag);
        if score > best_score {
            best_score = score;
            best_lag = Some(lag);
        }
    }

    match best_lag {
        Some(lag) if best_score > 0.0 => {
            let period_sec = lag as f64 * hop_sec;
            let bpm = 60.0 / period_sec;
            if bpm.is_finite() && (MIN_BPM..=MAX_BPM).contains(&bpm) {
                bpm
            } else {
                FALLBACK_BPM
            }
        }
        _ => FALLBACK_BPM,
    }
}

fn autocorrelation_at_lag(envelope: &[f32], lag: usize) -> f64 {
    let n = envelope.len();
    if lag >= n {
        return 0.0;
    }
    let mut sum = 0.0_f64;
    for i in 0..(n - lag) {
        sum += envelope[i] as f64 * envelope[i + lag] as f64;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_envelope_falls_back() {
        assert_eq!(estimate_bpm(&[0.0, 1.0], 0.02), FALLBACK_BPM);
    }

    #[test]
    fn silent_envelope_falls_back() {
        let envelope = vec![0.0f32; 200];
        assert_eq!(estimate_bpm(&envelope, 0.02), FALLBACK_BPM);
    }

    #[test]
    fn periodic_envelope_recovers_close_to_true_bpm() {
        let hop = 512.0 / 22_050.0;
        let true_bpm = 120.0;
        let period_sec = 60.0 / true_bpm;
        let period_frames = (period_sec / hop).round() as usize;

        let mut envelope = vec![0.0f32; period_frames * 8];
        let mut i = 0;
        while i < envelope.len() {
            envelope[i] = 1.0;
            i += period_frames;
        }

        let bpm = estimate_bpm(&envelope, hop);
        assert!((bpm - true_bpm).abs() < 5.0, "got {bpm}");
    }
}
