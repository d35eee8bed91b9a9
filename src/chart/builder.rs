//! Chart Builder: turns Analyser output into a lane-assigned, difficulty-
//! filtered [`Chart`], grounded in the `rhythm-pi` charter's
//! `CharterConfig`/difficulty-filtering pattern.

use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

use crate::analysis::AnalysisResult;
use crate::config::{Config, Difficulty};

use super::note::{Chart, ChartDifficulty, ChartNote, Lane};

struct Onset {
    t_sec: f64,
    strength: f64,
}

/// Builds a chart for `difficulty` from `analysis`, using `name`/`file`
/// as the Chart's display metadata. `seed` controls Expert's
/// note-doubling RNG so generation is reproducible.
pub fn build_chart(
    analysis: &AnalysisResult,
    difficulty: Difficulty,
    config: &Config,
    name: &str,
    file: &str,
    seed: u64,
) -> Chart {
    let (c33, c66) = centroid_cutoffs(&analysis.spectral_centroid);
    let mean_strength = analysis.mean_onset_strength();

    let accepted = accept_onsets(analysis, mean_strength, config.onset_threshold, config.min_note_gap);

    let mut notes: Vec<ChartNote> = accepted
        .iter()
        .map(|onset| {
            let centroid = analysis.centroid_at(onset.t_sec);
            let lane = assign_lane(centroid, c33, c66);
            ChartNote::tap(onset.t_sec, lane)
        })
        .collect();

    notes = apply_difficulty(notes, &accepted, analysis, difficulty, config, seed);
    notes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    Chart {
        name: name.to_string(),
        file: file.to_string(),
        bpm: analysis.tempo_bpm.round() as u32,
        duration: (analysis.duration_sec * 100.0).round() / 100.0,
        difficulty: difficulty.into(),
        notes,
    }
}

/// 33rd and 66th percentile of the spectral centroid, the lane cutoffs.
fn centroid_cutoffs(centroid: &[f32]) -> (f32, f32) {
    if centroid.is_empty() {
        return (0.0, 0.0);
    }
    let mut sorted: Vec<f32> = centroid.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    (percentile(&sorted, 0.33), percentile(&sorted, 0.66))
}

fn percentile(sorted: &[f32], p: f64) -> f32 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn assign_lane(centroid: f32, c33: f32, c66: f32) -> Lane {
    let raw = if centroid < c33 {
        0
    } else if centroid < c66 {
        1
    } else {
        2
    };
    Lane::new(raw).expect("raw lane is always in 0..3")
}

/// Sweeps onsets in time order, rejecting any below `threshold *
/// mean_strength` or within `min_gap` of the previously accepted onset.
fn accept_onsets(
    analysis: &AnalysisResult,
    mean_strength: f64,
    threshold: f64,
    min_gap: f64,
) -> Vec<Onset> {
    let cutoff = threshold * mean_strength;
    let mut accepted: Vec<Onset> = Vec::new();
    let mut last_t: Option<f64> = None;

    for (&t, &strength) in analysis.onset_times.iter().zip(analysis.onset_strengths.iter()) {
        let strength = strength as f64;
        if strength < cutoff {
            continue;
        }
        if let Some(prev) = last_t {
            if t - prev < min_gap {
                continue;
            }
        }
        last_t = Some(t);
        accepted.push(Onset { t_sec: t, strength });
    }

    accepted
}

fn apply_difficulty(
    notes: Vec<ChartNote>,
    accepted: &[Onset],
    analysis: &AnalysisResult,
    difficulty: Difficulty,
    config: &Config,
    seed: u64,
) -> Vec<ChartNote> {
    match difficulty {
        Difficulty::Easy => re_filter(&notes, accepted, analysis, config, 0.50),
        Difficulty::Medium => re_filter(&notes, accepted, analysis, config, 0.25),
        Difficulty::Hard => notes,
        Difficulty::Expert => double_notes(notes, seed),
    }
}

/// Re-runs onset acceptance with a wider `min_gap`, keeping only the
/// notes whose onset survives the stricter spacing rule.
fn re_filter(
    notes: &[ChartNote],
    accepted: &[Onset],
    analysis: &AnalysisResult,
    config: &Config,
    min_gap: f64,
) -> Vec<ChartNote> {
    let mean_strength = analysis.mean_onset_strength();
    let cutoff = config.onset_threshold * mean_strength;

    let mut kept_times: Vec<f64> = Vec::new();
    let mut last_t: Option<f64> = None;
    for onset in accepted {
        if onset.strength < cutoff {
            continue;
        }
        if let Some(prev) = last_t {
            if onset.t_sec - prev < min_gap {
                continue;
            }
        }
        last_t = Some(onset.t_sec);
        kept_times.push(onset.t_sec);
    }

    notes
        .iter()
        .filter(|n| kept_times.iter().any(|&t| (t - n.t_sec).abs() < 1e-9))
        .copied()
        .collect()
}

/// Expert mode: for each note, with probability 0.25 emit a simultaneous
/// second note in a different lane chosen uniformly from the other two.
fn double_notes(notes: Vec<ChartNote>, seed: u64) -> Vec<ChartNote> {
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let mut out = Vec::with_capacity(notes.len());

    for note in notes {
        out.push(note);
        if rng.random_bool(0.25) {
            let other_lanes: Vec<u8> = (0..Lane::COUNT as u8).filter(|&l| l != note.lane.get()).collect();
            let pick = other_lanes[rng.random_range(0..other_lanes.len())];
            out.push(ChartNote::tap(note.t_sec, Lane::new(pick).expect("in range")));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_analysis(onset_times: Vec<f64>, strengths: Vec<f32>, centroid: Vec<f32>) -> AnalysisResult {
        AnalysisResult {
            sample_rate: 22_050,
            duration_sec: 10.0,
            onset_times,
            onset_strengths: strengths,
            tempo_bpm: 120.0,
            spectral_centroid: centroid,
            hop_sec: 0.02,
        }
    }

    #[test]
    fn lane_assignment_follows_centroid_cutoffs() {
        assert_eq!(assign_lane(5.0, 10.0, 20.0).get(), 0);
        assert_eq!(assign_lane(10.0, 10.0, 20.0).get(), 1);
        assert_eq!(assign_lane(15.0, 10.0, 20.0).get(), 1);
        assert_eq!(assign_lane(25.0, 10.0, 20.0).get(), 2);
    }

    #[test]
    fn onset_gap_rejection_enforces_min_note_gap() {
        let analysis = flat_analysis(
            vec![0.0, 0.05, 0.3],
            vec![1.0, 1.0, 1.0],
            vec![10.0; 20],
        );
        let accepted = accept_onsets(&analysis, 1.0, 0.0, 0.15);
        let times: Vec<f64> = accepted.iter().map(|o| o.t_sec).collect();
        assert_eq!(times, vec![0.0, 0.3]);
    }

    #[test]
    fn weak_onsets_are_rejected_by_threshold() {
        let analysis = flat_analysis(vec![0.0, 1.0], vec![0.1, 2.0], vec![10.0; 20]);
        let accepted = accept_onsets(&analysis, 1.0, 0.5, 0.0);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].t_sec, 1.0);
    }

    #[test]
    fn difficulty_filter_is_monotonic_in_note_count() {
        let config = Config::default();
        let onset_times: Vec<f64> = (0..40).map(|i| i as f64 * 0.1).collect();
        let strengths = vec![1.0f32; onset_times.len()];
        let centroid = vec![10.0f32; 200];
        let analysis = flat_analysis(onset_times, strengths, centroid);

        let easy = build_chart(&analysis, Difficulty::Easy, &config, "n", "f", 1);
        let medium = build_chart(&analysis, Difficulty::Medium, &config, "n", "f", 1);
        let hard = build_chart(&analysis, Difficulty::Hard, &config, "n", "f", 1);
        let expert = build_chart(&analysis, Difficulty::Expert, &config, "n", "f", 1);

        assert!(easy.notes.len() <= medium.notes.len());
        assert!(medium.notes.len() <= hard.notes.len());
        assert!(hard.notes.len() <= expert.notes.len());
    }

    #[test]
    fn expert_doubling_is_deterministic_for_a_fixed_seed() {
        let config = Config::default();
        let onset_times: Vec<f64> = (0..20).map(|i| i as f64 * 0.2).collect();
        let strengths = vec![1.0f32; onset_times.len()];
        let centroid = vec![10.0f32; 200];
        let analysis = flat_analysis(onset_times, strengths, centroid);

        let a = build_chart(&analysis, Difficulty::Expert, &config, "n", "f", 42);
        let b = build_chart(&analysis, Difficulty::Expert, &config, "n", "f", 42);
        assert_eq!(a.notes, b.notes);
    }

    #[test]
    fn built_chart_is_sorted_and_well_formed() {
        let config = Config::default();
        let onset_times: Vec<f64> = (0..10).map(|i| i as f64 * 0.3).collect();
        let strengths = vec![1.0f32; onset_times.len()];
        let centroid = vec![10.0f32; 200];
        let analysis = flat_analysis(onset_times, strengths, centroid);

        let chart = build_chart(&analysis, Difficulty::Hard, &config, "n", "f", 7);
        assert!(chart.is_well_formed());
    }
}
