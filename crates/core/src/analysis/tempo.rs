use std::cmp::Ordering;

/// Lowest tempo the estimator reports.
pub const MIN_BPM: f64 = 60.0;
/// Highest tempo the estimator reports.
pub const MAX_BPM: f64 = 200.0;
/// Returned when there are too few beats to measure anything.
pub const DEFAULT_BPM: f64 = 120.0;

/// Intervals shorter than this are treated as double triggers.
const MIN_INTERVAL_SECONDS: f64 = 0.15;
/// Kept intervals must lie within these multiples of the median.
const OUTLIER_LOW_RATIO: f64 = 0.5;
const OUTLIER_HIGH_RATIO: f64 = 1.5;

/// Turns beat timestamps into a single tempo in `[MIN_BPM, MAX_BPM]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TempoEstimator;

impl TempoEstimator {
    pub fn new() -> Self {
        Self
    }

    pub fn estimate(&self, beats: &[f64]) -> f64 {
        let mut intervals: Vec<f64> = beats
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .filter(|interval| interval.is_finite() && *interval >= MIN_INTERVAL_SECONDS)
            .collect();

        if intervals.is_empty() {
            return DEFAULT_BPM;
        }

        intervals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let median = median_of_sorted(&intervals);
        let kept: Vec<f64> = intervals
            .iter()
            .copied()
            .filter(|interval| {
                *interval >= median * OUTLIER_LOW_RATIO && *interval <= median * OUTLIER_HIGH_RATIO
            })
            .collect();

        let representative = if kept.is_empty() {
            median
        } else {
            kept.iter().sum::<f64>() / kept.len() as f64
        };

        fold_into_range(60.0 / representative)
    }
}

/// Halves or doubles `bpm` until it lands in `[MIN_BPM, MAX_BPM]`.
pub fn fold_into_range(bpm: f64) -> f64 {
    if !bpm.is_finite() || bpm <= 0.0 {
        return DEFAULT_BPM;
    }

    let mut folded = bpm;
    while folded > MAX_BPM {
        folded /= 2.0;
    }
    while folded < MIN_BPM {
        folded *= 2.0;
    }
    folded
}

fn median_of_sorted(values: &[f64]) -> f64 {
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
