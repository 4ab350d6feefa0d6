pub mod tempo;

use std::f32::consts::PI;

use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::audio::{AudioTrack, PcmBuffer, DEFAULT_SAMPLE_RATE};

pub use tempo::TempoEstimator;

pub const DEFAULT_FRAME_SIZE: usize = 2048;
pub const DEFAULT_HOP_SIZE: usize = 512;
pub const DEFAULT_THRESHOLD_SENSITIVITY: f32 = 0.5;

/// Tunables for [`BeatDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub sample_rate: u32,
    pub frame_size: usize,
    pub hop_size: usize,
    /// Number of standard deviations above the mean flux a frame must reach.
    pub threshold_sensitivity: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            frame_size: DEFAULT_FRAME_SIZE,
            hop_size: DEFAULT_HOP_SIZE,
            threshold_sensitivity: DEFAULT_THRESHOLD_SENSITIVITY,
        }
    }
}

/// Summary of a complete detection run.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AnalysisSummary {
    pub sample_rate: u32,
    pub tempo_bpm: f64,
    pub duration_seconds: f64,
    pub beats: Vec<f64>,
}

impl AnalysisSummary {
    /// Packages the summary as the track shape consumed by the engine.
    pub fn into_track(self, id: impl Into<String>) -> AudioTrack {
        AudioTrack::new(id, self.duration_seconds, self.tempo_bpm, self.beats)
    }
}

/// Spectral-flux beat detector. Holds configuration only, so a single
/// instance can serve any number of concurrent detections.
#[derive(Debug, Clone, Default)]
pub struct BeatDetector {
    config: DetectorConfig,
}

impl BeatDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Creates a detector with default framing at the provided sample rate.
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self::new(DetectorConfig {
            sample_rate,
            ..DetectorConfig::default()
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Returns ordered beat timestamps (seconds) for the whole buffer.
    pub fn detect(&self, samples: &[f32]) -> Vec<f64> {
        self.run(samples, || false).unwrap_or_default()
    }

    /// Like [`BeatDetector::detect`] but checks `cancel` once per frame. A
    /// cancelled run yields an empty list, never a partial one.
    pub fn detect_cancellable(&self, samples: &[f32], cancel: &CancellationToken) -> Vec<f64> {
        match self.run(samples, || cancel.is_cancelled()) {
            Some(beats) => beats,
            None => {
                tracing::warn!("beat detection cancelled");
                Vec::new()
            }
        }
    }

    /// Runs detection on the blocking pool and awaits the single result. The
    /// buffer's own sample rate takes precedence over the configured one.
    pub async fn detect_async(&self, buffer: PcmBuffer, cancel: CancellationToken) -> Vec<f64> {
        let detector = Self::new(DetectorConfig {
            sample_rate: buffer.sample_rate,
            ..self.config
        });
        let token = cancel.clone();
        let worker = tokio::task::spawn_blocking(move || {
            detector.detect_cancellable(&buffer.samples, &token)
        });

        match worker.await {
            Ok(_) if cancel.is_cancelled() => Vec::new(),
            Ok(beats) => beats,
            Err(err) => {
                tracing::warn!("beat detection worker failed: {err}");
                Vec::new()
            }
        }
    }

    /// Detects beats and estimates the tempo of a whole buffer.
    pub fn analyze(&self, buffer: &PcmBuffer) -> AnalysisSummary {
        let detector = Self::new(DetectorConfig {
            sample_rate: buffer.sample_rate,
            ..self.config
        });
        let beats = detector.detect(&buffer.samples);
        AnalysisSummary {
            sample_rate: buffer.sample_rate,
            tempo_bpm: TempoEstimator::new().estimate(&beats),
            duration_seconds: buffer.duration_seconds(),
            beats,
        }
    }

    /// Positive-only spectral flux per frame, or `None` when cancelled.
    pub fn spectral_flux(
        &self,
        samples: &[f32],
        is_cancelled: impl Fn() -> bool,
    ) -> Option<Vec<f32>> {
        let frame_size = self.config.frame_size;
        let hop_size = self.config.hop_size;
        if frame_size < 2 || hop_size == 0 || samples.len() < frame_size {
            return Some(Vec::new());
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(frame_size);
        let mut input = plan.make_input_vec();
        let mut spectrum = plan.make_output_vec();
        let mut scratch = plan.make_scratch_vec();
        let window: Vec<f32> = (0..frame_size).map(|i| hann_value(i, frame_size)).collect();
        let mut previous = vec![0.0_f32; spectrum.len()];

        let frame_count = (samples.len() - frame_size) / hop_size + 1;
        let mut flux = Vec::with_capacity(frame_count);

        for index in 0..frame_count {
            if is_cancelled() {
                return None;
            }

            let start = index * hop_size;
            let frame = &samples[start..start + frame_size];
            for (slot, (sample, weight)) in input.iter_mut().zip(frame.iter().zip(&window)) {
                *slot = if sample.is_finite() { sample * weight } else { 0.0 };
            }

            if let Err(err) = plan.process_with_scratch(&mut input, &mut spectrum, &mut scratch) {
                tracing::warn!("fft failed at frame {index}: {err}");
                return Some(Vec::new());
            }

            let mut value = 0.0_f32;
            for (bin, prev) in spectrum.iter().zip(previous.iter_mut()) {
                let magnitude = bin.norm();
                let rise = magnitude - *prev;
                if rise > 0.0 {
                    value += rise;
                }
                *prev = magnitude;
            }
            flux.push(value);
        }

        Some(flux)
    }

    fn run(&self, samples: &[f32], is_cancelled: impl Fn() -> bool) -> Option<Vec<f64>> {
        if self.config.sample_rate == 0 {
            return Some(Vec::new());
        }

        let flux = self.spectral_flux(samples, is_cancelled)?;
        if flux.is_empty() {
            return Some(Vec::new());
        }

        let threshold = adaptive_threshold(&flux, self.config.threshold_sensitivity);
        let sample_rate = f64::from(self.config.sample_rate);
        let hop_size = self.config.hop_size;
        let beats: Vec<f64> = flux
            .iter()
            .enumerate()
            .filter(|(_, value)| **value > threshold)
            .map(|(index, _)| (index * hop_size) as f64 / sample_rate)
            .collect();

        tracing::debug!(
            frames = flux.len(),
            threshold,
            beats = beats.len(),
            "spectral flux sweep complete"
        );

        Some(beats)
    }
}

/// `mean + sensitivity * stddev` computed in a single pass.
fn adaptive_threshold(flux: &[f32], sensitivity: f32) -> f32 {
    let (sum, sum_sq) = flux.iter().fold((0.0_f64, 0.0_f64), |(sum, sum_sq), value| {
        let value = f64::from(*value);
        (sum + value, sum_sq + value * value)
    });
    let count = flux.len().max(1) as f64;
    let mean = sum / count;
    let variance = (sum_sq / count - mean * mean).max(0.0);
    (mean + f64::from(sensitivity) * variance.sqrt()) as f32
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 44_100;

    fn click_track(onsets: &[f64], length_seconds: f64) -> Vec<f32> {
        let len = (length_seconds * f64::from(RATE)) as usize;
        let mut samples = vec![0.0_f32; len];
        for onset in onsets {
            let start = (onset * f64::from(RATE)) as usize;
            for i in 0..441 {
                if let Some(slot) = samples.get_mut(start + i) {
                    let t = i as f32 / RATE as f32;
                    *slot = (2.0 * PI * 1_000.0 * t).sin();
                }
            }
        }
        samples
    }

    fn assert_well_formed(beats: &[f64], samples: usize) {
        let duration = samples as f64 / f64::from(RATE);
        for pair in beats.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        for beat in beats {
            assert!(*beat >= 0.0);
            assert!(*beat <= duration);
        }
    }

    #[test]
    fn silence_yields_no_beats() {
        let detector = BeatDetector::with_sample_rate(RATE);
        assert!(detector.detect(&vec![0.0; 44_100]).is_empty());
        assert!(detector.detect(&[]).is_empty());
    }

    #[test]
    fn short_buffers_yield_no_beats() {
        let detector = BeatDetector::with_sample_rate(RATE);
        assert!(detector.detect(&[1.0; DEFAULT_FRAME_SIZE - 1]).is_empty());
    }

    #[test]
    fn constant_tone_yields_few_beats() {
        let detector = BeatDetector::with_sample_rate(RATE);
        let samples: Vec<f32> = (0..RATE as usize * 2)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / RATE as f32).sin() * 0.5)
            .collect();
        let beats = detector.detect(&samples);
        assert!(beats.len() <= 3, "got {} beats", beats.len());
        assert_well_formed(&beats, samples.len());
    }

    #[test]
    fn detects_clicks_near_their_onsets() {
        let onsets = [0.25, 0.75, 1.25, 1.75];
        let samples = click_track(&onsets, 2.2);
        let detector = BeatDetector::with_sample_rate(RATE);
        let beats = detector.detect(&samples);

        assert!(!beats.is_empty());
        assert_well_formed(&beats, samples.len());

        let frame_seconds = DEFAULT_FRAME_SIZE as f64 / f64::from(RATE);
        for beat in &beats {
            assert!(
                onsets
                    .iter()
                    .any(|onset| *beat >= onset - frame_seconds && *beat <= onset + 0.01),
                "beat {beat} is not near any onset"
            );
        }
        for onset in onsets {
            assert!(beats
                .iter()
                .any(|beat| *beat >= onset - frame_seconds && *beat <= onset + 0.01));
        }
    }

    #[test]
    fn non_finite_samples_are_treated_as_silence() {
        let detector = BeatDetector::with_sample_rate(RATE);
        let samples = vec![f32::NAN; 8_192];
        assert!(detector.detect(&samples).is_empty());
    }

    #[test]
    fn cancelled_detection_returns_empty() {
        let samples = click_track(&[0.25, 0.75], 1.0);
        let detector = BeatDetector::with_sample_rate(RATE);
        let token = CancellationToken::new();
        token.cancel();
        assert!(detector.detect_cancellable(&samples, &token).is_empty());
    }

    #[test]
    fn threshold_is_mean_plus_half_stddev() {
        let threshold = adaptive_threshold(&[1.0, 3.0], 0.5);
        assert!((threshold - 2.5).abs() < 1e-6);
        assert_eq!(adaptive_threshold(&[0.0; 4], 0.5), 0.0);
    }

    #[test]
    fn analyze_reports_duration_and_bounded_tempo() {
        let samples = click_track(&[0.25, 0.75, 1.25, 1.75], 2.2);
        let summary = BeatDetector::default().analyze(&PcmBuffer::new(samples, RATE));
        assert_eq!(summary.sample_rate, RATE);
        assert!((summary.duration_seconds - 2.2).abs() < 1e-3);
        assert!((60.0..=200.0).contains(&summary.tempo_bpm));
    }

    #[tokio::test]
    async fn async_detection_matches_sync_result() {
        let samples = click_track(&[0.25, 0.75, 1.25], 1.5);
        let detector = BeatDetector::with_sample_rate(RATE);
        let expected = detector.detect(&samples);

        let beats = detector
            .detect_async(PcmBuffer::new(samples, RATE), CancellationToken::new())
            .await;
        assert_eq!(beats, expected);
    }

    #[tokio::test]
    async fn async_detection_honours_cancellation() {
        let samples = click_track(&[0.25, 0.75, 1.25], 1.5);
        let token = CancellationToken::new();
        token.cancel();

        let beats = BeatDetector::with_sample_rate(RATE)
            .detect_async(PcmBuffer::new(samples, RATE), token)
            .await;
        assert!(beats.is_empty());
    }
}
