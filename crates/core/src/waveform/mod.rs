use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

/// Duty cycle used when the caller has no hardware constraint.
pub const DEFAULT_DUTY_CYCLE: f64 = 0.5;
/// Torches cannot switch cleanly at high rates, so their on-phase is
/// narrowed above [`TORCH_NARROW_DUTY_ABOVE`].
pub const TORCH_NARROW_DUTY_CYCLE: f64 = 0.3;
pub const TORCH_NARROW_DUTY_ABOVE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    Square,
    Sine,
    Triangle,
}

impl Waveform {
    /// Square pulses switch hard; the others are continuous.
    pub fn is_hard(self) -> bool {
        matches!(self, Self::Square)
    }
}

/// Instantaneous intensity in `[0, 1]` at `time` seconds.
///
/// Non-finite or non-positive frequencies produce darkness rather than a
/// steady light.
pub fn intensity(
    waveform: Waveform,
    time: f64,
    frequency: f64,
    base_intensity: f64,
    duty_cycle: f64,
) -> f64 {
    if !frequency.is_finite() || frequency <= 0.0 || !time.is_finite() {
        return 0.0;
    }

    let base = clamp_unit(base_intensity);
    let period = 1.0 / frequency;
    let phase = (time.rem_euclid(period) / period).clamp(0.0, 1.0);

    let value = match waveform {
        Waveform::Square => {
            let duty = if duty_cycle.is_finite() {
                duty_cycle.clamp(0.0, 1.0)
            } else {
                DEFAULT_DUTY_CYCLE
            };
            if phase < duty {
                base
            } else {
                0.0
            }
        }
        Waveform::Sine => base * (1.0 + (TAU * phase).sin()) * 0.5,
        Waveform::Triangle => {
            let ramp = if phase < 0.5 {
                phase * 2.0
            } else {
                (1.0 - phase) * 2.0
            };
            base * ramp
        }
    };

    clamp_unit(value)
}

/// [`intensity`] attenuated by `1 - fade_progress`, for fading out on signal
/// loss.
pub fn intensity_with_fade(
    waveform: Waveform,
    time: f64,
    frequency: f64,
    base_intensity: f64,
    duty_cycle: f64,
    fade_progress: f64,
) -> f64 {
    let fade = if fade_progress.is_finite() {
        fade_progress.clamp(0.0, 1.0)
    } else {
        1.0
    };
    clamp_unit(intensity(waveform, time, frequency, base_intensity, duty_cycle) * (1.0 - fade))
}

pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Offline sampling of a waveform at a fixed rate, for previews and tests.
///
/// Every call to [`WaveformSamples::iter`] starts again from `t = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformSamples {
    pub waveform: Waveform,
    pub frequency: f64,
    pub base_intensity: f64,
    pub duty_cycle: f64,
    pub sample_rate: f64,
    pub duration: f64,
}

impl WaveformSamples {
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: f64, duration: f64) -> Self {
        Self {
            waveform,
            frequency,
            base_intensity: 1.0,
            duty_cycle: DEFAULT_DUTY_CYCLE,
            sample_rate,
            duration,
        }
    }

    pub fn with_base_intensity(mut self, base_intensity: f64) -> Self {
        self.base_intensity = base_intensity;
        self
    }

    pub fn with_duty_cycle(mut self, duty_cycle: f64) -> Self {
        self.duty_cycle = duty_cycle;
        self
    }

    /// Number of samples covering `[0, duration)`.
    pub fn len(&self) -> usize {
        if !self.sample_rate.is_finite()
            || self.sample_rate <= 0.0
            || !self.duration.is_finite()
            || self.duration <= 0.0
        {
            return 0;
        }
        (self.duration * self.sample_rate).ceil() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> WaveformSampleIter {
        WaveformSampleIter {
            samples: *self,
            index: 0,
            len: self.len(),
        }
    }
}

impl<'a> IntoIterator for &'a WaveformSamples {
    type Item = f64;
    type IntoIter = WaveformSampleIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct WaveformSampleIter {
    samples: WaveformSamples,
    index: usize,
    len: usize,
}

impl Iterator for WaveformSampleIter {
    type Item = f64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.len {
            return None;
        }
        let time = self.index as f64 / self.samples.sample_rate;
        self.index += 1;
        Some(intensity(
            self.samples.waveform,
            time,
            self.samples.frequency,
            self.samples.base_intensity,
            self.samples.duty_cycle,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for WaveformSampleIter {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightSourceKind {
    Torch,
    Screen,
}

/// What the light hardware can do. Supplied by the platform layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightSourceCapability {
    pub kind: LightSourceKind,
    pub max_frequency: f64,
}

impl LightSourceCapability {
    pub fn torch(max_frequency: f64) -> Self {
        Self {
            kind: LightSourceKind::Torch,
            max_frequency,
        }
    }

    pub fn screen(max_frequency: f64) -> Self {
        Self {
            kind: LightSourceKind::Screen,
            max_frequency,
        }
    }

    /// Square-wave duty cycle to use at `frequency` on this source.
    pub fn duty_cycle_for(&self, frequency: f64) -> f64 {
        match self.kind {
            LightSourceKind::Torch if frequency > TORCH_NARROW_DUTY_ABOVE => {
                TORCH_NARROW_DUTY_CYCLE
            }
            _ => DEFAULT_DUTY_CYCLE,
        }
    }
}

impl Default for LightSourceCapability {
    fn default() -> Self {
        Self::screen(60.0)
    }
}
