use std::fmt;

use serde::{Deserialize, Serialize};

/// Frequencies below this are not a meaningful stimulus.
pub const ABSOLUTE_MIN_FREQUENCY: f64 = 0.5;
/// Frequencies above this are rejected outright.
pub const ABSOLUTE_MAX_FREQUENCY: f64 = 100.0;
/// Lower edge of the photosensitive-seizure danger band.
pub const PSE_DANGER_MIN_FREQUENCY: f64 = 3.0;
/// Upper edge of the photosensitive-seizure danger band.
pub const PSE_DANGER_MAX_FREQUENCY: f64 = 30.0;
/// Default cap on multiplier search iterations.
pub const DEFAULT_MAX_SEARCH_ITERATIONS: u32 = 50;

/// Closed frequency range in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub min: f64,
    pub max: f64,
}

impl FrequencyBand {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, frequency: f64) -> bool {
        frequency >= self.min && frequency <= self.max
    }

    /// Strict interior of the band; the edges do not count as "entered".
    pub fn contains_strictly(&self, frequency: f64) -> bool {
        frequency > self.min && frequency < self.max
    }
}

impl fmt::Display for FrequencyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} Hz", self.min, self.max)
    }
}

/// Bounds the multiplier search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiplierSearchPolicy {
    pub max_iterations: u32,
}

impl Default for MultiplierSearchPolicy {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_SEARCH_ITERATIONS,
        }
    }
}

/// Outcome of a mapping: `frequency == bpm / 60 * multiplier`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyMapping {
    pub multiplier: u32,
    pub frequency: f64,
}

/// Finds the smallest multiplier that lifts `bpm / 60` strictly inside a band
/// without crossing the device ceiling.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrequencyMapper {
    policy: MultiplierSearchPolicy,
}

impl FrequencyMapper {
    pub fn new(policy: MultiplierSearchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &MultiplierSearchPolicy {
        &self.policy
    }

    /// Maps `bpm` into `band` without exceeding `max_frequency`.
    pub fn map(&self, bpm: f64, band: FrequencyBand, max_frequency: f64) -> FrequencyMapping {
        let base = bpm / 60.0;
        let multiplier = self.find_multiplier(base, band, max_frequency);
        FrequencyMapping {
            multiplier,
            frequency: base * f64::from(multiplier),
        }
    }

    /// Smallest `N >= 1` with `base * N` inside the band, or the last `N`
    /// before the band or the device ceiling would be overshot.
    pub fn find_multiplier(&self, base: f64, band: FrequencyBand, max_frequency: f64) -> u32 {
        if !base.is_finite() || base <= 0.0 {
            tracing::warn!(base, "non-positive beat frequency, using fallback multiplier");
            return fallback_multiplier(base, band);
        }

        let mut multiplier: u32 = 1;
        for _ in 0..self.policy.max_iterations {
            let frequency = base * f64::from(multiplier);
            if frequency > max_frequency {
                return multiplier.saturating_sub(1).max(1);
            }
            if band.contains_strictly(frequency) {
                return multiplier;
            }
            if frequency >= band.max {
                return multiplier.saturating_sub(1).max(1);
            }
            multiplier += 1;
        }

        tracing::warn!(
            base,
            max_iterations = self.policy.max_iterations,
            "multiplier search hit its iteration cap"
        );
        fallback_multiplier(base, band)
    }
}

fn fallback_multiplier(base: f64, band: FrequencyBand) -> u32 {
    let raw = (band.midpoint() / base).round();
    if raw.is_finite() && raw >= 1.0 {
        raw.min(f64::from(u32::MAX)) as u32
    } else {
        1
    }
}

/// Why a frequency needs the caller's attention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SafetyAdvisory {
    /// Outside `[ABSOLUTE_MIN_FREQUENCY, ABSOLUTE_MAX_FREQUENCY]`; must not be used.
    OutOfRange { frequency: f64 },
    /// Inside the photosensitive danger band; usable with a warning.
    PhotosensitiveRisk { frequency: f64 },
}

impl fmt::Display for SafetyAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { frequency } => write!(
                f,
                "{frequency} Hz is outside the supported range of {}-{} Hz",
                ABSOLUTE_MIN_FREQUENCY, ABSOLUTE_MAX_FREQUENCY
            ),
            Self::PhotosensitiveRisk { frequency } => write!(
                f,
                "{frequency} Hz lies within the photosensitive risk band of {}-{} Hz",
                PSE_DANGER_MIN_FREQUENCY, PSE_DANGER_MAX_FREQUENCY
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencySafety {
    pub is_valid: bool,
    pub is_in_danger_zone: bool,
    pub advisory: Option<SafetyAdvisory>,
}

/// Classifies `frequency` against the absolute bounds and the danger band.
pub fn classify_frequency(frequency: f64) -> FrequencySafety {
    if !frequency.is_finite()
        || frequency < ABSOLUTE_MIN_FREQUENCY
        || frequency > ABSOLUTE_MAX_FREQUENCY
    {
        return FrequencySafety {
            is_valid: false,
            is_in_danger_zone: false,
            advisory: Some(SafetyAdvisory::OutOfRange { frequency }),
        };
    }

    let danger = FrequencyBand::new(PSE_DANGER_MIN_FREQUENCY, PSE_DANGER_MAX_FREQUENCY);
    if danger.contains(frequency) {
        return FrequencySafety {
            is_valid: true,
            is_in_danger_zone: true,
            advisory: Some(SafetyAdvisory::PhotosensitiveRisk { frequency }),
        };
    }

    FrequencySafety {
        is_valid: true,
        is_in_danger_zone: false,
        advisory: None,
    }
}
