use serde::{Deserialize, Serialize};

use crate::{
    mode::{smoothstep, EntrainmentMode},
    script::DisplayColor,
    waveform::Waveform,
};

pub const DEFAULT_RANDOM_SEED: u64 = 0x2545_f491_4f6c_dd1d;
pub const DEFAULT_RANDOM_INTERVAL: f64 = 0.1;
pub const DEFAULT_LIGHT_STEP: f64 = 1.0;
pub const DEFAULT_VIBRATION_STEP: f64 = 0.25;
/// Smallest accepted random interval or sub-event step, in seconds.
pub const MIN_STEP: f64 = 0.001;

/// Guards floor/ceil against representation error at step boundaries.
const BOUNDARY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JourneyConfig {
    pub random_seed: u64,
    /// Seconds covered by one random table entry.
    pub random_interval: f64,
    /// Length of a light sub-event in seconds.
    pub light_step: f64,
    /// Length of a vibration sub-event in seconds.
    pub vibration_step: f64,
}

impl Default for JourneyConfig {
    fn default() -> Self {
        Self {
            random_seed: DEFAULT_RANDOM_SEED,
            random_interval: DEFAULT_RANDOM_INTERVAL,
            light_step: DEFAULT_LIGHT_STEP,
            vibration_step: DEFAULT_VIBRATION_STEP,
        }
    }
}

impl JourneyConfig {
    pub(crate) fn sanitized(mut self) -> Self {
        self.random_interval = usable_step(self.random_interval, DEFAULT_RANDOM_INTERVAL);
        self.light_step = usable_step(self.light_step, DEFAULT_LIGHT_STEP);
        self.vibration_step = usable_step(self.vibration_step, DEFAULT_VIBRATION_STEP);
        self
    }
}

fn usable_step(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value >= MIN_STEP {
        value
    } else {
        fallback
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PhaseFrequency {
    Constant(f64),
    /// Smoothstep ease from `from` to `to` across the phase.
    Ramp { from: f64, to: f64 },
}

impl PhaseFrequency {
    pub fn at(&self, progress: f64) -> f64 {
        match *self {
            Self::Constant(frequency) => frequency,
            Self::Ramp { from, to } => from + (to - from) * smoothstep(progress),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum IntensityPattern {
    Constant(f64),
    /// Switches between `high` and `low` every `period` seconds.
    Alternating { high: f64, low: f64, period: f64 },
    /// Draws from the shared random table, scaled into `[min, max]`.
    Randomized { min: f64, max: f64 },
}

impl IntensityPattern {
    pub fn at(&self, elapsed: f64, table: &SynchronizedRandomTable) -> f64 {
        match *self {
            Self::Constant(value) => value,
            Self::Alternating { high, low, period } => {
                if period <= 0.0 {
                    return high;
                }
                let slot = (elapsed / period + BOUNDARY_EPSILON).floor() as u64;
                if slot % 2 == 0 {
                    high
                } else {
                    low
                }
            }
            Self::Randomized { min, max } => min + (max - min) * table.value_at(elapsed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Phase {
    pub name: &'static str,
    pub duration: f64,
    pub frequency: PhaseFrequency,
    pub light_waveform: Waveform,
    pub vibration_waveform: Waveform,
    pub intensity: IntensityPattern,
    pub color: Option<DisplayColor>,
}

/// Phase list of a fixed-script mode, or `None` for audio-driven modes.
pub fn journey(mode: EntrainmentMode) -> Option<&'static [Phase]> {
    match mode {
        EntrainmentMode::DmnShutdown => Some(&DMN_SHUTDOWN),
        EntrainmentMode::BeliefRewiring => Some(&BELIEF_REWIRING),
        _ => None,
    }
}

/// Sum of the declared phase durations.
pub fn journey_duration(phases: &[Phase]) -> f64 {
    phases.iter().map(|phase| phase.duration).sum()
}

/// Longest single phase across every journey.
pub fn longest_phase() -> f64 {
    DMN_SHUTDOWN
        .iter()
        .chain(BELIEF_REWIRING.iter())
        .map(|phase| phase.duration)
        .fold(0.0, f64::max)
}

/// Splits `duration` into `step`-sized `(offset, length)` slices; the last
/// slice is truncated so the slices tile the phase exactly.
pub(crate) fn slices(duration: f64, step: f64) -> impl Iterator<Item = (f64, f64)> {
    let step = step.max(MIN_STEP);
    let count = if duration > 0.0 {
        ((duration / step) - BOUNDARY_EPSILON).ceil().max(1.0) as usize
    } else {
        0
    };
    (0..count).map(move |index| {
        let offset = index as f64 * step;
        (offset, step.min(duration - offset))
    })
}

/// Precomputed pseudo-random values in `[0, 1)` at a fixed time interval.
#[derive(Debug, Clone, PartialEq)]
pub struct SynchronizedRandomTable {
    values: Vec<f64>,
    interval: f64,
}

impl SynchronizedRandomTable {
    /// Fills enough entries to cover `span` seconds. Lookups past the end
    /// wrap around.
    pub fn new(seed: u64, interval: f64, span: f64) -> Self {
        let interval = usable_step(interval, DEFAULT_RANDOM_INTERVAL);
        let span = if span.is_finite() { span.max(0.0) } else { 0.0 };
        let len = (span / interval).ceil() as usize + 1;

        let mut state = seed;
        let values = (0..len)
            .map(|_| {
                state = lcg_next(state);
                (state >> 11) as f64 / (1_u64 << 53) as f64
            })
            .collect();

        Self { values, interval }
    }

    pub fn value_at(&self, elapsed: f64) -> f64 {
        let elapsed = if elapsed.is_finite() { elapsed.max(0.0) } else { 0.0 };
        let index = (elapsed / self.interval + BOUNDARY_EPSILON).floor() as usize;
        self.values[index % self.values.len()]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }
}

/// Knuth's MMIX linear congruential step.
fn lcg_next(state: u64) -> u64 {
    state
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(1_442_695_040_888_963_407)
}

const DEEP_BLUE: DisplayColor = DisplayColor {
    red: 0.1,
    green: 0.2,
    blue: 0.6,
};
const INDIGO: DisplayColor = DisplayColor {
    red: 0.25,
    green: 0.1,
    blue: 0.5,
};
const VIOLET: DisplayColor = DisplayColor {
    red: 0.5,
    green: 0.2,
    blue: 0.7,
};
const AMBER: DisplayColor = DisplayColor {
    red: 0.9,
    green: 0.6,
    blue: 0.2,
};
const WHITE: DisplayColor = DisplayColor {
    red: 1.0,
    green: 1.0,
    blue: 1.0,
};

static DMN_SHUTDOWN: [Phase; 5] = [
    Phase {
        name: "settle",
        duration: 120.0,
        frequency: PhaseFrequency::Ramp { from: 10.0, to: 8.0 },
        light_waveform: Waveform::Sine,
        vibration_waveform: Waveform::Sine,
        intensity: IntensityPattern::Constant(0.5),
        color: Some(DEEP_BLUE),
    },
    Phase {
        name: "descent",
        duration: 180.0,
        frequency: PhaseFrequency::Ramp { from: 8.0, to: 6.0 },
        light_waveform: Waveform::Sine,
        vibration_waveform: Waveform::Sine,
        intensity: IntensityPattern::Alternating {
            high: 0.6,
            low: 0.35,
            period: 4.0,
        },
        color: Some(INDIGO),
    },
    Phase {
        name: "disruption",
        duration: 120.0,
        frequency: PhaseFrequency::Constant(6.0),
        light_waveform: Waveform::Triangle,
        vibration_waveform: Waveform::Square,
        intensity: IntensityPattern::Randomized { min: 0.2, max: 0.8 },
        color: Some(VIOLET),
    },
    Phase {
        name: "stillness",
        duration: 240.0,
        frequency: PhaseFrequency::Ramp { from: 6.0, to: 4.5 },
        light_waveform: Waveform::Sine,
        vibration_waveform: Waveform::Sine,
        intensity: IntensityPattern::Constant(0.35),
        color: Some(INDIGO),
    },
    Phase {
        name: "return",
        duration: 60.0,
        frequency: PhaseFrequency::Ramp { from: 4.5, to: 10.0 },
        light_waveform: Waveform::Sine,
        vibration_waveform: Waveform::Sine,
        intensity: IntensityPattern::Constant(0.5),
        color: Some(AMBER),
    },
];

static BELIEF_REWIRING: [Phase; 5] = [
    Phase {
        name: "induction",
        duration: 90.0,
        frequency: PhaseFrequency::Ramp { from: 12.0, to: 7.83 },
        light_waveform: Waveform::Sine,
        vibration_waveform: Waveform::Sine,
        intensity: IntensityPattern::Constant(0.5),
        color: Some(DEEP_BLUE),
    },
    Phase {
        name: "theta-gate",
        duration: 180.0,
        frequency: PhaseFrequency::Constant(6.0),
        light_waveform: Waveform::Triangle,
        vibration_waveform: Waveform::Sine,
        intensity: IntensityPattern::Alternating {
            high: 0.55,
            low: 0.3,
            period: 6.0,
        },
        color: Some(VIOLET),
    },
    Phase {
        name: "pattern-interrupt",
        duration: 90.0,
        frequency: PhaseFrequency::Constant(40.0),
        light_waveform: Waveform::Square,
        vibration_waveform: Waveform::Square,
        intensity: IntensityPattern::Randomized { min: 0.3, max: 0.9 },
        color: Some(WHITE),
    },
    Phase {
        name: "integration",
        duration: 180.0,
        frequency: PhaseFrequency::Ramp { from: 6.0, to: 10.0 },
        light_waveform: Waveform::Sine,
        vibration_waveform: Waveform::Sine,
        intensity: IntensityPattern::Constant(0.45),
        color: Some(INDIGO),
    },
    Phase {
        name: "emergence",
        duration: 60.0,
        frequency: PhaseFrequency::Ramp { from: 10.0, to: 12.0 },
        light_waveform: Waveform::Sine,
        vibration_waveform: Waveform::Sine,
        intensity: IntensityPattern::Constant(0.55),
        color: Some(AMBER),
    },
];
