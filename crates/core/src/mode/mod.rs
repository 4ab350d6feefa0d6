use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{mapping::FrequencyBand, script::ScriptRendering, waveform::Waveform, EntrainError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrainmentMode {
    Alpha,
    Theta,
    Gamma,
    Cinematic,
    DmnShutdown,
    BeliefRewiring,
}

impl EntrainmentMode {
    pub const ALL: [EntrainmentMode; 6] = [
        Self::Alpha,
        Self::Theta,
        Self::Gamma,
        Self::Cinematic,
        Self::DmnShutdown,
        Self::BeliefRewiring,
    ];

    pub fn profile(self) -> &'static ModeProfile {
        &MODE_TABLE[self as usize]
    }

    pub fn band(self) -> FrequencyBand {
        self.profile().band
    }

    pub fn default_frequency(self) -> f64 {
        self.profile().default_frequency
    }

    pub fn uses_fixed_script(self) -> bool {
        self.profile().uses_fixed_script
    }

    pub fn name(self) -> &'static str {
        self.profile().name
    }
}

impl fmt::Display for EntrainmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntrainmentMode {
    type Err = EntrainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == wanted)
            .ok_or_else(|| EntrainError::UnknownMode(value.to_string()))
    }
}

/// How the target frequency of a mode is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyPolicy {
    /// Map the track tempo into the band with an integer multiplier.
    MappedFromTempo,
    /// Always use the default frequency with multiplier 1.
    Fixed,
}

/// Waveform and base intensity of one output channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelProfile {
    pub waveform: Waveform,
    pub intensity: f64,
}

/// One row of [`MODE_TABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModeProfile {
    pub mode: EntrainmentMode,
    pub name: &'static str,
    pub band: FrequencyBand,
    pub default_frequency: f64,
    pub ramp_start_frequency: f64,
    /// Seconds over which the frequency eases from the start to the target.
    pub ramp_duration: f64,
    pub frequency_policy: FrequencyPolicy,
    pub uses_fixed_script: bool,
    pub light_rendering: ScriptRendering,
    pub light: ChannelProfile,
    pub vibration: ChannelProfile,
}

impl ModeProfile {
    /// Smoothstep-eased frequency at `time` seconds into the session.
    pub fn ramped_frequency(&self, time: f64, target: f64) -> f64 {
        if !self.ramp_duration.is_finite() || self.ramp_duration <= 0.0 {
            return target;
        }
        let progress = (time / self.ramp_duration).clamp(0.0, 1.0);
        self.ramp_start_frequency + (target - self.ramp_start_frequency) * smoothstep(progress)
    }

    /// Whether the ramp is still in progress at `time`.
    pub fn is_ramping(&self, time: f64) -> bool {
        self.ramp_duration.is_finite() && self.ramp_duration > 0.0 && time < self.ramp_duration
    }
}

/// `3p^2 - 2p^3` for `p` in `[0, 1]`.
pub fn smoothstep(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    p * p * (3.0 - 2.0 * p)
}

/// Ordered like [`EntrainmentMode`]'s variants.
pub static MODE_TABLE: [ModeProfile; 6] = [
    ModeProfile {
        mode: EntrainmentMode::Alpha,
        name: "alpha",
        band: FrequencyBand::new(8.0, 12.0),
        default_frequency: 10.0,
        ramp_start_frequency: 14.0,
        ramp_duration: 30.0,
        frequency_policy: FrequencyPolicy::MappedFromTempo,
        uses_fixed_script: false,
        light_rendering: ScriptRendering::Timeline,
        light: ChannelProfile {
            waveform: Waveform::Sine,
            intensity: 0.5,
        },
        vibration: ChannelProfile {
            waveform: Waveform::Sine,
            intensity: 0.4,
        },
    },
    ModeProfile {
        mode: EntrainmentMode::Theta,
        name: "theta",
        band: FrequencyBand::new(4.0, 8.0),
        default_frequency: 6.0,
        ramp_start_frequency: 10.0,
        ramp_duration: 60.0,
        frequency_policy: FrequencyPolicy::MappedFromTempo,
        uses_fixed_script: false,
        light_rendering: ScriptRendering::Timeline,
        light: ChannelProfile {
            waveform: Waveform::Sine,
            intensity: 0.4,
        },
        vibration: ChannelProfile {
            waveform: Waveform::Triangle,
            intensity: 0.35,
        },
    },
    ModeProfile {
        mode: EntrainmentMode::Gamma,
        name: "gamma",
        band: FrequencyBand::new(30.0, 50.0),
        default_frequency: 40.0,
        ramp_start_frequency: 20.0,
        ramp_duration: 20.0,
        frequency_policy: FrequencyPolicy::MappedFromTempo,
        uses_fixed_script: false,
        light_rendering: ScriptRendering::Timeline,
        light: ChannelProfile {
            waveform: Waveform::Square,
            intensity: 0.8,
        },
        vibration: ChannelProfile {
            waveform: Waveform::Square,
            intensity: 0.7,
        },
    },
    ModeProfile {
        mode: EntrainmentMode::Cinematic,
        name: "cinematic",
        band: FrequencyBand::new(4.0, 12.0),
        default_frequency: 6.5,
        ramp_start_frequency: 6.5,
        ramp_duration: 0.0,
        frequency_policy: FrequencyPolicy::Fixed,
        uses_fixed_script: false,
        light_rendering: ScriptRendering::AudioReactive,
        light: ChannelProfile {
            waveform: Waveform::Sine,
            intensity: 0.6,
        },
        vibration: ChannelProfile {
            waveform: Waveform::Sine,
            intensity: 0.5,
        },
    },
    ModeProfile {
        mode: EntrainmentMode::DmnShutdown,
        name: "dmn-shutdown",
        band: FrequencyBand::new(4.0, 10.0),
        default_frequency: 6.0,
        ramp_start_frequency: 10.0,
        ramp_duration: 120.0,
        frequency_policy: FrequencyPolicy::Fixed,
        uses_fixed_script: true,
        light_rendering: ScriptRendering::Timeline,
        light: ChannelProfile {
            waveform: Waveform::Sine,
            intensity: 0.5,
        },
        vibration: ChannelProfile {
            waveform: Waveform::Sine,
            intensity: 0.45,
        },
    },
    ModeProfile {
        mode: EntrainmentMode::BeliefRewiring,
        name: "belief-rewiring",
        band: FrequencyBand::new(4.0, 40.0),
        default_frequency: 6.0,
        ramp_start_frequency: 12.0,
        ramp_duration: 90.0,
        frequency_policy: FrequencyPolicy::Fixed,
        uses_fixed_script: true,
        light_rendering: ScriptRendering::Timeline,
        light: ChannelProfile {
            waveform: Waveform::Triangle,
            intensity: 0.5,
        },
        vibration: ChannelProfile {
            waveform: Waveform::Sine,
            intensity: 0.45,
        },
    },
];
