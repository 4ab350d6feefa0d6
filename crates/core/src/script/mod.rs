use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    error::VibrationParameter,
    mapping::{ABSOLUTE_MAX_FREQUENCY, ABSOLUTE_MIN_FREQUENCY},
    mode::EntrainmentMode,
    waveform::{clamp_unit, Waveform},
    EntrainError, Result,
};

/// Deterministic script identifier (16 hex digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptId(String);

impl ScriptId {
    /// FNV-1a digest over the values that identify a generated script.
    pub fn derive(
        track_id: Option<&str>,
        mode: EntrainmentMode,
        channel: ScriptChannel,
        created_at_ms: u64,
    ) -> Self {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;

        let mut hash = OFFSET;
        let mut feed = |bytes: &[u8]| {
            for byte in bytes {
                hash ^= u64::from(*byte);
                hash = hash.wrapping_mul(PRIME);
            }
        };
        feed(track_id.unwrap_or("").as_bytes());
        feed(&[0xff]);
        feed(mode.name().as_bytes());
        feed(&[channel as u8]);
        feed(&created_at_ms.to_le_bytes());

        Self(format!("{hash:016x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptChannel {
    Light,
    Vibration,
}

/// How a light script is meant to be played back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptRendering {
    /// Walk the event list.
    Timeline,
    /// The event list holds a single full-duration span; intensity is derived
    /// from live audio at playback time.
    AudioReactive,
}

/// RGB colour for screen rendering, each channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayColor {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl DisplayColor {
    pub fn new(red: f64, green: f64, blue: f64) -> Self {
        Self {
            red: clamp_unit(red),
            green: clamp_unit(green),
            blue: clamp_unit(blue),
        }
    }
}

/// Values shared by both script kinds, supplied by the generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptHeader {
    pub track_id: Option<String>,
    pub mode: EntrainmentMode,
    pub target_frequency: f64,
    pub multiplier: f64,
    pub created_at_ms: u64,
}

fn clamp_time(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

fn sort_by_timestamp<T>(events: &mut [T], timestamp: impl Fn(&T) -> f64) {
    events.sort_by(|a, b| {
        timestamp(a)
            .partial_cmp(&timestamp(b))
            .unwrap_or(Ordering::Equal)
    });
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightEvent {
    timestamp: f64,
    intensity: f64,
    duration: f64,
    waveform: Waveform,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<DisplayColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency: Option<f64>,
}

impl LightEvent {
    /// Never fails; out-of-range values are clamped.
    pub fn new(timestamp: f64, intensity: f64, duration: f64, waveform: Waveform) -> Self {
        Self {
            timestamp: clamp_time(timestamp),
            intensity: clamp_unit(intensity),
            duration: clamp_time(duration),
            waveform,
            color: None,
            frequency: None,
        }
    }

    pub fn with_color(mut self, color: DisplayColor) -> Self {
        self.color = Some(color);
        self
    }

    /// Per-event frequency; unusable values are dropped and the rest clamped
    /// into the absolute safe range.
    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = if frequency.is_finite() && frequency > 0.0 {
            Some(frequency.clamp(ABSOLUTE_MIN_FREQUENCY, ABSOLUTE_MAX_FREQUENCY))
        } else {
            None
        };
        self
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn end(&self) -> f64 {
        self.timestamp + self.duration
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn color(&self) -> Option<DisplayColor> {
        self.color
    }

    pub fn frequency(&self) -> Option<f64> {
        self.frequency
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightScript {
    id: ScriptId,
    #[serde(flatten)]
    header: ScriptHeader,
    rendering: ScriptRendering,
    events: Vec<LightEvent>,
}

impl LightScript {
    /// Builds a light script, clamping the header into usable values: a
    /// missing target falls back to the mode default and the multiplier is
    /// at least 1.
    pub fn new(
        mut header: ScriptHeader,
        rendering: ScriptRendering,
        mut events: Vec<LightEvent>,
    ) -> Self {
        if !header.target_frequency.is_finite() || header.target_frequency <= 0.0 {
            header.target_frequency = header.mode.default_frequency();
        }
        header.target_frequency = header
            .target_frequency
            .clamp(ABSOLUTE_MIN_FREQUENCY, ABSOLUTE_MAX_FREQUENCY);
        if !header.multiplier.is_finite() || header.multiplier < 1.0 {
            header.multiplier = 1.0;
        }
        sort_by_timestamp(&mut events, LightEvent::timestamp);

        let id = ScriptId::derive(
            header.track_id.as_deref(),
            header.mode,
            ScriptChannel::Light,
            header.created_at_ms,
        );
        Self {
            id,
            header,
            rendering,
            events,
        }
    }

    pub fn id(&self) -> &ScriptId {
        &self.id
    }

    pub fn track_id(&self) -> Option<&str> {
        self.header.track_id.as_deref()
    }

    pub fn mode(&self) -> EntrainmentMode {
        self.header.mode
    }

    pub fn target_frequency(&self) -> f64 {
        self.header.target_frequency
    }

    pub fn multiplier(&self) -> f64 {
        self.header.multiplier
    }

    pub fn created_at_ms(&self) -> u64 {
        self.header.created_at_ms
    }

    pub fn rendering(&self) -> ScriptRendering {
        self.rendering
    }

    pub fn events(&self) -> &[LightEvent] {
        &self.events
    }

    /// End of the last event, or zero for an empty script.
    pub fn total_duration(&self) -> f64 {
        self.events.last().map(LightEvent::end).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VibrationEvent {
    timestamp: f64,
    intensity: f64,
    duration: f64,
    waveform: Waveform,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency: Option<f64>,
}

impl VibrationEvent {
    pub fn new(timestamp: f64, intensity: f64, duration: f64, waveform: Waveform) -> Self {
        Self {
            timestamp: clamp_time(timestamp),
            intensity: clamp_unit(intensity),
            duration: clamp_time(duration),
            waveform,
            frequency: None,
        }
    }

    /// Per-event frequency. Stored as given and checked when the script is
    /// built.
    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn end(&self) -> f64 {
        self.timestamp + self.duration
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn frequency(&self) -> Option<f64> {
        self.frequency
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VibrationScript {
    id: ScriptId,
    #[serde(flatten)]
    header: ScriptHeader,
    events: Vec<VibrationEvent>,
}

impl VibrationScript {
    /// Validates and builds a vibration script. Accepted values are kept
    /// exactly as given.
    pub fn new(header: ScriptHeader, mut events: Vec<VibrationEvent>) -> Result<Self> {
        ensure_positive(VibrationParameter::TargetFrequency, header.target_frequency)?;
        ensure_positive(VibrationParameter::Multiplier, header.multiplier)?;
        for event in &events {
            if let Some(frequency) = event.frequency {
                ensure_positive(VibrationParameter::EventFrequency, frequency)?;
            }
        }
        sort_by_timestamp(&mut events, VibrationEvent::timestamp);

        let id = ScriptId::derive(
            header.track_id.as_deref(),
            header.mode,
            ScriptChannel::Vibration,
            header.created_at_ms,
        );
        Ok(Self { id, header, events })
    }

    pub fn id(&self) -> &ScriptId {
        &self.id
    }

    pub fn track_id(&self) -> Option<&str> {
        self.header.track_id.as_deref()
    }

    pub fn mode(&self) -> EntrainmentMode {
        self.header.mode
    }

    pub fn target_frequency(&self) -> f64 {
        self.header.target_frequency
    }

    pub fn multiplier(&self) -> f64 {
        self.header.multiplier
    }

    pub fn created_at_ms(&self) -> u64 {
        self.header.created_at_ms
    }

    pub fn events(&self) -> &[VibrationEvent] {
        &self.events
    }

    pub fn total_duration(&self) -> f64 {
        self.events.last().map(VibrationEvent::end).unwrap_or(0.0)
    }
}

fn ensure_positive(parameter: VibrationParameter, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EntrainError::InvalidVibrationParameter { parameter, value })
    }
}
