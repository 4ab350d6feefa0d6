//! Core library for brainwave-entrainment sessions.
//!
//! The pipeline runs leaves first: [`BeatDetector`] extracts beat onsets from
//! decoded PCM, [`TempoEstimator`] folds them into a single BPM,
//! [`FrequencyMapper`] lifts that tempo into a mode's target band, and
//! [`EntrainmentEngine`] produces immutable [`LightScript`] and
//! [`VibrationScript`] timelines. The waveform functions are evaluated later,
//! at render time, by whoever walks the generated scripts.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod mapping;
pub mod mode;
pub mod script;
pub mod timeline;
pub mod waveform;

pub use analysis::{AnalysisSummary, BeatDetector, DetectorConfig, TempoEstimator};
pub use audio::{AudioTrack, PcmBuffer};
pub use config::EngineConfig;
pub use engine::{
    journey::{JourneyConfig, SynchronizedRandomTable},
    EntrainmentEngine, SessionParameters,
};
pub use error::{EntrainError, Result, VibrationParameter};
pub use mapping::{
    classify_frequency, FrequencyBand, FrequencyMapper, FrequencyMapping, FrequencySafety,
    MultiplierSearchPolicy, SafetyAdvisory,
};
pub use mode::{EntrainmentMode, ModeProfile, MODE_TABLE};
pub use script::{
    DisplayColor, LightEvent, LightScript, ScriptId, ScriptRendering, VibrationEvent,
    VibrationScript,
};
pub use timeline::{PlaybackClock, ScriptCursor, ThermalScaling};
pub use waveform::{LightSourceCapability, LightSourceKind, Waveform, WaveformSamples};
