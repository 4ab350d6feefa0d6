use std::fmt;

use serde::{Deserialize, Serialize};

/// Result alias that carries the custom [`EntrainError`] type.
pub type Result<T> = std::result::Result<T, EntrainError>;

/// Common error type for the core crate.
///
/// Beat detection, tempo estimation, frequency mapping and light script
/// generation never fail; they resolve degenerate input through fallbacks.
/// Only vibration script construction, configuration loading and mode parsing
/// surface errors.
#[derive(Debug, thiserror::Error)]
pub enum EntrainError {
    /// Free-form message, mostly used by the command line front-end.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration or track files that failed to (de)serialize.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// A vibration script was built from a frequency or multiplier that is
    /// non-finite, zero or negative.
    #[error("invalid vibration {parameter}: {value}")]
    InvalidVibrationParameter {
        parameter: VibrationParameter,
        value: f64,
    },
    /// Mode name that does not match any known entrainment mode.
    #[error("unknown entrainment mode `{0}`")]
    UnknownMode(String),
}

impl EntrainError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for EntrainError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for EntrainError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

/// The vibration script value that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VibrationParameter {
    TargetFrequency,
    Multiplier,
    EventFrequency,
}

impl fmt::Display for VibrationParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TargetFrequency => "target frequency",
            Self::Multiplier => "multiplier",
            Self::EventFrequency => "event frequency",
        };
        f.write_str(name)
    }
}
