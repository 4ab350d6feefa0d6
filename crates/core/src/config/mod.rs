use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    analysis::DetectorConfig, engine::journey::JourneyConfig, mapping::MultiplierSearchPolicy,
    Result,
};

/// Top-level configuration structure for the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub detector: DetectorConfig,
    pub mapping: MultiplierSearchPolicy,
    pub journey: JourneyConfig,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON configuration file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
