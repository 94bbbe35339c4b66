//! Runtime configuration for the mission subsystem.
//!
//! Every field has a default, so a partial JSON document (or none at all)
//! yields a usable configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::persistence::SaveFormat;

/// Default number of simultaneously active missions.
pub const DEFAULT_MAX_ACTIVE: usize = 12;

/// Default bound on table nesting for the persistor and script conversions.
pub const DEFAULT_PERSIST_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Capacity of the active-mission table.
    pub max_active: usize,
    /// Maximum table nesting walked when persisting script state.
    pub persist_depth_limit: usize,
    /// Template catalog document.
    pub catalog_path: PathBuf,
    /// Planets, systems, factions and ship classes.
    pub universe_path: PathBuf,
    /// Directory holding `<script>.lua` mission sources.
    pub script_dir: PathBuf,
    /// Encoding used for the mission section of a save.
    pub save_format: SaveFormat,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            max_active: DEFAULT_MAX_ACTIVE,
            persist_depth_limit: DEFAULT_PERSIST_DEPTH,
            catalog_path: PathBuf::from("data/missions.json"),
            universe_path: PathBuf::from("data/universe.json"),
            script_dir: PathBuf::from("data/missions"),
            save_format: SaveFormat::Json,
        }
    }
}

impl MissionConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: MissionConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_active == 0 {
            return Err(ConfigError::Invalid("max_active must be at least 1".into()));
        }
        if self.persist_depth_limit == 0 {
            return Err(ConfigError::Invalid(
                "persist_depth_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
