//! Error types for the mission subsystem.
//!
//! Only a handful of these ever reach the caller as actionable outcomes
//! (capacity exhaustion, rejected scripts). Everything per-entry or
//! per-field is logged and skipped where it happens.

use thiserror::Error;

use crate::mission::MissionId;

/// Failures raised by the scripting backend.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script '{0}' not found")]
    NotFound(String),
    #[error("failed to load script '{script}': {message}")]
    Load { script: String, message: String },
    #[error("entry point '{entry}' is not defined")]
    MissingEntry { entry: String },
    #[error("error running '{entry}': {message}")]
    Runtime { entry: String, message: String },
    #[error("mission environment already closed")]
    Closed,
}

/// Whole-file catalog failures. Per-entry problems never produce these.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed catalog: {0}")]
    Malformed(String),
}

/// Outcomes of lifecycle operations the caller is expected to act on.
#[derive(Debug, Error)]
pub enum MissionError {
    #[error("mission template '{0}' not found")]
    UnknownTemplate(String),
    #[error("you have too many active missions")]
    TooManyActive,
    #[error("mission '{0}' is unique and already active or completed")]
    AlreadyActive(String),
    #[error("mission '{0}' ended itself before becoming active")]
    Rejected(String),
    #[error("mission '{0}' was not accepted by its script")]
    Declined(String),
    #[error("no active mission in slot {0}")]
    EmptySlot(usize),
    #[error("no active mission with id {0}")]
    UnknownMission(MissionId),
    #[error(transparent)]
    Script(#[from] ScriptError),
}

/// Save/load failures of the mission section.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),
    #[error("save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
