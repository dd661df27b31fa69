//! Error types for greenhouse control

use std::path::PathBuf;

use thiserror::Error;
use twin_scene::{ErrorClass, NodePath, SceneError};

/// Control errors
#[derive(Debug, Error)]
pub enum ControlError {
    /// Scene store failure
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// A device or zone the scene topology requires is missing
    #[error("Required node not found: {0}")]
    MissingNode(NodePath),

    /// No layer in the stack matches the live-layer fragment
    #[error("No layer matching {fragment:?} in the stack; add the live layer as the last sublayer")]
    LiveLayerNotFound { fragment: String },

    /// Zone identifier is not of the form `B<NN>-<A|B|C>`
    #[error("Invalid zone id {0:?}: use the form B01-A, B03-C")]
    InvalidZoneId(String),

    /// Zone status is not one of ok, dry, wet, shaded, stressed
    #[error("Invalid zone status {0:?}: expected ok, dry, wet, shaded or stressed")]
    InvalidStatus(String),

    /// Input document has the wrong shape
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Store already exists where a new one was requested
    #[error("Refusing to overwrite existing store at {0:?}")]
    StoreExists(PathBuf),

    /// Config file could not be read
    #[error("Failed to read config {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the config schema
    #[error("Failed to parse config {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Config values are inconsistent
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Input file could not be read
    #[error("Failed to read input {path:?}: {source}")]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input file is not valid JSON
    #[error("Failed to parse input: {0}")]
    InputParse(#[from] serde_json::Error),
}

impl ControlError {
    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Scene(e) => e.class(),
            Self::MissingNode(_)
            | Self::LiveLayerNotFound { .. }
            | Self::StoreExists(_)
            | Self::ConfigRead { .. }
            | Self::ConfigParse { .. }
            | Self::InvalidConfig(_)
            | Self::InputRead { .. } => ErrorClass::Configuration,
            Self::InvalidZoneId(_)
            | Self::InvalidStatus(_)
            | Self::MalformedInput(_)
            | Self::InputParse(_) => ErrorClass::MalformedInput,
        }
    }
}

/// Result type for control operations
pub type Result<T> = std::result::Result<T, ControlError>;
