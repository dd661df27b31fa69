//! Error types for the scene store

use std::path::PathBuf;

use thiserror::Error;

use crate::path::NodePath;
use crate::value::AttrType;

/// Coarse classification shared by every error in the twin.
///
/// Fatal classes abort the invocation before anything is saved;
/// `MalformedInput` is recovered by skipping the offending item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A required node, layer or live layer is missing, or the config is unusable
    Configuration,
    /// An attribute write disagrees with the attribute's fixed type
    TypeMismatch,
    /// An input item could not be understood
    MalformedInput,
    /// Reading, parsing or saving a layer file failed
    Persistence,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration error"),
            Self::TypeMismatch => write!(f, "type mismatch"),
            Self::MalformedInput => write!(f, "malformed input"),
            Self::Persistence => write!(f, "persistence error"),
        }
    }
}

/// Scene store errors
#[derive(Debug, Error)]
pub enum SceneError {
    /// A path string is not a valid node path
    #[error("Invalid node path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// Node does not exist in the composed tree
    #[error("Node not found: {0}")]
    NodeNotFound(NodePath),

    /// Parent of a node being defined does not exist
    #[error("Cannot define {0}: parent does not exist")]
    MissingParent(NodePath),

    /// Layer is not part of the stack
    #[error("Layer not found in stack: {0}")]
    LayerNotFound(String),

    /// Two layers in one stack share an identifier
    #[error("Layer {0} appears more than once in the stack")]
    DuplicateLayer(String),

    /// Attribute value type disagrees with the type fixed by a weaker layer
    #[error("Type mismatch on {path} {name}: defined as {expected}, got {found}")]
    TypeMismatch {
        path: NodePath,
        name: String,
        expected: AttrType,
        found: AttrType,
    },

    /// Value cannot be stored (non-finite number, integer overflow)
    #[error("Invalid value for {path} {name}: {reason}")]
    InvalidValue {
        path: NodePath,
        name: String,
        reason: &'static str,
    },

    /// Layer file could not be read
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Layer file is not valid
    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Unsupported layer file version
    #[error("Unsupported format version in {path:?}: expected {expected}, got {got}")]
    VersionMismatch {
        path: PathBuf,
        expected: u32,
        got: u32,
    },

    /// Layer could not be serialized
    #[error("Failed to serialize layer {layer}: {source}")]
    Serialize {
        layer: String,
        #[source]
        source: serde_json::Error,
    },

    /// Layer file could not be written
    #[error("Failed to save {path:?}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Layer was never loaded from (or assigned) a file
    #[error("Layer {0} has no backing file")]
    Unbacked(String),
}

impl SceneError {
    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidPath { .. } | Self::InvalidValue { .. } => ErrorClass::MalformedInput,
            Self::NodeNotFound(_)
            | Self::MissingParent(_)
            | Self::LayerNotFound(_)
            | Self::DuplicateLayer(_) => ErrorClass::Configuration,
            Self::TypeMismatch { .. } => ErrorClass::TypeMismatch,
            Self::Read { .. }
            | Self::Parse { .. }
            | Self::VersionMismatch { .. }
            | Self::Serialize { .. }
            | Self::Save { .. }
            | Self::Unbacked(_) => ErrorClass::Persistence,
        }
    }
}

/// Result type for scene operations
pub type Result<T> = std::result::Result<T, SceneError>;
