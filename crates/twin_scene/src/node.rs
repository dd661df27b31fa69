//! Per-layer node opinions
//!
//! A layer never stores a full node, only its opinion about one: an optional
//! type name, a sparse attribute map and the children it authored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::value::Value;

/// One layer's opinion about a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Type name (e.g. `Plant`, `Zone`, `Sensor`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Attributes authored in this layer, by name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    /// Child names authored in this layer, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

impl NodeSpec {
    /// Create an empty opinion (an override)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an opinion that defines the node's type
    pub fn with_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    /// Add an attribute (builder pattern)
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Record a child name once, keeping authored order
    pub fn add_child(&mut self, name: &str) -> bool {
        if self.children.iter().any(|c| c == name) {
            return false;
        }
        self.children.push(name.to_string());
        true
    }

    /// Check if this opinion carries nothing
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.attributes.is_empty() && self.children.is_empty()
    }
}
