//! Edit journal - what one edit-target call changed
//!
//! Every write made through an [`crate::edit::EditContext`] is recorded with
//! the value it replaced in the target layer. The journal of a committed
//! call is exactly the diff of the target layer.

use serde::Serialize;
use std::fmt;

use crate::layer::LayerId;
use crate::path::NodePath;
use crate::value::Value;

/// A single recorded edit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edit {
    /// Node the edit applies to
    pub path: NodePath,
    /// The operation
    pub op: EditOp,
}

/// Edit operations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOp {
    /// Attribute authored in the target layer
    SetAttribute {
        name: String,
        /// Target layer's previous opinion, if any
        previous: Option<Value>,
        value: Value,
    },
    /// Target layer's opinion removed
    ClearAttribute { name: String, previous: Value },
    /// Node defined with a type name
    DefineNode { kind: String },
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            EditOp::SetAttribute {
                name,
                previous: Some(previous),
                value,
            } => write!(f, "{}.{}: {} -> {}", self.path, name, previous, value),
            EditOp::SetAttribute {
                name,
                previous: None,
                value,
            } => write!(f, "{}.{} = {}", self.path, name, value),
            EditOp::ClearAttribute { name, previous } => {
                write!(f, "{}.{}: {} cleared", self.path, name, previous)
            }
            EditOp::DefineNode { kind } => write!(f, "{} defined as {}", self.path, kind),
        }
    }
}

/// Ordered edits committed to one layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditLog {
    /// The layer that received every edit
    pub target: LayerId,
    /// Edits in the order they were made
    pub edits: Vec<Edit>,
}

impl EditLog {
    /// Create an empty log for a target layer
    pub fn new(target: LayerId) -> Self {
        Self {
            target,
            edits: Vec::new(),
        }
    }

    /// Append an edit
    pub fn push(&mut self, path: NodePath, op: EditOp) {
        self.edits.push(Edit { path, op });
    }

    /// Append all edits of another log for the same target
    pub fn extend(&mut self, other: EditLog) {
        debug_assert_eq!(self.target, other.target);
        self.edits.extend(other.edits);
    }

    /// Check if nothing was changed
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Number of edits
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Iterate edits
    pub fn iter(&self) -> impl Iterator<Item = &Edit> {
        self.edits.iter()
    }

    /// Number of attribute writes to a given attribute name
    pub fn count_sets(&self, attribute: &str) -> usize {
        self.edits
            .iter()
            .filter(|e| matches!(&e.op, EditOp::SetAttribute { name, .. } if name == attribute))
            .count()
    }
}
