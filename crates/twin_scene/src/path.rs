//! Node paths
//!
//! Nodes are addressed by slash-delimited absolute paths (`/World/Looks/PlantMat`).
//! The root is `/`. Paths order lexically, which keeps every subtree contiguous
//! in a sorted map.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SceneError};

/// Absolute path of a node in the scene tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodePath(String);

impl NodePath {
    /// The root path
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Parse and validate a path string
    pub fn parse(path: &str) -> Result<Self> {
        let invalid = |reason| SceneError::InvalidPath {
            path: path.to_string(),
            reason,
        };

        if path == "/" {
            return Ok(Self::root());
        }
        let rest = path.strip_prefix('/').ok_or_else(|| invalid("must start with '/'"))?;
        for segment in rest.split('/') {
            validate_segment(segment).map_err(invalid)?;
        }
        Ok(Self(path.to_string()))
    }

    /// The path as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this is the root path
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Last segment of the path (empty for the root)
    pub fn name(&self) -> &str {
        if self.is_root() {
            return "";
        }
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// Parent path, `None` for the root
    pub fn parent(&self) -> Option<NodePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Path of a direct child
    pub fn child(&self, name: &str) -> Result<NodePath> {
        validate_segment(name).map_err(|reason| SceneError::InvalidPath {
            path: format!("{}/{}", self.0.trim_end_matches('/'), name),
            reason,
        })?;
        if self.is_root() {
            Ok(Self(format!("/{}", name)))
        } else {
            Ok(Self(format!("{}/{}", self.0, name)))
        }
    }

    /// Number of segments (0 for the root)
    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0.matches('/').count()
        }
    }

    /// Check if `other` lies strictly below this path
    pub fn is_ancestor_of(&self, other: &NodePath) -> bool {
        if self.is_root() {
            return !other.is_root();
        }
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0.as_bytes()[self.0.len()] == b'/'
    }
}

fn validate_segment(segment: &str) -> std::result::Result<(), &'static str> {
    if segment.is_empty() {
        return Err("empty path segment");
    }
    if segment.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err("segment contains whitespace or '/'");
    }
    Ok(())
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodePath {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NodePath {
    type Error = SceneError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl TryFrom<&str> for NodePath {
    type Error = SceneError;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<NodePath> for String {
    fn from(path: NodePath) -> Self {
        path.0
    }
}

impl AsRef<str> for NodePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_navigate() {
        let path = NodePath::parse("/World/Environment/Greenhouse").unwrap();
        assert_eq!(path.name(), "Greenhouse");
        assert_eq!(path.depth(), 3);
        assert_eq!(path.parent().unwrap().as_str(), "/World/Environment");
        assert_eq!(
            NodePath::parse("/World").unwrap().parent(),
            Some(NodePath::root())
        );
        assert_eq!(NodePath::root().parent(), None);
        assert_eq!(path.child("Devices").unwrap().as_str(), "/World/Environment/Greenhouse/Devices");
        assert_eq!(NodePath::root().child("World").unwrap().as_str(), "/World");
    }

    #[test]
    fn test_invalid_paths() {
        assert!(NodePath::parse("World").is_err());
        assert!(NodePath::parse("/World/").is_err());
        assert!(NodePath::parse("/World//Looks").is_err());
        assert!(NodePath::parse("/Plant 01").is_err());
        assert!(NodePath::root().child("a/b").is_err());
    }

    #[test]
    fn test_ancestry() {
        let bed = NodePath::parse("/Plants/Bed_01").unwrap();
        let plant = NodePath::parse("/Plants/Bed_01/Plant_01").unwrap();
        let sibling = NodePath::parse("/Plants/Bed_010").unwrap();
        assert!(bed.is_ancestor_of(&plant));
        assert!(!bed.is_ancestor_of(&sibling));
        assert!(!bed.is_ancestor_of(&bed));
        assert!(NodePath::root().is_ancestor_of(&bed));
    }

    #[test]
    fn test_serde_validates() {
        let ok: NodePath = serde_json::from_str("\"/World\"").unwrap();
        assert_eq!(ok.as_str(), "/World");
        assert!(serde_json::from_str::<NodePath>("\"World\"").is_err());
    }
}
