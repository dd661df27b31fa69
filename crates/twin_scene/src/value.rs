//! Typed attribute values
//!
//! Values carry their type explicitly so that a layer file round-trips
//! `1.0` as a float and `1` as an integer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrType {
    Float,
    Int,
    Bool,
    String,
    Transform,
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float => write!(f, "float"),
            Self::Int => write!(f, "int"),
            Self::Bool => write!(f, "bool"),
            Self::String => write!(f, "string"),
            Self::Transform => write!(f, "transform"),
        }
    }
}

/// 4x4 transform, row-major, translation in the last row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transform(pub [[f64; 4]; 4]);

impl Transform {
    /// Identity transform
    pub fn identity() -> Self {
        Self([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Pure translation
    pub fn from_translation(translation: [f64; 3]) -> Self {
        let mut m = Self::identity();
        m.set_translation(translation);
        m
    }

    /// Translation component
    pub fn translation(&self) -> [f64; 3] {
        [self.0[3][0], self.0[3][1], self.0[3][2]]
    }

    /// Replace the translation component
    pub fn set_translation(&mut self, translation: [f64; 3]) {
        self.0[3][0] = translation[0];
        self.0[3][1] = translation[1];
        self.0[3][2] = translation[2];
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// A typed attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Float(f64),
    Int(i64),
    Bool(bool),
    String(String),
    Transform(Transform),
}

impl Value {
    /// Type of this value
    pub fn attr_type(&self) -> AttrType {
        match self {
            Self::Float(_) => AttrType::Float,
            Self::Int(_) => AttrType::Int,
            Self::Bool(_) => AttrType::Bool,
            Self::String(_) => AttrType::String,
            Self::Transform(_) => AttrType::Transform,
        }
    }

    /// Check that every number in the value is finite
    ///
    /// JSON has no NaN or infinity, so non-finite numbers cannot be saved.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Float(v) => v.is_finite(),
            Self::Transform(t) => t.0.iter().flatten().all(|v| v.is_finite()),
            Self::Int(_) | Self::Bool(_) | Self::String(_) => true,
        }
    }

    /// Try to get as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as transform
    pub fn as_transform(&self) -> Option<&Transform> {
        match self {
            Self::Transform(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{:?}", v),
            Self::Transform(t) => {
                let [x, y, z] = t.translation();
                write!(f, "transform(translate=({}, {}, {}))", x, y, z)
            }
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Transform> for Value {
    fn from(v: Transform) -> Self {
        Self::Transform(v)
    }
}
