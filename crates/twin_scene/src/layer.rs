//! Layers and the layer stack
//!
//! A layer is a sparse overlay of node opinions. Layers are stacked
//! weakest to strongest; the stack is the input of composition.
//!
//! Layers are freely mutable while they are being authored. Once a layer is
//! pushed into a [`LayerStack`] it is only reachable by shared reference, and
//! the only way to change it is through an edit target (see [`crate::edit`]).

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Result, SceneError};
use crate::node::NodeSpec;
use crate::path::NodePath;
use crate::value::Value;

/// Identifier of a layer within a stack
///
/// Layers loaded from disk are identified by their file path, so a
/// recognisable fragment (`live_state`) can be matched against it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    /// Create an identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the identifier contains a fragment
    pub fn contains(&self, fragment: &str) -> bool {
        self.0.contains(fragment)
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A sparse overlay of node opinions
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Unique identifier
    id: LayerId,
    /// Human-readable name
    name: String,
    /// Optional documentation string
    doc: Option<String>,
    /// Backing file, if loaded from or bound to disk
    source: Option<PathBuf>,
    /// Node opinions by path
    nodes: BTreeMap<NodePath, NodeSpec>,
    /// Whether the layer changed since load
    dirty: bool,
}

impl Layer {
    /// Create an empty in-memory layer identified by its name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: LayerId::new(name.clone()),
            name,
            doc: None,
            source: None,
            nodes: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Create an empty layer bound to a file; the file path is its identifier
    pub fn at_path(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            id: LayerId::new(path.to_string_lossy().into_owned()),
            source: Some(path),
            ..Self::new(name)
        }
    }

    pub(crate) fn from_parts(
        name: String,
        doc: Option<String>,
        path: &Path,
        nodes: BTreeMap<NodePath, NodeSpec>,
    ) -> Self {
        Self {
            id: LayerId::new(path.to_string_lossy().into_owned()),
            name,
            doc,
            source: Some(path.to_path_buf()),
            nodes,
            dirty: false,
        }
    }

    /// Get the identifier
    pub fn id(&self) -> &LayerId {
        &self.id
    }

    /// Get the name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the documentation string
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Set the documentation string
    pub fn set_doc(&mut self, doc: impl Into<String>) {
        self.doc = Some(doc.into());
        self.dirty = true;
    }

    /// Backing file
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Get this layer's opinion about a node
    pub fn node(&self, path: &NodePath) -> Option<&NodeSpec> {
        self.nodes.get(path)
    }

    /// Iterate node opinions in path order
    pub fn nodes(&self) -> impl Iterator<Item = (&NodePath, &NodeSpec)> {
        self.nodes.iter()
    }

    /// Number of node opinions
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the layer holds no opinions
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get an attribute value authored in this layer
    pub fn attribute(&self, path: &NodePath, name: &str) -> Option<&Value> {
        self.nodes.get(path)?.attributes.get(name)
    }

    /// Define a node with a type name and register it with its parent
    pub fn define_node(&mut self, path: &NodePath, kind: impl Into<String>) -> &mut NodeSpec {
        if let Some(parent) = path.parent() {
            self.nodes
                .entry(parent)
                .or_default()
                .add_child(path.name());
        }
        self.dirty = true;
        let spec = self.nodes.entry(path.clone()).or_default();
        spec.kind = Some(kind.into());
        spec
    }

    /// Get or create an opinion about a node without defining its type
    pub fn override_node(&mut self, path: &NodePath) -> &mut NodeSpec {
        self.dirty = true;
        self.nodes.entry(path.clone()).or_default()
    }

    /// Author an attribute value, returning the value it replaced
    pub fn set_attribute(
        &mut self,
        path: &NodePath,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Option<Value> {
        self.override_node(path)
            .attributes
            .insert(name.into(), value.into())
    }

    /// Remove an attribute opinion, returning the removed value
    pub fn remove_attribute(&mut self, path: &NodePath, name: &str) -> Option<Value> {
        let spec = self.nodes.get_mut(path)?;
        let removed = spec.attributes.remove(name);
        if removed.is_some() {
            self.dirty = true;
            if spec.is_empty() {
                self.nodes.remove(path);
            }
        }
        removed
    }

    /// Record a child name under a parent in this layer
    pub fn add_child(&mut self, parent: &NodePath, name: &str) -> bool {
        let added = self.nodes.entry(parent.clone()).or_default().add_child(name);
        if added {
            self.dirty = true;
        }
        added
    }

    /// Children of `parent` implied by opinions below it, in path order
    ///
    /// An opinion at `/a/b/c` implies that `/a` has a child `b` even if no
    /// layer authored `/a/b` itself.
    pub(crate) fn implicit_children(&self, parent: &NodePath) -> Vec<NodePath> {
        let prefix_len = if parent.is_root() { 1 } else { parent.as_str().len() + 1 };
        let mut children: Vec<NodePath> = Vec::new();
        for path in self
            .nodes
            .range(parent.clone()..)
            .map(|(path, _)| path)
            .take_while(|path| path.as_str().starts_with(parent.as_str()))
            .filter(|path| parent.is_ancestor_of(path))
        {
            let name = path.as_str()[prefix_len..].split('/').next().unwrap_or_default();
            if children.iter().any(|c| c.name() == name) {
                continue;
            }
            if let Ok(child) = parent.child(name) {
                children.push(child);
            }
        }
        children
    }

    /// Check if this layer has an opinion at `path` or anywhere below it
    pub(crate) fn has_opinion_within(&self, path: &NodePath) -> bool {
        self.nodes
            .range(path.clone()..)
            .map(|(p, _)| p)
            .take_while(|p| p.as_str().starts_with(path.as_str()))
            .any(|p| p == path || path.is_ancestor_of(p))
    }

    /// Check if the layer changed since it was loaded or saved
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

/// Ordered stack of layers, weakest first
#[derive(Debug, Clone, Default)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl LayerStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a stack from layers ordered weakest to strongest
    pub fn from_layers(layers: impl IntoIterator<Item = Layer>) -> Result<Self> {
        let mut stack = Self::new();
        for layer in layers {
            stack.push(layer)?;
        }
        Ok(stack)
    }

    /// Push a layer as the new strongest layer
    pub fn push(&mut self, layer: Layer) -> Result<()> {
        if self.position(layer.id()).is_some() {
            return Err(SceneError::DuplicateLayer(layer.id().to_string()));
        }
        log::debug!("Stacked layer {} at strength {}", layer.id(), self.layers.len());
        self.layers.push(layer);
        Ok(())
    }

    /// Layers from weakest to strongest
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Number of layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Get a layer by identifier
    pub fn get(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    /// Strength index of a layer (0 = weakest)
    pub fn position(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id() == id)
    }

    /// Find the strongest layer whose identifier contains `fragment`
    pub fn find_by_fragment(&self, fragment: &str) -> Option<&Layer> {
        self.layers.iter().rev().find(|l| l.id().contains(fragment))
    }

    pub(crate) fn replace(&mut self, index: usize, layer: Layer) {
        self.layers[index] = layer;
    }

    pub(crate) fn layer_mut(&mut self, index: usize) -> &mut Layer {
        &mut self.layers[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> NodePath {
        NodePath::parse(s).unwrap()
    }

    #[test]
    fn test_define_registers_child() {
        let mut layer = Layer::new("base");
        layer.define_node(&path("/World"), "Xform");
        layer.define_node(&path("/World/Looks"), "Scope");

        assert_eq!(layer.node(&NodePath::root()).unwrap().children, vec!["World"]);
        assert_eq!(layer.node(&path("/World")).unwrap().children, vec!["Looks"]);
        assert_eq!(
            layer.node(&path("/World/Looks")).unwrap().kind.as_deref(),
            Some("Scope")
        );
        assert!(layer.is_dirty());
    }

    #[test]
    fn test_remove_attribute_drops_empty_override() {
        let mut layer = Layer::new("live");
        let fan = path("/Devices/Fan_01");
        layer.set_attribute(&fan, "device:power", 0.4);
        assert_eq!(layer.remove_attribute(&fan, "device:power"), Some(Value::Float(0.4)));
        assert!(layer.node(&fan).is_none());
    }

    #[test]
    fn test_implicit_children_skip_lookalike_siblings() {
        let mut layer = Layer::new("base");
        layer.override_node(&path("/Plants/Bed_01/Plant_01"));
        layer.override_node(&path("/Plants/Bed_01/Zones/Zone_A"));
        layer.override_node(&path("/Plants/Bed_01-extra"));
        layer.override_node(&path("/Plants/Bed_010/Plant_10"));

        let bed = path("/Plants/Bed_01");
        let children: Vec<String> = layer
            .implicit_children(&bed)
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(children, vec!["/Plants/Bed_01/Plant_01", "/Plants/Bed_01/Zones"]);
    }

    #[test]
    fn test_stack_order_and_lookup() {
        let stack = LayerStack::from_layers([
            Layer::new("greenhouse_base"),
            Layer::new("greenhouse_looks"),
            Layer::new("live_state"),
        ])
        .unwrap();

        assert_eq!(stack.len(), 3);
        assert_eq!(stack.position(&LayerId::new("live_state")), Some(2));
        assert_eq!(stack.find_by_fragment("live").unwrap().name(), "live_state");
        assert!(stack.find_by_fragment("missing").is_none());
    }

    #[test]
    fn test_duplicate_layer_rejected() {
        let result = LayerStack::from_layers([Layer::new("a"), Layer::new("a")]);
        assert!(matches!(result, Err(SceneError::DuplicateLayer(_))));
    }
}
