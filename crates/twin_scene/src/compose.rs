//! Composition - the resolved view over a layer stack
//!
//! A [`SceneView`] answers every read question about the scene: does a node
//! exist, what are its children, what is the effective value of an attribute.
//! Values are resolved strongest-first with fallback through weaker layers;
//! existence and child lists are unions across the stack.
//!
//! Inside an edit target the view substitutes the staged copy of the target
//! layer, so reads observe the writes made so far.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, SceneError};
use crate::layer::{Layer, LayerId};
use crate::path::NodePath;
use crate::traverse::Descendants;
use crate::value::{AttrType, Transform, Value};

/// Read-only composed view of a layer stack
#[derive(Debug, Clone, Copy)]
pub struct SceneView<'a> {
    layers: &'a [Layer],
    staged: Option<(usize, &'a Layer)>,
}

impl<'a> SceneView<'a> {
    /// Compose layers ordered weakest to strongest
    pub fn new(layers: &'a [Layer]) -> Self {
        Self { layers, staged: None }
    }

    /// Compose with the layer at `index` replaced by `staged`
    pub(crate) fn with_staged(layers: &'a [Layer], index: usize, staged: &'a Layer) -> Self {
        Self {
            layers,
            staged: Some((index, staged)),
        }
    }

    /// Number of layers in the composition
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Layer at a strength index (0 = weakest)
    pub fn layer(&self, index: usize) -> Option<&'a Layer> {
        match self.staged {
            Some((staged_index, staged)) if staged_index == index => Some(staged),
            _ => self.layers.get(index),
        }
    }

    fn weakest_first(&self) -> impl Iterator<Item = &'a Layer> {
        let view = *self;
        (0..view.layers.len()).filter_map(move |i| view.layer(i))
    }

    fn strongest_first(&self) -> impl Iterator<Item = &'a Layer> {
        let view = *self;
        (0..view.layers.len()).rev().filter_map(move |i| view.layer(i))
    }

    /// Check if a node exists in the composed tree
    ///
    /// The root always exists. Any other node exists if some layer holds an
    /// opinion about it or about anything below it.
    pub fn exists(&self, path: &NodePath) -> bool {
        path.is_root() || self.weakest_first().any(|layer| layer.has_opinion_within(path))
    }

    /// Fail with `NodeNotFound` unless the node exists
    pub fn require(&self, path: &NodePath) -> Result<()> {
        if self.exists(path) {
            Ok(())
        } else {
            Err(SceneError::NodeNotFound(path.clone()))
        }
    }

    /// Composed type name of a node (strongest opinion wins)
    pub fn kind(&self, path: &NodePath) -> Option<&'a str> {
        self.strongest_first()
            .find_map(|layer| layer.node(path)?.kind.as_deref())
    }

    /// Effective value of an attribute
    pub fn resolve(&self, path: &NodePath, name: &str) -> Option<&'a Value> {
        self.resolve_with_source(path, name).map(|(value, _)| value)
    }

    /// Effective value of an attribute and the layer that provided it
    pub fn resolve_with_source(&self, path: &NodePath, name: &str) -> Option<(&'a Value, &'a LayerId)> {
        self.strongest_first()
            .find_map(|layer| layer.attribute(path, name).map(|value| (value, layer.id())))
    }

    /// Type of an attribute as fixed by the weakest layer defining it
    pub fn attribute_type(&self, path: &NodePath, name: &str) -> Option<AttrType> {
        self.weakest_first()
            .find_map(|layer| layer.attribute(path, name))
            .map(Value::attr_type)
    }

    /// Names of all attributes defined on a node in any layer
    pub fn attribute_names(&self, path: &NodePath) -> BTreeSet<&'a str> {
        self.weakest_first()
            .filter_map(|layer| layer.node(path))
            .flat_map(|spec| spec.attributes.keys().map(String::as_str))
            .collect()
    }

    /// Composed child list
    ///
    /// Authored child lists are merged walking weakest to strongest, keeping
    /// first appearance. Children only implied by deeper opinions follow in
    /// lexical order.
    pub fn children(&self, path: &NodePath) -> Vec<NodePath> {
        let mut children: Vec<NodePath> = Vec::new();
        for layer in self.weakest_first() {
            let Some(spec) = layer.node(path) else { continue };
            for name in &spec.children {
                if let Ok(child) = path.child(name) {
                    if !children.contains(&child) {
                        children.push(child);
                    }
                }
            }
        }

        let implicit: BTreeSet<NodePath> = self
            .weakest_first()
            .flat_map(|layer| layer.implicit_children(path))
            .filter(|child| !children.contains(child))
            .collect();
        children.extend(implicit);
        children
    }

    /// Pre-order traversal starting at (and including) `root`
    pub fn descendants(&self, root: &NodePath) -> Descendants<'a> {
        Descendants::new(*self, root.clone())
    }

    fn typed<T>(
        &self,
        path: &NodePath,
        name: &str,
        expected: AttrType,
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<Option<T>> {
        let Some(value) = self.resolve(path, name) else {
            return Ok(None);
        };
        extract(value).map(Some).ok_or_else(|| SceneError::TypeMismatch {
            path: path.clone(),
            name: name.to_string(),
            expected,
            found: value.attr_type(),
        })
    }

    /// Composed float attribute
    pub fn get_float(&self, path: &NodePath, name: &str) -> Result<Option<f64>> {
        self.typed(path, name, AttrType::Float, Value::as_float)
    }

    /// Composed integer attribute
    pub fn get_int(&self, path: &NodePath, name: &str) -> Result<Option<i64>> {
        self.typed(path, name, AttrType::Int, Value::as_int)
    }

    /// Composed boolean attribute
    pub fn get_bool(&self, path: &NodePath, name: &str) -> Result<Option<bool>> {
        self.typed(path, name, AttrType::Bool, Value::as_bool)
    }

    /// Composed string attribute
    pub fn get_string(&self, path: &NodePath, name: &str) -> Result<Option<&'a str>> {
        self.typed(path, name, AttrType::String, Value::as_str)
    }

    /// Composed transform attribute
    pub fn get_transform(&self, path: &NodePath, name: &str) -> Result<Option<Transform>> {
        self.typed(path, name, AttrType::Transform, |v| v.as_transform().copied())
    }

    /// Check that every layer agrees with the weakest definer on attribute types
    pub fn validate(&self) -> Result<()> {
        let mut fixed: BTreeMap<(&NodePath, &str), AttrType> = BTreeMap::new();
        for layer in self.weakest_first() {
            for (path, spec) in layer.nodes() {
                for (name, value) in &spec.attributes {
                    let found = value.attr_type();
                    let expected = *fixed.entry((path, name.as_str())).or_insert(found);
                    if expected != found {
                        return Err(SceneError::TypeMismatch {
                            path: path.clone(),
                            name: name.clone(),
                            expected,
                            found,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> NodePath {
        NodePath::parse(s).unwrap()
    }

    fn two_layers() -> Vec<Layer> {
        let fan = path("/Devices/Fan_01");
        let mut base = Layer::new("base");
        base.define_node(&path("/Devices"), "Scope");
        base.define_node(&fan, "Actuator")
            .attributes
            .insert("device:power".into(), Value::Float(0.0));
        base.set_attribute(&fan, "device:enabled", true);

        let mut live = Layer::new("live_state");
        live.set_attribute(&fan, "device:power", 0.4);
        vec![base, live]
    }

    #[test]
    fn test_strongest_wins_with_fallback() {
        let layers = two_layers();
        let view = SceneView::new(&layers);
        let fan = path("/Devices/Fan_01");

        assert_eq!(view.get_float(&fan, "device:power").unwrap(), Some(0.4));
        assert_eq!(view.get_bool(&fan, "device:enabled").unwrap(), Some(true));
        assert_eq!(view.get_float(&fan, "device:missing").unwrap(), None);

        let (_, source) = view.resolve_with_source(&fan, "device:power").unwrap();
        assert_eq!(source.as_str(), "live_state");
        let (_, source) = view.resolve_with_source(&fan, "device:enabled").unwrap();
        assert_eq!(source.as_str(), "base");
    }

    #[test]
    fn test_typed_getter_reports_mismatch() {
        let layers = two_layers();
        let view = SceneView::new(&layers);
        let err = view.get_int(&path("/Devices/Fan_01"), "device:power").unwrap_err();
        assert!(matches!(
            err,
            SceneError::TypeMismatch {
                expected: AttrType::Int,
                found: AttrType::Float,
                ..
            }
        ));
    }

    #[test]
    fn test_existence_is_union() {
        let mut layers = two_layers();
        layers[1].set_attribute(&path("/Extra/Deep/Node"), "x", 1.0);
        let view = SceneView::new(&layers);

        assert!(view.exists(&NodePath::root()));
        assert!(view.exists(&path("/Devices/Fan_01")));
        assert!(view.exists(&path("/Extra/Deep")));
        assert!(!view.exists(&path("/Devices/Vent_01")));
        assert!(view.require(&path("/Nowhere")).is_err());
    }

    #[test]
    fn test_child_list_union_order() {
        let mut base = Layer::new("base");
        base.define_node(&path("/Looks"), "Scope");
        base.define_node(&path("/Looks/PlantMat"), "Material");
        let mut strong = Layer::new("strong");
        strong.define_node(&path("/Looks/UnhealthyPlantMat"), "Material");
        strong.define_node(&path("/Looks/PlantMat"), "Material");
        strong.override_node(&path("/Looks/Zzz/Implicit"));
        strong.override_node(&path("/Looks/Aaa/Implicit"));
        let layers = vec![base, strong];
        let view = SceneView::new(&layers);

        let children = view.children(&path("/Looks"));
        let names: Vec<&str> = children.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["PlantMat", "UnhealthyPlantMat", "Aaa", "Zzz"]);
    }

    #[test]
    fn test_attribute_type_fixed_by_weakest() {
        let mut layers = two_layers();
        layers[1].set_attribute(&path("/Devices/Fan_01"), "device:power", 1_i64);
        let view = SceneView::new(&layers);

        assert_eq!(
            view.attribute_type(&path("/Devices/Fan_01"), "device:power"),
            Some(AttrType::Float)
        );
        assert!(matches!(view.validate(), Err(SceneError::TypeMismatch { .. })));
    }

    #[test]
    fn test_attribute_names_and_kind() {
        let layers = two_layers();
        let view = SceneView::new(&layers);
        let fan = path("/Devices/Fan_01");

        let names: Vec<&str> = view.attribute_names(&fan).into_iter().collect();
        assert_eq!(names, vec!["device:enabled", "device:power"]);
        assert_eq!(view.kind(&fan), Some("Actuator"));
        assert!(view.validate().is_ok());
    }
}
