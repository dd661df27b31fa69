//! Edit targets
//!
//! All writes to a [`Stage`] go through [`Stage::with_edit_target`]. The
//! closure receives an [`EditContext`] whose writes land on a staged copy of
//! the target layer while its reads see the whole composed stack, including
//! the staged writes. The copy replaces the target layer only when the
//! closure returns `Ok`; on `Err` nothing is applied.

use crate::compose::SceneView;
use crate::error::{Result, SceneError};
use crate::journal::{EditLog, EditOp};
use crate::layer::{Layer, LayerId};
use crate::path::NodePath;
use crate::stage::Stage;
use crate::value::Value;

/// Write access to one layer, read access to the composition
pub struct EditContext<'a> {
    layers: &'a [Layer],
    index: usize,
    staged: Layer,
    log: EditLog,
}

impl<'a> EditContext<'a> {
    /// Composed view including the edits made so far
    pub fn view(&self) -> SceneView<'_> {
        SceneView::with_staged(self.layers, self.index, &self.staged)
    }

    /// The layer receiving every write
    pub fn target(&self) -> &LayerId {
        self.staged.id()
    }

    /// Edits made so far
    pub fn log(&self) -> &EditLog {
        &self.log
    }

    /// Author an attribute on an existing node
    ///
    /// The value must have the type fixed by the weakest layer defining the
    /// attribute. Returns `false` if the target layer already held the value.
    pub fn set_attribute(&mut self, path: &NodePath, name: &str, value: impl Into<Value>) -> Result<bool> {
        let value = value.into();
        let view = self.view();
        view.require(path)?;
        if !value.is_finite() {
            return Err(SceneError::InvalidValue {
                path: path.clone(),
                name: name.to_string(),
                reason: "not a finite number",
            });
        }
        if let Some(expected) = view.attribute_type(path, name) {
            let found = value.attr_type();
            if expected != found {
                return Err(SceneError::TypeMismatch {
                    path: path.clone(),
                    name: name.to_string(),
                    expected,
                    found,
                });
            }
        }

        if self.staged.attribute(path, name) == Some(&value) {
            return Ok(false);
        }
        log::debug!("{} {} = {} -> {}", path, name, value, self.staged.id());
        let previous = self.staged.set_attribute(path, name, value.clone());
        self.log.push(
            path.clone(),
            EditOp::SetAttribute {
                name: name.to_string(),
                previous,
                value,
            },
        );
        Ok(true)
    }

    /// Remove the target layer's opinion about an attribute
    ///
    /// Weaker layers' values show through afterwards.
    pub fn clear_attribute(&mut self, path: &NodePath, name: &str) -> Option<Value> {
        let previous = self.staged.remove_attribute(path, name)?;
        log::debug!("{} {} cleared in {}", path, name, self.staged.id());
        self.log.push(
            path.clone(),
            EditOp::ClearAttribute {
                name: name.to_string(),
                previous: previous.clone(),
            },
        );
        Some(previous)
    }

    /// Add `by` to an integer attribute (absent reads as 0), returning the new value
    pub fn increment_int(&mut self, path: &NodePath, name: &str, by: i64) -> Result<i64> {
        let next = self
            .view()
            .get_int(path, name)?
            .unwrap_or(0)
            .checked_add(by)
            .ok_or_else(|| SceneError::InvalidValue {
                path: path.clone(),
                name: name.to_string(),
                reason: "integer overflow",
            })?;
        self.set_attribute(path, name, next)?;
        Ok(next)
    }

    /// Define a node in the target layer
    ///
    /// The parent must already exist in the composed tree.
    pub fn define_node(&mut self, path: &NodePath, kind: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !self.view().exists(&parent) {
                return Err(SceneError::MissingParent(path.clone()));
            }
        }
        if self.staged.node(path).and_then(|spec| spec.kind.as_deref()) == Some(kind) {
            return Ok(());
        }
        self.staged.define_node(path, kind);
        self.log.push(path.clone(), EditOp::DefineNode { kind: kind.to_string() });
        Ok(())
    }
}

impl Stage {
    /// Run `f` with `target` as the only writable layer
    ///
    /// Fails with `LayerNotFound` if `target` is not in the stack. Returns the
    /// closure's value with the journal of committed edits.
    pub fn with_edit_target<T, E, F>(&mut self, target: &LayerId, f: F) -> std::result::Result<(T, EditLog), E>
    where
        E: From<SceneError>,
        F: FnOnce(&mut EditContext<'_>) -> std::result::Result<T, E>,
    {
        let index = self
            .stack()
            .position(target)
            .ok_or_else(|| SceneError::LayerNotFound(target.to_string()))?;

        let layers = self.stack().layers();
        let mut ctx = EditContext {
            layers,
            index,
            staged: layers[index].clone(),
            log: EditLog::new(target.clone()),
        };

        match f(&mut ctx) {
            Ok(value) => {
                let EditContext { staged, log, .. } = ctx;
                if !log.is_empty() {
                    log::debug!("Committed {} edit(s) to {}", log.len(), target);
                    self.stack_mut().replace(index, staged);
                }
                Ok((value, log))
            }
            Err(err) => {
                log::debug!("Discarded {} staged edit(s) to {}", ctx.log.len(), target);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerStack;
    use crate::value::AttrType;

    fn path(s: &str) -> NodePath {
        NodePath::parse(s).unwrap()
    }

    fn stage() -> Stage {
        let sensor = path("/Devices/Sensor_01");
        let mut base = Layer::new("base");
        base.define_node(&path("/Devices"), "Scope");
        base.define_node(&sensor, "Sensor");
        base.set_attribute(&sensor, "sensor:humidityPct", 50.0);
        base.set_attribute(&sensor, "state:tick", 0_i64);
        Stage::new(LayerStack::from_layers([base, Layer::new("live_state")]).unwrap()).unwrap()
    }

    #[test]
    fn test_reads_see_staged_writes() {
        let mut stage = stage();
        let live = LayerId::new("live_state");
        let sensor = path("/Devices/Sensor_01");

        let (seen, log) = stage
            .with_edit_target(&live, |ctx| -> Result<f64> {
                ctx.set_attribute(&sensor, "sensor:humidityPct", 85.0)?;
                Ok(ctx.view().get_float(&sensor, "sensor:humidityPct")?.unwrap_or_default())
            })
            .unwrap();

        assert_eq!(seen, 85.0);
        assert_eq!(log.len(), 1);
        assert_eq!(
            stage.stack().get(&live).unwrap().attribute(&sensor, "sensor:humidityPct"),
            Some(&Value::Float(85.0))
        );
        assert_eq!(
            stage.stack().layers()[0].attribute(&sensor, "sensor:humidityPct"),
            Some(&Value::Float(50.0))
        );
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let mut stage = stage();
        let result = stage.with_edit_target(&LayerId::new("nope"), |_| -> Result<()> { Ok(()) });
        assert!(matches!(result, Err(SceneError::LayerNotFound(_))));
    }

    #[test]
    fn test_type_mismatch_discards_everything() {
        let mut stage = stage();
        let live = LayerId::new("live_state");
        let sensor = path("/Devices/Sensor_01");

        let result = stage.with_edit_target(&live, |ctx| -> Result<()> {
            ctx.set_attribute(&sensor, "sensor:humidityPct", 90.0)?;
            ctx.set_attribute(&sensor, "state:tick", 1.5)?;
            Ok(())
        });

        assert!(matches!(
            result,
            Err(SceneError::TypeMismatch {
                expected: AttrType::Int,
                found: AttrType::Float,
                ..
            })
        ));
        assert!(stage.stack().get(&live).unwrap().is_empty());
    }

    #[test]
    fn test_non_finite_float_discards_everything() {
        let mut stage = stage();
        let live = LayerId::new("live_state");
        let sensor = path("/Devices/Sensor_01");

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = stage.with_edit_target(&live, |ctx| -> Result<()> {
                ctx.set_attribute(&sensor, "state:tick", 3_i64)?;
                ctx.set_attribute(&sensor, "sensor:humidityPct", bad)?;
                Ok(())
            });
            let err = result.unwrap_err();
            assert!(matches!(err, SceneError::InvalidValue { .. }));
            assert_eq!(err.class(), crate::error::ErrorClass::MalformedInput);
        }
        let layer = stage.stack().get(&live).unwrap();
        assert!(layer.is_empty());
        assert!(!layer.is_dirty());
    }

    #[test]
    fn test_increment_overflow_is_an_error() {
        let mut stage = stage();
        let live = LayerId::new("live_state");
        let sensor = path("/Devices/Sensor_01");
        stage
            .with_edit_target(&live, |ctx| ctx.set_attribute(&sensor, "state:tick", i64::MAX))
            .unwrap();

        let result = stage.with_edit_target(&live, |ctx| ctx.increment_int(&sensor, "state:tick", 1));
        assert!(matches!(result, Err(SceneError::InvalidValue { .. })));
        assert_eq!(
            stage.stack().get(&live).unwrap().attribute(&sensor, "state:tick"),
            Some(&Value::Int(i64::MAX))
        );
    }

    #[test]
    fn test_increment_and_clear() {
        let mut stage = stage();
        let live = LayerId::new("live_state");
        let sensor = path("/Devices/Sensor_01");

        let (tick, _) = stage
            .with_edit_target(&live, |ctx| ctx.increment_int(&sensor, "state:tick", 1))
            .unwrap();
        assert_eq!(tick, 1);

        let (cleared, log) = stage
            .with_edit_target(&live, |ctx| -> Result<Option<Value>> {
                Ok(ctx.clear_attribute(&sensor, "state:tick"))
            })
            .unwrap();
        assert_eq!(cleared, Some(Value::Int(1)));
        assert_eq!(log.len(), 1);
        assert_eq!(stage.view().get_int(&sensor, "state:tick").unwrap(), Some(0));
    }

    #[test]
    fn test_write_to_missing_node_fails() {
        let mut stage = stage();
        let live = LayerId::new("live_state");
        let result = stage.with_edit_target(&live, |ctx| {
            ctx.set_attribute(&path("/Devices/Pump_01"), "device:flow", 1.0)
        });
        assert!(matches!(result, Err(SceneError::NodeNotFound(_))));
    }

    #[test]
    fn test_define_node_requires_parent() {
        let mut stage = stage();
        let live = LayerId::new("live_state");

        let result = stage.with_edit_target(&live, |ctx| ctx.define_node(&path("/Missing/Child"), "Xform"));
        assert!(matches!(result, Err(SceneError::MissingParent(_))));

        let (_, log) = stage
            .with_edit_target(&live, |ctx| ctx.define_node(&path("/Devices/Pump_01"), "Actuator"))
            .unwrap();
        assert_eq!(log.len(), 1);
        assert!(stage
            .view()
            .children(&path("/Devices"))
            .contains(&path("/Devices/Pump_01")));
    }

    #[test]
    fn test_unchanged_write_is_not_journaled() {
        let mut stage = stage();
        let live = LayerId::new("live_state");
        let sensor = path("/Devices/Sensor_01");

        for expected in [1, 0] {
            let (_, log) = stage
                .with_edit_target(&live, |ctx| ctx.set_attribute(&sensor, "sensor:humidityPct", 70.0))
                .unwrap();
            assert_eq!(log.len(), expected);
        }
    }
}
