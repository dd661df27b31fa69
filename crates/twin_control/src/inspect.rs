//! Stage inspection

use std::fmt::Write;

use twin_scene::{NodePath, SceneView, Value};

use crate::error::Result;
use crate::schema;

/// One composed device attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub path: NodePath,
    pub name: String,
    pub value: Value,
    /// Layer that provided the value
    pub source: String,
}

/// Render the composed tree below `root`, indented by depth, with node types
///
/// `max_depth` limits how far below `root` the rendering goes.
pub fn render_tree(view: &SceneView<'_>, root: &NodePath, max_depth: Option<usize>) -> String {
    let base = root.depth();
    let mut out = String::new();
    for path in view.descendants(root) {
        let depth = path.depth() - base;
        if max_depth.is_some_and(|max| depth > max) {
            continue;
        }
        let name = if path.is_root() { "/" } else { path.name() };
        let _ = match view.kind(&path) {
            Some(kind) => writeln!(out, "{}{} ({})", "  ".repeat(depth), name, kind),
            None => writeln!(out, "{}{}", "  ".repeat(depth), name),
        };
    }
    out
}

/// All `sensor:*` and `device:*` attributes under the device scope
pub fn device_readings(view: &SceneView<'_>) -> Result<Vec<Reading>> {
    let devices = schema::devices_path()?;
    let mut readings = Vec::new();
    for path in view.descendants(&devices) {
        for name in view.attribute_names(&path) {
            if !(name.starts_with("sensor:") || name.starts_with("device:")) {
                continue;
            }
            if let Some((value, source)) = view.resolve_with_source(&path, name) {
                readings.push(Reading {
                    path: path.clone(),
                    name: name.to_string(),
                    value: value.clone(),
                    source: source.to_string(),
                });
            }
        }
    }
    Ok(readings)
}

/// Full inspection report: layer stack, tree and device readings
pub fn render_report(view: &SceneView<'_>, max_depth: Option<usize>) -> Result<String> {
    let mut out = String::from("Layer stack (weakest first):\n");
    for index in 0..view.layer_count() {
        if let Some(layer) = view.layer(index) {
            let _ = writeln!(out, "  [{}] {} ({} node opinion(s))", index, layer.id(), layer.len());
        }
    }

    out.push_str("\nPrim tree:\n");
    out.push_str(&render_tree(view, &NodePath::root(), max_depth));

    out.push_str("\nDevice readings:\n");
    let readings = device_readings(view)?;
    if readings.is_empty() {
        out.push_str("  (none)\n");
    }
    for reading in readings {
        let _ = writeln!(
            out,
            "  {} {} = {}  [{}]",
            reading.path.name(),
            reading.name,
            reading.value,
            reading.source
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use twin_scene::Layer;

    #[test]
    fn test_tree_and_readings() {
        let fan = schema::Device::Fan.path().unwrap();
        let mut base = Layer::new("base");
        base.define_node(&NodePath::parse("/World").unwrap(), "Xform");
        base.define_node(&schema::devices_path().unwrap(), "Scope");
        base.define_node(&fan, "Fan");
        base.set_attribute(&fan, "device:power", 0.0);
        base.set_attribute(&fan, "state:note", "not a reading");
        let mut live = Layer::new("live_state");
        live.set_attribute(&fan, "device:power", 0.4);
        let layers = vec![base, live];
        let view = SceneView::new(&layers);

        let tree = render_tree(&view, &NodePath::parse("/World").unwrap(), Some(1));
        assert_eq!(tree, "World (Xform)\n  Environment\n");

        let readings = device_readings(&view).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].value, Value::Float(0.4));
        assert_eq!(readings[0].source, "live_state");

        let report = render_report(&view, None).unwrap();
        assert!(report.contains("Fan_01 device:power = 0.4  [live_state]"));
    }
}
