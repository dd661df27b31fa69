//! Pre-order traversal of the composed tree

use crate::compose::SceneView;
use crate::path::NodePath;

/// Pre-order iterator over a composed subtree
///
/// Children are visited in composed child-list order. The starting node is
/// yielded first if it exists.
pub struct Descendants<'a> {
    view: SceneView<'a>,
    pending: Vec<NodePath>,
}

impl<'a> Descendants<'a> {
    pub(crate) fn new(view: SceneView<'a>, root: NodePath) -> Self {
        let pending = if view.exists(&root) { vec![root] } else { Vec::new() };
        Self { view, pending }
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodePath;

    fn next(&mut self) -> Option<NodePath> {
        let path = self.pending.pop()?;
        let children = self.view.children(&path);
        self.pending.extend(children.into_iter().rev());
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use crate::compose::SceneView;
    use crate::layer::Layer;
    use crate::path::NodePath;

    fn path(s: &str) -> NodePath {
        NodePath::parse(s).unwrap()
    }

    #[test]
    fn test_pre_order() {
        let mut base = Layer::new("base");
        base.define_node(&path("/World"), "Xform");
        base.define_node(&path("/World/Devices"), "Scope");
        base.define_node(&path("/World/Devices/Fan_01"), "Actuator");
        base.define_node(&path("/World/Looks"), "Scope");
        let layers = vec![base];
        let view = SceneView::new(&layers);

        let visited: Vec<String> = view
            .descendants(&path("/World"))
            .map(String::from)
            .collect();
        assert_eq!(
            visited,
            vec!["/World", "/World/Devices", "/World/Devices/Fan_01", "/World/Looks"]
        );
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let layers = vec![Layer::new("empty")];
        let view = SceneView::new(&layers);
        assert_eq!(view.descendants(&path("/World")).count(), 0);
        assert_eq!(view.descendants(&NodePath::root()).count(), 1);
    }
}
