//! The stage - a validated layer stack bound to its files

use std::path::{Path, PathBuf};

use crate::compose::SceneView;
use crate::error::{Result, SceneError};
use crate::layer::{Layer, LayerId, LayerStack};
use crate::persist::RootManifest;

/// A composed scene
///
/// Reads go through [`Stage::view`]; writes through
/// [`Stage::with_edit_target`].
#[derive(Debug)]
pub struct Stage {
    stack: LayerStack,
    manifest: Option<PathBuf>,
}

impl Stage {
    /// Create a stage from an in-memory stack
    ///
    /// Fails if two layers disagree on the type of an attribute.
    pub fn new(stack: LayerStack) -> Result<Self> {
        SceneView::new(stack.layers()).validate()?;
        Ok(Self { stack, manifest: None })
    }

    /// Open the stack listed by a root manifest
    ///
    /// Sublayer paths are relative to the manifest's directory and listed
    /// weakest first.
    pub fn open(manifest_path: impl AsRef<Path>) -> Result<Self> {
        let manifest_path = manifest_path.as_ref();
        let manifest = RootManifest::load(manifest_path)?;
        let base_dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));

        let mut stack = LayerStack::new();
        for sublayer in &manifest.sublayers {
            stack.push(Layer::load(base_dir.join(sublayer))?)?;
        }
        log::info!(
            "Opened {:?} with {} layer(s)",
            manifest_path,
            stack.len()
        );

        let mut stage = Self::new(stack)?;
        stage.manifest = Some(manifest_path.to_path_buf());
        Ok(stage)
    }

    /// Composed view of the whole stack
    pub fn view(&self) -> SceneView<'_> {
        SceneView::new(self.stack.layers())
    }

    /// The layer stack
    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    pub(crate) fn stack_mut(&mut self) -> &mut LayerStack {
        &mut self.stack
    }

    /// Root manifest this stage was opened from
    pub fn manifest_path(&self) -> Option<&Path> {
        self.manifest.as_deref()
    }

    /// Identifier of the strongest layer whose id contains `fragment`
    pub fn find_layer(&self, fragment: &str) -> Option<LayerId> {
        self.stack.find_by_fragment(fragment).map(|l| l.id().clone())
    }

    /// Write one layer back to its file
    ///
    /// Only the named layer is touched; every other file stays as loaded.
    pub fn save_layer(&mut self, id: &LayerId) -> Result<()> {
        let index = self
            .stack
            .position(id)
            .ok_or_else(|| SceneError::LayerNotFound(id.to_string()))?;
        self.stack.layer_mut(index).save()
    }
}
