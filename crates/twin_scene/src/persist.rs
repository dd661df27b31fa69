//! Layer files and root manifests
//!
//! Layers are stored as pretty-printed JSON with deterministic key order.
//! Writes are atomic: the file is written next to its destination under a
//! temporary name and renamed over it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Result, SceneError};
use crate::layer::Layer;
use crate::node::NodeSpec;
use crate::path::NodePath;

/// Current layer file format version
pub const FORMAT_VERSION: u32 = 1;

/// On-disk representation of a layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerFile {
    pub format_version: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default)]
    pub nodes: BTreeMap<NodePath, NodeSpec>,
}

/// Root manifest listing sublayers weakest to strongest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    pub sublayers: Vec<String>,
}

impl RootManifest {
    /// Create a manifest from sublayer paths
    pub fn new(sublayers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            doc: None,
            sublayers: sublayers.into_iter().map(Into::into).collect(),
        }
    }

    /// Read a manifest
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    /// Write a manifest atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(self).map_err(|source| SceneError::Serialize {
            layer: path.display().to_string(),
            source,
        })?;
        write_atomic(path, &data)
    }
}

impl Layer {
    /// Load a layer file; the file path becomes the layer's identifier
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file: LayerFile = read_json(path)?;
        if file.format_version != FORMAT_VERSION {
            return Err(SceneError::VersionMismatch {
                path: path.to_path_buf(),
                expected: FORMAT_VERSION,
                got: file.format_version,
            });
        }
        log::debug!("Loaded layer {:?} ({} node(s))", path, file.nodes.len());
        Ok(Layer::from_parts(file.name, file.doc, path, file.nodes))
    }

    /// Serialize this layer as it would be written to disk
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let file = LayerFile {
            format_version: FORMAT_VERSION,
            name: self.name().to_string(),
            doc: self.doc().map(str::to_string),
            nodes: self.nodes().map(|(p, s)| (p.clone(), s.clone())).collect(),
        };
        let mut data = serde_json::to_vec_pretty(&file).map_err(|source| SceneError::Serialize {
            layer: self.id().to_string(),
            source,
        })?;
        data.push(b'\n');
        Ok(data)
    }

    /// Write this layer to its backing file
    pub fn save(&mut self) -> Result<()> {
        let path = self
            .source()
            .ok_or_else(|| SceneError::Unbacked(self.id().to_string()))?
            .to_path_buf();
        let data = self.to_json()?;
        write_atomic(&path, &data)?;
        self.clear_dirty();
        log::info!("Saved layer {:?} ({} bytes)", path, data.len());
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|source| SceneError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SceneError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `data` to `path` through a temporary file and a rename
///
/// On failure the destination is untouched and the temporary file is removed.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let save_err = |source| SceneError::Save {
        path: path.to_path_buf(),
        source,
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(save_err)?;
    }

    let written = write_file(&temp_path, data).and_then(|()| fs::rename(&temp_path, path));
    if let Err(source) = written {
        if let Err(e) = fs::remove_file(&temp_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Could not remove {:?}: {}", temp_path, e);
            }
        }
        return Err(save_err(source));
    }
    Ok(())
}

fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(data)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use tempfile::tempdir;

    #[test]
    fn test_layer_file_round_trip() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("live_state.json");
        let fan = NodePath::parse("/Devices/Fan_01").unwrap();

        let mut layer = Layer::at_path("live_state", &file);
        layer.set_doc("Live sensor and actuator state");
        layer.set_attribute(&fan, "device:power", 0.4);
        layer.set_attribute(&fan, "device:enabled", true);
        layer.save().unwrap();
        assert!(!layer.is_dirty());
        assert!(!dir.path().join(".live_state.json.tmp").exists());

        let loaded = Layer::load(&file).unwrap();
        assert_eq!(loaded.id(), layer.id());
        assert_eq!(loaded.doc(), Some("Live sensor and actuator state"));
        assert_eq!(loaded.attribute(&fan, "device:power"), Some(&Value::Float(0.4)));
        assert_eq!(loaded.to_json().unwrap(), layer.to_json().unwrap());
    }

    #[test]
    fn test_version_and_parse_errors() {
        let dir = tempdir().unwrap();
        let future = dir.path().join("future.json");
        fs::write(&future, r#"{"format_version": 2, "name": "x"}"#).unwrap();
        assert!(matches!(
            Layer::load(&future),
            Err(SceneError::VersionMismatch { got: 2, .. })
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(Layer::load(&broken), Err(SceneError::Parse { .. })));

        assert!(matches!(
            Layer::load(dir.path().join("missing.json")),
            Err(SceneError::Read { .. })
        ));
    }

    #[test]
    fn test_failed_save_leaves_destination_and_no_temp_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("live_state.json");
        fs::create_dir(&file).unwrap();
        fs::write(file.join("keep.txt"), "untouched").unwrap();
        let fan = NodePath::parse("/Devices/Fan_01").unwrap();

        let mut layer = Layer::at_path("live_state", &file);
        layer.set_attribute(&fan, "device:power", 0.4);
        let err = layer.save().unwrap_err();

        assert!(matches!(err, SceneError::Save { .. }));
        assert_eq!(err.class(), crate::error::ErrorClass::Persistence);
        assert!(layer.is_dirty());
        assert!(!dir.path().join(".live_state.json.tmp").exists());
        assert_eq!(fs::read_to_string(file.join("keep.txt")).unwrap(), "untouched");
    }

    #[test]
    fn test_unbacked_layer_cannot_save() {
        let mut layer = Layer::new("scratch");
        assert!(matches!(layer.save(), Err(SceneError::Unbacked(_))));
    }

    #[test]
    fn test_manifest_json_shape() {
        let manifest = RootManifest::new(["layers/greenhouse_base.json", "layers/live_state.json"]);
        let json = serde_json::to_string(&manifest).unwrap();
        assert_eq!(
            json,
            r#"{"sublayers":["layers/greenhouse_base.json","layers/live_state.json"]}"#
        );
    }
}
