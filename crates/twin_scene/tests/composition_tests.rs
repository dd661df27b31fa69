//! Composition and write-isolation tests for twin_scene
//!
//! Stores are written to temporary directories and reopened through the
//! root manifest, the same way every tool invocation does.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use twin_scene::*;

fn path(s: &str) -> NodePath {
    NodePath::parse(s).unwrap()
}

/// Base, looks and live layers on disk; returns the manifest path
fn write_store(dir: &Path) -> PathBuf {
    let layers = dir.join("layers");
    let fan = path("/World/Devices/Fan_01");
    let plant = path("/World/Plants/Bed_01/Plant_01");

    let mut base = Layer::at_path("greenhouse_base", layers.join("greenhouse_base.json"));
    base.define_node(&path("/World"), "Xform");
    base.define_node(&path("/World/Devices"), "Scope");
    base.define_node(&fan, "Actuator");
    base.set_attribute(&fan, "device:power", 0.0);
    base.define_node(&path("/World/Plants"), "Scope");
    base.define_node(&path("/World/Plants/Bed_01"), "Bed");
    base.define_node(&plant, "Plant");
    base.set_attribute(&plant, "xformOp:transform", Transform::from_translation([-0.2, 0.39, 0.0]));
    base.save().unwrap();

    let mut looks = Layer::at_path("greenhouse_looks", layers.join("greenhouse_looks.json"));
    looks.define_node(&path("/World/Looks"), "Scope");
    looks.define_node(&path("/World/Looks/PlantMat"), "Material");
    looks.set_attribute(&plant, "material:binding", "/World/Looks/PlantMat");
    looks.save().unwrap();

    let mut live = Layer::at_path("live_state", layers.join("live_state.json"));
    live.save().unwrap();

    let manifest = dir.join("greenhouse.json");
    RootManifest::new([
        "layers/greenhouse_base.json",
        "layers/greenhouse_looks.json",
        "layers/live_state.json",
    ])
    .save(&manifest)
    .unwrap();
    manifest
}

fn open() -> (TempDir, Stage) {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_store(dir.path());
    let stage = Stage::open(&manifest).unwrap();
    (dir, stage)
}

#[test]
fn test_open_composes_all_layers() {
    let (_dir, stage) = open();
    let view = stage.view();

    assert_eq!(stage.stack().len(), 3);
    assert!(view.exists(&path("/World/Looks/PlantMat")));
    assert_eq!(
        view.get_string(&path("/World/Plants/Bed_01/Plant_01"), "material:binding")
            .unwrap(),
        Some("/World/Looks/PlantMat")
    );

    let world: Vec<String> = view
        .children(&path("/World"))
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(world, vec!["/World/Devices", "/World/Plants", "/World/Looks"]);
    assert!(stage.find_layer("live_state").is_some());
}

/// INVARIANT: strongest layer wins; removing its opinion reverts to the weaker value
#[test]
fn invariant_override_and_revert() {
    let (_dir, mut stage) = open();
    let live = stage.find_layer("live_state").unwrap();
    let fan = path("/World/Devices/Fan_01");

    stage
        .with_edit_target(&live, |ctx| ctx.set_attribute(&fan, "device:power", 0.4))
        .unwrap();
    assert_eq!(stage.view().get_float(&fan, "device:power").unwrap(), Some(0.4));

    stage
        .with_edit_target(&live, |ctx| -> Result<()> {
            ctx.clear_attribute(&fan, "device:power");
            Ok(())
        })
        .unwrap();
    assert_eq!(stage.view().get_float(&fan, "device:power").unwrap(), Some(0.0));
}

/// INVARIANT: saving the live layer leaves every other file byte-identical
#[test]
fn invariant_only_live_layer_file_changes() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_store(dir.path());
    let layers = dir.path().join("layers");
    let base_before = fs::read(layers.join("greenhouse_base.json")).unwrap();
    let looks_before = fs::read(layers.join("greenhouse_looks.json")).unwrap();
    let live_before = fs::read(layers.join("live_state.json")).unwrap();

    let mut stage = Stage::open(&manifest).unwrap();
    let live = stage.find_layer("live_state").unwrap();
    let plant = path("/World/Plants/Bed_01/Plant_01");
    stage
        .with_edit_target(&live, |ctx| {
            ctx.set_attribute(&plant, "material:binding", "/World/Looks/UnhealthyPlantMat")
        })
        .unwrap();
    stage.save_layer(&live).unwrap();

    assert_eq!(fs::read(layers.join("greenhouse_base.json")).unwrap(), base_before);
    assert_eq!(fs::read(layers.join("greenhouse_looks.json")).unwrap(), looks_before);
    assert_ne!(fs::read(layers.join("live_state.json")).unwrap(), live_before);

    let reopened = Stage::open(&manifest).unwrap();
    assert_eq!(
        reopened.view().get_string(&plant, "material:binding").unwrap(),
        Some("/World/Looks/UnhealthyPlantMat")
    );
}

/// INVARIANT: a failing write inside an edit target changes nothing
#[test]
fn invariant_failed_edit_is_atomic() {
    let (_dir, mut stage) = open();
    let live = stage.find_layer("live_state").unwrap();
    let fan = path("/World/Devices/Fan_01");
    let before = stage.stack().get(&live).unwrap().to_json().unwrap();

    let result = stage.with_edit_target(&live, |ctx| -> Result<()> {
        ctx.set_attribute(&fan, "device:power", 1.0)?;
        ctx.set_attribute(&fan, "device:power", "full")?;
        Ok(())
    });

    assert_eq!(result.unwrap_err().class(), ErrorClass::TypeMismatch);
    assert_eq!(stage.stack().get(&live).unwrap().to_json().unwrap(), before);
    assert_eq!(stage.view().get_float(&fan, "device:power").unwrap(), Some(0.0));
}

#[test]
fn test_open_rejects_conflicting_types() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_store(dir.path());
    let live_file = dir.path().join("layers/live_state.json");

    let mut live = Layer::load(&live_file).unwrap();
    live.set_attribute(&path("/World/Devices/Fan_01"), "device:power", 1_i64);
    live.save().unwrap();

    let err = Stage::open(&manifest).unwrap_err();
    assert!(matches!(err, SceneError::TypeMismatch { .. }));
}

#[test]
fn test_missing_sublayer_is_persistence_error() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("greenhouse.json");
    RootManifest::new(["layers/absent.json"]).save(&manifest).unwrap();

    let err = Stage::open(&manifest).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Persistence);
}

#[test]
fn test_traversal_visits_composed_tree() {
    let (_dir, stage) = open();
    let visited: Vec<String> = stage
        .view()
        .descendants(&path("/World/Plants"))
        .map(String::from)
        .collect();
    assert_eq!(
        visited,
        vec!["/World/Plants", "/World/Plants/Bed_01", "/World/Plants/Bed_01/Plant_01"]
    );
}
