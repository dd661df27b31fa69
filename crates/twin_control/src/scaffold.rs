//! Demo greenhouse scaffolding
//!
//! Authors a complete store: a base layer with the world, devices, beds,
//! zones and plants; a looks layer with materials and bindings; an empty
//! live layer; and the root manifest stacking them.

use std::path::{Path, PathBuf};

use twin_scene::{Layer, NodePath, RootManifest, Transform};

use crate::config::TwinConfig;
use crate::error::{ControlError, Result};
use crate::schema::{self, attr, Device, ZoneId, ZoneLetter};

/// Height of plants above the bed origin
pub const PLANT_Y: f64 = 0.39;
/// Row A offset across the bed
pub const ROW_A_X: f64 = -0.2;
/// Row B offset across the bed
pub const ROW_B_X: f64 = 0.2;
/// Planting band along the bed
pub const PLANTING_START: f64 = -7.0;
pub const PLANTING_END: f64 = 7.0;
/// Spacing within a row
pub const PLANT_STEP: f64 = 0.4;
/// Row B is staggered by half a step
pub const ROW_B_OFFSET: f64 = 0.2;
/// Spacing between beds across the greenhouse
pub const BED_SPACING: f64 = 1.6;

const BASE_FILE: &str = "greenhouse_base.json";
const LOOKS_FILE: &str = "greenhouse_looks.json";
const LIVE_FILE: &str = "live_state.json";
const BED_MATERIAL: &str = "/World/Looks/BedMat";

/// One plant of a bed
#[derive(Debug, Clone, PartialEq)]
pub struct PlantSlot {
    pub name: String,
    pub translation: [f64; 3],
}

fn row(start: f64, end: f64) -> Vec<f64> {
    let steps = ((end - start) / PLANT_STEP).round() as usize + 1;
    (0..steps)
        .map(|i| ((start + i as f64 * PLANT_STEP) * 1e4).round() / 1e4)
        .collect()
}

/// Plant layout of a bed: two staggered rows
///
/// The first plant at the bed centre takes the bed's representative name
/// `Plant_NN`; the others are `Plant_NN_<row>_<index>`.
pub fn plant_layout(bed: u32) -> Vec<PlantSlot> {
    let representative = format!("{}{:02}", schema::PLANT_PREFIX, bed);
    let mut centre_used = false;
    let mut slots = Vec::new();

    let rows = [
        ("A", ROW_A_X, row(PLANTING_START, PLANTING_END)),
        (
            "B",
            ROW_B_X,
            row(PLANTING_START + ROW_B_OFFSET, PLANTING_END - ROW_B_OFFSET),
        ),
    ];
    for (label, x, positions) in rows {
        let mut index = 0;
        for z in positions {
            let name = if !centre_used && z.abs() < 1e-6 {
                centre_used = true;
                representative.clone()
            } else {
                let name = format!("{}_{}_{:03}", representative, label, index);
                index += 1;
                name
            };
            slots.push(PlantSlot {
                name,
                translation: [x, PLANT_Y, z],
            });
        }
    }
    slots
}

fn path(s: &str) -> Result<NodePath> {
    Ok(NodePath::parse(s)?)
}

fn base_layer(file: PathBuf, config: &TwinConfig) -> Result<Layer> {
    let defaults = &config.defaults;
    let mut layer = Layer::at_path("greenhouse_base", file);
    layer.set_doc("Greenhouse geometry, devices, beds, zones and plants");

    layer.define_node(&path("/World")?, "Xform");
    layer.define_node(&path("/World/Environment")?, "Xform");
    layer.define_node(&path(schema::GREENHOUSE)?, "Xform");
    layer.define_node(&schema::devices_path()?, "Scope");

    for device in Device::ALL {
        let node = device.path()?;
        layer.define_node(&node, device.kind());
        match device.level_attribute() {
            None => {
                layer.set_attribute(&node, attr::TEMPERATURE, defaults.temperature_c);
                layer.set_attribute(&node, attr::HUMIDITY, defaults.humidity_pct);
                layer.set_attribute(&node, attr::SOIL_MOISTURE, defaults.soil_moisture_pct);
                layer.set_attribute(&node, attr::TICK, 0_i64);
                layer.set_attribute(&node, attr::LAST_UPDATED, "");
            }
            Some(level) => {
                layer.set_attribute(&node, level, defaults.actuator_level);
                layer.set_attribute(&node, attr::ENABLED, true);
            }
        }
    }

    layer.define_node(&schema::plants_path()?, "Scope");
    let bed_count = config.zones.bed_count;
    for bed in 1..=bed_count {
        let bed_path = schema::bed_path(bed)?;
        let x = (f64::from(bed) - (f64::from(bed_count) + 1.0) / 2.0) * BED_SPACING;
        layer
            .define_node(&bed_path, "Bed")
            .attributes
            .insert(attr::TRANSFORM.to_string(), Transform::from_translation([x, 0.0, 0.0]).into());
        layer.define_node(&bed_path.child("BedMesh")?, "Mesh");

        let zones = bed_path.child("Zones")?;
        layer.define_node(&zones, "Scope");
        for letter in ZoneLetter::ALL {
            let zone_id = ZoneId::new(bed, letter);
            let zone = zone_id.path()?;
            layer.define_node(&zone, "Zone");
            layer.set_attribute(&zone, attr::ZONE_ID, zone_id.to_string());
            layer.set_attribute(&zone, attr::ZONE_MOISTURE, defaults.zone_moisture_pct);
            layer.set_attribute(&zone, attr::ZONE_LIGHT, defaults.zone_light_pct);
            layer.set_attribute(&zone, attr::ZONE_HEALTH, defaults.zone_health_score);
            layer.set_attribute(&zone, attr::ZONE_STATUS, "ok");
        }

        for slot in plant_layout(bed) {
            let plant = bed_path.child(&slot.name)?;
            layer.define_node(&plant, "Plant");
            layer.set_attribute(&plant, attr::TRANSFORM, Transform::from_translation(slot.translation));
        }
    }
    Ok(layer)
}

fn looks_layer(file: PathBuf, config: &TwinConfig) -> Result<Layer> {
    let mut layer = Layer::at_path("greenhouse_looks", file);
    layer.set_doc("Materials and material bindings");

    layer.define_node(&path(schema::LOOKS)?, "Scope");
    for material in [
        config.materials.healthy.as_str(),
        config.materials.unhealthy.as_str(),
        BED_MATERIAL,
    ] {
        layer.define_node(&path(material)?, "Material");
    }

    for bed in 1..=config.zones.bed_count {
        let bed_path = schema::bed_path(bed)?;
        layer.set_attribute(&bed_path.child("BedMesh")?, attr::MATERIAL_BINDING, BED_MATERIAL);
        for slot in plant_layout(bed) {
            layer.set_attribute(
                &bed_path.child(&slot.name)?,
                attr::MATERIAL_BINDING,
                config.materials.healthy.as_str(),
            );
        }
    }
    Ok(layer)
}

/// Author a demo store at `manifest`; layer files go to `layers/` next to it
///
/// Refuses to overwrite an existing manifest unless `force` is set.
pub fn scaffold(manifest: &Path, config: &TwinConfig, force: bool) -> Result<()> {
    if manifest.exists() && !force {
        return Err(ControlError::StoreExists(manifest.to_path_buf()));
    }
    config.zones.validate()?;
    let dir = manifest.parent().unwrap_or_else(|| Path::new("."));
    let layers_dir = dir.join("layers");

    let mut base = base_layer(layers_dir.join(BASE_FILE), config)?;
    let mut looks = looks_layer(layers_dir.join(LOOKS_FILE), config)?;
    let mut live = Layer::at_path("live_state", layers_dir.join(LIVE_FILE));
    live.set_doc("Live sensor, actuator and zone state; the only layer control tools write");

    base.save()?;
    looks.save()?;
    live.save()?;

    let mut root = RootManifest::new(
        [BASE_FILE, LOOKS_FILE, LIVE_FILE]
            .iter()
            .map(|file| format!("layers/{}", file)),
    );
    root.doc = Some("Greenhouse digital twin; sublayers weakest to strongest".to_string());
    root.save(manifest)?;

    log::info!(
        "Scaffolded {} bed(s) at {:?} ({} plants per bed)",
        config.zones.bed_count,
        manifest,
        plant_layout(1).len()
    );
    Ok(())
}
