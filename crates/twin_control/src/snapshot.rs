//! Context snapshots for external reasoning
//!
//! A snapshot is derived from the composed store, loaded from a JSON file,
//! or taken from built-in defaults. All three produce the same type.

use serde::{Deserialize, Serialize};
use std::path::Path;

use twin_scene::{NodePath, SceneView};

use crate::config::{Defaults, TwinConfig};
use crate::error::{ControlError, Result};
use crate::schema::{attr, Device, ZoneId, ZoneLetter};
use crate::zones;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSnapshot {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub soil_moisture_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub fan_power: f64,
    pub vent_position: f64,
    pub valve_flow: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSnapshot {
    pub zone_id: ZoneId,
    pub bed_number: u32,
    pub position: ZoneLetter,
    pub soil_moisture_pct: f64,
    pub light_pct: f64,
    pub health_score: f64,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alerts {
    #[serde(default)]
    pub dry_zones: Vec<ZoneId>,
    #[serde(default)]
    pub shaded_zones: Vec<ZoneId>,
}

/// Sensor, device and zone context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    pub sensors: SensorSnapshot,
    pub devices: DeviceSnapshot,
    #[serde(default)]
    pub zones: Vec<ZoneSnapshot>,
    #[serde(default)]
    pub alerts: Alerts,
}

impl ContextSnapshot {
    /// Read the composed store
    ///
    /// All four devices must exist. Zones are enumerated over the beds
    /// present in the scene.
    pub fn from_view(view: &SceneView<'_>, config: &TwinConfig) -> Result<Self> {
        let defaults = &config.defaults;
        let sensor = required_device(view, Device::Sensor)?;
        let fan = required_device(view, Device::Fan)?;
        let vent = required_device(view, Device::Vent)?;
        let valve = required_device(view, Device::Valve)?;

        let float = |path: &NodePath, name: &str, default: f64| -> Result<f64> {
            Ok(view.get_float(path, name)?.unwrap_or(default))
        };

        let sensors = SensorSnapshot {
            temperature_c: float(&sensor, attr::TEMPERATURE, defaults.temperature_c)?,
            humidity_pct: float(&sensor, attr::HUMIDITY, defaults.humidity_pct)?,
            soil_moisture_pct: float(&sensor, attr::SOIL_MOISTURE, defaults.soil_moisture_pct)?,
        };
        let devices = DeviceSnapshot {
            fan_power: float(&fan, attr::POWER, defaults.actuator_level)?,
            vent_position: float(&vent, attr::POSITION, defaults.actuator_level)?,
            valve_flow: float(&valve, attr::FLOW, defaults.actuator_level)?,
        };

        let mut zone_snapshots = Vec::new();
        for bed in zones::beds(view)? {
            for letter in ZoneLetter::ALL {
                let zone_id = ZoneId::new(bed, letter);
                let path = zone_id.path()?;
                if !view.exists(&path) {
                    continue;
                }
                zone_snapshots.push(ZoneSnapshot {
                    zone_id,
                    bed_number: bed,
                    position: letter,
                    soil_moisture_pct: float(&path, attr::ZONE_MOISTURE, defaults.zone_moisture_pct)?,
                    light_pct: float(&path, attr::ZONE_LIGHT, defaults.zone_light_pct)?,
                    health_score: float(&path, attr::ZONE_HEALTH, defaults.zone_health_score)?,
                    status: view
                        .get_string(&path, attr::ZONE_STATUS)?
                        .unwrap_or("ok")
                        .to_string(),
                });
            }
        }

        let alerts = Alerts::from_zones(&zone_snapshots);
        Ok(Self {
            sensors,
            devices,
            zones: zone_snapshots,
            alerts,
        })
    }

    /// Default context used when no store or file is available
    pub fn default_context(defaults: &Defaults) -> Self {
        Self {
            sensors: SensorSnapshot {
                temperature_c: defaults.temperature_c,
                humidity_pct: defaults.humidity_pct,
                soil_moisture_pct: defaults.soil_moisture_pct,
            },
            devices: DeviceSnapshot {
                fan_power: defaults.actuator_level,
                vent_position: defaults.actuator_level,
                valve_flow: defaults.actuator_level,
            },
            zones: Vec::new(),
            alerts: Alerts::default(),
        }
    }

    /// Load a snapshot from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ControlError::InputRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn required_device(view: &SceneView<'_>, device: Device) -> Result<NodePath> {
    let path = device.path()?;
    if view.exists(&path) {
        Ok(path)
    } else {
        Err(ControlError::MissingNode(path))
    }
}

impl Alerts {
    /// Dry and shaded zones of a zone list
    pub fn from_zones(zones: &[ZoneSnapshot]) -> Self {
        let with_status = |status: &str| -> Vec<ZoneId> {
            zones
                .iter()
                .filter(|z| z.status == status)
                .map(|z| z.zone_id)
                .collect()
        };
        Self {
            dry_zones: with_status("dry"),
            shaded_zones: with_status("shaded"),
        }
    }
}
