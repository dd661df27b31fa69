//! Direct state updates
//!
//! Operator-supplied sensor readings, actuator levels and zone telemetry,
//! written to the live layer without running the rules.

use serde::{Deserialize, Serialize};

use twin_scene::{EditContext, Value};

use crate::error::{ControlError, Result};
use crate::rules::{self, write_actuator};
use crate::schema::{attr, Device, ZoneId, ZoneStatus};

/// Optional values to write; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateUpdate {
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub soil_moisture_pct: Option<f64>,
    pub fan_power: Option<f64>,
    pub vent_position: Option<f64>,
    pub valve_flow: Option<f64>,
    pub fan_enabled: Option<bool>,
    pub vent_enabled: Option<bool>,
    pub valve_enabled: Option<bool>,
    /// Increment `state:tick`
    pub tick: bool,
    pub last_updated: Option<String>,
    /// Zone the zone fields apply to, e.g. `B03-C`
    pub zone: Option<String>,
    pub zone_moisture_pct: Option<f64>,
    pub zone_light_pct: Option<f64>,
    pub zone_health_score: Option<f64>,
    pub zone_status: Option<ZoneStatus>,
}

impl StateUpdate {
    /// Check if any zone field is set
    pub fn has_zone_fields(&self) -> bool {
        self.zone_moisture_pct.is_some()
            || self.zone_light_pct.is_some()
            || self.zone_health_score.is_some()
            || self.zone_status.is_some()
    }

    /// Check if the update writes nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Write the update to the edit target, returning one line per change
    ///
    /// All four devices must exist. An unparseable zone id skips the zone
    /// part with a warning; a zone id naming a missing zone is an error.
    pub fn apply(&self, ctx: &mut EditContext<'_>) -> Result<Vec<String>> {
        rules::require_devices(&ctx.view())?;
        let mut changes = Vec::new();

        let sensor = Device::Sensor.path()?;
        let readings = [
            (attr::TEMPERATURE, self.temperature_c),
            (attr::HUMIDITY, self.humidity_pct),
            (attr::SOIL_MOISTURE, self.soil_moisture_pct),
        ];
        for (name, value) in readings {
            if let Some(value) = value {
                ctx.set_attribute(&sensor, name, value)?;
                changes.push(format!("{} = {}", name, value));
            }
        }
        if let Some(stamp) = &self.last_updated {
            ctx.set_attribute(&sensor, attr::LAST_UPDATED, stamp.as_str())?;
            changes.push(format!("{} = {:?}", attr::LAST_UPDATED, stamp));
        }
        if self.tick {
            let tick = ctx.increment_int(&sensor, attr::TICK, 1)?;
            changes.push(format!("{} = {} (incremented)", attr::TICK, tick));
        }

        let actuators = [
            (Device::Fan, self.fan_power, self.fan_enabled),
            (Device::Vent, self.vent_position, self.vent_enabled),
            (Device::Valve, self.valve_flow, self.valve_enabled),
        ];
        for (device, level, enabled) in actuators {
            if let Some(level) = level {
                write_actuator(ctx, device, level)?;
                let attribute = device.level_attribute().unwrap_or_default();
                changes.push(format!("{} {} = {}", device, attribute, level));
            }
            if let Some(enabled) = enabled {
                ctx.set_attribute(&device.path()?, attr::ENABLED, enabled)?;
                changes.push(format!("{} {} = {}", device, attr::ENABLED, enabled));
            }
        }

        if self.has_zone_fields() {
            self.apply_zone(ctx, &mut changes)?;
        }
        Ok(changes)
    }

    fn apply_zone(&self, ctx: &mut EditContext<'_>, changes: &mut Vec<String>) -> Result<()> {
        let Some(raw) = self.zone.as_deref() else {
            log::warn!("Zone fields given without a zone id; skipping zone update");
            return Ok(());
        };
        let zone = match ZoneId::parse(raw) {
            Ok(zone) => zone,
            Err(e) => {
                log::warn!("{}; skipping zone update", e);
                return Ok(());
            }
        };
        let path = zone.path()?;
        if !ctx.view().exists(&path) {
            return Err(ControlError::MissingNode(path));
        }

        let fields: [(&str, Option<Value>); 4] = [
            (attr::ZONE_MOISTURE, self.zone_moisture_pct.map(Value::from)),
            (attr::ZONE_LIGHT, self.zone_light_pct.map(Value::from)),
            (attr::ZONE_HEALTH, self.zone_health_score.map(Value::from)),
            (attr::ZONE_STATUS, self.zone_status.map(|s| Value::from(s.as_str()))),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                changes.push(format!("{} {} = {}", zone, name, value));
                ctx.set_attribute(&path, name, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_zone_detection() {
        assert!(StateUpdate::default().is_empty());
        let update = StateUpdate {
            zone: Some("B01-A".into()),
            ..StateUpdate::default()
        };
        assert!(!update.is_empty());
        assert!(!update.has_zone_fields());

        let update = StateUpdate {
            zone_status: Some(ZoneStatus::Wet),
            ..StateUpdate::default()
        };
        assert!(update.has_zone_fields());
    }

    #[test]
    fn test_deserialize_partial() {
        let update: StateUpdate =
            serde_json::from_str(r#"{"humidity_pct": 85.0, "tick": true, "zone_status": "dry"}"#).unwrap();
        assert_eq!(update.humidity_pct, Some(85.0));
        assert!(update.tick);
        assert_eq!(update.zone_status, Some(ZoneStatus::Dry));
    }
}
