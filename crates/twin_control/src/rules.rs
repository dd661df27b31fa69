//! Control rule evaluation
//!
//! One evaluation per invocation: read composed sensor and zone state, apply
//! the threshold rules, write actuator levels and zone statuses to the live
//! layer, then advance the tick.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use twin_scene::{EditContext, SceneView};

use crate::config::TwinConfig;
use crate::error::{ControlError, Result};
use crate::schema::{self, attr, Device, ZoneId, ZoneLetter, ZoneStatus};
use crate::zones;

/// Fail with `MissingNode` unless every device exists
pub fn require_devices(view: &SceneView<'_>) -> Result<()> {
    for device in Device::ALL {
        let path = device.path()?;
        if !view.exists(&path) {
            return Err(ControlError::MissingNode(path));
        }
    }
    Ok(())
}

/// Write an actuator level; the write path shared by rules, recommendations and updates
///
/// Returns `false` if the live layer already held the level.
pub fn write_actuator(ctx: &mut EditContext<'_>, device: Device, level: f64) -> Result<bool> {
    let path = device.path()?;
    let Some(attribute) = device.level_attribute() else {
        return Ok(false);
    };
    if !ctx.view().exists(&path) {
        return Err(ControlError::MissingNode(path));
    }
    let changed = ctx.set_attribute(&path, attribute, level)?;
    if changed {
        log::debug!("{} {} = {}", device, attribute, level);
    }
    Ok(changed)
}

/// Render a timestamp the way `state:lastUpdated` stores it
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Increment `state:tick` and stamp `state:lastUpdated` on the sensor
pub fn stamp_update(ctx: &mut EditContext<'_>, now: DateTime<Utc>) -> Result<(i64, String)> {
    let sensor = Device::Sensor.path()?;
    if !ctx.view().exists(&sensor) {
        return Err(ControlError::MissingNode(sensor));
    }
    let tick = ctx.increment_int(&sensor, attr::TICK, 1)?;
    let stamp = format_timestamp(now);
    ctx.set_attribute(&sensor, attr::LAST_UPDATED, stamp.as_str())?;
    Ok((tick, stamp))
}

/// Composed telemetry of one zone
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneReading {
    pub zone_id: ZoneId,
    pub soil_moisture_pct: f64,
    pub light_pct: f64,
    /// Status written by this evaluation, if any
    pub status: Option<ZoneStatus>,
}

/// Outcome of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub humidity_pct: f64,
    pub fan_power: f64,
    /// `None` when the vent was left untouched
    pub vent_position: Option<f64>,
    pub valve_flow: f64,
    pub zones: Vec<ZoneReading>,
    pub dry_zones: Vec<ZoneId>,
    pub shaded_zones: Vec<ZoneId>,
    pub tick: i64,
    pub last_updated: String,
}

impl EvaluationReport {
    /// Human-readable action lines
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match self.vent_position {
            Some(vent) => lines.push(format!(
                "Humidity {}% -> Fan {}, Vent {}",
                self.humidity_pct, self.fan_power, vent
            )),
            None => lines.push(format!("Humidity {}% -> Fan {}", self.humidity_pct, self.fan_power)),
        }
        if self.dry_zones.is_empty() {
            lines.push(format!("No dry zones -> Valve {}", self.valve_flow));
        } else {
            let ids: Vec<String> = self.dry_zones.iter().map(ZoneId::to_string).collect();
            lines.push(format!(
                "Dry zones ({}): {} -> Valve {}",
                ids.len(),
                ids.join(", "),
                self.valve_flow
            ));
        }
        if !self.shaded_zones.is_empty() {
            let ids: Vec<String> = self.shaded_zones.iter().map(ZoneId::to_string).collect();
            lines.push(format!("Shaded zones ({}): {}", ids.len(), ids.join(", ")));
        }
        lines.push(format!("state:tick = {}", self.tick));
        lines
    }
}

/// Threshold rule evaluator
pub struct RuleEvaluator<'c> {
    config: &'c TwinConfig,
}

impl<'c> RuleEvaluator<'c> {
    /// Create an evaluator
    pub fn new(config: &'c TwinConfig) -> Self {
        Self { config }
    }

    /// Run the rules once against the edit target
    ///
    /// A zone that recovers keeps its previous status; only dry and shaded
    /// are ever written.
    pub fn evaluate(&self, ctx: &mut EditContext<'_>, now: DateTime<Utc>) -> Result<EvaluationReport> {
        let rules = &self.config.rules;
        let defaults = &self.config.defaults;
        require_devices(&ctx.view())?;

        let sensor = Device::Sensor.path()?;
        let humidity = ctx
            .view()
            .get_float(&sensor, attr::HUMIDITY)?
            .unwrap_or(defaults.humidity_pct);

        let (fan_power, vent_position) = if humidity > rules.humidity_high {
            (rules.fan_power_humid, Some(rules.vent_position_humid))
        } else {
            (rules.fan_power_idle, None)
        };
        write_actuator(ctx, Device::Fan, fan_power)?;
        if let Some(position) = vent_position {
            write_actuator(ctx, Device::Vent, position)?;
        }

        let mut zones_read = Vec::new();
        let mut dry_zones = Vec::new();
        let mut shaded_zones = Vec::new();
        let beds = zones::beds(&ctx.view())?;
        for bed in beds {
            for letter in ZoneLetter::ALL {
                let zone_id = ZoneId::new(bed, letter);
                let zone = zone_id.path()?;
                if !ctx.view().exists(&zone) {
                    log::warn!("{} has no zone node {}; skipping", schema::bed_name(bed), zone);
                    continue;
                }
                let view = ctx.view();
                let moisture = view
                    .get_float(&zone, attr::ZONE_MOISTURE)?
                    .unwrap_or(defaults.zone_moisture_pct);
                let light = view
                    .get_float(&zone, attr::ZONE_LIGHT)?
                    .unwrap_or(defaults.zone_light_pct);

                let status = if moisture < rules.dry_moisture {
                    dry_zones.push(zone_id);
                    Some(ZoneStatus::Dry)
                } else if light < rules.shaded_light {
                    shaded_zones.push(zone_id);
                    Some(ZoneStatus::Shaded)
                } else {
                    None
                };
                if let Some(status) = status {
                    ctx.set_attribute(&zone, attr::ZONE_STATUS, status.as_str())?;
                }
                zones_read.push(ZoneReading {
                    zone_id,
                    soil_moisture_pct: moisture,
                    light_pct: light,
                    status,
                });
            }
        }

        let valve_flow = if dry_zones.is_empty() {
            rules.valve_closed
        } else {
            rules.valve_open
        };
        write_actuator(ctx, Device::Valve, valve_flow)?;

        let (tick, last_updated) = stamp_update(ctx, now)?;
        log::info!(
            "Evaluated tick {}: humidity {}%, {} dry zone(s), {} shaded zone(s)",
            tick,
            humidity,
            dry_zones.len(),
            shaded_zones.len()
        );

        Ok(EvaluationReport {
            humidity_pct: humidity,
            fan_power,
            vent_position,
            valve_flow,
            zones: zones_read,
            dry_zones,
            shaded_zones,
            tick,
            last_updated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap();
        assert_eq!(format_timestamp(now), "2026-03-01T08:30:00Z");
    }
}
