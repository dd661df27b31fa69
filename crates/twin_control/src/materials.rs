//! Material sync - zone health to plant material bindings
//!
//! Every plant in a zone is bound to the healthy material when the zone's
//! status is `ok` and to the unhealthy material otherwise. Plants already
//! bound to the target material are left alone, so a repeated sync writes
//! nothing.

use serde::Serialize;

use twin_scene::{EditContext, SceneView};

use crate::config::TwinConfig;
use crate::error::Result;
use crate::schema::{attr, ZoneId, ZoneLetter, ZoneStatus};
use crate::zones;

/// Whether a raw `zone:status` value counts as healthy
///
/// Unrecognised statuses are treated as unhealthy.
pub fn is_healthy_status(status: &str) -> bool {
    match status.parse::<ZoneStatus>() {
        Ok(status) => status.is_healthy(),
        Err(_) => {
            log::warn!("Unrecognised zone status {:?}; treating as unhealthy", status);
            false
        }
    }
}

/// Outcome of syncing one zone
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSync {
    pub zone_id: ZoneId,
    pub status: String,
    pub material: String,
    /// Plants in the zone
    pub entities: usize,
    /// Plants whose binding was rewritten
    pub rebound: usize,
}

impl std::fmt::Display for ZoneSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} plant(s) -> {} (status={}, {} rebound)",
            self.zone_id, self.entities, self.material, self.status, self.rebound
        )
    }
}

/// Zone health to material binding engine
pub struct MaterialSync<'c> {
    config: &'c TwinConfig,
}

impl<'c> MaterialSync<'c> {
    /// Create a sync engine
    pub fn new(config: &'c TwinConfig) -> Self {
        Self { config }
    }

    /// Current status of a zone; a missing zone or status reads as `ok`
    pub fn zone_status(&self, view: &SceneView<'_>, zone: ZoneId) -> Result<String> {
        let path = zone.path()?;
        if !view.exists(&path) {
            return Ok(ZoneStatus::Ok.as_str().to_string());
        }
        Ok(view
            .get_string(&path, attr::ZONE_STATUS)?
            .unwrap_or(ZoneStatus::Ok.as_str())
            .to_string())
    }

    /// Bind every plant of a zone to the material matching `status`
    pub fn sync_zone(&self, ctx: &mut EditContext<'_>, zone: ZoneId, status: &str) -> Result<ZoneSync> {
        let material = self.config.materials.for_health(is_healthy_status(status));
        let entities = self
            .config
            .zones
            .entities_in_zone(&ctx.view(), zone.bed, zone.letter)?;

        let mut rebound = 0;
        for entity in &entities {
            let current = ctx.view().get_string(entity, attr::MATERIAL_BINDING)?;
            if current == Some(material) {
                continue;
            }
            if ctx.set_attribute(entity, attr::MATERIAL_BINDING, material)? {
                rebound += 1;
            }
        }
        if rebound > 0 {
            log::debug!("{}: rebound {} of {} plant(s) to {}", zone, rebound, entities.len(), material);
        }

        Ok(ZoneSync {
            zone_id: zone,
            status: status.to_string(),
            material: material.to_string(),
            entities: entities.len(),
            rebound,
        })
    }

    /// Sync every zone of every bed, in bed order then A, B, C
    pub fn sync_all(&self, ctx: &mut EditContext<'_>) -> Result<Vec<ZoneSync>> {
        let beds = zones::beds(&ctx.view())?;
        let mut synced = Vec::with_capacity(beds.len() * ZoneLetter::ALL.len());
        for bed in beds {
            for letter in ZoneLetter::ALL {
                let zone = ZoneId::new(bed, letter);
                let status = self.zone_status(&ctx.view(), zone)?;
                synced.push(self.sync_zone(ctx, zone, &status)?);
            }
        }
        let rebound: usize = synced.iter().map(|s| s.rebound).sum();
        log::info!("Synced {} zone(s), {} binding(s) rewritten", synced.len(), rebound);
        Ok(synced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_classification() {
        assert!(is_healthy_status("ok"));
        assert!(!is_healthy_status("dry"));
        assert!(!is_healthy_status("stressed"));
        assert!(!is_healthy_status("mystery"));
        assert!(!is_healthy_status("OK"));
    }
}
