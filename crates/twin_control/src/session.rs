//! Twin session - open, mutate the live layer, save once
//!
//! Every tool invocation follows the same discipline: open the stack from the
//! root manifest, locate the live layer, run one operation through an edit
//! target, and save the live layer. No other layer file is ever written.

use chrono::{DateTime, Utc};

use twin_scene::{EditContext, EditLog, LayerId, NodePath, SceneView, Stage};

use crate::config::TwinConfig;
use crate::error::{ControlError, Result};
use crate::materials::{MaterialSync, ZoneSync};
use crate::recommend::{ApplyReport, RecommendationApplier, RecommendationBatch};
use crate::rules::{EvaluationReport, RuleEvaluator};
use crate::schema::{attr, ZoneId, ZoneStatus};
use crate::snapshot::ContextSnapshot;
use crate::update::StateUpdate;

/// An open greenhouse twin
pub struct Twin {
    config: TwinConfig,
    stage: Stage,
    live: LayerId,
}

impl Twin {
    /// Open the store named by the configuration
    ///
    /// Fails if no layer in the stack matches the live-layer fragment.
    pub fn open(config: TwinConfig) -> Result<Self> {
        let stage = Stage::open(&config.store.root)?;
        Self::from_stage(config, stage)
    }

    /// Wrap an already-open stage
    pub fn from_stage(config: TwinConfig, stage: Stage) -> Result<Self> {
        let live = stage
            .find_layer(&config.store.live_layer)
            .ok_or_else(|| ControlError::LiveLayerNotFound {
                fragment: config.store.live_layer.clone(),
            })?;
        log::info!("Editing layer: {}", live);
        Ok(Self { config, stage, live })
    }

    pub fn config(&self) -> &TwinConfig {
        &self.config
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Composed view of the whole stack
    pub fn view(&self) -> SceneView<'_> {
        self.stage.view()
    }

    /// The live layer
    pub fn live_layer(&self) -> &LayerId {
        &self.live
    }

    /// Run `f` with the live layer as edit target
    pub fn edit<T>(&mut self, f: impl FnOnce(&mut EditContext<'_>) -> Result<T>) -> Result<(T, EditLog)> {
        let live = self.live.clone();
        self.stage.with_edit_target(&live, f)
    }

    /// Run the control rules once
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> Result<(EvaluationReport, EditLog)> {
        let config = self.config.clone();
        self.edit(|ctx| RuleEvaluator::new(&config).evaluate(ctx, now))
    }

    /// Apply external recommendations
    pub fn apply(&mut self, batch: &RecommendationBatch, now: DateTime<Utc>) -> Result<(ApplyReport, EditLog)> {
        let config = self.config.clone();
        self.edit(|ctx| RecommendationApplier::new(&config).apply(ctx, batch, now))
    }

    /// Rebind plant materials of every zone from its current status
    pub fn sync_all(&mut self) -> Result<(Vec<ZoneSync>, EditLog)> {
        let config = self.config.clone();
        self.edit(|ctx| MaterialSync::new(&config).sync_all(ctx))
    }

    /// Rebind one zone's plants, optionally setting its status first
    ///
    /// Without a status the zone's current status is used. Setting a status
    /// requires the zone node to exist.
    pub fn sync_zone(&mut self, zone: ZoneId, status: Option<ZoneStatus>) -> Result<(ZoneSync, EditLog)> {
        let config = self.config.clone();
        self.edit(|ctx| {
            let sync = MaterialSync::new(&config);
            let status = match status {
                Some(status) => {
                    let path = zone.path()?;
                    if !ctx.view().exists(&path) {
                        return Err(ControlError::MissingNode(path));
                    }
                    ctx.set_attribute(&path, attr::ZONE_STATUS, status.as_str())?;
                    status.as_str().to_string()
                }
                None => sync.zone_status(&ctx.view(), zone)?,
            };
            sync.sync_zone(ctx, zone, &status)
        })
    }

    /// Plants currently in a zone
    pub fn zone_entities(&self, zone: ZoneId) -> Result<Vec<NodePath>> {
        self.config
            .zones
            .entities_in_zone(&self.view(), zone.bed, zone.letter)
    }

    /// Write operator-supplied state
    pub fn update(&mut self, update: &StateUpdate) -> Result<(Vec<String>, EditLog)> {
        self.edit(|ctx| update.apply(ctx))
    }

    /// Sensor, device and zone context from the composed store
    pub fn snapshot(&self) -> Result<ContextSnapshot> {
        ContextSnapshot::from_view(&self.view(), &self.config)
    }

    /// Check if the live layer has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.stage
            .stack()
            .get(&self.live)
            .is_some_and(|layer| layer.is_dirty())
    }

    /// Save the live layer if it changed
    ///
    /// Returns whether a file was written.
    pub fn save(&mut self) -> Result<bool> {
        if !self.is_dirty() {
            log::info!("No changes to {}", self.live);
            return Ok(false);
        }
        self.stage.save_layer(&self.live)?;
        Ok(true)
    }
}
