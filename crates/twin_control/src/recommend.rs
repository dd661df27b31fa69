//! External recommendations
//!
//! A reasoning collaborator proposes actions as JSON. Well-formed
//! `set_*` actions become actuator writes through the same write path as the
//! control rules; alerts and no-ops are only logged. Entries that cannot be
//! understood are skipped with a reason.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;

use twin_scene::EditContext;

use crate::config::TwinConfig;
use crate::error::{ControlError, Result};
use crate::materials::{MaterialSync, ZoneSync};
use crate::rules::{self, write_actuator};
use crate::schema::Device;

/// Recommended action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    SetFan,
    SetVent,
    SetValve,
    SendAlert,
    NoAction,
}

impl Action {
    /// Actuator driven by this action
    pub fn device(self) -> Option<Device> {
        match self {
            Self::SetFan => Some(Device::Fan),
            Self::SetVent => Some(Device::Vent),
            Self::SetValve => Some(Device::Valve),
            Self::SendAlert | Self::NoAction => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SetFan => "set_fan",
            Self::SetVent => "set_vent",
            Self::SetValve => "set_valve",
            Self::SendAlert => "send_alert",
            Self::NoAction => "no_action",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: Action,
    #[serde(default)]
    pub value: Option<f64>,
    /// Rationale
    #[serde(default, alias = "rationale", deserialize_with = "lenient_why")]
    pub why: String,
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: f64,
}

// Rationale and confidence are advisory; a bad one must not cost the action.
fn lenient_why<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(why) => why,
        serde_json::Value::Null => String::new(),
        other => {
            log::warn!("Ignoring non-string rationale {}", other);
            String::new()
        }
    })
}

fn lenient_confidence<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or_default(),
        serde_json::Value::Null => 0.0,
        other => {
            log::warn!("Ignoring non-numeric confidence {}", other);
            0.0
        }
    })
}

/// An entry that was not applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skipped {
    /// Position in the input list
    pub index: usize,
    pub reason: String,
}

/// Parsed recommendation document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecommendationBatch {
    pub explanation: Option<String>,
    pub recommendations: Vec<(usize, Recommendation)>,
    /// Entries rejected while parsing
    pub skipped: Vec<Skipped>,
}

impl RecommendationBatch {
    /// Build a batch from already-typed recommendations
    pub fn from_recommendations(recommendations: impl IntoIterator<Item = Recommendation>) -> Self {
        Self {
            explanation: None,
            recommendations: recommendations.into_iter().enumerate().collect(),
            skipped: Vec::new(),
        }
    }

    /// Parse a bare array or an object with `recommendations`
    pub fn from_json_str(text: &str) -> Result<Self> {
        let document: serde_json::Value = serde_json::from_str(text)?;
        let (explanation, items) = match document {
            serde_json::Value::Array(items) => (None, items),
            serde_json::Value::Object(mut map) => {
                let explanation = map
                    .remove("explanation")
                    .and_then(|e| e.as_str().map(str::to_string));
                let items = match map.remove("recommendations") {
                    Some(serde_json::Value::Array(items)) => items,
                    None | Some(serde_json::Value::Null) => Vec::new(),
                    Some(_) => {
                        return Err(ControlError::MalformedInput(
                            "\"recommendations\" must be an array".to_string(),
                        ))
                    }
                };
                (explanation, items)
            }
            _ => {
                return Err(ControlError::MalformedInput(
                    "expected an array of recommendations or an object with \"recommendations\""
                        .to_string(),
                ))
            }
        };

        let mut batch = Self {
            explanation,
            ..Self::default()
        };
        for (index, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<Recommendation>(item) {
                Ok(rec) => batch.recommendations.push((index, rec)),
                Err(e) => {
                    log::warn!("Skipping recommendation #{}: {}", index, e);
                    batch.skipped.push(Skipped {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(batch)
    }

    /// Read and parse a recommendation file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ControlError::InputRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

/// What the applier did with one recommendation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Applied {
    pub index: usize,
    pub action: Action,
    pub description: String,
}

/// Outcome of applying a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyReport {
    pub applied: Vec<Applied>,
    pub skipped: Vec<Skipped>,
    pub tick: i64,
    pub last_updated: String,
    pub materials: Vec<ZoneSync>,
}

impl ApplyReport {
    /// Human-readable action lines
    pub fn summary(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.applied.iter().map(|a| a.description.clone()).collect();
        lines.extend(
            self.skipped
                .iter()
                .map(|s| format!("skipped #{}: {}", s.index, s.reason)),
        );
        lines.push(format!("state:tick = {}", self.tick));
        lines.extend(
            self.materials
                .iter()
                .filter(|z| z.rebound > 0)
                .map(ZoneSync::to_string),
        );
        lines
    }
}

/// Maps recommendations onto live-layer writes
pub struct RecommendationApplier<'c> {
    config: &'c TwinConfig,
}

impl<'c> RecommendationApplier<'c> {
    /// Create an applier
    pub fn new(config: &'c TwinConfig) -> Self {
        Self { config }
    }

    /// Apply a batch, then advance the tick and resync materials
    pub fn apply(
        &self,
        ctx: &mut EditContext<'_>,
        batch: &RecommendationBatch,
        now: DateTime<Utc>,
    ) -> Result<ApplyReport> {
        rules::require_devices(&ctx.view())?;
        if let Some(explanation) = &batch.explanation {
            log::info!("Recommendation rationale: {}", explanation);
        }

        let mut applied = Vec::new();
        let mut skipped = batch.skipped.clone();
        for (index, rec) in &batch.recommendations {
            let index = *index;
            match (rec.action.device(), rec.value) {
                (None, _) => {
                    let why = if rec.why.is_empty() { "no reason" } else { rec.why.as_str() };
                    log::info!("{}: {}", rec.action, why);
                    applied.push(Applied {
                        index,
                        action: rec.action,
                        description: format!("{}: {}", rec.action, why),
                    });
                }
                (Some(_), None) => {
                    log::warn!("Skipping {} #{} without a value", rec.action, index);
                    skipped.push(Skipped {
                        index,
                        reason: format!("{} has no value", rec.action),
                    });
                }
                (Some(device), Some(level)) if !level.is_finite() => {
                    log::warn!("Skipping {} #{}: non-finite level", rec.action, index);
                    skipped.push(Skipped {
                        index,
                        reason: format!("{} level {} is not finite", device, level),
                    });
                }
                (Some(device), Some(level)) => {
                    write_actuator(ctx, device, level)?;
                    let attribute = device.level_attribute().unwrap_or_default();
                    applied.push(Applied {
                        index,
                        action: rec.action,
                        description: format!("{} {} = {}", device, attribute, level),
                    });
                }
            }
        }
        skipped.sort_by_key(|s| s.index);

        let (tick, last_updated) = rules::stamp_update(ctx, now)?;
        let materials = MaterialSync::new(self.config).sync_all(ctx)?;
        log::info!(
            "Applied {} recommendation(s), skipped {}",
            applied.len(),
            skipped.len()
        );

        Ok(ApplyReport {
            applied,
            skipped,
            tick,
            last_updated,
            materials,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_array() {
        let batch = RecommendationBatch::from_json_str(
            r#"[{"action": "set_fan", "value": 0.6, "why": "humid", "confidence": 0.9}]"#,
        )
        .unwrap();
        assert_eq!(batch.explanation, None);
        assert_eq!(batch.recommendations.len(), 1);
        let (index, rec) = &batch.recommendations[0];
        assert_eq!(*index, 0);
        assert_eq!(rec.action, Action::SetFan);
        assert_eq!(rec.value, Some(0.6));
        assert_eq!(rec.why, "humid");
    }

    #[test]
    fn test_object_with_malformed_entries() {
        let batch = RecommendationBatch::from_json_str(
            r#"{
                "explanation": "Bed 3 is drying out",
                "recommendations": [
                    {"action": "set_valve", "value": 1.0},
                    {"action": "open_window", "value": 1.0},
                    {"value": 0.2},
                    {"action": "send_alert", "value": null, "rationale": "check B03-C"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(batch.explanation.as_deref(), Some("Bed 3 is drying out"));
        let indices: Vec<usize> = batch.recommendations.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 3]);
        assert_eq!(batch.recommendations[1].1.why, "check B03-C");
        let skipped: Vec<usize> = batch.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![1, 2]);
    }

    #[test]
    fn test_bad_rationale_or_confidence_keeps_action() {
        let batch = RecommendationBatch::from_json_str(
            r#"[
                {"action": "set_fan", "value": 0.6, "why": null, "confidence": 0.9},
                {"action": "set_valve", "value": 1.0, "why": "dry", "confidence": "high"},
                {"action": "set_vent", "value": 20.0, "why": 7, "confidence": null},
                {"action": "set_fan", "value": "fast"}
            ]"#,
        )
        .unwrap();

        let kept: Vec<(usize, Action, Option<f64>)> = batch
            .recommendations
            .iter()
            .map(|(i, rec)| (*i, rec.action, rec.value))
            .collect();
        assert_eq!(
            kept,
            vec![
                (0, Action::SetFan, Some(0.6)),
                (1, Action::SetValve, Some(1.0)),
                (2, Action::SetVent, Some(20.0)),
            ]
        );
        assert_eq!(batch.recommendations[0].1.why, "");
        assert_eq!(batch.recommendations[0].1.confidence, 0.9);
        assert_eq!(batch.recommendations[1].1.why, "dry");
        assert_eq!(batch.recommendations[1].1.confidence, 0.0);
        assert_eq!(batch.recommendations[2].1.why, "");
        let skipped: Vec<usize> = batch.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![3]);
    }

    #[test]
    fn test_wrong_document_shape() {
        let err = RecommendationBatch::from_json_str("42").unwrap_err();
        assert!(matches!(err, ControlError::MalformedInput(_)));
        let err = RecommendationBatch::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ControlError::InputParse(_)));
        let empty = RecommendationBatch::from_json_str(r#"{"explanation": "all fine"}"#).unwrap();
        assert!(empty.recommendations.is_empty());
    }
}
