//! # Twin Control - Greenhouse Digital Twin
//!
//! Greenhouse semantics on top of the layered scene store. Devices, beds,
//! zones and plants live in the composed scene; every control tool writes
//! only to the live layer.
//!
//! ## Architecture
//!
//! ```text
//! Sensor ──► RuleEvaluator ──┐
//!                            ├──► write_actuator ──► live layer
//! JSON ──► Recommendations ──┘          │
//!                                       ▼
//! zone:status ──► MaterialSync ──► material:binding (per plant, per zone)
//! ```
//!
//! ## Key Concepts
//!
//! - **Zones**: A, B, C bands along each bed; membership is computed from position
//! - **Twin**: One session: open the stack, edit the live layer, save it
//! - **Snapshot**: Sensor, device and zone context for external reasoning

pub mod config;
pub mod error;
pub mod inspect;
pub mod materials;
pub mod recommend;
pub mod rules;
pub mod scaffold;
pub mod schema;
pub mod session;
pub mod snapshot;
pub mod update;
pub mod zones;

pub use config::{Defaults, MaterialConfig, RuleThresholds, StoreConfig, TwinConfig};
pub use error::{ControlError, Result};
pub use materials::{MaterialSync, ZoneSync};
pub use recommend::{Action, ApplyReport, Recommendation, RecommendationApplier, RecommendationBatch};
pub use rules::{EvaluationReport, RuleEvaluator};
pub use scaffold::scaffold;
pub use schema::{Device, ZoneId, ZoneLetter, ZoneStatus};
pub use session::Twin;
pub use snapshot::ContextSnapshot;
pub use update::StateUpdate;
pub use zones::{Axis, ZoneGeometry};
