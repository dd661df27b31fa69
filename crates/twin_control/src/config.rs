//! Twin configuration
//!
//! An explicit [`TwinConfig`] is passed to every entry point; nothing is read
//! from process-wide state once it is loaded.
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Explicit path (`--config`)
//! 2. Environment variable: `GREENHOUSE_TWIN_CONFIG`
//! 3. `twin.toml` in the working directory
//! 4. Built-in defaults
//!
//! `GREENHOUSE_TWIN_ROOT` overrides the store root of whichever source won.
//!
//! # Example Config File
//!
//! ```toml
//! [store]
//! root = "greenhouse/greenhouse.json"
//! live_layer = "live_state"
//!
//! [zones]
//! bed_length = 16.0
//! lower_edge = -2.67
//! upper_edge = 2.67
//! terminal_tolerance = 0.1
//!
//! [rules]
//! humidity_high = 80.0
//! dry_moisture = 30.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ControlError, Result};
use crate::zones::ZoneGeometry;

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "GREENHOUSE_TWIN_CONFIG";
/// Environment variable overriding the store root
pub const ROOT_ENV: &str = "GREENHOUSE_TWIN_ROOT";
/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "twin.toml";

/// Where the store lives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root manifest
    pub root: PathBuf,
    /// Fragment identifying the live layer
    pub live_layer: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("greenhouse/greenhouse.json"),
            live_layer: "live_state".to_string(),
        }
    }
}

/// Control rule thresholds and set points
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    /// Humidity above which the fan and vent open
    pub humidity_high: f64,
    /// Fan power when humid
    pub fan_power_humid: f64,
    /// Fan power otherwise
    pub fan_power_idle: f64,
    /// Vent position when humid
    pub vent_position_humid: f64,
    /// Zone moisture below which a zone is dry
    pub dry_moisture: f64,
    /// Zone light below which a zone is shaded
    pub shaded_light: f64,
    /// Valve flow when any zone is dry
    pub valve_open: f64,
    /// Valve flow when no zone is dry
    pub valve_closed: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            humidity_high: 80.0,
            fan_power_humid: 0.4,
            fan_power_idle: 0.0,
            vent_position_humid: 20.0,
            dry_moisture: 30.0,
            shaded_light: 40.0,
            valve_open: 1.0,
            valve_closed: 0.0,
        }
    }
}

/// Material references for plant health
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    pub healthy: String,
    pub unhealthy: String,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            healthy: "/World/Looks/PlantMat".to_string(),
            unhealthy: "/World/Looks/UnhealthyPlantMat".to_string(),
        }
    }
}

impl MaterialConfig {
    /// Material for a health state
    pub fn for_health(&self, healthy: bool) -> &str {
        if healthy {
            &self.healthy
        } else {
            &self.unhealthy
        }
    }
}

/// Values assumed when a reading is absent from the store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub soil_moisture_pct: f64,
    pub zone_moisture_pct: f64,
    pub zone_light_pct: f64,
    pub zone_health_score: f64,
    pub actuator_level: f64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            temperature_c: 22.0,
            humidity_pct: 50.0,
            soil_moisture_pct: 40.0,
            zone_moisture_pct: 40.0,
            zone_light_pct: 70.0,
            zone_health_score: 0.8,
            actuator_level: 0.0,
        }
    }
}

/// Complete twin configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TwinConfig {
    pub store: StoreConfig,
    pub zones: ZoneGeometry,
    pub rules: RuleThresholds,
    pub materials: MaterialConfig,
    pub defaults: Defaults,
    /// File the config was loaded from
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl TwinConfig {
    /// Load configuration from all sources
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let requested = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match requested {
            Some(path) => Self::load_from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::load_from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                log::debug!("No config file; using defaults");
                Self::default()
            }
        };

        if let Some(root) = std::env::var_os(ROOT_ENV) {
            config.store.root = PathBuf::from(root);
            log::info!("Store root from env: {:?}", config.store.root);
        }
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ControlError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|source| ControlError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.config_path = Some(path.to_path_buf());
        config.validate()?;
        log::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the store or the zone ids cannot represent
    pub fn validate(&self) -> Result<()> {
        self.zones.validate()?;

        let r = &self.rules;
        let d = &self.defaults;
        let numbers = [
            ("rules.humidity_high", r.humidity_high),
            ("rules.fan_power_humid", r.fan_power_humid),
            ("rules.fan_power_idle", r.fan_power_idle),
            ("rules.vent_position_humid", r.vent_position_humid),
            ("rules.dry_moisture", r.dry_moisture),
            ("rules.shaded_light", r.shaded_light),
            ("rules.valve_open", r.valve_open),
            ("rules.valve_closed", r.valve_closed),
            ("defaults.temperature_c", d.temperature_c),
            ("defaults.humidity_pct", d.humidity_pct),
            ("defaults.soil_moisture_pct", d.soil_moisture_pct),
            ("defaults.zone_moisture_pct", d.zone_moisture_pct),
            ("defaults.zone_light_pct", d.zone_light_pct),
            ("defaults.zone_health_score", d.zone_health_score),
            ("defaults.actuator_level", d.actuator_level),
        ];
        if let Some((name, value)) = numbers.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ControlError::InvalidConfig(format!(
                "{} must be finite, got {}",
                name, value
            )));
        }
        Ok(())
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
