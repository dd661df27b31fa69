//! Greenhouse scene schema
//!
//! Node paths, attribute names and the small value types (zone letters,
//! zone ids, zone statuses, devices) shared by every control operation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use twin_scene::NodePath;

use crate::error::{ControlError, Result};

/// Root of the greenhouse
pub const GREENHOUSE: &str = "/World/Environment/Greenhouse";
/// Scope holding sensors and actuators
pub const DEVICES: &str = "/World/Environment/Greenhouse/Devices";
/// Scope holding the beds
pub const PLANTS: &str = "/World/Environment/Greenhouse/Plants";
/// Scope holding materials
pub const LOOKS: &str = "/World/Looks";

/// Attribute names
pub mod attr {
    pub const TEMPERATURE: &str = "sensor:temperatureC";
    pub const HUMIDITY: &str = "sensor:humidityPct";
    pub const SOIL_MOISTURE: &str = "sensor:soilMoisturePct";

    pub const POWER: &str = "device:power";
    pub const POSITION: &str = "device:position";
    pub const FLOW: &str = "device:flow";
    pub const ENABLED: &str = "device:enabled";

    pub const TICK: &str = "state:tick";
    pub const LAST_UPDATED: &str = "state:lastUpdated";

    pub const ZONE_MOISTURE: &str = "zone:soilMoisturePct";
    pub const ZONE_LIGHT: &str = "zone:lightPct";
    pub const ZONE_HEALTH: &str = "zone:healthScore";
    pub const ZONE_STATUS: &str = "zone:status";
    pub const ZONE_ID: &str = "zone:id";

    pub const TRANSFORM: &str = "xformOp:transform";
    pub const MATERIAL_BINDING: &str = "material:binding";
}

/// Plant nodes are bed children with this name prefix
pub const PLANT_PREFIX: &str = "Plant_";

/// Largest bed number a two-digit zone id can name
pub const MAX_BED_COUNT: u32 = 99;
const BED_PREFIX: &str = "Bed_";

/// Path of the device scope
pub fn devices_path() -> Result<NodePath> {
    Ok(NodePath::parse(DEVICES)?)
}

/// Path of the bed scope
pub fn plants_path() -> Result<NodePath> {
    Ok(NodePath::parse(PLANTS)?)
}

/// Name of bed `bed` (`Bed_03`)
pub fn bed_name(bed: u32) -> String {
    format!("{}{:02}", BED_PREFIX, bed)
}

/// Path of bed `bed`
pub fn bed_path(bed: u32) -> Result<NodePath> {
    Ok(plants_path()?.child(&bed_name(bed))?)
}

/// Bed number of a `Bed_NN` node name
pub fn parse_bed_name(name: &str) -> Option<u32> {
    name.strip_prefix(BED_PREFIX)?.parse().ok()
}

/// Check if a node name denotes a plant
pub fn is_plant_name(name: &str) -> bool {
    name.starts_with(PLANT_PREFIX)
}

/// Zone band along a bed, in increasing position order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ZoneLetter {
    A,
    B,
    C,
}

impl ZoneLetter {
    /// All letters in band order
    pub const ALL: [ZoneLetter; 3] = [Self::A, Self::B, Self::C];

    /// Letter as a character
    pub fn as_char(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
        }
    }
}

impl fmt::Display for ZoneLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for ZoneLetter {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            _ => Err(ControlError::InvalidZoneId(s.to_string())),
        }
    }
}

/// Composite zone key rendered as `B<NN>-<L>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ZoneId {
    pub bed: u32,
    pub letter: ZoneLetter,
}

fn zone_id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^B(\d{2})-([ABC])$").ok())
        .as_ref()
}

impl ZoneId {
    /// Create a zone id
    pub fn new(bed: u32, letter: ZoneLetter) -> Self {
        Self { bed, letter }
    }

    /// Parse `B03-C` (case-insensitive, surrounding whitespace ignored)
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || ControlError::InvalidZoneId(s.to_string());
        let normalized = s.trim().to_ascii_uppercase();
        let caps = zone_id_pattern()
            .and_then(|re| re.captures(&normalized))
            .ok_or_else(invalid)?;
        let bed = caps[1].parse().map_err(|_| invalid())?;
        let letter = caps[2].parse()?;
        Ok(Self { bed, letter })
    }

    /// Path of the zone node
    pub fn path(&self) -> Result<NodePath> {
        Ok(bed_path(self.bed)?
            .child("Zones")?
            .child(&format!("Zone_{}", self.letter))?)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{:02}-{}", self.bed, self.letter)
    }
}

impl FromStr for ZoneId {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ZoneId {
    type Error = ControlError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<ZoneId> for String {
    fn from(id: ZoneId) -> Self {
        id.to_string()
    }
}

/// Zone health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneStatus {
    Ok,
    Dry,
    Wet,
    Shaded,
    Stressed,
}

impl ZoneStatus {
    /// Status as stored in `zone:status`
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Dry => "dry",
            Self::Wet => "wet",
            Self::Shaded => "shaded",
            Self::Stressed => "stressed",
        }
    }

    /// Only `ok` counts as healthy
    pub fn is_healthy(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for ZoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZoneStatus {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ok" => Ok(Self::Ok),
            "dry" => Ok(Self::Dry),
            "wet" => Ok(Self::Wet),
            "shaded" => Ok(Self::Shaded),
            "stressed" => Ok(Self::Stressed),
            _ => Err(ControlError::InvalidStatus(s.to_string())),
        }
    }
}

/// Sensors and actuators under the device scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    Sensor,
    Fan,
    Vent,
    Valve,
}

impl Device {
    /// Every device, sensor first
    pub const ALL: [Device; 4] = [Self::Sensor, Self::Fan, Self::Vent, Self::Valve];

    /// Node name
    pub fn name(self) -> &'static str {
        match self {
            Self::Sensor => "Sensor_01",
            Self::Fan => "Fan_01",
            Self::Vent => "Vent_01",
            Self::Valve => "Valve_01",
        }
    }

    /// Node type name
    pub fn kind(self) -> &'static str {
        match self {
            Self::Sensor => "Sensor",
            Self::Fan => "Fan",
            Self::Vent => "Vent",
            Self::Valve => "Valve",
        }
    }

    /// Attribute holding the actuator level; `None` for the sensor
    pub fn level_attribute(self) -> Option<&'static str> {
        match self {
            Self::Sensor => None,
            Self::Fan => Some(attr::POWER),
            Self::Vent => Some(attr::POSITION),
            Self::Valve => Some(attr::FLOW),
        }
    }

    /// Path of the device node
    pub fn path(self) -> Result<NodePath> {
        Ok(devices_path()?.child(self.name())?)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_id_parse_and_render() {
        let id = ZoneId::parse("B03-C").unwrap();
        assert_eq!(id, ZoneId::new(3, ZoneLetter::C));
        assert_eq!(id.to_string(), "B03-C");
        assert_eq!(ZoneId::parse("  b01-a ").unwrap(), ZoneId::new(1, ZoneLetter::A));
        assert_eq!(
            id.path().unwrap().as_str(),
            "/World/Environment/Greenhouse/Plants/Bed_03/Zones/Zone_C"
        );
    }

    #[test]
    fn test_zone_id_rejects_malformed() {
        for bad in ["B3-C", "B03-D", "B03C", "03-C", "B003-C", ""] {
            let err = ZoneId::parse(bad).unwrap_err();
            assert!(matches!(err, ControlError::InvalidZoneId(_)), "{bad}");
        }
    }

    #[test]
    fn test_zone_id_serde_as_string() {
        let json = serde_json::to_string(&ZoneId::new(2, ZoneLetter::B)).unwrap();
        assert_eq!(json, "\"B02-B\"");
        assert!(serde_json::from_str::<ZoneId>("\"B2-B\"").is_err());
    }

    #[test]
    fn test_status_round_trip() {
        for status in ["ok", "dry", "wet", "shaded", "stressed"] {
            assert_eq!(status.parse::<ZoneStatus>().unwrap().as_str(), status);
        }
        assert!("Dry".parse::<ZoneStatus>().is_err());
        assert!(ZoneStatus::Ok.is_healthy());
        assert!(!ZoneStatus::Shaded.is_healthy());
    }

    #[test]
    fn test_bed_names() {
        assert_eq!(bed_name(4), "Bed_04");
        assert_eq!(parse_bed_name("Bed_04"), Some(4));
        assert_eq!(parse_bed_name("Bed_x"), None);
        assert_eq!(parse_bed_name("Bench_01"), None);
        assert!(is_plant_name("Plant_01_A_003"));
        assert!(!is_plant_name("BedMesh"));
    }

    #[test]
    fn test_device_paths() {
        assert_eq!(
            Device::Valve.path().unwrap().as_str(),
            "/World/Environment/Greenhouse/Devices/Valve_01"
        );
        assert_eq!(Device::Fan.level_attribute(), Some(attr::POWER));
        assert_eq!(Device::Sensor.level_attribute(), None);
    }
}
