//! Zone geometry
//!
//! Zone membership is never stored. An entity belongs to the zone whose band
//! along the bed axis contains its position:
//!
//! ```text
//!   -len/2        lower_edge        upper_edge        len/2 (+tolerance)
//!     |------ A ------|------- B -------|------ C ------|
//! ```
//!
//! A position on the A/B edge belongs to B, and B includes its upper edge.
//! C absorbs positions up to `terminal_tolerance` past the bed end.

use serde::{Deserialize, Serialize};

use twin_scene::{NodePath, SceneView, Transform};

use crate::error::{ControlError, Result};
use crate::schema::{self, attr, ZoneLetter};

/// Spatial axis of a bed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Component index in a translation vector
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// The zone boundary table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneGeometry {
    /// Axis the bed extends along
    pub axis: Axis,
    /// Bed length, centred on the bed origin
    pub bed_length: f64,
    /// Edge between bands A and B
    pub lower_edge: f64,
    /// Edge between bands B and C
    pub upper_edge: f64,
    /// Slack past the bed end still counted as C
    pub terminal_tolerance: f64,
    /// Number of beds authored by the scaffold
    pub bed_count: u32,
}

impl Default for ZoneGeometry {
    fn default() -> Self {
        Self {
            axis: Axis::Z,
            bed_length: 16.0,
            lower_edge: -2.67,
            upper_edge: 2.67,
            terminal_tolerance: 0.1,
            bed_count: 8,
        }
    }
}

impl ZoneGeometry {
    /// Lower end of the bed
    pub fn start(&self) -> f64 {
        -self.bed_length / 2.0
    }

    /// Upper end of the bed
    pub fn end(&self) -> f64 {
        self.bed_length / 2.0
    }

    /// Check that the bands are ordered and the bed count fits zone ids
    ///
    /// Requires `start < lower_edge <= upper_edge < end`, a non-negative
    /// tolerance and between 1 and 99 beds.
    pub fn validate(&self) -> Result<()> {
        let invalid =
            |reason: String| Err(ControlError::InvalidConfig(format!("zones: {}", reason)));
        let values = [
            self.bed_length,
            self.lower_edge,
            self.upper_edge,
            self.terminal_tolerance,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return invalid("geometry values must be finite".to_string());
        }
        if !(self.start() < self.lower_edge
            && self.lower_edge <= self.upper_edge
            && self.upper_edge < self.end())
        {
            return invalid(format!(
                "expected {} < lower_edge ({}) <= upper_edge ({}) < {}",
                self.start(),
                self.lower_edge,
                self.upper_edge,
                self.end()
            ));
        }
        if self.terminal_tolerance < 0.0 {
            return invalid(format!(
                "terminal_tolerance {} is negative",
                self.terminal_tolerance
            ));
        }
        if self.bed_count == 0 || self.bed_count > schema::MAX_BED_COUNT {
            return invalid(format!(
                "bed_count {} outside 1..={}",
                self.bed_count,
                schema::MAX_BED_COUNT
            ));
        }
        Ok(())
    }

    /// Zone containing a bed-local position, `None` outside the bed
    pub fn zone_of(&self, position: f64) -> Option<ZoneLetter> {
        if position < self.start() {
            None
        } else if position < self.lower_edge {
            Some(ZoneLetter::A)
        } else if position <= self.upper_edge {
            Some(ZoneLetter::B)
        } else if position <= self.end() + self.terminal_tolerance {
            Some(ZoneLetter::C)
        } else {
            None
        }
    }

    /// Zone containing the translation of a transform
    pub fn zone_of_transform(&self, transform: &Transform) -> Option<ZoneLetter> {
        self.zone_of(transform.translation()[self.axis.index()])
    }

    /// Entities of a bed whose position falls in a zone
    ///
    /// Only `Plant_*` children with a transform are considered. A bed missing
    /// from the scene has no entities.
    pub fn entities_in_zone(
        &self,
        view: &SceneView<'_>,
        bed: u32,
        letter: ZoneLetter,
    ) -> Result<Vec<NodePath>> {
        let bed_path = schema::bed_path(bed)?;
        if !view.exists(&bed_path) {
            log::debug!("{} not in scene; zone {} is empty", bed_path, letter);
            return Ok(Vec::new());
        }

        let mut entities = Vec::new();
        for child in view.children(&bed_path) {
            if !schema::is_plant_name(child.name()) {
                continue;
            }
            let Some(transform) = view.get_transform(&child, attr::TRANSFORM)? else {
                continue;
            };
            if self.zone_of_transform(&transform) == Some(letter) {
                entities.push(child);
            }
        }
        Ok(entities)
    }
}

/// Bed numbers present in the composed scene, ascending
pub fn beds(view: &SceneView<'_>) -> Result<Vec<u32>> {
    let plants = schema::plants_path()?;
    let mut beds: Vec<u32> = view
        .children(&plants)
        .iter()
        .filter_map(|child| schema::parse_bed_name(child.name()))
        .collect();
    beds.sort_unstable();
    beds.dedup();
    Ok(beds)
}
