//! Data types shared by the aggregation pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::category::CategoryId;
use crate::time::DmgTime;

/// A single measured count: one entity, one fifteen-minute slot, one category.
///
/// The upstream store never materializes zero counts, so a missing
/// observation means zero, not missing data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Station code (`100E`) or screenline code, depending on the report level.
    pub entity: String,
    pub direction: char,
    /// End of the fifteen-minute slot.
    pub time: DmgTime,
    pub category_id: CategoryId,
    pub count: u32,
}

/// Whether a report is built per station or per screenline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityLevel {
    Station,
    Screenline,
}

impl EntityLevel {
    /// Leading header column naming the entity.
    pub fn column_label(self) -> &'static str {
        match self {
            EntityLevel::Station => "Station",
            EntityLevel::Screenline => "Sline",
        }
    }
}

/// The two report flavours a user can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// One row per entity and direction, summed over the whole window.
    TotalVolume,
    /// One row per entity, direction and fifteen-minute slot.
    FifteenMinute,
}

impl ReportKind {
    pub fn granularity(self) -> Granularity {
        match self {
            ReportKind::TotalVolume => Granularity::PerEntity,
            ReportKind::FifteenMinute => Granularity::PerEntityAndTime,
        }
    }
}

/// How finely observations are grouped before summing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    PerEntity,
    PerEntityAndTime,
}

/// Grouping key of one report row.
///
/// Field order gives the row order: entity, then time, then direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub entity: String,
    /// Only set for [`Granularity::PerEntityAndTime`].
    pub time: Option<DmgTime>,
    pub direction: char,
}

impl GroupKey {
    pub fn for_observation(observation: &Observation, granularity: Granularity) -> Self {
        let time = match granularity {
            Granularity::PerEntity => None,
            Granularity::PerEntityAndTime => Some(observation.time),
        };
        Self {
            entity: observation.entity.clone(),
            time,
            direction: observation.direction,
        }
    }
}

/// Compass directions a station can face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Direction {
    pub abbreviation: char,
    pub compass: &'static str,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.abbreviation, self.compass)
    }
}

pub const DIRECTIONS: [Direction; 4] = [
    Direction { abbreviation: 'N', compass: "North" },
    Direction { abbreviation: 'S', compass: "South" },
    Direction { abbreviation: 'E', compass: "East" },
    Direction { abbreviation: 'W', compass: "West" },
];

/// Abbreviations of every known direction.
pub fn all_directions() -> Vec<char> {
    DIRECTIONS.iter().map(|d| d.abbreviation).collect()
}
