//! Expected-record checksums.
//!
//! A report row carries the number of stations that should feed it and the
//! number of fifteen-minute records those stations should have produced.
//! Comparing those against site expectations is left to the reader of the
//! report.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::analyzers::types::GroupKey;
use crate::error::Result;
use crate::time::{DmgTime, interval_count};

/// One station's membership in a screenline for a survey.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenlineMember {
    pub screenline: String,
    pub station: String,
    pub direction: char,
}

/// Coverage figures reported alongside a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checksum {
    pub units: u32,
    pub expected_records: u64,
}

/// Number of stations contributing to each report entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coverage {
    /// A station only ever covers itself.
    Station,
    /// Distinct member stations keyed by screenline and direction.
    Screenline(HashMap<(String, char), u32>),
}

impl Coverage {
    /// Counts distinct stations per screenline and direction.
    pub fn from_members<I>(members: I) -> Self
    where
        I: IntoIterator<Item = ScreenlineMember>,
    {
        let distinct: HashSet<ScreenlineMember> = members.into_iter().collect();
        let mut units: HashMap<(String, char), u32> = HashMap::new();
        for member in distinct {
            *units.entry((member.screenline, member.direction)).or_default() += 1;
        }
        Coverage::Screenline(units)
    }

    /// Stations expected to report for `entity` in `direction`; 0 for a
    /// screenline without members.
    pub fn units(&self, entity: &str, direction: char) -> u32 {
        match self {
            Coverage::Station => 1,
            Coverage::Screenline(units) => units
                .get(&(entity.to_string(), direction))
                .copied()
                .unwrap_or(0),
        }
    }

    /// Stations and expected records (`units * intervals`) of one row
    /// covering the window `[start, end]`.
    pub fn checksum(&self, key: &GroupKey, start: DmgTime, end: DmgTime) -> Result<Checksum> {
        let intervals = interval_count(start, end)?;
        let units = self.units(&key.entity, key.direction);
        Ok(Checksum {
            units,
            expected_records: u64::from(units) * u64::from(intervals),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(screenline: &str, station: &str, direction: char) -> ScreenlineMember {
        ScreenlineMember {
            screenline: screenline.to_string(),
            station: station.to_string(),
            direction,
        }
    }

    fn key(entity: &str, direction: char) -> GroupKey {
        GroupKey {
            entity: entity.to_string(),
            time: None,
            direction,
        }
    }

    fn t(value: u32) -> DmgTime {
        DmgTime::new(value).unwrap()
    }

    #[test]
    fn test_station_coverage_is_one() {
        let coverage = Coverage::Station;
        assert_eq!(coverage.units("100E", 'E'), 1);

        let checksum = coverage.checksum(&key("100E", 'E'), t(600), t(700)).unwrap();
        assert_eq!(checksum, Checksum { units: 1, expected_records: 5 });
    }

    #[test]
    fn test_screenline_counts_distinct_stations_per_direction() {
        let coverage = Coverage::from_members(vec![
            member("S1", "100E", 'E'),
            member("S1", "101E", 'E'),
            member("S1", "101E", 'E'),
            member("S1", "102E", 'E'),
            member("S1", "100W", 'W'),
            member("S2", "200E", 'E'),
        ]);

        assert_eq!(coverage.units("S1", 'E'), 3);
        assert_eq!(coverage.units("S1", 'W'), 1);
        assert_eq!(coverage.units("S2", 'E'), 1);
    }

    #[test]
    fn test_three_stations_over_two_intervals() {
        let coverage = Coverage::from_members(vec![
            member("S1", "A", 'E'),
            member("S1", "B", 'E'),
            member("S1", "C", 'E'),
        ]);

        let checksum = coverage.checksum(&key("S1", 'E'), t(601), t(630)).unwrap();
        assert_eq!(checksum.units, 3);
        assert_eq!(checksum.expected_records, 6);
    }

    #[test]
    fn test_unknown_screenline_has_no_coverage() {
        let coverage = Coverage::from_members(vec![member("S1", "A", 'E')]);
        assert_eq!(coverage.units("S9", 'E'), 0);
        assert_eq!(coverage.units("S1", 'N'), 0);
    }

    #[test]
    fn test_reversed_window_is_rejected() {
        let coverage = Coverage::Station;
        assert!(coverage.checksum(&key("A", 'E'), t(700), t(600)).is_err());
    }
}
