//! [`SurveySource`] backed by a directory of normalized CSV tables.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;
use tracing::debug;

use super::{ObservationQuery, SurveySource};
use crate::analyzers::coverage::ScreenlineMember;
use crate::analyzers::types::{EntityLevel, Observation};
use crate::category::{Category, CategoryCatalog, CategoryId};
use crate::time::DmgTime;

#[derive(Debug, Deserialize)]
struct RegionRecord {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SurveyRecord {
    id: u32,
    year: i32,
}

#[derive(Debug, Deserialize)]
struct StationRecord {
    id: u32,
    region_id: u32,
    station_code: String,
    direction: char,
}

#[derive(Debug, Deserialize)]
struct SurveyStationRecord {
    survey_id: u32,
    station_id: u32,
}

#[derive(Debug, Deserialize)]
struct ScreenlineRecord {
    id: u32,
    region_id: u32,
    sline_code: String,
}

#[derive(Debug, Deserialize)]
struct ScreenlineStationRecord {
    screenline_id: u32,
    station_id: u32,
}

#[derive(Debug, Deserialize)]
struct SurveyCategoryRecord {
    survey_id: u32,
    category_id: CategoryId,
}

#[derive(Debug, Deserialize)]
struct ObservationRecord {
    survey_id: u32,
    station_id: u32,
    time: DmgTime,
    category_id: CategoryId,
    count: u32,
}

/// Survey tables loaded from a directory of CSV files.
///
/// Expected files: `regions.csv`, `surveys.csv`, `stations.csv`,
/// `survey_stations.csv`, `screenlines.csv`, `screenline_stations.csv`,
/// `categories.csv` and `observations.csv`. An optional
/// `survey_categories.csv` limits the categories a survey offers; surveys
/// without rows there offer every category.
pub struct CsvSurveyStore {
    regions: Vec<RegionRecord>,
    surveys: Vec<SurveyRecord>,
    stations: HashMap<u32, StationRecord>,
    survey_stations: HashSet<(u32, u32)>,
    screenlines: HashMap<u32, ScreenlineRecord>,
    /// Station id to the screenlines it belongs to.
    memberships: HashMap<u32, Vec<u32>>,
    categories: Vec<Category>,
    /// Survey id to the categories it was counted with.
    survey_categories: HashMap<u32, HashSet<CategoryId>>,
    observations: Vec<ObservationRecord>,
}

impl CsvSurveyStore {
    /// Loads every table under `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        let stations = load_table::<StationRecord>(dir, "stations.csv")?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();
        let survey_stations = load_table::<SurveyStationRecord>(dir, "survey_stations.csv")?
            .into_iter()
            .map(|s| (s.survey_id, s.station_id))
            .collect();
        let screenlines = load_table::<ScreenlineRecord>(dir, "screenlines.csv")?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let mut memberships: HashMap<u32, Vec<u32>> = HashMap::new();
        for link in load_table::<ScreenlineStationRecord>(dir, "screenline_stations.csv")? {
            memberships
                .entry(link.station_id)
                .or_default()
                .push(link.screenline_id);
        }

        let mut survey_categories: HashMap<u32, HashSet<CategoryId>> = HashMap::new();
        for link in load_optional_table::<SurveyCategoryRecord>(dir, "survey_categories.csv")? {
            survey_categories
                .entry(link.survey_id)
                .or_default()
                .insert(link.category_id);
        }

        let store = Self {
            regions: load_table(dir, "regions.csv")?,
            surveys: load_table(dir, "surveys.csv")?,
            stations,
            survey_stations,
            screenlines,
            memberships,
            categories: load_table(dir, "categories.csv")?,
            survey_categories,
            observations: load_table(dir, "observations.csv")?,
        };

        debug!(
            dir = %dir.display(),
            stations = store.stations.len(),
            screenlines = store.screenlines.len(),
            observations = store.observations.len(),
            "Survey store loaded"
        );

        Ok(store)
    }

    fn station(&self, id: u32) -> Result<&StationRecord> {
        match self.stations.get(&id) {
            Some(station) => Ok(station),
            None => bail!("observation references unknown station {id}"),
        }
    }

    /// Screenlines of `region_id` containing `station_id`.
    fn screenlines_of(&self, station_id: u32, region_id: u32) -> impl Iterator<Item = &ScreenlineRecord> {
        self.memberships
            .get(&station_id)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.screenlines.get(id))
            .filter(move |s| s.region_id == region_id)
    }
}

impl SurveySource for CsvSurveyStore {
    fn observations(&self, query: &ObservationQuery) -> Result<Vec<Observation>> {
        let mut matched = Vec::new();

        for record in &self.observations {
            if record.survey_id != query.survey_id
                || !query.includes_time(record.time)
                || !query.categories.contains(&record.category_id)
            {
                continue;
            }

            let station = self.station(record.station_id)?;
            if station.region_id != query.region_id || !query.directions.contains(&station.direction) {
                continue;
            }

            let observation = |entity: &str| Observation {
                entity: entity.to_string(),
                direction: station.direction,
                time: record.time,
                category_id: record.category_id,
                count: record.count,
            };

            match query.level {
                EntityLevel::Station => {
                    if query.includes_entity(&station.station_code) {
                        matched.push(observation(&station.station_code));
                    }
                }
                EntityLevel::Screenline => {
                    for screenline in self.screenlines_of(station.id, query.region_id) {
                        if query.includes_entity(&screenline.sline_code) {
                            matched.push(observation(&screenline.sline_code));
                        }
                    }
                }
            }
        }

        debug!(matched = matched.len(), level = ?query.level, "Observation query complete");
        Ok(matched)
    }

    fn screenline_members(&self, region_id: u32, survey_id: u32) -> Result<Vec<ScreenlineMember>> {
        let mut members = Vec::new();

        for station in self.stations.values() {
            if station.region_id != region_id || !self.survey_stations.contains(&(survey_id, station.id)) {
                continue;
            }
            for screenline in self.screenlines_of(station.id, region_id) {
                members.push(ScreenlineMember {
                    screenline: screenline.sline_code.clone(),
                    station: station.station_code.clone(),
                    direction: station.direction,
                });
            }
        }

        Ok(members)
    }

    fn categories(&self, survey_id: u32) -> Result<CategoryCatalog> {
        let offered = self.survey_categories.get(&survey_id);

        Ok(CategoryCatalog::new(
            self.categories
                .iter()
                .filter(|c| offered.is_none_or(|ids| ids.contains(&c.id)))
                .cloned()
                .collect(),
        ))
    }

    fn region_name(&self, region_id: u32) -> Result<Option<String>> {
        Ok(self
            .regions
            .iter()
            .find(|r| r.id == region_id)
            .map(|r| r.name.clone()))
    }

    fn survey_year(&self, survey_id: u32) -> Result<Option<i32>> {
        Ok(self.surveys.iter().find(|s| s.id == survey_id).map(|s| s.year))
    }
}

fn load_table<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<T>> {
    let path = dir.join(name);
    let file = File::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: T = result.with_context(|| format!("malformed row in {}", path.display()))?;
        rows.push(record);
    }

    Ok(rows)
}

/// Like [`load_table`], but a missing file reads as an empty table.
fn load_optional_table<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<T>> {
    if !dir.join(name).exists() {
        debug!(table = name, "Optional table not present");
        return Ok(Vec::new());
    }
    load_table(dir, name)
}
