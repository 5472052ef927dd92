//! Access to stored survey data.
//!
//! [`SurveySource`] is the seam between the report engine and whatever
//! holds the observations. [`CsvSurveyStore`] implements it over a
//! directory of CSV tables.

mod csv_store;

pub use csv_store::CsvSurveyStore;

use anyhow::Result;

use crate::analyzers::coverage::ScreenlineMember;
use crate::analyzers::types::{EntityLevel, Observation};
use crate::category::{CategoryCatalog, CategoryId};
use crate::time::DmgTime;

/// Filter applied by the data source before aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationQuery {
    pub region_id: u32,
    pub survey_id: u32,
    pub level: EntityLevel,
    pub directions: Vec<char>,
    /// Inclusive window on the observation time.
    pub start: DmgTime,
    pub end: DmgTime,
    pub categories: Vec<CategoryId>,
    /// Restricts the report to these station or screenline codes.
    pub entities: Option<Vec<String>>,
}

impl ObservationQuery {
    pub fn includes_time(&self, time: DmgTime) -> bool {
        self.start <= time && time <= self.end
    }

    pub fn includes_entity(&self, code: &str) -> bool {
        self.entities
            .as_ref()
            .is_none_or(|codes| codes.iter().any(|c| c == code))
    }
}

/// Read-only view of the survey database used by the report engine.
///
/// Errors are returned to the caller of the report unchanged.
pub trait SurveySource {
    /// Observations matching `query`, one per entity the station belongs to.
    fn observations(&self, query: &ObservationQuery) -> Result<Vec<Observation>>;

    /// Stations mapped to screenlines of `region_id` that took part in `survey_id`.
    fn screenline_members(&self, region_id: u32, survey_id: u32) -> Result<Vec<ScreenlineMember>>;

    /// Categories with at least one observation in `survey_id`.
    fn categories(&self, survey_id: u32) -> Result<CategoryCatalog>;

    fn region_name(&self, region_id: u32) -> Result<Option<String>>;

    fn survey_year(&self, survey_id: u32) -> Result<Option<i32>>;
}
