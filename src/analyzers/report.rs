//! Report engine: runs a request against a [`SurveySource`] and turns the
//! aggregation into sorted rows with coverage checksums.

use crate::analyzers::aggregate::{Aggregation, aggregate};
use crate::analyzers::coverage::Coverage;
use crate::analyzers::types::{EntityLevel, ReportKind};
use crate::category::{CategoryId, CategorySelector};
use crate::error::Result;
use crate::source::{ObservationQuery, SurveySource};
use crate::time::{DmgTime, interval_count};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Everything a user chooses when asking for a report.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub region_id: u32,
    pub survey_id: u32,
    pub level: EntityLevel,
    pub kind: ReportKind,
    pub directions: Vec<char>,
    pub start: DmgTime,
    pub end: DmgTime,
    /// Report columns, left to right.
    pub categories: Vec<CategoryId>,
    /// Only report these station or screenline codes.
    pub entities: Option<Vec<String>>,
}

impl ReportRequest {
    pub fn query(&self) -> ObservationQuery {
        ObservationQuery {
            region_id: self.region_id,
            survey_id: self.survey_id,
            level: self.level,
            directions: self.directions.clone(),
            start: self.start,
            end: self.end,
            categories: self.categories.clone(),
            entities: self.entities.clone(),
        }
    }
}

/// One output line of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub entity: String,
    pub direction: char,
    /// Slot end time, interval reports only.
    pub time: Option<DmgTime>,
    /// Stations expected to contribute to the row.
    pub coverage: u32,
    /// Fifteen-minute records those stations should have produced.
    pub expected_records: u64,
    pub start_time: DmgTime,
    pub end_time: DmgTime,
    pub counts: Vec<u64>,
}

/// A finished report, ready to be rendered.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// `"<region> <year>"`, when both are known.
    pub title: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub level: EntityLevel,
    pub kind: ReportKind,
    pub category_names: Vec<String>,
    pub rows: Vec<ReportRow>,
}

impl Report {
    /// Whether no observation matched the request.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Turns an aggregation into sorted rows with their coverage checksums.
///
/// Total-volume rows all share the window spanned by the data itself, from
/// the start of the earliest bucket to the latest observed time. Interval
/// rows each cover their own fifteen-minute bucket.
pub fn build_rows(aggregation: &Aggregation, coverage: &Coverage, kind: ReportKind) -> Result<Vec<ReportRow>> {
    let Some((first, last)) = aggregation.span() else {
        return Ok(Vec::new());
    };
    let data_window = (first.interval_start()?, last);

    let rows = aggregation
        .sorted_keys()
        .into_iter()
        .map(|key| -> Result<ReportRow> {
            let (start_time, end_time) = match (kind, key.time) {
                (ReportKind::FifteenMinute, Some(time)) => (time.interval_start()?, time),
                _ => data_window,
            };

            let checksum = coverage.checksum(key, start_time, end_time)?;

            Ok(ReportRow {
                entity: key.entity.clone(),
                direction: key.direction,
                time: key.time,
                coverage: checksum.units,
                expected_records: checksum.expected_records,
                start_time,
                end_time,
                counts: aggregation.groups[key].clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    for (entity, direction) in uncovered(&rows) {
        warn!(screenline = entity, %direction, "Screenline has no member stations");
    }

    Ok(rows)
}

/// Distinct entity and direction pairs whose rows have no contributing
/// stations.
fn uncovered(rows: &[ReportRow]) -> BTreeSet<(&str, char)> {
    rows.iter()
        .filter(|row| row.coverage == 0)
        .map(|row| (row.entity.as_str(), row.direction))
        .collect()
}

/// Runs one report request end to end against `source`.
///
/// Fails on the first invalid input; an empty match is a header-only report.
#[tracing::instrument(
    skip(source, request),
    fields(region = request.region_id, survey = request.survey_id, level = ?request.level, kind = ?request.kind)
)]
pub fn build_report<S>(source: &S, request: &ReportRequest) -> Result<Report>
where
    S: SurveySource + ?Sized,
{
    interval_count(request.start, request.end)?;

    let selector = CategorySelector::new(request.categories.clone());
    let catalog = source.categories(request.survey_id)?;
    let category_names = selector.column_names(&catalog)?;

    let observations = source.observations(&request.query())?;
    debug!(observations = observations.len(), "Observations loaded");

    let aggregation = aggregate(observations, &selector, request.kind.granularity())?;

    let coverage = match request.level {
        EntityLevel::Station => Coverage::Station,
        EntityLevel::Screenline => {
            Coverage::from_members(source.screenline_members(request.region_id, request.survey_id)?)
        }
    };

    let rows = build_rows(&aggregation, &coverage, request.kind)?;

    let title = match (
        source.region_name(request.region_id)?,
        source.survey_year(request.survey_id)?,
    ) {
        (Some(region), Some(year)) => Some(format!("{region} {year}")),
        _ => None,
    };

    info!(rows = rows.len(), "Report built");

    Ok(Report {
        title,
        generated_at: Utc::now(),
        level: request.level,
        kind: request.kind,
        category_names,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::coverage::ScreenlineMember;
    use crate::analyzers::types::Observation;
    use crate::category::{Category, CategoryCatalog, CountType};
    use crate::error::ReportError;

    fn t(value: u32) -> DmgTime {
        DmgTime::new(value).unwrap()
    }

    fn obs(entity: &str, direction: char, time: u32, category_id: CategoryId, count: u32) -> Observation {
        Observation {
            entity: entity.to_string(),
            direction,
            time: t(time),
            category_id,
            count,
        }
    }

    /// In-memory source holding observations already keyed by entity.
    struct FixedSource {
        observations: Vec<Observation>,
        members: Vec<ScreenlineMember>,
    }

    impl SurveySource for FixedSource {
        fn observations(&self, query: &ObservationQuery) -> anyhow::Result<Vec<Observation>> {
            Ok(self
                .observations
                .iter()
                .filter(|o| query.includes_time(o.time) && query.directions.contains(&o.direction))
                .cloned()
                .collect())
        }

        fn screenline_members(&self, _: u32, _: u32) -> anyhow::Result<Vec<ScreenlineMember>> {
            Ok(self.members.clone())
        }

        fn categories(&self, _: u32) -> anyhow::Result<CategoryCatalog> {
            Ok(CategoryCatalog::new(vec![
                Category {
                    id: 1,
                    display_name: "Auto1".to_string(),
                    count_type: CountType::Technology,
                    occupancy: 1,
                    display_order: 1,
                },
                Category {
                    id: 2,
                    display_name: "Auto2".to_string(),
                    count_type: CountType::Technology,
                    occupancy: 2,
                    display_order: 1,
                },
            ]))
        }

        fn region_name(&self, _: u32) -> anyhow::Result<Option<String>> {
            Ok(Some("Toronto".to_string()))
        }

        fn survey_year(&self, _: u32) -> anyhow::Result<Option<i32>> {
            Ok(Some(2016))
        }
    }

    struct BrokenSource;

    impl SurveySource for BrokenSource {
        fn observations(&self, _: &ObservationQuery) -> anyhow::Result<Vec<Observation>> {
            anyhow::bail!("connection reset")
        }
        fn screenline_members(&self, _: u32, _: u32) -> anyhow::Result<Vec<ScreenlineMember>> {
            Ok(Vec::new())
        }
        fn categories(&self, _: u32) -> anyhow::Result<CategoryCatalog> {
            Ok(CategoryCatalog::new(Vec::new()))
        }
        fn region_name(&self, _: u32) -> anyhow::Result<Option<String>> {
            Ok(None)
        }
        fn survey_year(&self, _: u32) -> anyhow::Result<Option<i32>> {
            Ok(None)
        }
    }

    fn member(station: &str) -> ScreenlineMember {
        ScreenlineMember {
            screenline: "S1".to_string(),
            station: station.to_string(),
            direction: 'E',
        }
    }

    fn request(level: EntityLevel, kind: ReportKind, start: u32, end: u32, categories: Vec<CategoryId>) -> ReportRequest {
        ReportRequest {
            region_id: 1,
            survey_id: 1,
            level,
            kind,
            directions: vec!['E', 'W'],
            start: t(start),
            end: t(end),
            categories,
            entities: None,
        }
    }

    #[test]
    fn test_screenline_total_volume() {
        let source = FixedSource {
            observations: vec![obs("S1", 'E', 615, 1, 2), obs("S1", 'E', 615, 1, 5)],
            members: vec![member("A"), member("B")],
        };

        let report = build_report(
            &source,
            &request(EntityLevel::Screenline, ReportKind::TotalVolume, 600, 615, vec![1]),
        )
        .unwrap();

        assert_eq!(report.title.as_deref(), Some("Toronto 2016"));
        assert_eq!(report.category_names, vec!["Auto1"]);
        assert_eq!(
            report.rows,
            vec![ReportRow {
                entity: "S1".to_string(),
                direction: 'E',
                time: None,
                coverage: 2,
                expected_records: 2,
                start_time: t(601),
                end_time: t(615),
                counts: vec![7],
            }]
        );
    }

    #[test]
    fn test_total_volume_window_comes_from_data() {
        let source = FixedSource {
            observations: vec![obs("100E", 'E', 630, 1, 1), obs("100E", 'E', 715, 2, 4)],
            members: Vec::new(),
        };

        let report = build_report(
            &source,
            &request(EntityLevel::Station, ReportKind::TotalVolume, 600, 900, vec![2, 1]),
        )
        .unwrap();

        let row = &report.rows[0];
        assert_eq!(row.start_time, t(616));
        assert_eq!(row.end_time, t(715));
        assert_eq!(row.coverage, 1);
        assert_eq!(row.expected_records, 4);
        assert_eq!(row.counts, vec![4, 1]);
    }

    #[test]
    fn test_fifteen_minute_rows_cover_one_bucket() {
        let source = FixedSource {
            observations: vec![
                obs("S1", 'E', 630, 1, 3),
                obs("S1", 'E', 615, 1, 2),
                obs("S1", 'E', 615, 2, 1),
            ],
            members: vec![member("A"), member("B"), member("C")],
        };

        let report = build_report(
            &source,
            &request(EntityLevel::Screenline, ReportKind::FifteenMinute, 600, 700, vec![1, 2]),
        )
        .unwrap();

        assert_eq!(report.rows.len(), 2);
        let first = &report.rows[0];
        assert_eq!(first.time, Some(t(615)));
        assert_eq!((first.start_time, first.end_time), (t(601), t(615)));
        assert_eq!(first.expected_records, 3);
        assert_eq!(first.counts, vec![2, 1]);
        assert_eq!(report.rows[1].counts, vec![3, 0]);
    }

    #[test]
    fn test_empty_match_is_not_an_error() {
        let source = FixedSource {
            observations: vec![obs("S1", 'E', 1200, 1, 3)],
            members: Vec::new(),
        };

        let report = build_report(
            &source,
            &request(EntityLevel::Station, ReportKind::TotalVolume, 600, 700, vec![1]),
        )
        .unwrap();

        assert!(report.is_empty());
        assert_eq!(report.category_names, vec!["Auto1"]);
    }

    #[test]
    fn test_reversed_window_is_rejected() {
        let source = FixedSource {
            observations: Vec::new(),
            members: Vec::new(),
        };

        let result = build_report(
            &source,
            &request(EntityLevel::Station, ReportKind::TotalVolume, 700, 600, vec![1]),
        );

        assert!(matches!(result, Err(ReportError::ReversedInterval { .. })));
    }

    #[test]
    fn test_unknown_category_in_selection() {
        let source = FixedSource {
            observations: Vec::new(),
            members: Vec::new(),
        };

        let result = build_report(
            &source,
            &request(EntityLevel::Station, ReportKind::TotalVolume, 600, 700, vec![1, 99]),
        );

        assert!(matches!(result, Err(ReportError::CategoryNotInCatalog { id: 99 })));
    }

    #[test]
    fn test_memberless_screenline_is_reported_once() {
        let source = FixedSource {
            observations: vec![
                obs("S9", 'E', 615, 1, 1),
                obs("S9", 'E', 630, 1, 2),
                obs("S9", 'E', 645, 1, 3),
                obs("S1", 'E', 615, 1, 4),
            ],
            members: vec![member("A")],
        };

        let report = build_report(
            &source,
            &request(EntityLevel::Screenline, ReportKind::FifteenMinute, 600, 700, vec![1]),
        )
        .unwrap();

        assert_eq!(report.rows.len(), 4);
        let zero_rows = report.rows.iter().filter(|r| r.coverage == 0).count();
        assert_eq!(zero_rows, 3);
        assert!(report.rows.iter().filter(|r| r.coverage == 0).all(|r| r.expected_records == 0));
        assert_eq!(uncovered(&report.rows), BTreeSet::from([("S9", 'E')]));
    }

    #[test]
    fn test_source_errors_pass_through() {
        let result = build_report(
            &BrokenSource,
            &request(EntityLevel::Station, ReportKind::TotalVolume, 600, 700, vec![]),
        );

        match result {
            Err(ReportError::Source(err)) => assert_eq!(err.to_string(), "connection reset"),
            other => panic!("expected source error, got {other:?}"),
        }
    }
}
