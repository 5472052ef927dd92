//! Count categories and the column order of a report.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{ReportError, Result};

pub type CategoryId = u32;

/// What a category counts. Stored upstream as `1`, `2` or `3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CountType {
    /// Individual vehicle technologies, e.g. `Auto1`, `Truck0`.
    Technology,
    /// Total vehicle counts across technologies.
    VehicleTotal,
    /// Total person counts across technologies.
    PersonTotal,
}

impl TryFrom<u8> for CountType {
    type Error = String;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Technology),
            2 => Ok(Self::VehicleTotal),
            3 => Ok(Self::PersonTotal),
            other => Err(format!("unknown count type {other}")),
        }
    }
}

impl From<CountType> for u8 {
    fn from(count_type: CountType) -> Self {
        match count_type {
            CountType::Technology => 1,
            CountType::VehicleTotal => 2,
            CountType::PersonTotal => 3,
        }
    }
}

impl fmt::Display for CountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CountType::Technology => "technology",
            CountType::VehicleTotal => "total vehicles",
            CountType::PersonTotal => "total persons",
        };
        f.write_str(label)
    }
}

/// A vehicle type and occupancy combination, one report column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    /// Column header, vehicle name followed by occupancy (`Auto1`).
    pub display_name: String,
    pub count_type: CountType,
    pub occupancy: u32,
    /// Position of the vehicle in category listings.
    #[serde(default)]
    pub display_order: u32,
}

/// Categories available for one survey, in listing order.
#[derive(Debug, Clone, Default)]
pub struct CategoryCatalog {
    categories: Vec<Category>,
}

impl CategoryCatalog {
    /// Sorts by vehicle display order, then occupancy.
    pub fn new(mut categories: Vec<Category>) -> Self {
        categories.sort_by_key(|c| (c.display_order, c.occupancy, c.id));
        Self { categories }
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    /// Categories of one count type, e.g. only the total person counts.
    pub fn of_type(&self, count_type: CountType) -> impl Iterator<Item = &Category> {
        self.categories
            .iter()
            .filter(move |c| c.count_type == count_type)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// The caller's ordered category selection.
///
/// Column positions are resolved once here and reused for every
/// observation. Ids are not deduplicated; a repeated id resolves to its
/// first column.
#[derive(Debug, Clone)]
pub struct CategorySelector {
    ids: Vec<CategoryId>,
    columns: HashMap<CategoryId, usize>,
}

impl CategorySelector {
    pub fn new(ids: Vec<CategoryId>) -> Self {
        let mut columns = HashMap::with_capacity(ids.len());
        for (column, id) in ids.iter().enumerate() {
            columns.entry(*id).or_insert(column);
        }
        Self { ids, columns }
    }

    /// Column index of `id`. Fails for ids outside the selection.
    pub fn column(&self, id: CategoryId) -> Result<usize> {
        self.columns
            .get(&id)
            .copied()
            .ok_or(ReportError::UnknownCategory { id })
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.columns.contains_key(&id)
    }

    pub fn ids(&self) -> &[CategoryId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Header names in selection order. Fails for ids the catalog does not
    /// offer.
    pub fn column_names(&self, catalog: &CategoryCatalog) -> Result<Vec<String>> {
        self.ids
            .iter()
            .map(|&id| {
                catalog
                    .get(id)
                    .map(|c| c.display_name.clone())
                    .ok_or(ReportError::CategoryNotInCatalog { id })
            })
            .collect()
    }
}
