//! One-pass summation of observations into per-group count vectors.

use crate::analyzers::types::{Granularity, GroupKey, Observation};
use crate::category::CategorySelector;
use crate::error::Result;
use crate::time::DmgTime;
use std::collections::HashMap;
use tracing::debug;

/// Summed counts per group, one slot per selected category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    pub(crate) groups: HashMap<GroupKey, Vec<u64>>,
    pub(crate) span: Option<(DmgTime, DmgTime)>,
}

impl Aggregation {
    pub fn get(&self, key: &GroupKey) -> Option<&[u64]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    pub fn groups(&self) -> &HashMap<GroupKey, Vec<u64>> {
        &self.groups
    }

    /// Earliest and latest observed times, `None` when nothing was observed.
    pub fn span(&self) -> Option<(DmgTime, DmgTime)> {
        self.span
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group keys in report order.
    pub fn sorted_keys(&self) -> Vec<&GroupKey> {
        let mut keys: Vec<_> = self.groups.keys().collect();
        keys.sort();
        keys
    }
}

/// Groups observations by `granularity` and sums their counts per category.
///
/// Categories missing from a group that exists read as zero; groups with no
/// observations at all are absent. An observation outside the selection
/// aborts the whole aggregation.
pub fn aggregate<I>(
    observations: I,
    selector: &CategorySelector,
    granularity: Granularity,
) -> Result<Aggregation>
where
    I: IntoIterator<Item = Observation>,
{
    let width = selector.len();
    let mut groups: HashMap<GroupKey, Vec<u64>> = HashMap::new();
    let mut span: Option<(DmgTime, DmgTime)> = None;
    let mut consumed = 0usize;

    for observation in observations {
        let column = selector.column(observation.category_id)?;

        span = Some(match span {
            None => (observation.time, observation.time),
            Some((first, last)) => (first.min(observation.time), last.max(observation.time)),
        });

        let key = GroupKey::for_observation(&observation, granularity);
        groups.entry(key).or_insert_with(|| vec![0; width])[column] += u64::from(observation.count);
        consumed += 1;
    }

    debug!(observations = consumed, groups = groups.len(), ?granularity, "Aggregated observations");

    Ok(Aggregation { groups, span })
}
