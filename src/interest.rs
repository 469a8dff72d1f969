//! Interest maps: reward records keyed by task identity.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::SolveError;
use crate::geo::Location;
use crate::schedule::{Allocation, Route};

/// Identity of a task: where, for which app, and when it was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey {
    pub location: Location,
    pub app_id: i64,
    pub request_time: i64,
}

impl TaskKey {
    pub fn new(location: Location, app_id: i64, request_time: i64) -> Self {
        Self {
            location,
            app_id,
            request_time,
        }
    }
}

/// A reward-bearing task as supplied by an app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub location: Location,
    pub app_id: i64,
    #[serde(default)]
    pub request_time: i64,
    pub interest: f64,
    #[serde(default)]
    pub task_time_seconds: f64,
}

impl TaskRecord {
    pub fn key(&self) -> TaskKey {
        TaskKey::new(self.location, self.app_id, self.request_time)
    }
}

/// Ordered map of task key to record. Iteration is always sorted by key,
/// which keeps node indices stable between model building and decoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterestMap(BTreeMap<TaskKey, TaskRecord>);

impl InterestMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from a record list. Later duplicates win.
    pub fn from_records(records: impl IntoIterator<Item = TaskRecord>) -> Self {
        let mut map = Self::new();
        for record in records {
            map.insert(record);
        }
        map
    }

    pub fn to_records(&self) -> Vec<TaskRecord> {
        self.0.values().cloned().collect()
    }

    pub fn insert(&mut self, record: TaskRecord) -> Option<TaskRecord> {
        self.0.insert(record.key(), record)
    }

    pub fn get(&self, key: &TaskKey) -> Option<&TaskRecord> {
        self.0.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &TaskKey) -> Option<&mut TaskRecord> {
        self.0.get_mut(key)
    }

    pub fn contains(&self, key: &TaskKey) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &TaskKey> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TaskKey, &TaskRecord)> {
        self.0.iter()
    }

    /// Distinct app ids present in the map.
    pub fn apps(&self) -> BTreeSet<i64> {
        self.0.keys().map(|k| k.app_id).collect()
    }

    pub fn filter_by_app(&self, app_id: i64) -> InterestMap {
        InterestMap(
            self.0
                .iter()
                .filter(|(k, _)| k.app_id == app_id)
                .map(|(k, v)| (*k, v.clone()))
                .collect(),
        )
    }

    pub fn total_interest(&self) -> f64 {
        self.0.values().map(|r| r.interest).sum()
    }
}

/// Union of maps. On key collision the later map wins.
pub fn merge(maps: &[InterestMap]) -> InterestMap {
    let mut merged = InterestMap::new();
    for map in maps {
        for record in map.0.values() {
            merged.insert(record.clone());
        }
    }
    merged
}

/// Scales every record's interest by its app's weight.
///
/// Requires exactly one weight per app present in `map`.
pub fn reweight(map: &InterestMap, weights: &BTreeMap<i64, f64>) -> Result<InterestMap, SolveError> {
    let apps = map.apps();
    if weights.len() != apps.len() {
        return Err(SolveError::config(format!(
            "expected {} app weights, got {}",
            apps.len(),
            weights.len()
        )));
    }

    let mut weighted = InterestMap::new();
    for record in map.0.values() {
        let weight = weights
            .get(&record.app_id)
            .ok_or_else(|| SolveError::config(format!("no weight for app {}", record.app_id)))?;
        let mut record = record.clone();
        record.interest *= weight;
        weighted.insert(record);
    }
    Ok(weighted)
}

/// Collected interest per app and elapsed time per route.
///
/// Every app in `map` appears in the allocation, with 0 if none of its
/// tasks were visited.
pub fn schedule_stats(map: &InterestMap, routes: &[Route]) -> Result<(Allocation, Vec<i64>), SolveError> {
    let mut allocation = Allocation(map.apps().into_iter().map(|app| (app, 0.0)).collect());
    let mut elapsed = Vec::with_capacity(routes.len());

    for route in routes {
        elapsed.push(route.total_time);
        for stop in &route.path {
            let key = stop.key();
            let record = map.get(&key).ok_or_else(|| {
                SolveError::consistency(format!("scheduled stop {:?} is not in the interest map", key))
            })?;
            *allocation.0.entry(key.app_id).or_insert(0.0) += record.interest;
        }
    }

    Ok((allocation, elapsed))
}
