//! Output shapes: routes, per-app allocation and the full schedule.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geo::Location;
use crate::interest::TaskKey;

/// A visited task within a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub location: Location,
    pub app_id: i64,
    pub request_time: i64,
    /// Cumulative travel + dwell seconds on arrival at this stop.
    #[serde(default)]
    pub fulfill_time: i64,
}

impl Stop {
    pub fn key(&self) -> TaskKey {
        TaskKey::new(self.location, self.app_id, self.request_time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub path: Vec<Stop>,
    pub total_interest: f64,
    pub total_time: i64,
    pub vehicle_start: Location,
    pub vehicle_end: Location,
}

/// App id to collected interest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allocation(pub BTreeMap<i64, f64>);

impl Allocation {
    pub fn get(&self, app_id: i64) -> Option<f64> {
        self.0.get(&app_id).copied()
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pub routes: Vec<Route>,
    pub allocation: Allocation,
}

impl Schedule {
    /// Total time per route, in route order.
    pub fn elapsed_time(&self) -> Vec<i64> {
        self.routes.iter().map(|r| r.total_time).collect()
    }

    /// Longest route time, 0 for an empty schedule.
    pub fn max_time(&self) -> i64 {
        self.elapsed_time().into_iter().max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.routes.iter().all(|r| r.path.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(total_time: i64) -> Route {
        Route {
            path: Vec::new(),
            total_interest: 0.0,
            total_time,
            vehicle_start: Location::new(0.0, 0.0),
            vehicle_end: Location::new(0.0, 0.0),
        }
    }

    #[test]
    fn test_elapsed_and_max_time() {
        let schedule = Schedule {
            routes: vec![route(30), route(120), route(45)],
            allocation: Allocation::default(),
        };
        assert_eq!(schedule.elapsed_time(), vec![30, 120, 45]);
        assert_eq!(schedule.max_time(), 120);
        assert_eq!(Schedule::default().max_time(), 0);
    }

    #[test]
    fn test_allocation_total() {
        let mut alloc = Allocation::default();
        alloc.0.insert(1, 2.5);
        alloc.0.insert(2, 1.5);
        assert_eq!(alloc.total(), 4.0);
        assert_eq!(alloc.get(2), Some(1.5));
        assert_eq!(alloc.get(3), None);
    }

    #[test]
    fn test_allocation_serializes_as_map() {
        let mut alloc = Allocation::default();
        alloc.0.insert(7, 1.0);
        let json = serde_json::to_string(&alloc).unwrap();
        assert_eq!(json, r#"{"7":1.0}"#);
    }
}
