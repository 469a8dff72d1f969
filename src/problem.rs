//! Problem definition and conversion from the JSON input shape.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geo::Location;
use crate::interest::{InterestMap, TaskRecord};
use crate::matrix::TravelTimeTable;
use crate::schedule::{Route, Schedule};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub location: Location,
    /// Cruise speed in m/s.
    pub speed: f64,
}

impl Vehicle {
    pub fn new(location: Location, speed: f64) -> Self {
        Self { location, speed }
    }
}

/// Input as received at the process boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverInput {
    pub interest_map: Vec<TaskRecord>,
    pub unweighted_interest_map: Vec<TaskRecord>,
    pub vehicles: Vec<Vehicle>,
    pub budget: i64,
    pub capacity: i64,
    pub initial_schedule: Option<Schedule>,
    pub rth: Vec<Location>,
    pub travel_time_matrix_path: String,
}

/// Everything one solve needs. Cloned per ensemble attempt.
#[derive(Debug, Clone, Default)]
pub struct Problem {
    pub interest_map: InterestMap,
    /// True worth of each task when `interest_map` carries reweighted values.
    pub unweighted_interest_map: Option<InterestMap>,
    pub vehicles: Vec<Vehicle>,
    /// Per-vehicle travel + dwell budget in seconds.
    pub budget: i64,
    /// Secondary resource; `None` or non-positive disables the bias.
    pub capacity: Option<i64>,
    /// Return-to-home locations, one per vehicle.
    pub depots: Option<Vec<Location>>,
    pub initial_schedule: Option<Vec<Route>>,
    pub travel_times: Option<Arc<TravelTimeTable>>,
}

impl Problem {
    pub fn new(interest_map: InterestMap, vehicles: Vec<Vehicle>, budget: i64) -> Self {
        Self {
            interest_map,
            vehicles,
            budget,
            ..Default::default()
        }
    }

    /// Converts the boundary shape. Empty lists mean "not configured".
    ///
    /// The travel-time table is loaded by the caller from
    /// `travel_time_matrix_path`.
    pub fn from_input(input: SolverInput, travel_times: Option<TravelTimeTable>) -> Self {
        let unweighted = (!input.unweighted_interest_map.is_empty())
            .then(|| InterestMap::from_records(input.unweighted_interest_map));
        let initial_schedule = input
            .initial_schedule
            .map(|s| s.routes)
            .filter(|routes| !routes.is_empty());

        Self {
            interest_map: InterestMap::from_records(input.interest_map),
            unweighted_interest_map: unweighted,
            vehicles: input.vehicles,
            budget: input.budget,
            capacity: (input.capacity > 0).then_some(input.capacity),
            depots: (!input.rth.is_empty()).then_some(input.rth),
            initial_schedule,
            travel_times: travel_times.map(Arc::new),
        }
    }

    /// The map whose interest reflects true worth.
    pub fn value_map(&self) -> &InterestMap {
        self.unweighted_interest_map.as_ref().unwrap_or(&self.interest_map)
    }

    pub fn capacity_enabled(&self) -> Option<i64> {
        self.capacity.filter(|&c| c > 0)
    }

    pub fn with_unweighted(mut self, map: InterestMap) -> Self {
        self.unweighted_interest_map = Some(map);
        self
    }

    pub fn with_capacity(mut self, capacity: i64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_depots(mut self, depots: Vec<Location>) -> Self {
        self.depots = Some(depots);
        self
    }

    pub fn with_initial_schedule(mut self, routes: Vec<Route>) -> Self {
        self.initial_schedule = Some(routes);
        self
    }

    pub fn with_travel_times(mut self, table: TravelTimeTable) -> Self {
        self.travel_times = Some(Arc::new(table));
        self
    }
}
