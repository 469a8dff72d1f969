//! Test fixtures for sensing-planner.
//!
//! Provides:
//! - Builders for task records and fleets with sensible defaults
//! - A survey grid generator for larger missions
//! - A scripted engine that returns canned paths per heuristic

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use sensing_planner::{
    FirstSolutionStrategy, InterestMap, Location, RoutingEngine, RoutingModel, SearchParameters, TaskRecord,
    Vehicle,
};

/// Builder for test tasks.
#[derive(Clone, Debug)]
pub struct TestTask {
    record: TaskRecord,
}

impl TestTask {
    pub fn at(lat: f64, lng: f64) -> Self {
        Self {
            record: TaskRecord {
                location: Location::new(lat, lng),
                app_id: 1,
                request_time: 0,
                interest: 1.0,
                task_time_seconds: 0.0,
            },
        }
    }

    pub fn app(mut self, app_id: i64) -> Self {
        self.record.app_id = app_id;
        self
    }

    pub fn interest(mut self, interest: f64) -> Self {
        self.record.interest = interest;
        self
    }

    pub fn dwell(mut self, seconds: f64) -> Self {
        self.record.task_time_seconds = seconds;
        self
    }

    pub fn requested_at(mut self, time: i64) -> Self {
        self.record.request_time = time;
        self
    }

    pub fn build(self) -> TaskRecord {
        self.record
    }
}

pub fn interest_map(tasks: Vec<TestTask>) -> InterestMap {
    InterestMap::from_records(tasks.into_iter().map(TestTask::build))
}

pub fn vehicle_at(lat: f64, lng: f64, speed: f64) -> Vehicle {
    Vehicle::new(Location::new(lat, lng), speed)
}

/// `rows x cols` tasks spaced `step` degrees apart from `origin`, apps
/// assigned round-robin.
pub fn survey_grid(origin: Location, rows: usize, cols: usize, step: f64, apps: i64) -> Vec<TestTask> {
    let mut tasks = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            let i = (r * cols + c) as i64;
            tasks.push(
                TestTask::at(origin.latitude + (r + 1) as f64 * step, origin.longitude + c as f64 * step)
                    .app(1 + i % apps)
                    .interest(1.0 + (i % 3) as f64)
                    .dwell(5.0),
            );
        }
    }
    tasks
}

/// Engine returning fixed interior node lists per heuristic, wrapped with
/// each vehicle's start and end. Heuristics without a script report no
/// solution.
#[derive(Default)]
pub struct ScriptedEngine {
    scripts: HashMap<FirstSolutionStrategy, Vec<Vec<usize>>>,
    calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, heuristic: FirstSolutionStrategy, interiors: Vec<Vec<usize>>) -> Self {
        self.scripts.insert(heuristic, interiors);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RoutingEngine for ScriptedEngine {
    fn solve(&self, model: &RoutingModel, params: &SearchParameters) -> Option<Vec<Vec<usize>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let interiors = self.scripts.get(&params.first_solution_strategy)?;
        Some(
            interiors
                .iter()
                .enumerate()
                .map(|(v, interior)| {
                    let mut path = vec![model.starts[v]];
                    path.extend(interior);
                    path.push(model.ends[v]);
                    path
                })
                .collect(),
        )
    }
}
