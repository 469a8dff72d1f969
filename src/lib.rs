//! sensing-planner core
//!
//! Plans range-limited vehicles over a weighted map of points of interest:
//! builds an arc-routing model, hands it to a routing engine, and validates
//! and selects among the schedules produced by several construction
//! heuristics.

pub mod engine;
pub mod ensemble;
pub mod error;
pub mod extract;
pub mod geo;
pub mod interest;
pub mod matrix;
pub mod model;
pub mod problem;
pub mod schedule;
pub mod solver;

pub use engine::{FirstSolutionStrategy, RoutingEngine, RoutingModel, SearchParameters};
pub use ensemble::{EnsembleOptions, solve};
pub use error::SolveError;
pub use geo::Location;
pub use interest::{InterestMap, TaskKey, TaskRecord};
pub use matrix::TravelTimeTable;
pub use problem::{Problem, SolverInput, Vehicle};
pub use schedule::{Allocation, Route, Schedule, Stop};
pub use solver::InsertionEngine;
