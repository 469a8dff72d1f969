//! Routing engine contract.
//!
//! The engine sees only a generic arc-routing formulation: node indices, a
//! cost matrix, optional nodes with drop penalties, and one cumulative-cost
//! dimension bounded per vehicle. Domain meaning stays in `model` and
//! `extract`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Initial-solution strategy, in the fixed order the ensemble tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstSolutionStrategy {
    PathCheapestArc,
    PathMostConstrainedArc,
    Christofides,
    AllUnperformed,
    BestInsertion,
    ParallelCheapestInsertion,
    LocalCheapestInsertion,
    GlobalCheapestArc,
    LocalCheapestArc,
    FirstUnboundMinValue,
}

impl FirstSolutionStrategy {
    pub const ALL: [FirstSolutionStrategy; 10] = [
        FirstSolutionStrategy::PathCheapestArc,
        FirstSolutionStrategy::PathMostConstrainedArc,
        FirstSolutionStrategy::Christofides,
        FirstSolutionStrategy::AllUnperformed,
        FirstSolutionStrategy::BestInsertion,
        FirstSolutionStrategy::ParallelCheapestInsertion,
        FirstSolutionStrategy::LocalCheapestInsertion,
        FirstSolutionStrategy::GlobalCheapestArc,
        FirstSolutionStrategy::LocalCheapestArc,
        FirstSolutionStrategy::FirstUnboundMinValue,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalSearchMetaheuristic {
    SimulatedAnnealing,
}

#[derive(Debug, Clone)]
pub struct SearchParameters {
    pub first_solution_strategy: FirstSolutionStrategy,
    pub local_search_metaheuristic: Option<LocalSearchMetaheuristic>,
    /// Hard wall-clock limit for one solve.
    pub time_limit: Duration,
}

/// A node the engine may leave unvisited at `penalty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disjunction {
    pub node: usize,
    pub penalty: i64,
}

/// Cumulative quantity accumulated along arcs (here: seconds).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CumulDimension {
    /// Upper bound of the cumul, per vehicle.
    pub vehicle_capacity: Vec<i64>,
    pub slack_max: i64,
    pub fix_start_cumul_to_zero: bool,
}

/// Arc-routing model handed to an engine.
#[derive(Debug, Clone)]
pub struct RoutingModel {
    pub num_nodes: usize,
    pub starts: Vec<usize>,
    pub ends: Vec<usize>,
    /// Full `num_nodes x num_nodes` arc cost matrix; also the dimension's transit.
    pub costs: Vec<Vec<i64>>,
    pub disjunctions: Vec<Disjunction>,
    pub dimension: CumulDimension,
    /// Warm start: interior nodes per vehicle, start and end excluded.
    pub initial_routes: Option<Vec<Vec<usize>>>,
}

impl RoutingModel {
    pub fn num_vehicles(&self) -> usize {
        self.starts.len()
    }

    pub fn arc_cost(&self, from: usize, to: usize) -> i64 {
        self.costs[from][to]
    }

    /// Cost of `start -> interior... -> end` for `vehicle`.
    pub fn route_cost(&self, vehicle: usize, interior: &[usize]) -> i64 {
        let mut cost = 0;
        let mut prev = self.starts[vehicle];
        for &node in interior {
            cost += self.arc_cost(prev, node);
            prev = node;
        }
        cost + self.arc_cost(prev, self.ends[vehicle])
    }
}

/// A constraint-based routing search engine.
///
/// Returns one full node path per vehicle (start first, end last) or `None`
/// when no feasible assignment was found within the time limit.
pub trait RoutingEngine: Sync {
    fn solve(&self, model: &RoutingModel, params: &SearchParameters) -> Option<Vec<Vec<usize>>>;
}
