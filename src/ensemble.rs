//! Multi-heuristic solve.
//!
//! Runs build -> engine -> extract once per construction heuristic, in
//! parallel, and keeps the schedule collecting the most interest.

use std::time::Duration;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::engine::{FirstSolutionStrategy, LocalSearchMetaheuristic, RoutingEngine, SearchParameters};
use crate::error::SolveError;
use crate::extract::extract_routes;
use crate::interest::{InterestMap, schedule_stats};
use crate::model::{build_model, validate};
use crate::problem::Problem;
use crate::schedule::{Route, Schedule};

#[derive(Debug, Clone)]
pub struct EnsembleOptions {
    /// Heuristics to try. Order decides ties.
    pub heuristics: Vec<FirstSolutionStrategy>,
    /// Refine every attempt with simulated annealing.
    pub local_search: bool,
    pub time_limit: Duration,
    pub local_search_time_limit: Duration,
}

impl Default for EnsembleOptions {
    fn default() -> Self {
        Self {
            heuristics: FirstSolutionStrategy::ALL.to_vec(),
            local_search: false,
            time_limit: Duration::from_secs(10),
            local_search_time_limit: Duration::from_secs(600),
        }
    }
}

impl EnsembleOptions {
    pub fn search_parameters(&self, heuristic: FirstSolutionStrategy) -> SearchParameters {
        if self.local_search {
            SearchParameters {
                first_solution_strategy: heuristic,
                local_search_metaheuristic: Some(LocalSearchMetaheuristic::SimulatedAnnealing),
                time_limit: self.local_search_time_limit,
            }
        } else {
            SearchParameters {
                first_solution_strategy: heuristic,
                local_search_metaheuristic: None,
                time_limit: self.time_limit,
            }
        }
    }
}

/// One pipeline run: build the model, solve it, decode and validate.
pub fn run_attempt<E>(problem: &Problem, engine: &E, params: &SearchParameters) -> Result<Vec<Route>, SolveError>
where
    E: RoutingEngine + ?Sized,
{
    let built = build_model(problem)?;
    let paths = engine
        .solve(&built.model, params)
        .ok_or(SolveError::Infeasible {
            heuristic: params.first_solution_strategy,
        })?;
    extract_routes(&built, problem.value_map(), &paths)
}

/// Solves `problem` once per configured heuristic and returns the best
/// schedule with its per-app allocation.
///
/// Attempt failures are logged and skipped; the solve fails only when the
/// problem is misconfigured or no attempt produced a valid schedule.
pub fn solve<E>(problem: &Problem, engine: &E, options: &EnsembleOptions) -> Result<Schedule, SolveError>
where
    E: RoutingEngine,
{
    validate(problem)?;
    if options.heuristics.is_empty() {
        return Err(SolveError::config("no construction heuristics configured"));
    }
    if let Some(table) = &problem.travel_times {
        let invalid = table.invalid_entries();
        if invalid > 0 {
            warn!(invalid, total = table.len(), "travel-time table has invalid entries, using penalty");
        }
    }

    let outcomes: Vec<Result<Vec<Route>, SolveError>> = options
        .heuristics
        .par_iter()
        .map(|&heuristic| {
            let problem = problem.clone();
            run_attempt(&problem, engine, &options.search_parameters(heuristic))
        })
        .collect();

    select_best(problem.value_map(), &options.heuristics, outcomes)
}

/// Picks the highest-scoring attempt; earliest wins on equal score.
fn select_best(
    value_map: &InterestMap,
    heuristics: &[FirstSolutionStrategy],
    outcomes: Vec<Result<Vec<Route>, SolveError>>,
) -> Result<Schedule, SolveError> {
    let mut best: Option<(FirstSolutionStrategy, f64, Vec<Route>)> = None;

    for (&heuristic, outcome) in heuristics.iter().zip(outcomes) {
        let scored = outcome.and_then(|routes| {
            let (allocation, _) = schedule_stats(value_map, &routes)?;
            Ok((allocation.total(), routes))
        });

        match scored {
            Ok((score, routes)) => {
                debug!(?heuristic, score, "attempt finished");
                if best.as_ref().is_none_or(|(_, s, _)| score > *s) {
                    best = Some((heuristic, score, routes));
                }
            }
            Err(err) => warn!(?heuristic, error = %err, "attempt excluded"),
        }
    }

    let (heuristic, score, routes) = best.ok_or(SolveError::AllAttemptsFailed {
        attempts: heuristics.len(),
    })?;
    let (allocation, _) = schedule_stats(value_map, &routes)?;
    info!(?heuristic, score, routes = routes.len(), "selected schedule");

    Ok(Schedule { routes, allocation })
}
