//! Ensemble orchestration tests
//!
//! Selection, tie-breaking and failure isolation, driven by a scripted engine
//! so every attempt's outcome is known up front.

mod fixtures;

use sensing_planner::{
    EnsembleOptions, FirstSolutionStrategy, Location, Problem, Route, Schedule, SolveError, Stop, solve,
};

use fixtures::{ScriptedEngine, TestTask, interest_map, vehicle_at};

// ============================================================================
// Helpers
// ============================================================================

const PCA: FirstSolutionStrategy = FirstSolutionStrategy::PathCheapestArc;
const BI: FirstSolutionStrategy = FirstSolutionStrategy::BestInsertion;

/// Node layout: 0 sentinel, 1 task X (0, 0.001), 2 task Y (0, 0.002), 3 vehicle anchor.
fn two_task_problem(budget: i64) -> Problem {
    Problem::new(
        interest_map(vec![TestTask::at(0.0, 0.001), TestTask::at(0.0, 0.002)]),
        vec![vehicle_at(0.0, 0.0, 10.0)],
        budget,
    )
}

fn options(heuristics: Vec<FirstSolutionStrategy>) -> EnsembleOptions {
    EnsembleOptions {
        heuristics,
        ..Default::default()
    }
}

fn visited(schedule: &Schedule) -> Vec<(f64, f64)> {
    schedule
        .routes
        .iter()
        .flat_map(|r| r.path.iter().map(|s| (s.location.latitude, s.location.longitude)))
        .collect()
}

// ============================================================================
// Selection Tests
// ============================================================================

#[test]
fn test_tie_goes_to_earliest_heuristic() {
    let engine = ScriptedEngine::new().script(PCA, vec![vec![1]]).script(BI, vec![vec![2]]);

    let schedule = solve(&two_task_problem(1000), &engine, &options(vec![PCA, BI])).unwrap();
    assert_eq!(visited(&schedule), vec![(0.0, 0.001)]);

    let schedule = solve(&two_task_problem(1000), &engine, &options(vec![BI, PCA])).unwrap();
    assert_eq!(visited(&schedule), vec![(0.0, 0.002)]);
}

#[test]
fn test_higher_interest_wins_regardless_of_order() {
    let engine = ScriptedEngine::new().script(PCA, vec![vec![1]]).script(BI, vec![vec![1, 2]]);

    let schedule = solve(&two_task_problem(1000), &engine, &options(vec![PCA, BI])).unwrap();

    assert_eq!(visited(&schedule).len(), 2);
    assert_eq!(schedule.allocation.get(1), Some(2.0));
    assert_eq!(schedule.routes[0].total_interest, 2.0);
}

#[test]
fn test_allocation_lists_every_app() {
    let problem = Problem::new(
        interest_map(vec![TestTask::at(0.0, 0.001).app(1), TestTask::at(0.0, 0.002).app(2).interest(4.0)]),
        vec![vehicle_at(0.0, 0.0, 10.0)],
        1000,
    );
    let engine = ScriptedEngine::new().script(PCA, vec![vec![1]]);

    let schedule = solve(&problem, &engine, &options(vec![PCA])).unwrap();

    assert_eq!(schedule.allocation.get(1), Some(1.0));
    assert_eq!(schedule.allocation.get(2), Some(0.0));
}

// ============================================================================
// Failure Isolation Tests
// ============================================================================

#[test]
fn test_infeasible_attempt_is_skipped() {
    let engine = ScriptedEngine::new().script(BI, vec![vec![2]]);

    let schedule = solve(&two_task_problem(1000), &engine, &options(vec![PCA, BI])).unwrap();

    assert_eq!(visited(&schedule), vec![(0.0, 0.002)]);
    assert_eq!(engine.calls(), 2);
}

#[test]
fn test_over_budget_attempt_is_excluded() {
    // X then Y costs 24s, X alone 12s
    let engine = ScriptedEngine::new().script(PCA, vec![vec![1, 2]]).script(BI, vec![vec![1]]);

    let schedule = solve(&two_task_problem(15), &engine, &options(vec![PCA, BI])).unwrap();

    assert_eq!(visited(&schedule), vec![(0.0, 0.001)]);
    assert!(schedule.routes[0].total_time <= 15);
}

#[test]
fn test_wrong_terminal_attempt_is_excluded() {
    // depot layout: 0 task X, 1 task Y, 2 shared anchor and depot
    let engine = ScriptedEngine::new().script(PCA, vec![vec![1]]);
    let problem = two_task_problem(1000).with_depots(vec![Location::new(0.0, 0.0)]);

    // a path ending at a task instead of the depot
    struct Truncating(ScriptedEngine);
    impl sensing_planner::RoutingEngine for Truncating {
        fn solve(
            &self,
            model: &sensing_planner::RoutingModel,
            params: &sensing_planner::SearchParameters,
        ) -> Option<Vec<Vec<usize>>> {
            let mut paths = self.0.solve(model, params)?;
            for path in &mut paths {
                path.pop();
            }
            Some(paths)
        }
    }

    let result = solve(&problem, &Truncating(engine), &options(vec![PCA]));
    assert!(matches!(result, Err(SolveError::AllAttemptsFailed { attempts: 1 })));
}

#[test]
fn test_all_attempts_failing_fails_the_solve() {
    let engine = ScriptedEngine::new();

    let result = solve(&two_task_problem(1000), &engine, &options(vec![PCA, BI]));

    assert!(matches!(result, Err(SolveError::AllAttemptsFailed { attempts: 2 })));
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn test_configuration_error_before_fan_out() {
    let engine = ScriptedEngine::new().script(PCA, vec![vec![1]]);
    let mut problem = two_task_problem(1000);
    problem.vehicles.clear();

    let result = solve(&problem, &engine, &options(vec![PCA]));

    assert!(matches!(result, Err(SolveError::Configuration(_))));
    assert_eq!(engine.calls(), 0);
}

#[test]
fn test_unknown_warm_start_task_is_configuration_error() {
    let engine = ScriptedEngine::new().script(PCA, vec![vec![1]]);
    let stray = Route {
        path: vec![Stop {
            location: Location::new(9.0, 9.0),
            app_id: 1,
            request_time: 0,
            fulfill_time: 0,
        }],
        total_interest: 1.0,
        total_time: 0,
        vehicle_start: Location::new(0.0, 0.0),
        vehicle_end: Location::new(9.0, 9.0),
    };
    let problem = two_task_problem(1000).with_initial_schedule(vec![stray]);

    let result = solve(&problem, &engine, &options(vec![PCA]));

    assert!(matches!(result, Err(SolveError::Configuration(_))));
    assert_eq!(engine.calls(), 0);
}

#[test]
fn test_empty_heuristic_list_is_configuration_error() {
    let engine = ScriptedEngine::new();
    let result = solve(&two_task_problem(1000), &engine, &options(Vec::new()));
    assert!(matches!(result, Err(SolveError::Configuration(_))));
}
