//! Built-in routing engine (baseline implementation).
//!
//! Greedy construction followed by local search over the arc-routing model.
//! Objective: total arc cost plus the penalty of every optional node left
//! unvisited, subject to each route's cost staying within its vehicle bound.

use std::cmp::Reverse;
use std::time::Instant;

use tracing::debug;

use crate::engine::{FirstSolutionStrategy, RoutingEngine, RoutingModel, SearchParameters};

#[derive(Debug, Clone)]
pub struct InsertionEngine {
    /// Maximum local search rounds per solve.
    pub max_iterations: usize,
}

impl Default for InsertionEngine {
    fn default() -> Self {
        Self {
            max_iterations: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Construction {
    /// Extend each path with the cheapest reachable arc.
    CheapestArc,
    /// Extend each path with the best penalty per second of arc.
    DensestArc,
    /// Insert nodes by decreasing penalty at their cheapest position.
    Insertion,
    /// Start with every optional node dropped.
    Unperformed,
}

impl From<FirstSolutionStrategy> for Construction {
    fn from(strategy: FirstSolutionStrategy) -> Self {
        match strategy {
            FirstSolutionStrategy::PathCheapestArc
            | FirstSolutionStrategy::GlobalCheapestArc
            | FirstSolutionStrategy::LocalCheapestArc
            | FirstSolutionStrategy::FirstUnboundMinValue
            | FirstSolutionStrategy::Christofides => Construction::CheapestArc,
            FirstSolutionStrategy::PathMostConstrainedArc => Construction::DensestArc,
            FirstSolutionStrategy::BestInsertion
            | FirstSolutionStrategy::ParallelCheapestInsertion
            | FirstSolutionStrategy::LocalCheapestInsertion => Construction::Insertion,
            FirstSolutionStrategy::AllUnperformed => Construction::Unperformed,
        }
    }
}

impl RoutingEngine for InsertionEngine {
    fn solve(&self, model: &RoutingModel, params: &SearchParameters) -> Option<Vec<Vec<usize>>> {
        let num_vehicles = model.num_vehicles();
        if num_vehicles == 0
            || model.ends.len() != num_vehicles
            || model.dimension.vehicle_capacity.len() != num_vehicles
        {
            return None;
        }

        let mut search = Search::new(model, Instant::now() + params.time_limit);
        if !search.is_feasible() {
            debug!("empty routes already exceed the vehicle bound");
            return None;
        }

        let warm = match model.initial_routes.as_deref() {
            Some(initial) => {
                let accepted = search.try_warm_start(initial);
                if !accepted {
                    debug!("ignoring infeasible warm start");
                }
                accepted
            }
            None => false,
        };
        if !warm {
            search.construct(Construction::from(params.first_solution_strategy));
        }

        let rounds = search.improve(self.max_iterations, params.local_search_metaheuristic.is_some());

        if !search.is_feasible() {
            return None;
        }

        debug!(
            strategy = ?params.first_solution_strategy,
            warm,
            rounds,
            visited = search.visited.iter().filter(|v| **v).count(),
            "search finished"
        );

        Some(search.into_paths())
    }
}

struct Search<'a> {
    model: &'a RoutingModel,
    /// Drop penalty for optional nodes, `None` for starts/ends.
    penalty: Vec<Option<i64>>,
    /// Interior nodes per vehicle, start and end excluded.
    routes: Vec<Vec<usize>>,
    route_costs: Vec<i64>,
    visited: Vec<bool>,
    deadline: Instant,
}

impl<'a> Search<'a> {
    fn new(model: &'a RoutingModel, deadline: Instant) -> Self {
        let mut penalty = vec![None; model.num_nodes];
        for d in &model.disjunctions {
            if d.node < model.num_nodes {
                penalty[d.node] = Some(d.penalty);
            }
        }
        let num_vehicles = model.num_vehicles();
        Self {
            model,
            penalty,
            routes: vec![Vec::new(); num_vehicles],
            route_costs: (0..num_vehicles).map(|v| model.route_cost(v, &[])).collect(),
            visited: vec![false; model.num_nodes],
            deadline,
        }
    }

    fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    fn bound(&self, vehicle: usize) -> i64 {
        self.model.dimension.vehicle_capacity[vehicle]
    }

    fn penalty_of(&self, node: usize) -> i64 {
        self.penalty[node].unwrap_or(0)
    }

    fn is_feasible(&self) -> bool {
        self.route_costs
            .iter()
            .enumerate()
            .all(|(v, &cost)| cost <= self.bound(v))
    }

    /// Unvisited optional nodes, highest penalty first.
    fn unperformed(&self) -> Vec<usize> {
        let mut nodes: Vec<usize> = (0..self.model.num_nodes)
            .filter(|&n| self.penalty[n].is_some() && !self.visited[n])
            .collect();
        nodes.sort_by_key(|&n| (Reverse(self.penalty_of(n)), n));
        nodes
    }

    fn try_warm_start(&mut self, initial: &[Vec<usize>]) -> bool {
        if initial.len() != self.routes.len() {
            return false;
        }
        let mut seen = vec![false; self.model.num_nodes];
        for route in initial {
            for &n in route {
                if n >= self.model.num_nodes || self.penalty[n].is_none() || seen[n] {
                    return false;
                }
                seen[n] = true;
            }
        }
        let costs: Vec<i64> = initial
            .iter()
            .enumerate()
            .map(|(v, route)| self.model.route_cost(v, route))
            .collect();
        if costs.iter().enumerate().any(|(v, &c)| c > self.bound(v)) {
            return false;
        }

        self.routes = initial.to_vec();
        self.route_costs = costs;
        self.visited = seen;
        true
    }

    fn construct(&mut self, construction: Construction) {
        match construction {
            Construction::CheapestArc => self.construct_by_arc(false),
            Construction::DensestArc => self.construct_by_arc(true),
            Construction::Insertion => {
                self.insert_unperformed(false);
            }
            Construction::Unperformed => {}
        }
    }

    fn construct_by_arc(&mut self, densest: bool) {
        for v in 0..self.routes.len() {
            let end = self.model.ends[v];
            let mut tail = self.model.starts[v];
            let mut prefix = 0;
            let mut interior = Vec::new();

            loop {
                let mut best: Option<(f64, usize)> = None;
                for n in 0..self.model.num_nodes {
                    if self.penalty[n].is_none() || self.visited[n] {
                        continue;
                    }
                    let arc = self.model.arc_cost(tail, n);
                    if prefix + arc + self.model.arc_cost(n, end) > self.bound(v) {
                        continue;
                    }
                    let score = if densest {
                        -(self.penalty_of(n) as f64) / (arc as f64 + 1.0)
                    } else {
                        arc as f64
                    };
                    if best.is_none_or(|(s, _)| score < s) {
                        best = Some((score, n));
                    }
                }

                let Some((_, n)) = best else { break };
                prefix += self.model.arc_cost(tail, n);
                self.visited[n] = true;
                interior.push(n);
                tail = n;
            }

            self.route_costs[v] = self.model.route_cost(v, &interior);
            self.routes[v] = interior;
        }
    }

    /// Cheapest feasible position for `node` in `base`: (position, new route cost).
    fn cheapest_insertion(&self, vehicle: usize, base: &[usize], base_cost: i64, node: usize) -> Option<(usize, i64)> {
        let start = self.model.starts[vehicle];
        let end = self.model.ends[vehicle];
        let mut best: Option<(usize, i64)> = None;

        for pos in 0..=base.len() {
            let prev = if pos == 0 { start } else { base[pos - 1] };
            let next = if pos == base.len() { end } else { base[pos] };
            let cost = base_cost + self.model.arc_cost(prev, node) + self.model.arc_cost(node, next)
                - self.model.arc_cost(prev, next);
            if cost <= self.bound(vehicle) && best.is_none_or(|(_, c)| cost < c) {
                best = Some((pos, cost));
            }
        }
        best
    }

    /// Inserts unvisited nodes at their cheapest feasible position. With
    /// `require_gain`, only when the added cost is below the node's penalty.
    fn insert_unperformed(&mut self, require_gain: bool) -> bool {
        let mut improved = false;

        for node in self.unperformed() {
            if self.expired() {
                break;
            }

            let mut best: Option<(usize, usize, i64)> = None;
            for v in 0..self.routes.len() {
                if let Some((pos, cost)) = self.cheapest_insertion(v, &self.routes[v], self.route_costs[v], node) {
                    let delta = cost - self.route_costs[v];
                    if best.is_none_or(|(bv, _, bc)| delta < bc - self.route_costs[bv]) {
                        best = Some((v, pos, cost));
                    }
                }
            }

            let Some((v, pos, cost)) = best else { continue };
            if require_gain && cost - self.route_costs[v] >= self.penalty_of(node) {
                continue;
            }
            self.routes[v].insert(pos, node);
            self.route_costs[v] = cost;
            self.visited[node] = true;
            improved = true;
        }

        improved
    }

    /// 2-opt: reverse a segment of one route to reduce its cost.
    fn two_opt(&mut self, vehicle: usize) -> bool {
        let n = self.routes[vehicle].len();
        if n < 2 {
            return false;
        }

        let current = self.route_costs[vehicle];
        for i in 0..n - 1 {
            for j in i + 1..n {
                let mut candidate = self.routes[vehicle].clone();
                candidate[i..=j].reverse();
                let cost = self.model.route_cost(vehicle, &candidate);
                if cost < current {
                    self.routes[vehicle] = candidate;
                    self.route_costs[vehicle] = cost;
                    return true;
                }
            }
        }

        false
    }

    /// Relocate: move one node to its cheapest position in any route when the
    /// combined cost drops.
    fn relocate(&mut self) -> bool {
        let num_vehicles = self.routes.len();

        for from in 0..num_vehicles {
            for idx in 0..self.routes[from].len() {
                let node = self.routes[from][idx];
                let mut removed = self.routes[from].clone();
                removed.remove(idx);
                let removed_cost = self.model.route_cost(from, &removed);

                for to in 0..num_vehicles {
                    if to != from && removed_cost > self.bound(from) {
                        continue;
                    }
                    let insertion = if to == from {
                        self.cheapest_insertion(to, &removed, removed_cost, node)
                    } else {
                        self.cheapest_insertion(to, &self.routes[to], self.route_costs[to], node)
                    };
                    let Some((pos, cost)) = insertion else { continue };

                    if to == from {
                        if cost < self.route_costs[from] {
                            removed.insert(pos, node);
                            self.routes[from] = removed;
                            self.route_costs[from] = cost;
                            return true;
                        }
                    } else if removed_cost + cost < self.route_costs[from] + self.route_costs[to] {
                        self.routes[from] = removed;
                        self.route_costs[from] = removed_cost;
                        self.routes[to].insert(pos, node);
                        self.route_costs[to] = cost;
                        return true;
                    }
                }
            }
        }

        false
    }

    /// Drop a visited node whose cost saving exceeds its penalty.
    fn drop_unprofitable(&mut self) -> bool {
        for v in 0..self.routes.len() {
            for idx in 0..self.routes[v].len() {
                let node = self.routes[v][idx];
                let mut removed = self.routes[v].clone();
                removed.remove(idx);
                let removed_cost = self.model.route_cost(v, &removed);
                if removed_cost <= self.bound(v) && self.route_costs[v] - removed_cost > self.penalty_of(node) {
                    self.routes[v] = removed;
                    self.route_costs[v] = removed_cost;
                    self.visited[node] = false;
                    return true;
                }
            }
        }
        false
    }

    /// Swap a visited node for an unvisited one with a higher penalty.
    fn exchange(&mut self) -> bool {
        let candidates = self.unperformed();

        for v in 0..self.routes.len() {
            for idx in 0..self.routes[v].len() {
                let out = self.routes[v][idx];
                for &inn in &candidates {
                    if self.penalty_of(inn) <= self.penalty_of(out) {
                        break;
                    }
                    let mut swapped = self.routes[v].clone();
                    swapped[idx] = inn;
                    let cost = self.model.route_cost(v, &swapped);
                    if cost > self.bound(v) {
                        continue;
                    }
                    let gain = self.penalty_of(inn) - self.penalty_of(out) - (cost - self.route_costs[v]);
                    if gain > 0 {
                        self.routes[v] = swapped;
                        self.route_costs[v] = cost;
                        self.visited[out] = false;
                        self.visited[inn] = true;
                        return true;
                    }
                }
            }
        }

        false
    }

    /// Run local search until no more improvements, max rounds, or the deadline.
    fn improve(&mut self, max_iterations: usize, exchange: bool) -> usize {
        let mut rounds = 0;

        while rounds < max_iterations && !self.expired() {
            rounds += 1;
            let mut improved = self.insert_unperformed(true);

            for v in 0..self.routes.len() {
                if self.two_opt(v) {
                    improved = true;
                }
            }

            if self.relocate() {
                improved = true;
            }

            if self.drop_unprofitable() {
                improved = true;
            }

            if exchange && self.exchange() {
                improved = true;
            }

            if !improved {
                break;
            }
        }

        rounds
    }

    fn into_paths(self) -> Vec<Vec<usize>> {
        let model = self.model;
        self.routes
            .into_iter()
            .enumerate()
            .map(|(v, interior)| {
                let mut path = Vec::with_capacity(interior.len() + 2);
                path.push(model.starts[v]);
                path.extend(interior);
                path.push(model.ends[v]);
                path
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::engine::{CumulDimension, Disjunction, LocalSearchMetaheuristic};

    fn params(strategy: FirstSolutionStrategy) -> SearchParameters {
        SearchParameters {
            first_solution_strategy: strategy,
            local_search_metaheuristic: None,
            time_limit: Duration::from_secs(5),
        }
    }

    // 0 sentinel end, 1 cheap low-value node, 2 pricier high-value node, 3 start.
    fn trade_off_model(bound: i64) -> RoutingModel {
        RoutingModel {
            num_nodes: 4,
            starts: vec![3],
            ends: vec![0],
            costs: vec![
                vec![0, 0, 0, 0],
                vec![0, 0, 20, 5],
                vec![0, 20, 0, 8],
                vec![0, 5, 8, 0],
            ],
            disjunctions: vec![
                Disjunction { node: 1, penalty: 10 },
                Disjunction { node: 2, penalty: 100 },
            ],
            dimension: CumulDimension {
                vehicle_capacity: vec![bound],
                slack_max: 0,
                fix_start_cumul_to_zero: true,
            },
            initial_routes: None,
        }
    }

    // A line of nodes 1..=n at 10s spacing from start n+1, ending at sentinel 0.
    fn line_model(n: usize, vehicles: usize, bound: i64) -> RoutingModel {
        let num_nodes = n + 2;
        let start = n + 1;
        let pos = |i: usize| -> i64 { if i == start { 0 } else { i as i64 * 10 } };
        let costs = (0..num_nodes)
            .map(|i| {
                (0..num_nodes)
                    .map(|j| if i == 0 || j == 0 { 0 } else { (pos(i) - pos(j)).abs() })
                    .collect()
            })
            .collect();
        RoutingModel {
            num_nodes,
            starts: vec![start; vehicles],
            ends: vec![0; vehicles],
            costs,
            disjunctions: (1..=n).map(|i| Disjunction { node: i, penalty: 1000 }).collect(),
            dimension: CumulDimension {
                vehicle_capacity: vec![bound; vehicles],
                slack_max: 0,
                fix_start_cumul_to_zero: true,
            },
            initial_routes: None,
        }
    }

    #[test]
    fn test_every_strategy_stays_within_bound() {
        let model = line_model(6, 2, 35);
        for strategy in FirstSolutionStrategy::ALL {
            let paths = InsertionEngine::default().solve(&model, &params(strategy)).unwrap();
            assert_eq!(paths.len(), 2);
            for (v, path) in paths.iter().enumerate() {
                assert_eq!(path.first(), Some(&model.starts[v]));
                assert_eq!(path.last(), Some(&model.ends[v]));
                let interior = &path[1..path.len() - 1];
                assert!(model.route_cost(v, interior) <= 35, "{:?} exceeded bound", strategy);
            }
        }
    }

    #[test]
    fn test_visits_everything_when_budget_allows() {
        let model = line_model(5, 1, 1000);
        let paths = InsertionEngine::default()
            .solve(&model, &params(FirstSolutionStrategy::AllUnperformed))
            .unwrap();
        assert_eq!(paths[0].len(), 7);
    }

    #[test]
    fn test_cheapest_arc_keeps_cheap_node_without_metaheuristic() {
        let model = trade_off_model(10);
        let paths = InsertionEngine::default()
            .solve(&model, &params(FirstSolutionStrategy::PathCheapestArc))
            .unwrap();
        assert_eq!(paths[0], vec![3, 1, 0]);
    }

    #[test]
    fn test_metaheuristic_exchanges_for_higher_penalty() {
        let model = trade_off_model(10);
        let mut p = params(FirstSolutionStrategy::PathCheapestArc);
        p.local_search_metaheuristic = Some(LocalSearchMetaheuristic::SimulatedAnnealing);
        let paths = InsertionEngine::default().solve(&model, &p).unwrap();
        assert_eq!(paths[0], vec![3, 2, 0]);
    }

    #[test]
    fn test_insertion_prefers_high_penalty() {
        let model = trade_off_model(10);
        let paths = InsertionEngine::default()
            .solve(&model, &params(FirstSolutionStrategy::BestInsertion))
            .unwrap();
        assert_eq!(paths[0], vec![3, 2, 0]);
    }

    #[test]
    fn test_drops_everything_when_nothing_fits() {
        let model = trade_off_model(4);
        let paths = InsertionEngine::default()
            .solve(&model, &params(FirstSolutionStrategy::BestInsertion))
            .unwrap();
        assert_eq!(paths[0], vec![3, 0]);
    }

    #[test]
    fn test_infeasible_when_end_unreachable() {
        let mut model = trade_off_model(10);
        model.ends = vec![2];
        model.disjunctions.retain(|d| d.node != 2);
        model.dimension.vehicle_capacity = vec![5];
        let result = InsertionEngine::default().solve(&model, &params(FirstSolutionStrategy::PathCheapestArc));
        assert!(result.is_none());
    }

    #[test]
    fn test_feasible_warm_start_is_kept() {
        let mut model = trade_off_model(10);
        model.initial_routes = Some(vec![vec![2]]);
        let paths = InsertionEngine::default()
            .solve(&model, &params(FirstSolutionStrategy::PathCheapestArc))
            .unwrap();
        assert_eq!(paths[0], vec![3, 2, 0]);
    }

    #[test]
    fn test_infeasible_warm_start_is_ignored() {
        let mut model = trade_off_model(10);
        model.initial_routes = Some(vec![vec![1, 2]]);
        let paths = InsertionEngine::default()
            .solve(&model, &params(FirstSolutionStrategy::PathCheapestArc))
            .unwrap();
        assert_eq!(paths[0], vec![3, 1, 0]);
    }

    #[test]
    fn test_two_opt_untangles_route() {
        let mut model = line_model(3, 1, 1000);
        model.initial_routes = Some(vec![vec![3, 1, 2]]);
        let paths = InsertionEngine::default()
            .solve(&model, &params(FirstSolutionStrategy::AllUnperformed))
            .unwrap();
        assert_eq!(paths[0], vec![4, 1, 2, 3, 0]);
    }
}
