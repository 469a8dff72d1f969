//! Translation of the mission problem into an arc-routing model.

use std::collections::HashMap;

use tracing::debug;

use crate::engine::{CumulDimension, Disjunction, RoutingModel};
use crate::error::SolveError;
use crate::geo::Location;
use crate::interest::{InterestMap, TaskKey};
use crate::matrix::{DistanceMatrixProvider, MatrixMode, TravelCosts};
use crate::problem::Problem;
use crate::schedule::Route;

/// Budget seconds granted per unit of capacity, and dwell seconds charged per
/// unit of collected interest, when the capacity bias is enabled.
pub const CAPACITY_TASK_BIAS: i64 = 700;

/// Scales interest into the engine's integer penalty domain.
pub const DROP_PENALTY_SCALE: f64 = 1e8;

/// A point in the routing index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    Task(TaskKey),
    /// Vehicle start or depot.
    Anchor(Location),
    /// No location; free to enter and leave.
    Sentinel,
}

impl Node {
    pub fn location(&self) -> Option<Location> {
        match self {
            Node::Task(key) => Some(key.location),
            Node::Anchor(location) => Some(*location),
            Node::Sentinel => None,
        }
    }

    pub fn task_key(&self) -> Option<&TaskKey> {
        match self {
            Node::Task(key) => Some(key),
            _ => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Node::Sentinel)
    }
}

/// Ordered, duplicate-free node list. Position is the engine's node index.
#[derive(Debug, Clone, Default)]
pub struct NodeList {
    nodes: Vec<Node>,
    index: HashMap<Node, usize>,
}

impl NodeList {
    /// Appends `node` unless already present; returns its index either way.
    fn push_unique(&mut self, node: Node) -> usize {
        if let Some(&i) = self.index.get(&node) {
            return i;
        }
        let i = self.nodes.len();
        self.nodes.push(node);
        self.index.insert(node, i);
        i
    }

    pub fn index_of(&self, node: &Node) -> Option<usize> {
        self.index.get(node).copied()
    }

    pub fn get(&self, i: usize) -> Option<&Node> {
        self.nodes.get(i)
    }

    pub fn as_slice(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A model ready for an engine, plus what decoding needs.
#[derive(Debug, Clone)]
pub struct BuiltModel {
    pub model: RoutingModel,
    pub nodes: NodeList,
    pub costs: TravelCosts,
    pub effective_budget: i64,
    pub depots: Option<Vec<Location>>,
}

/// Budget after folding in the capacity bias.
pub fn effective_budget(budget: i64, capacity: Option<i64>) -> i64 {
    match capacity {
        Some(c) if c > 0 => budget + c * CAPACITY_TASK_BIAS,
        _ => budget,
    }
}

/// Charges extra dwell time proportional to each task's true interest.
///
/// Together with `effective_budget` this approximates the capacity resource:
/// it discourages collecting more than `capacity` interest per vehicle but
/// does not prevent it.
pub fn apply_capacity_bias(map: &InterestMap, value_map: &InterestMap, capacity: Option<i64>) -> InterestMap {
    let mut biased = map.clone();
    if !matches!(capacity, Some(c) if c > 0) {
        return biased;
    }
    for (key, value) in value_map.iter() {
        if let Some(record) = biased.get_mut(key) {
            record.task_time_seconds += CAPACITY_TASK_BIAS as f64 * value.interest;
        }
    }
    biased
}

/// Checks the problem before any model is built.
pub fn validate(problem: &Problem) -> Result<(), SolveError> {
    if problem.vehicles.is_empty() {
        return Err(SolveError::config("at least one vehicle is required"));
    }
    if let Some(v) = problem.vehicles.iter().find(|v| !(v.speed > 0.0) || !v.speed.is_finite()) {
        return Err(SolveError::config(format!(
            "vehicle speed must be positive, got {} at {:?}",
            v.speed, v.location
        )));
    }
    if problem.budget < 0 {
        return Err(SolveError::config(format!("negative budget {}", problem.budget)));
    }
    if let Some(depots) = &problem.depots {
        if depots.len() != problem.vehicles.len() {
            return Err(SolveError::config(format!(
                "{} depots configured for {} vehicles",
                depots.len(),
                problem.vehicles.len()
            )));
        }
    }
    if let Some(routes) = &problem.initial_schedule {
        if routes.len() > problem.vehicles.len() {
            return Err(SolveError::config(format!(
                "initial schedule has {} routes for {} vehicles",
                routes.len(),
                problem.vehicles.len()
            )));
        }
        if let Some(stop) = routes
            .iter()
            .flat_map(|r| &r.path)
            .find(|s| !problem.interest_map.contains(&s.key()))
        {
            return Err(SolveError::config(format!(
                "initial schedule visits unknown task {:?}",
                stop.key()
            )));
        }
    }
    if let Some(unweighted) = &problem.unweighted_interest_map {
        if let Some(key) = problem.interest_map.keys().find(|k| !unweighted.contains(k)) {
            return Err(SolveError::config(format!(
                "task {:?} has no unweighted interest",
                key
            )));
        }
    }
    Ok(())
}

/// Builds the routing model for one attempt.
pub fn build_model(problem: &Problem) -> Result<BuiltModel, SolveError> {
    validate(problem)?;

    let capacity = problem.capacity_enabled();
    let budget = effective_budget(problem.budget, capacity);
    let dwell = apply_capacity_bias(&problem.interest_map, problem.value_map(), capacity);

    let mut nodes = NodeList::default();
    if problem.depots.is_none() {
        nodes.push_unique(Node::Sentinel);
    }
    for key in problem.interest_map.keys() {
        nodes.push_unique(Node::Task(*key));
    }
    let starts: Vec<usize> = problem
        .vehicles
        .iter()
        .map(|v| nodes.push_unique(Node::Anchor(v.location)))
        .collect();
    let ends: Vec<usize> = match &problem.depots {
        Some(depots) => depots
            .iter()
            .map(|d| nodes.push_unique(Node::Anchor(*d)))
            .collect(),
        None => vec![0; problem.vehicles.len()],
    };

    let mode = match &problem.travel_times {
        Some(table) => MatrixMode::Lookup(table.clone()),
        None => MatrixMode::Computed {
            speed: problem.vehicles[0].speed,
        },
    };
    let costs = TravelCosts::new(mode, dwell);

    let disjunctions = nodes
        .as_slice()
        .iter()
        .enumerate()
        .filter_map(|(i, node)| {
            let record = problem.interest_map.get(node.task_key()?)?;
            Some(Disjunction {
                node: i,
                penalty: (record.interest * DROP_PENALTY_SCALE) as i64,
            })
        })
        .collect();

    let initial_routes = problem
        .initial_schedule
        .as_deref()
        .map(|routes| warm_start_routes(routes, &nodes, problem.vehicles.len()))
        .transpose()?;

    let model = RoutingModel {
        num_nodes: nodes.len(),
        starts,
        ends,
        costs: costs.matrix_for(nodes.as_slice()),
        disjunctions,
        dimension: CumulDimension {
            vehicle_capacity: vec![budget; problem.vehicles.len()],
            slack_max: 0,
            fix_start_cumul_to_zero: true,
        },
        initial_routes,
    };

    debug!(
        nodes = model.num_nodes,
        tasks = problem.interest_map.len(),
        vehicles = model.num_vehicles(),
        effective_budget = budget,
        warm_start = model.initial_routes.is_some(),
        "built routing model"
    );

    Ok(BuiltModel {
        model,
        nodes,
        costs,
        effective_budget: budget,
        depots: problem.depots.clone(),
    })
}

/// Maps a prior schedule onto node indices of a freshly built node list.
/// Route count is checked by `validate`; missing routes are left empty.
fn warm_start_routes(routes: &[Route], nodes: &NodeList, num_vehicles: usize) -> Result<Vec<Vec<usize>>, SolveError> {
    let mut indexed = Vec::with_capacity(num_vehicles);
    for route in routes {
        let mut path = Vec::with_capacity(route.path.len());
        for stop in &route.path {
            let key = stop.key();
            let i = nodes.index_of(&Node::Task(key)).ok_or_else(|| {
                SolveError::config(format!("initial schedule visits unknown task {:?}", key))
            })?;
            path.push(i);
        }
        indexed.push(path);
    }
    indexed.resize_with(num_vehicles, Vec::new);
    Ok(indexed)
}
