//! Decoding of engine paths into routes.
//!
//! Costs are recomputed from the travel model rather than trusted from the
//! engine, and every route is checked against the budget and its expected
//! end point before it is reported.

use std::collections::HashSet;

use tracing::debug;

use crate::error::SolveError;
use crate::interest::InterestMap;
use crate::matrix::DistanceMatrixProvider;
use crate::model::{BuiltModel, Node};
use crate::schedule::{Route, Stop};

/// Decodes one full node path per vehicle.
///
/// `value_map` supplies the reported interest; pass the unweighted map when
/// the model was built from reweighted interest.
pub fn extract_routes(
    built: &BuiltModel,
    value_map: &InterestMap,
    paths: &[Vec<usize>],
) -> Result<Vec<Route>, SolveError> {
    let num_vehicles = built.model.num_vehicles();
    if paths.len() != num_vehicles {
        return Err(SolveError::consistency(format!(
            "engine returned {} paths for {} vehicles",
            paths.len(),
            num_vehicles
        )));
    }

    let mut visited = HashSet::new();
    paths
        .iter()
        .enumerate()
        .map(|(vehicle, path)| extract_route(built, value_map, vehicle, path, &mut visited))
        .collect()
}

fn extract_route(
    built: &BuiltModel,
    value_map: &InterestMap,
    vehicle: usize,
    path: &[usize],
    visited: &mut HashSet<usize>,
) -> Result<Route, SolveError> {
    let start = built.model.starts[vehicle];
    if path.first() != Some(&start) {
        return Err(SolveError::consistency(format!(
            "vehicle {} path {:?} does not begin at its start node {}",
            vehicle, path, start
        )));
    }

    let nodes = path
        .iter()
        .map(|&i| {
            built.nodes.get(i).ok_or_else(|| {
                SolveError::consistency(format!("vehicle {} visits unknown node index {}", vehicle, i))
            })
        })
        .collect::<Result<Vec<&Node>, _>>()?;

    let mut cost = 0;
    let mut total_interest = 0.0;
    let mut stops = Vec::new();

    for (pos, node) in nodes.iter().enumerate() {
        if pos > 0 {
            cost += built.costs.arc_cost(nodes[pos - 1], node);
        }
        let interior = pos > 0 && pos + 1 < nodes.len();

        match node {
            Node::Task(key) => {
                if !visited.insert(path[pos]) {
                    return Err(SolveError::consistency(format!("task {:?} visited more than once", key)));
                }
                let record = value_map.get(key).ok_or_else(|| {
                    SolveError::consistency(format!("visited task {:?} has no interest record", key))
                })?;
                total_interest += record.interest;
                stops.push(Stop {
                    location: key.location,
                    app_id: key.app_id,
                    request_time: key.request_time,
                    fulfill_time: cost,
                });
            }
            Node::Anchor(location) if interior => {
                return Err(SolveError::consistency(format!(
                    "vehicle {} passes through anchor {:?}",
                    vehicle, location
                )));
            }
            Node::Anchor(_) | Node::Sentinel => {}
        }
    }

    if cost > built.effective_budget {
        return Err(SolveError::consistency(format!(
            "vehicle {} route costs {}s, budget is {}s",
            vehicle, cost, built.effective_budget
        )));
    }

    // path is non-empty: it begins at the start node
    let terminal = nodes[nodes.len() - 1];
    match &built.depots {
        Some(depots) => {
            if terminal.location() != Some(depots[vehicle]) || terminal.task_key().is_some() {
                return Err(SolveError::consistency(format!(
                    "vehicle {} ends at {:?}, expected depot {:?}",
                    vehicle, terminal, depots[vehicle]
                )));
            }
        }
        None => {
            if !terminal.is_sentinel() {
                return Err(SolveError::consistency(format!(
                    "vehicle {} ends at {:?}, expected the sentinel",
                    vehicle, terminal
                )));
            }
        }
    }

    let vehicle_start = nodes[0].location().ok_or_else(|| {
        SolveError::consistency(format!("vehicle {} starts at the sentinel", vehicle))
    })?;
    let vehicle_end = nodes
        .iter()
        .rev()
        .find_map(|n| n.location())
        .unwrap_or(vehicle_start);

    debug!(vehicle, stops = stops.len(), cost, total_interest, "extracted route");

    Ok(Route {
        path: stops,
        total_interest,
        total_time: cost,
        vehicle_start,
        vehicle_end,
    })
}
