//! Distance matrix construction.
//!
//! Two sources: geodesic estimates computed on demand, or a sparse travel-time
//! table supplied from outside (e.g. a road or airspace router). Both add the
//! destination's dwell time to every arc.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use crate::error::SolveError;
use crate::geo::{self, Location};
use crate::interest::InterestMap;
use crate::model::Node;

/// Cost substituted for missing or NaN table entries. Large but finite so the
/// arc stays usable for the engine.
pub const INVALID_TRAVEL_TIME_PENALTY: i64 = 1_000_000;

/// Provides arc costs over a node list.
///
/// The matrix is indexed by the provided node order.
pub trait DistanceMatrixProvider {
    fn arc_cost(&self, from: &Node, to: &Node) -> i64;

    fn matrix_for(&self, nodes: &[Node]) -> Vec<Vec<i64>> {
        nodes
            .iter()
            .map(|from| nodes.iter().map(|to| self.arc_cost(from, to)).collect())
            .collect()
    }
}

/// One entry of an external travel-time table.
#[derive(Debug, Clone, Deserialize)]
pub struct TravelTimeRecord {
    #[serde(rename = "Dropoff")]
    pub origin: Location,
    #[serde(rename = "Pickup")]
    pub destination: Location,
    #[serde(rename = "TravelTime", deserialize_with = "travel_seconds")]
    pub travel_time: f64,
}

/// Accepts a number, `null`, or a non-finite literal as a string (`"NaN"`,
/// `"Infinity"`, `"-Infinity"`). Anything else is malformed.
fn travel_seconds<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Null(()),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Null(()) => Ok(f64::NAN),
        Raw::Text(text) => match text.parse::<f64>() {
            Ok(value) if !value.is_finite() => Ok(value),
            _ => Err(serde::de::Error::custom(format!(
                "travel time must be numeric or NaN, got {:?}",
                text
            ))),
        },
    }
}

/// Quotes bare `NaN`, `Infinity` and `-Infinity` tokens outside strings.
///
/// Python's `json` module writes non-finite floats this way, which strict
/// JSON parsers reject.
fn quote_non_finite(json: &str) -> String {
    const TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

    let mut out = String::with_capacity(json.len());
    let mut rest = json;
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if let Some(token) = TOKENS.iter().find(|t| rest.starts_with(**t)) {
            out.push('"');
            out.push_str(token);
            out.push('"');
            rest = &rest[token.len()..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    out
}

/// Sparse `(origin, destination) -> seconds` lookup. Asymmetric.
#[derive(Debug, Clone, Default)]
pub struct TravelTimeTable {
    entries: HashMap<(Location, Location), f64>,
}

impl TravelTimeTable {
    pub fn from_records(records: impl IntoIterator<Item = TravelTimeRecord>) -> Self {
        let entries = records
            .into_iter()
            .map(|r| ((r.origin, r.destination), r.travel_time))
            .collect();
        Self { entries }
    }

    /// Parses a JSON list of `{Dropoff, Pickup, TravelTime}` records. Bare
    /// `NaN`/`Infinity` travel times are accepted and stored as non-finite.
    pub fn from_json(json: &str) -> Result<Self, SolveError> {
        let records: Vec<TravelTimeRecord> = serde_json::from_str(&quote_non_finite(json))?;
        Ok(Self::from_records(records))
    }

    pub fn insert(&mut self, origin: Location, destination: Location, seconds: f64) {
        self.entries.insert((origin, destination), seconds);
    }

    /// Raw table value, `None` when the pair is absent.
    pub fn get(&self, origin: Location, destination: Location) -> Option<f64> {
        self.entries.get(&(origin, destination)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that are NaN or infinite.
    pub fn invalid_entries(&self) -> usize {
        self.entries.values().filter(|v| !v.is_finite()).count()
    }

    /// Whole seconds for a pair, with the penalty for missing or non-finite
    /// values. Fractions round up rather than truncate.
    pub fn seconds(&self, origin: Location, destination: Location) -> i64 {
        match self.get(origin, destination) {
            Some(value) if value.is_finite() => value.ceil() as i64,
            _ => INVALID_TRAVEL_TIME_PENALTY,
        }
    }
}

#[derive(Debug, Clone)]
pub enum MatrixMode {
    /// Geodesic estimate at the fleet reference speed (m/s).
    Computed { speed: f64 },
    Lookup(Arc<TravelTimeTable>),
}

/// Cost provider for one solve attempt.
///
/// Pure in (nodes, mode, dwell map): model building and solution decoding
/// both call it and must see identical values.
#[derive(Debug, Clone)]
pub struct TravelCosts {
    mode: MatrixMode,
    dwell: InterestMap,
}

impl TravelCosts {
    pub fn new(mode: MatrixMode, dwell: InterestMap) -> Self {
        Self { mode, dwell }
    }

    pub fn mode(&self) -> &MatrixMode {
        &self.mode
    }

    /// Dwell seconds at a node: the task's sensing time, 0 otherwise.
    pub fn dwell_time(&self, node: &Node) -> f64 {
        match node {
            Node::Task(key) => self.dwell.get(key).map_or(0.0, |r| r.task_time_seconds),
            Node::Anchor(_) | Node::Sentinel => 0.0,
        }
    }
}

impl DistanceMatrixProvider for TravelCosts {
    fn arc_cost(&self, from: &Node, to: &Node) -> i64 {
        let (Some(origin), Some(destination)) = (from.location(), to.location()) else {
            return 0;
        };
        let dwell = self.dwell_time(to);

        match &self.mode {
            MatrixMode::Computed { speed } => geo::travel_time(origin, destination, *speed, dwell),
            MatrixMode::Lookup(table) => {
                if from == to {
                    dwell.ceil() as i64
                } else {
                    table.seconds(origin, destination) + dwell.ceil() as i64
                }
            }
        }
    }
}
