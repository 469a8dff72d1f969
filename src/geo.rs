//! Geodesic travel model.
//!
//! Uses an equirectangular projection to estimate flight time between two
//! coordinates. Accurate enough at mission scale and cheap to evaluate for
//! full pairwise matrices.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6.3781e6;

/// A latitude/longitude pair in degrees.
///
/// Equality, hashing and ordering are total (via `OrderedFloat`) so locations
/// can be used inside map keys and sorted node lists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    fn ordered(&self) -> (OrderedFloat<f64>, OrderedFloat<f64>) {
        (OrderedFloat(self.latitude), OrderedFloat(self.longitude))
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.ordered() == other.ordered()
    }
}

impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ordered().hash(state);
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordered().cmp(&other.ordered())
    }
}

/// Straight-line distance in meters.
pub fn distance_m(from: Location, to: Location) -> f64 {
    let mean_lat = (0.5 * (from.latitude + to.latitude)).to_radians();
    let dx = (to.longitude - from.longitude).to_radians() * mean_lat.cos() * EARTH_RADIUS_M;
    let dy = (to.latitude - from.latitude).to_radians() * EARTH_RADIUS_M;
    dx.hypot(dy)
}

/// Travel time in whole seconds, including the sensing (dwell) time spent at
/// the destination.
///
/// Always rounds up so budget checks never underestimate. `speed` is in m/s
/// and must be strictly positive.
pub fn travel_time(from: Location, to: Location, speed: f64, sensing_time: f64) -> i64 {
    let flight_time = distance_m(from, to) / speed;
    (flight_time + sensing_time).ceil() as i64
}
