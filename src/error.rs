//! Error type shared by model building, extraction and the ensemble.

use std::fmt;

use crate::engine::FirstSolutionStrategy;

#[derive(Debug)]
pub enum SolveError {
    /// Malformed input, weight-count mismatch, unknown warm-start stop.
    Configuration(String),
    /// The engine reported no solution for this heuristic.
    Infeasible { heuristic: FirstSolutionStrategy },
    /// Extractor post-condition failed: model and engine disagree.
    Consistency(String),
    /// Malformed external travel-time data.
    Data(String),
    /// Every ensemble attempt failed.
    AllAttemptsFailed { attempts: usize },
}

impl SolveError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SolveError::Configuration(msg.into())
    }

    pub(crate) fn consistency(msg: impl Into<String>) -> Self {
        SolveError::Consistency(msg.into())
    }
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            SolveError::Infeasible { heuristic } => {
                write!(f, "no solution found with heuristic {:?}", heuristic)
            }
            SolveError::Consistency(msg) => write!(f, "consistency violation: {}", msg),
            SolveError::Data(msg) => write!(f, "invalid travel-time data: {}", msg),
            SolveError::AllAttemptsFailed { attempts } => {
                write!(f, "all {} solve attempts failed", attempts)
            }
        }
    }
}

impl std::error::Error for SolveError {}

impl From<serde_json::Error> for SolveError {
    fn from(err: serde_json::Error) -> Self {
        SolveError::Data(err.to_string())
    }
}
