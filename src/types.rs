// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which clock a time trigger measures against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeType {
    /// Simulated time reported by the host.
    #[default]
    Sim,
    /// Wall-clock time elapsed since the iteration started.
    Real,
}

impl FromStr for TimeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sim" => Ok(TimeType::Sim),
            "real" => Ok(TimeType::Real),
            other => Err(format!(
                "invalid time type: {other} (expected \"sim\" or \"real\")"
            )),
        }
    }
}

/// The available trigger types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    Time,
    Region,
    Undefined,
}

impl FromStr for TriggerType {
    type Err = std::convert::Infallible;

    /// Unknown strings map to `Undefined`; validation rejects those.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "time" => TriggerType::Time,
            "region" => TriggerType::Region,
            _ => TriggerType::Undefined,
        })
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TriggerType::Time => "time",
            TriggerType::Region => "region",
            TriggerType::Undefined => "undefined",
        };
        f.write_str(s)
    }
}

/// Tri-state outcome of a trigger or a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    #[default]
    Unset,
    Pass,
    Fail,
}

impl Outcome {
    pub fn from_bool(passed: bool) -> Self {
        if passed { Outcome::Pass } else { Outcome::Fail }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Outcome::Unset)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Unset => "unset",
            Outcome::Pass => "pass",
            Outcome::Fail => "fail",
        };
        f.write_str(s)
    }
}
