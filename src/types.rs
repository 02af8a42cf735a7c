//! Core types shared across the analysis engine.

use core::fmt;

use serde::{Deserialize, Serialize};

/// The optimization sense of a criterion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    /// Smaller values are better.
    #[serde(rename = "min")]
    Minimize,
    /// Larger values are better.
    #[serde(rename = "max")]
    Maximize,
}

impl Sense {
    /// `+1` for maximized criteria, `-1` for minimized ones.
    #[must_use]
    pub fn mult(self) -> f64 {
        match self {
            Sense::Minimize => -1.0,
            Sense::Maximize => 1.0,
        }
    }

    /// Parse the `min`/`max` spelling used in configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSense`](crate::Error::InvalidSense) for any other token.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "min" => Ok(Sense::Minimize),
            "max" => Ok(Sense::Maximize),
            other => Err(crate::Error::InvalidSense(other.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Sense::Minimize => "min",
            Sense::Maximize => "max",
        }
    }
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Termination status reported by a solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// An optimal solution was found.
    Optimal,
    /// The constraints cannot be satisfied simultaneously.
    Infeasible,
    /// The objective is unbounded.
    Unbounded,
    /// Any other solver failure.
    Failed,
}

impl SolveStatus {
    #[must_use]
    pub fn is_optimal(self) -> bool {
        self == SolveStatus::Optimal
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::Failed => "failed",
        })
    }
}
