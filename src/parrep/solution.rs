//! Solutions admitted to (or rejected by) the Pareto representation.

use crate::criterion::Criteria;

/// Outcome of comparing two solutions criterion by criterion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dominance {
    /// The first solution dominates the second.
    Dominates,
    /// The first solution is dominated by the second.
    DominatedBy,
    /// Neither dominates the other.
    NonDominated,
}

/// One solution of the Pareto representation.
#[derive(Clone, Debug, PartialEq)]
pub struct ParSol {
    /// Iteration that produced the solution.
    pub itr_id: usize,
    /// Cuboid whose preferences produced the solution.
    pub cube_id: Option<usize>,
    /// Criterion values in model units.
    pub vals: Vec<f64>,
    /// Criterion achievements, clamped to `[0, 100]`.
    pub a_vals: Vec<f64>,
    /// Iteration of the solution that dominates this one.
    pub dominated_by: Option<usize>,
    /// Iteration of an earlier solution closer than `solEps`.
    pub close_to: Option<usize>,
}

impl ParSol {
    /// Snapshot the current criterion values.
    #[must_use]
    pub fn from_criteria(itr_id: usize, cube_id: Option<usize>, criteria: &Criteria) -> Self {
        Self {
            itr_id,
            cube_id,
            vals: criteria.values(),
            a_vals: criteria
                .achievements()
                .into_iter()
                .map(|a| a.clamp(0.0, 100.0))
                .collect(),
            dominated_by: None,
            close_to: None,
        }
    }

    /// `true` while the solution is neither close to nor dominated by another.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.dominated_by.is_none() && self.close_to.is_none()
    }

    /// L-infinity distance in achievement space.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        self.a_vals
            .iter()
            .zip(&other.a_vals)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }

    /// Compare with `other` using the criteria's tolerant comparisons.
    #[must_use]
    pub fn compare(&self, other: &Self, criteria: &Criteria) -> Dominance {
        let mut some_better = false;
        let mut some_worse = false;
        for (i, c) in criteria.iter().enumerate() {
            let (a, b) = (self.vals[i], other.vals[i]);
            if c.better(a, b) {
                some_better = true;
            } else if c.better(b, a) {
                some_worse = true;
            }
        }
        match (some_better, some_worse) {
            (true, false) => Dominance::Dominates,
            (false, true) => Dominance::DominatedBy,
            _ => Dominance::NonDominated,
        }
    }
}
