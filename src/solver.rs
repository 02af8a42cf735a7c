//! Solver interface and the default `microlp`-based implementation.

use microlp::{ComparisonOp, OptimizationDirection, Problem};

use crate::model::{Cmp, Program, VarKind};
use crate::types::SolveStatus;

/// Result of one solver call.
#[derive(Clone, Debug)]
pub struct Solution {
    pub status: SolveStatus,
    /// One value per program column; empty unless `status` is optimal.
    pub values: Vec<f64>,
    /// Objective value (maximized); `NaN` unless optimal.
    pub objective: f64,
}

impl Solution {
    /// A non-optimal outcome without values.
    #[must_use]
    pub fn failed(status: SolveStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective: f64::NAN,
        }
    }
}

/// A synchronous LP/MIP engine.
///
/// Implementations must report a status that distinguishes optimal,
/// infeasible and unbounded outcomes from other failures.
pub trait Solver {
    /// Solve `program`, maximizing its objective.
    fn solve(&self, program: &Program) -> Solution;
}

/// Pure-Rust simplex / branch-and-bound solver backed by `microlp`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MicrolpSolver;

impl MicrolpSolver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[allow(clippy::cast_possible_truncation)]
fn int_bound(v: f64) -> i32 {
    if v.is_finite() {
        v.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
    } else if v > 0.0 {
        i32::MAX
    } else {
        i32::MIN
    }
}

impl Solver for MicrolpSolver {
    fn solve(&self, program: &Program) -> Solution {
        let mut problem = Problem::new(OptimizationDirection::Maximize);
        let vars: Vec<microlp::Variable> = program
            .columns()
            .iter()
            .zip(program.objective())
            .map(|(col, &obj)| match col.kind {
                VarKind::Continuous => problem.add_var(obj, (col.lower, col.upper)),
                VarKind::Integer => {
                    problem.add_integer_var(obj, (int_bound(col.lower), int_bound(col.upper)))
                }
                VarKind::Binary => problem.add_binary_var(obj),
            })
            .collect();

        for row in program.rows() {
            let expr: Vec<(microlp::Variable, f64)> =
                row.terms.iter().map(|&(c, coef)| (vars[c], coef)).collect();
            let op = match row.cmp {
                Cmp::Le => ComparisonOp::Le,
                Cmp::Ge => ComparisonOp::Ge,
                Cmp::Eq => ComparisonOp::Eq,
            };
            problem.add_constraint(expr, op, row.rhs);
        }

        match problem.solve() {
            Ok(solution) => Solution {
                status: SolveStatus::Optimal,
                values: vars.iter().map(|&v| solution[v]).collect(),
                objective: solution.objective(),
            },
            Err(microlp::Error::Infeasible) => Solution::failed(SolveStatus::Infeasible),
            Err(microlp::Error::Unbounded) => Solution::failed(SolveStatus::Unbounded),
            Err(e) => {
                trace_warn!(error = %e, "solver failure");
                Solution::failed(SolveStatus::Failed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinearModel;

    #[test]
    fn test_solves_small_lp() {
        let mut m = LinearModel::new("lp");
        m.var("x", Some(0.0), None);
        m.var("y", Some(0.0), Some(3.0));
        m.constraint("c1", &[("x", 1.0), ("y", 1.0)], Cmp::Le, 4.0);
        let mut p = m.compile().unwrap();
        p.set_objective(0, 1.0);
        p.set_objective(1, 2.0);
        let sol = MicrolpSolver.solve(&p);
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert!((sol.objective - 7.0).abs() < 1e-9);
        assert!((sol.values[0] - 1.0).abs() < 1e-9);
        assert!((sol.values[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_reports_infeasible() {
        let mut m = LinearModel::new("inf");
        m.var("x", Some(0.0), Some(1.0));
        m.constraint("c", &[("x", 1.0)], Cmp::Ge, 2.0);
        let sol = MicrolpSolver.solve(&m.compile().unwrap());
        assert_eq!(sol.status, SolveStatus::Infeasible);
        assert!(sol.values.is_empty());
    }

    #[test]
    fn test_reports_unbounded() {
        let mut m = LinearModel::new("unb");
        m.var("x", Some(0.0), None);
        let mut p = m.compile().unwrap();
        p.set_objective(0, 1.0);
        assert_eq!(MicrolpSolver.solve(&p).status, SolveStatus::Unbounded);
    }

    #[test]
    fn test_integer_variables() {
        let mut m = LinearModel::new("mip");
        m.var_of("n", VarKind::Integer, Some(0.0), Some(10.0));
        m.constraint("c", &[("n", 2.0)], Cmp::Le, 7.0);
        let mut p = m.compile().unwrap();
        p.set_objective(0, 1.0);
        let sol = MicrolpSolver.solve(&p);
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert!((sol.values[0] - 3.0).abs() < 1e-9);
    }
}
