//! Achievement scalarizing function (ASF) block.
//!
//! The block is linked to the compiled substantive model for one iteration:
//!
//! - one auxiliary column `x[i]` per non-ignored criterion, bound to the
//!   outcome variable by an equality row;
//! - a concave piecewise-linear component achievement `caf[i]` per
//!   non-fixed criterion, expressed as the minimum of three lines through
//!   (R, 0) and (A, 100);
//! - `cafMin <= caf[i]` for every active criterion;
//! - objective `cafMin + eps / n * sum(caf[i])`.
//!
//! Fixed criteria get `x[i] = A[i]` instead of a CAF. In selfish mode the
//! objective is `mult * x[i]` of a single criterion.

use crate::criterion::Criteria;
use crate::error::{Error, Result};
use crate::model::{Cmp, ConstraintBlock, Program, VarKind};

const CAF_MIN: &str = "__asf_caf_min";

fn x_name(criterion: &str) -> String {
    format!("__asf_x_{criterion}")
}

fn caf_name(criterion: &str) -> String {
    format!("__asf_caf_{criterion}")
}

/// Tuning of the scalarizing function.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AsfParams {
    /// Ratio between the slope of the middle CAF segment and the outer ones.
    pub slope_r: f64,
    /// Weight of the regularizing sum.
    pub eps: f64,
    /// Minimal relative A/R distance.
    pub min_diff: f64,
}

impl Default for AsfParams {
    fn default() -> Self {
        Self {
            slope_r: 10.0,
            eps: 1e-6,
            min_diff: 1e-4,
        }
    }
}

#[derive(Clone, Debug)]
struct Term {
    criterion: String,
    var_name: String,
    mult: f64,
    asp: Option<f64>,
    res: Option<f64>,
    range: Option<f64>,
    active: bool,
    fixed: bool,
    ignored: bool,
}

/// Values of the scalarizing function in a solution.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AsfValues {
    /// Objective value.
    pub af: f64,
    /// Minimum of the active CAFs.
    pub caf_min: f64,
    /// Regularizing term `eps / n * sum(caf)`.
    pub caf_reg: f64,
}

/// Snapshot of the criterion state turned into a [`ConstraintBlock`].
#[derive(Clone, Debug)]
pub struct AsfBlock {
    terms: Vec<Term>,
    selfish: Option<usize>,
    params: AsfParams,
}

impl AsfBlock {
    /// Capture the current criterion attributes.
    #[must_use]
    pub fn new(criteria: &Criteria, selfish: Option<usize>, params: AsfParams) -> Self {
        let terms = criteria
            .iter()
            .map(|c| Term {
                criterion: c.name.clone(),
                var_name: c.var_name.clone(),
                mult: c.mult(),
                asp: c.asp(),
                res: c.res(),
                range: c.range(),
                active: c.is_active,
                fixed: c.is_fixed,
                ignored: c.is_ignored,
            })
            .collect();
        Self {
            terms,
            selfish,
            params,
        }
    }

    fn link_outcome(program: &mut Program, term: &Term) -> Result<usize> {
        let var = program
            .var_index(&term.var_name)
            .ok_or_else(|| Error::UnknownVariable {
                criterion: term.criterion.clone(),
                var_name: term.var_name.clone(),
            })?;
        let x = program.add_var(
            &x_name(&term.criterion),
            VarKind::Continuous,
            f64::NEG_INFINITY,
            f64::INFINITY,
        );
        program.add_row(vec![(x, 1.0), (var, -1.0)], Cmp::Eq, 0.0);
        Ok(x)
    }

    fn levels(term: &Term) -> Result<(f64, f64)> {
        match (term.asp, term.res) {
            (Some(a), Some(r)) => Ok((a, r)),
            _ => Err(Error::InconsistentPreference {
                criterion: term.criterion.clone(),
                reason: "aspiration and reservation must be set".to_string(),
            }),
        }
    }

    /// Append the three CAF rows of `term` bounding `caf` from above.
    fn add_caf(&self, program: &mut Program, term: &Term, x: usize, caf: usize) -> Result<()> {
        let (a, r) = Self::levels(term)?;
        let scale = match term.range {
            Some(v) if v > 0.0 => v,
            _ => a.abs().max(r.abs()).max(1.0),
        };
        // bigger-is-better coordinates: y = mult * x
        let (ap, rp) = (term.mult * a, term.mult * r);
        let width = (ap - rp).max(self.params.min_diff * scale);
        let m = 100.0 / width;
        let sr = self.params.slope_r;
        // caf <= m * (y - R')
        program.add_row(vec![(caf, 1.0), (x, -m * term.mult)], Cmp::Le, -m * rp);
        // caf <= 100 + m / sr * (y - A')
        program.add_row(
            vec![(caf, 1.0), (x, -m / sr * term.mult)],
            Cmp::Le,
            100.0 - m / sr * ap,
        );
        // caf <= m * sr * (y - R')
        program.add_row(
            vec![(caf, 1.0), (x, -m * sr * term.mult)],
            Cmp::Le,
            -m * sr * rp,
        );
        Ok(())
    }

    /// Read the scalarizing values from a solution of the linked program.
    ///
    /// Must be called before the block is detached.
    #[must_use]
    pub fn read(&self, program: &Program, values: &[f64], objective: f64) -> AsfValues {
        let get = |name: &str| program.var_index(name).and_then(|i| values.get(i).copied());
        if self.selfish.is_some() {
            return AsfValues {
                af: objective,
                caf_min: f64::NAN,
                caf_reg: f64::NAN,
            };
        }
        let cafs: Vec<f64> = self
            .terms
            .iter()
            .filter_map(|t| get(&caf_name(&t.criterion)))
            .collect();
        let caf_reg = if cafs.is_empty() {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let n = cafs.len() as f64;
            self.params.eps / n * cafs.iter().sum::<f64>()
        };
        AsfValues {
            af: objective,
            caf_min: get(CAF_MIN).unwrap_or(f64::NAN),
            caf_reg,
        }
    }
}

impl ConstraintBlock for AsfBlock {
    fn append(&self, program: &mut Program) -> Result<()> {
        if let Some(i) = self.selfish {
            let term = &self.terms[i];
            let x = Self::link_outcome(program, term)?;
            program.set_objective(x, term.mult);
            return Ok(());
        }

        let with_caf = self
            .terms
            .iter()
            .filter(|t| !t.ignored && !t.fixed)
            .count();
        let any_active = self
            .terms
            .iter()
            .any(|t| t.active && !t.ignored && !t.fixed);
        let caf_min = if any_active {
            program.add_var(CAF_MIN, VarKind::Continuous, f64::NEG_INFINITY, f64::INFINITY)
        } else {
            program.add_var(CAF_MIN, VarKind::Continuous, 0.0, 0.0)
        };
        program.set_objective(caf_min, 1.0);

        #[allow(clippy::cast_precision_loss)]
        let reg = if with_caf > 0 {
            self.params.eps / with_caf as f64
        } else {
            0.0
        };

        for term in self.terms.iter().filter(|t| !t.ignored) {
            let x = Self::link_outcome(program, term)?;
            if term.fixed {
                let (a, _) = Self::levels(term)?;
                program.add_row(vec![(x, 1.0)], Cmp::Eq, a);
                continue;
            }
            let caf = program.add_var(
                &caf_name(&term.criterion),
                VarKind::Continuous,
                f64::NEG_INFINITY,
                f64::INFINITY,
            );
            self.add_caf(program, term, x, caf)?;
            program.set_objective(caf, reg);
            if term.active {
                program.add_row(vec![(caf_min, 1.0), (caf, -1.0)], Cmp::Le, 0.0);
            }
        }
        Ok(())
    }
}
