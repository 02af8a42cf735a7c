//! Master state machine of an analysis.
//!
//! ```text
//! Payoff ──► Corners ──► [Neutral] ──► ParFront ──► End
//!               ▲            │             │
//!               └── reset ◄──┴─────────────┘   (nadir moved)
//! ```
//!
//! With user preferences the `ParFront` stage is replaced by `UserPrefs`.
//! Each iteration calls [`WorkFlow::itr_start`] to fix the criterion
//! attributes and [`WorkFlow::itr_sol`] once the solver returned.

use std::path::PathBuf;

use serde::Serialize;

use crate::corners::Corners;
use crate::criterion::{Criteria, NadirPolicy, RangeCheck};
use crate::error::{Error, Result};
use crate::parrep::{Admission, ParRep, ParRepParams};
use crate::payoff::{self, PayOff};
use crate::preference::{CuboidSelector, NeutralOnce, PreferenceSource, Preferences, UserPreferences};
use crate::types::SolveStatus;

/// Workflow stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Payoff,
    Corners,
    Neutral,
    ParFront,
    UserPrefs,
    End,
}

impl core::fmt::Display for Stage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Self::Payoff => "payoff",
            Self::Corners => "corners",
            Self::Neutral => "neutral",
            Self::ParFront => "parfront",
            Self::UserPrefs => "userprefs",
            Self::End => "end",
        };
        f.write_str(s)
    }
}

/// What happened to the solution of an iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Consumed by the payoff computation.
    Payoff,
    /// The solver did not return an optimal solution.
    Failed(SolveStatus),
    /// A criterion was better than its utopia.
    Rejected,
    /// A nadir moved; the exploration restarts from the corners.
    Reset,
    /// Passed to the Pareto representation.
    Admitted(Admission),
}

/// Stage switches of the workflow.
#[derive(Clone, Debug)]
pub struct WorkflowOptions {
    /// Explore the Pareto front with cuboids.
    pub par_rep: bool,
    /// One neutral iteration between corners and Pareto front.
    pub neutral: bool,
    /// Where the payoff table is persisted.
    pub payoff_path: Option<PathBuf>,
    pub rep: ParRepParams,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            par_rep: true,
            neutral: false,
            payoff_path: None,
            rep: ParRepParams::default(),
        }
    }
}

/// Drives the stages of one analysis.
#[derive(Debug)]
pub struct WorkFlow {
    stage: Stage,
    options: WorkflowOptions,
    payoff: PayOff,
    corners: Corners,
    neutral: NeutralOnce,
    cuboids: CuboidSelector,
    user: Option<UserPreferences>,
    rep: ParRep,
    current: Option<Preferences>,
    n_resets: usize,
}

impl WorkFlow {
    /// Create the workflow. When a complete payoff table is already
    /// installed in `criteria` the payoff stage is skipped.
    #[must_use]
    pub fn new(criteria: &Criteria, options: WorkflowOptions, user: Option<UserPreferences>) -> Self {
        let n = criteria.len();
        let (stage, payoff) = if criteria.payoff_complete() {
            (Stage::Corners, PayOff::done(n))
        } else {
            (Stage::Payoff, PayOff::new(n))
        };
        trace_info!(%stage, n_criteria = n, "workflow start");
        Self {
            stage,
            payoff,
            corners: Corners::new(n),
            neutral: NeutralOnce::new(),
            cuboids: CuboidSelector,
            user,
            rep: ParRep::new(options.rep),
            options,
            current: None,
            n_resets: 0,
        }
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn rep(&self) -> &ParRep {
        &self.rep
    }

    #[must_use]
    pub fn n_resets(&self) -> usize {
        self.n_resets
    }

    /// Preferences of the current iteration.
    #[must_use]
    pub fn current(&self) -> Option<&Preferences> {
        self.current.as_ref()
    }

    fn enter(&mut self, stage: Stage) {
        trace_info!(from = %self.stage, to = %stage, "stage transition");
        self.stage = stage;
    }

    /// Stage following an exhausted one.
    fn advance(&mut self, criteria: &Criteria) -> Result<()> {
        let next = match self.stage {
            Stage::Payoff => Stage::Corners,
            Stage::Corners => {
                if self.corners.n_ok() == 0 {
                    return Err(Error::AllCornersFailed);
                }
                if let Some(user) = &self.user {
                    user.validate(criteria)?;
                    self.rep.set_gen_cubes(false);
                    Stage::UserPrefs
                } else if self.options.neutral {
                    Stage::Neutral
                } else if self.options.par_rep {
                    Stage::ParFront
                } else {
                    Stage::End
                }
            }
            Stage::Neutral if self.options.par_rep => Stage::ParFront,
            Stage::Neutral | Stage::ParFront | Stage::UserPrefs | Stage::End => Stage::End,
        };
        self.enter(next);
        Ok(())
    }

    /// Choose the preferences of iteration `itr` and write them into `criteria`.
    ///
    /// Returns `Ok(None)` once the workflow has ended.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllCornersFailed`] when no corner produced a
    /// solution and [`Error::InconsistentPreference`] when user preferences
    /// do not fit the payoff table.
    pub fn itr_start(&mut self, itr: usize, criteria: &mut Criteria) -> Result<Option<Preferences>> {
        loop {
            let view: &Criteria = criteria;
            let next = match self.stage {
                Stage::Payoff => self.payoff.next_preferences(view, &mut self.rep),
                Stage::Corners => self.corners.next_preferences(view, &mut self.rep),
                Stage::Neutral => self.neutral.next_preferences(view, &mut self.rep),
                Stage::ParFront => self.cuboids.next_preferences(view, &mut self.rep),
                Stage::UserPrefs => self
                    .user
                    .as_mut()
                    .and_then(|u| u.next_preferences(view, &mut self.rep)),
                Stage::End => {
                    self.current = None;
                    return Ok(None);
                }
            };
            if let Some(prefs) = next {
                for c in criteria.iter_mut() {
                    c.clear_val();
                }
                prefs.apply(criteria);
                trace_debug!(itr, stage = %self.stage, n_active = prefs.n_active(), "iteration start");
                self.current = Some(prefs.clone());
                return Ok(Some(prefs));
            }
            self.advance(criteria)?;
        }
    }

    /// Process the solution of iteration `itr`.
    ///
    /// `criteria` must hold the solution values (via `set_val`) when
    /// `status` is optimal.
    ///
    /// # Errors
    ///
    /// Returns the fatal payoff errors and I/O errors of the payoff file.
    pub fn itr_sol(&mut self, itr: usize, criteria: &mut Criteria, status: SolveStatus) -> Result<Outcome> {
        if self.stage == Stage::Payoff {
            self.payoff.observe(criteria, status)?;
            if self.payoff.is_done() {
                self.persist_payoff(criteria)?;
                self.advance(criteria)?;
            }
            return Ok(Outcome::Payoff);
        }

        if !status.is_optimal() {
            trace_warn!(itr, %status, stage = %self.stage, "iteration failed");
            return Ok(Outcome::Failed(status));
        }

        let mut rejected = false;
        let mut moved = false;
        for c in criteria.iter_mut() {
            let Some(v) = c.val() else { continue };
            match c.range_check(v) {
                RangeCheck::Inside => {}
                RangeCheck::BetterThanUtopia => {
                    trace_warn!(itr, criterion = %c.name, value = v, "value better than utopia");
                    rejected = true;
                }
                RangeCheck::WorseThanNadir => {
                    if c.update_nadir(NadirPolicy::Exploration, v) {
                        trace_warn!(itr, criterion = %c.name, nadir = v, "nadir moved");
                        moved = true;
                    }
                }
            }
        }
        if rejected {
            return Ok(Outcome::Rejected);
        }
        if moved {
            self.reset(criteria)?;
            return Ok(Outcome::Reset);
        }

        let cube_id = self.current.as_ref().and_then(|p| p.cube_id);
        let admission = self.rep.add_solution(itr, cube_id, criteria);
        if self.stage == Stage::Corners {
            self.corners.record_success();
        }
        Ok(Outcome::Admitted(admission))
    }

    /// Discard the exploration and restart from the corners.
    fn reset(&mut self, criteria: &Criteria) -> Result<()> {
        self.n_resets += 1;
        self.persist_payoff(criteria)?;
        self.corners = Corners::new(criteria.len());
        self.neutral = NeutralOnce::new();
        self.rep = ParRep::new(self.options.rep);
        if let Some(user) = &mut self.user {
            user.rewind();
        }
        trace_info!(n_resets = self.n_resets, "workflow reset");
        self.enter(Stage::Corners);
        Ok(())
    }

    fn persist_payoff(&self, criteria: &Criteria) -> Result<()> {
        match &self.options.payoff_path {
            Some(path) => payoff::save(path, criteria),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CritDef;
    use crate::types::Sense;

    fn criteria() -> Criteria {
        let defs = vec![
            CritDef::new("a", Sense::Maximize, "a"),
            CritDef::new("b", Sense::Minimize, "b"),
        ];
        Criteria::new(&defs, 1e-4).unwrap()
    }

    fn solved(wf: &mut WorkFlow, c: &mut Criteria, itr: usize, a: f64, b: f64) -> Outcome {
        wf.itr_start(itr, c).unwrap().unwrap();
        c[0].set_val(a);
        c[1].set_val(b);
        wf.itr_sol(itr, c, SolveStatus::Optimal).unwrap()
    }

    #[test]
    fn test_payoff_then_corners() {
        let mut c = criteria();
        let mut wf = WorkFlow::new(&c, WorkflowOptions::default(), None);
        assert_eq!(wf.stage(), Stage::Payoff);
        for itr in 1..=3 {
            assert_eq!(solved(&mut wf, &mut c, 2 * itr - 1, 100.0, 100.0), Outcome::Payoff);
            assert_eq!(solved(&mut wf, &mut c, 2 * itr, 0.0, 0.0), Outcome::Payoff);
        }
        assert_eq!(wf.stage(), Stage::Corners);
        assert_eq!(c[0].utopia(), Some(100.0));
        assert_eq!(c[0].nadir(), Some(0.0));
    }

    #[test]
    fn test_loaded_payoff_starts_with_corners() {
        let mut c = criteria();
        c[0].set_payoff(100.0, 10.0).unwrap();
        c[1].set_payoff(0.0, 50.0).unwrap();
        let mut wf = WorkFlow::new(&c, WorkflowOptions::default(), None);
        let p = wf.itr_start(1, &mut c).unwrap().unwrap();
        assert!(p.selfish.is_none());
        assert_eq!(p.n_active(), 1);
        assert_eq!(wf.stage(), Stage::Corners);
    }

    #[test]
    fn test_failed_corners_abort() {
        let mut c = criteria();
        c[0].set_payoff(100.0, 10.0).unwrap();
        c[1].set_payoff(0.0, 50.0).unwrap();
        let mut wf = WorkFlow::new(&c, WorkflowOptions::default(), None);
        for itr in 1..=2 {
            wf.itr_start(itr, &mut c).unwrap();
            let out = wf.itr_sol(itr, &mut c, SolveStatus::Infeasible).unwrap();
            assert_eq!(out, Outcome::Failed(SolveStatus::Infeasible));
        }
        assert!(matches!(wf.itr_start(3, &mut c), Err(Error::AllCornersFailed)));
    }

    #[test]
    fn test_better_than_utopia_is_rejected() {
        let mut c = criteria();
        c[0].set_payoff(100.0, 10.0).unwrap();
        c[1].set_payoff(0.0, 50.0).unwrap();
        let mut wf = WorkFlow::new(&c, WorkflowOptions::default(), None);
        assert_eq!(solved(&mut wf, &mut c, 1, 120.0, 40.0), Outcome::Rejected);
        assert_eq!(wf.rep().n_unique(), 0);
    }

    #[test]
    fn test_worse_than_nadir_resets() {
        let mut c = criteria();
        c[0].set_payoff(100.0, 10.0).unwrap();
        c[1].set_payoff(0.0, 50.0).unwrap();
        let mut wf = WorkFlow::new(&c, WorkflowOptions::default(), None);
        assert!(matches!(solved(&mut wf, &mut c, 1, 100.0, 40.0), Outcome::Admitted(_)));
        assert_eq!(solved(&mut wf, &mut c, 2, 30.0, 60.0), Outcome::Reset);
        assert_eq!(c[1].nadir(), Some(60.0));
        assert_eq!(wf.n_resets(), 1);
        assert_eq!(wf.rep().n_unique(), 0);
        assert_eq!(wf.stage(), Stage::Corners);
    }

    #[test]
    fn test_corners_then_cuboids_until_end() {
        let mut c = criteria();
        c[0].set_payoff(100.0, 0.0).unwrap();
        c[1].set_payoff(0.0, 100.0).unwrap();
        let mut wf = WorkFlow::new(&c, WorkflowOptions::default(), None);
        solved(&mut wf, &mut c, 1, 100.0, 100.0);
        solved(&mut wf, &mut c, 2, 0.0, 0.0);
        // the first cuboid spans both corners
        let p = wf.itr_start(3, &mut c).unwrap().unwrap();
        assert_eq!(wf.stage(), Stage::ParFront);
        assert_eq!(p.cube_id, Some(0));
        c[0].set_val(50.0);
        c[1].set_val(50.0);
        wf.itr_sol(3, &mut c, SolveStatus::Optimal).unwrap();
        assert_eq!(wf.rep().n_unique(), 3);
    }
}
