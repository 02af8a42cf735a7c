//! Payoff table: utopia and nadir of every criterion.
//!
//! The table is filled in three stages. Stage 1 optimizes each criterion
//! selfishly and takes its value as the utopia while the other criteria
//! record their worst values. Stages 2 and 3 repeat the per-criterion
//! optimization with a regularized objective; their values tighten and then
//! relax the nadir approximation. The finished table is persisted so a
//! later run in the same analysis directory can skip all three stages.

use core::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write as _};
use std::path::Path;

use fs2::FileExt;

use crate::criterion::{Criteria, NadirPolicy};
use crate::error::{Error, Result};
use crate::parrep::ParRep;
use crate::preference::{CriterionPref, Preferences, PreferenceSource};
use crate::types::SolveStatus;

/// File name of the persisted table inside the analysis directory.
pub const PAYOFF_FILE: &str = "payOff.txt";

/// Stage of the payoff computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PayoffStage {
    /// Selfish optimizations defining the utopia.
    Utopia,
    /// First nadir approximation pass.
    NadirFirst,
    /// Second nadir approximation pass.
    NadirSecond,
    /// Table complete.
    Done,
}

/// Drives the payoff stages one criterion at a time.
#[derive(Debug)]
pub struct PayOff {
    stage: PayoffStage,
    cur: usize,
    n: usize,
}

impl PayOff {
    /// Start the computation for `n` criteria.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            stage: PayoffStage::Utopia,
            cur: 0,
            n,
        }
    }

    /// A payoff driver whose table is already complete.
    #[must_use]
    pub fn done(n: usize) -> Self {
        Self {
            stage: PayoffStage::Done,
            cur: 0,
            n,
        }
    }

    #[must_use]
    pub fn stage(&self) -> PayoffStage {
        self.stage
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.stage == PayoffStage::Done
    }

    /// Index of the criterion optimized in the current iteration.
    #[must_use]
    pub fn current(&self) -> usize {
        self.cur
    }

    /// Process the outcome of the iteration requested by the last preferences.
    ///
    /// `criteria` must already hold the solution values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayoffSolve`] when the optimization failed, since
    /// the reference frame cannot be built without it, and
    /// [`Error::RangeCollapse`] when a criterion range collapses after the
    /// last nadir pass.
    pub fn observe(&mut self, criteria: &mut Criteria, status: SolveStatus) -> Result<()> {
        if self.is_done() {
            return Ok(());
        }
        if !status.is_optimal() {
            return Err(Error::PayoffSolve {
                criterion: criteria[self.cur].name.clone(),
                status,
            });
        }
        let policy = match self.stage {
            PayoffStage::Utopia => {
                let v = criteria[self.cur].val().unwrap_or(f64::NAN);
                criteria[self.cur].set_utopia(v)?;
                trace_info!(criterion = %criteria[self.cur].name, utopia = v, "utopia");
                NadirPolicy::Record
            }
            PayoffStage::NadirFirst => NadirPolicy::Tighten,
            PayoffStage::NadirSecond => NadirPolicy::Relax,
            PayoffStage::Done => return Ok(()),
        };
        for j in (0..criteria.len()).filter(|&j| j != self.cur) {
            if let Some(v) = criteria[j].val()
                && criteria[j].update_nadir(policy, v)
            {
                trace_debug!(criterion = %criteria[j].name, nadir = v, "nadir approximation");
            }
        }

        self.cur += 1;
        if self.cur == self.n {
            self.cur = 0;
            self.stage = match self.stage {
                PayoffStage::Utopia => {
                    for c in criteria.iter_mut() {
                        c.begin_nadir_pass();
                    }
                    PayoffStage::NadirFirst
                }
                PayoffStage::NadirFirst => PayoffStage::NadirSecond,
                PayoffStage::NadirSecond | PayoffStage::Done => {
                    for c in criteria.iter() {
                        c.check_range()?;
                        trace_info!(
                            criterion = %c.name,
                            utopia = c.utopia().unwrap_or_default(),
                            nadir = c.nadir().unwrap_or_default(),
                            "payoff"
                        );
                    }
                    PayoffStage::Done
                }
            };
        }
        Ok(())
    }

    /// Regularized selfish preferences for criterion `i`: A = U, R = N.
    fn nadir_preferences(&self, criteria: &Criteria, i: usize) -> Preferences {
        let items = criteria
            .iter()
            .enumerate()
            .map(|(j, c)| {
                let u = c.utopia().unwrap_or_default();
                // A must stay better than R even before the nadir is usable
                let n = match c.nadir() {
                    Some(n) if c.better(u, n) => n,
                    _ => u - c.mult() * u.abs().max(1.0),
                };
                if j == i {
                    CriterionPref::active(u, n)
                } else {
                    CriterionPref::inactive(u, n)
                }
            })
            .collect();
        Preferences::new(items)
    }
}

impl PreferenceSource for PayOff {
    fn next_preferences(&mut self, criteria: &Criteria, _rep: &mut ParRep) -> Option<Preferences> {
        match self.stage {
            PayoffStage::Utopia => Some(Preferences::selfish(self.cur, self.n)),
            PayoffStage::NadirFirst | PayoffStage::NadirSecond => {
                Some(self.nadir_preferences(criteria, self.cur))
            }
            PayoffStage::Done => None,
        }
    }
}

/// Write the table, one line per criterion: `<name> U <u> N <n>`.
///
/// # Errors
///
/// Returns an I/O error, or [`Error::Config`] when a criterion has no U/N.
pub fn save(path: &Path, criteria: &Criteria) -> Result<()> {
    let mut text = String::new();
    for c in criteria {
        let (Some(u), Some(n)) = (c.utopia(), c.nadir()) else {
            return Err(Error::Config(format!(
                "cannot persist payoff: criterion '{}' is incomplete",
                c.name
            )));
        };
        let _ = writeln!(text, "{} U {u:e} N {n:e}", c.name);
    }

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    FileExt::lock_exclusive(&file)?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    FileExt::unlock(&file)?;
    trace_debug!(path = %path.display(), "payoff table written");
    Ok(())
}

/// Read a persisted table into the criteria.
///
/// Returns `Ok(true)` when every criterion received a usable U/N pair. On
/// `Ok(false)` (no file, or criteria missing from it) the reference points
/// of all criteria are cleared so the table is recomputed from scratch.
/// Lines naming unknown criteria are skipped.
///
/// # Errors
///
/// Returns [`Error::PayoffParse`] for malformed lines and
/// [`Error::InconsistentPayoff`] / [`Error::RangeCollapse`] for values
/// contradicting a criterion's sense.
pub fn load(path: &Path, criteria: &mut Criteria) -> Result<bool> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    FileExt::lock_shared(&file)?;
    let lines: Vec<String> = BufReader::new(&file).lines().collect::<std::io::Result<_>>()?;
    FileExt::unlock(&file)?;

    let mut seen = vec![false; criteria.len()];
    for (i, line) in lines.iter().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fail = |reason: &str| Error::PayoffParse {
            line: i + 1,
            reason: reason.to_string(),
        };
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [name, "U", u, "N", n] = fields.as_slice() else {
            return Err(fail("expected '<name> U <value> N <value>'"));
        };
        let u: f64 = u.parse().map_err(|_| fail("utopia is not a number"))?;
        let n: f64 = n.parse().map_err(|_| fail("nadir is not a number"))?;
        let Some(idx) = criteria.position(name) else {
            trace_warn!(criterion = %name, "payoff entry for unknown criterion skipped");
            continue;
        };
        criteria[idx].clear_reference();
        criteria[idx].set_payoff(u, n)?;
        seen[idx] = true;
    }

    if seen.iter().all(|&s| s) {
        trace_info!(path = %path.display(), "payoff table loaded");
        Ok(true)
    } else {
        for c in criteria.iter_mut() {
            c.clear_reference();
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CritDef;
    use crate::parrep::ParRepParams;
    use crate::types::Sense;

    fn criteria() -> Criteria {
        let defs = vec![
            CritDef::new("inc", Sense::Maximize, "inc"),
            CritDef::new("emi", Sense::Minimize, "emi"),
        ];
        Criteria::new(&defs, 1e-4).unwrap()
    }

    fn observe(p: &mut PayOff, c: &mut Criteria, inc: f64, emi: f64) {
        c[0].set_val(inc);
        c[1].set_val(emi);
        p.observe(c, SolveStatus::Optimal).unwrap();
    }

    #[test]
    fn test_stages_fill_table() {
        let mut c = criteria();
        let mut rep = ParRep::new(ParRepParams::default());
        let mut p = PayOff::new(2);

        let pref = p.next_preferences(&c, &mut rep).unwrap();
        assert_eq!(pref.selfish, Some(0));
        observe(&mut p, &mut c, 10_000.0, 10_000.0);
        assert_eq!(p.next_preferences(&c, &mut rep).unwrap().selfish, Some(1));
        observe(&mut p, &mut c, 5.0, 5.0);
        assert_eq!(p.stage(), PayoffStage::NadirFirst);
        assert_eq!(c[0].utopia(), Some(10_000.0));
        assert_eq!(c[1].utopia(), Some(5.0));

        let pref = p.next_preferences(&c, &mut rep).unwrap();
        assert!(pref.selfish.is_none());
        assert!(pref.items[0].active && !pref.items[1].active);
        observe(&mut p, &mut c, 10_000.0, 10_000.0);
        observe(&mut p, &mut c, 5.0, 5.0);
        assert_eq!(p.stage(), PayoffStage::NadirSecond);
        observe(&mut p, &mut c, 10_000.0, 10_000.0);
        observe(&mut p, &mut c, 5.0, 5.0);
        assert!(p.is_done());
        assert!(p.next_preferences(&c, &mut rep).is_none());
        assert_eq!(c[0].nadir(), Some(5.0));
        assert_eq!(c[1].nadir(), Some(10_000.0));
    }

    #[test]
    fn test_failed_selfish_solve_is_fatal() {
        let mut c = criteria();
        let mut p = PayOff::new(2);
        assert!(matches!(
            p.observe(&mut c, SolveStatus::Infeasible),
            Err(Error::PayoffSolve { .. })
        ));
    }

    #[test]
    fn test_collapsed_range_is_fatal() {
        let mut c = criteria();
        let mut p = PayOff::new(2);
        for _ in 0..5 {
            observe(&mut p, &mut c, 0.0, 0.0);
        }
        c[0].set_val(0.0);
        c[1].set_val(0.0);
        assert!(matches!(
            p.observe(&mut c, SolveStatus::Optimal),
            Err(Error::RangeCollapse { .. })
        ));
    }
}
