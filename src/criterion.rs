//! Per-criterion state: reference points, preferences and achievement scaling.
//!
//! A [`Criterion`] wraps one outcome variable of the substantive model. Its
//! utopia (U) and nadir (N) values define a linear achievement scale that
//! places N at 0 and U at 100; aspiration (A) and reservation (R) levels
//! express the current preference on that scale.
//!
//! All comparisons go through [`Criterion::better`] and
//! [`Criterion::eq_better`], which respect the criterion sense and use a
//! relative tolerance of `10 * min_diff`.

use core::ops::{Index, IndexMut};

use crate::config::CritDef;
use crate::error::{Error, Result};
use crate::types::Sense;

/// How [`Criterion::update_nadir`] treats a newly observed value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NadirPolicy {
    /// Keep the worst value seen so far (selfish optimizations).
    Record,
    /// The first value of a pass replaces the nadir, later ones can only
    /// move it away from utopia. The nadir may therefore move toward utopia.
    Tighten,
    /// Only move the nadir away from utopia.
    Relax,
    /// Move the nadir only when the value is strictly worse than it.
    Exploration,
}

/// Position of a value relative to the `[N, U]` range of a criterion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeCheck {
    /// Within the range up to the tolerance.
    Inside,
    /// Strictly better than utopia.
    BetterThanUtopia,
    /// Strictly worse than nadir.
    WorseThanNadir,
}

/// One criterion of the multi-criteria analysis.
#[derive(Clone, Debug)]
pub struct Criterion {
    /// Unique criterion name.
    pub name: String,
    /// Name of the outcome variable in the substantive model.
    pub var_name: String,
    /// Optimization sense.
    pub sense: Sense,
    utopia: Option<f64>,
    nadir: Option<f64>,
    asp: Option<f64>,
    res: Option<f64>,
    /// Enters the min-of-CAFs term of the scalarizing function.
    pub is_active: bool,
    /// Value fixed at the aspiration level.
    pub is_fixed: bool,
    /// Excluded from the scalarizing function.
    pub is_ignored: bool,
    val: Option<f64>,
    a_val: Option<f64>,
    min_diff: f64,
    pass_seen: bool,
}

impl Criterion {
    /// Create a criterion without reference points.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        var_name: impl Into<String>,
        sense: Sense,
        min_diff: f64,
    ) -> Self {
        Self {
            name: name.into(),
            var_name: var_name.into(),
            sense,
            utopia: None,
            nadir: None,
            asp: None,
            res: None,
            is_active: false,
            is_fixed: false,
            is_ignored: false,
            val: None,
            a_val: None,
            min_diff,
            pass_seen: false,
        }
    }

    /// `+1` for maximized, `-1` for minimized criteria.
    #[must_use]
    pub fn mult(&self) -> f64 {
        self.sense.mult()
    }

    #[must_use]
    pub fn utopia(&self) -> Option<f64> {
        self.utopia
    }

    #[must_use]
    pub fn nadir(&self) -> Option<f64> {
        self.nadir
    }

    #[must_use]
    pub fn asp(&self) -> Option<f64> {
        self.asp
    }

    #[must_use]
    pub fn res(&self) -> Option<f64> {
        self.res
    }

    /// Value of the criterion in the last solution.
    #[must_use]
    pub fn val(&self) -> Option<f64> {
        self.val
    }

    /// Achievement of the criterion in the last solution.
    #[must_use]
    pub fn a_val(&self) -> Option<f64> {
        self.a_val
    }

    #[must_use]
    pub fn min_diff(&self) -> f64 {
        self.min_diff
    }

    /// Record the utopia value. May be called once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UtopiaAlreadySet`] on a second call.
    pub fn set_utopia(&mut self, v: f64) -> Result<()> {
        if self.utopia.is_some() {
            return Err(Error::UtopiaAlreadySet(self.name.clone()));
        }
        self.utopia = Some(v);
        Ok(())
    }

    /// Install a complete U/N pair read from a persisted payoff table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InconsistentPayoff`] when U is not better than N
    /// for this criterion's sense, and [`Error::RangeCollapse`] when they
    /// are too close.
    pub fn set_payoff(&mut self, utopia: f64, nadir: f64) -> Result<()> {
        if self.mult() * (utopia - nadir) <= 0.0 {
            return Err(Error::InconsistentPayoff {
                criterion: self.name.clone(),
                reason: format!(
                    "utopia {utopia} is not better than nadir {nadir} for a {} criterion",
                    self.sense
                ),
            });
        }
        self.utopia = Some(utopia);
        self.nadir = Some(nadir);
        self.check_range()
    }

    /// Forget U/N and the current preferences.
    pub fn clear_reference(&mut self) {
        self.utopia = None;
        self.nadir = None;
        self.asp = None;
        self.res = None;
        self.val = None;
        self.a_val = None;
        self.pass_seen = false;
    }

    /// Start a new nadir approximation pass (see [`NadirPolicy::Tighten`]).
    pub fn begin_nadir_pass(&mut self) {
        self.pass_seen = false;
    }

    /// Absolute tolerance used by the comparisons.
    fn tolerance(&self, a: f64, b: f64) -> f64 {
        let scale = match self.range() {
            Some(r) if r > 0.0 => r,
            _ => a.abs().max(b.abs()).max(1.0),
        };
        10.0 * self.min_diff * scale
    }

    /// `true` when `a` is strictly better than `b`, beyond the tolerance.
    #[must_use]
    pub fn better(&self, a: f64, b: f64) -> bool {
        self.mult() * (a - b) > self.tolerance(a, b)
    }

    /// `true` when `a` is better than or equal to `b`, within the tolerance.
    #[must_use]
    pub fn eq_better(&self, a: f64, b: f64) -> bool {
        self.mult() * (a - b) >= -self.tolerance(a, b)
    }

    fn worse_of(&self, a: f64, b: f64) -> f64 {
        if self.mult() * (a - b) < 0.0 { a } else { b }
    }

    /// `|U - N|` when both reference points are known.
    #[must_use]
    pub fn range(&self) -> Option<f64> {
        match (self.utopia, self.nadir) {
            (Some(u), Some(n)) => Some((u - n).abs()),
            _ => None,
        }
    }

    /// Check that U and N are far enough apart to define an achievement scale.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RangeCollapse`] when `|U - N| / max(|U|, |N|) < min_diff`,
    /// or [`Error::Config`] when U/N are not both known.
    pub fn check_range(&self) -> Result<()> {
        let (Some(u), Some(n)) = (self.utopia, self.nadir) else {
            return Err(Error::Config(format!(
                "criterion '{}' has no complete utopia/nadir pair",
                self.name
            )));
        };
        let magnitude = u.abs().max(n.abs());
        if magnitude == 0.0 || (u - n).abs() / magnitude < self.min_diff {
            return Err(Error::RangeCollapse {
                criterion: self.name.clone(),
                utopia: u,
                nadir: n,
            });
        }
        Ok(())
    }

    /// Update the nadir approximation with an observed value.
    ///
    /// Returns `true` when the nadir changed.
    pub fn update_nadir(&mut self, policy: NadirPolicy, v: f64) -> bool {
        let old = self.nadir;
        let mut new = match (policy, old) {
            (_, None) => v,
            (NadirPolicy::Record | NadirPolicy::Relax, Some(n)) => self.worse_of(n, v),
            (NadirPolicy::Tighten, Some(n)) => {
                if self.pass_seen {
                    self.worse_of(n, v)
                } else {
                    v
                }
            }
            (NadirPolicy::Exploration, Some(n)) => {
                if self.better(n, v) {
                    v
                } else {
                    n
                }
            }
        };
        if policy == NadirPolicy::Tighten {
            self.pass_seen = true;
            if let Some(u) = self.utopia {
                let gap = 2.0 * self.min_diff * u.abs().max(new.abs());
                if self.mult() * (u - new) < gap {
                    new = u - self.mult() * gap;
                }
            }
        }
        self.nadir = Some(new);
        old != Some(new)
    }

    /// Map a model value to the achievement scale (N = 0, U = 100).
    ///
    /// Values worse than the nadir map to negative achievements.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RangeCollapse`] when U/N cannot define a scale.
    pub fn val2ach(&self, v: f64) -> Result<f64> {
        self.check_range()?;
        let (u, n) = (self.utopia.unwrap_or_default(), self.nadir.unwrap_or_default());
        Ok(100.0 * self.mult() * (v - n) / (u - n).abs())
    }

    /// Inverse of [`val2ach`](Self::val2ach).
    ///
    /// # Errors
    ///
    /// Returns [`Error::RangeCollapse`] when U/N cannot define a scale.
    pub fn ach2val(&self, a: f64) -> Result<f64> {
        self.check_range()?;
        let (u, n) = (self.utopia.unwrap_or_default(), self.nadir.unwrap_or_default());
        Ok(n + self.mult() * a / 100.0 * (u - n).abs())
    }

    /// Set the neutral preference: A and R split `[N, U]` into thirds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RangeCollapse`] when U/N cannot define a scale.
    pub fn set_neutral_ar(&mut self) -> Result<()> {
        self.check_range()?;
        let (u, n) = (self.utopia.unwrap_or_default(), self.nadir.unwrap_or_default());
        let asp = u - (u - n) / 3.0;
        self.asp = Some(asp);
        self.res = Some(asp - (u - n) / 3.0);
        Ok(())
    }

    /// Check an aspiration/reservation pair against U/N.
    ///
    /// When both reference points are known a valid preference satisfies:
    /// U equal-or-better than A, A strictly better than R, R equal-or-better than N.
    /// Without a complete payoff pair every preference passes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InconsistentPreference`] when any of these fails.
    pub fn check_ar(&self, asp: f64, res: f64) -> Result<()> {
        let (Some(u), Some(n)) = (self.utopia, self.nadir) else {
            return Ok(());
        };
        let fail = |reason: String| Error::InconsistentPreference {
            criterion: self.name.clone(),
            reason,
        };
        if !self.eq_better(u, asp) {
            return Err(fail(format!("aspiration {asp} is better than utopia {u}")));
        }
        if !self.better(asp, res) {
            return Err(fail(format!(
                "aspiration {asp} is not better than reservation {res}"
            )));
        }
        if !self.eq_better(res, n) {
            return Err(fail(format!("reservation {res} is worse than nadir {n}")));
        }
        Ok(())
    }

    /// Set the aspiration and reservation levels, checking them against U/N
    /// with [`check_ar`](Self::check_ar).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InconsistentPreference`] when the pair is inconsistent.
    pub fn set_ar(&mut self, asp: f64, res: f64) -> Result<()> {
        self.check_ar(asp, res)?;
        self.asp = Some(asp);
        self.res = Some(res);
        Ok(())
    }

    /// Set A/R without consistency checks. Used by internally generated
    /// preferences that deliberately sit on the range boundary.
    pub fn set_ar_unchecked(&mut self, asp: f64, res: f64) {
        self.asp = Some(asp);
        self.res = Some(res);
    }

    /// Forget the current aspiration and reservation levels.
    pub fn clear_ar(&mut self) {
        self.asp = None;
        self.res = None;
    }

    /// Record the value in the last solution and its achievement (when U/N are known).
    pub fn set_val(&mut self, v: f64) {
        self.val = Some(v);
        self.a_val = self.val2ach(v).ok();
    }

    /// Clear the transient solution results.
    pub fn clear_val(&mut self) {
        self.val = None;
        self.a_val = None;
    }

    /// Classify `v` against the current `[N, U]` range.
    #[must_use]
    pub fn range_check(&self, v: f64) -> RangeCheck {
        if let Some(u) = self.utopia
            && self.better(v, u)
        {
            return RangeCheck::BetterThanUtopia;
        }
        if let Some(n) = self.nadir
            && self.better(n, v)
        {
            return RangeCheck::WorseThanNadir;
        }
        RangeCheck::Inside
    }

    /// Reset activity flags to the default (active, not fixed, not ignored).
    pub fn reset_flags(&mut self) {
        self.is_active = true;
        self.is_fixed = false;
        self.is_ignored = false;
    }
}

/// The ordered set of criteria of an analysis.
#[derive(Clone, Debug, Default)]
pub struct Criteria {
    items: Vec<Criterion>,
}

impl Criteria {
    /// Build the criteria from their declarations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateCriterion`] when two declarations share a name.
    pub fn new(defs: &[CritDef], min_diff: f64) -> Result<Self> {
        let mut items: Vec<Criterion> = Vec::with_capacity(defs.len());
        for def in defs {
            if items.iter().any(|c| c.name == def.name) {
                return Err(Error::DuplicateCriterion(def.name.clone()));
            }
            items.push(Criterion::new(&def.name, &def.var_name, def.sense, min_diff));
        }
        Ok(Self { items })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Criterion> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, Criterion> {
        self.items.iter_mut()
    }

    /// Index of the criterion with the given name.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|c| c.name == name)
    }

    /// `true` when every criterion has a usable U/N pair.
    #[must_use]
    pub fn payoff_complete(&self) -> bool {
        self.items.iter().all(|c| c.check_range().is_ok())
    }

    /// Values of the last solution, one per criterion.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        self.items.iter().map(|c| c.val.unwrap_or(f64::NAN)).collect()
    }

    /// Achievements of the last solution, one per criterion.
    #[must_use]
    pub fn achievements(&self) -> Vec<f64> {
        self.items
            .iter()
            .map(|c| c.a_val.unwrap_or(f64::NAN))
            .collect()
    }
}

impl Index<usize> for Criteria {
    type Output = Criterion;

    fn index(&self, i: usize) -> &Criterion {
        &self.items[i]
    }
}

impl IndexMut<usize> for Criteria {
    fn index_mut(&mut self, i: usize) -> &mut Criterion {
        &mut self.items[i]
    }
}

impl<'a> IntoIterator for &'a Criteria {
    type Item = &'a Criterion;
    type IntoIter = core::slice::Iter<'a, Criterion>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
