//! Preference sets and the sources that generate them.
//!
//! Every iteration of the workflow is driven by one [`Preferences`] value:
//! per-criterion aspiration/reservation levels and activity flags, plus an
//! optional selfish criterion that replaces the achievement objective.
//! Preferences come from a [`PreferenceSource`]:
//!
//! | Source | Stage |
//! |---|---|
//! | [`PayOff`](crate::payoff::PayOff) | utopia/nadir computation |
//! | [`Corners`](crate::corners::Corners) | selfish corners of the Pareto set |
//! | [`NeutralOnce`] | one neutral iteration |
//! | [`CuboidSelector`] | Pareto-front representation |
//! | [`UserPreferences`] | preference sets read from a file |

use std::path::Path;

use crate::criterion::Criteria;
use crate::error::{Error, Result};
use crate::parrep::ParRep;

/// Preference for a single criterion.
#[derive(Clone, Debug, PartialEq)]
pub struct CriterionPref {
    pub asp: Option<f64>,
    pub res: Option<f64>,
    pub active: bool,
    pub fixed: bool,
    pub ignored: bool,
}

impl CriterionPref {
    /// Active criterion with the given A/R.
    #[must_use]
    pub fn active(asp: f64, res: f64) -> Self {
        Self {
            asp: Some(asp),
            res: Some(res),
            active: true,
            fixed: false,
            ignored: false,
        }
    }

    /// Criterion that only enters the regularizing term.
    #[must_use]
    pub fn inactive(asp: f64, res: f64) -> Self {
        Self {
            active: false,
            ..Self::active(asp, res)
        }
    }

    /// Criterion fixed at `value`.
    #[must_use]
    pub fn fixed(value: f64) -> Self {
        Self {
            asp: Some(value),
            res: Some(value),
            active: false,
            fixed: true,
            ignored: false,
        }
    }

    /// Criterion excluded from the scalarizing function.
    #[must_use]
    pub fn ignored() -> Self {
        Self {
            asp: None,
            res: None,
            active: false,
            fixed: false,
            ignored: true,
        }
    }
}

/// A complete preference set: one entry per criterion.
#[derive(Clone, Debug, PartialEq)]
pub struct Preferences {
    pub items: Vec<CriterionPref>,
    /// When set, the objective is the plain value of this criterion
    /// (stage-1 selfish optimization).
    pub selfish: Option<usize>,
    /// Cuboid the preferences were derived from.
    pub cube_id: Option<usize>,
}

impl Preferences {
    #[must_use]
    pub fn new(items: Vec<CriterionPref>) -> Self {
        Self {
            items,
            selfish: None,
            cube_id: None,
        }
    }

    /// Selfish optimization of criterion `i` out of `n`.
    #[must_use]
    pub fn selfish(i: usize, n: usize) -> Self {
        let items = (0..n)
            .map(|j| {
                if i == j {
                    CriterionPref {
                        asp: None,
                        res: None,
                        active: true,
                        fixed: false,
                        ignored: false,
                    }
                } else {
                    CriterionPref::ignored()
                }
            })
            .collect();
        Self {
            items,
            selfish: Some(i),
            cube_id: None,
        }
    }

    /// Number of active criteria.
    #[must_use]
    pub fn n_active(&self) -> usize {
        self.items.iter().filter(|p| p.active).count()
    }

    /// Check the A/R of every criterion that enters a CAF against its
    /// current U/N.
    ///
    /// Ignored and fixed criteria are skipped, as are criteria without
    /// levels (selfish optimizations).
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::InconsistentPreference`] found.
    pub fn check(&self, criteria: &Criteria) -> Result<()> {
        for (c, p) in criteria.iter().zip(&self.items) {
            if p.ignored || p.fixed {
                continue;
            }
            if let (Some(a), Some(r)) = (p.asp, p.res) {
                c.check_ar(a, r)?;
            }
        }
        Ok(())
    }

    /// Write the preferences into the criteria.
    pub fn apply(&self, criteria: &mut Criteria) {
        debug_assert_eq!(self.items.len(), criteria.len());
        for (c, p) in criteria.iter_mut().zip(&self.items) {
            c.is_active = p.active;
            c.is_fixed = p.fixed;
            c.is_ignored = p.ignored;
            match (p.asp, p.res) {
                (Some(a), Some(r)) => c.set_ar_unchecked(a, r),
                _ => c.clear_ar(),
            }
        }
    }
}

/// Something that proposes the preferences of the next iteration.
pub trait PreferenceSource {
    /// Return the next preference set, or `None` when exhausted.
    fn next_preferences(&mut self, criteria: &Criteria, rep: &mut ParRep) -> Option<Preferences>;
}

/// Yields the neutral preference (A/R at the thirds of `[N, U]`) once.
#[derive(Debug, Default)]
pub struct NeutralOnce {
    done: bool,
}

impl NeutralOnce {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceSource for NeutralOnce {
    fn next_preferences(&mut self, criteria: &Criteria, _rep: &mut ParRep) -> Option<Preferences> {
        if self.done {
            return None;
        }
        self.done = true;
        let mut items = Vec::with_capacity(criteria.len());
        for c in criteria {
            let mut probe = c.clone();
            probe.set_neutral_ar().ok()?;
            items.push(CriterionPref::active(probe.asp()?, probe.res()?));
        }
        Some(Preferences::new(items))
    }
}

/// Derives the next preferences from the largest empty candidate cuboid.
#[derive(Debug, Default)]
pub struct CuboidSelector;

impl PreferenceSource for CuboidSelector {
    fn next_preferences(&mut self, criteria: &Criteria, rep: &mut ParRep) -> Option<Preferences> {
        rep.next_cube_preferences(criteria)
    }
}

/// One line of a user preference file.
#[derive(Clone, Debug, PartialEq)]
pub struct UserPref {
    pub name: String,
    pub asp: f64,
    pub res: f64,
    pub active: bool,
}

/// Preference sets read from a user file, replayed in order.
#[derive(Clone, Debug, Default)]
pub struct UserPreferences {
    sets: Vec<Vec<UserPref>>,
    next: usize,
}

impl UserPreferences {
    /// Parse the preference file format.
    ///
    /// Blocks are separated by lines starting with `#`. Each non-empty line
    /// holds `<name> <asp> <res> [n]`; a trailing `n` marks the criterion
    /// inactive. Empty lines and lines starting with `*` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreferenceParse`] with the offending line number.
    pub fn parse(text: &str) -> Result<Self> {
        let mut sets = Vec::new();
        let mut current: Vec<UserPref> = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('*') {
                continue;
            }
            if line.starts_with('#') {
                if !current.is_empty() {
                    sets.push(core::mem::take(&mut current));
                }
                continue;
            }
            let fail = |reason: &str| Error::PreferenceParse {
                line: i + 1,
                reason: reason.to_string(),
            };
            let fields: Vec<&str> = line.split_whitespace().collect();
            if !(3..=4).contains(&fields.len()) {
                return Err(fail("expected '<name> <asp> <res> [n]'"));
            }
            let asp: f64 = fields[1]
                .parse()
                .map_err(|_| fail("aspiration is not a number"))?;
            let res: f64 = fields[2]
                .parse()
                .map_err(|_| fail("reservation is not a number"))?;
            let active = match fields.get(3) {
                None => true,
                Some(&"n") => false,
                Some(_) => return Err(fail("the optional fourth field must be 'n'")),
            };
            current.push(UserPref {
                name: fields[0].to_string(),
                asp,
                res,
                active,
            });
        }
        if !current.is_empty() {
            sets.push(current);
        }
        Ok(Self { sets, next: 0 })
    }

    /// Read and parse a preference file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error or [`Error::PreferenceParse`].
    pub fn load(path: &Path) -> Result<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Replay the sets from the first one again.
    pub fn rewind(&mut self) {
        self.next = 0;
    }

    /// Check every set against the criteria: each criterion exactly once,
    /// A/R consistent with the current U/N.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InconsistentPreference`] naming the offending criterion.
    pub fn validate(&self, criteria: &Criteria) -> Result<()> {
        for set in &self.sets {
            for c in criteria {
                let n = set.iter().filter(|p| p.name == c.name).count();
                if n != 1 {
                    return Err(Error::InconsistentPreference {
                        criterion: c.name.clone(),
                        reason: format!("appears {n} times in a preference set"),
                    });
                }
            }
            for p in set {
                let Some(i) = criteria.position(&p.name) else {
                    return Err(Error::InconsistentPreference {
                        criterion: p.name.clone(),
                        reason: "unknown criterion".to_string(),
                    });
                };
                let mut probe = criteria[i].clone();
                probe.set_ar(p.asp, p.res)?;
            }
        }
        Ok(())
    }
}

impl PreferenceSource for UserPreferences {
    fn next_preferences(&mut self, criteria: &Criteria, _rep: &mut ParRep) -> Option<Preferences> {
        let set = self.sets.get(self.next)?;
        self.next += 1;
        let items = criteria
            .iter()
            .map(|c| {
                set.iter().find(|p| p.name == c.name).map_or_else(
                    CriterionPref::ignored,
                    |p| {
                        if p.active {
                            CriterionPref::active(p.asp, p.res)
                        } else {
                            CriterionPref::inactive(p.asp, p.res)
                        }
                    },
                )
            })
            .collect();
        Some(Preferences::new(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CritDef;
    use crate::types::Sense;

    fn criteria() -> Criteria {
        let defs = vec![
            CritDef::new("cr1", Sense::Maximize, "x"),
            CritDef::new("cr2", Sense::Minimize, "y"),
        ];
        let mut c = Criteria::new(&defs, 1e-4).unwrap();
        c[0].set_payoff(100.0, 10.0).unwrap();
        c[1].set_payoff(0.0, 50.0).unwrap();
        c
    }

    const FILE: &str = "\
* two preference sets
cr1 90 40
cr2 10 30 n
#

cr2 5 45
cr1 80 20
#
";

    #[test]
    fn test_parse_blocks() {
        let prefs = UserPreferences::parse(FILE).unwrap();
        assert_eq!(prefs.len(), 2);
        assert_eq!(
            prefs.sets[0][1],
            UserPref {
                name: "cr2".into(),
                asp: 10.0,
                res: 30.0,
                active: false
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_line() {
        let err = UserPreferences::parse("cr1 90\n").unwrap_err();
        assert!(matches!(err, Error::PreferenceParse { line: 1, .. }));
        let err = UserPreferences::parse("cr1 90 x\n").unwrap_err();
        assert!(matches!(err, Error::PreferenceParse { line: 1, .. }));
        let err = UserPreferences::parse("\ncr1 90 10 y\n").unwrap_err();
        assert!(matches!(err, Error::PreferenceParse { line: 2, .. }));
    }

    #[test]
    fn test_validate_and_replay_in_criterion_order() {
        let c = criteria();
        let mut prefs = UserPreferences::parse(FILE).unwrap();
        prefs.validate(&c).unwrap();
        let mut rep = ParRep::new(crate::parrep::ParRepParams::default());
        let first = prefs.next_preferences(&c, &mut rep).unwrap();
        assert_eq!(first.items[0], CriterionPref::active(90.0, 40.0));
        assert_eq!(first.items[1], CriterionPref::inactive(10.0, 30.0));
        let second = prefs.next_preferences(&c, &mut rep).unwrap();
        assert_eq!(second.items[0], CriterionPref::active(80.0, 20.0));
        assert!(prefs.next_preferences(&c, &mut rep).is_none());
    }

    #[test]
    fn test_validate_rejects_missing_criterion() {
        let prefs = UserPreferences::parse("cr1 90 40\n#\n").unwrap();
        assert!(matches!(
            prefs.validate(&criteria()),
            Err(Error::InconsistentPreference { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_inconsistent_ar() {
        let prefs = UserPreferences::parse("cr1 40 90\ncr2 10 30\n").unwrap();
        assert!(matches!(
            prefs.validate(&criteria()),
            Err(Error::InconsistentPreference { .. })
        ));
    }

    #[test]
    fn test_neutral_once() {
        let c = criteria();
        let mut rep = ParRep::new(crate::parrep::ParRepParams::default());
        let mut n = NeutralOnce::new();
        let p = n.next_preferences(&c, &mut rep).unwrap();
        assert_eq!(p.n_active(), 2);
        assert!((p.items[0].asp.unwrap() - 70.0).abs() < 1e-9);
        assert!(n.next_preferences(&c, &mut rep).is_none());
    }

    #[test]
    fn test_selfish_preferences() {
        let p = Preferences::selfish(1, 3);
        assert_eq!(p.selfish, Some(1));
        assert_eq!(p.n_active(), 1);
        assert!(p.items[0].ignored && !p.items[1].ignored);
        assert!(p.items[1].active && p.items[1].asp.is_none());
    }

    #[test]
    fn test_check_rejects_levels_outside_the_range() {
        let c = criteria();
        let ok = Preferences::new(vec![
            CriterionPref::active(100.0, 10.0),
            CriterionPref::inactive(0.0, 50.0),
        ]);
        assert!(ok.check(&c).is_ok());

        // reservation of cr1 above its utopia
        let beyond = Preferences::new(vec![
            CriterionPref::active(300.0, 200.0),
            CriterionPref::active(10.0, 40.0),
        ]);
        match beyond.check(&c) {
            Err(Error::InconsistentPreference { criterion, .. }) => assert_eq!(criterion, "cr1"),
            other => panic!("unexpected {other:?}"),
        }

        // fixed and ignored criteria are not checked
        let skipped = Preferences::new(vec![CriterionPref::fixed(500.0), CriterionPref::ignored()]);
        assert!(skipped.check(&c).is_ok());
        assert!(Preferences::selfish(0, 2).check(&c).is_ok());
    }
}
