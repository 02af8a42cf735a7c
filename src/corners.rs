//! Corners of the Pareto set.
//!
//! For every ordered pair `(i, j)` of distinct criteria one preference set
//! optimizes criterion `i` while criterion `j` is held in a narrow band
//! near its nadir and all other criteria are ignored. With N criteria this
//! yields `N * (N - 1)` corner preferences.

use crate::criterion::Criteria;
use crate::parrep::ParRep;
use crate::preference::{CriterionPref, Preferences, PreferenceSource};

/// Width of the near-nadir band, as a fraction of `|U - N|`.
const BAND: f64 = 0.05;

/// Enumerates the corner preferences one at a time.
#[derive(Clone, Debug)]
pub struct Corners {
    pairs: Vec<(usize, usize)>,
    next: usize,
    n_ok: usize,
}

impl Corners {
    #[must_use]
    pub fn new(n: usize) -> Self {
        let pairs = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .collect();
        Self {
            pairs,
            next: 0,
            n_ok: 0,
        }
    }

    /// Number of corner preferences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.next >= self.pairs.len()
    }

    /// Count a corner iteration that produced a solution.
    pub fn record_success(&mut self) {
        self.n_ok += 1;
    }

    /// Corner iterations that produced a solution.
    #[must_use]
    pub fn n_ok(&self) -> usize {
        self.n_ok
    }

    fn corner(criteria: &Criteria, i: usize, j: usize) -> Option<Preferences> {
        let items = criteria
            .iter()
            .enumerate()
            .map(|(k, c)| {
                let (u, n) = (c.utopia()?, c.nadir()?);
                Some(if k == i {
                    CriterionPref::active(u, u - (u - n) / 3.0)
                } else if k == j {
                    CriterionPref::inactive(n + BAND * (u - n), n)
                } else {
                    CriterionPref::ignored()
                })
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Preferences::new(items))
    }
}

impl PreferenceSource for Corners {
    fn next_preferences(&mut self, criteria: &Criteria, _rep: &mut ParRep) -> Option<Preferences> {
        let &(i, j) = self.pairs.get(self.next)?;
        self.next += 1;
        trace_debug!(active = %criteria[i].name, near_nadir = %criteria[j].name, "corner");
        Self::corner(criteria, i, j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CritDef;
    use crate::parrep::ParRepParams;
    use crate::types::Sense;

    fn criteria(n: usize) -> Criteria {
        let defs: Vec<CritDef> = (0..n)
            .map(|k| CritDef::new(format!("c{k}"), Sense::Maximize, format!("v{k}")))
            .collect();
        let mut c = Criteria::new(&defs, 1e-4).unwrap();
        for cr in c.iter_mut() {
            cr.set_payoff(100.0, 10.0).unwrap();
        }
        c
    }

    #[test]
    fn test_enumerates_ordered_pairs() {
        let c = criteria(4);
        let mut rep = ParRep::new(ParRepParams::default());
        let mut corners = Corners::new(4);
        assert_eq!(corners.len(), 12);
        let mut n = 0;
        while let Some(p) = corners.next_preferences(&c, &mut rep) {
            assert_eq!(p.n_active(), 1);
            assert_eq!(p.items.iter().filter(|i| i.ignored).count(), 2);
            n += 1;
        }
        assert_eq!(n, 12);
        assert!(corners.is_exhausted());
    }

    #[test]
    fn test_corner_levels() {
        let c = criteria(2);
        let mut rep = ParRep::new(ParRepParams::default());
        let mut corners = Corners::new(2);
        let p = corners.next_preferences(&c, &mut rep).unwrap();
        assert_eq!(p.items[0], CriterionPref::active(100.0, 70.0));
        assert!(!p.items[1].active);
        assert!((p.items[1].asp.unwrap() - 14.5).abs() < 1e-9);
        assert_eq!(p.items[1].res, Some(10.0));
    }
}
