//! Pareto-front representation.
//!
//! [`ParRep`] owns every solution of the current exploration in an arena
//! and keeps the ids of the unique (non-dominated, not close) ones. Each
//! admitted solution spans a cuboid with every other unique solution; the
//! largest empty cuboid drives the next preferences until none is left.
//!
//! ```text
//! add_solution ──► close? ──► dominated? ──► admit ──► mk_cubes
//!                    │            │
//!                    ▼            ▼
//!                  close      dominated
//! ```

mod cube;
mod progress;
mod solution;

pub use cube::Cube;
pub use progress::{Progress, Snapshot, THRESHOLDS};
pub use solution::{Dominance, ParSol};

use crate::criterion::Criteria;
use crate::preference::Preferences;

/// Tuning of the representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParRepParams {
    /// L-infinity achievement distance below which solutions are duplicates.
    pub sol_eps: f64,
    /// Minimal L-infinity size of a candidate cuboid.
    pub min_cube_size: f64,
    /// Edges shorter than this are degenerate.
    pub min_edge: f64,
    /// Expand degenerate edges instead of fixing them.
    pub degen_expand: bool,
}

impl Default for ParRepParams {
    fn default() -> Self {
        Self {
            sol_eps: 0.01,
            min_cube_size: 5.0,
            min_edge: 0.5,
            degen_expand: false,
        }
    }
}

/// How [`ParRep::add_solution`] classified a solution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Added to the unique set.
    Unique,
    /// Within `sol_eps` of the solution from the given iteration.
    Close(usize),
    /// Dominated by the solution from the given iteration.
    Dominated(usize),
}

/// The Pareto-set representation of one exploration.
#[derive(Clone, Debug)]
pub struct ParRep {
    params: ParRepParams,
    sols: Vec<ParSol>,
    unique: Vec<usize>,
    close: Vec<usize>,
    dominated: Vec<usize>,
    cubes: Vec<Cube>,
    candidates: Vec<usize>,
    gen_cubes: bool,
    n_dropped: usize,
    n_pruned: usize,
    progress: Progress,
}

impl ParRep {
    #[must_use]
    pub fn new(params: ParRepParams) -> Self {
        Self {
            params,
            sols: Vec::new(),
            unique: Vec::new(),
            close: Vec::new(),
            dominated: Vec::new(),
            cubes: Vec::new(),
            candidates: Vec::new(),
            gen_cubes: true,
            n_dropped: 0,
            n_pruned: 0,
            progress: Progress::new(),
        }
    }

    #[must_use]
    pub fn params(&self) -> &ParRepParams {
        &self.params
    }

    /// Enable or disable cuboid generation on admission.
    pub fn set_gen_cubes(&mut self, on: bool) {
        self.gen_cubes = on;
    }

    /// Admit the solution held by `criteria`.
    pub fn add_solution(&mut self, itr_id: usize, cube_id: Option<usize>, criteria: &Criteria) -> Admission {
        let mut s = ParSol::from_criteria(itr_id, cube_id, criteria);
        let idx = self.sols.len();

        let close = self
            .unique
            .iter()
            .copied()
            .find(|&t| s.distance(&self.sols[t]) < self.params.sol_eps);
        if let Some(t) = close {
            let other = self.sols[t].itr_id;
            s.close_to = Some(other);
            self.sols.push(s);
            self.close.push(idx);
            trace_debug!(itr = itr_id, close_to = other, "solution close to an earlier one");
            return Admission::Close(other);
        }

        let mut beaten = Vec::new();
        for &t in &self.unique {
            match s.compare(&self.sols[t], criteria) {
                Dominance::DominatedBy => {
                    let other = self.sols[t].itr_id;
                    s.dominated_by = Some(other);
                    self.sols.push(s);
                    self.dominated.push(idx);
                    trace_debug!(itr = itr_id, dominated_by = other, "solution dominated");
                    return Admission::Dominated(other);
                }
                Dominance::Dominates => beaten.push(t),
                Dominance::NonDominated => {}
            }
        }

        for &t in &beaten {
            self.sols[t].dominated_by = Some(itr_id);
            self.dominated.push(t);
            trace_debug!(itr = self.sols[t].itr_id, dominated_by = itr_id, "unique solution dominated");
        }
        self.unique.retain(|t| !beaten.contains(t));
        self.sols.push(s);
        self.unique.push(idx);
        trace_info!(itr = itr_id, n_unique = self.unique.len(), "solution admitted");
        if self.gen_cubes {
            self.mk_cubes(idx, criteria);
        }
        Admission::Unique
    }

    fn is_empty_cube(&self, cube: &Cube, criteria: &Criteria) -> bool {
        let (a, b) = (&self.sols[cube.s1], &self.sols[cube.s2]);
        !self
            .unique
            .iter()
            .filter(|&&t| t != cube.s1 && t != cube.s2)
            .any(|&t| cube.contains(&self.sols[t], a, b, criteria, self.params.min_edge))
    }

    /// Span a cuboid between `s` and every other unique solution.
    fn mk_cubes(&mut self, s: usize, criteria: &Criteria) {
        let others: Vec<usize> = self.unique.iter().copied().filter(|&t| t != s).collect();
        for t in others {
            let cube = Cube::new(
                self.cubes.len(),
                t,
                s,
                &self.sols[t],
                &self.sols[s],
                self.params.min_edge,
            );
            if cube.size < self.params.min_cube_size || !self.is_empty_cube(&cube, criteria) {
                self.n_dropped += 1;
                continue;
            }
            trace_debug!(cube = cube.id, size = cube.size, "candidate cuboid");
            self.candidates.push(cube.id);
            self.cubes.push(cube);
        }
    }

    /// Select the largest candidate cuboid that is still empty.
    ///
    /// Candidates whose parents are no longer unique or that now contain a
    /// solution are pruned permanently. The winner is marked used.
    pub fn select_cube(&mut self, criteria: &Criteria) -> Option<usize> {
        let itr = self.sols.last().map_or(0, |s| s.itr_id);
        let cubes = &self.cubes;
        self.candidates
            .sort_by(|&a, &b| cubes[b].size.total_cmp(&cubes[a].size).then(a.cmp(&b)));

        while !self.candidates.is_empty() {
            let id = self.candidates.remove(0);
            let cube = &self.cubes[id];
            let parents_unique = self.sols[cube.s1].is_unique() && self.sols[cube.s2].is_unique();
            if parents_unique && self.is_empty_cube(cube, criteria) {
                let size = cube.size;
                self.cubes[id].used = true;
                self.progress
                    .update(size, itr, self.unique.len(), self.candidates.len(), false);
                trace_debug!(cube = id, size, remaining = self.candidates.len(), "cuboid selected");
                return Some(id);
            }
            self.cubes[id].empty = false;
            self.n_pruned += 1;
            trace_debug!(cube = id, "cuboid pruned");
        }
        self.progress.update(0.0, itr, self.unique.len(), 0, true);
        None
    }

    /// Select a cuboid and derive its preferences.
    pub fn next_cube_preferences(&mut self, criteria: &Criteria) -> Option<Preferences> {
        let id = self.select_cube(criteria)?;
        let cube = &self.cubes[id];
        Some(cube.preferences(
            &self.sols[cube.s1],
            &self.sols[cube.s2],
            criteria,
            self.params.degen_expand,
            self.params.min_edge,
        ))
    }

    /// Unique solutions in admission order.
    pub fn unique(&self) -> impl Iterator<Item = &ParSol> {
        self.unique.iter().map(|&i| &self.sols[i])
    }

    /// Iterations of the two solutions spanning the cuboid that produced `s`.
    #[must_use]
    pub fn parents(&self, s: &ParSol) -> Option<(usize, usize)> {
        let cube = self.cubes.get(s.cube_id?)?;
        Some((self.sols[cube.s1].itr_id, self.sols[cube.s2].itr_id))
    }

    /// Every solution seen, in arrival order.
    #[must_use]
    pub fn solutions(&self) -> &[ParSol] {
        &self.sols
    }

    #[must_use]
    pub fn cubes(&self) -> &[Cube] {
        &self.cubes
    }

    #[must_use]
    pub fn n_unique(&self) -> usize {
        self.unique.len()
    }

    #[must_use]
    pub fn n_close(&self) -> usize {
        self.close.len()
    }

    #[must_use]
    pub fn n_dominated(&self) -> usize {
        self.dominated.len()
    }

    #[must_use]
    pub fn n_candidates(&self) -> usize {
        self.candidates.len()
    }

    /// Cuboids discarded at creation (too small or not empty).
    #[must_use]
    pub fn n_dropped(&self) -> usize {
        self.n_dropped
    }

    /// Candidates discarded at selection.
    #[must_use]
    pub fn n_pruned(&self) -> usize {
        self.n_pruned
    }

    #[must_use]
    pub fn progress(&self) -> &Progress {
        &self.progress
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
            CritDef::new("b", Sense::Maximize, "b"),
        ];
        let mut c = Criteria::new(&defs, 1e-4).unwrap();
        c[0].set_payoff(100.0, 0.0).unwrap();
        c[1].set_payoff(100.0, 0.0).unwrap();
        c
    }

    fn add(rep: &mut ParRep, c: &mut Criteria, itr: usize, a: f64, b: f64) -> Admission {
        c[0].set_val(a);
        c[1].set_val(b);
        rep.add_solution(itr, None, c)
    }

    #[test]
    fn test_admission_order() {
        let mut c = criteria();
        let mut rep = ParRep::new(ParRepParams::default());
        assert_eq!(add(&mut rep, &mut c, 1, 100.0, 0.0), Admission::Unique);
        assert_eq!(add(&mut rep, &mut c, 2, 0.0, 100.0), Admission::Unique);
        assert_eq!(rep.n_candidates(), 1);
        assert_eq!(add(&mut rep, &mut c, 3, 100.0, 0.005), Admission::Close(1));
        assert_eq!(add(&mut rep, &mut c, 4, 40.0, 40.0), Admission::Unique);
        assert_eq!(add(&mut rep, &mut c, 5, 30.0, 30.0), Admission::Dominated(4));
        // dominates 4, which leaves the unique set
        assert_eq!(add(&mut rep, &mut c, 6, 50.0, 50.0), Admission::Unique);
        assert_eq!(rep.n_unique(), 3);
        assert_eq!(rep.solutions()[3].dominated_by, Some(6));
        let ids: Vec<usize> = rep.unique().map(|s| s.itr_id).collect();
        assert_eq!(ids, vec![1, 2, 6]);
    }

    #[test]
    fn test_filled_cuboid_is_pruned_at_selection() {
        let mut c = criteria();
        let mut rep = ParRep::new(ParRepParams::default());
        add(&mut rep, &mut c, 1, 100.0, 0.0);
        add(&mut rep, &mut c, 2, 0.0, 100.0);
        add(&mut rep, &mut c, 3, 50.0, 50.0);
        // the (1, 2) cuboid now contains solution 3
        assert_eq!(rep.n_candidates(), 3);
        let first = rep.select_cube(&c).unwrap();
        assert!((rep.cubes()[first].size - 50.0).abs() < 1e-9);
        assert_eq!(rep.n_pruned(), 1);
        assert!(rep.cubes()[first].used);
        assert!(rep.select_cube(&c).is_some());
        assert!(rep.select_cube(&c).is_none());
        assert!(rep.progress().last().is_some());
    }

    #[test]
    fn test_small_cuboids_are_dropped() {
        let mut c = criteria();
        let mut rep = ParRep::new(ParRepParams::default());
        add(&mut rep, &mut c, 1, 50.0, 52.0);
        add(&mut rep, &mut c, 2, 52.0, 50.0);
        assert_eq!(rep.n_candidates(), 0);
        assert_eq!(rep.n_dropped(), 1);
    }

    #[test]
    fn test_cube_preferences_carry_cube_id() {
        let mut c = criteria();
        let mut rep = ParRep::new(ParRepParams::default());
        add(&mut rep, &mut c, 1, 100.0, 0.0);
        add(&mut rep, &mut c, 2, 0.0, 100.0);
        let p = rep.next_cube_preferences(&c).unwrap();
        assert_eq!(p.cube_id, Some(0));
        assert_eq!(p.n_active(), 2);
        assert_eq!(p.items[0].asp, Some(100.0));
        assert_eq!(p.items[0].res, Some(0.0));
    }

    #[test]
    fn test_unique_set_invariants() {
        let mut c = criteria();
        let mut rep = ParRep::new(ParRepParams::default());
        let pts = [(100.0, 0.0), (0.0, 100.0), (70.0, 30.0), (30.0, 70.0), (69.0, 29.0), (30.001, 70.0)];
        for (i, (a, b)) in pts.into_iter().enumerate() {
            add(&mut rep, &mut c, i + 1, a, b);
        }
        let unique: Vec<&ParSol> = rep.unique().collect();
        for (i, s) in unique.iter().enumerate() {
            for t in &unique[i + 1..] {
                assert!(s.distance(t) >= rep.params().sol_eps);
                assert_eq!(s.compare(t, &c), Dominance::NonDominated);
            }
        }
    }
}
