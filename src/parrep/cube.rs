//! Hyper-cuboids spanned by two Pareto solutions in achievement space.

use crate::criterion::Criteria;
use crate::preference::{CriterionPref, Preferences};

use super::solution::ParSol;

/// An axis-aligned box bounded by the achievements of two solutions.
#[derive(Clone, Debug, PartialEq)]
pub struct Cube {
    /// Creation order.
    pub id: usize,
    /// Arena index of the first parent.
    pub s1: usize,
    /// Arena index of the second parent.
    pub s2: usize,
    /// `|a_vals[i](s1) - a_vals[i](s2)|` per criterion.
    pub edges: Vec<f64>,
    /// Edge `i` is shorter than `minEdge`.
    pub degen: Vec<bool>,
    pub is_degen: bool,
    /// L-infinity norm of the edges.
    pub size: f64,
    pub size_l1: f64,
    pub size_l2: f64,
    /// Yielded preferences.
    pub used: bool,
    /// No other Pareto solution strictly inside at the last check.
    pub empty: bool,
}

impl Cube {
    #[must_use]
    pub fn new(id: usize, s1: usize, s2: usize, a: &ParSol, b: &ParSol, min_edge: f64) -> Self {
        let edges: Vec<f64> = a
            .a_vals
            .iter()
            .zip(&b.a_vals)
            .map(|(x, y)| (x - y).abs())
            .collect();
        let degen: Vec<bool> = edges.iter().map(|&e| e < min_edge).collect();
        Self {
            id,
            s1,
            s2,
            is_degen: degen.iter().any(|&d| d),
            size: edges.iter().copied().fold(0.0, f64::max),
            size_l1: edges.iter().sum(),
            size_l2: edges.iter().map(|e| e * e).sum::<f64>().sqrt(),
            edges,
            degen,
            used: false,
            empty: true,
        }
    }

    /// `true` when `p` lies strictly inside the cuboid spanned by `a` and `b`.
    ///
    /// Non-degenerate coordinates compare model values with the criteria's
    /// tolerant `better`; degenerate ones only require `p` to be within
    /// `min_edge` of the shared achievement.
    #[must_use]
    pub fn contains(
        &self,
        p: &ParSol,
        a: &ParSol,
        b: &ParSol,
        criteria: &Criteria,
        min_edge: f64,
    ) -> bool {
        criteria.iter().enumerate().all(|(i, c)| {
            if self.degen[i] {
                (p.a_vals[i] - a.a_vals[i]).abs() < min_edge
            } else {
                let (hi, lo) = if c.better(a.vals[i], b.vals[i]) {
                    (a.vals[i], b.vals[i])
                } else {
                    (b.vals[i], a.vals[i])
                };
                c.better(p.vals[i], lo) && c.better(hi, p.vals[i])
            }
        })
    }

    /// Derive the preferences exploring this cuboid.
    ///
    /// Non-degenerate criteria become active with A/R at the better/worse
    /// parent value. Degenerate criteria are fixed at the first parent's
    /// value, or, with `degen_expand` and a shared achievement above
    /// `min_edge`, get a reservation moved toward the nadir by the average
    /// non-degenerate edge.
    #[must_use]
    pub fn preferences(
        &self,
        a: &ParSol,
        b: &ParSol,
        criteria: &Criteria,
        degen_expand: bool,
        min_edge: f64,
    ) -> Preferences {
        let spans: Vec<f64> = self
            .edges
            .iter()
            .zip(&self.degen)
            .filter(|&(_, d)| !d)
            .map(|(e, _)| *e)
            .collect();
        #[allow(clippy::cast_precision_loss)]
        let avg_edge = if spans.is_empty() {
            0.0
        } else {
            spans.iter().sum::<f64>() / spans.len() as f64
        };

        let items = criteria
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let (va, vb) = (a.vals[i], b.vals[i]);
                if !self.degen[i] {
                    let (asp, res) = if c.better(va, vb) { (va, vb) } else { (vb, va) };
                    return CriterionPref::active(asp, res);
                }
                let shared = a.a_vals[i];
                if degen_expand && shared > min_edge {
                    let res_ach = (shared - avg_edge).max(0.0);
                    if let (Ok(asp), Ok(res)) = (c.ach2val(shared), c.ach2val(res_ach)) {
                        return CriterionPref::active(asp, res);
                    }
                }
                CriterionPref::fixed(va)
            })
            .collect();
        Preferences {
            items,
            selfish: None,
            cube_id: Some(self.id),
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
            CritDef::new("c", Sense::Maximize, "c"),
        ];
        let mut c = Criteria::new(&defs, 1e-4).unwrap();
        c[0].set_payoff(100.0, 0.0).unwrap();
        c[1].set_payoff(0.0, 100.0).unwrap();
        c[2].set_payoff(100.0, 0.0).unwrap();
        c
    }

    fn sol(c: &mut Criteria, itr: usize, v: [f64; 3]) -> ParSol {
        for (i, x) in v.into_iter().enumerate() {
            c[i].set_val(x);
        }
        ParSol::from_criteria(itr, None, c)
    }

    #[test]
    fn test_sizes_and_degeneracy() {
        let mut c = criteria();
        let a = sol(&mut c, 1, [80.0, 20.0, 50.0]);
        let b = sol(&mut c, 2, [20.0, 60.0, 50.2]);
        let cube = Cube::new(0, 0, 1, &a, &b, 0.5);
        assert!((cube.size - 60.0).abs() < 1e-9);
        assert!((cube.size_l1 - 100.2).abs() < 1e-9);
        assert_eq!(cube.degen, vec![false, false, true]);
        assert!(cube.is_degen);
    }

    #[test]
    fn test_contains_strictly_inside_only() {
        let mut c = criteria();
        let a = sol(&mut c, 1, [80.0, 20.0, 10.0]);
        let b = sol(&mut c, 2, [20.0, 60.0, 90.0]);
        let cube = Cube::new(0, 0, 1, &a, &b, 0.5);
        let inside = sol(&mut c, 3, [50.0, 40.0, 50.0]);
        let on_face = sol(&mut c, 4, [80.0, 40.0, 50.0]);
        let outside = sol(&mut c, 5, [90.0, 40.0, 50.0]);
        assert!(cube.contains(&inside, &a, &b, &c, 0.5));
        assert!(!cube.contains(&on_face, &a, &b, &c, 0.5));
        assert!(!cube.contains(&outside, &a, &b, &c, 0.5));
    }

    #[test]
    fn test_preferences_fix_degenerate_edge() {
        let mut c = criteria();
        let a = sol(&mut c, 1, [80.0, 20.0, 50.0]);
        let b = sol(&mut c, 2, [20.0, 60.0, 50.2]);
        let cube = Cube::new(7, 0, 1, &a, &b, 0.5);
        let p = cube.preferences(&a, &b, &c, false, 0.5);
        assert_eq!(p.cube_id, Some(7));
        assert_eq!(p.items[0], CriterionPref::active(80.0, 20.0));
        assert_eq!(p.items[1], CriterionPref::active(20.0, 60.0));
        assert_eq!(p.items[2], CriterionPref::fixed(50.0));
    }

    #[test]
    fn test_preferences_expand_degenerate_edge() {
        let mut c = criteria();
        let a = sol(&mut c, 1, [80.0, 20.0, 50.0]);
        let b = sol(&mut c, 2, [20.0, 60.0, 50.2]);
        let cube = Cube::new(0, 0, 1, &a, &b, 0.5);
        let p = cube.preferences(&a, &b, &c, true, 0.5);
        // average non-degenerate edge is 50
        assert!(p.items[2].active);
        assert!((p.items[2].asp.unwrap() - 50.0).abs() < 1e-9);
        assert!(p.items[2].res.unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_single_free_edge_optimizes_that_criterion() {
        use crate::asf::{AsfBlock, AsfParams};
        use crate::model::{Cmp, LinearModel};
        use crate::solver::{MicrolpSolver, Solver};
        use crate::types::SolveStatus;

        let mut m = LinearModel::new("budget");
        for v in ["a", "b", "c"] {
            m.var(v, Some(0.0), None);
        }
        m.constraint("budget", &[("a", 1.0), ("b", 1.0), ("c", 1.0)], Cmp::Le, 10.0);
        let defs: Vec<CritDef> = ["a", "b", "c"]
            .iter()
            .map(|v| CritDef::new(*v, Sense::Maximize, *v))
            .collect();
        let mut c = Criteria::new(&defs, 1e-4).unwrap();
        for cr in c.iter_mut() {
            cr.set_payoff(10.0, 0.0).unwrap();
        }

        // parents differ only in b
        let s1 = sol(&mut c, 1, [2.0, 1.0, 4.0]);
        let s2 = sol(&mut c, 2, [2.0, 3.0, 4.0]);
        let cube = Cube::new(0, 0, 1, &s1, &s2, 0.5);
        assert_eq!(cube.degen, vec![true, false, true]);

        let prefs = cube.preferences(&s1, &s2, &c, false, 0.5);
        assert_eq!(prefs.n_active(), 1);
        prefs.apply(&mut c);
        let mut program = m.compile().unwrap();
        let block = AsfBlock::new(&c, prefs.selfish, AsfParams::default());
        let handle = program.link(&block).unwrap();
        let out = MicrolpSolver.solve(&program);
        assert_eq!(out.status, SolveStatus::Optimal);
        program.detach(handle);

        let col = |v: &str| out.values[program.var_index(v).unwrap()];
        assert!((col("a") - 2.0).abs() < 1e-6);
        assert!((col("c") - 4.0).abs() < 1e-6);
        // b goes past its aspiration to the best value of the slice
        assert!((col("b") - 4.0).abs() < 1e-6);
    }
}
