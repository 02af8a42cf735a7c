//! Pareto utilities on plain value vectors.
//!
//! | Function | Purpose |
//! |---|---|
//! | [`dominates`] | Exact Pareto dominance respecting each sense |
//! | [`pareto_front_indices`] | Indices of the non-dominated vectors |
//! | [`hypervolume`] | Volume dominated by a front, bounded by a reference point |
//! | [`achievement_hypervolume`] | Hypervolume in achievement space, reference at the nadir |
//!
//! These functions compare exactly. The analysis itself uses the tolerant
//! comparisons of [`Criterion`](crate::criterion::Criterion); the helpers
//! here serve reporting and verification.
//!
//! ```
//! use mcma::Sense;
//! use mcma::pareto::{hypervolume, pareto_front_indices};
//!
//! let pts = vec![vec![1.0, 5.0], vec![5.0, 1.0], vec![3.0, 3.0], vec![4.0, 4.0]];
//! let senses = [Sense::Minimize, Sense::Minimize];
//! assert_eq!(pareto_front_indices(&pts, &senses), vec![0, 1, 2]);
//! assert!((hypervolume(&pts, &[6.0, 6.0], &senses) - 13.0).abs() < 1e-12);
//! ```

use crate::types::Sense;

/// `true` if `a` is at least as good as `b` everywhere and strictly better somewhere.
#[must_use]
pub fn dominates(a: &[f64], b: &[f64], senses: &[Sense]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    debug_assert_eq!(a.len(), senses.len());

    let mut strictly_better = false;
    for ((&av, &bv), s) in a.iter().zip(b).zip(senses) {
        let d = s.mult() * (av - bv);
        if d < 0.0 {
            return false;
        }
        if d > 0.0 {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Indices of the vectors not dominated by any other, in input order.
#[must_use]
pub fn pareto_front_indices(points: &[Vec<f64>], senses: &[Sense]) -> Vec<usize> {
    (0..points.len())
        .filter(|&i| {
            !points
                .iter()
                .enumerate()
                .any(|(j, q)| j != i && dominates(q, &points[i], senses))
        })
        .collect()
}

/// Hypervolume of `front` with respect to `reference`.
///
/// `reference` should be worse than every front member; points that do
/// not strictly dominate it are ignored.
#[must_use]
pub fn hypervolume(front: &[Vec<f64>], reference: &[f64], senses: &[Sense]) -> f64 {
    let d = reference.len();
    debug_assert!(front.iter().all(|p| p.len() == d));
    debug_assert_eq!(d, senses.len());

    // minimize-space
    let flip = |v: &[f64]| -> Vec<f64> {
        v.iter()
            .zip(senses)
            .map(|(&x, s)| -s.mult() * x)
            .collect()
    };
    let ref_min = flip(reference);
    let points: Vec<Vec<f64>> = front
        .iter()
        .map(|p| flip(p))
        .filter(|p| p.iter().zip(&ref_min).all(|(&pv, &rv)| pv < rv))
        .collect();

    if points.is_empty() {
        return 0.0;
    }
    hv_slices(&points, &ref_min)
}

/// Hypervolume of achievement vectors (all maximized, reference 0).
#[must_use]
pub fn achievement_hypervolume(a_vals: &[Vec<f64>]) -> f64 {
    let Some(d) = a_vals.first().map(Vec::len) else {
        return 0.0;
    };
    hypervolume(a_vals, &vec![0.0; d], &vec![Sense::Maximize; d])
}

/// Slice on the last coordinate and recurse on the projections.
fn hv_slices(points: &[Vec<f64>], reference: &[f64]) -> f64 {
    let d = reference.len();
    if d == 1 {
        let best = points.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min);
        return (reference[0] - best).max(0.0);
    }
    if let [p] = points {
        return p
            .iter()
            .zip(reference)
            .map(|(&v, &r)| (r - v).max(0.0))
            .product();
    }

    let mut sorted: Vec<&Vec<f64>> = points.iter().collect();
    sorted.sort_by(|a, b| a[d - 1].total_cmp(&b[d - 1]));

    let sub_ref = &reference[..d - 1];
    let mut volume = 0.0;
    for i in 0..sorted.len() {
        let upper = sorted.get(i + 1).map_or(reference[d - 1], |p| p[d - 1]);
        let height = upper - sorted[i][d - 1];
        if height <= 0.0 {
            continue;
        }
        let projected: Vec<Vec<f64>> = sorted[..=i].iter().map(|p| p[..d - 1].to_vec()).collect();
        let keep = pareto_front_indices(&projected, &vec![Sense::Minimize; d - 1]);
        let slice: Vec<Vec<f64>> = keep.into_iter().map(|k| projected[k].clone()).collect();
        volume += height * hv_slices(&slice, sub_ref);
    }
    volume
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominates_respects_sense() {
        let s = [Sense::Maximize, Sense::Minimize];
        assert!(dominates(&[2.0, 1.0], &[1.0, 1.0], &s));
        assert!(!dominates(&[2.0, 2.0], &[1.0, 1.0], &s));
        assert!(!dominates(&[1.0, 1.0], &[1.0, 1.0], &s));
    }

    #[test]
    fn test_front_indices() {
        let pts = vec![vec![1.0, 1.0], vec![2.0, 0.0], vec![0.5, 0.5], vec![1.0, 1.0]];
        let s = [Sense::Maximize, Sense::Maximize];
        assert_eq!(pareto_front_indices(&pts, &s), vec![0, 1, 3]);
    }

    #[test]
    fn test_hypervolume_maximize_2d() {
        let front = vec![vec![4.0, 1.0], vec![1.0, 4.0], vec![3.0, 3.0]];
        let s = [Sense::Maximize, Sense::Maximize];
        // union of boxes from the origin
        assert!((hypervolume(&front, &[0.0, 0.0], &s) - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_hypervolume_3d_single_point() {
        let s = [Sense::Minimize; 3];
        let hv = hypervolume(&[vec![1.0, 2.0, 3.0]], &[4.0, 4.0, 4.0], &s);
        assert!((hv - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_hypervolume_ignores_points_beyond_reference() {
        let s = [Sense::Minimize, Sense::Minimize];
        assert!(hypervolume(&[vec![5.0, 1.0]], &[4.0, 4.0], &s).abs() < 1e-12);
        assert!(hypervolume(&[], &[4.0, 4.0], &s).abs() < 1e-12);
    }

    #[test]
    fn test_achievement_hypervolume_of_corners_and_centre() {
        let pts = vec![vec![100.0, 0.0], vec![0.0, 100.0], vec![50.0, 50.0]];
        // corners lie on the reference in one coordinate and add nothing
        assert!((achievement_hypervolume(&pts) - 2500.0).abs() < 1e-9);
    }
}
