//! Clustering of the final Pareto representation.
//!
//! Both algorithms work on achievement vectors with squared Euclidean
//! distances. [`KMeans`] seeds with k-means++; [`KMedoids`] restricts the
//! centres to members of the data set. An empty cluster is re-seeded with
//! the point farthest from its centre, so `k` clusters are non-empty
//! whenever there are at least `k` distinct points.

use serde::Serialize;

/// Result of a clustering run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Clustering {
    /// Cluster id per point.
    pub labels: Vec<usize>,
    /// Centre per cluster.
    pub centres: Vec<Vec<f64>>,
    /// Sum of squared distances to the assigned centres.
    pub inertia: f64,
}

impl Clustering {
    /// Number of clusters.
    #[must_use]
    pub fn k(&self) -> usize {
        self.centres.len()
    }

    /// Point indices of each cluster.
    #[must_use]
    pub fn members(&self) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new(); self.k()];
        for (i, &l) in self.labels.iter().enumerate() {
            out[l].push(i);
        }
        out
    }
}

fn dist2(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(p: &[f64], centres: &[Vec<f64>]) -> usize {
    centres
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| dist2(p, a).total_cmp(&dist2(p, b)))
        .map_or(0, |(i, _)| i)
}

/// k-means++ seeding; returns point indices.
fn seed_indices(data: &[Vec<f64>], k: usize, rng: &mut fastrand::Rng) -> Vec<usize> {
    let mut chosen = vec![rng.usize(..data.len())];
    while chosen.len() < k {
        let d: Vec<f64> = data
            .iter()
            .map(|p| {
                chosen
                    .iter()
                    .map(|&c| dist2(p, &data[c]))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = d.iter().sum();
        let next = if total > 0.0 {
            let target = rng.f64() * total;
            let mut acc = 0.0;
            d.iter()
                .position(|&x| {
                    acc += x;
                    acc >= target && x > 0.0
                })
                .unwrap_or_else(|| d.iter().rposition(|&x| x > 0.0).unwrap_or(0))
        } else {
            // only duplicates left
            rng.usize(..data.len())
        };
        chosen.push(next);
    }
    chosen
}

/// Assign every point and fill empty clusters with far-away points.
fn assign(data: &[Vec<f64>], centres: &mut [Vec<f64>], labels: &mut [usize]) {
    for (l, p) in labels.iter_mut().zip(data) {
        *l = nearest(p, centres);
    }
    for c in 0..centres.len() {
        let mut counts = vec![0usize; centres.len()];
        for &l in labels.iter() {
            counts[l] += 1;
        }
        if counts[c] > 0 {
            continue;
        }
        let far = (0..data.len())
            .filter(|&i| counts[labels[i]] > 1 && dist2(&data[i], &centres[labels[i]]) > 0.0)
            .max_by(|&a, &b| {
                dist2(&data[a], &centres[labels[a]]).total_cmp(&dist2(&data[b], &centres[labels[b]]))
            });
        if let Some(i) = far {
            centres[c].clone_from(&data[i]);
            labels[i] = c;
        }
    }
}

fn inertia(data: &[Vec<f64>], centres: &[Vec<f64>], labels: &[usize]) -> f64 {
    data.iter()
        .zip(labels)
        .map(|(p, &l)| dist2(p, &centres[l]))
        .sum()
}

/// Lloyd's k-means with k-means++ seeding.
#[derive(Clone, Debug)]
pub struct KMeans {
    k: usize,
    max_iter: usize,
    seed: u64,
}

impl KMeans {
    #[must_use]
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            max_iter: 100,
            seed,
        }
    }

    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Cluster `data`; `k` is capped at the number of points.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(&self, data: &[Vec<f64>]) -> Clustering {
        let k = self.k.min(data.len());
        if k == 0 {
            return Clustering {
                labels: vec![0; data.len()],
                centres: Vec::new(),
                inertia: 0.0,
            };
        }
        let dim = data[0].len();
        let mut rng = fastrand::Rng::with_seed(self.seed);
        let mut centres: Vec<Vec<f64>> = seed_indices(data, k, &mut rng)
            .into_iter()
            .map(|i| data[i].clone())
            .collect();
        let mut labels = vec![usize::MAX; data.len()];

        for _ in 0..self.max_iter {
            let old = labels.clone();
            assign(data, &mut centres, &mut labels);
            if labels == old {
                break;
            }
            let mut sums = vec![vec![0.0; dim]; k];
            let mut counts = vec![0usize; k];
            for (p, &l) in data.iter().zip(&labels) {
                counts[l] += 1;
                for (s, v) in sums[l].iter_mut().zip(p) {
                    *s += v;
                }
            }
            for ((c, s), &n) in centres.iter_mut().zip(sums).zip(&counts) {
                if n > 0 {
                    *c = s.into_iter().map(|v| v / n as f64).collect();
                }
            }
        }
        trace_debug!(k, n = data.len(), "k-means done");
        Clustering {
            inertia: inertia(data, &centres, &labels),
            labels,
            centres,
        }
    }
}

/// k-medoids: alternating assignment and medoid update.
#[derive(Clone, Debug)]
pub struct KMedoids {
    k: usize,
    max_iter: usize,
    seed: u64,
}

impl KMedoids {
    #[must_use]
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            max_iter: 100,
            seed,
        }
    }

    /// Cluster `data`; centres are members of `data`.
    #[must_use]
    pub fn fit(&self, data: &[Vec<f64>]) -> Clustering {
        let k = self.k.min(data.len());
        if k == 0 {
            return Clustering {
                labels: vec![0; data.len()],
                centres: Vec::new(),
                inertia: 0.0,
            };
        }
        let mut rng = fastrand::Rng::with_seed(self.seed);
        let mut medoids = seed_indices(data, k, &mut rng);
        let mut centres: Vec<Vec<f64>> = medoids.iter().map(|&i| data[i].clone()).collect();
        let mut labels = vec![usize::MAX; data.len()];

        for _ in 0..self.max_iter {
            assign(data, &mut centres, &mut labels);
            let mut changed = false;
            for (c, medoid) in medoids.iter_mut().enumerate() {
                let members: Vec<usize> = (0..data.len()).filter(|&i| labels[i] == c).collect();
                let best = members.iter().copied().min_by(|&a, &b| {
                    let ca: f64 = members.iter().map(|&m| dist2(&data[a], &data[m])).sum();
                    let cb: f64 = members.iter().map(|&m| dist2(&data[b], &data[m])).sum();
                    ca.total_cmp(&cb)
                });
                if let Some(b) = best
                    && data[b] != centres[c]
                {
                    *medoid = b;
                    centres[c].clone_from(&data[b]);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        assign(data, &mut centres, &mut labels);
        trace_debug!(k, n = data.len(), "k-medoids done");
        Clustering {
            inertia: inertia(data, &centres, &labels),
            labels,
            centres,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f64>> {
        let mut data = Vec::new();
        for (cx, cy) in [(10.0, 10.0), (50.0, 90.0), (90.0, 20.0)] {
            for d in [-1.0, 0.0, 1.0] {
                data.push(vec![cx + d, cy]);
                data.push(vec![cx, cy + d]);
            }
        }
        data
    }

    fn check_blobs(c: &Clustering) {
        assert_eq!(c.k(), 3);
        for group in c.members() {
            assert_eq!(group.len(), 6);
            let first = group[0] / 6;
            assert!(group.iter().all(|&i| i / 6 == first));
        }
    }

    #[test]
    fn test_kmeans_separates_blobs() {
        check_blobs(&KMeans::new(3, 42).fit(&blobs()));
    }

    #[test]
    fn test_kmedoids_separates_blobs() {
        let data = blobs();
        let c = KMedoids::new(3, 7).fit(&data);
        check_blobs(&c);
        assert!(c.centres.iter().all(|m| data.contains(m)));
    }

    #[test]
    fn test_clusters_cover_all_points_and_are_non_empty() {
        let data: Vec<Vec<f64>> = (0..10_i32)
            .map(|i| vec![f64::from(i) * 10.0, 100.0 - f64::from(i) * 10.0])
            .collect();
        for seed in 0..5 {
            let c = KMeans::new(4, seed).fit(&data);
            assert_eq!(c.labels.len(), data.len());
            assert!(c.members().iter().all(|m| !m.is_empty()));
        }
    }

    #[test]
    fn test_k_capped_by_data() {
        let data = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert_eq!(KMeans::new(5, 1).fit(&data).k(), 2);
        assert_eq!(KMedoids::new(0, 1).fit(&data).k(), 0);
    }
}
