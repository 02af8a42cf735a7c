//! Progress statistics of the Pareto representation.

use serde::Serialize;

/// Cuboid sizes at which a snapshot is taken.
pub const THRESHOLDS: [f64; 9] = [50.0, 30.0, 20.0, 10.0, 7.0, 5.0, 3.0, 2.0, 1.0];

/// State of the representation when the largest candidate cuboid first
/// dropped below `threshold`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub threshold: f64,
    pub itr: usize,
    pub n_unique: usize,
    pub n_candidates: usize,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct Progress {
    snapshots: Vec<Snapshot>,
    #[serde(rename = "final")]
    last: Option<Snapshot>,
    #[serde(skip)]
    next: usize,
}

impl Progress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the size of the cuboid selected in iteration `itr`.
    ///
    /// With `done` set the state is kept as the final snapshot.
    pub fn update(&mut self, size: f64, itr: usize, n_unique: usize, n_candidates: usize, done: bool) {
        while let Some(&threshold) = THRESHOLDS.get(self.next)
            && size < threshold
        {
            trace_info!(threshold, itr, n_unique, n_candidates, "progress");
            self.snapshots.push(Snapshot {
                threshold,
                itr,
                n_unique,
                n_candidates,
            });
            self.next += 1;
        }
        if done {
            self.last = Some(Snapshot {
                threshold: size,
                itr,
                n_unique,
                n_candidates,
            });
        }
    }

    #[must_use]
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    #[must_use]
    pub fn last(&self) -> Option<&Snapshot> {
        self.last.as_ref()
    }
}
