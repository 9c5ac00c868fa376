use crate::quantizer::types::{Centroid, Rgb};

/// Per-cluster running sums for the update step.
///
/// Each worker fills its own accumulator over a chunk of points; partials are
/// merged in chunk order before the means are taken.
#[derive(Debug, Clone)]
pub(crate) struct ClusterAccumulator {
    sums: Vec<[f64; 3]>,
    counts: Vec<usize>,
    pub(crate) inertia: f64,
}

impl ClusterAccumulator {
    pub(crate) fn new(k: usize) -> Self {
        Self {
            sums: vec![[0.0; 3]; k],
            counts: vec![0; k],
            inertia: 0.0,
        }
    }

    pub(crate) fn add(&mut self, cluster: usize, point: &Rgb, dist: f64) {
        let sum = &mut self.sums[cluster];
        for i in 0..3 {
            sum[i] += point[i] as f64;
        }
        self.counts[cluster] += 1;
        self.inertia += dist;
    }

    pub(crate) fn merge(mut self, other: Self) -> Self {
        for (c, (sum, count)) in other.sums.iter().zip(other.counts.iter()).enumerate() {
            for i in 0..3 {
                self.sums[c][i] += sum[i];
            }
            self.counts[c] += count;
        }
        self.inertia += other.inertia;
        self
    }

    /// Move one point between clusters (used when reseeding an empty cluster)
    pub(crate) fn move_point(&mut self, from: usize, to: usize, point: &Rgb, dist: f64) {
        for i in 0..3 {
            self.sums[from][i] -= point[i] as f64;
            self.sums[to][i] += point[i] as f64;
        }
        self.counts[from] -= 1;
        self.counts[to] += 1;
        self.inertia -= dist;
    }

    pub(crate) fn len(&self) -> usize {
        self.counts.len()
    }

    pub(crate) fn count(&self, cluster: usize) -> usize {
        self.counts[cluster]
    }

    /// Arithmetic mean per cluster; a cluster with no members keeps its
    /// previous position.
    pub(crate) fn means(&self, previous: &[Centroid]) -> Vec<Centroid> {
        self.sums
            .iter()
            .zip(self.counts.iter())
            .zip(previous.iter())
            .map(|((sum, &count), prev)| {
                if count == 0 {
                    return *prev;
                }
                let n = count as f64;
                Centroid([sum[0] / n, sum[1] / n, sum[2] / n])
            })
            .collect()
    }
}
