use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;

use crate::quantizer::{
    centroid::ClusterAccumulator,
    distance::{centroid_distance, nearest_centroid},
    error::QuantizeError,
    init::initial_centroids,
    reconstruct::within_cluster_sse,
    types::{Centroid, ClusterSet, FitOptions, FitResult, Rgb, Termination},
};

/// Points handled by one worker per assignment pass
const CHUNK_SIZE: usize = 4096;

/// Lloyd's k-means over RGB points.
///
/// Holds no state between calls; every `fit` owns its centroid and label
/// buffers for the duration of the call.
#[derive(Debug, Clone, Default)]
pub struct ColorQuantizer {
    options: FitOptions,
}

impl ColorQuantizer {
    pub fn new(options: FitOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    /// Partition `points` into `k` clusters.
    ///
    /// # Errors
    /// `EmptyInput` when there are no points, `InvalidClusterCount` when `k`
    /// is outside `1..=points.len()`, and the option validation errors. Nothing
    /// fails once iteration has started.
    pub fn fit(&self, points: &[Rgb], k: usize) -> Result<FitResult, QuantizeError> {
        self.options.validate()?;

        let n = points.len();
        if n == 0 {
            return Err(QuantizeError::EmptyInput);
        }
        if k == 0 || k > n {
            return Err(QuantizeError::InvalidClusterCount { k, n });
        }

        let mut rng = match self.options.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut centroids = initial_centroids(points, k, &mut rng);
        let mut labels = vec![0usize; n];
        let mut distances = vec![0f64; n];
        let mut inertia_history = Vec::new();
        let mut iterations = 0;
        let mut termination = Termination::MaxIterationsReached;

        for _ in 0..self.options.max_iterations {
            iterations += 1;

            let mut acc = assign(points, &centroids, &mut labels, &mut distances);
            inertia_history.push(acc.inertia);

            let reseeded = reseed_empty_clusters(points, &mut labels, &mut distances, &mut acc);

            let updated = acc.means(&centroids);
            let shift = centroids
                .iter()
                .zip(updated.iter())
                .map(|(old, new)| centroid_distance(old, new))
                .fold(0.0, f64::max);
            centroids = updated;

            debug!(
                iteration = iterations,
                inertia = inertia_history[iterations - 1],
                shift,
                reseeded,
                "k-means iteration"
            );

            if shift <= self.options.tolerance {
                termination = Termination::Converged;
                break;
            }
        }

        let centroids = ClusterSet::new(centroids);
        let inertia = within_cluster_sse(points, &centroids, &labels)?;

        debug!(k, n, iterations, ?termination, inertia, "k-means finished");

        Ok(FitResult {
            centroids,
            labels,
            iterations,
            termination,
            inertia,
            inertia_history,
        })
    }
}

/// Assignment step: nearest centroid for every point, plus the per-cluster
/// sums needed by the update step. Chunks run in parallel and their partial
/// accumulators are merged in chunk order.
fn assign(
    points: &[Rgb],
    centroids: &[Centroid],
    labels: &mut [usize],
    distances: &mut [f64],
) -> ClusterAccumulator {
    let k = centroids.len();

    points
        .par_chunks(CHUNK_SIZE)
        .zip(labels.par_chunks_mut(CHUNK_SIZE))
        .zip(distances.par_chunks_mut(CHUNK_SIZE))
        .map(|((pts, lbls), dists)| {
            let mut acc = ClusterAccumulator::new(k);
            for ((point, label), dist) in pts.iter().zip(lbls.iter_mut()).zip(dists.iter_mut()) {
                let (best, best_dist) = nearest_centroid(point, centroids);
                *label = best;
                *dist = best_dist;
                acc.add(best, point, best_dist);
            }
            acc
        })
        .collect::<Vec<_>>()
        .into_iter()
        .fold(ClusterAccumulator::new(k), ClusterAccumulator::merge)
}

/// Give every empty cluster the farthest point from its current centroid.
///
/// Empty clusters are handled in index order. Only points whose cluster keeps
/// at least one other member are eligible; ties go to the lowest point index.
/// Returns the number of clusters reseeded.
fn reseed_empty_clusters(
    points: &[Rgb],
    labels: &mut [usize],
    distances: &mut [f64],
    acc: &mut ClusterAccumulator,
) -> usize {
    let k = acc.len();
    let mut reseeded = 0;

    for cluster in 0..k {
        if acc.count(cluster) > 0 {
            continue;
        }

        let mut farthest: Option<(usize, f64)> = None;
        for (i, &dist) in distances.iter().enumerate() {
            if acc.count(labels[i]) < 2 {
                continue;
            }
            match farthest {
                Some((_, best)) if dist <= best => {}
                _ => farthest = Some((i, dist)),
            }
        }

        // With n >= k some cluster always has a spare member
        let Some((i, dist)) = farthest else {
            break;
        };

        acc.move_point(labels[i], cluster, &points[i], dist);
        labels[i] = cluster;
        distances[i] = 0.0;
        reseeded += 1;
    }

    reseeded
}
