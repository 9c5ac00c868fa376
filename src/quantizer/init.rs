use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;

use crate::quantizer::distance::squared_distance;
use crate::quantizer::types::{Centroid, Rgb};

/// Pick k starting centroids from the point set.
///
/// With `k == n` every point becomes a centroid, in a seeded random order.
/// Otherwise k-means++ seeding is used.
pub(crate) fn initial_centroids<R: Rng>(points: &[Rgb], k: usize, rng: &mut R) -> Vec<Centroid> {
    if k == points.len() {
        let mut order: Vec<usize> = (0..points.len()).collect();
        order.shuffle(rng);
        return order
            .into_iter()
            .map(|i| Centroid::from_rgb(points[i]))
            .collect();
    }

    plus_plus(points, k, rng)
}

fn plus_plus<R: Rng>(points: &[Rgb], k: usize, rng: &mut R) -> Vec<Centroid> {
    let n = points.len();
    let mut chosen = vec![false; n];
    let mut centroids = Vec::with_capacity(k);

    let first = rng.gen_range(0..n);
    chosen[first] = true;
    centroids.push(Centroid::from_rgb(points[first]));

    // Squared distance from each point to its nearest chosen centroid
    let mut min_dist: Vec<f64> = points
        .par_iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = min_dist.iter().sum();

        let next = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            pick_weighted(&min_dist, target)
        } else {
            // Every remaining point coincides with a chosen centroid
            let remaining: Vec<usize> = (0..n).filter(|&i| !chosen[i]).collect();
            remaining[rng.gen_range(0..remaining.len())]
        };

        chosen[next] = true;
        let centroid = Centroid::from_rgb(points[next]);

        min_dist
            .par_iter_mut()
            .zip(points.par_iter())
            .for_each(|(d, p)| {
                let nd = squared_distance(p, &centroid);
                if nd < *d {
                    *d = nd;
                }
            });

        centroids.push(centroid);
    }

    centroids
}

/// First index whose cumulative weight exceeds `target`. Zero-weight entries
/// are never returned.
fn pick_weighted(weights: &[f64], target: f64) -> usize {
    let mut cumulative = 0.0;
    let mut last_positive = 0;

    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        cumulative += w;
        last_positive = i;
        if cumulative > target {
            return i;
        }
    }

    // Rounding can leave target just above the final cumulative sum
    last_positive
}
