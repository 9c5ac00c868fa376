use crate::quantizer::types::{Centroid, Rgb};

pub fn squared_distance(point: &Rgb, centroid: &Centroid) -> f64 {
    let mut sum = 0.0;

    for i in 0..3 {
        let d = point[i] as f64 - centroid.0[i];
        sum += d * d;
    }

    sum
}

/// Euclidean distance between two centroids, used for the movement check
pub fn centroid_distance(a: &Centroid, b: &Centroid) -> f64 {
    let mut sum = 0.0;

    for i in 0..3 {
        let d = a.0[i] - b.0[i];
        sum += d * d;
    }

    sum.sqrt()
}

/// Index and squared distance of the closest centroid.
///
/// Only a strictly smaller distance replaces the current best, so the lowest
/// index wins when several centroids are equidistant.
pub fn nearest_centroid(point: &Rgb, centroids: &[Centroid]) -> (usize, f64) {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;

    for (idx, centroid) in centroids.iter().enumerate() {
        let dist = squared_distance(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best = idx;
        }
    }

    (best, best_dist)
}
