use serde::{Deserialize, Serialize};

use crate::quantizer::error::QuantizeError;
use crate::quantizer::{DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};

/// One pixel colour as `[r, g, b]`
pub type Rgb = [u8; 3];

/// Flattened pixels of an image in row-major order
pub type PointSet = Vec<Rgb>;

/// Cluster index for every point, by position
pub type LabelAssignment = Vec<usize>;

/// A cluster representative. Coordinates stay real-valued while iterating.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Centroid(pub [f64; 3]);

impl Centroid {
    pub fn from_rgb(rgb: Rgb) -> Self {
        Self([rgb[0] as f64, rgb[1] as f64, rgb[2] as f64])
    }

    /// Round and clamp each channel into `0..=255`
    pub fn to_rgb(&self) -> Rgb {
        self.0.map(|v| v.round().clamp(0.0, 255.0) as u8)
    }
}

/// Ordered set of exactly k centroids, indices `0..k`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSet {
    centroids: Vec<Centroid>,
}

impl ClusterSet {
    pub fn new(centroids: Vec<Centroid>) -> Self {
        Self { centroids }
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Centroid> {
        self.centroids.get(index)
    }

    pub fn as_slice(&self) -> &[Centroid] {
        &self.centroids
    }

    pub fn iter(&self) -> impl Iterator<Item = &Centroid> {
        self.centroids.iter()
    }

    /// Display palette: every centroid rounded and clamped to 8-bit RGB
    pub fn palette(&self) -> Vec<Rgb> {
        self.centroids.iter().map(Centroid::to_rgb).collect()
    }
}

/// Tuning knobs for a single `fit` call
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    pub max_iterations: usize,
    /// Largest centroid movement (Euclidean, 0-255 space) still counted as converged
    pub tolerance: f64,
    /// Fixed seed for initialisation; `None` draws one from OS entropy
    pub seed: Option<u64>,
}

impl FitOptions {
    pub fn new() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            seed: None,
        }
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), QuantizeError> {
        if self.max_iterations == 0 {
            return Err(QuantizeError::InvalidIterationCount);
        }
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return Err(QuantizeError::InvalidTolerance(self.tolerance));
        }
        Ok(())
    }
}

impl Default for FitOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Why the optimisation loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Converged,
    MaxIterationsReached,
}

#[derive(Debug, Clone)]
pub struct FitResult {
    pub centroids: ClusterSet,
    pub labels: LabelAssignment,
    /// Completed assign/update rounds
    pub iterations: usize,
    pub termination: Termination,
    /// Total within-cluster squared distance of `centroids` and `labels`
    pub inertia: f64,
    /// Inertia after each assignment step, one entry per iteration
    pub inertia_history: Vec<f64>,
}

impl FitResult {
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }

    /// Number of points assigned to each cluster
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}
