mod centroid;
mod distance;
mod error;
mod init;
mod kmeans;
mod reconstruct;
mod types;


pub use distance::{centroid_distance, nearest_centroid, squared_distance};
pub use error::QuantizeError;
pub use kmeans::ColorQuantizer;
pub use reconstruct::{reconstruct, reconstruct_with_palette, within_cluster_sse};
pub use types::{
    Centroid, ClusterSet, FitOptions, FitResult, LabelAssignment, PointSet, Rgb, Termination,
};

/// Default bound on Lloyd iterations
pub const DEFAULT_MAX_ITERATIONS: usize = 300;

/// Default convergence threshold on centroid movement (0-255 colour space)
pub const DEFAULT_TOLERANCE: f64 = 1e-4;
