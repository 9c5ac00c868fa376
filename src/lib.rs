// Public API exports
pub mod config;
pub mod db;
pub mod image_io;
pub mod pipeline;
pub mod quantizer;
pub mod upload;

// Re-export main types for convenience
pub use quantizer::{
    reconstruct, reconstruct_with_palette, within_cluster_sse, Centroid, ClusterSet,
    ColorQuantizer, FitOptions, FitResult, LabelAssignment, PointSet, QuantizeError, Rgb,
    Termination,
};

pub use config::Config;
pub use db::{CompressionRecord, RunStore, SqliteRunStore};
pub use image_io::{decode_bytes, decode_file, encode_file, DecodedImage, ImageError};
pub use pipeline::{
    requests_from_dir, CompressionOutcome, CompressionRequest, Compressor, FitSummary,
    Pipeline,
};
pub use upload::{UploadError, UploadName, UploadValidator};
