use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuantizeError {
    #[error("Cannot cluster an empty point set")]
    EmptyInput,

    #[error("Invalid cluster count: k = {k} (must be between 1 and {n})")]
    InvalidClusterCount { k: usize, n: usize },

    #[error("max_iterations must be at least 1")]
    InvalidIterationCount,

    #[error("Invalid tolerance: {0} (must be a non-negative number)")]
    InvalidTolerance(f64),

    #[error("Label {label} at position {index} is out of range for {k} centroids")]
    LabelOutOfRange { index: usize, label: usize, k: usize },

    #[error("Length mismatch: {points} points but {labels} labels")]
    LengthMismatch { points: usize, labels: usize },
}
