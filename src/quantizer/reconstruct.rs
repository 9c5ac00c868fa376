use crate::quantizer::distance::squared_distance;
use crate::quantizer::error::QuantizeError;
use crate::quantizer::types::{ClusterSet, PointSet, Rgb};

/// Replace every label with its centroid colour (rounded, clamped to 0-255)
pub fn reconstruct(centroids: &ClusterSet, labels: &[usize]) -> Result<PointSet, QuantizeError> {
    reconstruct_with_palette(&centroids.palette(), labels)
}

/// Same gather as [`reconstruct`], over a palette that is already 8-bit
pub fn reconstruct_with_palette(palette: &[Rgb], labels: &[usize]) -> Result<PointSet, QuantizeError> {
    labels
        .iter()
        .enumerate()
        .map(|(index, &label)| {
            palette
                .get(label)
                .copied()
                .ok_or(QuantizeError::LabelOutOfRange {
                    index,
                    label,
                    k: palette.len(),
                })
        })
        .collect()
}

/// Sum over points of the squared distance to the assigned centroid
pub fn within_cluster_sse(
    points: &[Rgb],
    centroids: &ClusterSet,
    labels: &[usize],
) -> Result<f64, QuantizeError> {
    if points.len() != labels.len() {
        return Err(QuantizeError::LengthMismatch {
            points: points.len(),
            labels: labels.len(),
        });
    }

    let mut total = 0.0;
    for (index, (point, &label)) in points.iter().zip(labels.iter()).enumerate() {
        let centroid = centroids
            .get(label)
            .ok_or(QuantizeError::LabelOutOfRange {
                index,
                label,
                k: centroids.len(),
            })?;
        total += squared_distance(point, centroid);
    }

    Ok(total)
}
