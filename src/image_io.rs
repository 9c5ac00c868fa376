use std::path::Path;

use image::{DynamicImage, RgbImage};
use thiserror::Error;

use crate::quantizer::{PointSet, Rgb};

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to decode image {path}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode image {path}")]
    Encode {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Pixel count {points} does not match {rows}x{cols}")]
    ShapeMismatch { rows: u32, cols: u32, points: usize },

    #[error("Image has no pixels: {0}")]
    Empty(String),
}

/// An image flattened into one RGB point per pixel, row-major
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub rows: u32,
    pub cols: u32,
    pub points: PointSet,
}

impl DecodedImage {
    pub fn pixel_count(&self) -> usize {
        self.points.len()
    }
}

/// Decode any format the `image` crate understands. Alpha is dropped.
pub fn decode_file(path: &Path) -> Result<DecodedImage, ImageError> {
    let label = path.display().to_string();
    let img = image::open(path).map_err(|source| ImageError::Decode {
        path: label.clone(),
        source,
    })?;
    from_dynamic(img, label)
}

/// Decode an in-memory upload; the format is guessed from its contents.
/// `label` only names the image in errors.
pub fn decode_bytes(bytes: &[u8], label: &str) -> Result<DecodedImage, ImageError> {
    let img = image::load_from_memory(bytes).map_err(|source| ImageError::Decode {
        path: label.to_string(),
        source,
    })?;
    from_dynamic(img, label.to_string())
}

fn from_dynamic(img: DynamicImage, label: String) -> Result<DecodedImage, ImageError> {
    let rgb = img.to_rgb8();
    let (cols, rows) = rgb.dimensions();
    if rows == 0 || cols == 0 {
        return Err(ImageError::Empty(label));
    }

    Ok(DecodedImage {
        rows,
        cols,
        points: flatten(&rgb),
    })
}

/// Write `points` as an RGB8 image; the format follows the file extension.
pub fn encode_file(path: &Path, rows: u32, cols: u32, points: &[Rgb]) -> Result<(), ImageError> {
    let img = unflatten(rows, cols, points)?;
    img.save(path).map_err(|source| ImageError::Encode {
        path: path.display().to_string(),
        source,
    })
}

/// Row-major pixels of an RGB buffer
pub fn flatten(img: &RgbImage) -> PointSet {
    img.pixels().map(|p| p.0).collect()
}

/// Rebuild a `cols x rows` RGB buffer from row-major points
pub fn unflatten(rows: u32, cols: u32, points: &[Rgb]) -> Result<RgbImage, ImageError> {
    let expected = rows as usize * cols as usize;
    if points.len() != expected {
        return Err(ImageError::ShapeMismatch {
            rows,
            cols,
            points: points.len(),
        });
    }

    let raw: Vec<u8> = points.iter().flat_map(|p| p.iter().copied()).collect();
    RgbImage::from_raw(cols, rows, raw).ok_or(ImageError::ShapeMismatch {
        rows,
        cols,
        points: points.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn checkerboard() -> PointSet {
        // 2 rows x 3 cols
        vec![
            [255, 0, 0],
            [0, 255, 0],
            [0, 0, 255],
            [10, 20, 30],
            [40, 50, 60],
            [70, 80, 90],
        ]
    }

    #[test]
    fn test_flatten_is_row_major() {
        let img = unflatten(2, 3, &checkerboard()).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(0, 1).0, [10, 20, 30]);
        assert_eq!(flatten(&img), checkerboard());
    }

    #[test]
    fn test_shape_mismatch() {
        let err = unflatten(2, 2, &checkerboard()).unwrap_err();
        assert!(matches!(err, ImageError::ShapeMismatch { rows: 2, cols: 2, points: 6 }));
    }

    #[test]
    fn test_png_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tiny.png");

        encode_file(&path, 2, 3, &checkerboard()).unwrap();
        let decoded = decode_file(&path).unwrap();

        assert_eq!(decoded.rows, 2);
        assert_eq!(decoded.cols, 3);
        assert_eq!(decoded.pixel_count(), 6);
        assert_eq!(decoded.points, checkerboard());
    }

    #[test]
    fn test_decode_garbage_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = decode_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to decode image"));
    }

    #[test]
    fn test_decode_bytes_matches_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tiny.png");
        encode_file(&path, 2, 3, &checkerboard()).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let decoded = decode_bytes(&bytes, "tiny.png").unwrap();
        assert_eq!((decoded.rows, decoded.cols), (2, 3));
        assert_eq!(decoded.points, checkerboard());
    }

    #[test]
    fn test_decode_error_names_cause_once() {
        let err = decode_bytes(b"definitely not a png", "upload.png").unwrap_err();
        let cause = std::error::Error::source(&err).unwrap().to_string();

        assert_eq!(err.to_string(), "Failed to decode image upload.png");
        let chain = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(chain.matches(cause.as_str()).count(), 1, "{}", chain);
    }
}
