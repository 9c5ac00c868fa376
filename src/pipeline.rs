use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::db::{CompressionRecord, RunStore};
use crate::image_io::{decode_bytes, encode_file};
use crate::quantizer::{reconstruct, ColorQuantizer, FitResult, Rgb, Termination};
use crate::upload::{UploadError, UploadValidator};

/// One uploaded image waiting to be compressed
#[derive(Debug, Clone)]
pub struct CompressionRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub k: usize,
}

/// Clustering statistics shown next to a result
#[derive(Debug, Clone, Serialize)]
pub struct FitSummary {
    pub iterations: usize,
    pub termination: Termination,
    pub inertia: f64,
    /// `RRGGBB` per centroid, in cluster index order
    pub palette: Vec<String>,
    pub cluster_sizes: Vec<usize>,
}

impl From<&FitResult> for FitSummary {
    fn from(fit: &FitResult) -> Self {
        Self {
            iterations: fit.iterations,
            termination: fit.termination,
            inertia: fit.inertia,
            palette: fit
                .centroids
                .palette()
                .iter()
                .map(|c| format!("{:02X}{:02X}{:02X}", c[0], c[1], c[2]))
                .collect(),
            cluster_sizes: fit.cluster_sizes(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompressionOutcome {
    pub record: CompressionRecord,
    pub rows: u32,
    pub cols: u32,
    pub fit: FitSummary,
}

/// The store-free part of a request. Holds only read-only settings, so one
/// instance can serve many requests at once.
#[derive(Debug, Clone)]
pub struct Compressor {
    upload_dir: PathBuf,
    validator: UploadValidator,
    quantizer: ColorQuantizer,
}

impl Compressor {
    pub fn new(config: &Config) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            validator: UploadValidator::new(),
            quantizer: ColorQuantizer::new(config.fit_options()),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Validate, quantize and re-encode one upload. Nothing is written to
    /// the upload directory unless decoding and clustering succeed.
    pub fn compress(&self, file_name: &str, bytes: &[u8], k: usize) -> Result<CompressionOutcome> {
        let upload = self.validator.validate(file_name, bytes)?;
        let original_name = upload.file_name();

        let image = decode_bytes(bytes, file_name)?;
        info!(
            file = %original_name,
            rows = image.rows,
            cols = image.cols,
            k,
            "Compressing image"
        );

        let fit = self.quantizer.fit(&image.points, k)?;
        let compressed = reconstruct(&fit.centroids, &fit.labels)?;

        fs::create_dir_all(&self.upload_dir).context(format!(
            "Failed to create upload directory {}",
            self.upload_dir.display()
        ))?;

        let compressed_name = upload.compressed_file_name(k);
        let original_path = self.upload_dir.join(&original_name);
        let compressed_path = self.upload_dir.join(&compressed_name);

        let compressed_bytes = match write_outputs(
            &original_path,
            bytes,
            &compressed_path,
            image.rows,
            image.cols,
            &compressed,
        ) {
            Ok(size) => size,
            Err(e) => {
                remove_quietly(&original_path);
                remove_quietly(&compressed_path);
                return Err(e);
            }
        };

        let record = CompressionRecord::new(
            original_name,
            compressed_name,
            bytes.len() as u64,
            compressed_bytes,
            k,
        );

        info!(
            original_kb = record.original_size_kb,
            compressed_kb = record.compressed_size_kb,
            reduced_by = record.reduced_by,
            iterations = fit.iterations,
            "Compression finished"
        );

        Ok(CompressionOutcome {
            record,
            rows: image.rows,
            cols: image.cols,
            fit: FitSummary::from(&fit),
        })
    }

    /// Storage name an accepted upload would be written under
    fn storage_name(&self, req: &CompressionRequest) -> Option<String> {
        self.validator
            .validate(&req.file_name, &req.bytes)
            .ok()
            .map(|upload| upload.file_name())
    }
}

/// Save the upload and its compressed version; returns the compressed size
fn write_outputs(
    original_path: &Path,
    bytes: &[u8],
    compressed_path: &Path,
    rows: u32,
    cols: u32,
    compressed: &[Rgb],
) -> Result<u64> {
    fs::write(original_path, bytes)
        .context(format!("Failed to save upload {}", original_path.display()))?;
    encode_file(compressed_path, rows, cols, compressed)?;
    file_size(compressed_path)
}

fn file_size(path: &Path) -> Result<u64> {
    Ok(fs::metadata(path)
        .context(format!("Failed to stat {}", path.display()))?
        .len())
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove partial output");
        }
    }
}

/// Every allowed image under `dir`, named by its path relative to `dir` so
/// files sharing a basename in different subdirectories stay distinct.
pub fn requests_from_dir(
    dir: &Path,
    k: usize,
    validator: &UploadValidator,
) -> Result<Vec<CompressionRequest>> {
    let mut requests = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.context(format!("Failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let file_name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if !validator.is_allowed(&file_name) {
            continue;
        }

        let bytes = fs::read(entry.path())
            .context(format!("Failed to read {}", entry.path().display()))?;
        requests.push(CompressionRequest { file_name, bytes, k });
    }

    Ok(requests)
}

/// Compression requests plus run persistence through an injected store
pub struct Pipeline<S: RunStore> {
    compressor: Compressor,
    store: S,
}

impl<S: RunStore> Pipeline<S> {
    pub fn new(config: &Config, store: S) -> Self {
        Self {
            compressor: Compressor::new(config),
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn compressor(&self) -> &Compressor {
        &self.compressor
    }

    /// Compress one upload and record the run
    pub fn compress(&self, file_name: &str, bytes: &[u8], k: usize) -> Result<CompressionOutcome> {
        let outcome = self.compressor.compress(file_name, bytes, k)?;
        self.store
            .insert_run(&outcome.record)
            .context("Failed to record compression run")?;
        Ok(outcome)
    }

    /// Compress independent uploads in parallel, one task per request.
    /// A request whose storage name was already claimed by an earlier request
    /// in the same batch is rejected, so no two tasks share a file.
    /// Runs are recorded afterwards in request order; results keep that order.
    pub fn compress_many(&self, requests: &[CompressionRequest]) -> Vec<Result<CompressionOutcome>> {
        let compressor = &self.compressor;

        let mut claimed = HashSet::new();
        let duplicates: Vec<Option<String>> = requests
            .iter()
            .map(|req| {
                compressor
                    .storage_name(req)
                    .filter(|name| !claimed.insert(name.clone()))
            })
            .collect();

        let results: Vec<Result<CompressionOutcome>> = requests
            .par_iter()
            .zip(duplicates.par_iter())
            .map(|(req, duplicate)| match duplicate {
                Some(name) => Err(UploadError::DuplicateName(name.clone()).into()),
                None => compressor.compress(&req.file_name, &req.bytes, req.k),
            })
            .collect();

        results
            .into_iter()
            .zip(requests.iter())
            .map(|(result, req)| -> Result<CompressionOutcome> {
                let outcome = result.map_err(|e| {
                    warn!(file = %req.file_name, error = %e, "Compression failed");
                    e
                })?;
                self.store
                    .insert_run(&outcome.record)
                    .context("Failed to record compression run")?;
                Ok(outcome)
            })
            .collect()
    }
}
