use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::api::BatchReport;
use crate::core::patch::{BBox, TimeInterval};
use crate::error::Result;
use crate::types::ImageSize;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    Saved,
    /// Below the coverage threshold; nothing written.
    Skipped,
    /// Both outputs were already on disk.
    Existing,
    Failed,
}

/// One processed input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub sample_id: String,
    pub source: PathBuf,
    pub status: SampleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ManifestEntry {
    pub fn new(sample_id: impl Into<String>, source: &Path, status: SampleStatus) -> Self {
        Self {
            sample_id: sample_id.into(),
            source: source.to_path_buf(),
            status,
            bbox: None,
            coverage: None,
            input: None,
            target: None,
            error: None,
        }
    }
}

/// Sidecar describing how a dataset directory was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub created: DateTime<Utc>,
    pub remote_layer: String,
    pub time_interval: TimeInterval,
    pub min_coverage: f64,
    pub input_size: ImageSize,
    pub target_size: ImageSize,
    pub report: BatchReport,
    pub samples: Vec<ManifestEntry>,
}

/// Write `manifest.json` into `output_dir`, returning its path.
pub fn write_manifest(output_dir: &Path, manifest: &DatasetManifest) -> Result<PathBuf> {
    let path = output_dir.join(MANIFEST_FILE);
    let writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(writer, manifest)?;
    info!("Manifest written to {:?}", path);
    Ok(path)
}
