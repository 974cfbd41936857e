use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::patch::TimeInterval;
use crate::error::{Error, Result};
use crate::types::{DataCollection, ImageSize, MosaickingOrder, NormalizeMode, ResizeFilter};

/// Dataset preparation parameters suitable for JSON config files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetParams {
    /// Directory holding the high-resolution chips
    pub input_dir: PathBuf,
    /// Glob pattern for chips inside `input_dir`
    pub pattern: String,
    /// Root of the `input/` and `target/` directories
    pub output_dir: PathBuf,
    /// Filename prefix stripped to form the sample id
    pub id_prefix: String,
    /// 1-based band indexes read from each chip
    pub spacenet_bands: Vec<usize>,
    pub time_interval: TimeInterval,
    /// Maximum scene cloud cover as a fraction in 0..=1
    pub max_cloud_coverage: f64,
    pub collection: DataCollection,
    /// Name the remote layer is tagged with
    pub layer: String,
    pub remote_bands: Vec<String>,
    /// Ground resolution of the remote request in metres per pixel
    pub remote_resolution: f64,
    pub mosaicking: MosaickingOrder,
    /// Minimum composite non-zero ratio of the chip
    pub min_coverage: f64,
    /// Size of the low-resolution `input` image
    pub input_size: ImageSize,
    /// Size of the high-resolution `target` image
    pub target_size: ImageSize,
    pub resize_filter: ResizeFilter,
    pub normalize: NormalizeMode,
    /// Process at most this many chips
    pub limit: Option<usize>,
    pub skip_existing: bool,
    pub continue_on_error: bool,
    pub write_manifest: bool,
}

impl Default for DatasetParams {
    fn default() -> Self {
        let start = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap_or_default();
        let end = NaiveDate::from_ymd_opt(2017, 12, 31).unwrap_or_default();
        Self {
            input_dir: PathBuf::from("data/spacenet"),
            pattern: "*.tif".to_string(),
            output_dir: PathBuf::from("data/superres"),
            id_prefix: "RGB-PanSharpen_".to_string(),
            spacenet_bands: vec![1, 2, 3],
            time_interval: TimeInterval { start, end },
            max_cloud_coverage: 0.2,
            collection: DataCollection::Sentinel2L1c,
            layer: "TRUE-COLOR-S2-L1C".to_string(),
            remote_bands: vec!["B04".into(), "B03".into(), "B02".into()],
            remote_resolution: 10.0,
            mosaicking: MosaickingOrder::LeastCc,
            min_coverage: 0.9,
            input_size: ImageSize::square(64),
            target_size: ImageSize::square(256),
            resize_filter: ResizeFilter::Lanczos3,
            normalize: NormalizeMode::Global,
            limit: None,
            skip_existing: false,
            continue_on_error: false,
            write_manifest: true,
        }
    }
}

fn fraction(arg: &'static str, v: f64) -> Result<()> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(Error::InvalidArgument {
            arg,
            value: v.to_string(),
        })
    }
}

impl DatasetParams {
    /// Load parameters from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let params: DatasetParams = serde_json::from_str(&text)?;
        Ok(params)
    }

    pub fn input_images_dir(&self) -> PathBuf {
        self.output_dir.join("input")
    }

    pub fn target_images_dir(&self) -> PathBuf {
        self.output_dir.join("target")
    }

    pub fn validate(&self) -> Result<()> {
        fraction("min_coverage", self.min_coverage)?;
        fraction("max_cloud_coverage", self.max_cloud_coverage)?;
        TimeInterval::new(self.time_interval.start, self.time_interval.end)?;
        if self.remote_resolution <= 0.0 || !self.remote_resolution.is_finite() {
            return Err(Error::InvalidArgument {
                arg: "remote_resolution",
                value: self.remote_resolution.to_string(),
            });
        }
        for (arg, size) in [("input_size", self.input_size), ("target_size", self.target_size)] {
            if size.is_empty() {
                return Err(Error::InvalidArgument {
                    arg,
                    value: size.to_string(),
                });
            }
        }
        if self.spacenet_bands.is_empty() || self.spacenet_bands.contains(&0) {
            return Err(Error::InvalidArgument {
                arg: "spacenet_bands",
                value: format!("{:?}", self.spacenet_bands),
            });
        }
        if self.remote_bands.is_empty() || self.remote_bands.iter().any(|b| b.trim().is_empty()) {
            return Err(Error::InvalidArgument {
                arg: "remote_bands",
                value: format!("{:?}", self.remote_bands),
            });
        }
        // both images are written as gray, RGB or RGBA PNGs
        for bands in [self.spacenet_bands.len(), self.remote_bands.len()] {
            if !matches!(bands, 1 | 3 | 4) {
                return Err(Error::UnsupportedBandCount { bands });
            }
        }
        if self.layer.trim().is_empty() || self.layer == crate::core::patch::SPACENET_LAYER {
            return Err(Error::InvalidArgument {
                arg: "layer",
                value: self.layer.clone(),
            });
        }
        if self.pattern.trim().is_empty() {
            return Err(Error::InvalidArgument {
                arg: "pattern",
                value: self.pattern.clone(),
            });
        }
        Ok(())
    }
}
