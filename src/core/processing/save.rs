use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::patch::{Patch, RasterLayer, SPACENET_LAYER};
use crate::core::processing::coverage::{coverage_ratio, is_sufficient};
use crate::core::processing::normalize::normalize_to_u8;
use crate::core::processing::resize::resize_u8_image;
use crate::error::Result;
use crate::io::writers::png::write_png;
use crate::types::{ImageSize, NormalizeMode, ResizeFilter};

/// Where and how a pair is written.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    pub input_dir: PathBuf,
    pub target_dir: PathBuf,
    /// Name of the low-resolution layer in the patch
    pub remote_layer: String,
    pub min_coverage: f64,
    pub input_size: ImageSize,
    pub target_size: ImageSize,
    pub filter: ResizeFilter,
    pub normalize: NormalizeMode,
}

impl SaveOptions {
    pub fn input_path(&self, sample_id: &str) -> PathBuf {
        self.input_dir.join(format!("{sample_id}.png"))
    }

    pub fn target_path(&self, sample_id: &str) -> PathBuf {
        self.target_dir.join(format!("{sample_id}.png"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved {
        input: PathBuf,
        target: PathBuf,
        coverage: f64,
    },
    Skipped {
        coverage: f64,
    },
}

impl SaveOutcome {
    pub fn coverage(&self) -> f64 {
        match self {
            SaveOutcome::Saved { coverage, .. } | SaveOutcome::Skipped { coverage } => *coverage,
        }
    }
}

/// Normalise a layer to 8 bits, resize it to `size` and write it as PNG.
pub fn save_layer_png(
    layer: &RasterLayer,
    output: &Path,
    size: ImageSize,
    filter: ResizeFilter,
    normalize: NormalizeMode,
) -> Result<()> {
    let scaled = normalize_to_u8(layer.data(), normalize);
    let resized = resize_u8_image(
        &scaled,
        layer.cols(),
        layer.rows(),
        layer.bands(),
        size,
        filter,
    )?;
    write_png(output, size.width, size.height, layer.bands(), &resized)
}

/// Coverage-check the chip, then write the `target` (chip) and `input`
/// (remote) images. Nothing is written for a skipped sample.
pub fn save_patch_pair(patch: &Patch, options: &SaveOptions) -> Result<SaveOutcome> {
    let target_layer = patch.layer(SPACENET_LAYER)?;
    let input_layer = patch.layer(&options.remote_layer)?;
    let id = &patch.meta.sample_id;

    let coverage = coverage_ratio(target_layer.data());
    if !is_sufficient(coverage, options.min_coverage) {
        warn!(
            "Skipping {}: coverage {:.3} below {:.3}",
            id, coverage, options.min_coverage
        );
        return Ok(SaveOutcome::Skipped { coverage });
    }

    let target = options.target_path(id);
    let input = options.input_path(id);

    save_layer_png(
        target_layer,
        &target,
        options.target_size,
        options.filter,
        options.normalize,
    )?;
    if let Err(e) = save_layer_png(
        input_layer,
        &input,
        options.input_size,
        options.filter,
        options.normalize,
    ) {
        // keep the pair complete: no target without its input
        let _ = std::fs::remove_file(&target);
        return Err(e);
    }

    info!("Saved pair {} (coverage {:.3})", id, coverage);
    Ok(SaveOutcome::Saved {
        input,
        target,
        coverage,
    })
}
