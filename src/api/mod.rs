//! High-level, ergonomic library API: wire the three-step workflow, run it for a
//! single chip, or drive a whole directory of chips into an `input/` + `target/`
//! dataset. Prefer these entrypoints over the low-level `core` modules.
use std::path::Path;

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::params::DatasetParams;
use crate::core::patch::{Patch, PatchMeta};
use crate::core::processing::save::{SaveOptions, SaveOutcome};
use crate::core::workflow::{
    FetchRemoteTask, ImportSpacenetTask, RemoteLayerSpec, SavePairTask, Workflow,
};
use crate::error::{Error, Result};
use crate::io::discovery::{discover_inputs, sample_id};
use crate::io::sentinelhub::ImageryProvider;
use crate::io::writers::manifest::{DatasetManifest, ManifestEntry, SampleStatus, write_manifest};

/// Batch processing report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Pairs written
    pub processed: usize,
    /// Samples below the coverage threshold
    pub skipped: usize,
    /// Samples whose pair was already on disk
    pub existing: usize,
    pub errors: usize,
}

/// Output locations and scaling settings derived from `params`
pub fn save_options(params: &DatasetParams) -> SaveOptions {
    SaveOptions {
        input_dir: params.input_images_dir(),
        target_dir: params.target_images_dir(),
        remote_layer: params.layer.clone(),
        min_coverage: params.min_coverage,
        input_size: params.input_size,
        target_size: params.target_size,
        filter: params.resize_filter,
        normalize: params.normalize,
    }
}

/// Build the linear import -> fetch -> save workflow.
pub fn build_workflow<P: ImageryProvider + 'static>(params: &DatasetParams, provider: P) -> Workflow {
    Workflow::new()
        .then(ImportSpacenetTask {
            bands: params.spacenet_bands.clone(),
        })
        .then(FetchRemoteTask {
            provider,
            spec: RemoteLayerSpec {
                layer: params.layer.clone(),
                collection: params.collection,
                bands: params.remote_bands.clone(),
                resolution: params.remote_resolution,
                max_cloud_coverage: params.max_cloud_coverage,
                mosaicking: params.mosaicking,
            },
        })
        .then(SavePairTask {
            options: save_options(params),
        })
}

/// Run the workflow for one chip and return the finished patch.
pub fn run_patch(input: &Path, workflow: &Workflow, params: &DatasetParams) -> Result<Patch> {
    let id = sample_id(input, &params.id_prefix);
    let patch = Patch::new(PatchMeta::new(input, id, params.time_interval));
    workflow.execute(patch)
}

/// Run the workflow for one chip and report what was saved.
pub fn prepare_sample(input: &Path, workflow: &Workflow, params: &DatasetParams) -> Result<SaveOutcome> {
    run_patch(input, workflow, params)?
        .outcome
        .ok_or_else(|| Error::Processing("workflow finished without a save step".into()))
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>4}/{len:4} {msg}")
            .map_err(Error::external)?
            .progress_chars("##-"),
    );
    Ok(pb)
}

/// Process every chip matching `params.pattern` in `params.input_dir`, one at a
/// time. The first error is returned unless `params.continue_on_error` is set.
pub fn prepare_dataset<P: ImageryProvider + 'static>(
    params: &DatasetParams,
    provider: P,
) -> Result<BatchReport> {
    params.validate()?;

    let mut inputs = discover_inputs(&params.input_dir, &params.pattern)?;
    if let Some(limit) = params.limit {
        inputs.truncate(limit);
    }
    info!(
        "Found {} chips in {:?} matching {:?}",
        inputs.len(),
        params.input_dir,
        params.pattern
    );

    let options = save_options(params);
    std::fs::create_dir_all(&options.input_dir)?;
    std::fs::create_dir_all(&options.target_dir)?;

    let workflow = build_workflow(params, provider);
    let pb = progress_bar(inputs.len())?;
    let mut report = BatchReport::default();
    let mut entries = Vec::with_capacity(inputs.len());

    for path in &inputs {
        let id = sample_id(path, &params.id_prefix);
        pb.set_message(id.clone());

        if params.skip_existing
            && options.input_path(&id).exists()
            && options.target_path(&id).exists()
        {
            info!("Pair for {} already present, skipping", id);
            report.existing += 1;
            entries.push(ManifestEntry::new(&id, path, SampleStatus::Existing));
            pb.inc(1);
            continue;
        }

        match run_patch(path, &workflow, params) {
            Ok(patch) => {
                let Some(outcome) = patch.outcome else {
                    pb.abandon();
                    return Err(Error::Processing(
                        "workflow finished without a save step".into(),
                    ));
                };
                let mut entry = ManifestEntry::new(&id, path, SampleStatus::Saved);
                entry.bbox = patch.meta.bbox;
                entry.coverage = Some(outcome.coverage());
                match outcome {
                    SaveOutcome::Saved { input, target, .. } => {
                        report.processed += 1;
                        entry.input = Some(input);
                        entry.target = Some(target);
                    }
                    SaveOutcome::Skipped { .. } => {
                        report.skipped += 1;
                        entry.status = SampleStatus::Skipped;
                    }
                }
                entries.push(entry);
            }
            Err(e) => {
                report.errors += 1;
                if !params.continue_on_error {
                    pb.abandon();
                    return Err(e);
                }
                warn!("Error processing {:?}: {}", path, e);
                let mut entry = ManifestEntry::new(&id, path, SampleStatus::Failed);
                entry.error = Some(e.to_string());
                entries.push(entry);
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    info!(
        "Batch complete: processed={} skipped={} existing={} errors={}",
        report.processed, report.skipped, report.existing, report.errors
    );

    if params.write_manifest {
        let manifest = DatasetManifest {
            created: Utc::now(),
            remote_layer: params.layer.clone(),
            time_interval: params.time_interval,
            min_coverage: params.min_coverage,
            input_size: params.input_size,
            target_size: params.target_size,
            report,
            samples: entries,
        };
        write_manifest(&params.output_dir, &manifest)?;
    }

    Ok(report)
}
