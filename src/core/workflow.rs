//! Linear per-sample workflow: import the chip, fetch the matching remote
//! image, save the pair. Tasks run in order; the first failure stops the patch.
use tracing::{debug, info};

use crate::core::patch::{Patch, SPACENET_LAYER};
use crate::core::processing::save::{SaveOptions, save_patch_pair};
use crate::error::{Error, Result};
use crate::io::gdal::GdalRasterReader;
use crate::io::sentinelhub::{ImageryProvider, ImageryRequest};
use crate::types::{DataCollection, MosaickingOrder};

/// One step of the workflow.
pub trait PatchTask {
    fn name(&self) -> &str;
    fn execute(&self, patch: Patch) -> Result<Patch>;
}

/// Ordered list of tasks applied to one patch.
#[derive(Default)]
pub struct Workflow {
    tasks: Vec<Box<dyn PatchTask>>,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, task: impl PatchTask + 'static) -> Self {
        self.tasks.push(Box::new(task));
        self
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }

    pub fn execute(&self, mut patch: Patch) -> Result<Patch> {
        for task in &self.tasks {
            debug!("{}: running {}", patch.meta.sample_id, task.name());
            patch = task.execute(patch).map_err(|e| Error::Task {
                task: task.name().to_string(),
                source: Box::new(e),
            })?;
        }
        Ok(patch)
    }
}

/// Reads the high-resolution chip into the `spacenet` layer and sets the footprint.
pub struct ImportSpacenetTask {
    pub bands: Vec<usize>,
}

impl PatchTask for ImportSpacenetTask {
    fn name(&self) -> &str {
        "import_spacenet"
    }

    fn execute(&self, mut patch: Patch) -> Result<Patch> {
        info!("Importing {:?}", patch.meta.source);
        let reader = GdalRasterReader::open(&patch.meta.source)?;
        let layer = reader.read_layer(SPACENET_LAYER, &self.bands)?;
        patch.set_footprint(reader.footprint()?);
        patch.insert_layer(layer);
        Ok(patch)
    }
}

/// Remote request settings shared by every patch.
#[derive(Debug, Clone)]
pub struct RemoteLayerSpec {
    pub layer: String,
    pub collection: DataCollection,
    pub bands: Vec<String>,
    pub resolution: f64,
    pub max_cloud_coverage: f64,
    pub mosaicking: MosaickingOrder,
}

/// Fetches the low-resolution image for the patch footprint and time window.
pub struct FetchRemoteTask<P: ImageryProvider> {
    pub provider: P,
    pub spec: RemoteLayerSpec,
}

impl<P: ImageryProvider> FetchRemoteTask<P> {
    pub fn request_for(&self, patch: &Patch) -> Result<ImageryRequest> {
        let bbox = patch.footprint()?;
        let (width, height) = ImageryRequest::output_size(&bbox, self.spec.resolution)?;
        Ok(ImageryRequest {
            layer: self.spec.layer.clone(),
            collection: self.spec.collection,
            bands: self.spec.bands.clone(),
            bbox,
            time_interval: patch.meta.time_interval,
            max_cloud_coverage: self.spec.max_cloud_coverage,
            mosaicking: self.spec.mosaicking,
            width,
            height,
        })
    }
}

impl<P: ImageryProvider> PatchTask for FetchRemoteTask<P> {
    fn name(&self) -> &str {
        "fetch_remote"
    }

    fn execute(&self, mut patch: Patch) -> Result<Patch> {
        let request = self.request_for(&patch)?;
        let layer = self.provider.fetch(&request)?;
        if layer.name() != self.spec.layer {
            return Err(Error::Processing(format!(
                "provider returned layer `{}`, expected `{}`",
                layer.name(),
                self.spec.layer
            )));
        }
        patch.insert_layer(layer);
        Ok(patch)
    }
}

/// Applies the coverage filter and writes the PNG pair.
pub struct SavePairTask {
    pub options: SaveOptions,
}

impl PatchTask for SavePairTask {
    fn name(&self) -> &str {
        "save_pair"
    }

    fn execute(&self, mut patch: Patch) -> Result<Patch> {
        let outcome = save_patch_pair(&patch, &self.options)?;
        patch.outcome = Some(outcome);
        Ok(patch)
    }
}
