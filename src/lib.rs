#![doc = r#"
SRPAIR: paired superresolution training data from satellite imagery.

For every high-resolution SpaceNet chip (GeoTIFF) in a directory, SRPAIR fetches
a matching Sentinel-2 image for the same footprint and time window from the
Sentinel Hub Process API, drops chips with too little valid data, rescales both
images to fixed 8-bit sizes and writes them as `input/<id>.png` (low resolution)
and `target/<id>.png` (high resolution).

Requirements
------------
- GDAL development headers and runtime available on your system.
- Sentinel Hub OAuth client credentials for the remote imagery.

Quick start: build a dataset
----------------------------
```rust,no_run
use std::path::PathBuf;
use srpair::{prepare_dataset, DatasetParams, SentinelHubClient, SentinelHubConfig};

fn main() -> srpair::Result<()> {
    let params = DatasetParams {
        input_dir: PathBuf::from("/data/spacenet/AOI_2_Vegas/RGB-PanSharpen"),
        output_dir: PathBuf::from("/data/superres"),
        ..Default::default()
    };
    let client = SentinelHubClient::new(SentinelHubConfig {
        client_id: std::env::var("SH_CLIENT_ID").unwrap_or_default(),
        client_secret: std::env::var("SH_CLIENT_SECRET").unwrap_or_default(),
        ..Default::default()
    })?;

    let report = prepare_dataset(&params, client)?;
    println!(
        "processed={} skipped={} errors={}",
        report.processed, report.skipped, report.errors
    );
    Ok(())
}
```

Custom imagery sources
----------------------
Anything implementing [`ImageryProvider`] can stand in for Sentinel Hub, e.g. a
local archive or a test double; the workflow only needs a layer per request.

Useful modules
--------------
- [`api`]: workflow wiring and the batch driver.
- [`core`]: patch model, parameters, workflow tasks, processing primitives.
- [`io`]: GDAL reader, input discovery, Sentinel Hub client, PNG/manifest writers.
- [`error`]: crate-level `Error` and `Result`.
"#]

pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Types
pub use crate::core::params::DatasetParams;
pub use crate::core::patch::{BBox, Crs, Patch, PatchMeta, RasterLayer, SPACENET_LAYER, TimeInterval, ValueRange};
pub use crate::core::processing::save::{SaveOptions, SaveOutcome};
pub use crate::core::workflow::{PatchTask, Workflow};
pub use error::{Error, Result};
pub use types::{DataCollection, ImageSize, MosaickingOrder, NormalizeMode, ResizeFilter};

// Readers and remote imagery
pub use io::gdal::{GdalRasterReader, RasterError};
pub use io::sentinelhub::{
    ImageryProvider, ImageryRequest, SentinelHubClient, SentinelHubConfig, SentinelHubError,
};

// High-level API re-exports
pub use api::{BatchReport, build_workflow, prepare_dataset, prepare_sample, run_patch};
