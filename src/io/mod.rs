//! I/O layer: GDAL-backed chip reader, input discovery, the Sentinel Hub
//! client for the matching low-resolution imagery, and output `writers`.
pub mod gdal;
pub use self::gdal::{GdalRasterReader, RasterError, RasterMetadata};

pub mod discovery;
pub use self::discovery::{discover_inputs, sample_id};

pub mod sentinelhub;
pub use self::sentinelhub::{
    ImageryProvider, ImageryRequest, SentinelHubClient, SentinelHubConfig, SentinelHubError,
};

pub mod writers;
