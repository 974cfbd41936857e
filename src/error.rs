//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, GDAL, Sentinel Hub and encoder errors, and provides
//! semantic variants for argument validation and patch processing failures.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Raster reader error: {0}")]
    Raster(#[from] crate::io::RasterError),

    #[error("Sentinel Hub error: {0}")]
    SentinelHub(#[from] crate::io::SentinelHubError),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Patch has no layer named `{name}`")]
    MissingLayer { name: String },

    #[error("Patch footprint is not set; import the high-resolution raster first")]
    MissingFootprint,

    #[error("Layer `{layer}` value {value} lies outside its declared range [{min}, {max}]")]
    ValueOutOfRange {
        layer: String,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("Unsupported band count for an 8-bit image: {bands} (expected 1, 3 or 4)")]
    UnsupportedBandCount { bands: usize },

    #[error("Task `{task}` failed: {source}")]
    Task {
        task: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("External error: {0}")]
    External(String),
}

impl Error {
    pub fn external<E: std::fmt::Display>(e: E) -> Self {
        Error::External(e.to_string())
    }
}
