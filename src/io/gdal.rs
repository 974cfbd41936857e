use gdal::raster::GdalDataType;
use gdal::{Dataset, errors::GdalError as GdalCrateError};
use ndarray::{Array2, Array3, Axis, stack};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::patch::{BBox, Crs, RasterLayer, ValueRange};

/// Errors encountered when reading rasters through GDAL
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalCrateError),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Band index {index} out of range (dataset has {bands} bands)")]
    BandOutOfRange { index: usize, bands: usize },
    #[error("Dimension mismatch: expected {0}x{1}, got {2} samples")]
    DimensionMismatch(usize, usize, usize),
    #[error("Dataset has no usable EPSG projection: {0:?}")]
    MissingProjection(String),
    #[error("Invalid raster: {0}")]
    Invalid(String),
}

/// Metadata extracted from a GDAL-supported dataset
#[derive(Debug, Clone)]
pub struct RasterMetadata {
    /// Width (pixels) of the raster
    pub size_x: usize,
    /// Height (lines) of the raster
    pub size_y: usize,
    /// Number of raster bands
    pub bands: usize,
    /// Affine geotransform coefficients ([origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height])
    pub geotransform: [f64; 6],
    /// EPSG code of the dataset projection, when one could be resolved
    pub epsg: Option<u32>,
    /// Projection as reported by GDAL (WKT)
    pub projection: String,
}

/// Reader for georeferenced chips (GeoTIFF and anything else GDAL opens)
pub struct GdalRasterReader {
    pub dataset: Dataset,
    pub metadata: RasterMetadata,
}

// Extract the EPSG code from a WKT1 `AUTHORITY["EPSG","4326"]` or WKT2 `ID["EPSG",4326]` tag.
// The last occurrence belongs to the outermost CRS.
fn parse_epsg(wkt: &str) -> Option<u32> {
    if let Some(code) = wkt.trim().strip_prefix("EPSG:") {
        return code.trim().parse().ok();
    }
    let idx = ["AUTHORITY[\"EPSG\",", "ID[\"EPSG\","]
        .iter()
        .filter_map(|key| wkt.rfind(key).map(|i| i + key.len()))
        .max()?;
    let digits: String = wkt[idx..]
        .chars()
        .skip_while(|c| *c == '"' || c.is_whitespace())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn value_range_for(data_type: GdalDataType) -> ValueRange {
    match data_type {
        GdalDataType::UInt8 => ValueRange::U8,
        GdalDataType::UInt16 => ValueRange::U16,
        GdalDataType::Int16 => ValueRange::I16,
        _ => ValueRange::F32,
    }
}

impl GdalRasterReader {
    /// Open a GDAL-supported dataset (e.g., GeoTIFF)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RasterError> {
        let dataset = Dataset::open(path.as_ref())?;
        let (size_x, size_y) = dataset.raster_size();
        let bands = dataset.raster_count() as usize;
        if bands == 0 {
            return Err(RasterError::UnsupportedFormat("No raster bands found".into()));
        }
        let geotransform = dataset.geo_transform().map_err(|_| {
            RasterError::Invalid(format!("{:?} has no geotransform", path.as_ref()))
        })?;
        let projection = dataset.projection();
        let epsg = dataset
            .spatial_ref()
            .ok()
            .and_then(|srs| srs.auth_code().ok())
            .and_then(|code| u32::try_from(code).ok())
            .or_else(|| parse_epsg(&projection));
        debug!(
            "Opened {:?}: {}x{} px, {} bands, epsg={:?}",
            path.as_ref(),
            size_x,
            size_y,
            bands,
            epsg
        );
        Ok(GdalRasterReader {
            dataset,
            metadata: RasterMetadata {
                size_x: size_x as usize,
                size_y: size_y as usize,
                bands,
                geotransform,
                epsg,
                projection,
            },
        })
    }

    /// Read a single band (1-based index) as an f32 ndarray of shape (height, width)
    pub fn read_band(&self, index: usize) -> Result<Array2<f32>, RasterError> {
        if index == 0 || index > self.metadata.bands {
            return Err(RasterError::BandOutOfRange {
                index,
                bands: self.metadata.bands,
            });
        }
        let band = self.dataset.rasterband(index)?;
        let window = (self.metadata.size_x, self.metadata.size_y);
        let buf = band.read_as::<f32>((0, 0), window, window, None)?;
        let data_vec = buf.data().to_vec();
        let len = data_vec.len();
        Array2::from_shape_vec((self.metadata.size_y, self.metadata.size_x), data_vec).map_err(
            |_| RasterError::DimensionMismatch(self.metadata.size_x, self.metadata.size_y, len),
        )
    }

    /// Stack the requested 1-based bands into a `(rows, cols, bands)` layer.
    /// The declared value range follows the sample type of the first band.
    pub fn read_layer(&self, name: &str, bands: &[usize]) -> crate::Result<RasterLayer> {
        let first = *bands
            .first()
            .ok_or_else(|| RasterError::Invalid("no bands requested".into()))?;
        if first == 0 || first > self.metadata.bands {
            return Err(RasterError::BandOutOfRange {
                index: first,
                bands: self.metadata.bands,
            }
            .into());
        }
        let range = value_range_for(
            self.dataset
                .rasterband(first)
                .map_err(RasterError::from)?
                .band_type(),
        );

        info!("Reading bands {:?} as layer `{}`", bands, name);
        let planes = bands
            .iter()
            .map(|&b| self.read_band(b))
            .collect::<Result<Vec<_>, _>>()?;
        let views: Vec<_> = planes.iter().map(|p| p.view()).collect();
        let data: Array3<f32> = stack(Axis(2), &views).map_err(|e| RasterError::Invalid(e.to_string()))?;
        RasterLayer::new(name, data, range)
    }

    /// Footprint of the dataset in its own CRS.
    pub fn footprint(&self) -> Result<BBox, RasterError> {
        let epsg = self
            .metadata
            .epsg
            .ok_or_else(|| RasterError::MissingProjection(self.metadata.projection.clone()))?;
        BBox::from_geotransform(
            self.metadata.geotransform,
            self.metadata.size_x,
            self.metadata.size_y,
            Crs(epsg),
        )
        .map_err(|e| RasterError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsg_from_wkt1_authority() {
        let wkt = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],AUTHORITY["EPSG","4326"]]"#;
        assert_eq!(parse_epsg(wkt), Some(4326));
    }

    #[test]
    fn epsg_from_wkt2_id_and_shorthand() {
        let wkt = r#"PROJCRS["WGS 84 / UTM zone 11N",BASEGEOGCRS["WGS 84",ID["EPSG",4326]],ID["EPSG",32611]]"#;
        assert_eq!(parse_epsg(wkt), Some(32611));
        assert_eq!(parse_epsg("EPSG:3857"), Some(3857));
        assert_eq!(parse_epsg("LOCAL_CS[\"unknown\"]"), None);
    }

    #[test]
    fn value_range_follows_sample_type() {
        assert_eq!(value_range_for(GdalDataType::UInt8), ValueRange::U8);
        assert_eq!(value_range_for(GdalDataType::UInt16), ValueRange::U16);
        assert_eq!(value_range_for(GdalDataType::Float32), ValueRange::F32);
    }
}
