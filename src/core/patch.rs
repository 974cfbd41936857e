//! The patch: a georeferenced bundle of named raster layers covering one
//! footprint, plus the scalar metadata of the sample it belongs to.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::core::processing::save::SaveOutcome;
use crate::error::{Error, Result};

/// Layer tag of the local high-resolution chip.
pub const SPACENET_LAYER: &str = "spacenet";

const METERS_PER_DEGREE_LAT: f64 = 110_574.0;
const METERS_PER_DEGREE_LON_EQUATOR: f64 = 111_320.0;

/// Coordinate reference system identified by its EPSG code.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Crs(pub u32);

impl Crs {
    pub const WGS84: Crs = Crs(4326);

    pub fn epsg(&self) -> u32 {
        self.0
    }

    pub fn is_geographic(&self) -> bool {
        *self == Crs::WGS84
    }

    /// CRS identifier understood by the Sentinel Hub Process API.
    /// WGS84 is sent as CRS84 so that coordinates stay in lon/lat order.
    pub fn opengis_url(&self) -> String {
        if self.is_geographic() {
            "http://www.opengis.net/def/crs/OGC/1.3/CRS84".to_string()
        } else {
            format!("http://www.opengis.net/def/crs/EPSG/0/{}", self.0)
        }
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

/// Axis-aligned geographic footprint in `crs` units.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub crs: Crs,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64, crs: Crs) -> Result<Self> {
        let bbox = BBox {
            min_x,
            min_y,
            max_x,
            max_y,
            crs,
        };
        let finite = [min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite());
        if !finite || min_x >= max_x || min_y >= max_y {
            return Err(Error::InvalidArgument {
                arg: "bbox",
                value: format!("{bbox:?}"),
            });
        }
        Ok(bbox)
    }

    /// Extent of a `cols` x `rows` raster under a GDAL affine geotransform
    /// (`[origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height]`).
    pub fn from_geotransform(gt: [f64; 6], cols: usize, rows: usize, crs: Crs) -> Result<Self> {
        let corner = |px: f64, py: f64| (gt[0] + px * gt[1] + py * gt[2], gt[3] + px * gt[4] + py * gt[5]);
        let (w, h) = (cols as f64, rows as f64);
        let corners = [corner(0.0, 0.0), corner(w, 0.0), corner(0.0, h), corner(w, h)];

        let min_x = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
        let max_y = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max);
        BBox::new(min_x, min_y, max_x, max_y, crs)
    }

    /// Approximate ground extent `(width_m, height_m)`. Geographic boxes use an
    /// equirectangular approximation at the centre latitude.
    pub fn size_meters(&self) -> (f64, f64) {
        let dx = self.max_x - self.min_x;
        let dy = self.max_y - self.min_y;
        if self.crs.is_geographic() {
            let mid_lat = ((self.min_y + self.max_y) / 2.0).to_radians();
            (
                dx * METERS_PER_DEGREE_LON_EQUATOR * mid_lat.cos(),
                dy * METERS_PER_DEGREE_LAT,
            )
        } else {
            (dx, dy)
        }
    }
}

/// Inclusive acquisition window.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeInterval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidArgument {
                arg: "time_interval",
                value: format!("{start}..{end}"),
            });
        }
        Ok(Self { start, end })
    }

    /// RFC 3339 bounds covering whole days.
    pub fn to_api_range(&self) -> (String, String) {
        (
            format!("{}T00:00:00Z", self.start.format("%Y-%m-%d")),
            format!("{}T23:59:59Z", self.end.format("%Y-%m-%d")),
        )
    }
}

/// Declared pixel value range of a layer.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub const U8: ValueRange = ValueRange { min: 0.0, max: 255.0 };
    pub const U16: ValueRange = ValueRange {
        min: 0.0,
        max: 65535.0,
    };
    pub const I16: ValueRange = ValueRange {
        min: -32768.0,
        max: 32767.0,
    };
    pub const F32: ValueRange = ValueRange {
        min: f32::MIN,
        max: f32::MAX,
    };

    pub fn contains(&self, v: f32) -> bool {
        v >= self.min && v <= self.max
    }
}

/// One named raster, stored as `(rows, cols, bands)`.
#[derive(Debug, Clone)]
pub struct RasterLayer {
    name: String,
    data: Array3<f32>,
    range: ValueRange,
}

impl RasterLayer {
    pub fn new(name: impl Into<String>, data: Array3<f32>, range: ValueRange) -> Result<Self> {
        let name = name.into();
        if let Some(&bad) = data.iter().find(|v| !v.is_finite() || !range.contains(**v)) {
            return Err(Error::ValueOutOfRange {
                layer: name,
                value: bad,
                min: range.min,
                max: range.max,
            });
        }
        Ok(Self { name, data, range })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn range(&self) -> ValueRange {
        self.range
    }

    pub fn rows(&self) -> usize {
        self.data.dim().0
    }

    pub fn cols(&self) -> usize {
        self.data.dim().1
    }

    pub fn bands(&self) -> usize {
        self.data.dim().2
    }
}

#[derive(Debug, Clone)]
pub struct PatchMeta {
    pub source: PathBuf,
    pub sample_id: String,
    pub time_interval: TimeInterval,
    pub bbox: Option<BBox>,
}

impl PatchMeta {
    pub fn new(source: &Path, sample_id: impl Into<String>, time_interval: TimeInterval) -> Self {
        Self {
            source: source.to_path_buf(),
            sample_id: sample_id.into(),
            time_interval,
            bbox: None,
        }
    }
}

/// Per-sample container flowing through the workflow.
#[derive(Debug, Clone)]
pub struct Patch {
    pub meta: PatchMeta,
    layers: BTreeMap<String, RasterLayer>,
    pub outcome: Option<SaveOutcome>,
}

impl Patch {
    pub fn new(meta: PatchMeta) -> Self {
        Self {
            meta,
            layers: BTreeMap::new(),
            outcome: None,
        }
    }

    /// Insert a layer under its own name, replacing any previous one.
    pub fn insert_layer(&mut self, layer: RasterLayer) {
        self.layers.insert(layer.name().to_string(), layer);
    }

    pub fn layer(&self, name: &str) -> Result<&RasterLayer> {
        self.layers.get(name).ok_or_else(|| Error::MissingLayer {
            name: name.to_string(),
        })
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    pub fn footprint(&self) -> Result<BBox> {
        self.meta.bbox.ok_or(Error::MissingFootprint)
    }

    pub fn set_footprint(&mut self, bbox: BBox) {
        self.meta.bbox = Some(bbox);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn bbox_from_north_up_geotransform() {
        let gt = [-115.3, 0.0001, 0.0, 36.2, 0.0, -0.0001];
        let bbox = BBox::from_geotransform(gt, 650, 650, Crs::WGS84).unwrap();
        assert!((bbox.min_x + 115.3).abs() < 1e-9);
        assert!((bbox.max_x - (-115.3 + 0.065)).abs() < 1e-9);
        assert!((bbox.max_y - 36.2).abs() < 1e-9);
        assert!((bbox.min_y - (36.2 - 0.065)).abs() < 1e-9);
    }

    #[test]
    fn bbox_rejects_degenerate_extent() {
        assert!(BBox::new(1.0, 1.0, 1.0, 2.0, Crs::WGS84).is_err());
        assert!(BBox::new(0.0, f64::NAN, 1.0, 2.0, Crs::WGS84).is_err());
    }

    #[test]
    fn projected_bbox_size_is_in_crs_units() {
        let bbox = BBox::new(500_000.0, 4_000_000.0, 500_200.0, 4_000_100.0, Crs(32611)).unwrap();
        assert_eq!(bbox.size_meters(), (200.0, 100.0));
        assert!(bbox.crs.opengis_url().ends_with("/EPSG/0/32611"));
    }

    #[test]
    fn geographic_bbox_size_shrinks_with_latitude() {
        let equator = BBox::new(0.0, -0.01, 0.01, 0.0, Crs::WGS84).unwrap();
        let north = BBox::new(0.0, 60.0, 0.01, 60.01, Crs::WGS84).unwrap();
        assert!(north.size_meters().0 < equator.size_meters().0 * 0.51);
        assert!(Crs::WGS84.opengis_url().ends_with("CRS84"));
    }

    #[test]
    fn time_interval_must_be_ordered() {
        assert!(TimeInterval::new(date(2017, 2, 1), date(2017, 1, 1)).is_err());
        let ti = TimeInterval::new(date(2017, 1, 1), date(2017, 1, 1)).unwrap();
        let (from, to) = ti.to_api_range();
        assert_eq!(from, "2017-01-01T00:00:00Z");
        assert_eq!(to, "2017-01-01T23:59:59Z");
    }

    #[test]
    fn layer_rejects_values_outside_range() {
        let mut data = Array3::<f32>::zeros((2, 2, 1));
        data[[1, 1, 0]] = 300.0;
        let err = RasterLayer::new("spacenet", data, ValueRange::U8).unwrap_err();
        assert!(matches!(err, Error::ValueOutOfRange { value, .. } if value == 300.0));

        let mut data = Array3::<f32>::zeros((1, 1, 1));
        data[[0, 0, 0]] = f32::NAN;
        assert!(RasterLayer::new("x", data, ValueRange::F32).is_err());
    }

    #[test]
    fn patch_tracks_layers_and_footprint() {
        let ti = TimeInterval::new(date(2017, 1, 1), date(2017, 12, 31)).unwrap();
        let mut patch = Patch::new(PatchMeta::new(Path::new("a.tif"), "a", ti));
        assert!(matches!(patch.footprint(), Err(Error::MissingFootprint)));
        assert!(matches!(patch.layer(SPACENET_LAYER), Err(Error::MissingLayer { .. })));

        let layer = RasterLayer::new(SPACENET_LAYER, Array3::zeros((4, 5, 3)), ValueRange::U16).unwrap();
        patch.insert_layer(layer);
        let stored = patch.layer(SPACENET_LAYER).unwrap();
        assert_eq!((stored.rows(), stored.cols(), stored.bands()), (4, 5, 3));
        assert_eq!(patch.layer_names().collect::<Vec<_>>(), vec![SPACENET_LAYER]);
    }
}
