//! Shared types and enums used across SRPAIR.
//! Includes `ImageSize`, `ResizeFilter`, `NormalizeMode`, `DataCollection`
//! and `MosaickingOrder`.
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Fixed output dimensions of a written image.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: usize,
    pub height: usize,
}

impl ImageSize {
    pub const fn square(side: usize) -> Self {
        Self {
            width: side,
            height: side,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ImageSize {
    type Err = String;

    /// Accepts `WIDTHxHEIGHT` or a single number for a square image.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |v: &str| {
            v.trim()
                .parse::<usize>()
                .map_err(|_| format!("invalid image size: {s}"))
        };
        let size = match s.to_ascii_lowercase().split_once('x') {
            Some((w, h)) => ImageSize {
                width: parse(w)?,
                height: parse(h)?,
            },
            None => ImageSize::square(parse(s)?),
        };
        if size.is_empty() {
            return Err(format!("image size must be positive, got: {s}"));
        }
        Ok(size)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeFilter {
    Nearest,
    Bilinear,
    CatmullRom,
    Lanczos3,
}

impl std::fmt::Display for ResizeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResizeFilter::Nearest => write!(f, "Nearest"),
            ResizeFilter::Bilinear => write!(f, "Bilinear"),
            ResizeFilter::CatmullRom => write!(f, "CatmullRom"),
            ResizeFilter::Lanczos3 => write!(f, "Lanczos3"),
        }
    }
}

/// How pixel values are stretched to 8 bits.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NormalizeMode {
    /// One min/max over all bands; keeps the colour balance.
    Global,
    /// Each band stretched on its own.
    PerBand,
}

impl std::fmt::Display for NormalizeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizeMode::Global => write!(f, "Global"),
            NormalizeMode::PerBand => write!(f, "PerBand"),
        }
    }
}

/// Sentinel Hub data collection the low-resolution image is taken from.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
pub enum DataCollection {
    #[value(name = "sentinel-2-l1c")]
    #[serde(rename = "sentinel-2-l1c")]
    Sentinel2L1c,
    #[value(name = "sentinel-2-l2a")]
    #[serde(rename = "sentinel-2-l2a")]
    Sentinel2L2a,
}

impl DataCollection {
    /// Identifier used by the Process API.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            DataCollection::Sentinel2L1c => "sentinel-2-l1c",
            DataCollection::Sentinel2L2a => "sentinel-2-l2a",
        }
    }
}

impl std::fmt::Display for DataCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_api_str())
    }
}

/// Which scene wins when several acquisitions cover the footprint.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
pub enum MosaickingOrder {
    #[value(name = "least-cc")]
    #[serde(rename = "leastCC")]
    LeastCc,
    #[value(name = "most-recent")]
    #[serde(rename = "mostRecent")]
    MostRecent,
    #[value(name = "least-recent")]
    #[serde(rename = "leastRecent")]
    LeastRecent,
}

impl MosaickingOrder {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            MosaickingOrder::LeastCc => "leastCC",
            MosaickingOrder::MostRecent => "mostRecent",
            MosaickingOrder::LeastRecent => "leastRecent",
        }
    }
}

impl std::fmt::Display for MosaickingOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_api_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_size_parses_pairs_and_squares() {
        assert_eq!(
            "320x240".parse::<ImageSize>().unwrap(),
            ImageSize {
                width: 320,
                height: 240
            }
        );
        assert_eq!("64".parse::<ImageSize>().unwrap(), ImageSize::square(64));
        assert_eq!("128X96".parse::<ImageSize>().unwrap().height, 96);
    }

    #[test]
    fn image_size_rejects_zero_and_garbage() {
        assert!("0x10".parse::<ImageSize>().is_err());
        assert!("abc".parse::<ImageSize>().is_err());
        assert!("10x".parse::<ImageSize>().is_err());
    }

    #[test]
    fn api_strings_match_serde_names() {
        let order = serde_json::to_string(&MosaickingOrder::LeastCc).unwrap();
        assert_eq!(order, "\"leastCC\"");
        let collection = serde_json::to_string(&DataCollection::Sentinel2L2a).unwrap();
        assert_eq!(collection, format!("\"{}\"", DataCollection::Sentinel2L2a.as_api_str()));
    }
}
