use ndarray::{Array3, Axis};
use tracing::debug;

use crate::types::NormalizeMode;

fn min_max<'a>(values: impl Iterator<Item = &'a f32>) -> (f32, f32) {
    values.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}

#[inline]
fn stretch(v: f32, lo: f32, hi: f32) -> u8 {
    let range = hi - lo;
    if range <= 0.0 || range.is_nan() {
        return 0;
    }
    (((v - lo) / range) * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Min-max stretch to 0..=255. Output is interleaved row-major with bands last,
/// matching the layout of `data`. A constant raster maps to zeros.
pub fn normalize_to_u8(data: &Array3<f32>, mode: NormalizeMode) -> Vec<u8> {
    match mode {
        NormalizeMode::Global => {
            let (lo, hi) = min_max(data.iter());
            debug!("Min-max normalization (global): [{}, {}]", lo, hi);
            data.iter().map(|&v| stretch(v, lo, hi)).collect()
        }
        NormalizeMode::PerBand => {
            let bounds: Vec<(f32, f32)> = data
                .axis_iter(Axis(2))
                .map(|band| min_max(band.iter()))
                .collect();
            debug!("Min-max normalization (per band): {:?}", bounds);
            data.indexed_iter()
                .map(|((_, _, b), &v)| stretch(v, bounds[b].0, bounds[b].1))
                .collect()
        }
    }
}
