use ndarray::{Array3, Axis};

/// Composite non-zero ratio: the fraction of pixels where at least one band
/// is non-zero. An empty raster has ratio 0.
pub fn coverage_ratio(data: &Array3<f32>) -> f64 {
    let (rows, cols, _) = data.dim();
    let total = rows * cols;
    if total == 0 {
        return 0.0;
    }
    let covered = data
        .lanes(Axis(2))
        .into_iter()
        .filter(|px| px.iter().any(|&v| v != 0.0))
        .count();
    covered as f64 / total as f64
}

/// True when the sample carries enough data to be written.
pub fn is_sufficient(ratio: f64, min_coverage: f64) -> bool {
    ratio >= min_coverage
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_counts_when_any_band_is_set() {
        let mut data = Array3::<f32>::zeros((2, 2, 3));
        data[[0, 0, 2]] = 5.0;
        data[[1, 1, 0]] = 1.0;
        data[[1, 1, 1]] = 1.0;
        assert!((coverage_ratio(&data) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_and_blank_rasters_have_no_coverage() {
        assert_eq!(coverage_ratio(&Array3::zeros((0, 4, 3))), 0.0);
        assert_eq!(coverage_ratio(&Array3::zeros((3, 3, 1))), 0.0);
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut data = Array3::<f32>::ones((10, 1, 1));
        data[[0, 0, 0]] = 0.0;
        let ratio = coverage_ratio(&data);
        assert!(is_sufficient(ratio, 0.9));
        data[[1, 0, 0]] = 0.0;
        assert!(!is_sufficient(coverage_ratio(&data), 0.9));
    }
}
