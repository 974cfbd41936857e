use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use tracing::info;

use crate::error::{Error, Result};
use crate::types::{ImageSize, ResizeFilter};

fn pixel_type_for_bands(bands: usize) -> Result<PixelType> {
    match bands {
        1 => Ok(PixelType::U8),
        3 => Ok(PixelType::U8x3),
        4 => Ok(PixelType::U8x4),
        _ => Err(Error::UnsupportedBandCount { bands }),
    }
}

fn resize_alg(filter: ResizeFilter) -> ResizeAlg {
    match filter {
        ResizeFilter::Nearest => ResizeAlg::Nearest,
        ResizeFilter::Bilinear => ResizeAlg::Convolution(FilterType::Bilinear),
        ResizeFilter::CatmullRom => ResizeAlg::Convolution(FilterType::CatmullRom),
        ResizeFilter::Lanczos3 => ResizeAlg::Convolution(FilterType::Lanczos3),
    }
}

/// Resize an interleaved 8-bit image to exactly `target`, ignoring aspect ratio.
pub fn resize_u8_image(
    data: &[u8],
    original_cols: usize,
    original_rows: usize,
    bands: usize,
    target: ImageSize,
    filter: ResizeFilter,
) -> Result<Vec<u8>> {
    let pixel_type = pixel_type_for_bands(bands)?;
    if data.len() != original_cols * original_rows * bands {
        return Err(Error::Processing(format!(
            "buffer of {} bytes does not match {}x{}x{}",
            data.len(),
            original_cols,
            original_rows,
            bands
        )));
    }
    if target.is_empty() || original_cols == 0 || original_rows == 0 {
        return Err(Error::InvalidArgument {
            arg: "size",
            value: format!("{}x{} -> {}", original_cols, original_rows, target),
        });
    }
    if original_cols == target.width && original_rows == target.height {
        return Ok(data.to_vec());
    }

    info!(
        "Original size: {}x{}, New size: {} ({})",
        original_cols, original_rows, target, filter
    );

    let resize_options = ResizeOptions::new().resize_alg(resize_alg(filter));
    let mut resizer = Resizer::new();

    let src_image = Image::from_vec_u8(
        original_cols as u32,
        original_rows as u32,
        data.to_vec(),
        pixel_type,
    )
    .map_err(Error::external)?;
    let mut dst_image = Image::new(target.width as u32, target.height as u32, pixel_type);
    resizer
        .resize(&src_image, &mut dst_image, &resize_options)
        .map_err(Error::external)?;

    Ok(dst_image.into_vec())
}
