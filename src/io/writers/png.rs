use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::{Error, Result};

fn color_type_for_bands(bands: usize) -> Result<ExtendedColorType> {
    match bands {
        1 => Ok(ExtendedColorType::L8),
        3 => Ok(ExtendedColorType::Rgb8),
        4 => Ok(ExtendedColorType::Rgba8),
        _ => Err(Error::UnsupportedBandCount { bands }),
    }
}

/// Write an interleaved 8-bit image as PNG (gray, RGB or RGBA by band count).
pub fn write_png(output: &Path, cols: usize, rows: usize, bands: usize, data: &[u8]) -> Result<()> {
    let color = color_type_for_bands(bands)?;
    if data.len() != cols * rows * bands {
        return Err(Error::Processing(format!(
            "buffer of {} bytes does not match {}x{}x{}",
            data.len(),
            cols,
            rows,
            bands
        )));
    }
    let file = File::create(output)?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new(writer);
    if let Err(e) = encoder.write_image(data, cols as u32, rows as u32, color) {
        let _ = std::fs::remove_file(output);
        return Err(e.into());
    }
    Ok(())
}
