use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::Path;

use super::frame_data::FrameData;

/// Reduce an RGB triple to luminance with the ITU-R 601-2 weights
/// (0.299, 0.587, 0.114) in 16.16 fixed point, rounding to nearest.
/// Gray inputs map to themselves.
#[inline]
pub fn rgb_to_luma(r: u8, g: u8, b: u8) -> u8 {
    let l = r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000;
    (l >> 16) as u8
}

/// Load an image file and reduce it to a `width` x `height` luminance raster.
pub fn load_frame(path: &Path, width: u32, height: u32) -> Result<FrameData> {
    let img = image::open(path)
        .with_context(|| format!("Failed to decode frame image {}", path.display()))?;
    Ok(to_frame_data(img, width, height, path))
}

fn to_frame_data(img: DynamicImage, width: u32, height: u32, path: &Path) -> FrameData {
    let img = if img.width() != width || img.height() != height {
        log::warn!(
            "{} is {}x{}, expected {}x{}; resizing",
            path.display(),
            img.width(),
            img.height(),
            width,
            height
        );
        img.resize_exact(width, height, FilterType::Triangle)
    } else {
        img
    };

    let rgb = img.to_rgb8();
    let buffer = rgb
        .pixels()
        .map(|p| rgb_to_luma(p[0], p[1], p[2]))
        .collect();
    FrameData::new(buffer, width, height)
}
