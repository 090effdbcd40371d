use anyhow::{Context, Result};
use image::GrayImage;
use std::path::Path;

use crate::decoder::FrameData;

/// Render a monochrome frame as text, two pixel rows per line.
/// The upper/lower half-block characters stand in for a single set pixel;
/// an odd final row renders with an empty lower half.
pub fn render_half_blocks(frame: &FrameData) -> String {
    let lit = |x: u32, y: u32| y < frame.height && frame.luma(x, y) > 0;
    let rows = (frame.height + 1) / 2;
    let mut out = String::with_capacity(rows as usize * (frame.width as usize * 3 + 1));

    for cy in 0..rows {
        for x in 0..frame.width {
            let ch = match (lit(x, cy * 2), lit(x, cy * 2 + 1)) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            };
            out.push(ch);
        }
        out.push('\n');
    }
    out
}

pub fn save_png(frame: &FrameData, path: &Path) -> Result<()> {
    let img = GrayImage::from_raw(frame.width, frame.height, frame.buffer.clone())
        .context("Frame buffer does not match its dimensions")?;
    img.save(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}
