use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::config::packed_frame_size;
use crate::decoder::FrameData;

/// Layout of a headerless packed stream, derived from its dimensions and
/// byte length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamLayout {
    pub width: u32,
    pub height: u32,
    pub frame_size: usize,
    pub frame_count: usize,
    pub total_bytes: u64,
}

/// Random-access view over a packed frame stream.
pub struct FrameManager {
    data: Vec<u8>,
    width: u32,
    height: u32,
    frame_size: usize,
}

impl FrameManager {
    /// The stream carries no header, so the caller supplies the dimensions.
    pub fn from_bytes(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let frame_size = packed_frame_size(width, height);
        if frame_size == 0 {
            bail!("frame dimensions must be non-zero, got {}x{}", width, height);
        }
        if data.len() % frame_size != 0 {
            bail!(
                "stream length {} is not a multiple of the {}x{} frame size ({} bytes)",
                data.len(),
                width,
                height,
                frame_size
            );
        }
        Ok(Self { data, width, height, frame_size })
    }

    pub fn load(path: &Path, width: u32, height: u32) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_bytes(data, width, height)
            .with_context(|| format!("Invalid frame stream {}", path.display()))
    }

    pub fn frame_count(&self) -> usize {
        self.data.len() / self.frame_size
    }

    pub fn layout(&self) -> StreamLayout {
        StreamLayout {
            width: self.width,
            height: self.height,
            frame_size: self.frame_size,
            frame_count: self.frame_count(),
            total_bytes: self.data.len() as u64,
        }
    }

    /// Byte offset of frame `index` (0-based).
    pub fn frame_offset(&self, index: usize) -> usize {
        index * self.frame_size
    }

    /// Packed bytes of frame `index` (0-based).
    pub fn get_frame(&self, index: usize) -> Option<&[u8]> {
        if index >= self.frame_count() {
            return None;
        }
        let start = self.frame_offset(index);
        Some(&self.data[start..start + self.frame_size])
    }

    /// Expand frame `index` (0-based) back to a 0/255 luminance raster.
    pub fn unpack_frame(&self, index: usize) -> Option<FrameData> {
        let packed = self.get_frame(index)?;
        let pixels = self.width as usize * self.height as usize;
        let mut buffer = Vec::with_capacity(pixels);

        for bit_idx in 0..pixels {
            let byte_pos = bit_idx / 8;
            let bit_pos = 7 - (bit_idx % 8);
            let is_white = (packed[byte_pos] >> bit_pos) & 1 == 1;
            buffer.push(if is_white { 255 } else { 0 });
        }

        Some(FrameData::new(buffer, self.width, self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::processor::FrameProcessor;

    #[test]
    fn rejects_ragged_stream() {
        assert!(FrameManager::from_bytes(vec![0; 5], 3, 3).is_err());
        assert!(FrameManager::from_bytes(vec![0; 6], 3, 3).is_ok());
    }

    #[test]
    fn frames_are_addressed_by_offset() {
        let data = vec![0x00, 0x00, 0xFF, 0x80, 0x12, 0x34];
        let frames = FrameManager::from_bytes(data, 3, 3).unwrap();
        assert_eq!(frames.frame_count(), 3);
        assert_eq!(frames.frame_offset(2), 4);
        assert_eq!(frames.get_frame(1), Some(&[0xFF, 0x80][..]));
        assert_eq!(frames.get_frame(2), Some(&[0x12, 0x34][..]));
        assert_eq!(frames.get_frame(3), None);
    }

    #[test]
    fn unpack_inverts_packing() {
        let luma = vec![200, 50, 0, 255];
        let packed = FrameProcessor::new(2, 2, 128).pack_luma(&luma);
        let frames = FrameManager::from_bytes(packed, 2, 2).unwrap();
        let frame = frames.unpack_frame(0).unwrap();
        assert_eq!(frame.buffer, vec![255, 0, 0, 255]);
    }

    #[test]
    fn layout_reports_sizes() {
        let frames = FrameManager::from_bytes(vec![0; 384 * 2], 64, 48).unwrap();
        let layout = frames.layout();
        assert_eq!(layout.frame_size, 384);
        assert_eq!(layout.frame_count, 2);
        assert_eq!(layout.total_bytes, 768);
    }
}
