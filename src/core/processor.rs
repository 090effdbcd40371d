use crate::config::packed_frame_size;
use crate::decoder::FrameData;

/// Thresholds luminance rasters into 1-bit-per-pixel packed frames.
///
/// Bit `y * width + x` of the output is pixel (x, y), most significant bit
/// first within each byte. A pixel is foreground (1) when its luminance is
/// strictly greater than `threshold`.
#[derive(Clone, Copy, Debug)]
pub struct FrameProcessor {
    pub width: u32,
    pub height: u32,
    pub threshold: u8,
}

impl FrameProcessor {
    pub fn new(width: u32, height: u32, threshold: u8) -> Self {
        Self { width, height, threshold }
    }

    pub fn frame_size(&self) -> usize {
        packed_frame_size(self.width, self.height)
    }

    /// Packed form of a missing frame.
    pub fn blank_frame(&self) -> Vec<u8> {
        vec![0; self.frame_size()]
    }

    pub fn process_frame(&self, frame: &FrameData) -> Vec<u8> {
        debug_assert_eq!((frame.width, frame.height), (self.width, self.height));
        self.pack_luma(&frame.buffer)
    }

    /// Pack a row-major luminance buffer of `width * height` bytes.
    pub fn pack_luma(&self, luma: &[u8]) -> Vec<u8> {
        let mut packed = self.blank_frame();
        let mut byte_idx = 0;
        let mut bit_idx = 0;

        for y in 0..self.height as usize {
            let row = &luma[y * self.width as usize..(y + 1) * self.width as usize];
            for &value in row {
                if value > self.threshold {
                    packed[byte_idx] |= 1 << (7 - bit_idx);
                }

                bit_idx += 1;
                if bit_idx == 8 {
                    bit_idx = 0;
                    byte_idx += 1;
                }
            }
        }

        packed
    }
}
