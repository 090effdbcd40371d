/// Single-channel raster: one luminance byte per pixel, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameData {
    pub buffer: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl FrameData {
    pub fn new(buffer: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(buffer.len(), width as usize * height as usize);
        Self { buffer, width, height }
    }

    pub fn luma(&self, x: u32, y: u32) -> u8 {
        self.buffer[y as usize * self.width as usize + x as usize]
    }
}
