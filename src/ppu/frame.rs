pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 240;

/// Double-buffered 256x240 ARGB picture.
///
/// The PPU draws into the back buffer and swaps once a frame is complete, so
/// readers only ever see whole frames through [`FrameBuffer::pixels`].
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    front: Vec<u32>,
    back: Vec<u32>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            front: vec![0xFF00_0000; SCREEN_WIDTH * SCREEN_HEIGHT],
            back: vec![0xFF00_0000; SCREEN_WIDTH * SCREEN_HEIGHT],
        }
    }

    pub fn width(&self) -> usize {
        SCREEN_WIDTH
    }

    pub fn height(&self) -> usize {
        SCREEN_HEIGHT
    }

    /// Row-major pixels of the last completed frame
    pub fn pixels(&self) -> &[u32] {
        &self.front
    }

    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.front[y * SCREEN_WIDTH + x]
    }

    /// Copy the last completed frame as little-endian ARGB8888 bytes
    pub fn copy_bytes(&self, dest: &mut [u8]) {
        for (chunk, pixel) in dest.chunks_exact_mut(4).zip(&self.front) {
            chunk.copy_from_slice(&pixel.to_le_bytes());
        }
    }

    /// Order-sensitive digest of the visible frame, for logging and comparisons
    pub fn checksum(&self) -> u64 {
        // FNV-1a over the pixel words
        self.front.iter().fold(0xCBF2_9CE4_8422_2325, |hash, &pixel| {
            (hash ^ u64::from(pixel)).wrapping_mul(0x0000_0100_0000_01B3)
        })
    }

    pub(crate) fn set_pixel(&mut self, x: usize, y: usize, argb: u32) {
        self.back[y * SCREEN_WIDTH + x] = argb;
    }

    pub(crate) fn swap(&mut self) {
        std::mem::swap(&mut self.front, &mut self.back);
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        let frame = FrameBuffer::new();
        assert_eq!(frame.width(), 256);
        assert_eq!(frame.height(), 240);
        assert_eq!(frame.pixels().len(), 256 * 240);
    }

    #[test]
    fn test_back_buffer_hidden_until_swap() {
        let mut frame = FrameBuffer::new();
        frame.set_pixel(10, 20, 0xFF12_3456);
        assert_eq!(frame.pixel(10, 20), 0xFF00_0000);
        frame.swap();
        assert_eq!(frame.pixel(10, 20), 0xFF12_3456);
    }

    #[test]
    fn test_copy_bytes_is_little_endian() {
        let mut frame = FrameBuffer::new();
        frame.set_pixel(0, 0, 0xFFAA_BBCC);
        frame.swap();
        let mut bytes = vec![0; 256 * 240 * 4];
        frame.copy_bytes(&mut bytes);
        assert_eq!(&bytes[..4], &[0xCC, 0xBB, 0xAA, 0xFF]);
    }

    #[test]
    fn test_checksum_tracks_content() {
        let mut frame = FrameBuffer::new();
        let blank = frame.checksum();
        frame.set_pixel(255, 239, 0xFFFF_FFFF);
        frame.swap();
        assert_ne!(frame.checksum(), blank);
    }
}
